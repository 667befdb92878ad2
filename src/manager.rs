//! Orchestrates boundary/cost point-function evaluation,
//! differentiation, and sparsity discovery across all phases.
//!
//! The manager owns one `{JacobianData, MultiPointUtil}` pair each for
//! the boundary group and the cost group, plus the per-phase
//! initial/final input snapshots.  Lifecycle: `initialize` → repeated
//! `{evaluate | compute_*_jacobian | NLP triads}`.  The manager is not
//! reentrant: perturbation sweeps mutate the shared input snapshots in
//! place and restore them before returning.

use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sprs::CsMat;

use crate::function_data::{FunctionInputData, FunctionOutputData};
use crate::jacobian_data::JacobianData;
use crate::multipoint::MultiPointUtil;
use crate::phase::Phase;
use crate::types::{ConfigError, EvalError, JacBlock, JacobianSource};

// ─────────────────────────────────────────────────────────────
//  User-function surface
// ─────────────────────────────────────────────────────────────

/// Output of one user point-function evaluation: the boundary
/// (algebraic) group and/or the scalar cost group.
pub struct PointFunctionOutput {
    pub boundary: Option<FunctionOutputData>,
    pub cost: Option<FunctionOutputData>,
}

/// Analytic Jacobian blocks for a contiguous range of boundary rows.
///
/// Each `Vec` is indexed by phase; `None` means the rows do not depend
/// on that phase through that block.  Time blocks are `num_rows × 1`,
/// state blocks `num_rows × n_state`, static blocks `num_rows ×
/// n_static`.
pub struct AnalyticFunctionRows {
    pub start_row: usize,
    pub num_rows: usize,
    pub init_state: Vec<Option<Array2<f64>>>,
    pub final_state: Vec<Option<Array2<f64>>>,
    pub init_time: Vec<Option<Array2<f64>>>,
    pub final_time: Vec<Option<Array2<f64>>>,
    pub statics: Vec<Option<Array2<f64>>>,
}

/// A user-supplied point function: boundary constraints and/or a cost
/// term evaluated at every phase's initial and final points.
pub trait PointFunction {
    /// Evaluate at the staged inputs.  Failures are annotated with the
    /// call-site context by the manager and re-thrown, never swallowed.
    fn evaluate(
        &mut self,
        initial: &[FunctionInputData],
        final_points: &[FunctionInputData],
    ) -> Result<PointFunctionOutput, Box<dyn std::error::Error>>;

    /// Analytic derivative rows, if any.  Rows covered here keep the
    /// analytic values; the rest are forward-differenced.
    fn evaluate_jacobian(
        &mut self,
        _initial: &[FunctionInputData],
        _final_points: &[FunctionInputData],
    ) -> Result<Vec<AnalyticFunctionRows>, Box<dyn std::error::Error>> {
        Ok(Vec::new())
    }

    /// Forward-difference step for the time variables.
    fn time_perturbation(&self) -> f64 { 1.0e-7 }
    /// Forward-difference step for the state variables.
    fn state_perturbation(&self) -> f64 { 1.0e-7 }
    /// Forward-difference step for the static parameters.
    fn static_perturbation(&self) -> f64 { 1.0e-7 }
}

/// Which variable class a perturbation sweep walks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VarClass {
    Time,
    State,
    Static,
}

// ─────────────────────────────────────────────────────────────
//  Manager
// ─────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct PointFunctionManager<F: PointFunction> {
    user: F,
    phases: Vec<Phase>,
    dec_vec_start_idxs: Vec<usize>,
    num_dec_params: usize,

    init_inputs: Vec<FunctionInputData>,
    final_inputs: Vec<FunctionInputData>,

    has_boundary_functions: bool,
    has_cost_function: bool,
    num_boundary_functions: usize,
    // Set once the discovery evaluation has fixed the group shapes.
    shapes_frozen: bool,

    boundary_data: FunctionOutputData,
    cost_data: FunctionOutputData,

    bound_jac_data: Option<JacobianData>,
    cost_jac_data: Option<JacobianData>,
    bound_util: Option<MultiPointUtil>,
    cost_util: Option<MultiPointUtil>,

    /// Per boundary row, decided once at initialize.
    row_sources: Vec<JacobianSource>,

    sparsity_seed: u64,
}

impl<F: PointFunction> PointFunctionManager<F> {
    /// Build a fully initialized manager: stage input snapshots, run
    /// the discovery evaluation, size the Jacobian storage, discover
    /// sparsity patterns and dependencies, and freeze the multi-point
    /// assembly structure.
    ///
    /// `dec_vec_start_idxs[p]` is the whole-problem offset of phase
    /// `p`'s slice; `num_decision_params` is the whole-problem vector
    /// length; `sparsity_seed` seeds the random interior samples of
    /// sparsity discovery.
    pub fn initialize(
        user: F,
        phases: Vec<Phase>,
        num_decision_params: usize,
        dec_vec_start_idxs: Vec<usize>,
        sparsity_seed: u64,
    ) -> Result<Self, EvalError> {
        if phases.is_empty() {
            return Err(ConfigError::EmptyPhaseList.into());
        }
        if dec_vec_start_idxs.len() != phases.len() {
            return Err(ConfigError::SizeMismatch {
                what: "decision-vector start indices".into(),
                expected: phases.len(),
                got: dec_vec_start_idxs.len(),
            }.into());
        }
        for (p, phase) in phases.iter().enumerate() {
            let end = dec_vec_start_idxs[p]
                + phase.decision_vector().num_decision_params();
            if end > num_decision_params {
                return Err(ConfigError::SizeMismatch {
                    what: format!("phase {p} slice end"),
                    expected: num_decision_params,
                    got: end,
                }.into());
            }
        }

        let init_inputs = phases.iter()
            .map(|p| FunctionInputData::new(
                p.phase_number(), p.num_state_vars(), p.num_static_vars()))
            .collect();
        let final_inputs = phases.iter()
            .map(|p| FunctionInputData::new(
                p.phase_number(), p.num_state_vars(), p.num_static_vars()))
            .collect();

        let mut mgr = Self {
            user,
            phases,
            dec_vec_start_idxs,
            num_dec_params: num_decision_params,
            init_inputs,
            final_inputs,
            has_boundary_functions: false,
            has_cost_function: false,
            num_boundary_functions: 0,
            shapes_frozen: false,
            boundary_data: FunctionOutputData::empty(),
            cost_data: FunctionOutputData::empty(),
            bound_jac_data: None,
            cost_jac_data: None,
            bound_util: None,
            cost_util: None,
            row_sources: Vec::new(),
            sparsity_seed,
        };

        // Discovery evaluation: which function groups exist, and how
        // many boundary rows there are.
        mgr.prepare_input_data()?;
        mgr.evaluate_prepared_user_function()?;
        mgr.has_boundary_functions = mgr.boundary_data.has_functions();
        mgr.has_cost_function = mgr.cost_data.has_functions();
        mgr.num_boundary_functions = mgr.boundary_data.num_functions();
        if !mgr.has_boundary_functions && !mgr.has_cost_function {
            return Err(ConfigError::NoFunctions("user point function").into());
        }
        if mgr.has_cost_function && mgr.cost_data.num_functions() != 1 {
            return Err(ConfigError::SizeMismatch {
                what: "cost function count".into(),
                expected: 1,
                got: mgr.cost_data.num_functions(),
            }.into());
        }
        mgr.shapes_frozen = true;

        mgr.tag_row_sources()?;

        if mgr.has_boundary_functions {
            mgr.bound_jac_data = Some(JacobianData::initialize(
                mgr.num_boundary_functions,
                true,
                &mgr.phases,
                &mgr.dec_vec_start_idxs,
            )?);
        }
        if mgr.has_cost_function {
            mgr.cost_jac_data = Some(JacobianData::initialize(
                1,
                true,
                &mgr.phases,
                &mgr.dec_vec_start_idxs,
            )?);
        }

        mgr.compute_sparsity_patterns()?;
        mgr.determine_function_dependencies()?;

        if mgr.has_boundary_functions {
            let jd = mgr.bound_jac_data.as_ref()
                .ok_or(ConfigError::NoFunctions("boundary jacobian data"))?;
            mgr.bound_util = Some(MultiPointUtil::initialize(
                &mgr.boundary_data, jd, mgr.num_dec_params)?);
        }
        if mgr.has_cost_function {
            let jd = mgr.cost_jac_data.as_ref()
                .ok_or(ConfigError::NoFunctions("cost jacobian data"))?;
            mgr.cost_util = Some(MultiPointUtil::initialize(
                &mgr.cost_data, jd, mgr.num_dec_params)?);
        }

        Ok(mgr)
    }

    // ── Basic accessors ──────────────────────────────────────

    pub fn has_boundary_functions(&self) -> bool { self.has_boundary_functions }
    pub fn has_cost_function(&self) -> bool { self.has_cost_function }
    pub fn num_boundary_functions(&self) -> usize { self.num_boundary_functions }
    pub fn phases(&self) -> &[Phase] { &self.phases }
    pub fn phases_mut(&mut self) -> &mut [Phase] { &mut self.phases }
    pub fn row_sources(&self) -> &[JacobianSource] { &self.row_sources }

    /// Lower bounds of the boundary constraint rows.
    pub fn con_lower_bound(&self) -> &Array1<f64> {
        self.boundary_data.lower_bounds()
    }

    /// Upper bounds of the boundary constraint rows.
    pub fn con_upper_bound(&self) -> &Array1<f64> {
        self.boundary_data.upper_bounds()
    }

    pub fn function_names(&self) -> &[String] {
        self.boundary_data.names()
    }

    // ── Evaluation ───────────────────────────────────────────

    /// Re-synchronize the input snapshots from live phase state, then
    /// evaluate.
    pub fn evaluate_user_function(&mut self) -> Result<(), EvalError> {
        self.prepare_input_data()?;
        self.evaluate_prepared_user_function()
    }

    /// Evaluate at the currently staged inputs (used inside
    /// perturbation loops).  Caches the output containers.
    pub fn evaluate_prepared_user_function(&mut self) -> Result<(), EvalError> {
        let out = self.user
            .evaluate(&self.init_inputs, &self.final_inputs)
            .map_err(|e| EvalError::User {
                context: "point function evaluation".into(),
                message: e.to_string(),
            })?;
        // Group shapes are frozen by the discovery evaluation; after
        // that, a group may neither appear, vanish, nor change size.
        match out.boundary {
            Some(boundary) => {
                if self.shapes_frozen
                    && boundary.num_functions() != self.num_boundary_functions {
                    return Err(ConfigError::SizeMismatch {
                        what: "boundary function count".into(),
                        expected: self.num_boundary_functions,
                        got: boundary.num_functions(),
                    }.into());
                }
                self.boundary_data = boundary;
            }
            None => {
                if self.shapes_frozen && self.num_boundary_functions != 0 {
                    return Err(ConfigError::SizeMismatch {
                        what: "boundary function count".into(),
                        expected: self.num_boundary_functions,
                        got: 0,
                    }.into());
                }
                self.boundary_data = FunctionOutputData::empty();
            }
        }
        match out.cost {
            Some(cost) => {
                let expected = if self.has_cost_function { 1 } else { 0 };
                if self.shapes_frozen && cost.num_functions() != expected {
                    return Err(ConfigError::SizeMismatch {
                        what: "cost function count".into(),
                        expected,
                        got: cost.num_functions(),
                    }.into());
                }
                self.cost_data = cost;
            }
            None => {
                if self.has_cost_function {
                    return Err(ConfigError::SizeMismatch {
                        what: "cost function count".into(),
                        expected: 1,
                        got: 0,
                    }.into());
                }
                self.cost_data = FunctionOutputData::empty();
            }
        }
        Ok(())
    }

    /// Snapshot each phase's current first/last state, time, and
    /// statics into the input containers.
    pub fn prepare_input_data(&mut self) -> Result<(), EvalError> {
        for (p, phase) in self.phases.iter().enumerate() {
            let dv = phase.decision_vector();
            self.init_inputs[p].set_state(&dv.first_state_vector());
            self.init_inputs[p].set_time(dv.first_time());
            self.init_inputs[p].set_statics(&dv.static_vector());
            self.final_inputs[p].set_state(&dv.last_state_vector());
            self.final_inputs[p].set_time(dv.last_time());
            self.final_inputs[p].set_statics(&dv.static_vector());
        }
        Ok(())
    }

    // ── Finite differencing ──────────────────────────────────

    /// Forward-difference the time blocks (init/final, per phase),
    /// then re-apply analytic rows.
    pub fn compute_time_jacobian(&mut self) -> Result<(), EvalError> {
        self.compute_jacobian_class(VarClass::Time)
    }

    /// Forward-difference the state blocks (init/final, per phase),
    /// then re-apply analytic rows.
    pub fn compute_state_jacobian(&mut self) -> Result<(), EvalError> {
        self.compute_jacobian_class(VarClass::State)
    }

    /// Forward-difference the static block per phase, then re-apply
    /// analytic rows.
    pub fn compute_static_jacobian(&mut self) -> Result<(), EvalError> {
        self.compute_jacobian_class(VarClass::Static)
    }

    fn compute_jacobian_class(&mut self, class: VarClass) -> Result<(), EvalError> {
        self.evaluate_prepared_user_function()?;
        let nominal_bound = self.boundary_data.functions().clone();
        let nominal_cost = self.cost_data.functions().clone();

        for p in 0..self.phases.len() {
            match class {
                VarClass::Time => {
                    let step = self.user.time_perturbation();
                    for (point, block) in
                        [(true, JacBlock::InitTime), (false, JacBlock::FinalTime)] {
                        let t = self.input(point, p).time();
                        self.input_mut(point, p).set_time(t + step);
                        self.input_mut(point, p).set_is_perturbing(true);
                        self.evaluate_prepared_user_function()?;
                        self.write_fd_column(block, p, 0, step,
                                             &nominal_bound, &nominal_cost)?;
                        self.input_mut(point, p).set_time(t);
                        self.input_mut(point, p).set_is_perturbing(false);
                    }
                }
                VarClass::State => {
                    let step = self.user.state_perturbation();
                    let n_state = self.phases[p].num_state_vars();
                    for (point, block) in
                        [(true, JacBlock::InitState), (false, JacBlock::FinalState)] {
                        for i in 0..n_state {
                            let x = self.input(point, p).state()[i];
                            self.input_mut(point, p).set_state_element(i, x + step)?;
                            self.input_mut(point, p).set_is_perturbing(true);
                            self.evaluate_prepared_user_function()?;
                            self.write_fd_column(block, p, i, step,
                                                 &nominal_bound, &nominal_cost)?;
                            self.input_mut(point, p).set_state_element(i, x)?;
                            self.input_mut(point, p).set_is_perturbing(false);
                        }
                    }
                }
                VarClass::Static => {
                    let step = self.user.static_perturbation();
                    let n_static = self.phases[p].num_static_vars();
                    for i in 0..n_static {
                        // One static parameter feeds both points.
                        let s = self.init_inputs[p].statics()[i];
                        self.init_inputs[p].set_static_element(i, s + step)?;
                        self.final_inputs[p].set_static_element(i, s + step)?;
                        self.init_inputs[p].set_is_perturbing(true);
                        self.final_inputs[p].set_is_perturbing(true);
                        self.evaluate_prepared_user_function()?;
                        self.write_fd_column(JacBlock::Static, p, i, step,
                                             &nominal_bound, &nominal_cost)?;
                        self.init_inputs[p].set_static_element(i, s)?;
                        self.final_inputs[p].set_static_element(i, s)?;
                        self.init_inputs[p].set_is_perturbing(false);
                        self.final_inputs[p].set_is_perturbing(false);
                    }
                }
            }
        }

        // Restore the nominal cached output.
        self.evaluate_prepared_user_function()?;
        self.fill_analytic_rows()?;
        Ok(())
    }

    fn input(&self, initial: bool, p: usize) -> &FunctionInputData {
        if initial { &self.init_inputs[p] } else { &self.final_inputs[p] }
    }

    fn input_mut(&mut self, initial: bool, p: usize) -> &mut FunctionInputData {
        if initial { &mut self.init_inputs[p] } else { &mut self.final_inputs[p] }
    }

    /// Write one forward-difference column into both function groups.
    /// Boundary rows with an analytic source are skipped.
    fn write_fd_column(
        &mut self,
        block: JacBlock,
        phase: usize,
        col: usize,
        step: f64,
        nominal_bound: &Array1<f64>,
        nominal_cost: &Array1<f64>,
    ) -> Result<(), EvalError> {
        if let Some(jd) = self.bound_jac_data.as_mut() {
            let perturbed = self.boundary_data.functions();
            for row in 0..self.num_boundary_functions {
                if self.row_sources[row] == JacobianSource::Analytic {
                    continue;
                }
                let ratio = (perturbed[row] - nominal_bound[row]) / step;
                jd.set_jacobian(block, phase, row, col, ratio)?;
            }
        }
        if let Some(jd) = self.cost_jac_data.as_mut() {
            let perturbed = self.cost_data.functions();
            let ratio = (perturbed[0] - nominal_cost[0]) / step;
            jd.set_jacobian(block, phase, 0, col, ratio)?;
        }
        Ok(())
    }

    // ── Analytic rows ────────────────────────────────────────

    /// Decide each boundary row's Jacobian source from the analytic
    /// coverage the user object declares.
    fn tag_row_sources(&mut self) -> Result<(), EvalError> {
        self.row_sources =
            vec![JacobianSource::FiniteDifference; self.num_boundary_functions];
        let providers = self.user
            .evaluate_jacobian(&self.init_inputs, &self.final_inputs)
            .map_err(|e| EvalError::User {
                context: "point function jacobian evaluation".into(),
                message: e.to_string(),
            })?;
        for rows in &providers {
            let end = rows.start_row + rows.num_rows;
            if end > self.num_boundary_functions {
                return Err(ConfigError::SizeMismatch {
                    what: "analytic row range".into(),
                    expected: self.num_boundary_functions,
                    got: end,
                }.into());
            }
            for row in rows.start_row..end {
                self.row_sources[row] = JacobianSource::Analytic;
            }
        }
        Ok(())
    }

    /// Overwrite the analytic rows of the boundary Jacobian blocks with
    /// the user object's values.
    fn fill_analytic_rows(&mut self) -> Result<(), EvalError> {
        if !self.has_boundary_functions
            || !self.row_sources.contains(&JacobianSource::Analytic) {
            return Ok(());
        }
        let providers = self.user
            .evaluate_jacobian(&self.init_inputs, &self.final_inputs)
            .map_err(|e| EvalError::User {
                context: "point function jacobian evaluation".into(),
                message: e.to_string(),
            })?;
        let jd = self.bound_jac_data.as_mut()
            .ok_or(ConfigError::NoFunctions("boundary jacobian data"))?;
        for rows in &providers {
            for p in 0..self.phases.len() {
                for (block, blocks) in [
                    (JacBlock::InitState, &rows.init_state),
                    (JacBlock::FinalState, &rows.final_state),
                    (JacBlock::InitTime, &rows.init_time),
                    (JacBlock::FinalTime, &rows.final_time),
                    (JacBlock::Static, &rows.statics),
                ] {
                    let Some(Some(sub)) = blocks.get(p).map(Option::as_ref) else {
                        continue;
                    };
                    if sub.nrows() != rows.num_rows {
                        return Err(ConfigError::SizeMismatch {
                            what: format!("analytic {} block rows", block.name()),
                            expected: rows.num_rows,
                            got: sub.nrows(),
                        }.into());
                    }
                    for r in 0..sub.nrows() {
                        for c in 0..sub.ncols() {
                            jd.set_jacobian(block, p, rows.start_row + r, c,
                                            sub[[r, c]])?;
                        }
                    }
                }
            }
        }
        Ok(())
    }

    // ── Sparsity discovery ───────────────────────────────────

    /// Discover the time/state/static sparsity patterns by sampling the
    /// Jacobian at the variable bounds and at seeded random interior
    /// points.  Conservative: any sampled nonzero marks the pattern.
    pub fn compute_sparsity_patterns(&mut self) -> Result<(), EvalError> {
        let mut rng = StdRng::seed_from_u64(self.sparsity_seed);
        self.compute_class_sparsity(VarClass::State, &mut rng)?;
        self.compute_class_sparsity(VarClass::Time, &mut rng)?;
        self.compute_class_sparsity(VarClass::Static, &mut rng)?;
        Ok(())
    }

    /// Draw one random state/static vector between bounds.
    fn random_vector(lower: &Array1<f64>, upper: &Array1<f64>, rng: &mut StdRng)
        -> Array1<f64> {
        lower.iter().zip(upper.iter())
            .map(|(&l, &u)| l + rng.gen::<f64>() * (u - l))
            .collect()
    }

    fn compute_class_sparsity(&mut self, class: VarClass, rng: &mut StdRng)
        -> Result<(), EvalError> {
        for inp in self.init_inputs.iter_mut().chain(self.final_inputs.iter_mut()) {
            inp.set_is_sparsity(true);
        }

        // Statics are shared between the two points, so a single pass
        // (writing both snapshots) samples the variable fully.
        let points: &[bool] = match class {
            VarClass::Static => &[true],
            _ => &[true, false],
        };

        for &initial in points {
            for p in 0..self.phases.len() {
                if class == VarClass::Static
                    && self.phases[p].num_static_vars() == 0 {
                    continue;
                }
                let nominal_state = self.input(initial, p).state().clone();
                let nominal_time = self.input(initial, p).time();
                let nominal_static = self.input(initial, p).statics().clone();
                let t_lo = self.phases[p].time_lower_bound();
                let t_hi = self.phases[p].time_upper_bound();
                let s_lo = self.phases[p].state_lower_bound().clone();
                let s_hi = self.phases[p].state_upper_bound().clone();
                let st_lo = self.phases[p].static_lower_bound().clone();
                let st_hi = self.phases[p].static_upper_bound().clone();

                // Lower bound, upper bound, then three random interior
                // points.  A nominal-point evaluation can mask an entry
                // that happens to vanish there, so the random draws
                // also move the coupled variables (time with state,
                // state with time).
                for sample in 0..5 {
                    match class {
                        VarClass::Time => {
                            if sample < 2 {
                                let t = if sample == 0 { t_lo } else { t_hi };
                                self.input_mut(initial, p).set_time(t);
                            } else {
                                let sv = Self::random_vector(&s_lo, &s_hi, rng);
                                self.input_mut(initial, p).set_state(&sv);
                                let t = t_lo + rng.gen::<f64>() * (t_hi - t_lo);
                                self.input_mut(initial, p).set_time(t);
                            }
                        }
                        VarClass::State => {
                            if sample < 2 {
                                let sv = if sample == 0 { s_lo.clone() }
                                         else { s_hi.clone() };
                                self.input_mut(initial, p).set_state(&sv);
                            } else {
                                let t = t_lo + rng.gen::<f64>() * (t_hi - t_lo);
                                self.input_mut(initial, p).set_time(t);
                                let sv = Self::random_vector(&s_lo, &s_hi, rng);
                                self.input_mut(initial, p).set_state(&sv);
                            }
                        }
                        VarClass::Static => {
                            let sv = match sample {
                                0 => st_lo.clone(),
                                1 => st_hi.clone(),
                                _ => {
                                    let t = t_lo
                                        + rng.gen::<f64>() * (t_hi - t_lo);
                                    self.init_inputs[p].set_time(t);
                                    Self::random_vector(&st_lo, &st_hi, rng)
                                }
                            };
                            self.init_inputs[p].set_statics(&sv);
                            self.final_inputs[p].set_statics(&sv);
                        }
                    }

                    self.evaluate_prepared_user_function()?;
                    match class {
                        VarClass::Time => self.compute_time_jacobian()?,
                        VarClass::State => self.compute_state_jacobian()?,
                        VarClass::Static => self.compute_static_jacobian()?,
                    }
                    self.mark_sampled_nonzeros(class, p)?;
                }

                // Restore nominal snapshot values.
                let inp = self.input_mut(initial, p);
                inp.set_state(&nominal_state);
                inp.set_time(nominal_time);
                inp.set_statics(&nominal_static);
                if class == VarClass::Static {
                    self.final_inputs[p].set_statics(&nominal_static);
                }
            }
        }

        for inp in self.init_inputs.iter_mut().chain(self.final_inputs.iter_mut()) {
            inp.set_is_sparsity(false);
        }
        self.prepare_input_data()?;
        self.evaluate_prepared_user_function()?;
        Ok(())
    }

    /// OR the sampled phase's current Jacobian nonzeros of `class`'s
    /// blocks into the patterns, both groups.
    fn mark_sampled_nonzeros(&mut self, class: VarClass, phase: usize)
        -> Result<(), EvalError> {
        let blocks: &[JacBlock] = match class {
            VarClass::Time => &[JacBlock::InitTime, JacBlock::FinalTime],
            VarClass::State => &[JacBlock::InitState, JacBlock::FinalState],
            VarClass::Static => &[JacBlock::Static],
        };
        for jd in [self.bound_jac_data.as_mut(), self.cost_jac_data.as_mut()]
            .into_iter().flatten() {
            for &block in blocks {
                let nonzeros: Vec<(usize, usize)> = jd.jacobian(block, phase)?
                    .indexed_iter()
                    .filter(|(_, &v)| v != 0.0)
                    .map(|((r, c), _)| (r, c))
                    .collect();
                for (r, c) in nonzeros {
                    jd.set_pattern(block, phase, r, c, 1.0)?;
                }
            }
        }
        Ok(())
    }

    /// Record, per phase and block, whether the sampled pattern has any
    /// nonzero entry.
    pub fn determine_function_dependencies(&mut self) -> Result<(), EvalError> {
        for jd in [self.bound_jac_data.as_mut(), self.cost_jac_data.as_mut()]
            .into_iter().flatten() {
            for p in 0..self.dec_vec_start_idxs.len() {
                for block in JacBlock::ALL {
                    let any = jd.pattern(block, p)?.iter().any(|&v| v != 0.0);
                    jd.set_dependency(block, p, any)?;
                }
            }
        }
        Ok(())
    }

    // ── Whole-problem assembly ───────────────────────────────

    /// The whole-problem decision vector assembled from the phase
    /// slices.
    pub fn assemble_decision_vector(&self) -> Array1<f64> {
        let mut z = Array1::zeros(self.num_dec_params);
        for (phase, &start) in self.phases.iter().zip(&self.dec_vec_start_idxs) {
            let v = phase.decision_vector().vector();
            for (i, &val) in v.iter().enumerate() {
                z[start + i] = val;
            }
        }
        z
    }

    /// Fresh evaluation, then the assembled boundary function vector.
    pub fn compute_bound_nlp_functions(&mut self) -> Result<Array1<f64>, EvalError> {
        self.evaluate_user_function()?;
        let z = self.assemble_decision_vector();
        let jd = self.bound_jac_data.as_ref()
            .ok_or(ConfigError::NoFunctions("boundary function group"))?;
        let util = self.bound_util.as_mut()
            .ok_or(ConfigError::NoFunctions("boundary function group"))?;
        Ok(util.compute_functions(&self.boundary_data, jd, &z)?)
    }

    /// Fresh evaluation and differentiation, then the assembled sparse
    /// boundary Jacobian.
    pub fn compute_bound_nlp_jacobian(&mut self) -> Result<CsMat<f64>, EvalError> {
        self.evaluate_user_function()?;
        self.compute_time_jacobian()?;
        self.compute_state_jacobian()?;
        self.compute_static_jacobian()?;
        let z = self.assemble_decision_vector();
        let jd = self.bound_jac_data.as_ref()
            .ok_or(ConfigError::NoFunctions("boundary function group"))?;
        let util = self.bound_util.as_mut()
            .ok_or(ConfigError::NoFunctions("boundary function group"))?;
        let (_f, jac) = util.compute_func_and_jac(&self.boundary_data, jd, &z)?;
        Ok(jac)
    }

    /// The assembled whole-problem 0/1 boundary pattern.
    pub fn compute_bound_nlp_sparsity_pattern(&mut self)
        -> Result<&CsMat<f64>, ConfigError> {
        self.bound_util.as_mut()
            .ok_or(ConfigError::NoFunctions("boundary function group"))?
            .sparsity_pattern()
    }

    /// Fresh evaluation, then the assembled cost function vector
    /// (length 1).
    pub fn compute_cost_nlp_functions(&mut self) -> Result<Array1<f64>, EvalError> {
        self.evaluate_user_function()?;
        let z = self.assemble_decision_vector();
        let jd = self.cost_jac_data.as_ref()
            .ok_or(ConfigError::NoFunctions("cost function group"))?;
        let util = self.cost_util.as_mut()
            .ok_or(ConfigError::NoFunctions("cost function group"))?;
        Ok(util.compute_functions(&self.cost_data, jd, &z)?)
    }

    /// Fresh evaluation and differentiation, then the assembled sparse
    /// cost Jacobian (one row).
    pub fn compute_cost_nlp_jacobian(&mut self) -> Result<CsMat<f64>, EvalError> {
        self.evaluate_user_function()?;
        self.compute_time_jacobian()?;
        self.compute_state_jacobian()?;
        self.compute_static_jacobian()?;
        let z = self.assemble_decision_vector();
        let jd = self.cost_jac_data.as_ref()
            .ok_or(ConfigError::NoFunctions("cost function group"))?;
        let util = self.cost_util.as_mut()
            .ok_or(ConfigError::NoFunctions("cost function group"))?;
        let (_f, jac) = util.compute_func_and_jac(&self.cost_data, jd, &z)?;
        Ok(jac)
    }

    /// The assembled whole-problem 0/1 cost pattern.
    pub fn compute_cost_nlp_sparsity_pattern(&mut self)
        -> Result<&CsMat<f64>, ConfigError> {
        self.cost_util.as_mut()
            .ok_or(ConfigError::NoFunctions("cost function group"))?
            .sparsity_pattern()
    }

    /// Read access to the boundary Jacobian storage.
    pub fn bound_jacobian_data(&self) -> Option<&JacobianData> {
        self.bound_jac_data.as_ref()
    }

    /// Read access to the cost Jacobian storage.
    pub fn cost_jacobian_data(&self) -> Option<&JacobianData> {
        self.cost_jac_data.as_ref()
    }
}
