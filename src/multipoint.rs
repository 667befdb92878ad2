//! Multi-point function assembly: maps per-phase boundary-function
//! Jacobian blocks onto the whole-problem sparse Jacobian.
//!
//! Point functions couple only a phase's initial/final state, the two
//! time endpoints, and the statics, so B is the identity (each function
//! owns its output row), A is constant zero, and all structure lives in
//! the D block at the whole-problem column indices recorded by
//! [`JacobianData`].

use ndarray::Array1;
use sprs::CsMat;

use crate::function_data::FunctionOutputData;
use crate::jacobian_data::JacobianData;
use crate::nlp_function_data::NlpFunctionData;
use crate::types::{ConfigError, JacBlock};

#[derive(Debug)]
pub struct MultiPointUtil {
    num_funcs: usize,
    num_vars: usize,
    num_phases: usize,
    data: NlpFunctionData,
}

impl MultiPointUtil {
    /// Build the frozen (A, B, D) structure for one function group.
    ///
    /// Every block coordinate is inserted structurally, pattern zeros
    /// included, so the solver sees the same structure on every
    /// iteration.  Fails if the group has no functions.
    pub fn initialize(
        func_data: &FunctionOutputData,
        jac_data: &JacobianData,
        num_vars_nlp: usize,
    ) -> Result<Self, ConfigError> {
        let num_funcs = func_data.num_functions();
        if num_funcs == 0 {
            return Err(ConfigError::NoFunctions("multi-point function group"));
        }
        if jac_data.num_functions() != num_funcs {
            return Err(ConfigError::SizeMismatch {
                what: "jacobian data function count".into(),
                expected: num_funcs,
                got: jac_data.num_functions(),
            });
        }

        let num_phases = jac_data.num_phases();
        let mut data = NlpFunctionData::new(num_funcs, num_vars_nlp, num_funcs);
        data.insert_b_identity()?;

        for phase in 0..num_phases {
            Self::for_each_block_entry(jac_data, phase, num_funcs,
                |row, local_col, whole_col, block| {
                    let pat = jac_data.pattern_entry(block, phase, row, local_col)?;
                    data.insert_d_entry(row, whole_col, pat)
                })?;
        }

        data.freeze()?;
        Ok(Self { num_funcs, num_vars: num_vars_nlp, num_phases, data })
    }

    /// Walk every (row, phase-local col, whole-problem col) coordinate
    /// of the five block families for one phase, in a fixed order.
    fn for_each_block_entry<F>(
        jac_data: &JacobianData,
        phase: usize,
        num_funcs: usize,
        mut visit: F,
    ) -> Result<(), ConfigError>
    where
        F: FnMut(usize, usize, usize, JacBlock) -> Result<(), ConfigError>,
    {
        let init_state = jac_data.init_state_idxs(phase)?.to_vec();
        let final_state = jac_data.final_state_idxs(phase)?.to_vec();
        let init_time = jac_data.init_time_idx(phase)?;
        let final_time = jac_data.final_time_idx(phase)?;
        let statics = jac_data.static_idxs(phase)?.to_vec();

        for row in 0..num_funcs {
            visit(row, 0, init_time, JacBlock::InitTime)?;
            visit(row, 0, final_time, JacBlock::FinalTime)?;
            for (j, &col) in init_state.iter().enumerate() {
                visit(row, j, col, JacBlock::InitState)?;
            }
            for (j, &col) in final_state.iter().enumerate() {
                visit(row, j, col, JacBlock::FinalState)?;
            }
            for (j, &col) in statics.iter().enumerate() {
                visit(row, j, col, JacBlock::Static)?;
            }
        }
        Ok(())
    }

    pub fn num_funcs(&self) -> usize { self.num_funcs }
    pub fn num_vars(&self) -> usize { self.num_vars }
    pub fn num_phases(&self) -> usize { self.num_phases }

    /// Copy live function values into the Q vector and overwrite the
    /// live D values at exactly the coordinates fixed at initialize.
    pub fn fill_user_nlp_matrices(
        &mut self,
        func_data: &FunctionOutputData,
        jac_data: &JacobianData,
    ) -> Result<Array1<f64>, ConfigError> {
        if func_data.num_functions() != self.num_funcs {
            return Err(ConfigError::SizeMismatch {
                what: "function values for assembly".into(),
                expected: self.num_funcs,
                got: func_data.num_functions(),
            });
        }
        let data = &mut self.data;
        for phase in 0..self.num_phases {
            Self::for_each_block_entry(jac_data, phase, self.num_funcs,
                |row, local_col, whole_col, block| {
                    let v = jac_data.jacobian_entry(block, phase, row, local_col)?;
                    data.set_d_entry(row, whole_col, v)
                })?;
        }
        Ok(func_data.functions().clone())
    }

    /// Assemble f = A·z + B·q after a fill.
    pub fn compute_functions(
        &mut self,
        func_data: &FunctionOutputData,
        jac_data: &JacobianData,
        dec_vector: &Array1<f64>,
    ) -> Result<Array1<f64>, ConfigError> {
        let q = self.fill_user_nlp_matrices(func_data, jac_data)?;
        self.data.compute_functions(&q, dec_vector)
    }

    /// Assemble f = A·z + B·q and J = A + B·D after a fill.
    pub fn compute_func_and_jac(
        &mut self,
        func_data: &FunctionOutputData,
        jac_data: &JacobianData,
        dec_vector: &Array1<f64>,
    ) -> Result<(Array1<f64>, CsMat<f64>), ConfigError> {
        let q = self.fill_user_nlp_matrices(func_data, jac_data)?;
        let f = self.data.compute_functions(&q, dec_vector)?;
        let jac = self.data.compute_jacobian()?;
        Ok((f, jac))
    }

    /// The assembled whole-problem 0/1 pattern, cached after the first
    /// call.
    pub fn sparsity_pattern(&mut self) -> Result<&CsMat<f64>, ConfigError> {
        self.data.jac_sparsity_pattern()
    }
}
