//! Per-phase Jacobian storage for one function group (boundary or
//! cost).
//!
//! For every phase the group stores five Jacobian blocks keyed by
//! [`JacBlock`], five matching 0/1 sparsity-pattern blocks, five
//! dependency flags, and the whole-problem column indices of the
//! phase's initial/final state, initial/final time, and static
//! variables.  Shapes are frozen at construction; every mutator and
//! reader rejects out-of-range (phase, row, col) rather than clamping.

use ndarray::Array2;

use crate::phase::Phase;
use crate::types::{ConfigError, JacBlock};

fn slot(block: JacBlock) -> usize {
    match block {
        JacBlock::InitTime => 0,
        JacBlock::FinalTime => 1,
        JacBlock::InitState => 2,
        JacBlock::FinalState => 3,
        JacBlock::Static => 4,
    }
}

#[derive(Debug, Clone)]
struct PhaseBlocks {
    jac: [Array2<f64>; 5],
    pattern: [Array2<f64>; 5],
    deps: [bool; 5],
    init_state_idxs: Vec<usize>,
    final_state_idxs: Vec<usize>,
    init_time_idx: usize,
    final_time_idx: usize,
    static_idxs: Vec<usize>,
}

#[derive(Debug, Clone)]
pub struct JacobianData {
    num_functions: usize,
    has_functions: bool,
    phases: Vec<PhaseBlocks>,
}

impl JacobianData {
    /// Allocate all blocks from the phase variable counts and record
    /// whole-problem offsets (`phase-local + dec_vec_start_idxs[p]`).
    pub fn initialize(
        num_functions: usize,
        has_functions: bool,
        phases: &[Phase],
        dec_vec_start_idxs: &[usize],
    ) -> Result<Self, ConfigError> {
        if phases.is_empty() {
            return Err(ConfigError::EmptyPhaseList);
        }
        if dec_vec_start_idxs.len() != phases.len() {
            return Err(ConfigError::SizeMismatch {
                what: "decision-vector start indices".into(),
                expected: phases.len(),
                got: dec_vec_start_idxs.len(),
            });
        }

        let mut blocks = Vec::with_capacity(phases.len());
        for (phase, &offset) in phases.iter().zip(dec_vec_start_idxs) {
            let n_state = phase.num_state_vars();
            // A phase without statics keeps a single zero column so the
            // block shape stays well-formed.
            let n_static_cols = phase.num_static_vars().max(1);

            let shape = |b: JacBlock| match b {
                JacBlock::InitTime | JacBlock::FinalTime => (num_functions, 1),
                JacBlock::InitState | JacBlock::FinalState => (num_functions, n_state),
                JacBlock::Static => (num_functions, n_static_cols),
            };
            let jac = JacBlock::ALL.map(|b| Array2::zeros(shape(b)));
            let pattern = JacBlock::ALL.map(|b| Array2::zeros(shape(b)));

            let dv = phase.decision_vector();
            blocks.push(PhaseBlocks {
                jac,
                pattern,
                deps: [false; 5],
                init_state_idxs: dv.initial_state_idxs()
                    .iter().map(|&i| i + offset).collect(),
                final_state_idxs: dv.final_state_idxs()
                    .iter().map(|&i| i + offset).collect(),
                init_time_idx: dv.initial_time_idx() + offset,
                final_time_idx: dv.final_time_idx() + offset,
                static_idxs: dv.static_idxs()
                    .iter().map(|&i| i + offset).collect(),
            });
        }

        Ok(Self { num_functions, has_functions, phases: blocks })
    }

    pub fn num_functions(&self) -> usize { self.num_functions }
    pub fn has_functions(&self) -> bool { self.has_functions }
    pub fn num_phases(&self) -> usize { self.phases.len() }

    fn check_phase(&self, phase: usize) -> Result<&PhaseBlocks, ConfigError> {
        self.phases.get(phase).ok_or(ConfigError::IndexOutOfRange {
            what: "jacobian data phase",
            phase,
            row: 0,
            col: 0,
        })
    }

    fn check_phase_mut(&mut self, phase: usize)
        -> Result<&mut PhaseBlocks, ConfigError> {
        if phase >= self.phases.len() {
            return Err(ConfigError::IndexOutOfRange {
                what: "jacobian data phase",
                phase,
                row: 0,
                col: 0,
            });
        }
        Ok(&mut self.phases[phase])
    }

    fn check_entry(
        mat: &Array2<f64>,
        what: &'static str,
        phase: usize,
        row: usize,
        col: usize,
    ) -> Result<(), ConfigError> {
        if row >= mat.nrows() || col >= mat.ncols() {
            return Err(ConfigError::IndexOutOfRange { what, phase, row, col });
        }
        Ok(())
    }

    // ── Jacobian values ──────────────────────────────────────

    pub fn set_jacobian(
        &mut self,
        block: JacBlock,
        phase: usize,
        row: usize,
        col: usize,
        value: f64,
    ) -> Result<(), ConfigError> {
        let pb = self.check_phase_mut(phase)?;
        let mat = &mut pb.jac[slot(block)];
        Self::check_entry(mat, block.name(), phase, row, col)?;
        mat[[row, col]] = value;
        Ok(())
    }

    pub fn jacobian_entry(
        &self,
        block: JacBlock,
        phase: usize,
        row: usize,
        col: usize,
    ) -> Result<f64, ConfigError> {
        let pb = self.check_phase(phase)?;
        let mat = &pb.jac[slot(block)];
        Self::check_entry(mat, block.name(), phase, row, col)?;
        Ok(mat[[row, col]])
    }

    pub fn jacobian(&self, block: JacBlock, phase: usize)
        -> Result<&Array2<f64>, ConfigError> {
        Ok(&self.check_phase(phase)?.jac[slot(block)])
    }

    // ── Sparsity patterns ────────────────────────────────────

    pub fn set_pattern(
        &mut self,
        block: JacBlock,
        phase: usize,
        row: usize,
        col: usize,
        value: f64,
    ) -> Result<(), ConfigError> {
        let pb = self.check_phase_mut(phase)?;
        let mat = &mut pb.pattern[slot(block)];
        Self::check_entry(mat, block.name(), phase, row, col)?;
        mat[[row, col]] = value;
        Ok(())
    }

    pub fn pattern_entry(
        &self,
        block: JacBlock,
        phase: usize,
        row: usize,
        col: usize,
    ) -> Result<f64, ConfigError> {
        let pb = self.check_phase(phase)?;
        let mat = &pb.pattern[slot(block)];
        Self::check_entry(mat, block.name(), phase, row, col)?;
        Ok(mat[[row, col]])
    }

    pub fn pattern(&self, block: JacBlock, phase: usize)
        -> Result<&Array2<f64>, ConfigError> {
        Ok(&self.check_phase(phase)?.pattern[slot(block)])
    }

    // ── Dependency flags ─────────────────────────────────────

    pub fn set_dependency(&mut self, block: JacBlock, phase: usize, flag: bool)
        -> Result<(), ConfigError> {
        self.check_phase_mut(phase)?.deps[slot(block)] = flag;
        Ok(())
    }

    pub fn dependency(&self, block: JacBlock, phase: usize)
        -> Result<bool, ConfigError> {
        Ok(self.check_phase(phase)?.deps[slot(block)])
    }

    // ── Whole-problem indices ────────────────────────────────

    pub fn init_state_idxs(&self, phase: usize) -> Result<&[usize], ConfigError> {
        Ok(&self.check_phase(phase)?.init_state_idxs)
    }

    pub fn final_state_idxs(&self, phase: usize) -> Result<&[usize], ConfigError> {
        Ok(&self.check_phase(phase)?.final_state_idxs)
    }

    pub fn init_time_idx(&self, phase: usize) -> Result<usize, ConfigError> {
        Ok(self.check_phase(phase)?.init_time_idx)
    }

    pub fn final_time_idx(&self, phase: usize) -> Result<usize, ConfigError> {
        Ok(self.check_phase(phase)?.final_time_idx)
    }

    /// Whole-problem static indices; empty when the phase has none.
    pub fn static_idxs(&self, phase: usize) -> Result<&[usize], ConfigError> {
        Ok(&self.check_phase(phase)?.static_idxs)
    }
}
