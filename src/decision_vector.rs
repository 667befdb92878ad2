//! Per-phase decision-vector layout.
//!
//! A phase's optimization variables live in one flattened vector:
//!
//! ```text
//!     [ t0, tf, (state|control) interleaved per mesh/stage point,
//!       static params, integral params ]
//! ```
//!
//! `DecisionVector` is the layout interface the rest of the crate
//! consumes; `DecVecBetts` is the interleaved layout used by the
//! transcription schemes (Radau, Hermite–Simpson share it).  All index
//! accessors return phase-local indices; whole-problem offsets are
//! applied by the caller.

use ndarray::{Array1, Array2};

use crate::types::ConfigError;

// ─────────────────────────────────────────────────────────────
//  Layout interface
// ─────────────────────────────────────────────────────────────

/// Phase-local variable layout, polymorphic over discretization scheme.
pub trait DecisionVector: std::fmt::Debug {
    fn num_state_vars(&self) -> usize;
    fn num_control_vars(&self) -> usize;
    fn num_static_params(&self) -> usize;
    fn num_integral_params(&self) -> usize;
    fn num_state_points(&self) -> usize;
    fn num_control_points(&self) -> usize;

    /// Total length of the phase-local decision vector.
    fn num_decision_params(&self) -> usize;

    /// The live flattened vector.
    fn vector(&self) -> &Array1<f64>;

    /// Replace the whole vector.  Length must match exactly.
    fn set_vector(&mut self, values: &[f64]) -> Result<(), ConfigError>;

    /// Read one element, bounds-checked.
    fn element(&self, idx: usize) -> Result<f64, ConfigError>;

    /// Write one element, bounds-checked.
    fn set_element(&mut self, idx: usize, value: f64) -> Result<(), ConfigError>;

    // Index accessors (phase-local).

    fn initial_time_idx(&self) -> usize;
    fn final_time_idx(&self) -> usize;
    fn initial_state_idxs(&self) -> Vec<usize>;
    fn final_state_idxs(&self) -> Vec<usize>;

    /// Static-parameter indices; empty when the phase has none.
    fn static_idxs(&self) -> Vec<usize>;

    /// Integral-parameter indices; empty when the phase has none.
    fn integral_idxs(&self) -> Vec<usize>;

    fn state_idxs_at_mesh_point(&self, mesh: usize, stage: usize)
        -> Result<Vec<usize>, ConfigError>;
    fn control_idxs_at_mesh_point(&self, mesh: usize, stage: usize)
        -> Result<Vec<usize>, ConfigError>;

    // Live-value accessors.

    fn first_time(&self) -> f64;
    fn last_time(&self) -> f64;
    fn set_times(&mut self, initial: f64, final_: f64);
    fn first_state_vector(&self) -> Array1<f64>;
    fn last_state_vector(&self) -> Array1<f64>;

    fn state_vector_at(&self, mesh: usize, stage: usize)
        -> Result<Array1<f64>, ConfigError>;
    fn set_state_vector_at(&mut self, mesh: usize, stage: usize, values: &[f64])
        -> Result<(), ConfigError>;
    fn control_vector_at(&self, mesh: usize, stage: usize)
        -> Result<Array1<f64>, ConfigError>;
    fn set_control_vector_at(&mut self, mesh: usize, stage: usize, values: &[f64])
        -> Result<(), ConfigError>;

    /// All state values, `num_state_points × num_state_vars`.
    fn state_array(&self) -> Array2<f64>;
    fn set_state_array(&mut self, values: &Array2<f64>) -> Result<(), ConfigError>;

    /// All control values, `num_control_points × num_control_vars`.
    fn control_array(&self) -> Array2<f64>;
    fn set_control_array(&mut self, values: &Array2<f64>) -> Result<(), ConfigError>;

    fn static_vector(&self) -> Array1<f64>;
    fn set_static_vector(&mut self, values: &[f64]) -> Result<(), ConfigError>;
}

// ─────────────────────────────────────────────────────────────
//  Betts interleaved layout
// ─────────────────────────────────────────────────────────────

/// Interleaved state/control layout after Betts.
///
/// Each mesh interval contributes `1 + num_stage_points` evaluation
/// points; each point stores its state chunk immediately followed by
/// its control chunk.  The final mesh point carries a state chunk
/// always, and a control chunk only when the state and control meshes
/// have equal point counts.
#[derive(Debug, Clone)]
pub struct DecVecBetts {
    num_state_vars: usize,
    num_control_vars: usize,
    num_integral_params: usize,
    num_static_params: usize,
    num_state_mesh_points: usize,
    num_control_mesh_points: usize,
    num_state_stage_points: usize,
    num_control_stage_points: usize,

    num_state_points: usize,
    num_control_points: usize,
    num_state_params: usize,
    num_control_params: usize,
    num_decision_params: usize,
    num_state_and_control_vars: usize,
    num_stage_points: usize,
    has_control_at_final_mesh: bool,

    static_start_idx: usize,
    integral_start_idx: usize,

    decision_vector: Array1<f64>,
}

impl DecVecBetts {
    /// Compute and freeze the index layout.
    ///
    /// Fails on `num_state_vars == 0`, fewer than two state mesh
    /// points, a zero control mesh-point count, or unequal
    /// state/control stage-point counts.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        num_state_vars: usize,
        num_control_vars: usize,
        num_integral_params: usize,
        num_static_params: usize,
        num_state_mesh_points: usize,
        num_control_mesh_points: usize,
        num_state_stage_points: usize,
        num_control_stage_points: usize,
    ) -> Result<Self, ConfigError> {
        if num_state_vars == 0 {
            return Err(ConfigError::InvalidSetup(
                "decision vector requires at least one state variable".into(),
            ));
        }
        // One state mesh point would alias the initial and final state
        // chunks onto the same slots.
        if num_state_mesh_points < 2 {
            return Err(ConfigError::InvalidSetup(
                "decision vector requires at least two state mesh points".into(),
            ));
        }
        if num_control_mesh_points == 0 {
            return Err(ConfigError::InvalidSetup(
                "decision vector requires at least one control mesh point".into(),
            ));
        }
        if num_state_stage_points != num_control_stage_points {
            return Err(ConfigError::InvalidSetup(
                "state and control stage-point counts must be equal".into(),
            ));
        }

        let num_state_points =
            (num_state_mesh_points - 1) * (1 + num_state_stage_points) + 1;
        let has_control_at_final_mesh =
            num_state_mesh_points == num_control_mesh_points;
        let num_control_points = if has_control_at_final_mesh {
            (num_control_mesh_points - 1) * (1 + num_control_stage_points) + 1
        } else {
            num_control_mesh_points * (1 + num_control_stage_points)
        };

        let num_state_params = num_state_vars * num_state_points;
        let num_control_params = num_control_vars * num_control_points;
        let num_decision_params = num_state_params + num_control_params
            + num_integral_params + num_static_params + 2;

        let static_start_idx = 2 + num_state_params + num_control_params;
        let integral_start_idx = static_start_idx + num_static_params;

        Ok(Self {
            num_state_vars,
            num_control_vars,
            num_integral_params,
            num_static_params,
            num_state_mesh_points,
            num_control_mesh_points,
            num_state_stage_points,
            num_control_stage_points,
            num_state_points,
            num_control_points,
            num_state_params,
            num_control_params,
            num_decision_params,
            num_state_and_control_vars: num_state_vars + num_control_vars,
            num_stage_points: num_state_stage_points,
            has_control_at_final_mesh,
            static_start_idx,
            integral_start_idx,
            decision_vector: Array1::zeros(num_decision_params),
        })
    }

    fn validate_mesh_stage(&self, mesh: usize, stage: usize)
        -> Result<(), ConfigError> {
        if mesh >= self.num_state_mesh_points || stage > self.num_stage_points {
            return Err(ConfigError::IndexOutOfRange {
                what: "mesh/stage point",
                phase: 0,
                row: mesh,
                col: stage,
            });
        }
        // The final mesh point is a single point, stage 0 only.
        if mesh == self.num_state_mesh_points - 1 && stage != 0 {
            return Err(ConfigError::IndexOutOfRange {
                what: "mesh/stage point",
                phase: 0,
                row: mesh,
                col: stage,
            });
        }
        Ok(())
    }

    /// First index of the state chunk at (mesh, stage).
    fn state_chunk_start(&self, mesh: usize, stage: usize) -> usize {
        2 + mesh * (self.num_stage_points + 1) * self.num_state_and_control_vars
            + stage * self.num_state_and_control_vars
    }

    /// Mesh intervals that carry a full stage loop of control points.
    fn control_mesh_loops(&self) -> usize {
        if self.has_control_at_final_mesh {
            self.num_control_mesh_points - 1
        } else {
            self.num_control_mesh_points
        }
    }
}

impl DecisionVector for DecVecBetts {
    fn num_state_vars(&self) -> usize { self.num_state_vars }
    fn num_control_vars(&self) -> usize { self.num_control_vars }
    fn num_static_params(&self) -> usize { self.num_static_params }
    fn num_integral_params(&self) -> usize { self.num_integral_params }
    fn num_state_points(&self) -> usize { self.num_state_points }
    fn num_control_points(&self) -> usize { self.num_control_points }
    fn num_decision_params(&self) -> usize { self.num_decision_params }

    fn vector(&self) -> &Array1<f64> {
        &self.decision_vector
    }

    fn set_vector(&mut self, values: &[f64]) -> Result<(), ConfigError> {
        if values.len() != self.num_decision_params {
            return Err(ConfigError::SizeMismatch {
                what: "decision vector".into(),
                expected: self.num_decision_params,
                got: values.len(),
            });
        }
        self.decision_vector = Array1::from(values.to_vec());
        Ok(())
    }

    fn element(&self, idx: usize) -> Result<f64, ConfigError> {
        if idx >= self.num_decision_params {
            return Err(ConfigError::IndexOutOfRange {
                what: "decision vector element",
                phase: 0,
                row: idx,
                col: 0,
            });
        }
        Ok(self.decision_vector[idx])
    }

    fn set_element(&mut self, idx: usize, value: f64) -> Result<(), ConfigError> {
        if idx >= self.num_decision_params {
            return Err(ConfigError::IndexOutOfRange {
                what: "decision vector element",
                phase: 0,
                row: idx,
                col: 0,
            });
        }
        self.decision_vector[idx] = value;
        Ok(())
    }

    fn initial_time_idx(&self) -> usize { 0 }
    fn final_time_idx(&self) -> usize { 1 }

    fn initial_state_idxs(&self) -> Vec<usize> {
        let start = self.state_chunk_start(0, 0);
        (start..start + self.num_state_vars).collect()
    }

    fn final_state_idxs(&self) -> Vec<usize> {
        let start = self.state_chunk_start(self.num_state_mesh_points - 1, 0);
        (start..start + self.num_state_vars).collect()
    }

    fn static_idxs(&self) -> Vec<usize> {
        (self.static_start_idx..self.static_start_idx + self.num_static_params)
            .collect()
    }

    fn integral_idxs(&self) -> Vec<usize> {
        (self.integral_start_idx..self.integral_start_idx + self.num_integral_params)
            .collect()
    }

    fn state_idxs_at_mesh_point(&self, mesh: usize, stage: usize)
        -> Result<Vec<usize>, ConfigError> {
        self.validate_mesh_stage(mesh, stage)?;
        let start = self.state_chunk_start(mesh, stage);
        Ok((start..start + self.num_state_vars).collect())
    }

    fn control_idxs_at_mesh_point(&self, mesh: usize, stage: usize)
        -> Result<Vec<usize>, ConfigError> {
        self.validate_mesh_stage(mesh, stage)?;
        let start = self.state_chunk_start(mesh, stage) + self.num_state_vars;
        Ok((start..start + self.num_control_vars).collect())
    }

    fn first_time(&self) -> f64 {
        self.decision_vector[0]
    }

    fn last_time(&self) -> f64 {
        self.decision_vector[1]
    }

    fn set_times(&mut self, initial: f64, final_: f64) {
        self.decision_vector[0] = initial;
        self.decision_vector[1] = final_;
    }

    fn first_state_vector(&self) -> Array1<f64> {
        self.initial_state_idxs().iter()
            .map(|&i| self.decision_vector[i])
            .collect()
    }

    fn last_state_vector(&self) -> Array1<f64> {
        self.final_state_idxs().iter()
            .map(|&i| self.decision_vector[i])
            .collect()
    }

    fn state_vector_at(&self, mesh: usize, stage: usize)
        -> Result<Array1<f64>, ConfigError> {
        let idxs = self.state_idxs_at_mesh_point(mesh, stage)?;
        Ok(idxs.iter().map(|&i| self.decision_vector[i]).collect())
    }

    fn set_state_vector_at(&mut self, mesh: usize, stage: usize, values: &[f64])
        -> Result<(), ConfigError> {
        if values.len() != self.num_state_vars {
            return Err(ConfigError::SizeMismatch {
                what: "state vector".into(),
                expected: self.num_state_vars,
                got: values.len(),
            });
        }
        let idxs = self.state_idxs_at_mesh_point(mesh, stage)?;
        for (&i, &v) in idxs.iter().zip(values) {
            self.decision_vector[i] = v;
        }
        Ok(())
    }

    fn control_vector_at(&self, mesh: usize, stage: usize)
        -> Result<Array1<f64>, ConfigError> {
        let idxs = self.control_idxs_at_mesh_point(mesh, stage)?;
        Ok(idxs.iter().map(|&i| self.decision_vector[i]).collect())
    }

    fn set_control_vector_at(&mut self, mesh: usize, stage: usize, values: &[f64])
        -> Result<(), ConfigError> {
        if values.len() != self.num_control_vars {
            return Err(ConfigError::SizeMismatch {
                what: "control vector".into(),
                expected: self.num_control_vars,
                got: values.len(),
            });
        }
        let idxs = self.control_idxs_at_mesh_point(mesh, stage)?;
        for (&i, &v) in idxs.iter().zip(values) {
            self.decision_vector[i] = v;
        }
        Ok(())
    }

    fn state_array(&self) -> Array2<f64> {
        let mut arr = Array2::zeros((self.num_state_points, self.num_state_vars));
        let mut row = 0;
        for mesh in 0..self.num_state_mesh_points - 1 {
            for stage in 0..=self.num_state_stage_points {
                let start = self.state_chunk_start(mesh, stage);
                for s in 0..self.num_state_vars {
                    arr[[row, s]] = self.decision_vector[start + s];
                }
                row += 1;
            }
        }
        let start = self.state_chunk_start(self.num_state_mesh_points - 1, 0);
        for s in 0..self.num_state_vars {
            arr[[row, s]] = self.decision_vector[start + s];
        }
        arr
    }

    fn set_state_array(&mut self, values: &Array2<f64>) -> Result<(), ConfigError> {
        if values.nrows() != self.num_state_points
            || values.ncols() != self.num_state_vars {
            return Err(ConfigError::SizeMismatch {
                what: "state array rows*cols".into(),
                expected: self.num_state_points * self.num_state_vars,
                got: values.nrows() * values.ncols(),
            });
        }
        let mut row = 0;
        for mesh in 0..self.num_state_mesh_points - 1 {
            for stage in 0..=self.num_state_stage_points {
                let start = self.state_chunk_start(mesh, stage);
                for s in 0..self.num_state_vars {
                    self.decision_vector[start + s] = values[[row, s]];
                }
                row += 1;
            }
        }
        let start = self.state_chunk_start(self.num_state_mesh_points - 1, 0);
        for s in 0..self.num_state_vars {
            self.decision_vector[start + s] = values[[row, s]];
        }
        Ok(())
    }

    fn control_array(&self) -> Array2<f64> {
        let mut arr = Array2::zeros((self.num_control_points, self.num_control_vars));
        if self.num_control_vars == 0 {
            return arr;
        }
        let mut row = 0;
        for mesh in 0..self.control_mesh_loops() {
            for stage in 0..=self.num_control_stage_points {
                let start = self.state_chunk_start(mesh, stage) + self.num_state_vars;
                for c in 0..self.num_control_vars {
                    arr[[row, c]] = self.decision_vector[start + c];
                }
                row += 1;
            }
        }
        if self.has_control_at_final_mesh {
            let start = self.state_chunk_start(self.control_mesh_loops(), 0)
                + self.num_state_vars;
            for c in 0..self.num_control_vars {
                arr[[row, c]] = self.decision_vector[start + c];
            }
        }
        arr
    }

    fn set_control_array(&mut self, values: &Array2<f64>) -> Result<(), ConfigError> {
        if self.num_control_vars == 0 {
            return Ok(());
        }
        if values.nrows() != self.num_control_points
            || values.ncols() != self.num_control_vars {
            return Err(ConfigError::SizeMismatch {
                what: "control array rows*cols".into(),
                expected: self.num_control_points * self.num_control_vars,
                got: values.nrows() * values.ncols(),
            });
        }
        let mut row = 0;
        for mesh in 0..self.control_mesh_loops() {
            for stage in 0..=self.num_control_stage_points {
                let start = self.state_chunk_start(mesh, stage) + self.num_state_vars;
                for c in 0..self.num_control_vars {
                    self.decision_vector[start + c] = values[[row, c]];
                }
                row += 1;
            }
        }
        if self.has_control_at_final_mesh {
            let start = self.state_chunk_start(self.control_mesh_loops(), 0)
                + self.num_state_vars;
            for c in 0..self.num_control_vars {
                self.decision_vector[start + c] = values[[row, c]];
            }
        }
        Ok(())
    }

    fn static_vector(&self) -> Array1<f64> {
        self.static_idxs().iter()
            .map(|&i| self.decision_vector[i])
            .collect()
    }

    fn set_static_vector(&mut self, values: &[f64]) -> Result<(), ConfigError> {
        if values.len() != self.num_static_params {
            return Err(ConfigError::SizeMismatch {
                what: "static vector".into(),
                expected: self.num_static_params,
                got: values.len(),
            });
        }
        for (&i, &v) in self.static_idxs().iter().zip(values) {
            self.decision_vector[i] = v;
        }
        Ok(())
    }
}
