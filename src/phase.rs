//! The phase surface consumed by the function-assembly layer.
//!
//! A `Phase` is one continuously discretized trajectory segment.  This
//! crate only reads its variable counts and bounds and transiently
//! writes its decision vector during sparsity sampling; the
//! transcription internals live elsewhere.

use ndarray::Array1;

use crate::decision_vector::DecisionVector;
use crate::types::ConfigError;

#[derive(Debug)]
pub struct Phase {
    phase_num: usize,
    dec_vec: Box<dyn DecisionVector>,
    state_lower: Array1<f64>,
    state_upper: Array1<f64>,
    static_lower: Array1<f64>,
    static_upper: Array1<f64>,
    time_lower: f64,
    time_upper: f64,
}

impl Phase {
    /// Bound lengths must match the decision vector's variable counts.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        phase_num: usize,
        dec_vec: Box<dyn DecisionVector>,
        state_lower: Array1<f64>,
        state_upper: Array1<f64>,
        static_lower: Array1<f64>,
        static_upper: Array1<f64>,
        time_lower: f64,
        time_upper: f64,
    ) -> Result<Self, ConfigError> {
        let ns = dec_vec.num_state_vars();
        let nst = dec_vec.num_static_params();
        for (name, got, expected) in [
            ("state lower bound", state_lower.len(), ns),
            ("state upper bound", state_upper.len(), ns),
            ("static lower bound", static_lower.len(), nst),
            ("static upper bound", static_upper.len(), nst),
        ] {
            if got != expected {
                return Err(ConfigError::SizeMismatch {
                    what: name.into(),
                    expected,
                    got,
                });
            }
        }
        Ok(Self {
            phase_num,
            dec_vec,
            state_lower,
            state_upper,
            static_lower,
            static_upper,
            time_lower,
            time_upper,
        })
    }

    pub fn phase_number(&self) -> usize { self.phase_num }

    pub fn num_state_vars(&self) -> usize { self.dec_vec.num_state_vars() }
    pub fn num_control_vars(&self) -> usize { self.dec_vec.num_control_vars() }
    pub fn num_static_vars(&self) -> usize { self.dec_vec.num_static_params() }

    pub fn decision_vector(&self) -> &dyn DecisionVector {
        self.dec_vec.as_ref()
    }

    pub fn decision_vector_mut(&mut self) -> &mut dyn DecisionVector {
        self.dec_vec.as_mut()
    }

    pub fn state_lower_bound(&self) -> &Array1<f64> { &self.state_lower }
    pub fn state_upper_bound(&self) -> &Array1<f64> { &self.state_upper }
    pub fn static_lower_bound(&self) -> &Array1<f64> { &self.static_lower }
    pub fn static_upper_bound(&self) -> &Array1<f64> { &self.static_upper }
    pub fn time_lower_bound(&self) -> f64 { self.time_lower }
    pub fn time_upper_bound(&self) -> f64 { self.time_upper }
}
