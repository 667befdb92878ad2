//! Value containers for one evaluation point's inputs and one function
//! group's outputs.

use ndarray::{Array1, Array2};

use crate::types::ConfigError;

// ─────────────────────────────────────────────────────────────
//  FunctionInputData
// ─────────────────────────────────────────────────────────────

/// Snapshot of one evaluation point's inputs: state vector, time
/// scalar, static vector, and owning phase number.
///
/// One instance exists per phase per point (initial/final), built at
/// manager initialization and mutated in place during perturbation
/// sweeps.  `is_perturbing`/`is_sparsity` tell the user function that
/// the current values are off-nominal.
#[derive(Debug, Clone)]
pub struct FunctionInputData {
    phase_num: usize,
    state: Array1<f64>,
    time: f64,
    statics: Array1<f64>,
    is_perturbing: bool,
    is_sparsity: bool,
}

impl FunctionInputData {
    pub fn new(phase_num: usize, num_state_vars: usize, num_static_vars: usize) -> Self {
        Self {
            phase_num,
            state: Array1::zeros(num_state_vars),
            time: 0.0,
            statics: Array1::zeros(num_static_vars),
            is_perturbing: false,
            is_sparsity: false,
        }
    }

    pub fn phase_num(&self) -> usize { self.phase_num }
    pub fn state(&self) -> &Array1<f64> { &self.state }
    pub fn time(&self) -> f64 { self.time }
    pub fn statics(&self) -> &Array1<f64> { &self.statics }
    pub fn is_perturbing(&self) -> bool { self.is_perturbing }
    pub fn is_sparsity(&self) -> bool { self.is_sparsity }

    pub fn set_state(&mut self, state: &Array1<f64>) {
        self.state.assign(state);
    }

    pub fn set_state_element(&mut self, idx: usize, value: f64)
        -> Result<(), ConfigError> {
        if idx >= self.state.len() {
            return Err(ConfigError::IndexOutOfRange {
                what: "input state element",
                phase: self.phase_num,
                row: idx,
                col: 0,
            });
        }
        self.state[idx] = value;
        Ok(())
    }

    pub fn set_time(&mut self, time: f64) {
        self.time = time;
    }

    pub fn set_statics(&mut self, statics: &Array1<f64>) {
        self.statics.assign(statics);
    }

    pub fn set_static_element(&mut self, idx: usize, value: f64)
        -> Result<(), ConfigError> {
        if idx >= self.statics.len() {
            return Err(ConfigError::IndexOutOfRange {
                what: "input static element",
                phase: self.phase_num,
                row: idx,
                col: 0,
            });
        }
        self.statics[idx] = value;
        Ok(())
    }

    pub fn set_is_perturbing(&mut self, flag: bool) {
        self.is_perturbing = flag;
    }

    pub fn set_is_sparsity(&mut self, flag: bool) {
        self.is_sparsity = flag;
    }
}

// ─────────────────────────────────────────────────────────────
//  FunctionOutputData
// ─────────────────────────────────────────────────────────────

/// One function group's output: values, names, and constraint bounds.
#[derive(Debug, Clone)]
pub struct FunctionOutputData {
    functions: Array1<f64>,
    names: Vec<String>,
    lower: Array1<f64>,
    upper: Array1<f64>,
}

impl FunctionOutputData {
    /// Bounds and (optional) names must match the function count.
    pub fn new(
        functions: Array1<f64>,
        lower: Array1<f64>,
        upper: Array1<f64>,
    ) -> Result<Self, ConfigError> {
        let n = functions.len();
        if lower.len() != n {
            return Err(ConfigError::SizeMismatch {
                what: "function lower bounds".into(),
                expected: n,
                got: lower.len(),
            });
        }
        if upper.len() != n {
            return Err(ConfigError::SizeMismatch {
                what: "function upper bounds".into(),
                expected: n,
                got: upper.len(),
            });
        }
        Ok(Self { functions, names: Vec::new(), lower, upper })
    }

    pub fn with_names(mut self, names: Vec<String>) -> Result<Self, ConfigError> {
        if names.len() != self.functions.len() {
            return Err(ConfigError::SizeMismatch {
                what: "function names".into(),
                expected: self.functions.len(),
                got: names.len(),
            });
        }
        self.names = names;
        Ok(self)
    }

    /// A group with no functions declared.
    pub fn empty() -> Self {
        Self {
            functions: Array1::zeros(0),
            names: Vec::new(),
            lower: Array1::zeros(0),
            upper: Array1::zeros(0),
        }
    }

    pub fn has_functions(&self) -> bool {
        !self.functions.is_empty()
    }

    pub fn num_functions(&self) -> usize {
        self.functions.len()
    }

    pub fn functions(&self) -> &Array1<f64> { &self.functions }
    pub fn names(&self) -> &[String] { &self.names }
    pub fn lower_bounds(&self) -> &Array1<f64> { &self.lower }
    pub fn upper_bounds(&self) -> &Array1<f64> { &self.upper }

    pub fn set_functions(&mut self, functions: Array1<f64>)
        -> Result<(), ConfigError> {
        if functions.len() != self.functions.len() {
            return Err(ConfigError::SizeMismatch {
                what: "function values".into(),
                expected: self.functions.len(),
                got: functions.len(),
            });
        }
        self.functions = functions;
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────
//  PathFuncProperties
// ─────────────────────────────────────────────────────────────

/// Immutable snapshot of a declared path function: one sparsity-pattern
/// triple, a function count, and the variable-class flags.
#[derive(Debug, Clone)]
pub struct PathFuncProperties {
    state_jac_pattern: Array2<f64>,
    time_jac_pattern: Array2<f64>,
    control_jac_pattern: Array2<f64>,
    num_functions: usize,
    has_state_vars: bool,
    has_control_vars: bool,
}

impl PathFuncProperties {
    pub fn new(
        state_jac_pattern: Array2<f64>,
        time_jac_pattern: Array2<f64>,
        control_jac_pattern: Array2<f64>,
        num_functions: usize,
        has_state_vars: bool,
        has_control_vars: bool,
    ) -> Result<Self, ConfigError> {
        for (name, pat) in [
            ("state pattern", &state_jac_pattern),
            ("time pattern", &time_jac_pattern),
            ("control pattern", &control_jac_pattern),
        ] {
            if pat.nrows() != num_functions {
                return Err(ConfigError::SizeMismatch {
                    what: name.into(),
                    expected: num_functions,
                    got: pat.nrows(),
                });
            }
        }
        Ok(Self {
            state_jac_pattern,
            time_jac_pattern,
            control_jac_pattern,
            num_functions,
            has_state_vars,
            has_control_vars,
        })
    }

    pub fn state_jac_pattern(&self) -> &Array2<f64> { &self.state_jac_pattern }
    pub fn time_jac_pattern(&self) -> &Array2<f64> { &self.time_jac_pattern }
    pub fn control_jac_pattern(&self) -> &Array2<f64> { &self.control_jac_pattern }
    pub fn num_functions(&self) -> usize { self.num_functions }
    pub fn has_state_vars(&self) -> bool { self.has_state_vars }
    pub fn has_control_vars(&self) -> bool { self.has_control_vars }
}
