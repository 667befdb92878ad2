use std::fmt;

// ─────────────────────────────────────────────────────────────
//  Error types
// ─────────────────────────────────────────────────────────────

/// Fatal problem-setup and structural errors.
///
/// Raised at initialization-time validation or immediately by any
/// bounds-checked accessor.  A `ConfigError` means the problem is
/// malformed: nothing is retried, nothing is clamped, and the whole
/// optimization attempt must be treated as failed.
#[derive(Debug)]
pub enum ConfigError {
    /// The phase list is empty.
    EmptyPhaseList,
    /// A function group that must be non-empty has zero functions.
    NoFunctions(&'static str),
    /// Two containers that must agree in size do not.
    SizeMismatch { what: String, expected: usize, got: usize },
    /// A (phase, row, col) access outside a frozen matrix shape.
    IndexOutOfRange { what: &'static str, phase: usize, row: usize, col: usize },
    /// A numeric write at a coordinate absent from a frozen sparsity
    /// structure.
    PatternMismatch { row: usize, col: usize },
    /// Anything else that makes the setup unusable.
    InvalidSetup(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyPhaseList => write!(f, "phase list is empty"),
            Self::NoFunctions(group) =>
                write!(f, "{group} has zero functions"),
            Self::SizeMismatch { what, expected, got } =>
                write!(f, "size mismatch in {what}: expected {expected}, got {got}"),
            Self::IndexOutOfRange { what, phase, row, col } =>
                write!(f, "index out of range in {what}: phase {phase}, ({row},{col})"),
            Self::PatternMismatch { row, col } =>
                write!(f, "sparsity pattern mismatch: ({row},{col}) not in frozen structure"),
            Self::InvalidSetup(msg) => write!(f, "invalid setup: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Recoverable per-evaluation errors.
///
/// `User` wraps a failure thrown by the user point function, annotated
/// with the call-site context; it is caught exactly once at the
/// evaluation call and re-thrown, never swallowed.  Structural failures
/// hit during assembly propagate as `Config`.
#[derive(Debug)]
pub enum EvalError {
    /// The user point function failed.  `context` names the call site.
    User { context: String, message: String },
    /// A structural error surfaced while assembling function output.
    Config(ConfigError),
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User { context, message } =>
                write!(f, "user function error in {context}: {message}"),
            Self::Config(e) => write!(f, "configuration error: {e}"),
        }
    }
}

impl std::error::Error for EvalError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigError> for EvalError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ─────────────────────────────────────────────────────────────
//  Jacobian block naming
// ─────────────────────────────────────────────────────────────

/// The five Jacobian families stored per phase for a function group.
///
/// Time blocks are single-column; state blocks have one column per
/// state variable; the static block has one column per static
/// parameter (or a single zero column when the phase has none).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JacBlock {
    InitTime,
    FinalTime,
    InitState,
    FinalState,
    Static,
}

impl JacBlock {
    /// All five families, in storage order.
    pub const ALL: [JacBlock; 5] = [
        JacBlock::InitTime,
        JacBlock::FinalTime,
        JacBlock::InitState,
        JacBlock::FinalState,
        JacBlock::Static,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::InitTime => "init-time",
            Self::FinalTime => "final-time",
            Self::InitState => "init-state",
            Self::FinalState => "final-state",
            Self::Static => "static",
        }
    }
}

/// How a boundary-function row obtains its derivatives.
///
/// Decided once per row at manager initialization: rows covered by an
/// analytic provider keep the provider's values; the remaining legacy
/// rows are forward-differenced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JacobianSource {
    FiniteDifference,
    Analytic,
}
