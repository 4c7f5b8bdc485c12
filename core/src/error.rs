use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ComputeError {
    #[error("{model}: positive shift {shift} requested")]
    PositiveShift { model: String, shift: i32 },

    #[error("{model}: shift too large ({shift}, {depth} value(s) retained for {variable})")]
    ShiftTooLarge {
        model: String,
        variable: String,
        shift: i32,
        depth: usize,
    },

    #[error("{model}: unknown variable {variable}")]
    UnknownVariable { model: String, variable: String },

    #[error("{0}")]
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    #[error("no dynamics registered under '{0}'")]
    UnknownDynamics(String),

    #[error("the dynamics registry has been shut down")]
    RegistryClosed,

    #[error("duplicate model name '{name}' in '{parent}'")]
    DuplicateModel { parent: String, name: String },

    #[error("connection in '{parent}' references unknown model '{model}'")]
    UnknownModel { parent: String, model: String },

    #[error("model '{model}' has no {direction} port '{port}'")]
    UnknownPort {
        model: String,
        port: String,
        direction: &'static str,
    },

    #[error("condition '{key}' should be {expected}, found {found}")]
    InvalidCondition {
        key: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("model '{0}' has no timestep and no dependency to learn one from")]
    MissingTimeStep(String),

    #[error("observable references unknown model '{0}'")]
    UnknownObservable(String),

    #[error("invalid model graph: {0}")]
    InvalidGraph(String),

    #[error("nested simulation '{model}' failed: {reason}")]
    Nested { model: String, reason: String },

    #[error("view '{view}' would take {samples} samples, the limit is {limit}")]
    TooManySamples { view: String, samples: u64, limit: u64 },
}

impl SimError {
    /// Stable non-zero code reported through [`RunError`].
    pub fn code(&self) -> i32 {
        match self {
            SimError::UnknownDynamics(_) => 1,
            SimError::RegistryClosed => 2,
            SimError::DuplicateModel { .. } => 3,
            SimError::UnknownModel { .. } => 4,
            SimError::UnknownPort { .. } => 5,
            SimError::InvalidCondition { .. } => 6,
            SimError::MissingTimeStep(_) => 7,
            SimError::UnknownObservable(_) => 8,
            SimError::InvalidGraph(_) => 9,
            SimError::Nested { .. } => 10,
            SimError::TooManySamples { .. } => 11,
        }
    }
}

/// Structured error returned by the driver: callers inspect it instead of
/// unwinding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("simulation failed ({code}): {message}")]
pub struct RunError {
    pub code: i32,
    pub message: String,
}

impl RunError {
    pub const PANIC: i32 = 100;

    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl From<SimError> for RunError {
    fn from(err: SimError) -> Self {
        RunError::new(err.code(), err.to_string())
    }
}

pub type SimResult<T> = Result<T, SimError>;
