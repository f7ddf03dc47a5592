//! Error types shared by the task units, the runtime and the driver.

use thiserror::Error;

/// Failure of a single task unit.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskError {
    #[error("identifier source exhausted (bound {bound})")]
    ExhaustedIdentifierSource { bound: u32 },

    #[error("payload source failed: {0}")]
    Payload(#[from] PayloadError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PayloadError {
    /// The source is configured to produce zero values.
    #[error("payload source produces empty payloads")]
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    /// Nothing is ready, no timer is pending, and the root future is not done.
    #[error("runtime stalled with {pending} pending task(s)")]
    Stalled { pending: usize },
}

/// Why a strategy run did not complete.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StrategyError {
    #[error(transparent)]
    Task(#[from] TaskError),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid tick length `{value}`: expected a positive number of milliseconds")]
    InvalidTick { value: String },

    #[error("invalid log level `{value}`")]
    InvalidLogLevel { value: String },
}
