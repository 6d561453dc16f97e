use crate::value::ValueKind;
use thiserror::Error;

/// Errors raised when a typed read from a `Context` or `Params` map fails.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ContextError {
    #[error("Key '{key}' not found in the provided map")]
    MissingKey { key: String },

    #[error("Key '{key}' holds a value of kind {found}, but {expected} was expected")]
    WrongKind {
        key: String,
        expected: ValueKind,
        found: ValueKind,
    },
}

/// Errors that can occur while building or running a flow.
#[derive(Error, Debug)]
pub enum FlowError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid graph: {0}")]
    InvalidGraph(String),

    #[error(transparent)]
    Context(#[from] ContextError),

    #[error("Execution failed: {0}")]
    Execution(String),

    #[error("Node '{node}' failed after {attempts} attempt(s): {source}")]
    RetriesExhausted {
        node: String,
        attempts: u32,
        #[source]
        source: Box<FlowError>,
    },

    #[error("Fallback of node '{node}' failed after the original failure '{original}': {source}")]
    FallbackFailed {
        node: String,
        original: String,
        #[source]
        source: Box<FlowError>,
    },

    #[error("'{method}' of node '{node}' must not be called directly")]
    SealedMethodMisuse { node: String, method: &'static str },

    #[error("Orchestration stopped after reaching the step limit of {limit}")]
    StepLimitExceeded { limit: usize },
}

impl FlowError {
    /// Shorthand for a failure raised by user node logic.
    pub fn execution(message: impl std::fmt::Display) -> Self {
        FlowError::Execution(message.to_string())
    }

    /// Builds the error the default fallback hooks raise.
    pub fn retries_exhausted(node: impl Into<String>, attempts: u32, last: FlowError) -> Self {
        FlowError::RetriesExhausted {
            node: node.into(),
            attempts,
            source: Box::new(last),
        }
    }
}
