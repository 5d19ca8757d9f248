use std::path::PathBuf;

/// Errors related to configuration loading and parsing.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse config at {path}: {message}")]
    ParseError { path: PathBuf, message: String },
}

/// Errors raised while building a worker/flow catalog.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CatalogError {
    #[error("Duplicate action id in catalog: {0}")]
    DuplicateId(String),

    #[error("Flow '{0}' has no members")]
    EmptyFlow(String),
}

/// Errors related to decoding an inbound run request.
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    #[error("Malformed run request: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Invalid catalog: {0}")]
    Catalog(#[from] CatalogError),
}

/// The decision process could not produce a response at all.
#[derive(Debug, Clone, thiserror::Error)]
pub enum OracleError {
    #[error("{0}")]
    Transport(String),
}

/// Misuse of the trace recorder.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TraceError {
    #[error("cannot append nested entry under '{field}': no top-level entry recorded yet")]
    NoParentEntry { field: String },
}

/// Fatal conditions that end an orchestration run.
///
/// None of these are retried. The orchestrator converts every variant into a
/// failed run envelope; the variant name doubles as the error kind shown to
/// the caller.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RunError {
    #[error("Unable to find agent or flow '{id}' to execute. Check that it is registered and that the model returned a valid id.")]
    UnknownAction { id: String },

    #[error("Forced choice of '{expected}' was not honored: {detail}")]
    ForcedChoiceViolation { expected: String, detail: String },

    #[error("Agent '{name}' ({id}) failed: {output}")]
    RemoteExecution {
        id: String,
        name: String,
        output: String,
    },

    #[error("Decision oracle unavailable: {0}")]
    OracleTransport(#[from] OracleError),

    #[error("Run exceeded the limit of {limit} decision rounds")]
    RoundLimitExceeded { limit: usize },

    #[error("Run cancelled")]
    Cancelled,

    #[error(transparent)]
    Trace(#[from] TraceError),
}

impl RunError {
    /// Short, stable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            RunError::UnknownAction { .. } => "UnknownActionError",
            RunError::ForcedChoiceViolation { .. } => "ForcedChoiceViolation",
            RunError::RemoteExecution { .. } => "RemoteExecutionError",
            RunError::OracleTransport(_) => "OracleTransportError",
            RunError::RoundLimitExceeded { .. } => "RoundLimitExceeded",
            RunError::Cancelled => "Cancelled",
            RunError::Trace(_) => "TraceError",
        }
    }

    /// Human-readable description placed in a failed run envelope.
    pub fn to_response(&self) -> String {
        format!("An error occurred: {} - {}", self.kind(), self)
    }
}
