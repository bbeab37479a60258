//! Structured errors for tool arguments the engine never sees.

use rmcp::model::{ErrorCode, ErrorData as McpError};

#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    /// Invalid or contradictory tool parameters.
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// A page message whose `type` the worker does not understand.
    #[error("UNKNOWN_MESSAGE: {0}")]
    UnknownMessage(String),
}

impl From<WorkerError> for McpError {
    fn from(err: WorkerError) -> Self {
        let code = match &err {
            WorkerError::InvalidInput(_) => -32602,
            WorkerError::UnknownMessage(_) => -32601,
        };

        McpError { code: ErrorCode(code), message: err.to_string().into(), data: None }
    }
}
