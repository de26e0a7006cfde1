/// Addrdesk Error Module
///
/// This module defines the error taxonomy of the data-access layer and the
/// uniform soft-result shape handed to front ends.
use thiserror::Error;

/// Error type for every addrdesk operation.
///
/// Driver errors never escape the data-access layer as `rusqlite::Error`:
/// they are folded into `Connection` (could not open a connection) or
/// `Query` (a statement failed on an open connection).
#[derive(Error, Debug)]
pub enum DeskError {
    /// Opening or keeping a database connection failed
    #[error("Connection error: {0}")]
    Connection(String),

    /// A statement failed after the connection was obtained; already rolled back
    #[error("Query error: {0}")]
    Query(String),

    /// The requested operation kind or its arguments are not supported
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// Required fields are missing or the edit changes nothing
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration loading and validation errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File system and I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DeskError {
    /// Message suitable for a modal error box: the payload without the kind prefix.
    pub fn user_message(&self) -> String {
        match self {
            DeskError::Connection(msg) => format!("Cannot reach the database: {}", msg),
            DeskError::Query(msg) => format!("The database rejected the request: {}", msg),
            DeskError::InvalidOperation(msg) | DeskError::Validation(msg) | DeskError::Config(msg) => {
                msg.clone()
            }
            DeskError::Io(e) => e.to_string(),
            DeskError::Json(e) => e.to_string(),
        }
    }
}

/// Type alias for Result to use DeskError as the error type.
pub type Result<T> = std::result::Result<T, DeskError>;

/// Uniform outcome of a write or dispatched call.
///
/// `data` carries display rows (for example the reloaded reference list after
/// a reference edit); `error` carries a soft failure message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationResult {
    pub success: bool,
    pub data: Option<Vec<Vec<String>>>,
    pub error: Option<String>,
}

impl OperationResult {
    pub fn ok() -> Self {
        OperationResult {
            success: true,
            data: None,
            error: None,
        }
    }

    pub fn with_data(rows: Vec<Vec<String>>) -> Self {
        OperationResult {
            success: true,
            data: Some(rows),
            error: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        OperationResult {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}
