/// Core Module for addrdesk
///
/// Shared infrastructure: the error taxonomy and the data-access layer
/// (connection scope, statement execution and dispatch, schema).

pub mod db;
pub mod error;

// Re-export commonly used types for convenience
pub use error::{DeskError, OperationResult, Result};
