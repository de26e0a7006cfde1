/// Database Module
///
/// The data-access layer of addrdesk, split by concern:
/// - **Connection Scope** (`connection.rs`): one connection per logical operation, released on every exit path
/// - **Query Execution** (`query.rs`): transactional single-statement execution and row formatting
/// - **Dispatch** (`dispatch.rs`): the four canonical reference-table statement shapes
/// - **Schema** (`schema.rs`): table and column identifiers, bootstrap DDL
///
/// ## Error Handling
///
/// `execute` raises `DeskError::Query`; `dispatch` downgrades it to a failed
/// `OperationResult`. Connection failures are always raised.
pub mod connection;
pub mod dispatch;
pub mod query;
pub mod schema;

pub use connection::*;
pub use dispatch::*;
pub use query::*;
pub use schema::*;
