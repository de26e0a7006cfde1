/// Reference Table Dispatch Module
///
/// Builds and runs the four canonical statement shapes against a reference
/// table. Identifiers come from `ReferenceKind`; only values are bound as
/// parameters.

use crate::core::db::connection::{Connector, Database};
use crate::core::db::schema::ReferenceKind;
use crate::core::{DeskError, OperationResult, Result};
use rusqlite::types::Value;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, error};

/// Operation kinds understood by `dispatch`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Select,
    Insert,
    Update,
    Delete,
    /// Placeholder kind a form starts with before an action is picked; never dispatchable
    Default,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Select => "SELECT",
            Operation::Insert => "INSERT",
            Operation::Update => "UPDATE",
            Operation::Delete => "DELETE",
            Operation::Default => "DEFAULT",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = DeskError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().as_str() {
            "SELECT" => Ok(Operation::Select),
            "INSERT" => Ok(Operation::Insert),
            "UPDATE" => Ok(Operation::Update),
            "DELETE" => Ok(Operation::Delete),
            "DEFAULT" => Ok(Operation::Default),
            other => Err(DeskError::InvalidOperation(format!("Unsupported operation: {}", other))),
        }
    }
}

/// A statement text with its positional parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<Value>,
}

impl Statement {
    /// Builds the statement for `operation` on the reference table of `kind`.
    ///
    /// | operation | statement                                   | params        |
    /// |-----------|---------------------------------------------|---------------|
    /// | INSERT    | `INSERT INTO t (c) VALUES (?1)`             | new           |
    /// | DELETE    | `DELETE FROM t WHERE c = ?1`                | old           |
    /// | UPDATE    | `UPDATE t SET c = ?1 WHERE c = ?2`          | new, old      |
    /// | SELECT    | `SELECT c FROM t` [`WHERE c = ?1`]          | old if given  |
    ///
    /// Empty strings count as absent values. This is pure local validation:
    /// nothing touches the database.
    pub fn dispatch(
        kind: ReferenceKind,
        operation: Operation,
        old_value: Option<&str>,
        new_value: Option<&str>,
    ) -> Result<Statement> {
        let table = kind.table();
        let column = kind.column();
        let old_value = old_value.filter(|v| !v.is_empty());
        let new_value = new_value.filter(|v| !v.is_empty());
        let text = |v: &str| Value::Text(v.to_string());
        let missing = |what: &str| {
            DeskError::InvalidOperation(format!(
                "{} on [{}].[{}] requires {}",
                operation, table, column, what
            ))
        };

        let statement = match operation {
            Operation::Insert => {
                let new = new_value.ok_or_else(|| missing("a new value"))?;
                Statement {
                    sql: format!("INSERT INTO {} ({}) VALUES (?1)", table, column),
                    params: vec![text(new)],
                }
            }
            Operation::Delete => {
                let old = old_value.ok_or_else(|| missing("an old value"))?;
                Statement {
                    sql: format!("DELETE FROM {} WHERE {} = ?1", table, column),
                    params: vec![text(old)],
                }
            }
            Operation::Update => match (new_value, old_value) {
                (Some(new), Some(old)) => Statement {
                    sql: format!("UPDATE {} SET {} = ?1 WHERE {} = ?2", table, column, column),
                    params: vec![text(new), text(old)],
                },
                _ => return Err(missing("both an old and a new value")),
            },
            Operation::Select => match old_value {
                Some(old) => Statement {
                    sql: format!("SELECT {} FROM {} WHERE {} = ?1", column, table, column),
                    params: vec![text(old)],
                },
                None => Statement {
                    sql: format!("SELECT {} FROM {}", column, table),
                    params: Vec::new(),
                },
            },
            Operation::Default => {
                return Err(DeskError::InvalidOperation(format!(
                    "Unsupported operation: {}",
                    operation
                )))
            }
        };

        Ok(statement)
    }
}

impl<C: Connector> Database<C> {
    /// Runs one canonical statement against a reference table.
    ///
    /// Unlike `execute`, a failing statement does not raise: it comes back as
    /// a failed `OperationResult` naming the table and column. Connection
    /// failures and invalid operations are still raised. An UPDATE or DELETE
    /// that matches no row is also reported as a failed result.
    pub fn dispatch(
        &self,
        kind: ReferenceKind,
        operation: Operation,
        old_value: Option<&str>,
        new_value: Option<&str>,
    ) -> Result<OperationResult> {
        let statement = Statement::dispatch(kind, operation, old_value, new_value)?;
        debug!("Dispatching {} on {}", operation, kind.table());

        match self.execute(&statement.sql, &statement.params) {
            Ok(result) => {
                let matched_nothing = matches!(operation, Operation::Update | Operation::Delete)
                    && result.rows_affected == 0;
                if matched_nothing {
                    return Ok(OperationResult::failure(format!(
                        "no value '{}' in table [{}]",
                        old_value.unwrap_or_default(),
                        kind.table()
                    )));
                }
                Ok(OperationResult::with_data(result.rows))
            }
            Err(DeskError::Query(msg)) => {
                error!("Reference table operation failed: {}", msg);
                Ok(OperationResult::failure(format!(
                    "table [{}] or column [{}] might not exist ({})",
                    kind.table(),
                    kind.column(),
                    msg
                )))
            }
            Err(e) => Err(e),
        }
    }
}
