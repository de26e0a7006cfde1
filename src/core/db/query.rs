/// Query Execution Module
///
/// Runs one statement inside one connection scope and one transaction, and
/// formats the fetched rows for display.

use crate::core::db::connection::{Connector, Database};
use crate::core::{DeskError, Result};
use rusqlite::params_from_iter;
use rusqlite::types::{Value, ValueRef};
use tracing::{debug, error};

/// Represents the result of a SQL statement execution
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    /// Column names from the result set (empty for writes)
    pub columns: Vec<String>,
    /// Rows of data as string values
    pub rows: Vec<Vec<String>>,
    /// Number of rows returned
    pub row_count: usize,
    /// Rows changed by a write statement
    pub rows_affected: usize,
}

impl<C: Connector> Database<C> {
    /// Executes `sql` with positional `params`.
    ///
    /// The statement runs in its own transaction: committed on success,
    /// rolled back on failure. Statements without a result set return an
    /// empty row sequence.
    ///
    /// # Returns
    ///
    /// The fetched rows, `DeskError::Connection` if no connection could be
    /// opened, or `DeskError::Query` carrying the driver message.
    pub fn execute(&self, sql: &str, params: &[Value]) -> Result<QueryResult> {
        self.with_connection(|conn| {
            debug!("Executing: {} ({} params)", sql, params.len());
            let tx = conn.transaction().map_err(query_error)?;

            let outcome = run_statement(&tx, sql, params);
            match outcome {
                Ok(result) => {
                    tx.commit().map_err(query_error)?;
                    Ok(result)
                }
                Err(e) => {
                    if let Err(rollback_err) = tx.rollback() {
                        error!("Rollback failed: {}", rollback_err);
                    }
                    error!("Query execution error: {}", e);
                    Err(DeskError::Query(e.to_string()))
                }
            }
        })
    }

    /// Runs a read-only query and maps each row with `f`.
    ///
    /// Used where callers want typed rows instead of display strings.
    pub fn query_map<T, F>(&self, sql: &str, params: &[Value], mut f: F) -> Result<Vec<T>>
    where
        F: FnMut(&rusqlite::Row<'_>) -> rusqlite::Result<T>,
    {
        self.with_connection(|conn| {
            debug!("Querying: {} ({} params)", sql, params.len());
            let mut stmt = conn.prepare(sql).map_err(query_error)?;
            let rows = stmt
                .query_map(params_from_iter(params.iter()), |row| f(row))
                .map_err(query_error)?;
            let collected: rusqlite::Result<Vec<T>> = rows.collect();
            collected.map_err(query_error)
        })
    }
}

fn run_statement(
    conn: &rusqlite::Connection,
    sql: &str,
    params: &[Value],
) -> rusqlite::Result<QueryResult> {
    let mut stmt = conn.prepare(sql)?;

    if stmt.column_count() == 0 {
        let rows_affected = stmt.execute(params_from_iter(params.iter()))?;
        return Ok(QueryResult {
            rows_affected,
            ..QueryResult::default()
        });
    }

    let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
    let column_count = columns.len();

    let mut rows = Vec::new();
    let mut cursor = stmt.query(params_from_iter(params.iter()))?;
    while let Some(row) = cursor.next()? {
        let mut values = Vec::with_capacity(column_count);
        for i in 0..column_count {
            values.push(format_value(row.get_ref(i)?));
        }
        rows.push(values);
    }

    Ok(QueryResult {
        columns,
        row_count: rows.len(),
        rows,
        rows_affected: 0,
    })
}

fn query_error(e: rusqlite::Error) -> DeskError {
    error!("Query execution error: {}", e);
    DeskError::Query(e.to_string())
}

/// Formats a SQLite value for display
///
/// NULL renders as an empty string: an unset field shows as a blank cell.
pub fn format_value(value: ValueRef) -> String {
    match value {
        ValueRef::Null => String::new(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(f) => f.to_string(),
        ValueRef::Text(t) => String::from_utf8_lossy(t).to_string(),
        ValueRef::Blob(b) => format!("<BLOB: {} bytes>", b.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::DatabaseFixture;

    #[test]
    fn test_select_returns_rows() {
        let fixture = DatabaseFixture::with_reference_data().unwrap();
        let db = fixture.database();

        let result = db
            .execute(
                "SELECT id, street FROM street WHERE street = ?1",
                &[Value::Text("Lenina".to_string())],
            )
            .unwrap();

        assert_eq!(result.columns, vec!["id", "street"]);
        assert_eq!(result.row_count, 1);
        assert_eq!(result.rows[0][1], "Lenina");
    }

    #[test]
    fn test_write_returns_empty_rows() {
        let fixture = DatabaseFixture::with_schema().unwrap();
        let db = fixture.database();

        let result = db
            .execute(
                "INSERT INTO surname (fam) VALUES (?1)",
                &[Value::Text("Petrov".to_string())],
            )
            .unwrap();

        assert!(result.rows.is_empty());
        assert!(result.columns.is_empty());
        assert_eq!(result.rows_affected, 1);
    }

    #[test]
    fn test_failed_write_is_query_error_and_not_applied() {
        let fixture = DatabaseFixture::with_reference_data().unwrap();
        let db = fixture.database();

        // Duplicate display text violates the UNIQUE constraint
        let result = db.execute(
            "INSERT INTO surname (fam) VALUES (?1)",
            &[Value::Text("Ivanov".to_string())],
        );
        match result {
            Err(DeskError::Query(msg)) => assert!(msg.contains("UNIQUE")),
            other => panic!("Expected Query error, got {:?}", other),
        }

        let count = db
            .execute(
                "SELECT COUNT(*) FROM surname WHERE fam = ?1",
                &[Value::Text("Ivanov".to_string())],
            )
            .unwrap();
        assert_eq!(count.rows[0][0], "1");
        assert_eq!(db.stats().active(), 0);
    }

    #[test]
    fn test_missing_table_is_query_error() {
        let fixture = DatabaseFixture::new().unwrap();
        let db = fixture.database();

        match db.execute("SELECT * FROM nonexistent_table", &[]) {
            Err(DeskError::Query(msg)) => assert!(msg.contains("no such table")),
            other => panic!("Expected Query error, got {:?}", other),
        }
    }

    #[test]
    fn test_null_formats_as_blank() {
        assert_eq!(format_value(ValueRef::Null), "");
        assert_eq!(format_value(ValueRef::Integer(7)), "7");
        assert_eq!(format_value(ValueRef::Blob(b"Hello")), "<BLOB: 5 bytes>");
    }
}
