/// # Test Utilities Module
///
/// Fixtures for unit tests: every fixture owns a fresh SQLite file in a
/// temporary directory, so tests never share state and the
/// one-connection-per-operation model works exactly as in production.

use crate::config::ConnectionConfig;
use crate::core::db::{schema, Database};
use crate::core::{DeskError, Result};
use crate::records::{PersonRecord, RecordService};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Isolated database test fixture
pub struct DatabaseFixture {
    _dir: TempDir,
    path: PathBuf,
    database: Database,
}

impl DatabaseFixture {
    /// Creates an empty database file without any tables.
    pub fn new() -> Result<Self> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("addrdesk-test.db");

        let conn = Connection::open(&path).map_err(|e| DeskError::Connection(e.to_string()))?;
        conn.execute_batch("PRAGMA user_version = 1;")
            .map_err(|e| DeskError::Query(e.to_string()))?;
        drop(conn);

        let database = Database::new(ConnectionConfig::for_path(&path));
        Ok(DatabaseFixture {
            _dir: dir,
            path,
            database,
        })
    }

    /// Creates a database with the address book tables and no rows.
    pub fn with_schema() -> Result<Self> {
        let fixture = Self::new()?;
        fixture.seed(|conn| schema::bootstrap(conn))?;
        Ok(fixture)
    }

    /// Schema plus a few reference values:
    /// surnames Ivanov(1), Petrov(2); names Ivan(1), Petr(2);
    /// patronymic Ivanovich(1); streets Lenina(1), Mira(2).
    pub fn with_reference_data() -> Result<Self> {
        let fixture = Self::with_schema()?;
        fixture.seed(|conn| {
            conn.execute_batch(
                "
                INSERT INTO surname (fam) VALUES ('Ivanov'), ('Petrov');
                INSERT INTO given_name (names) VALUES ('Ivan'), ('Petr');
                INSERT INTO patronymic (second_name) VALUES ('Ivanovich');
                INSERT INTO street (street) VALUES ('Lenina'), ('Mira');
            ",
            )
            .map_err(|e| DeskError::Query(e.to_string()))
        })?;
        Ok(fixture)
    }

    /// Runs setup code on a side connection that does not count in the stats.
    fn seed<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&Connection) -> Result<()>,
    {
        let conn = Connection::open(&self.path).map_err(|e| DeskError::Connection(e.to_string()))?;
        f(&conn)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    pub fn config(&self) -> ConnectionConfig {
        ConnectionConfig::for_path(&self.path)
    }

    /// A record service with fresh connection stats.
    pub fn service(&self) -> RecordService {
        RecordService::new(self.config())
    }
}

/// Ivanov Ivan, Lenina 10, apartment 1, no patronymic or section.
pub fn sample_record() -> PersonRecord {
    PersonRecord {
        surname_id: Some(1),
        name_id: Some(1),
        patronymic_id: None,
        street_id: Some(1),
        building: Some("10".to_string()),
        building_section: None,
        apartment: Some("1".to_string()),
        phone: Some("555-01-01".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixtures_are_isolated() {
        let a = DatabaseFixture::with_reference_data().unwrap();
        let b = DatabaseFixture::with_schema().unwrap();
        assert_ne!(a.path(), b.path());

        let a_streets = a.service().list_reference_values(crate::core::db::ReferenceKind::Street).unwrap();
        let b_streets = b.service().list_reference_values(crate::core::db::ReferenceKind::Street).unwrap();
        assert_eq!(a_streets.len(), 2);
        assert!(b_streets.is_empty());
    }
}
