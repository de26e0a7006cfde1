/// Connection Management Module
///
/// One database connection per logical operation. A `ConnectionScope` owns
/// the live handle for the duration of one call and releases it from `Drop`,
/// so the release happens exactly once on success, on error and while a
/// panic unwinds.

use crate::config::ConnectionConfig;
use crate::core::db::schema;
use crate::core::{DeskError, Result};
use rusqlite::{Connection, OpenFlags};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, info, warn};

/// Opens native connections. The seam between the data-access layer and the driver.
pub trait Connector {
    /// Opens a fresh connection. Failures must be reported as `DeskError::Connection`.
    fn open(&self) -> Result<Connection>;

    /// Human-readable target for log lines. Must not include credentials.
    fn describe(&self) -> String;
}

/// Connector for SQLite database files.
#[derive(Debug, Clone)]
pub struct SqliteConnector {
    config: ConnectionConfig,
    create_if_missing: bool,
}

impl SqliteConnector {
    pub fn new(config: ConnectionConfig) -> Self {
        SqliteConnector {
            config,
            create_if_missing: false,
        }
    }

    /// Allows `open` to create the database file. Only schema bootstrap wants this.
    pub fn create_if_missing(mut self, create: bool) -> Self {
        self.create_if_missing = create;
        self
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }
}

impl Connector for SqliteConnector {
    fn open(&self) -> Result<Connection> {
        let mut flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        if self.create_if_missing {
            flags |= OpenFlags::SQLITE_OPEN_CREATE;
        }

        let conn = Connection::open_with_flags(&self.config.name, flags).map_err(|e| {
            DeskError::Connection(format!("failed to open '{}': {}", self.config.name, e))
        })?;

        // Foreign-key existence is the database's job
        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .map_err(|e| DeskError::Connection(e.to_string()))?;

        Ok(conn)
    }

    fn describe(&self) -> String {
        format!(
            "{}@{}/{}",
            self.config.user, self.config.host, self.config.name
        )
    }
}

/// Counters of connections opened and released through scopes.
#[derive(Debug, Default)]
pub struct ConnectionStats {
    opened: AtomicUsize,
    released: AtomicUsize,
}

impl ConnectionStats {
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    /// Connections currently held by a live scope.
    pub fn active(&self) -> usize {
        self.opened().saturating_sub(self.released())
    }
}

/// Exclusive owner of one live connection.
///
/// The handle is closed when the scope is dropped, right after the release
/// is counted.
pub struct ConnectionScope<'a> {
    conn: Connection,
    stats: &'a ConnectionStats,
}

impl<'a> ConnectionScope<'a> {
    /// Acquires a connection from `connector`.
    pub fn open<C: Connector + ?Sized>(connector: &C, stats: &'a ConnectionStats) -> Result<Self> {
        let conn = connector.open().map_err(|e| {
            warn!("Database connection error ({}): {}", connector.describe(), e);
            e
        })?;
        stats.opened.fetch_add(1, Ordering::SeqCst);
        debug!("Opened connection to {}", connector.describe());

        Ok(ConnectionScope { conn, stats })
    }

    pub fn connection(&mut self) -> &mut Connection {
        &mut self.conn
    }
}

impl Drop for ConnectionScope<'_> {
    fn drop(&mut self) {
        self.stats.released.fetch_add(1, Ordering::SeqCst);
        debug!("Released connection");
    }
}

/// Data-access entry point: a connector plus its scope bookkeeping.
///
/// Statement execution (`execute`) and generic reference-table dispatch
/// (`dispatch`) are implemented in the `query` and `dispatch` modules.
#[derive(Debug)]
pub struct Database<C: Connector = SqliteConnector> {
    connector: C,
    stats: ConnectionStats,
}

impl Database<SqliteConnector> {
    /// Database backed by the SQLite file named in `config`.
    pub fn new(config: ConnectionConfig) -> Self {
        Database::with_connector(SqliteConnector::new(config))
    }
}

impl<C: Connector> Database<C> {
    pub fn with_connector(connector: C) -> Self {
        Database {
            connector,
            stats: ConnectionStats::default(),
        }
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    pub fn stats(&self) -> &ConnectionStats {
        &self.stats
    }

    /// Runs `f` on a freshly opened connection and releases it afterwards.
    ///
    /// # Returns
    ///
    /// Whatever `f` returns, or `DeskError::Connection` if no connection
    /// could be opened (in which case `f` is never called).
    pub fn with_connection<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T>,
    {
        let mut scope = ConnectionScope::open(&self.connector, &self.stats)?;
        f(scope.connection())
    }

    /// Startup connectivity check.
    pub fn ping(&self) -> Result<()> {
        self.execute("SELECT 1", &[])?;
        info!("Database connection successful ({})", self.connector.describe());
        Ok(())
    }

    /// Creates missing address book tables.
    pub fn bootstrap(&self) -> Result<()> {
        self.with_connection(|conn| schema::bootstrap(conn))
    }
}
