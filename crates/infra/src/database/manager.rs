//! Database connection manager backed by an r2d2 SQLite pool.

use std::path::{Path, PathBuf};
use std::time::Duration;

use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, Connection};
use timesheet_domain::{DatabaseConfig, Result, TimesheetError};
use tracing::{info, instrument};

use crate::errors::InfraError;

const SCHEMA_VERSION: i32 = 1;
const SCHEMA_SQL: &str = include_str!("schema.sql");

pub type SqlitePool = Pool<SqliteConnectionManager>;
pub type SqliteConnection = PooledConnection<SqliteConnectionManager>;

/// Database manager that wraps a [`SqlitePool`].
pub struct DbManager {
    pool: SqlitePool,
    path: PathBuf,
}

impl DbManager {
    /// Create a new manager with the given pool size and busy timeout.
    #[instrument(skip_all, fields(db_path = %db_path.as_ref().display(), pool_size))]
    pub fn new<P: AsRef<Path>>(db_path: P, pool_size: u32, busy_timeout_ms: u64) -> Result<Self> {
        let path = db_path.as_ref().to_path_buf();
        let busy_timeout = Duration::from_millis(busy_timeout_ms);

        let manager = SqliteConnectionManager::file(&path).with_init(move |conn| {
            apply_connection_pragmas(conn, busy_timeout)
        });

        let pool = Pool::builder().max_size(pool_size.max(1)).build(manager).map_err(|e| {
            TimesheetError::Database(format!("failed to create connection pool: {e}"))
        })?;

        info!(
            db_path = %path.display(),
            max_connections = pool.max_size(),
            "sqlite pool initialised"
        );

        Ok(Self { pool, path })
    }

    /// Create a manager from the `[database]` configuration section.
    pub fn from_config(config: &DatabaseConfig) -> Result<Self> {
        Self::new(&config.path, config.pool_size, config.busy_timeout_ms)
    }

    /// Borrow the underlying pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Acquire a connection from the pool.
    pub fn get_connection(&self) -> Result<SqliteConnection> {
        self.pool.get().map_err(|e| InfraError::from(e).into())
    }

    /// Ensure the full schema exists on the current database.
    pub fn run_migrations(&self) -> Result<()> {
        let conn = self.get_connection()?;
        create_schema(&conn)?;
        Ok(())
    }

    /// Return the configured database path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Verify the database is reachable and answering queries.
    pub fn health_check(&self) -> Result<()> {
        let conn = self.get_connection()?;
        conn.query_row("SELECT 1", params![], |row| row.get::<_, i32>(0))
            .map_err(InfraError::from)?;
        Ok(())
    }
}

fn apply_connection_pragmas(
    conn: &mut Connection,
    busy_timeout: Duration,
) -> std::result::Result<(), rusqlite::Error> {
    conn.busy_timeout(busy_timeout)?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get::<_, String>(0))?;
    Ok(())
}

fn create_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA_SQL).map_err(InfraError::from)?;
    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (?, CAST(strftime('%s','now') AS INTEGER))",
        params![SCHEMA_VERSION],
    )
    .map_err(InfraError::from)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn migrations_create_schema_version() {
        let temp_dir = TempDir::new().expect("temp dir created");
        let db_path = temp_dir.path().join("test.db");

        let manager = DbManager::new(&db_path, 4, 1_000).expect("manager created");
        manager.run_migrations().expect("migrations run");

        let conn = manager.get_connection().expect("connection acquired");
        let version: i32 =
            conn.query_row("SELECT version FROM schema_version", [], |row| row.get(0)).unwrap();
        assert_eq!(version, SCHEMA_VERSION);
    }

    #[test]
    fn migrations_are_idempotent() {
        let temp_dir = TempDir::new().expect("temp dir created");
        let manager =
            DbManager::new(temp_dir.path().join("test.db"), 2, 1_000).expect("manager created");

        manager.run_migrations().expect("first run");
        manager.run_migrations().expect("second run");
        manager.health_check().expect("health check passed");
    }

    #[test]
    fn live_timesheet_key_is_unique() {
        let temp_dir = TempDir::new().expect("temp dir created");
        let manager =
            DbManager::new(temp_dir.path().join("test.db"), 2, 1_000).expect("manager created");
        manager.run_migrations().expect("migrations run");
        let conn = manager.get_connection().expect("connection acquired");

        let insert = "INSERT INTO timesheet (timesheet_id, staff_id, location_id, timesheet_date, timesheet_status, created_at, updated_at, deleted_at)
                      VALUES (?1, 'staff', 'loc', '2023-06-01', 'TIMESHEET_STATUS_DRAFT', 0, 0, ?2)";
        conn.execute(insert, params!["ts-1", Option::<i64>::None]).unwrap();
        let dup = conn.execute(insert, params!["ts-2", Option::<i64>::None]).unwrap_err();
        let mapped: TimesheetError = InfraError::from(dup).into();
        assert!(matches!(mapped, TimesheetError::AlreadyExists(_)));

        // A soft-deleted row does not block the key
        conn.execute("UPDATE timesheet SET deleted_at = 1 WHERE timesheet_id = 'ts-1'", [])
            .unwrap();
        conn.execute(insert, params!["ts-3", Option::<i64>::None]).unwrap();
    }
}
