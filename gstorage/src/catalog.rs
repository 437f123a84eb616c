use crate::config::StorageConfig;
use crate::errors::{Result, StorageError};
use crate::models::{CompletedScan, SyncMarker, TaskLog};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex, MutexGuard};

/// Sync bookkeeping kept beside the graph: one run-log row per family sync and the
/// last marker for which each (account, family) was fully scanned and reconciled.
pub struct Catalog {
    conn: Arc<Mutex<Connection>>,
}

impl Catalog {
    pub fn new(config: &StorageConfig) -> Result<Self> {
        let conn = Connection::open(&config.catalog_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        Ok(Self {
            conn: Arc::new(Mutex::new(Connection::open_in_memory()?)),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StorageError::LockPoisoned)
    }

    pub fn initialize_schema(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.execute_batch(
            "BEGIN;
            CREATE TABLE IF NOT EXISTS task_logs (
                task_id INTEGER PRIMARY KEY AUTOINCREMENT,
                task_name TEXT,
                start_time INTEGER NOT NULL,
                end_time INTEGER,
                status TEXT,
                details TEXT
            );
            CREATE TABLE IF NOT EXISTS completed_scans (
                account_id TEXT NOT NULL,
                family TEXT NOT NULL,
                marker INTEGER NOT NULL,
                completed_at INTEGER NOT NULL,
                PRIMARY KEY (account_id, family)
            );
            COMMIT;",
        )?;
        Ok(())
    }

    pub fn create_task_log(&self, task_name: &str) -> Result<i64> {
        let conn = self.lock()?;
        let start_time = chrono::Utc::now().timestamp();
        conn.execute(
            "INSERT INTO task_logs (task_name, start_time, status) VALUES (?1, ?2, 'RUNNING')",
            params![task_name, start_time],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn update_task_log_status(&self, task_id: i64, status: &str, details: &str) -> Result<()> {
        let conn = self.lock()?;
        let end_time = chrono::Utc::now().timestamp();
        conn.execute(
            "UPDATE task_logs SET status = ?1, details = ?2, end_time = ?3 WHERE task_id = ?4",
            params![status, details, end_time, task_id],
        )?;
        Ok(())
    }

    pub fn task_log(&self, task_id: i64) -> Result<Option<TaskLog>> {
        let conn = self.lock()?;
        let log = conn
            .query_row(
                "SELECT task_id, task_name, start_time, end_time, status, details
                 FROM task_logs WHERE task_id = ?1",
                params![task_id],
                |row| {
                    Ok(TaskLog {
                        task_id: row.get(0)?,
                        task_name: row.get(1)?,
                        start_time: row.get(2)?,
                        end_time: row.get(3)?,
                        status: row.get(4)?,
                        details: row.get::<_, Option<String>>(5)?.unwrap_or_default(),
                    })
                },
            )
            .optional()?;
        Ok(log)
    }

    pub fn record_complete_scan(
        &self,
        account_id: &str,
        family: &str,
        marker: SyncMarker,
    ) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO completed_scans (account_id, family, marker, completed_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(account_id, family) DO UPDATE SET
                marker = excluded.marker,
                completed_at = excluded.completed_at",
            params![account_id, family, marker.0, chrono::Utc::now().timestamp()],
        )?;
        Ok(())
    }

    pub fn last_complete_scan(&self, account_id: &str, family: &str) -> Result<Option<CompletedScan>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT account_id, family, marker, completed_at FROM completed_scans
             WHERE account_id = ?1 AND family = ?2",
        )?;
        let mut rows = stmt.query(params![account_id, family])?;

        if let Some(row) = rows.next()? {
            Ok(Some(CompletedScan {
                account_id: row.get(0)?,
                family: row.get(1)?,
                marker: SyncMarker(row.get(2)?),
                completed_at: row.get(3)?,
            }))
        } else {
            Ok(None)
        }
    }
}
