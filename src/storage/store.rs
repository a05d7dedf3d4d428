use crate::error::Result;
use crate::models::ValidRecord;
use crate::storage::schema::{
    Table, CREATE_SCHEMA, INSERT_IGNORE_HISTORICAL, REPLACE_RECENT, SCHEMA_VERSION,
};
use crate::utils::storage_timestamp;
use rusqlite::{params, Connection};
use std::path::Path;
use std::time::Duration;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Owns the connection to the relational store.
///
/// Opened once by the command being run and handed to whichever component needs it.
pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        let _mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "wal", |row| row.get(0))?;
        tracing::debug!("Opened store at {}", path.display());
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        let version: i64 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
        if version < SCHEMA_VERSION {
            conn.execute_batch(CREATE_SCHEMA)?;
            conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
        }
        Ok(Self { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Insert-or-replace every record in one transaction.
    ///
    /// Any failing row aborts the whole batch; nothing is committed in that case.
    pub fn replace_recent(&mut self, records: &[ValidRecord]) -> Result<usize> {
        let tx = self.conn.transaction()?;
        let mut written = 0;
        {
            let mut stmt = tx.prepare(REPLACE_RECENT)?;
            for r in records {
                written += stmt.execute(params![
                    r.site_id,
                    r.site_name,
                    r.county,
                    r.aqi,
                    r.status,
                    storage_timestamp(&r.data_creation_date),
                    r.latitude,
                    r.longitude,
                ])?;
            }
        }
        tx.commit()?;
        Ok(written)
    }

    /// Insert one chunk of lean records in its own transaction, skipping duplicate identities.
    ///
    /// Returns the number of rows actually added.
    pub fn insert_historical_chunk(&mut self, chunk: &[ValidRecord]) -> Result<usize> {
        let tx = self.conn.transaction()?;
        let mut inserted = 0;
        {
            let mut stmt = tx.prepare(INSERT_IGNORE_HISTORICAL)?;
            for r in chunk {
                inserted += stmt.execute(params![
                    r.site_id,
                    r.site_name,
                    r.county,
                    r.aqi,
                    r.status,
                    storage_timestamp(&r.data_creation_date),
                ])?;
            }
        }
        tx.commit()?;
        Ok(inserted)
    }

    /// Delete every row of the historical table in a single transaction.
    pub fn clear_historical(&mut self) -> Result<usize> {
        let tx = self.conn.transaction()?;
        let deleted = tx.execute(&format!("DELETE FROM {}", Table::Historical.name()), [])?;
        tx.commit()?;
        Ok(deleted)
    }

    pub fn count_rows(&self, table: Table) -> Result<u64> {
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", table.name()),
            [],
            |row| row.get(0),
        )?;
        Ok(count.max(0) as u64)
    }
}
