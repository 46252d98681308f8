//! SQLite persistence layer.
//!
//! RULE: Only the store talks to the database.
//! The engine calls RecordStore methods; it never executes SQL directly.

use crate::{
    adapter::{LogFile, NewRiskCheck, NewTimeout, RecordStore, RiskCheckPayment},
    error::IngestResult,
    types::{FileId, PaymentTypeId, RiskCheckId, TimeoutId, TIMESTAMP_FORMAT},
};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use std::collections::HashMap;

mod queries;

pub use queries::StoredRiskCheck;

/// Rows per multi-row INSERT, kept well under SQLite's bound-parameter limit.
const ASSOCIATION_CHUNK: usize = 400;

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(path: &str) -> IngestResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        // WAL mode only for real files (:memory: ignores it).
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> IngestResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> IngestResult<()> {
        self.conn
            .execute_batch(include_str!("../../../migrations/001_riskcheck.sql"))?;
        Ok(())
    }
}

impl RecordStore for SqliteStore {
    // ── Files ──────────────────────────────────────────────────

    fn find_file(&self, filename: &str) -> IngestResult<Option<FileId>> {
        let id = self
            .conn
            .query_row(
                "SELECT id FROM riskcheck_file WHERE filename = ?1",
                params![filename],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id)
    }

    fn save_file(&self, file: &mut LogFile) -> IngestResult<FileId> {
        self.conn.execute(
            "INSERT INTO riskcheck_file (filename) VALUES (?1)",
            params![file.filename],
        )?;
        let id = self.conn.last_insert_rowid();
        file.id = Some(id);
        Ok(id)
    }

    // ── Risk checks ────────────────────────────────────────────

    fn count_risk_checks_for_file(&self, file_id: FileId) -> IngestResult<i64> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM riskcheck WHERE file_id = ?1",
            params![file_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn delete_risk_checks_for_file(&self, file_id: FileId) -> IngestResult<usize> {
        // riskcheck_payment rows go with ON DELETE CASCADE.
        let deleted = self
            .conn
            .execute("DELETE FROM riskcheck WHERE file_id = ?1", params![file_id])?;
        Ok(deleted)
    }

    fn create_risk_check(&self, rc: &NewRiskCheck) -> IngestResult<RiskCheckId> {
        self.conn.execute(
            "INSERT INTO riskcheck (file_id, result_code, new_customer_request, request_time)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                rc.file_id,
                rc.result_code,
                rc.new_customer_request,
                rc.request_time.format(TIMESTAMP_FORMAT).to_string(),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn bulk_insert_associations(&self, rows: &[RiskCheckPayment]) -> IngestResult<()> {
        for chunk in rows.chunks(ASSOCIATION_CHUNK) {
            let placeholders = vec!["(?, ?)"; chunk.len()].join(", ");
            let sql = format!(
                "INSERT INTO riskcheck_payment (riskcheck_id, payment_type_id) VALUES {placeholders}"
            );
            let values = chunk
                .iter()
                .flat_map(|r| [r.risk_check_id, r.payment_type_id]);
            self.conn.execute(&sql, params_from_iter(values))?;
        }
        Ok(())
    }

    // ── Timeouts ───────────────────────────────────────────────

    fn create_timeout(&self, timeout: &NewTimeout) -> IngestResult<TimeoutId> {
        self.conn.execute(
            "INSERT INTO timeout (file_id, request_time) VALUES (?1, ?2)",
            params![
                timeout.file_id,
                timeout.request_time.format(TIMESTAMP_FORMAT).to_string(),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    // ── Payment types ──────────────────────────────────────────

    fn seed_payment_types(&self, names: &[&str]) -> IngestResult<()> {
        let mut stmt = self.conn.prepare(
            "INSERT INTO payment_type (name) VALUES (?1)
             ON CONFLICT(name) DO NOTHING",
        )?;
        for name in names {
            stmt.execute(params![name])?;
        }
        Ok(())
    }

    fn payment_type_ids_by_name(&self) -> IngestResult<HashMap<String, PaymentTypeId>> {
        let mut stmt = self.conn.prepare("SELECT name, id FROM payment_type")?;
        let ids = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get(1)?)))?
            .collect::<Result<HashMap<_, _>, _>>()?;
        Ok(ids)
    }

    fn with_transaction<T, F>(&self, f: F) -> IngestResult<T>
    where
        F: FnOnce(&Self) -> IngestResult<T>,
    {
        // Dropping an uncommitted transaction rolls it back.
        let tx = self.conn.unchecked_transaction()?;
        let out = f(self)?;
        tx.commit()?;
        Ok(out)
    }
}
