//! Read-side queries for the runner summary and tests.

use super::SqliteStore;
use crate::{
    adapter::LogFile,
    error::IngestResult,
    types::{FileId, RiskCheckId, TIMESTAMP_FORMAT},
};
use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::{params, types::Type};

/// A persisted risk check with the names of its enabled payment methods.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRiskCheck {
    pub id: RiskCheckId,
    pub file_id: FileId,
    pub result_code: String,
    pub new_customer_request: bool,
    pub request_time: DateTime<Utc>,
    /// Sorted by name.
    pub payments: Vec<String>,
}

impl SqliteStore {
    pub fn file_count(&self) -> IngestResult<i64> {
        let n = self
            .conn
            .query_row("SELECT COUNT(*) FROM riskcheck_file", [], |row| row.get(0))?;
        Ok(n)
    }

    pub fn files(&self) -> IngestResult<Vec<LogFile>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, filename FROM riskcheck_file ORDER BY id ASC")?;
        let files = stmt
            .query_map([], |row| {
                Ok(LogFile {
                    id: Some(row.get(0)?),
                    filename: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(files)
    }

    /// Risk checks of a file in insertion order.
    pub fn risk_checks_for_file(&self, file_id: FileId) -> IngestResult<Vec<StoredRiskCheck>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, file_id, result_code, new_customer_request, request_time
             FROM riskcheck WHERE file_id = ?1
             ORDER BY id ASC",
        )?;
        let mut checks = stmt
            .query_map(params![file_id], |row| {
                let raw_time: String = row.get(4)?;
                let request_time = NaiveDateTime::parse_from_str(&raw_time, TIMESTAMP_FORMAT)
                    .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e)))?
                    .and_utc();
                Ok(StoredRiskCheck {
                    id: row.get(0)?,
                    file_id: row.get(1)?,
                    result_code: row.get(2)?,
                    new_customer_request: row.get(3)?,
                    request_time,
                    payments: Vec::new(),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut payments = self.conn.prepare(
            "SELECT pt.name FROM riskcheck_payment rp
             JOIN payment_type pt ON pt.id = rp.payment_type_id
             WHERE rp.riskcheck_id = ?1
             ORDER BY pt.name ASC",
        )?;
        for check in &mut checks {
            check.payments = payments
                .query_map(params![check.id], |row| row.get(0))?
                .collect::<Result<Vec<String>, _>>()?;
        }
        Ok(checks)
    }

    pub fn timeout_count_for_file(&self, file_id: FileId) -> IngestResult<i64> {
        let n = self.conn.query_row(
            "SELECT COUNT(*) FROM timeout WHERE file_id = ?1",
            params![file_id],
            |row| row.get(0),
        )?;
        Ok(n)
    }

    pub fn association_count(&self) -> IngestResult<i64> {
        let n = self
            .conn
            .query_row("SELECT COUNT(*) FROM riskcheck_payment", [], |row| row.get(0))?;
        Ok(n)
    }

    pub fn risk_check_count(&self) -> IngestResult<i64> {
        let n = self
            .conn
            .query_row("SELECT COUNT(*) FROM riskcheck", [], |row| row.get(0))?;
        Ok(n)
    }
}
