//! Persistence boundary consumed by the reconciliation engine.
//!
//! RULE: the engine only talks to storage through RecordStore.
//! Existence is a two-phase protocol: `find_file` is a pure lookup and
//! `save_file` is the only call that gives a file an identity.

use crate::{
    error::IngestResult,
    types::{FileId, PaymentTypeId, RiskCheckId, TimeoutId},
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;

/// A log file as seen during one pass. `id` is `None` until persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogFile {
    pub filename: String,
    pub id: Option<FileId>,
}

impl LogFile {
    pub fn exists(&self) -> bool {
        self.id.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRiskCheck {
    pub file_id: FileId,
    pub result_code: String,
    pub new_customer_request: bool,
    pub request_time: DateTime<Utc>,
}

/// Join row: one per enabled payment method of a risk check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RiskCheckPayment {
    pub risk_check_id: RiskCheckId,
    pub payment_type_id: PaymentTypeId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTimeout {
    pub file_id: FileId,
    pub request_time: DateTime<Utc>,
}

pub trait RecordStore {
    /// Pure lookup; never writes.
    fn find_file(&self, filename: &str) -> IngestResult<Option<FileId>>;

    /// Build the in-memory file reference, persisted or not.
    fn find_or_build_file(&self, filename: &str) -> IngestResult<LogFile> {
        Ok(LogFile {
            filename: filename.to_string(),
            id: self.find_file(filename)?,
        })
    }

    /// Persist `file` and record its new id on it.
    fn save_file(&self, file: &mut LogFile) -> IngestResult<FileId>;

    fn count_risk_checks_for_file(&self, file_id: FileId) -> IngestResult<i64>;

    /// Removes the file's risk checks together with their payment rows.
    /// Returns the number of risk checks deleted.
    fn delete_risk_checks_for_file(&self, file_id: FileId) -> IngestResult<usize>;

    fn create_risk_check(&self, risk_check: &NewRiskCheck) -> IngestResult<RiskCheckId>;

    fn bulk_insert_associations(&self, rows: &[RiskCheckPayment]) -> IngestResult<()>;

    fn create_timeout(&self, timeout: &NewTimeout) -> IngestResult<TimeoutId>;

    /// Insert any names not yet present. Safe to call on every start.
    fn seed_payment_types(&self, names: &[&str]) -> IngestResult<()>;

    fn payment_type_ids_by_name(&self) -> IngestResult<HashMap<String, PaymentTypeId>>;

    /// Run `f` atomically: commit on `Ok`, roll back on `Err`.
    fn with_transaction<T, F>(&self, f: F) -> IngestResult<T>
    where
        Self: Sized,
        F: FnOnce(&Self) -> IngestResult<T>;
}
