//! Integration tests: error handling.
//!
//! 1. Malformed context fails its file only; the run continues
//! 2. A failed risk-check create rolls the whole file back
//! 3. Configuration errors are fatal before any file is processed

mod common;

use common::{build, decision, timeout};
use riskcheck_core::{
    adapter::{LogFile, NewRiskCheck, NewTimeout, RecordStore, RiskCheckPayment},
    config::CostConfig,
    engine::{ReconciliationEngine, RiskCheckAction},
    error::{IngestError, IngestResult},
    file_store::MemoryFileStore,
    store::SqliteStore,
    types::{FileId, PaymentTypeId, RiskCheckId, TimeoutId},
};
use std::collections::HashMap;

/// Delegates to SQLite but refuses to create risk checks with one result code.
struct PoisonedStore {
    inner: SqliteStore,
    poison: &'static str,
}

impl RecordStore for PoisonedStore {
    fn find_file(&self, filename: &str) -> IngestResult<Option<FileId>> {
        self.inner.find_file(filename)
    }

    fn save_file(&self, file: &mut LogFile) -> IngestResult<FileId> {
        self.inner.save_file(file)
    }

    fn count_risk_checks_for_file(&self, file_id: FileId) -> IngestResult<i64> {
        self.inner.count_risk_checks_for_file(file_id)
    }

    fn delete_risk_checks_for_file(&self, file_id: FileId) -> IngestResult<usize> {
        self.inner.delete_risk_checks_for_file(file_id)
    }

    fn create_risk_check(&self, rc: &NewRiskCheck) -> IngestResult<RiskCheckId> {
        if rc.result_code == self.poison {
            return Err(anyhow::anyhow!("constraint violation on {}", rc.result_code).into());
        }
        self.inner.create_risk_check(rc)
    }

    fn bulk_insert_associations(&self, rows: &[RiskCheckPayment]) -> IngestResult<()> {
        self.inner.bulk_insert_associations(rows)
    }

    fn create_timeout(&self, timeout: &NewTimeout) -> IngestResult<TimeoutId> {
        self.inner.create_timeout(timeout)
    }

    fn seed_payment_types(&self, names: &[&str]) -> IngestResult<()> {
        self.inner.seed_payment_types(names)
    }

    fn payment_type_ids_by_name(&self) -> IngestResult<HashMap<String, PaymentTypeId>> {
        self.inner.payment_type_ids_by_name()
    }

    fn with_transaction<T, F>(&self, f: F) -> IngestResult<T>
    where
        F: FnOnce(&Self) -> IngestResult<T>,
    {
        self.inner.with_transaction(|_| f(self))
    }
}

fn poisoned(poison: &'static str) -> ReconciliationEngine<PoisonedStore> {
    let inner = SqliteStore::in_memory().unwrap();
    inner.migrate().unwrap();
    ReconciliationEngine::new(CostConfig::default_test(), PoisonedStore { inner, poison }).unwrap()
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 1: malformed context
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn malformed_context_fails_only_that_file() {
    let engine = build(CostConfig::default_test());
    let mut files = MemoryFileStore::new();
    files.insert(
        "a-bad.log",
        decision("2024-03-01 10:00:00", "R01", true)
            + "[2024-03-01 10:00:01] production.INFO: RiskCheck decision {\"decision\":{\"isNewCustomer\":true}}\n",
    );
    files.insert("b-good.log", decision("2024-03-01 10:00:02", "R01", false));

    let report = engine.run(&files).unwrap();
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].filename, "a-bad.log");
    assert!(report.failed[0].error.contains("line 2"), "{}", report.failed[0].error);
    assert_eq!(report.processed.len(), 1);
    assert_eq!(report.processed[0].filename, "b-good.log");

    // The bad file was never registered.
    assert!(engine.store.find_file("a-bad.log").unwrap().is_none());
    assert_eq!(engine.store.risk_check_count().unwrap(), 1);
}

#[test]
fn reconcile_file_surfaces_malformed_context() {
    let engine = build(CostConfig::default_test());
    let err = engine
        .reconcile_file(
            "x.log",
            "[2024-03-01 10:00:00] production.INFO: RiskCheck decision {not json}\n",
        )
        .unwrap_err();
    assert!(matches!(err, IngestError::MalformedContext { line: 1, .. }), "got {err:?}");
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 2: persistence failure rolls back
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn failed_create_on_new_file_leaves_nothing_behind() {
    let engine = poisoned("BOOM");
    let content = decision("2024-03-01 10:00:00", "R01", true)
        + &decision("2024-03-01 10:00:01", "BOOM", true)
        + &timeout("2024-03-01 10:00:02");

    let err = engine.reconcile_file("a.log", &content).unwrap_err();
    assert!(err.to_string().contains("constraint violation"));

    assert!(engine.store.find_file("a.log").unwrap().is_none());
    assert_eq!(engine.store.inner.risk_check_count().unwrap(), 0);
    assert_eq!(engine.store.inner.association_count().unwrap(), 0);
}

#[test]
fn failed_replace_restores_previous_risk_checks() {
    let engine = poisoned("BOOM");
    let first = engine
        .reconcile_file("a.log", &decision("2024-03-01 10:00:00", "R01", true))
        .unwrap();
    assert_eq!(first.action, RiskCheckAction::Created);

    let grown = decision("2024-03-01 10:00:00", "R01", true)
        + &decision("2024-03-01 10:00:01", "BOOM", false);
    assert!(engine.reconcile_file("a.log", &grown).is_err());

    // The delete in the failed pass was rolled back with everything else.
    let checks = engine.store.inner.risk_checks_for_file(first.file_id).unwrap();
    assert_eq!(checks.len(), 1);
    assert_eq!(checks[0].payments, vec!["card"]);
}

#[test]
fn run_continues_after_a_persistence_failure() {
    let engine = poisoned("BOOM");
    let mut files = MemoryFileStore::new();
    files.insert("1.log", decision("2024-03-01 10:00:00", "BOOM", true));
    files.insert("2.log", decision("2024-03-01 10:00:01", "R01", true));

    let report = engine.run(&files).unwrap();
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.processed.len(), 1);
    assert_eq!(report.processed[0].filename, "2.log");
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 3: configuration errors
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn override_with_unseeded_payment_type_is_fatal() {
    let store = SqliteStore::in_memory().unwrap();
    store.migrate().unwrap();
    let cfg = CostConfig::from_json(r#"{"DEFAULT": {"card": true}, "R05": {"crypto": true}}"#)
        .unwrap();

    let err = ReconciliationEngine::new(cfg, store).err().unwrap();
    assert!(
        matches!(err, IngestError::UnseededPaymentType { ref name } if name == "crypto"),
        "got {err:?}"
    );
}

#[test]
fn config_without_default_never_reaches_the_engine() {
    let err = CostConfig::from_json(r#"{"R01": {"card": true}}"#).unwrap_err();
    assert!(matches!(err, IngestError::MissingDefault));
}
