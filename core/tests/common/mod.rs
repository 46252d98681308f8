#![allow(dead_code)]

use riskcheck_core::{
    config::CostConfig, engine::ReconciliationEngine, store::SqliteStore,
};

/// Engine over a fresh, migrated in-memory database.
pub fn build(config: CostConfig) -> ReconciliationEngine<SqliteStore> {
    let store = SqliteStore::in_memory().expect("in-memory store");
    store.migrate().expect("migrate");
    ReconciliationEngine::new(config, store).expect("engine")
}

pub fn decision(ts: &str, code: &str, new_customer: bool) -> String {
    format!(
        "[{ts}] production.INFO: RiskCheck decision \
         {{\"decision\":{{\"resultCode\":\"{code}\",\"isNewCustomer\":{new_customer}}}}} []\n"
    )
}

pub fn timeout(ts: &str) -> String {
    format!("[{ts}] production.WARNING: RiskCheck timeout {{\"orderId\":\"ORD-{ts}\"}}\n")
}

pub fn noise(ts: &str) -> String {
    format!("[{ts}] production.DEBUG: heartbeat ok\n")
}
