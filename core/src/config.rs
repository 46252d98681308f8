//! Cost/payment configuration.
//!
//! Shape on disk:
//!   { "DEFAULT": { "<payment>": bool, ... }, "<resultCode>": { ... }, ... }
//!
//! The DEFAULT entry is mandatory and doubles as the seed set for the
//! payment_type reference table.

use crate::error::{IngestError, IngestResult};
use std::collections::{BTreeMap, BTreeSet};

/// Key of the fallback entry.
pub const DEFAULT_KEY: &str = "DEFAULT";

/// Payment-method name -> enabled flag.
pub type PaymentMap = BTreeMap<String, bool>;

#[derive(Debug, Clone, PartialEq)]
pub struct CostConfig {
    default: PaymentMap,
    by_result_code: BTreeMap<String, PaymentMap>,
}

impl CostConfig {
    /// Load from a JSON file on disk.
    pub fn load(path: &str) -> IngestResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        Self::from_json(&content)
    }

    pub fn from_json(json: &str) -> IngestResult<Self> {
        let entries: BTreeMap<String, PaymentMap> = serde_json::from_str(json)?;
        Self::from_entries(entries)
    }

    pub fn from_entries(mut entries: BTreeMap<String, PaymentMap>) -> IngestResult<Self> {
        let default = entries.remove(DEFAULT_KEY).ok_or(IngestError::MissingDefault)?;
        Ok(Self {
            default,
            by_result_code: entries,
        })
    }

    /// The fallback payment map.
    pub fn default_payments(&self) -> &PaymentMap {
        &self.default
    }

    /// Entry keyed exactly by `result_code`, if configured.
    pub fn entry(&self, result_code: &str) -> Option<&PaymentMap> {
        self.by_result_code.get(result_code)
    }

    /// Names of the DEFAULT entry. Every one of these must exist as a
    /// payment type before ingestion starts.
    pub fn payment_names(&self) -> Vec<&str> {
        self.default.keys().map(String::as_str).collect()
    }

    /// Every payment name mentioned under any key, deduplicated.
    pub fn referenced_names(&self) -> BTreeSet<&str> {
        self.by_result_code
            .values()
            .chain(std::iter::once(&self.default))
            .flat_map(|m| m.keys().map(String::as_str))
            .collect()
    }

    /// Config used by unit and integration tests.
    pub fn default_test() -> Self {
        let default = PaymentMap::from([("card".into(), true), ("wallet".into(), false)]);
        let r01 = PaymentMap::from([("card".into(), true)]);
        Self {
            default,
            by_result_code: BTreeMap::from([("R01".into(), r01)]),
        }
    }
}
