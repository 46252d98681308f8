//! Payment resolver: result code -> applicable payment methods.
//!
//! Lookup is exact-key first, DEFAULT otherwise. The full enabled/disabled
//! map is returned; only truthy entries become associations.

use crate::{
    config::{CostConfig, PaymentMap},
    error::{IngestError, IngestResult},
    types::PaymentTypeId,
};
use std::collections::HashMap;

pub struct PaymentResolver {
    config: CostConfig,
    payment_type_ids: HashMap<String, PaymentTypeId>,
}

impl PaymentResolver {
    /// Fails when any payment name mentioned anywhere in `config` has no id.
    pub fn new(
        config: CostConfig,
        payment_type_ids: HashMap<String, PaymentTypeId>,
    ) -> IngestResult<Self> {
        if let Some(name) = config
            .referenced_names()
            .into_iter()
            .find(|name| !payment_type_ids.contains_key(*name))
        {
            return Err(IngestError::UnseededPaymentType {
                name: name.to_string(),
            });
        }
        Ok(Self {
            config,
            payment_type_ids,
        })
    }

    pub fn resolve(&self, result_code: &str) -> &PaymentMap {
        resolve_payments(&self.config, result_code)
    }

    /// Payment type ids of the enabled methods for `result_code`, in name order.
    pub fn enabled_payment_type_ids(&self, result_code: &str) -> IngestResult<Vec<PaymentTypeId>> {
        self.resolve(result_code)
            .iter()
            .filter(|(_, enabled)| **enabled)
            .map(|(name, _)| {
                self.payment_type_ids
                    .get(name)
                    .copied()
                    .ok_or_else(|| IngestError::UnseededPaymentType { name: name.clone() })
            })
            .collect()
    }
}

/// Entry keyed exactly by `result_code`, else the DEFAULT entry.
pub fn resolve_payments<'c>(config: &'c CostConfig, result_code: &str) -> &'c PaymentMap {
    config
        .entry(result_code)
        .unwrap_or_else(|| config.default_payments())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids() -> HashMap<String, PaymentTypeId> {
        HashMap::from([("card".to_string(), 1), ("wallet".to_string(), 2)])
    }

    #[test]
    fn known_code_uses_its_own_entry() {
        let cfg = CostConfig::default_test();
        let map = resolve_payments(&cfg, "R01");
        assert_eq!(map.len(), 1);
        assert_eq!(map.get("card"), Some(&true));
    }

    #[test]
    fn unknown_code_falls_back_to_default_exactly() {
        let cfg = CostConfig::default_test();
        assert_eq!(resolve_payments(&cfg, "R99"), cfg.default_payments());
        assert_eq!(resolve_payments(&cfg, ""), cfg.default_payments());
    }

    #[test]
    fn only_truthy_methods_become_ids() {
        let resolver = PaymentResolver::new(CostConfig::default_test(), ids()).unwrap();
        assert_eq!(resolver.enabled_payment_type_ids("R99").unwrap(), vec![1]);
        assert_eq!(resolver.enabled_payment_type_ids("R01").unwrap(), vec![1]);
    }

    #[test]
    fn all_disabled_yields_no_ids() {
        let cfg = CostConfig::from_json(
            r#"{"DEFAULT": {"card": true, "wallet": true}, "R50": {"card": false}}"#,
        )
        .unwrap();
        let resolver = PaymentResolver::new(cfg, ids()).unwrap();
        assert!(resolver.enabled_payment_type_ids("R50").unwrap().is_empty());
        assert_eq!(resolver.enabled_payment_type_ids("X").unwrap(), vec![1, 2]);
    }

    #[test]
    fn override_naming_an_unseeded_method_is_fatal() {
        let cfg = CostConfig::from_json(
            r#"{"DEFAULT": {"card": true}, "R07": {"invoice": true}}"#,
        )
        .unwrap();
        let err = PaymentResolver::new(cfg, ids()).err().unwrap();
        assert!(
            matches!(err, IngestError::UnseededPaymentType { ref name } if name == "invoice"),
            "got {err:?}"
        );
    }
}
