//! The reconciliation engine.
//!
//! PER FILE (files in enumeration order, each finished before the next):
//!   1. Look up the file without writing.
//!   2. Parse risk-decision and timeout events.
//!   3. Known file, count differs  -> delete its risk checks, insert all parsed.
//!   4. Unknown file               -> save it, insert all parsed.
//!   5. Known file, count matches  -> leave risk checks alone.
//!   6. Insert every parsed timeout, on every pass.
//!   7. Insert payment associations for each new risk check in one batch.
//!
//! RULES:
//!   - Steps 3-7 run in one transaction; a failing file rolls back whole.
//!   - A failing file is reported and the run moves on to the next file.
//!   - Timeouts are not deduplicated against earlier passes. Re-running over
//!     an unchanged file appends its timeouts again.

use crate::{
    adapter::{NewRiskCheck, NewTimeout, RecordStore, RiskCheckPayment},
    config::CostConfig,
    error::{IngestError, IngestResult},
    event::{Event, EventKind, RiskDecisionContext},
    file_store::FileStore,
    parser::Ruleset,
    resolver::PaymentResolver,
    types::FileId,
};
use serde::Serialize;

/// What happened to a file's risk checks this pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RiskCheckAction {
    Created,
    Replaced { previous: i64 },
    Unchanged,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileSummary {
    pub filename: String,
    pub file_id: FileId,
    pub action: RiskCheckAction,
    pub risk_checks_inserted: usize,
    pub associations_inserted: usize,
    pub timeouts_inserted: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileFailure {
    pub filename: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub processed: Vec<FileSummary>,
    pub failed: Vec<FileFailure>,
}

impl IngestReport {
    pub fn risk_checks_inserted(&self) -> usize {
        self.processed.iter().map(|s| s.risk_checks_inserted).sum()
    }

    pub fn timeouts_inserted(&self) -> usize {
        self.processed.iter().map(|s| s.timeouts_inserted).sum()
    }

    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

pub struct ReconciliationEngine<S: RecordStore> {
    pub store: S,
    resolver: PaymentResolver,
    risk_rules: Ruleset,
    timeout_rules: Ruleset,
}

impl<S: RecordStore> ReconciliationEngine<S> {
    /// Seed payment types from DEFAULT and load the name -> id map once.
    /// Any configuration problem is fatal here, before a file is touched.
    pub fn new(config: CostConfig, store: S) -> IngestResult<Self> {
        store.seed_payment_types(&config.payment_names())?;
        let ids = store.payment_type_ids_by_name()?;
        log::debug!("Loaded {} payment types", ids.len());
        let resolver = PaymentResolver::new(config, ids)?;
        Ok(Self {
            store,
            resolver,
            risk_rules: Ruleset::risk_decision(),
            timeout_rules: Ruleset::timeout(),
        })
    }

    /// Replace the built-in log grammars. Each ruleset must be of the kind
    /// its slot consumes.
    pub fn with_rulesets(
        mut self,
        risk_rules: Ruleset,
        timeout_rules: Ruleset,
    ) -> IngestResult<Self> {
        for (rules, expected) in [
            (&risk_rules, EventKind::RiskDecision),
            (&timeout_rules, EventKind::Timeout),
        ] {
            if rules.kind() != expected {
                return Err(IngestError::RulesetKindMismatch {
                    expected,
                    actual: rules.kind(),
                });
            }
        }
        self.risk_rules = risk_rules;
        self.timeout_rules = timeout_rules;
        Ok(self)
    }

    /// Reconcile every file the store lists. Only a failure to enumerate
    /// aborts the run; per-file failures land in the report.
    pub fn run(&self, files: &dyn FileStore) -> IngestResult<IngestReport> {
        let mut report = IngestReport::default();
        for filename in files.list()? {
            let content = files.read(&filename);
            match self.reconcile_file(&filename, &content) {
                Ok(summary) => {
                    log::info!(
                        "{filename}: {:?}, {} risk checks, {} timeouts",
                        summary.action,
                        summary.risk_checks_inserted,
                        summary.timeouts_inserted,
                    );
                    report.processed.push(summary);
                }
                Err(e) => {
                    log::error!("{filename}: rolled back: {e}");
                    report.failed.push(FileFailure {
                        filename,
                        error: e.to_string(),
                    });
                }
            }
        }
        Ok(report)
    }

    /// Reconcile one file whose content is already in hand.
    pub fn reconcile_file(&self, filename: &str, content: &str) -> IngestResult<FileSummary> {
        let mut file = self.store.find_or_build_file(filename)?;
        let events = self.risk_rules.parse(content)?;
        // Counted and inserted from the same list, so the two cannot drift.
        let decisions: Vec<(&Event, &RiskDecisionContext)> = events
            .iter()
            .filter_map(|e| e.risk_decision().map(|d| (e, d)))
            .collect();
        let timeouts = self.timeout_rules.parse(content)?;
        log::debug!(
            "{filename}: exists={}, {} decisions, {} timeouts parsed",
            file.exists(),
            decisions.len(),
            timeouts.len(),
        );

        self.store.with_transaction(|store| {
            let (file_id, action) = match file.id {
                Some(id) => {
                    let persisted = store.count_risk_checks_for_file(id)?;
                    if persisted == decisions.len() as i64 {
                        (id, RiskCheckAction::Unchanged)
                    } else {
                        store.delete_risk_checks_for_file(id)?;
                        (id, RiskCheckAction::Replaced { previous: persisted })
                    }
                }
                None => (store.save_file(&mut file)?, RiskCheckAction::Created),
            };

            let (risk_checks_inserted, associations_inserted) = match action {
                RiskCheckAction::Unchanged => (0, 0),
                _ => self.insert_risk_checks(store, file_id, &decisions)?,
            };
            let timeouts_inserted = insert_timeouts(store, file_id, &timeouts)?;

            Ok(FileSummary {
                filename: file.filename.clone(),
                file_id,
                action,
                risk_checks_inserted,
                associations_inserted,
                timeouts_inserted,
            })
        })
    }

    /// Returns (risk checks created, associations written).
    fn insert_risk_checks(
        &self,
        store: &S,
        file_id: FileId,
        decisions: &[(&Event, &RiskDecisionContext)],
    ) -> IngestResult<(usize, usize)> {
        let mut created = 0;
        let mut associations = Vec::new();

        for (event, decision) in decisions {
            // A failed create returns here, before any association is queued.
            let risk_check_id = store.create_risk_check(&NewRiskCheck {
                file_id,
                result_code: decision.result_code.clone(),
                new_customer_request: decision.is_new_customer,
                request_time: event.request_time,
            })?;
            created += 1;

            associations.extend(
                self.resolver
                    .enabled_payment_type_ids(&decision.result_code)?
                    .into_iter()
                    .map(|payment_type_id| RiskCheckPayment {
                        risk_check_id,
                        payment_type_id,
                    }),
            );
        }

        if !associations.is_empty() {
            store.bulk_insert_associations(&associations)?;
        }
        Ok((created, associations.len()))
    }
}

fn insert_timeouts<S: RecordStore>(
    store: &S,
    file_id: FileId,
    events: &[Event],
) -> IngestResult<usize> {
    for event in events {
        store.create_timeout(&NewTimeout {
            file_id,
            request_time: event.request_time,
        })?;
    }
    Ok(events.len())
}
