//! Parsed log events.
//!
//! A RawEvent is what a ruleset cuts out of a log file: a header timestamp and
//! the untouched context text. Classification turns it into a typed Event.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which ruleset produced an event.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    RiskDecision,
    Timeout,
}

/// One matched log entry, before decoding. Lives for a single pass only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEvent {
    /// 1-based line number of the entry header.
    pub line: usize,
    /// `YYYY-MM-DD HH:MM:SS`, GMT.
    pub date: String,
    pub context: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskDecisionContext {
    pub result_code: String,
    pub is_new_customer: bool,
}

/// Timeout payloads are never interpreted; only the timestamp is consumed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeoutContext {
    pub raw: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventContext {
    RiskDecision(RiskDecisionContext),
    Timeout(TimeoutContext),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub line: usize,
    pub request_time: DateTime<Utc>,
    pub context: EventContext,
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self.context {
            EventContext::RiskDecision(_) => EventKind::RiskDecision,
            EventContext::Timeout(_) => EventKind::Timeout,
        }
    }

    pub fn risk_decision(&self) -> Option<&RiskDecisionContext> {
        match &self.context {
            EventContext::RiskDecision(ctx) => Some(ctx),
            EventContext::Timeout(_) => None,
        }
    }
}
