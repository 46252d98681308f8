//! Line parser and event classifier.
//!
//! Log files are Laravel-style: an entry starts at a header line
//!
//!   [2024-03-01 10:15:00] production.INFO: <body>
//!
//! and runs until the next header. Lines before the first header belong to
//! no entry and are dropped. A ruleset decides which entry bodies are events
//! of its kind and where the context text sits inside the body.
//!
//! The two rulesets are independent passes over the same content. Entries a
//! ruleset does not match are skipped silently.

use crate::{
    error::{IngestError, IngestResult},
    event::{Event, EventContext, EventKind, RawEvent, RiskDecisionContext, TimeoutContext},
    types::TIMESTAMP_FORMAT,
};
use chrono::NaiveDateTime;
use regex::Regex;
use serde::Deserialize;
use std::iter::{Enumerate, Peekable};
use std::str::Lines;
use std::sync::LazyLock;

static ENTRY_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\[(?P<date>\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2})\]\s+(?P<channel>[\w-]+)\.(?P<level>[A-Za-z]+):\s?(?P<body>.*)$",
    )
    .expect("entry header pattern is valid")
});

static RISK_DECISION_BODY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^RiskCheck decision\s+(?P<context>\{.*)$")
        .expect("risk decision pattern is valid")
});

static TIMEOUT_BODY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^RiskCheck timeout(?:\s+(?P<context>.*?))?\s*$")
        .expect("timeout pattern is valid")
});

/// Capture group every ruleset pattern must define.
const CONTEXT_GROUP: &str = "context";

#[derive(Debug, Clone)]
pub struct Ruleset {
    kind: EventKind,
    body: Regex,
}

impl Ruleset {
    /// `RiskCheck decision {"decision": {...}}`, optionally followed by the
    /// monolog extra: `[]` or a JSON object.
    pub fn risk_decision() -> Self {
        Self {
            kind: EventKind::RiskDecision,
            body: RISK_DECISION_BODY.clone(),
        }
    }

    /// `RiskCheck timeout` with an optional free-form tail.
    pub fn timeout() -> Self {
        Self {
            kind: EventKind::Timeout,
            body: TIMEOUT_BODY.clone(),
        }
    }

    /// Custom body pattern. It must define a `context` capture group; the
    /// group may go unmatched, in which case the context is empty.
    pub fn new(kind: EventKind, body_pattern: &str) -> IngestResult<Self> {
        let body = Regex::new(body_pattern)?;
        if !body.capture_names().flatten().any(|n| n == CONTEXT_GROUP) {
            return Err(anyhow::anyhow!(
                "ruleset pattern '{body_pattern}' has no '{CONTEXT_GROUP}' group"
            )
            .into());
        }
        Ok(Self { kind, body })
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    /// Lazily cut raw events out of `content`, in file order.
    /// Clone the iterator (or call again) to replay from the start.
    pub fn raw_events<'a>(&'a self, content: &'a str) -> RawEvents<'a> {
        RawEvents {
            entries: Entries::new(content),
            ruleset: self,
        }
    }

    /// Decode one raw event. A bad calendar date or a context that does not
    /// fit this ruleset's schema is a hard error.
    pub fn classify(&self, raw: &RawEvent) -> IngestResult<Event> {
        let request_time = NaiveDateTime::parse_from_str(&raw.date, TIMESTAMP_FORMAT)
            .map_err(|_| IngestError::InvalidTimestamp {
                line: raw.line,
                value: raw.date.clone(),
            })?
            .and_utc();

        let context = match self.kind {
            EventKind::RiskDecision => {
                let decision = decode_decision(&raw.context).map_err(|source| {
                    IngestError::MalformedContext {
                        line: raw.line,
                        source,
                    }
                })?;
                EventContext::RiskDecision(decision)
            }
            EventKind::Timeout => EventContext::Timeout(TimeoutContext {
                raw: raw.context.clone(),
            }),
        };

        Ok(Event {
            line: raw.line,
            request_time,
            context,
        })
    }

    /// Parse and classify every event of this ruleset's kind.
    pub fn parse(&self, content: &str) -> IngestResult<Vec<Event>> {
        self.raw_events(content)
            .map(|raw| self.classify(&raw))
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct DecisionEnvelope {
    decision: RiskDecisionContext,
}

/// Decode the leading context object. Whatever follows it must be the
/// monolog extra: nothing, `[]`, or a JSON object.
fn decode_decision(context: &str) -> Result<RiskDecisionContext, serde_json::Error> {
    let mut stream = serde_json::Deserializer::from_str(context).into_iter::<DecisionEnvelope>();
    let envelope = match stream.next() {
        Some(first) => first?,
        None => serde_json::from_str::<DecisionEnvelope>(context)?,
    };
    let extra = context[stream.byte_offset()..].trim();
    if !extra.is_empty() && extra != "[]" {
        serde_json::from_str::<serde_json::Map<String, serde_json::Value>>(extra)?;
    }
    Ok(envelope.decision)
}

/// One log entry: header line number, header date, body with continuation
/// lines newline-joined.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Entry<'a> {
    line: usize,
    date: &'a str,
    body: String,
}

#[derive(Clone)]
struct Entries<'a> {
    lines: Peekable<Enumerate<Lines<'a>>>,
}

impl<'a> Entries<'a> {
    fn new(content: &'a str) -> Self {
        Self {
            lines: content.lines().enumerate().peekable(),
        }
    }
}

impl<'a> Iterator for Entries<'a> {
    type Item = Entry<'a>;

    fn next(&mut self) -> Option<Entry<'a>> {
        // Skip to the next header.
        let (idx, caps) = loop {
            let (idx, line) = self.lines.next()?;
            if let Some(caps) = ENTRY_HEADER.captures(line) {
                break (idx, caps);
            }
        };

        let date = caps.name("date")?.as_str();
        let mut body = caps.name("body").map_or("", |m| m.as_str()).to_string();

        while let Some((_, line)) = self.lines.peek() {
            if ENTRY_HEADER.is_match(line) {
                break;
            }
            body.push('\n');
            body.push_str(line);
            self.lines.next();
        }

        Some(Entry {
            line: idx + 1,
            date,
            body,
        })
    }
}

/// Raw events of one ruleset over one file's content.
#[derive(Clone)]
pub struct RawEvents<'a> {
    entries: Entries<'a>,
    ruleset: &'a Ruleset,
}

impl Iterator for RawEvents<'_> {
    type Item = RawEvent;

    fn next(&mut self) -> Option<RawEvent> {
        for entry in self.entries.by_ref() {
            let Some(caps) = self.ruleset.body.captures(&entry.body) else {
                log::trace!("line {}: no {:?} match", entry.line, self.ruleset.kind);
                continue;
            };
            let context = caps
                .name(CONTEXT_GROUP)
                .map_or("", |m| m.as_str())
                .to_string();
            return Some(RawEvent {
                line: entry.line,
                date: entry.date.to_string(),
                context,
            });
        }
        None
    }
}
