//! Structured workflow events consumed by the pattern store
//!
//! One event is one observed fact from a session: a file touched, a command
//! run, an error seen, a categorized prompt, or a pre-aggregated session
//! breakdown handed over by an extractor.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

/// What was observed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventKind {
    FileChanged {
        path: String,
    },
    CommandUsed {
        command: String,
    },
    ErrorSeen {
        error_type: String,
        message: String,
    },
    PromptIssued {
        /// Pre-categorized intent (see [`crate::heuristics::categorize_prompt`])
        intent: String,
    },
    /// A whole session's categorical breakdown, merged additively per sub-key
    SessionSummary {
        #[serde(flatten)]
        breakdown: SessionBreakdown,
    },
}

/// A single observed fact with its timestamp
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    #[serde(flatten)]
    pub kind: EventKind,
    #[serde(default = "Utc::now")]
    pub at: DateTime<Utc>,
}

impl Event {
    pub fn now(kind: EventKind) -> Self {
        Self { kind, at: Utc::now() }
    }

    /// A malformed event carries no usable payload and must be skipped,
    /// not abort the batch.
    pub fn is_well_formed(&self) -> bool {
        match &self.kind {
            EventKind::FileChanged { path } => !path.trim().is_empty(),
            EventKind::CommandUsed { command } => !command.trim().is_empty(),
            EventKind::ErrorSeen { error_type, .. } => !error_type.trim().is_empty(),
            EventKind::PromptIssued { intent } => !intent.trim().is_empty(),
            EventKind::SessionSummary { .. } => true,
        }
    }
}

/// Categorical counts for one analyzed session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionBreakdown {
    /// Prompt intent → count (testing, debugging, refactoring, ...)
    #[serde(default)]
    pub prompt_intents: BTreeMap<String, u64>,
    /// Tool type → count (shell_command, file_edit, git_command, ...)
    #[serde(default)]
    pub tool_types: BTreeMap<String, u64>,
    /// Slash command → count (/test, /build, ...)
    #[serde(default)]
    pub slash_commands: BTreeMap<String, u64>,
}

impl SessionBreakdown {
    pub fn is_empty(&self) -> bool {
        self.prompt_intents.is_empty()
            && self.tool_types.is_empty()
            && self.slash_commands.is_empty()
    }

    /// Add another breakdown's counts into this one, per sub-key.
    pub fn merge(&mut self, other: &SessionBreakdown) {
        for (k, v) in &other.prompt_intents {
            *self.prompt_intents.entry(k.clone()).or_insert(0) += v;
        }
        for (k, v) in &other.tool_types {
            *self.tool_types.entry(k.clone()).or_insert(0) += v;
        }
        for (k, v) in &other.slash_commands {
            *self.slash_commands.entry(k.clone()).or_insert(0) += v;
        }
    }
}

/// Parse a JSON event batch (array of event objects). Items that fail to
/// deserialize or carry no payload are skipped with a warning; the rest of
/// the batch is returned.
pub fn parse_event_batch(json: &str) -> Vec<Event> {
    let values: Vec<serde_json::Value> = match serde_json::from_str(json) {
        Ok(serde_json::Value::Array(items)) => items,
        Ok(other) => {
            warn!("event batch is not a JSON array, got {}", type_name(&other));
            return Vec::new();
        }
        Err(e) => {
            warn!("unparsable event batch: {}", e);
            return Vec::new();
        }
    };

    let mut events = Vec::with_capacity(values.len());
    for (i, value) in values.into_iter().enumerate() {
        match serde_json::from_value::<Event>(value) {
            Ok(event) if event.is_well_formed() => events.push(event),
            Ok(_) => warn!("skipping malformed event at index {}: empty payload", i),
            Err(e) => warn!("skipping malformed event at index {}: {}", i, e),
        }
    }
    events
}

fn type_name(v: &serde_json::Value) -> &'static str {
    match v {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
