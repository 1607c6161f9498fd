//! Pattern Store - persistent cumulative counters for workflow signals
//!
//! A single JSON document per project holding facet → key → count mappings
//! plus session metadata. Counters only ever increment; persistence is a
//! whole-document load-modify-store cycle through an injected storage port.

pub mod persist;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};

use crate::events::{Event, EventKind, SessionBreakdown};
use persist::{FileStorage, StorageError, StoragePort};

/// Well-known facet names. Unknown facets round-trip untouched.
pub const FACET_COMMANDS: &str = "commands";
pub const FACET_ERRORS: &str = "errors";
pub const FACET_FILES_CHANGED: &str = "files_changed";
pub const FACET_FILE_TYPES: &str = "file_types";

/// Error keys embed a truncated message after the family, `type:message`.
const ERROR_MESSAGE_KEY_LEN: usize = 50;

/// The persisted store document. Readers tolerate missing facets (empty) and
/// preserve unknown top-level fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreState {
    /// Facet name → item key → occurrence count
    #[serde(default)]
    pub facets: BTreeMap<String, BTreeMap<String, u64>>,
    /// Cumulative conversation breakdown
    #[serde(default)]
    pub conversations: ConversationPatterns,
    #[serde(default = "Utc::now")]
    pub last_updated: DateTime<Utc>,
    #[serde(default)]
    pub total_sessions: u64,
    /// Forward compatibility: unknown fields survive a load/store cycle
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Categorical conversation aggregates, merged additively per sub-key.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversationPatterns {
    #[serde(default)]
    pub last_session: SessionBreakdown,
    #[serde(default)]
    pub total_sessions_analyzed: u64,
    #[serde(default = "Utc::now")]
    pub last_analysis: DateTime<Utc>,
}

impl StoreState {
    /// Counts for a facet; missing facets read as empty.
    pub fn facet(&self, name: &str) -> BTreeMap<String, u64> {
        self.facets.get(name).cloned().unwrap_or_default()
    }

    pub fn facet_total(&self, name: &str) -> u64 {
        self.facets
            .get(name)
            .map(|counts| counts.values().sum())
            .unwrap_or(0)
    }

    fn bump(&mut self, facet: &str, key: &str) {
        *self
            .facets
            .entry(facet.to_string())
            .or_default()
            .entry(key.to_string())
            .or_insert(0) += 1;
    }
}

/// The pattern store: in-memory state plus its storage port.
pub struct PatternStore {
    state: StoreState,
    storage: Box<dyn StoragePort>,
}

impl PatternStore {
    /// Open the store through a storage port. Corrupt persisted state fails
    /// soft: the run continues from an empty store.
    pub fn open(storage: Box<dyn StoragePort>) -> Result<Self, StorageError> {
        let state = match storage.load()? {
            Some(contents) => match serde_json::from_str::<StoreState>(&contents) {
                Ok(state) => state,
                Err(e) => {
                    tracing::warn!("pattern store is corrupt, starting from empty: {}", e);
                    StoreState::default()
                }
            },
            None => {
                debug!("no pattern store yet, starting from empty");
                StoreState::default()
            }
        };
        Ok(Self { state, storage })
    }

    /// Open a file-backed store at the given path.
    pub fn open_at(path: &Path) -> Result<Self, StorageError> {
        Self::open(Box::new(FileStorage::new(path.to_path_buf())))
    }

    /// Apply a batch of events. An empty batch only bumps the session counter
    /// and timestamp. Malformed events are skipped; the batch continues.
    pub fn update(&mut self, events: &[Event]) {
        let mut applied = 0usize;
        for event in events {
            if !event.is_well_formed() {
                tracing::warn!("skipping malformed event");
                continue;
            }
            match &event.kind {
                EventKind::FileChanged { path } => {
                    self.state.bump(FACET_FILES_CHANGED, path);
                    if let Some(ext) = file_extension(path) {
                        self.state.bump(FACET_FILE_TYPES, &ext);
                    }
                }
                EventKind::CommandUsed { command } => {
                    self.state.bump(FACET_COMMANDS, command);
                }
                EventKind::ErrorSeen { error_type, message } => {
                    let key = error_key(error_type, message);
                    self.state.bump(FACET_ERRORS, &key);
                }
                EventKind::PromptIssued { intent } => {
                    *self
                        .state
                        .conversations
                        .last_session
                        .prompt_intents
                        .entry(intent.clone())
                        .or_insert(0) += 1;
                }
                EventKind::SessionSummary { breakdown } => {
                    self.state.conversations.last_session.merge(breakdown);
                    self.state.conversations.total_sessions_analyzed += 1;
                    self.state.conversations.last_analysis = event.at;
                    // Slash commands also count toward the commands facet
                    for (command, count) in &breakdown.slash_commands {
                        *self
                            .state
                            .facets
                            .entry(FACET_COMMANDS.to_string())
                            .or_default()
                            .entry(command.clone())
                            .or_insert(0) += count;
                    }
                }
            }
            applied += 1;
        }
        self.state.total_sessions += 1;
        self.state.last_updated = Utc::now();
        debug!("applied {} of {} events", applied, events.len());
    }

    /// A read-only snapshot for the classifiers.
    pub fn snapshot(&self) -> &StoreState {
        &self.state
    }

    /// Persist the current state as a whole-document replacement.
    pub fn save(&self) -> Result<(), StorageError> {
        let json = serde_json::to_string_pretty(&self.state)
            .map_err(|e| StorageError::Unwritable {
                path: "<pattern store>".to_string(),
                reason: e.to_string(),
            })?;
        self.storage.save(&json)?;
        info!(
            "pattern store saved ({} facets, {} sessions)",
            self.state.facets.len(),
            self.state.total_sessions
        );
        Ok(())
    }
}

/// Build the `type:message` error key. The message is a plain prefix, no
/// ellipsis, so the stored key splits back into the literal message text.
pub fn error_key(error_type: &str, message: &str) -> String {
    let truncated: String = message.chars().take(ERROR_MESSAGE_KEY_LEN).collect();
    format!("{}:{}", error_type, truncated)
}

/// Split an error key back into `(type, message)`.
pub fn split_error_key(key: &str) -> (&str, &str) {
    match key.split_once(':') {
        Some((error_type, message)) => (error_type, message),
        None => (key, ""),
    }
}

fn file_extension(path: &str) -> Option<String> {
    Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use persist::MemoryStorage;

    fn open_empty() -> PatternStore {
        PatternStore::open(Box::new(MemoryStorage::default())).unwrap()
    }

    fn file_event(path: &str) -> Event {
        Event::now(EventKind::FileChanged { path: path.to_string() })
    }

    fn error_event(error_type: &str, message: &str) -> Event {
        Event::now(EventKind::ErrorSeen {
            error_type: error_type.to_string(),
            message: message.to_string(),
        })
    }

    #[test]
    fn test_empty_update_bumps_session_only() {
        let mut store = open_empty();
        store.update(&[]);
        store.update(&[]);
        assert_eq!(store.snapshot().total_sessions, 2);
        assert!(store.snapshot().facets.is_empty());
    }

    #[test]
    fn test_counters_are_monotonic() {
        let mut store = open_empty();
        let events = vec![file_event("src/a.ts"), file_event("src/a.ts")];
        store.update(&events);
        let first = store.snapshot().facet(FACET_FILES_CHANGED)["src/a.ts"];
        store.update(&events);
        let second = store.snapshot().facet(FACET_FILES_CHANGED)["src/a.ts"];
        assert_eq!(first, 2);
        assert_eq!(second, 4);
        assert!(second >= first);
    }

    #[test]
    fn test_file_changed_feeds_file_types() {
        let mut store = open_empty();
        store.update(&[file_event("src/app.TS"), file_event("lib/util.py")]);
        let types = store.snapshot().facet(FACET_FILE_TYPES);
        assert_eq!(types[".ts"], 1);
        assert_eq!(types[".py"], 1);
    }

    #[test]
    fn test_error_key_truncation() {
        let long = "x".repeat(200);
        let key = error_key("npm_error", &long);
        let (family, message) = split_error_key(&key);
        assert_eq!(family, "npm_error");
        // Plain prefix: the first 50 chars verbatim, no ellipsis marker
        assert_eq!(message, "x".repeat(50));

        let short_key = error_key("npm_error", "missing script: build");
        assert_eq!(split_error_key(&short_key).1, "missing script: build");
    }

    #[test]
    fn test_error_events_keyed_by_family_and_message() {
        let mut store = open_empty();
        store.update(&[
            error_event("typescript_error", "TS2322: bad"),
            error_event("typescript_error", "TS2322: bad"),
        ]);
        let errors = store.snapshot().facet(FACET_ERRORS);
        assert_eq!(errors["typescript_error:TS2322: bad"], 2);
    }

    #[test]
    fn test_session_summary_merges_additively() {
        let mut store = open_empty();
        let mut breakdown = SessionBreakdown::default();
        breakdown.prompt_intents.insert("testing".to_string(), 3);
        breakdown.slash_commands.insert("/test".to_string(), 2);
        let summary = Event::now(EventKind::SessionSummary { breakdown: breakdown.clone() });
        store.update(std::slice::from_ref(&summary));
        store.update(std::slice::from_ref(&summary));

        let snap = store.snapshot();
        assert_eq!(snap.conversations.last_session.prompt_intents["testing"], 6);
        assert_eq!(snap.conversations.total_sessions_analyzed, 2);
        assert_eq!(snap.facet(FACET_COMMANDS)["/test"], 4);
    }

    #[test]
    fn test_malformed_event_skipped_batch_continues() {
        let mut store = open_empty();
        store.update(&[
            Event::now(EventKind::CommandUsed { command: String::new() }),
            Event::now(EventKind::CommandUsed { command: "/lint".to_string() }),
        ]);
        assert_eq!(store.snapshot().facet(FACET_COMMANDS)["/lint"], 1);
        assert_eq!(store.snapshot().facet(FACET_COMMANDS).len(), 1);
    }

    #[test]
    fn test_corrupt_state_falls_back_to_empty() {
        let storage = MemoryStorage::with_contents("{not valid json");
        let store = PatternStore::open(Box::new(storage)).unwrap();
        assert_eq!(store.snapshot().total_sessions, 0);
        assert!(store.snapshot().facets.is_empty());
    }

    #[test]
    fn test_unknown_fields_survive_roundtrip() {
        let json = r#"{
            "facets": {"commands": {"/test": 3}, "mystery_facet": {"k": 1}},
            "total_sessions": 5,
            "some_future_field": {"nested": true}
        }"#;
        let storage = MemoryStorage::with_contents(json);
        let store = PatternStore::open(Box::new(storage)).unwrap();
        assert_eq!(store.snapshot().facet("mystery_facet")["k"], 1);
        assert!(store.snapshot().extra.contains_key("some_future_field"));

        let out = serde_json::to_string(store.snapshot()).unwrap();
        assert!(out.contains("some_future_field"));
    }
}
