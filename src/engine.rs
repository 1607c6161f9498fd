//! Engine orchestration
//!
//! Wires the analysis pipeline together for one workspace: ingest events
//! into the pattern store, classify the snapshot into opportunities, and
//! publish what clears the confidence gate - rules into the managed document
//! section, commands into artifact files, everything else into the approval
//! queue.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{info, warn};

use crate::classify::{self, Opportunity, OpportunityKind};
use crate::config::Config;
use crate::events::Event;
use crate::merge;
use crate::queue::ApprovalQueue;
use crate::store::persist::FileStorage;
use crate::store::PatternStore;
use crate::templates;

const STATE_DIR: &str = ".rulesmith";

/// Filesystem layout of one project workspace.
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn state_dir(&self) -> PathBuf {
        self.root.join(STATE_DIR)
    }

    pub fn config_path(&self) -> PathBuf {
        self.state_dir().join("config.toml")
    }

    pub fn patterns_path(&self) -> PathBuf {
        self.state_dir().join("patterns.json")
    }

    pub fn queue_path(&self) -> PathBuf {
        self.state_dir().join("pending.json")
    }

    pub fn commands_dir(&self) -> PathBuf {
        self.state_dir().join("commands")
    }
}

/// Opportunities split by the publish gate. The boundary is inclusive:
/// exactly at the threshold publishes.
pub struct Candidates {
    pub publishable: Vec<Opportunity>,
    pub queued: Vec<Opportunity>,
}

/// What one publish pass did.
#[derive(Debug, Default)]
pub struct PublishReport {
    pub published_rules: usize,
    pub created_commands: usize,
    pub skipped_existing: usize,
    pub queued: usize,
    /// Per-item write failures; the pass continues past them.
    pub failures: Vec<String>,
}

/// Snapshot summary for the status command.
#[derive(Debug)]
pub struct StatusReport {
    pub total_sessions: u64,
    pub facet_totals: Vec<(String, u64)>,
    pub pending_entries: usize,
    pub approved_entries: usize,
}

pub struct Engine {
    workspace: Workspace,
    config: Config,
}

impl Engine {
    /// Open a workspace, reading its config (defaults when absent).
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let workspace = Workspace::new(root);
        let config = Config::load(&workspace.config_path())?;
        Ok(Self { workspace, config })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    fn document_path(&self) -> PathBuf {
        self.workspace.root().join(&self.config.document.file)
    }

    /// Seed the state directory, default config, and scaffold document.
    /// Existing files are left alone, so init is safe to repeat.
    pub fn init(&self) -> Result<()> {
        let commands_dir = self.workspace.commands_dir();
        fs::create_dir_all(&commands_dir)
            .with_context(|| format!("creating {}", commands_dir.display()))?;

        let config_path = self.workspace.config_path();
        if !config_path.exists() {
            self.config.save(&config_path)?;
            info!("wrote default config to {}", config_path.display());
        }

        let document_path = self.document_path();
        if !document_path.exists() {
            let scaffold = merge::scaffold_document(
                &self.config.document.section_heading,
                &self.config.document.end_marker,
            );
            fs::write(&document_path, scaffold)
                .with_context(|| format!("writing {}", document_path.display()))?;
            info!("created scaffold document {}", document_path.display());
        }

        Ok(())
    }

    pub fn open_store(&self) -> Result<PatternStore> {
        PatternStore::open_at(&self.workspace.patterns_path()).context("opening pattern store")
    }

    fn open_queue(&self) -> Result<ApprovalQueue> {
        ApprovalQueue::open(Box::new(FileStorage::new(self.workspace.queue_path())))
            .context("opening approval queue")
    }

    /// Fold a batch of events into the store and persist it.
    pub fn ingest(&self, events: &[Event]) -> Result<usize> {
        let mut store = self.open_store()?;
        store.update(events);
        store.save().context("saving pattern store")?;
        Ok(events.len())
    }

    /// Classify the current snapshot and split by the publish gate.
    pub fn candidates(&self) -> Result<Candidates> {
        let store = self.open_store()?;
        Ok(self.candidates_from(&store))
    }

    fn candidates_from(&self, store: &PatternStore) -> Candidates {
        let snapshot = store.snapshot();
        let thresholds = &self.config.thresholds;

        let mut opportunities =
            classify::find_rule_opportunities(snapshot, thresholds, &crate::heuristics::RegexCodeExtractor);
        opportunities.extend(classify::find_command_opportunities(snapshot, thresholds));

        let gate = thresholds.publish_threshold;
        Candidates {
            publishable: classify::publishable(&opportunities, gate),
            queued: classify::below_gate(&opportunities, gate),
        }
    }

    /// One full publish pass. Approved queue entries ride along with the
    /// freshly publishable candidates; below-gate candidates are queued for
    /// review. Per-item write failures are recorded, not fatal.
    pub fn publish(&self) -> Result<PublishReport> {
        let store = self.open_store()?;
        let mut queue = self.open_queue()?;
        let candidates = self.candidates_from(&store);

        let mut to_publish = candidates.publishable;
        for entry in queue.approved() {
            if !to_publish.iter().any(|op| op.slug == entry.opportunity.slug) {
                to_publish.push(entry.opportunity.clone());
            }
        }

        let mut report = PublishReport::default();
        let now = Utc::now();

        let rules: Vec<Opportunity> = to_publish
            .iter()
            .filter(|op| op.kind == OpportunityKind::Rule)
            .cloned()
            .collect();
        if !rules.is_empty() {
            match self.publish_rules(&rules, now) {
                Ok(()) => report.published_rules = rules.len(),
                Err(e) => {
                    warn!("document update failed: {e:#}");
                    report.failures.push(format!("document: {e:#}"));
                }
            }
        }

        for op in to_publish.iter().filter(|op| op.kind == OpportunityKind::Command) {
            match self.publish_command(op, now) {
                Ok(true) => report.created_commands += 1,
                Ok(false) => report.skipped_existing += 1,
                Err(e) => {
                    warn!("command artifact '{}' failed: {e:#}", op.slug);
                    report.failures.push(format!("{}: {e:#}", op.slug));
                }
            }
        }

        report.queued = queue.enqueue(candidates.queued, now);
        queue.save().context("saving approval queue")?;

        info!(
            "publish pass: {} rules, {} commands created, {} queued, {} failures",
            report.published_rules,
            report.created_commands,
            report.queued,
            report.failures.len()
        );
        Ok(report)
    }

    fn publish_rules(&self, rules: &[Opportunity], now: chrono::DateTime<Utc>) -> Result<()> {
        let document_path = self.document_path();
        // Only absence gets a fresh scaffold. Any other read failure aborts
        // the rule write, leaving the document untouched.
        let document = match fs::read_to_string(&document_path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => merge::scaffold_document(
                &self.config.document.section_heading,
                &self.config.document.end_marker,
            ),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("reading {}", document_path.display()));
            }
        };
        let body = merge::render_rules_section(rules, now);
        let merged = merge::upsert(
            &document,
            &self.config.document.section_heading,
            &self.config.document.end_marker,
            &body,
        );
        fs::write(&document_path, merged)
            .with_context(|| format!("writing {}", document_path.display()))
    }

    /// Write one command artifact. Artifacts are write-once per slug;
    /// an existing file is never overwritten.
    fn publish_command(&self, op: &Opportunity, now: chrono::DateTime<Utc>) -> Result<bool> {
        let template = templates::command_template(&op.slug)
            .with_context(|| format!("no command template for '{}'", op.slug))?;
        let dir = self.workspace.commands_dir();
        let path = dir.join(format!("{}.md", op.slug));
        if path.exists() {
            return Ok(false);
        }
        fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;
        let artifact =
            templates::render_command_artifact(template, op.confidence, &op.evidence.summary(), now);
        fs::write(&path, artifact).with_context(|| format!("writing {}", path.display()))?;
        Ok(true)
    }

    pub fn status(&self) -> Result<StatusReport> {
        let store = self.open_store()?;
        let queue = self.open_queue()?;
        let snapshot = store.snapshot();
        Ok(StatusReport {
            total_sessions: snapshot.total_sessions,
            facet_totals: snapshot
                .facets
                .iter()
                .map(|(name, counts)| (name.clone(), counts.values().sum()))
                .collect(),
            pending_entries: queue.pending().count(),
            approved_entries: queue.approved().count(),
        })
    }

    pub fn queue_entries(&self) -> Result<Vec<crate::queue::QueueEntry>> {
        Ok(self.open_queue()?.entries().to_vec())
    }

    pub fn approve(&self, id: &str) -> Result<bool> {
        let mut queue = self.open_queue()?;
        let found = queue.approve(id);
        if found {
            queue.save().context("saving approval queue")?;
        }
        Ok(found)
    }

    pub fn reject(&self, id: &str) -> Result<bool> {
        let mut queue = self.open_queue()?;
        let found = queue.reject(id);
        if found {
            queue.save().context("saving approval queue")?;
        }
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;

    fn engine(dir: &tempfile::TempDir) -> Engine {
        Engine::open(dir.path()).unwrap()
    }

    fn ts_error_events(n: usize) -> Vec<Event> {
        (0..n)
            .map(|_| {
                Event::now(EventKind::ErrorSeen {
                    error_type: "typescript_error".to_string(),
                    message: "TS2322: Type 'string' is not assignable to type 'number'".to_string(),
                })
            })
            .collect()
    }

    #[test]
    fn test_init_is_repeatable() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(&dir);
        engine.init().unwrap();
        engine.init().unwrap();
        assert!(engine.workspace().config_path().exists());
        assert!(dir.path().join("AGENTS.md").exists());
    }

    #[test]
    fn test_low_confidence_rule_is_queued_not_published() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(&dir);
        engine.init().unwrap();
        engine.ingest(&ts_error_events(3)).unwrap();

        let report = engine.publish().unwrap();
        assert_eq!(report.published_rules, 0);
        assert_eq!(report.queued, 1);

        let doc = std::fs::read_to_string(dir.path().join("AGENTS.md")).unwrap();
        assert!(doc.contains("No adaptive rules generated yet"));
    }

    #[test]
    fn test_boundary_confidence_publishes() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(&dir);
        engine.init().unwrap();
        engine.ingest(&ts_error_events(7)).unwrap();

        let report = engine.publish().unwrap();
        assert_eq!(report.published_rules, 1);
        assert_eq!(report.queued, 0);

        let doc = std::fs::read_to_string(dir.path().join("AGENTS.md")).unwrap();
        assert!(doc.contains("### Typescript Error"));
        assert!(doc.contains("confidence: 70.0%"));
    }

    #[test]
    fn test_command_artifacts_are_write_once() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(&dir);
        engine.init().unwrap();
        // 8 TS errors: publishable fix-ts-errors command (0.8) plus the rule
        engine.ingest(&ts_error_events(8)).unwrap();

        let first = engine.publish().unwrap();
        assert_eq!(first.created_commands, 1);
        let artifact = engine.workspace().commands_dir().join("fix-ts-errors.md");
        assert!(artifact.exists());
        let original = std::fs::read_to_string(&artifact).unwrap();

        let second = engine.publish().unwrap();
        assert_eq!(second.created_commands, 0);
        assert_eq!(second.skipped_existing, 1);
        assert_eq!(std::fs::read_to_string(&artifact).unwrap(), original);
    }

    #[test]
    fn test_unreadable_document_is_left_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(&dir);
        engine.init().unwrap();

        // Hand-maintained document with a latin-1 byte: read_to_string fails
        let doc_path = dir.path().join("AGENTS.md");
        let original: &[u8] = b"Caf\xe9 deploy rules: Fridays only.\n";
        std::fs::write(&doc_path, original).unwrap();

        engine.ingest(&ts_error_events(7)).unwrap();
        let report = engine.publish().unwrap();

        assert_eq!(report.published_rules, 0);
        assert_eq!(report.failures.len(), 1);
        assert!(report.failures[0].starts_with("document:"));
        assert_eq!(std::fs::read(&doc_path).unwrap(), original);
    }

    #[test]
    fn test_absent_document_is_scaffolded_on_publish() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(&dir);
        // No init: the document does not exist yet
        engine.ingest(&ts_error_events(7)).unwrap();
        let report = engine.publish().unwrap();

        assert_eq!(report.published_rules, 1);
        assert!(report.failures.is_empty());
        let doc = std::fs::read_to_string(dir.path().join("AGENTS.md")).unwrap();
        assert!(doc.contains("## Project Overview"));
        assert!(doc.contains("### Typescript Error"));
    }

    #[test]
    fn test_approved_entry_rides_next_publish() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(&dir);
        engine.init().unwrap();
        engine.ingest(&ts_error_events(3)).unwrap();
        engine.publish().unwrap();

        let entries = engine.queue_entries().unwrap();
        assert_eq!(entries.len(), 1);
        assert!(engine.approve(&entries[0].id).unwrap());

        let report = engine.publish().unwrap();
        assert_eq!(report.published_rules, 1);
        let doc = std::fs::read_to_string(dir.path().join("AGENTS.md")).unwrap();
        assert!(doc.contains("### Typescript Error"));
    }
}
