//! Approval queue
//!
//! Append-only store for opportunities that fell short of the publish gate.
//! Entries keep their append order, are never rewritten by `enqueue`, and
//! only flip status through an explicit approve/reject decision. Promotion
//! of approved entries happens elsewhere.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::classify::{Opportunity, OpportunityKind};
use crate::store::persist::{StorageError, StoragePort};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueEntry {
    pub id: String,
    pub status: EntryStatus,
    pub generated_at: DateTime<Utc>,
    #[serde(flatten)]
    pub opportunity: Opportunity,
}

pub struct ApprovalQueue {
    entries: Vec<QueueEntry>,
    storage: Box<dyn StoragePort>,
}

impl ApprovalQueue {
    /// Load the queue, falling back to empty on corrupt contents.
    pub fn open(storage: Box<dyn StoragePort>) -> Result<Self, StorageError> {
        let entries = match storage.load()? {
            Some(raw) => match serde_json::from_str(&raw) {
                Ok(entries) => entries,
                Err(err) => {
                    warn!("approval queue is corrupt, starting empty: {err}");
                    Vec::new()
                }
            },
            None => Vec::new(),
        };
        Ok(Self { entries, storage })
    }

    pub fn entries(&self) -> &[QueueEntry] {
        &self.entries
    }

    pub fn pending(&self) -> impl Iterator<Item = &QueueEntry> {
        self.entries
            .iter()
            .filter(|entry| entry.status == EntryStatus::Pending)
    }

    pub fn approved(&self) -> impl Iterator<Item = &QueueEntry> {
        self.entries
            .iter()
            .filter(|entry| entry.status == EntryStatus::Approved)
    }

    /// Append opportunities as pending entries. An opportunity whose slug is
    /// already queued (any status) is skipped, so repeated analysis passes do
    /// not pile up duplicates. Returns how many entries were added.
    pub fn enqueue(&mut self, opportunities: Vec<Opportunity>, now: DateTime<Utc>) -> usize {
        let mut added = 0;
        for opportunity in opportunities {
            if self
                .entries
                .iter()
                .any(|entry| entry.opportunity.slug == opportunity.slug)
            {
                debug!("'{}' already queued, skipping", opportunity.slug);
                continue;
            }
            let id = self.next_id(opportunity.kind, now);
            self.entries.push(QueueEntry {
                id,
                status: EntryStatus::Pending,
                generated_at: now,
                opportunity,
            });
            added += 1;
        }
        added
    }

    pub fn approve(&mut self, id: &str) -> bool {
        self.set_status(id, EntryStatus::Approved)
    }

    pub fn reject(&mut self, id: &str) -> bool {
        self.set_status(id, EntryStatus::Rejected)
    }

    fn set_status(&mut self, id: &str, status: EntryStatus) -> bool {
        match self.entries.iter_mut().find(|entry| entry.id == id) {
            Some(entry) => {
                entry.status = status;
                true
            }
            None => false,
        }
    }

    pub fn save(&self) -> Result<(), StorageError> {
        let raw = serde_json::to_string_pretty(&self.entries).map_err(|e| {
            StorageError::Unwritable {
                path: "<approval queue>".to_string(),
                reason: e.to_string(),
            }
        })?;
        self.storage.save(&raw)
    }

    /// Ids follow `RUL-YYYYMMDD-NNN` / `CMD-YYYYMMDD-NNN`, with NNN counting
    /// up across the whole queue for that prefix and day.
    fn next_id(&self, kind: OpportunityKind, now: DateTime<Utc>) -> String {
        let prefix = match kind {
            OpportunityKind::Rule => "RUL",
            OpportunityKind::Command => "CMD",
        };
        let date = now.format("%Y%m%d").to_string();
        let stem = format!("{prefix}-{date}-");
        let max_seen = self
            .entries
            .iter()
            .filter_map(|entry| entry.id.strip_prefix(&stem))
            .filter_map(|suffix| suffix.parse::<u32>().ok())
            .max()
            .unwrap_or(0);
        format!("{}{:03}", stem, max_seen + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::Evidence;
    use crate::store::persist::MemoryStorage;

    fn opportunity(slug: &str, kind: OpportunityKind) -> Opportunity {
        Opportunity {
            kind,
            category: "Test".to_string(),
            slug: slug.to_string(),
            content: "- do the thing".to_string(),
            confidence: 0.3,
            evidence: Evidence::new().with("occurrences", 3u64),
        }
    }

    fn open_empty() -> ApprovalQueue {
        ApprovalQueue::open(Box::new(MemoryStorage::default())).unwrap()
    }

    #[test]
    fn test_enqueue_assigns_sequential_ids() {
        let mut queue = open_empty();
        let now = Utc::now();
        queue.enqueue(
            vec![
                opportunity("a", OpportunityKind::Rule),
                opportunity("b", OpportunityKind::Rule),
                opportunity("c", OpportunityKind::Command),
            ],
            now,
        );
        let date = now.format("%Y%m%d").to_string();
        assert_eq!(queue.entries()[0].id, format!("RUL-{date}-001"));
        assert_eq!(queue.entries()[1].id, format!("RUL-{date}-002"));
        assert_eq!(queue.entries()[2].id, format!("CMD-{date}-001"));
    }

    #[test]
    fn test_enqueue_skips_already_queued_slugs() {
        let mut queue = open_empty();
        let now = Utc::now();
        assert_eq!(queue.enqueue(vec![opportunity("a", OpportunityKind::Rule)], now), 1);
        assert_eq!(queue.enqueue(vec![opportunity("a", OpportunityKind::Rule)], now), 0);
        assert_eq!(queue.entries().len(), 1);
    }

    #[test]
    fn test_enqueue_preserves_existing_entries() {
        let mut queue = open_empty();
        let now = Utc::now();
        queue.enqueue(vec![opportunity("a", OpportunityKind::Rule)], now);
        queue.approve(&queue.entries()[0].id.clone());
        queue.enqueue(vec![opportunity("b", OpportunityKind::Rule)], now);
        assert_eq!(queue.entries().len(), 2);
        assert_eq!(queue.entries()[0].status, EntryStatus::Approved);
    }

    #[test]
    fn test_approve_and_reject_flip_status_only() {
        let mut queue = open_empty();
        let now = Utc::now();
        queue.enqueue(
            vec![
                opportunity("a", OpportunityKind::Rule),
                opportunity("b", OpportunityKind::Rule),
            ],
            now,
        );
        let first = queue.entries()[0].id.clone();
        let second = queue.entries()[1].id.clone();
        assert!(queue.approve(&first));
        assert!(queue.reject(&second));
        assert!(!queue.approve("RUL-19700101-001"));
        assert_eq!(queue.entries().len(), 2);
        assert_eq!(queue.pending().count(), 0);
        assert_eq!(queue.approved().count(), 1);
    }

    #[test]
    fn test_roundtrips_through_storage() {
        let storage = MemoryStorage::default();
        let mut queue = ApprovalQueue::open(Box::new(storage.clone())).unwrap();
        queue.enqueue(vec![opportunity("a", OpportunityKind::Rule)], Utc::now());
        queue.save().unwrap();

        let reloaded = ApprovalQueue::open(Box::new(storage)).unwrap();
        assert_eq!(reloaded.entries().len(), 1);
        assert_eq!(reloaded.entries()[0].opportunity.slug, "a");
        assert_eq!(reloaded.entries()[0].status, EntryStatus::Pending);
    }

    #[test]
    fn test_corrupt_queue_starts_empty() {
        let storage = MemoryStorage::with_contents("not json at all");
        let queue = ApprovalQueue::open(Box::new(storage)).unwrap();
        assert!(queue.entries().is_empty());
    }
}
