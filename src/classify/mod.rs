//! Classifiers - pure mappings from store snapshots to opportunities
//!
//! Opportunities are recomputed from scratch on every pass; they carry the
//! rendered content, a saturating confidence score, and the raw counts that
//! justified them.

pub mod commands;
pub mod rules;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub use commands::find_command_opportunities;
pub use rules::find_rule_opportunities;

/// What kind of artifact an opportunity becomes when published.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpportunityKind {
    /// A guidance sentence merged into the managed document region
    Rule,
    /// A workflow-command document written once per slug
    Command,
}

/// A candidate unit of generated guidance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Opportunity {
    pub kind: OpportunityKind,
    /// Grouping label in the rendered document (e.g. "Typescript Error")
    pub category: String,
    /// Stable identity for dedup and artifact naming
    pub slug: String,
    /// Rendered rule text or command document body
    pub content: String,
    /// In [0, 1], saturating in the supporting count
    pub confidence: f64,
    /// Raw counts that justified the opportunity
    pub evidence: Evidence,
}

/// The supporting counts behind an opportunity.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Evidence(pub BTreeMap<String, serde_json::Value>);

impl Evidence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.0.insert(key.to_string(), value.into());
        self
    }

    /// The occurrence count shown in rendered annotations, if recorded.
    pub fn occurrences(&self) -> Option<u64> {
        self.0
            .get("occurrences")
            .or_else(|| self.0.get("usage_count"))
            .and_then(|v| v.as_u64())
    }

    /// Compact `key=value` form for artifact frontmatter.
    pub fn summary(&self) -> String {
        self.0
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Saturating confidence: non-decreasing in `count`, never above `cap`.
pub fn confidence(count: u64, cap: f64, normalizer: f64) -> f64 {
    (count as f64 / normalizer).min(cap)
}

/// Apply the publish gate: opportunities at or above the threshold are
/// eligible for immediate publication. The boundary value is included.
pub fn publishable(opportunities: &[Opportunity], threshold: f64) -> Vec<Opportunity> {
    opportunities
        .iter()
        .filter(|o| o.confidence >= threshold)
        .cloned()
        .collect()
}

/// The complement of the publish gate: everything routed to approval.
pub fn below_gate(opportunities: &[Opportunity], threshold: f64) -> Vec<Opportunity> {
    opportunities
        .iter()
        .filter(|o| o.confidence < threshold)
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opportunity(slug: &str, conf: f64) -> Opportunity {
        Opportunity {
            kind: OpportunityKind::Rule,
            category: "Test".to_string(),
            slug: slug.to_string(),
            content: "- rule".to_string(),
            confidence: conf,
            evidence: Evidence::new(),
        }
    }

    #[test]
    fn test_confidence_saturates_at_cap() {
        let cap = 0.9;
        let normalizer = 10.0;
        let mut previous = 0.0;
        for count in 0..100 {
            let c = confidence(count, cap, normalizer);
            assert!(c >= previous, "confidence must be non-decreasing");
            assert!(c <= cap, "confidence must never exceed the cap");
            previous = c;
        }
        assert_eq!(confidence(0, cap, normalizer), 0.0);
        assert_eq!(confidence(3, cap, normalizer), 0.3);
        assert_eq!(confidence(1000, cap, normalizer), cap);
    }

    #[test]
    fn test_publish_gate_boundary_inclusive() {
        let ops = vec![
            opportunity("under", 0.69),
            opportunity("exact", 0.7),
            opportunity("over", 0.71),
        ];
        let eligible = publishable(&ops, 0.7);
        let slugs: Vec<&str> = eligible.iter().map(|o| o.slug.as_str()).collect();
        assert_eq!(slugs, vec!["exact", "over"]);

        let queued = below_gate(&ops, 0.7);
        assert_eq!(queued.len(), 1);
        assert_eq!(queued[0].slug, "under");
    }

    #[test]
    fn test_evidence_summary() {
        let evidence = Evidence::new().with("occurrences", 3u64).with("error_type", "npm_error");
        assert_eq!(evidence.occurrences(), Some(3));
        assert!(evidence.summary().contains("occurrences=3"));
    }
}
