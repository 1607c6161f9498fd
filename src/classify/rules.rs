//! Rule classifier - maps accumulated counters to guidance-rule opportunities
//!
//! Evaluates each (facet, key, count) triple against its facet threshold,
//! resolves a template, and scores a saturating confidence. Pure over the
//! snapshot.

use tracing::debug;

use super::{confidence, Evidence, Opportunity, OpportunityKind};
use crate::config::Thresholds;
use crate::heuristics::ErrorCodeExtractor;
use crate::store::{
    split_error_key, StoreState, FACET_COMMANDS, FACET_FILE_TYPES,
};
use crate::templates;

/// All rule opportunities supported by the current snapshot, unfiltered by
/// the publish gate. Deduplicated by slug, keeping the strongest evidence.
pub fn find_rule_opportunities(
    snapshot: &StoreState,
    thresholds: &Thresholds,
    extractor: &dyn ErrorCodeExtractor,
) -> Vec<Opportunity> {
    let mut opportunities = Vec::new();

    opportunities.extend(error_rules(snapshot, thresholds, extractor));
    opportunities.extend(workflow_rules(snapshot, thresholds));
    opportunities.extend(technology_rule(snapshot, thresholds));

    dedupe_by_slug(opportunities)
}

/// Error-prevention rules from the errors facet.
fn error_rules(
    snapshot: &StoreState,
    thresholds: &Thresholds,
    extractor: &dyn ErrorCodeExtractor,
) -> Vec<Opportunity> {
    let mut rules = Vec::new();
    for (key, count) in snapshot.facet(crate::store::FACET_ERRORS) {
        if count < thresholds.error_rule_threshold {
            continue;
        }
        let (family, message) = split_error_key(&key);
        let code = extractor.extract(family, message);
        let Some(template) = templates::error_rule_template(family, code.as_deref()) else {
            debug!("no rule template for error family '{}', skipping", family);
            continue;
        };
        let slug = match &code {
            Some(code) => format!("error-{}", code.to_lowercase()),
            None => format!("error-{}", family.replace('_', "-")),
        };
        rules.push(Opportunity {
            kind: OpportunityKind::Rule,
            category: templates::title_case_family(family),
            slug,
            content: template.text.to_string(),
            confidence: confidence(count, template.cap, template.normalizer),
            evidence: Evidence::new()
                .with("error_type", family)
                .with("message", message)
                .with("occurrences", count),
        });
    }
    rules
}

/// Workflow rules from frequently used slash commands.
fn workflow_rules(snapshot: &StoreState, thresholds: &Thresholds) -> Vec<Opportunity> {
    let mut rules = Vec::new();
    for (command, count) in snapshot.facet(FACET_COMMANDS) {
        if count < thresholds.command_rule_threshold {
            continue;
        }
        let Some(template) = templates::workflow_rule_template(&command) else {
            continue;
        };
        rules.push(Opportunity {
            kind: OpportunityKind::Rule,
            category: "Development Process".to_string(),
            slug: format!("workflow-{}", command.trim_start_matches('/')),
            content: template.text.to_string(),
            confidence: confidence(count, template.cap, template.normalizer),
            evidence: Evidence::new()
                .with("command", command.as_str())
                .with("usage_count", count),
        });
    }
    rules
}

/// At most one technology rule, from the dominant contributing file types.
/// TypeScript outranks Python outranks JavaScript when several contribute.
fn technology_rule(snapshot: &StoreState, thresholds: &Thresholds) -> Vec<Opportunity> {
    let file_types = snapshot.facet(FACET_FILE_TYPES);
    let total: u64 = file_types.values().sum();
    if total < thresholds.min_sample_size {
        return Vec::new();
    }

    let contributing: Vec<&str> = file_types
        .iter()
        .filter(|(_, &count)| count as f64 / total as f64 > thresholds.contributing_threshold)
        .map(|(ext, _)| ext.as_str())
        .collect();

    let category = if contributing.contains(&".ts") || contributing.contains(&".tsx") {
        "TypeScript"
    } else if contributing.contains(&".py") {
        "Python"
    } else if contributing.contains(&".js") || contributing.contains(&".jsx") {
        "JavaScript"
    } else {
        return Vec::new();
    };

    let Some(rule) = templates::technology_rule(category) else {
        return Vec::new();
    };

    vec![Opportunity {
        kind: OpportunityKind::Rule,
        category: category.to_string(),
        slug: format!("tech-{}", category.to_lowercase()),
        content: rule.text.to_string(),
        confidence: rule.confidence,
        evidence: Evidence::new()
            .with("contributing_types", contributing.join(", "))
            .with("total_changes", total),
    }]
}

fn dedupe_by_slug(opportunities: Vec<Opportunity>) -> Vec<Opportunity> {
    let mut deduped: Vec<Opportunity> = Vec::with_capacity(opportunities.len());
    for op in opportunities {
        match deduped.iter_mut().find(|existing| existing.slug == op.slug) {
            Some(existing) => {
                if op.confidence > existing.confidence {
                    *existing = op;
                }
            }
            None => deduped.push(op),
        }
    }
    deduped
}
