//! Command classifier - maps accumulated patterns to executable command
//! opportunities
//!
//! Four independent signal groups feed this: prompt intents, file-type
//! dominance, recurring error families, and frequently changed files. Each
//! group only fires when its registry template exists, so an opportunity
//! always carries publishable content.

use super::{confidence, Evidence, Opportunity, OpportunityKind};
use crate::config::Thresholds;
use crate::store::{StoreState, FACET_ERRORS, FACET_FILES_CHANGED, FACET_FILE_TYPES};
use crate::templates;

/// All command opportunities supported by the current snapshot, unfiltered
/// by the publish gate.
pub fn find_command_opportunities(
    snapshot: &StoreState,
    thresholds: &Thresholds,
) -> Vec<Opportunity> {
    let mut opportunities = Vec::new();

    opportunities.extend(intent_commands(snapshot, thresholds));
    opportunities.extend(dominance_command(snapshot, thresholds));
    opportunities.extend(error_commands(snapshot, thresholds));
    opportunities.extend(commit_command(snapshot, thresholds));

    opportunities
}

fn template_opportunity(slug: &str, confidence: f64, evidence: Evidence) -> Option<Opportunity> {
    let template = templates::command_template(slug)?;
    Some(Opportunity {
        kind: OpportunityKind::Command,
        category: template.category.to_string(),
        slug: template.slug.to_string(),
        content: template.body.to_string(),
        confidence,
        evidence,
    })
}

/// Commands suggested by what the user keeps asking for.
fn intent_commands(snapshot: &StoreState, thresholds: &Thresholds) -> Vec<Opportunity> {
    let intents = &snapshot.conversations.last_session.prompt_intents;
    let count_of = |intent: &str| intents.get(intent).copied().unwrap_or(0);

    let mut ops = Vec::new();

    let testing = count_of("testing");
    if testing >= thresholds.testing_intent_threshold {
        ops.extend(template_opportunity(
            "smart-test",
            confidence(testing, 0.9, 10.0),
            Evidence::new().with("testing_prompts", testing),
        ));
    }

    let debugging = count_of("debugging");
    if debugging >= thresholds.debugging_intent_threshold {
        ops.extend(template_opportunity(
            "debug-helper",
            confidence(debugging, 0.9, 10.0),
            Evidence::new().with("debugging_prompts", debugging),
        ));
    }

    let refactoring = count_of("refactoring");
    if refactoring >= thresholds.refactoring_intent_threshold {
        ops.extend(template_opportunity(
            "safe-refactor",
            confidence(refactoring, 0.8, 5.0),
            Evidence::new().with("refactoring_prompts", refactoring),
        ));
    }

    ops
}

/// At most one lint/check command for the dominant language. The TypeScript
/// group is evaluated first; with a strict majority cutoff the two branches
/// are mutually exclusive anyway.
fn dominance_command(snapshot: &StoreState, thresholds: &Thresholds) -> Vec<Opportunity> {
    let file_types = snapshot.facet(FACET_FILE_TYPES);
    let total: u64 = file_types.values().sum();
    if total < thresholds.min_sample_size {
        return Vec::new();
    }

    let count_of = |ext: &str| file_types.get(ext).copied().unwrap_or(0);
    let ts_group = count_of(".ts") + count_of(".tsx") + count_of(".js") + count_of(".jsx");
    let py = count_of(".py");

    let ts_share = ts_group as f64 / total as f64;
    let py_share = py as f64 / total as f64;

    if ts_share > thresholds.dominance_threshold {
        return template_opportunity(
            "ts-check",
            0.8,
            Evidence::new()
                .with("js_ts_changes", ts_group)
                .with("total_changes", total),
        )
        .into_iter()
        .collect();
    }
    if py_share > thresholds.dominance_threshold {
        return template_opportunity(
            "py-lint",
            0.8,
            Evidence::new()
                .with("py_changes", py)
                .with("total_changes", total),
        )
        .into_iter()
        .collect();
    }

    Vec::new()
}

/// Fix-it commands for error families that keep recurring.
fn error_commands(snapshot: &StoreState, thresholds: &Thresholds) -> Vec<Opportunity> {
    let errors = snapshot.facet(FACET_ERRORS);
    let family_total = |families: &[&str]| -> u64 {
        errors
            .iter()
            .filter(|(key, _)| families.iter().any(|family| key.starts_with(family)))
            .map(|(_, count)| count)
            .sum()
    };

    let mut ops = Vec::new();

    let ts_errors = family_total(&["typescript_error"]);
    if ts_errors >= thresholds.ts_error_command_threshold {
        ops.extend(template_opportunity(
            "fix-ts-errors",
            confidence(ts_errors, 0.9, 10.0),
            Evidence::new().with("typescript_errors", ts_errors),
        ));
    }

    let dep_errors = family_total(&["npm_error", "module_not_found"]);
    if dep_errors >= thresholds.dependency_error_command_threshold {
        ops.extend(template_opportunity(
            "fix-deps",
            confidence(dep_errors, 0.8, 5.0),
            Evidence::new().with("dependency_errors", dep_errors),
        ));
    }

    ops
}

/// Commit helper once enough distinct files churn repeatedly.
fn commit_command(snapshot: &StoreState, thresholds: &Thresholds) -> Vec<Opportunity> {
    let hot_files = snapshot
        .facet(FACET_FILES_CHANGED)
        .values()
        .filter(|&&count| count >= thresholds.frequent_file_occurrences)
        .count() as u64;
    if hot_files < thresholds.frequent_file_count {
        return Vec::new();
    }
    template_opportunity(
        "smart-commit",
        0.7,
        Evidence::new().with("frequently_changed_files", hot_files),
    )
    .into_iter()
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_file_types(pairs: &[(&str, u64)]) -> StoreState {
        let mut snapshot = StoreState::default();
        let facet = snapshot
            .facets
            .entry("file_types".to_string())
            .or_default();
        for (ext, count) in pairs {
            facet.insert(ext.to_string(), *count);
        }
        snapshot
    }

    #[test]
    fn test_typescript_dominance_suggests_ts_check() {
        let snapshot = with_file_types(&[(".ts", 7), (".py", 3)]);
        let ops = find_command_opportunities(&snapshot, &Thresholds::default());
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].slug, "ts-check");
        assert_eq!(ops[0].confidence, 0.8);
    }

    #[test]
    fn dominance_is_exclusive() {
        // A strict majority cutoff means two groups can never both dominate.
        let snapshot = with_file_types(&[(".ts", 5), (".py", 5)]);
        let ops = find_command_opportunities(&snapshot, &Thresholds::default());
        assert!(ops.is_empty());
    }

    #[test]
    fn test_dominance_needs_min_sample() {
        let snapshot = with_file_types(&[(".ts", 4)]);
        let ops = find_command_opportunities(&snapshot, &Thresholds::default());
        assert!(ops.is_empty());
    }

    #[test]
    fn test_mixed_js_ts_group_counts_together() {
        let snapshot = with_file_types(&[(".ts", 3), (".jsx", 2), (".js", 2), (".py", 3)]);
        let ops = find_command_opportunities(&snapshot, &Thresholds::default());
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].slug, "ts-check");
    }

    #[test]
    fn test_testing_intent_suggests_smart_test() {
        let mut snapshot = StoreState::default();
        snapshot
            .conversations
            .last_session
            .prompt_intents
            .insert("testing".to_string(), 6);
        let ops = find_command_opportunities(&snapshot, &Thresholds::default());
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].slug, "smart-test");
        assert!((ops[0].confidence - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_refactoring_intent_lower_threshold() {
        let mut snapshot = StoreState::default();
        snapshot
            .conversations
            .last_session
            .prompt_intents
            .insert("refactoring".to_string(), 3);
        let ops = find_command_opportunities(&snapshot, &Thresholds::default());
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].slug, "safe-refactor");
        assert!((ops[0].confidence - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_recurring_ts_errors_suggest_fix_command() {
        let mut snapshot = StoreState::default();
        let errors = snapshot.facets.entry("errors".to_string()).or_default();
        errors.insert("typescript_error:TS2322: a".to_string(), 3);
        errors.insert("typescript_error:TS2345: b".to_string(), 2);
        let ops = find_command_opportunities(&snapshot, &Thresholds::default());
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].slug, "fix-ts-errors");
        assert!((ops[0].confidence - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_dependency_errors_pool_across_families() {
        let mut snapshot = StoreState::default();
        let errors = snapshot.facets.entry("errors".to_string()).or_default();
        errors.insert("npm_error:missing script".to_string(), 2);
        errors.insert("module_not_found:Cannot find module 'x'".to_string(), 1);
        let ops = find_command_opportunities(&snapshot, &Thresholds::default());
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].slug, "fix-deps");
        assert!((ops[0].confidence - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_hot_files_suggest_smart_commit() {
        let mut snapshot = StoreState::default();
        let files = snapshot
            .facets
            .entry("files_changed".to_string())
            .or_default();
        files.insert("src/app.ts".to_string(), 5);
        files.insert("src/api.ts".to_string(), 7);
        files.insert("src/db.ts".to_string(), 6);
        files.insert("README.md".to_string(), 1);
        let ops = find_command_opportunities(&snapshot, &Thresholds::default());
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].slug, "smart-commit");
        assert_eq!(ops[0].confidence, 0.7);
    }

    #[test]
    fn test_two_hot_files_are_not_enough() {
        let mut snapshot = StoreState::default();
        let files = snapshot
            .facets
            .entry("files_changed".to_string())
            .or_default();
        files.insert("src/app.ts".to_string(), 9);
        files.insert("src/api.ts".to_string(), 9);
        let ops = find_command_opportunities(&snapshot, &Thresholds::default());
        assert!(ops.is_empty());
    }

    #[test]
    fn test_empty_snapshot_yields_nothing() {
        let ops = find_command_opportunities(&StoreState::default(), &Thresholds::default());
        assert!(ops.is_empty());
    }
}
