//! Configuration management
//!
//! Classifier thresholds and managed-document settings, persisted as TOML at
//! a project-relative path. Every field has a serde default so a partial
//! config file still loads.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Classifier thresholds
    #[serde(default)]
    pub thresholds: Thresholds,
    /// Managed document settings
    #[serde(default)]
    pub document: DocumentConfig,
}

/// Threshold and gating constants for the classifiers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thresholds {
    /// Occurrences before an error pattern yields a rule
    #[serde(default = "default_error_rule_threshold")]
    pub error_rule_threshold: u64,
    /// Usages before a slash command yields a workflow rule
    #[serde(default = "default_command_rule_threshold")]
    pub command_rule_threshold: u64,
    /// Minimum confidence for auto-publication (boundary inclusive)
    #[serde(default = "default_publish_threshold")]
    pub publish_threshold: f64,
    /// Share of a facet total needed for single-technology domination
    #[serde(default = "default_dominance_threshold")]
    pub dominance_threshold: f64,
    /// Share of a facet total needed for "contributing" status
    #[serde(default = "default_contributing_threshold")]
    pub contributing_threshold: f64,
    /// Facet total below which no proportion-based opportunity is emitted
    #[serde(default = "default_min_sample_size")]
    pub min_sample_size: u64,
    /// Testing-intent prompts before a smart-test command is suggested
    #[serde(default = "default_testing_intent_threshold")]
    pub testing_intent_threshold: u64,
    /// Debugging-intent prompts before a debug-helper command is suggested
    #[serde(default = "default_debugging_intent_threshold")]
    pub debugging_intent_threshold: u64,
    /// Refactoring-intent prompts before a safe-refactor command is suggested
    #[serde(default = "default_refactoring_intent_threshold")]
    pub refactoring_intent_threshold: u64,
    /// TypeScript error count before a fix-ts-errors command is suggested
    #[serde(default = "default_ts_error_command_threshold")]
    pub ts_error_command_threshold: u64,
    /// Dependency error count before a fix-deps command is suggested
    #[serde(default = "default_dependency_error_command_threshold")]
    pub dependency_error_command_threshold: u64,
    /// Change count that marks a file as frequently touched
    #[serde(default = "default_frequent_file_occurrences")]
    pub frequent_file_occurrences: u64,
    /// Frequently-touched files before a smart-commit command is suggested
    #[serde(default = "default_frequent_file_count")]
    pub frequent_file_count: u64,
}

fn default_error_rule_threshold() -> u64 {
    3
}

fn default_command_rule_threshold() -> u64 {
    5
}

fn default_publish_threshold() -> f64 {
    0.7
}

fn default_dominance_threshold() -> f64 {
    0.6
}

fn default_contributing_threshold() -> f64 {
    0.3
}

fn default_min_sample_size() -> u64 {
    5
}

fn default_testing_intent_threshold() -> u64 {
    5
}

fn default_debugging_intent_threshold() -> u64 {
    5
}

fn default_refactoring_intent_threshold() -> u64 {
    3
}

fn default_ts_error_command_threshold() -> u64 {
    5
}

fn default_dependency_error_command_threshold() -> u64 {
    3
}

fn default_frequent_file_occurrences() -> u64 {
    5
}

fn default_frequent_file_count() -> u64 {
    3
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            error_rule_threshold: default_error_rule_threshold(),
            command_rule_threshold: default_command_rule_threshold(),
            publish_threshold: default_publish_threshold(),
            dominance_threshold: default_dominance_threshold(),
            contributing_threshold: default_contributing_threshold(),
            min_sample_size: default_min_sample_size(),
            testing_intent_threshold: default_testing_intent_threshold(),
            debugging_intent_threshold: default_debugging_intent_threshold(),
            refactoring_intent_threshold: default_refactoring_intent_threshold(),
            ts_error_command_threshold: default_ts_error_command_threshold(),
            dependency_error_command_threshold: default_dependency_error_command_threshold(),
            frequent_file_occurrences: default_frequent_file_occurrences(),
            frequent_file_count: default_frequent_file_count(),
        }
    }
}

/// Managed document settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentConfig {
    /// The human-maintained document holding the managed region
    #[serde(default = "default_document_file")]
    pub file: String,
    /// Start marker: a unique heading owned by the engine
    #[serde(default = "default_section_heading")]
    pub section_heading: String,
    /// End marker: the sentinel line closing the managed region
    #[serde(default = "default_end_marker")]
    pub end_marker: String,
}

fn default_document_file() -> String {
    "AGENTS.md".to_string()
}

fn default_section_heading() -> String {
    "## Adaptive Rules".to_string()
}

fn default_end_marker() -> String {
    "---".to_string()
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            file: default_document_file(),
            section_heading: default_section_heading(),
            end_marker: default_end_marker(),
        }
    }
}

impl Config {
    /// Load configuration from a file, falling back to defaults when the file
    /// does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            let config: Config = toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config file {}", path.display()))?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Save configuration to a file, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }
        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write config file {}", path.display()))?;
        Ok(())
    }
}
