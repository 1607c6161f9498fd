//! Rulesmith - Adaptive Rule and Command Synthesis Library
//!
//! Watches coding-session signals (file edits, slash commands, error
//! output, prompts), accumulates them as counters in a persistent pattern
//! store, and turns recurring patterns into two kinds of output:
//! - guidance rules merged into a managed section of the project's memory
//!   document, and
//! - workflow-command documents generated once per command.
//!
//! High-confidence candidates publish immediately; the rest wait in an
//! approval queue for a human decision.
//!
//! # Example
//!
//! ```ignore
//! use rulesmith::engine::Engine;
//! use rulesmith::analyze;
//!
//! fn main() -> anyhow::Result<()> {
//!     let engine = Engine::open(".")?;
//!     engine.init()?;
//!     let events = analyze::analyze_session(&session_text).into_events();
//!     engine.ingest(&events)?;
//!     let report = engine.publish()?;
//!     println!("{} rules published", report.published_rules);
//!     Ok(())
//! }
//! ```

// Core modules (order matters for cross-module dependencies)
pub mod config;
pub mod events;
pub mod heuristics;
pub mod store; // Must come before classify since classifiers read snapshots
pub mod classify;
pub mod templates;
pub mod merge;
pub mod queue;
pub mod analyze;
pub mod engine;
pub mod cli;

// Re-export commonly used types for convenience
pub use classify::{Evidence, Opportunity, OpportunityKind};
pub use config::Config;
pub use engine::{Engine, PublishReport};
pub use events::{Event, EventKind};
pub use queue::{ApprovalQueue, EntryStatus, QueueEntry};
pub use store::PatternStore;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Truncate on a char boundary, ellipsis included in the length budget.
pub fn truncate_safe(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        return s.to_string();
    }
    let keep = max_len.saturating_sub(3);
    let truncated: String = s.chars().take(keep).collect();
    format!("{}...", truncated)
}
