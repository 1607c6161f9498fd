//! CLI interface for rulesmith

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::analyze;
use crate::engine::Engine;
use crate::events;
use crate::queue::EntryStatus;

#[derive(Parser)]
#[command(name = "rulesmith")]
#[command(about = "Learns recurring patterns from coding sessions and synthesizes rules and commands", long_about = None)]
#[command(version)]
struct Cli {
    /// Project root (defaults to the current directory)
    #[arg(short = 'C', long, default_value = ".")]
    root: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Set up the state directory, default config, and memory document
    Init,
    /// Feed observations into the pattern store
    Ingest {
        /// JSON event batch file
        #[arg(long)]
        events: Option<PathBuf>,
        /// Session log file (JSON transcript or plain text)
        #[arg(long)]
        log: Option<PathBuf>,
        /// Raw tool output to scan for errors
        #[arg(long)]
        tool_output: Option<PathBuf>,
    },
    /// Show accumulated pattern counts and queue totals
    Status,
    /// List current rule and command candidates without writing anything
    Suggest,
    /// Publish qualifying candidates; queue the rest for approval
    Publish,
    /// Manage the approval queue
    Queue {
        #[command(subcommand)]
        command: QueueCommands,
    },
}

#[derive(Subcommand)]
enum QueueCommands {
    /// List queue entries with status
    List,
    /// Approve a pending entry (published on the next publish pass)
    Approve { id: String },
    /// Reject a pending entry
    Reject { id: String },
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let engine = Engine::open(&cli.root)?;

    match cli.command {
        Commands::Init => {
            engine.init()?;
            println!("Initialized workspace at {}", cli.root.display());
        }
        Commands::Ingest { events, log, tool_output } => {
            ingest(&engine, events, log, tool_output)?;
        }
        Commands::Status => {
            let status = engine.status()?;
            println!("Sessions analyzed: {}", status.total_sessions);
            for (facet, total) in &status.facet_totals {
                println!("  {facet}: {total} observations");
            }
            println!(
                "Queue: {} pending, {} approved",
                status.pending_entries, status.approved_entries
            );
        }
        Commands::Suggest => {
            let candidates = engine.candidates()?;
            if candidates.publishable.is_empty() && candidates.queued.is_empty() {
                println!("No candidates yet. Keep ingesting sessions.");
            }
            for op in &candidates.publishable {
                println!(
                    "[publishable] {:?} {} ({:.0}%) - {}",
                    op.kind,
                    op.slug,
                    op.confidence * 100.0,
                    op.evidence.summary()
                );
            }
            for op in &candidates.queued {
                println!(
                    "[needs approval] {:?} {} ({:.0}%) - {}",
                    op.kind,
                    op.slug,
                    op.confidence * 100.0,
                    op.evidence.summary()
                );
            }
        }
        Commands::Publish => {
            let report = engine.publish()?;
            println!(
                "Published {} rules, created {} commands ({} already existed), queued {}",
                report.published_rules,
                report.created_commands,
                report.skipped_existing,
                report.queued
            );
            for failure in &report.failures {
                eprintln!("write failed: {failure}");
            }
        }
        Commands::Queue { command } => match command {
            QueueCommands::List => {
                let entries = engine.queue_entries()?;
                if entries.is_empty() {
                    println!("Queue is empty.");
                }
                for entry in &entries {
                    let status = match entry.status {
                        EntryStatus::Pending => "pending",
                        EntryStatus::Approved => "approved",
                        EntryStatus::Rejected => "rejected",
                    };
                    let preview = entry.opportunity.content.lines().next().unwrap_or("");
                    println!(
                        "{} [{}] {} ({:.0}%) {}",
                        entry.id,
                        status,
                        entry.opportunity.slug,
                        entry.opportunity.confidence * 100.0,
                        crate::truncate_safe(preview, 60)
                    );
                }
            }
            QueueCommands::Approve { id } => {
                if engine.approve(&id)? {
                    println!("Approved {id}. It will publish on the next publish pass.");
                } else {
                    anyhow::bail!("no queue entry with id {id}");
                }
            }
            QueueCommands::Reject { id } => {
                if engine.reject(&id)? {
                    println!("Rejected {id}.");
                } else {
                    anyhow::bail!("no queue entry with id {id}");
                }
            }
        },
    }

    Ok(())
}

fn ingest(
    engine: &Engine,
    events: Option<PathBuf>,
    log: Option<PathBuf>,
    tool_output: Option<PathBuf>,
) -> Result<()> {
    let mut batch = Vec::new();

    if let Some(path) = events {
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("reading event batch {}", path.display()))?;
        batch.extend(events::parse_event_batch(&raw));
    }
    if let Some(path) = log {
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("reading session log {}", path.display()))?;
        batch.extend(analyze::analyze_session(&raw).into_events());
    }
    if let Some(path) = tool_output {
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("reading tool output {}", path.display()))?;
        batch.extend(analyze::analyze_tool_output(&raw));
    }

    if batch.is_empty() {
        anyhow::bail!("nothing to ingest: pass --events, --log, or --tool-output");
    }

    let count = engine.ingest(&batch)?;
    println!("Ingested {count} events.");
    Ok(())
}
