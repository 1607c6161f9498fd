//! Session-log and tool-output analysis
//!
//! Turns caller-provided text into events the pattern store can count. Two
//! shapes are accepted for session logs: a JSON transcript (object with
//! `messages` / `tool_calls` arrays) or plain text, one line per signal.
//! Nothing here touches the host - no file discovery, no subprocesses.

use serde::Deserialize;
use tracing::debug;

use crate::events::{Event, EventKind, SessionBreakdown};
use crate::heuristics;

/// Everything one analysis pass extracted from a session log.
#[derive(Debug, Default)]
pub struct SessionReport {
    pub breakdown: SessionBreakdown,
    pub events: Vec<Event>,
}

impl SessionReport {
    /// Events plus a trailing summary event carrying the breakdown, ready
    /// for `PatternStore::update`.
    pub fn into_events(mut self) -> Vec<Event> {
        self.events.push(Event::now(EventKind::SessionSummary {
            breakdown: self.breakdown,
        }));
        self.events
    }
}

#[derive(Deserialize)]
struct Transcript {
    #[serde(default)]
    messages: Vec<TranscriptMessage>,
    #[serde(default)]
    tool_calls: Vec<TranscriptToolCall>,
}

#[derive(Deserialize)]
struct TranscriptMessage {
    #[serde(default)]
    role: String,
    #[serde(default)]
    content: String,
}

#[derive(Deserialize)]
struct TranscriptToolCall {
    #[serde(default)]
    name: String,
}

/// Analyze a session log. JSON transcripts are detected by a leading `{`;
/// anything else (including malformed JSON) falls back to line-oriented
/// text parsing.
pub fn analyze_session(log: &str) -> SessionReport {
    if log.trim_start().starts_with('{') {
        if let Ok(transcript) = serde_json::from_str::<Transcript>(log) {
            return analyze_transcript(transcript);
        }
        debug!("session log is not a valid transcript, parsing as text");
    }
    analyze_text(log)
}

fn analyze_transcript(transcript: Transcript) -> SessionReport {
    let mut report = SessionReport::default();

    for call in &transcript.tool_calls {
        if !call.name.is_empty() {
            *report
                .breakdown
                .tool_types
                .entry(call.name.clone())
                .or_insert(0) += 1;
        }
    }

    for message in &transcript.messages {
        if message.role != "user" {
            continue;
        }
        note_prompt(&mut report, &message.content);
    }

    report
}

fn analyze_text(log: &str) -> SessionReport {
    let mut report = SessionReport::default();

    for line in log.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        for command in heuristics::extract_slash_commands(line) {
            *report
                .breakdown
                .slash_commands
                .entry(command)
                .or_insert(0) += 1;
        }

        let errors = heuristics::detect_errors(line);
        if !errors.is_empty() {
            for (error_type, message) in errors {
                report
                    .events
                    .push(Event::now(EventKind::ErrorSeen { error_type, message }));
            }
        } else if !heuristics::is_error_line(line) && heuristics::looks_like_prompt(line) {
            // Error-ish lines that match no family are still not prompts
            note_prompt(&mut report, line);
        }
    }

    report
}

fn note_prompt(report: &mut SessionReport, prompt: &str) {
    let intent = heuristics::categorize_prompt(prompt);
    *report
        .breakdown
        .prompt_intents
        .entry(intent.to_string())
        .or_insert(0) += 1;

    for command in heuristics::extract_slash_commands(prompt) {
        *report
            .breakdown
            .slash_commands
            .entry(command)
            .or_insert(0) += 1;
    }
}

/// Scan raw tool output for recognized error families.
pub fn analyze_tool_output(output: &str) -> Vec<Event> {
    heuristics::detect_errors(output)
        .into_iter()
        .map(|(error_type, message)| Event::now(EventKind::ErrorSeen { error_type, message }))
        .collect()
}
