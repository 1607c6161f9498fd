//! Document merger
//!
//! Owns one delimited region of an otherwise human-maintained markdown
//! document. Every write replaces the whole region; nothing outside the
//! heading/end-marker pair is ever touched.

use chrono::{DateTime, Utc};

use crate::classify::Opportunity;

/// Upsert the managed section into `document`.
///
/// Heading absent: a new section (heading, body, end marker) is appended to
/// the end. Heading present: everything from the heading up to the first end
/// marker after it is replaced, keeping the marker and all content beyond it.
/// A missing end marker means the section runs to end-of-file, so the
/// remainder is discarded and a fresh marker written. Applying the same body
/// twice is a fixed point.
pub fn upsert(document: &str, heading: &str, end_marker: &str, body: &str) -> String {
    match document.find(heading) {
        None => {
            format!("{document}\n\n{heading}\n\n{body}\n\n{end_marker}\n")
        }
        Some(start) => {
            let after_heading = start + heading.len();
            let prefix = &document[..start];
            match document[after_heading..].find(end_marker) {
                Some(rel) => {
                    let suffix = &document[after_heading + rel..];
                    format!("{prefix}{heading}\n\n{body}\n\n{suffix}")
                }
                None => {
                    format!("{prefix}{heading}\n\n{body}\n\n{end_marker}\n")
                }
            }
        }
    }
}

/// Minimal starter document for projects without one. The managed section is
/// pre-seeded so the first publish replaces rather than appends.
pub fn scaffold_document(heading: &str, end_marker: &str) -> String {
    format!(
        "# Project Memory\n\
         \n\
         Project-specific context, coding standards, and preferences.\n\
         \n\
         ## Project Overview\n\
         \n\
         <!-- Add your project description here -->\n\
         \n\
         ## Coding Standards\n\
         \n\
         <!-- Add your coding standards and conventions here -->\n\
         \n\
         ## Common Patterns\n\
         \n\
         <!-- Add frequently used patterns and workflows here -->\n\
         \n\
         {heading}\n\
         \n\
         <!-- This section is maintained automatically. DO NOT EDIT. -->\n\
         \n\
         {body}\n\
         \n\
         {end_marker}\n",
        heading = heading,
        body = empty_section_body(),
        end_marker = end_marker,
    )
}

fn empty_section_body() -> &'static str {
    "*No adaptive rules generated yet. This section fills in as patterns accumulate.*"
}

/// Render the managed section body from published rules: grouped by
/// category, each rule annotated with its evidence count and confidence,
/// closed with a timestamp and rule-count footer.
pub fn render_rules_section(rules: &[Opportunity], now: DateTime<Utc>) -> String {
    if rules.is_empty() {
        return empty_section_body().to_string();
    }

    let mut categories: Vec<&str> = Vec::new();
    for rule in rules {
        if !categories.contains(&rule.category.as_str()) {
            categories.push(&rule.category);
        }
    }

    let mut out = Vec::new();
    for category in categories {
        out.push(format!("\n### {category}\n"));
        for rule in rules.iter().filter(|r| r.category == category) {
            out.push(rule.content.clone());
            match rule.evidence.occurrences() {
                Some(n) if n > 0 => out.push(format!(
                    "  *Generated from {} occurrences (confidence: {:.1}%)*",
                    n,
                    rule.confidence * 100.0
                )),
                _ => out.push(format!("  *Confidence: {:.1}%*", rule.confidence * 100.0)),
            }
            out.push(String::new());
        }
    }

    out.push(format!(
        "\n*Last updated: {}*",
        now.format("%Y-%m-%d %H:%M:%S")
    ));
    out.push(format!("*{} adaptive rules*", rules.len()));

    out.join("\n")
}
