//! Free-text pattern heuristics
//!
//! Keyword and regex predicates over error output and user prompts. These are
//! the only places dynamic text matching happens; the threshold and
//! confidence math in `classify` never looks inside the text itself.

use once_cell::sync::Lazy;
use regex::Regex;

/// Error-family detection patterns applied to raw tool output.
/// First capture group is the message.
const ERROR_PATTERNS: &[(&str, &str)] = &[
    // Keeps the TS code in the message so a specific code stays extractable
    (r"(TS\d+: .+)", "typescript_error"),
    (r"TypeError: (.+)", "type_error"),
    (r"SyntaxError: (.+)", "syntax_error"),
    (r"ESLint: (.+)", "eslint_error"),
    (r"npm ERR! (.+)", "npm_error"),
    (r"FAIL (.+)", "test_failure"),
    (r"Cannot find module (.+)", "module_not_found"),
    (r"Permission denied (.+)", "permission_error"),
    (r"Error: (.+)", "generic_error"),
];

static COMPILED_ERROR_PATTERNS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    ERROR_PATTERNS
        .iter()
        .map(|(pattern, family)| {
            let re = Regex::new(&format!("(?im){}", pattern)).expect("static error pattern");
            (re, *family)
        })
        .collect()
});

static SLASH_COMMAND_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/([a-zA-Z][a-zA-Z0-9_-]*)").expect("static slash pattern"));

static TS_CODE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"TS(\d+)").expect("static TS pattern"));

/// Detect `(error_type, message)` pairs in raw tool output. A line can only
/// match one family; families are tried in specificity order so `Error:`
/// stays the catch-all.
pub fn detect_errors(output: &str) -> Vec<(String, String)> {
    let mut found = Vec::new();
    for line in output.lines() {
        for (re, family) in COMPILED_ERROR_PATTERNS.iter() {
            if let Some(caps) = re.captures(line) {
                let message = caps.get(1).map(|m| m.as_str().trim()).unwrap_or("");
                if !message.is_empty() {
                    found.push((family.to_string(), message.to_string()));
                }
                break;
            }
        }
    }
    found
}

/// Extract slash commands (`/test`, `/safe-refactor`) from text.
pub fn extract_slash_commands(text: &str) -> Vec<String> {
    SLASH_COMMAND_RE
        .captures_iter(text)
        .map(|caps| format!("/{}", &caps[1]))
        .collect()
}

/// Extracts a structured code (e.g. `TS2322`) from an error message, when one
/// exists for the family. Pluggable so the heuristic set can be swapped or
/// tested apart from the threshold math.
pub trait ErrorCodeExtractor {
    fn extract(&self, error_type: &str, message: &str) -> Option<String>;
}

/// Default extractor: TypeScript diagnostic codes; other families have no
/// structured codes and fall back to their family-level template.
#[derive(Debug, Default, Clone, Copy)]
pub struct RegexCodeExtractor;

impl ErrorCodeExtractor for RegexCodeExtractor {
    fn extract(&self, error_type: &str, message: &str) -> Option<String> {
        if error_type == "typescript_error" {
            TS_CODE_RE
                .captures(message)
                .map(|caps| format!("TS{}", &caps[1]))
        } else {
            None
        }
    }
}

/// Prompt intent categories, in match-priority order.
const INTENT_KEYWORDS: &[(&str, &[&str])] = &[
    ("code_creation", &["create", "make", "build", "implement", "write", "add"]),
    ("debugging", &["debug", "fix", "error", "bug", "issue", "problem"]),
    ("refactoring", &["refactor", "improve", "optimize", "clean", "restructure"]),
    ("testing", &["test", "spec", "unit", "integration", "e2e"]),
    ("documentation", &["document", "comment", "readme", "docs", "explain"]),
    ("explanation", &["what", "why", "how", "understand"]),
    ("configuration", &["config", "setup", "install", "configure", "setting"]),
];

/// Categorize a user prompt into an intent. First matching category wins;
/// anything unmatched is "other".
pub fn categorize_prompt(prompt: &str) -> &'static str {
    let lower = prompt.to_lowercase();
    for (intent, keywords) in INTENT_KEYWORDS {
        if keywords.iter().any(|kw| lower.contains(kw)) {
            return intent;
        }
    }
    "other"
}

/// Indicators that a log line is an error message rather than chatter.
const ERROR_LINE_INDICATORS: &[&str] = &[
    "error:",
    "failed:",
    "exception:",
    "traceback:",
    "syntax error",
    "type error",
    "command not found",
    "permission denied",
    "npm err!",
    "fail:",
];

pub fn is_error_line(line: &str) -> bool {
    let lower = line.to_lowercase();
    ERROR_LINE_INDICATORS.iter().any(|ind| lower.contains(ind))
}

/// Prefixes marking a log line as system/tool output rather than the user.
const SYSTEM_PREFIXES: &[&str] = &[
    "> ", "$ ", "+ ", "- ", "* ", "INFO:", "DEBUG:", "WARN:", "ERROR:", "npm ", "git ",
    "python ", "node ", "Running", "Executing", "Creating", "Editing",
];

const PROMPT_INDICATORS: &[&str] = &[
    "can you", "please", "how do", "what is", "why does", "help me", "i need", "could you",
    "would you", "create", "make", "build", "implement", "fix", "debug",
];

/// Heuristic for plain-text logs: does this line read like something the
/// user typed?
pub fn looks_like_prompt(line: &str) -> bool {
    if line.len() < 10 || SYSTEM_PREFIXES.iter().any(|p| line.starts_with(p)) {
        return false;
    }
    let lower = line.to_lowercase();
    PROMPT_INDICATORS.iter().any(|ind| lower.contains(ind))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_errors_families() {
        let output = "TS2322: Type 'string' is not assignable to type 'number'\n\
                      npm ERR! missing script: build\n\
                      Cannot find module 'left-pad'\n\
                      all good here";
        let errors = detect_errors(output);
        assert_eq!(errors.len(), 3);
        assert_eq!(errors[0].0, "typescript_error");
        assert!(errors[0].1.starts_with("TS2322"));
        assert_eq!(errors[1].0, "npm_error");
        assert_eq!(errors[2].0, "module_not_found");
    }

    #[test]
    fn test_generic_error_is_catch_all() {
        let errors = detect_errors("Error: something unexpected happened");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].0, "generic_error");
    }

    #[test]
    fn test_extract_slash_commands() {
        let commands = extract_slash_commands("ran /test then /safe-refactor on it");
        assert_eq!(commands, vec!["/test", "/safe-refactor"]);
    }

    #[test]
    fn test_code_extraction() {
        let extractor = RegexCodeExtractor;
        assert_eq!(
            extractor.extract("typescript_error", "TS2322: bad assignment"),
            Some("TS2322".to_string())
        );
        assert_eq!(extractor.extract("typescript_error", "no code here"), None);
        assert_eq!(extractor.extract("npm_error", "TS2322 mentioned"), None);
    }

    #[test]
    fn test_categorize_prompt() {
        assert_eq!(categorize_prompt("please fix this bug"), "debugging");
        assert_eq!(categorize_prompt("write a parser for this"), "code_creation");
        assert_eq!(categorize_prompt("refactor the store module"), "refactoring");
        assert_eq!(categorize_prompt("hello there"), "other");
    }

    #[test]
    fn test_looks_like_prompt() {
        assert!(looks_like_prompt("can you add retry logic to the client"));
        assert!(!looks_like_prompt("$ cargo build"));
        assert!(!looks_like_prompt("npm install left-pad"));
        assert!(!looks_like_prompt("ok"));
    }

    #[test]
    fn test_is_error_line() {
        assert!(is_error_line("npm ERR! code ELIFECYCLE"));
        assert!(is_error_line("bash: foo: command not found"));
        assert!(!is_error_line("compiled successfully"));
    }
}
