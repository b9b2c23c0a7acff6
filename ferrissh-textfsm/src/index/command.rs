//! Command normalization and completion-pattern expansion.
//!
//! Index entries describe commands with optional-completion groups:
//! `sh[[ow]] ver[[sion]]` accepts `sh ver`, `sho vers`, `show version`
//! and everything in between.

use regex::Regex;

/// Normalize a command string: trim, lowercase, collapse whitespace.
///
/// Total and idempotent.
pub fn normalize(command: &str) -> String {
    command
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Strip completion markers, leaving the full command form.
///
/// `sh[[ow]] ver[[sion]]` becomes `show version`.
pub fn literal_core(pattern: &str) -> String {
    normalize(&pattern.replace("[[", "").replace("]]", ""))
}

/// A compiled index command pattern.
#[derive(Debug, Clone)]
pub struct CommandMatcher {
    /// The raw pattern as written in the index.
    pattern: String,

    /// Full-match regex, `None` when the pattern failed to compile.
    regex: Option<Regex>,

    /// Pattern with completion markers removed.
    core: String,
}

impl CommandMatcher {
    /// The raw index pattern.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// The literal core used by the substring fallback.
    pub fn core(&self) -> &str {
        &self.core
    }

    /// Whether the pattern compiled to a usable regex.
    pub fn is_compiled(&self) -> bool {
        self.regex.is_some()
    }

    /// Full structural match against a normalized command.
    pub fn is_exact_match(&self, command: &str) -> bool {
        self.regex.as_ref().is_some_and(|re| re.is_match(command))
    }

    /// Loose match: either side contains the other's literal text.
    pub fn is_substring_match(&self, command: &str) -> bool {
        if command.is_empty() || self.core.is_empty() {
            return false;
        }
        command.contains(&self.core) || self.core.contains(command)
    }
}

/// Expand a completion pattern into a compiled matcher.
///
/// Never fails: a pattern whose regex does not compile yields a matcher that
/// only participates in substring matching.
pub fn expand_pattern(pattern: &str) -> CommandMatcher {
    let source = completion_regex_source(pattern);
    let regex = match Regex::new(&format!("(?i)^(?:{})$", source)) {
        Ok(re) => Some(re),
        Err(e) => {
            log::warn!("Invalid command pattern '{}': {}", pattern, e);
            None
        }
    };

    CommandMatcher {
        pattern: pattern.to_string(),
        regex,
        core: literal_core(pattern),
    }
}

/// Rewrite `word[[suffix]]` groups as nested optional groups.
///
/// `ver[[sion]]` becomes `ver(?:s(?:i(?:o(?:n)?)?)?)?`. Text outside the
/// groups is passed through as regex source, with whitespace runs widened
/// to `\s+`.
fn completion_regex_source(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() * 2);
    let mut rest = pattern.trim();

    while !rest.is_empty() {
        if let Some(after_open) = rest.strip_prefix("[[") {
            if let Some(close) = after_open.find("]]") {
                out.push_str(&optional_suffix(&after_open[..close]));
                rest = &after_open[close + 2..];
                continue;
            }
        }

        let mut chars = rest.chars();
        let Some(c) = chars.next() else { break };
        if c.is_whitespace() {
            out.push_str(r"\s+");
            rest = chars.as_str().trim_start();
        } else {
            out.push(c);
            rest = chars.as_str();
        }
    }

    out
}

fn optional_suffix(suffix: &str) -> String {
    let chars: Vec<char> = suffix.chars().collect();
    let mut out = String::new();
    for c in &chars {
        out.push_str("(?:");
        out.push_str(&regex::escape(&c.to_string()));
    }
    for _ in &chars {
        out.push_str(")?");
    }
    out
}
