//! State rules and their actions.

use std::collections::HashMap;

use fancy_regex::Regex;

use crate::error::TemplateError;

/// What to do with the input line after a rule matches.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LineOp {
    /// Advance to the next input line.
    #[default]
    Next,

    /// Keep testing the remaining rules of the state against the same line.
    Continue,

    /// Abort the run, with an optional message.
    Error(Option<String>),
}

/// What to do with the record being assembled after a rule matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecordOp {
    /// Leave the record untouched.
    #[default]
    NoRecord,

    /// Emit the record, then clear non-Filldown values.
    Record,

    /// Clear non-Filldown values without emitting.
    Clear,

    /// Clear every value, Filldown included.
    Clearall,
}

/// A validated rule action: `LineOp[.RecordOp] [NewState]`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Action {
    pub line: LineOp,
    pub record: RecordOp,

    /// State to move to after the line is consumed.
    pub next_state: Option<String>,
}

impl Action {
    /// Parse the text after `->`.
    fn parse(source: &str) -> Result<Self, String> {
        let source = source.trim();
        let mut action = Action::default();
        if source.is_empty() {
            return Ok(action);
        }

        let (op, argument) = match source.find(char::is_whitespace) {
            Some(pos) => (&source[..pos], source[pos..].trim()),
            None => (source, ""),
        };

        let state_token = if let Some((line_op, record_op)) = op.split_once('.') {
            action.line = parse_line_op(line_op)
                .ok_or_else(|| format!("unknown line operation '{}'", line_op))?;
            action.record = parse_record_op(record_op)
                .ok_or_else(|| format!("unknown record operation '{}'", record_op))?;
            argument
        } else if let Some(line_op) = parse_line_op(op) {
            action.line = line_op;
            argument
        } else if let Some(record_op) = parse_record_op(op) {
            action.record = record_op;
            argument
        } else if argument.is_empty() {
            op
        } else {
            return Err(format!("badly formatted action '{}'", source));
        };

        if state_token.is_empty() {
            return Ok(action);
        }

        if let LineOp::Error(_) = action.line {
            let message = state_token.trim_matches('"').to_string();
            action.line = LineOp::Error(Some(message));
            return Ok(action);
        }

        if !is_word(state_token) {
            return Err(format!(
                "alphanumeric characters only in state names, got '{}'",
                state_token
            ));
        }
        if action.line == LineOp::Continue {
            return Err(format!(
                "action 'Continue' with new state {} specified",
                state_token
            ));
        }
        action.next_state = Some(state_token.to_string());

        Ok(action)
    }
}

fn parse_line_op(s: &str) -> Option<LineOp> {
    match s {
        "Next" => Some(LineOp::Next),
        "Continue" => Some(LineOp::Continue),
        "Error" => Some(LineOp::Error(None)),
        _ => None,
    }
}

fn parse_record_op(s: &str) -> Option<RecordOp> {
    match s {
        "NoRecord" => Some(RecordOp::NoRecord),
        "Record" => Some(RecordOp::Record),
        "Clear" => Some(RecordOp::Clear),
        "Clearall" => Some(RecordOp::Clearall),
        _ => None,
    }
}

/// Keywords that cannot be used as state names.
pub(crate) fn is_reserved(name: &str) -> bool {
    parse_line_op(name).is_some() || parse_record_op(name).is_some()
}

pub(crate) fn is_word(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_alphanumeric() || c == '_')
}

/// A compiled rule within a state.
#[derive(Debug, Clone)]
pub struct Rule {
    /// The pattern as written, before value substitution.
    pub source: String,

    /// Compiled pattern with value groups substituted.
    pub regex: Regex,

    pub action: Action,

    /// Indices of the template values this rule captures.
    pub bindings: Vec<usize>,

    /// 1-based template line.
    pub line: usize,
}

impl Rule {
    /// Parse a rule line.
    ///
    /// `values` maps each declared value name to its index and named-group
    /// pattern.
    pub(crate) fn parse(
        source: &str,
        line: usize,
        state: &str,
        values: &HashMap<&str, (usize, String)>,
    ) -> Result<Self, TemplateError> {
        let invalid = |message: String| TemplateError::InvalidRule {
            state: state.to_string(),
            line,
            message,
        };

        let source = source.trim();
        let (pattern, action) = match split_action(source) {
            Some((pattern, action)) => (pattern, Action::parse(action).map_err(invalid)?),
            None => (source, Action::default()),
        };

        let expanded = substitute(pattern, values).map_err(invalid)?;
        let regex = Regex::new(&expanded).map_err(|e| TemplateError::InvalidPattern {
            state: state.to_string(),
            line,
            pattern: expanded.clone(),
            message: e.to_string(),
        })?;

        let mut bindings: Vec<usize> = regex
            .capture_names()
            .flatten()
            .filter_map(|name| values.get(name).map(|(idx, _)| *idx))
            .collect();
        bindings.sort_unstable();
        bindings.dedup();

        Ok(Self {
            source: pattern.to_string(),
            regex,
            action,
            bindings,
            line,
        })
    }
}

/// Split `pattern -> action` on the last whitespace-preceded `->`.
fn split_action(line: &str) -> Option<(&str, &str)> {
    line.rmatch_indices("->")
        .map(|(pos, _)| pos)
        .find(|&pos| line[..pos].ends_with(char::is_whitespace))
        .map(|pos| (line[..pos].trim_end(), &line[pos + 2..]))
}

/// Replace `${Name}` / `$Name` with value groups and `$$` with `$`.
fn substitute(pattern: &str, values: &HashMap<&str, (usize, String)>) -> Result<String, String> {
    let lookup = |name: &str| {
        values
            .get(name)
            .map(|(_, group)| group.as_str())
            .ok_or_else(|| format!("unknown value '{}' in rule", name))
    };

    let mut out = String::with_capacity(pattern.len());
    let mut rest = pattern;
    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];

        if let Some(tail) = after.strip_prefix('$') {
            out.push('$');
            rest = tail;
        } else if let Some(braced) = after.strip_prefix('{') {
            let end = braced
                .find('}')
                .ok_or_else(|| "unterminated '${' substitution".to_string())?;
            out.push_str(lookup(&braced[..end])?);
            rest = &braced[end + 1..];
        } else {
            let end = after
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                .unwrap_or(after.len());
            let name = &after[..end];
            if name.is_empty() || name.starts_with(|c: char| c.is_ascii_digit()) {
                return Err(
                    "invalid '$' placeholder; use '$$' for an end-of-line anchor".to_string(),
                );
            }
            out.push_str(lookup(name)?);
            rest = &after[end..];
        }
    }
    out.push_str(rest);

    Ok(out)
}
