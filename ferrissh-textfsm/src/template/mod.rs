//! TextFSM template definitions.
//!
//! A template is a block of `Value` declarations, a blank line, then one or
//! more named states. Each state is a list of rules, one per line, indented
//! and starting with `^`:
//!
//! ```text
//! Value Required INTERFACE (\S+)
//! Value STATUS (up|down)
//!
//! Start
//!   ^${INTERFACE}\s+is\s+${STATUS} -> Record
//! ```
//!
//! Templates are parsed and validated up front, so an undefined state or a
//! bad action fails here rather than halfway through an input.

mod rule;
mod value;

pub use rule::{Action, LineOp, RecordOp, Rule};
pub use value::{MAX_NAME_LEN, ValueDef, ValueOption};

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use indexmap::IndexMap;

use crate::error::TemplateError;

/// Initial state every template must declare.
pub const START_STATE: &str = "Start";

/// Terminal state: stop processing, no implicit record.
pub const END_STATE: &str = "End";

/// Terminal state: stop processing as if input ended.
pub const EOF_STATE: &str = "EOF";

/// A named, ordered list of rules.
#[derive(Debug, Clone)]
pub struct State {
    pub name: String,
    pub rules: Vec<Rule>,
}

/// A parsed and validated template.
#[derive(Debug, Clone)]
pub struct TemplateDefinition {
    values: Vec<ValueDef>,
    states: IndexMap<String, State>,
}

impl TemplateDefinition {
    /// Read and parse a template file.
    pub fn from_file(path: &Path) -> Result<Self, TemplateError> {
        let source = fs::read_to_string(path).map_err(|source| TemplateError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&source)
    }

    /// Parse template source.
    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        let mut lines = source
            .lines()
            .enumerate()
            .map(|(i, line)| (i + 1, line.trim_end()));

        let values = parse_values(&mut lines)?;

        let groups: HashMap<&str, (usize, String)> = values
            .iter()
            .enumerate()
            .map(|(idx, v)| (v.name.as_str(), (idx, v.group_pattern())))
            .collect();

        let mut states: IndexMap<String, State> = IndexMap::new();
        while let Some((line, state)) = parse_state(&mut lines, &groups)? {
            if states.contains_key(&state.name) {
                return Err(TemplateError::DuplicateState {
                    line,
                    name: state.name,
                });
            }
            states.insert(state.name.clone(), state);
        }

        let template = Self { values, states };
        template.validate()?;
        Ok(template)
    }

    fn validate(&self) -> Result<(), TemplateError> {
        if !self.states.contains_key(START_STATE) {
            return Err(TemplateError::MissingStart);
        }

        for terminal in [END_STATE, EOF_STATE] {
            if self.states.get(terminal).is_some_and(|s| !s.rules.is_empty()) {
                return Err(TemplateError::NonEmptyTerminal {
                    name: terminal.to_string(),
                });
            }
        }

        for state in self.states.values() {
            for rule in &state.rules {
                let Some(target) = &rule.action.next_state else {
                    continue;
                };
                if target == END_STATE || target == EOF_STATE || self.states.contains_key(target) {
                    continue;
                }
                return Err(TemplateError::UndefinedState {
                    state: state.name.clone(),
                    target: target.clone(),
                    line: rule.line,
                });
            }
        }

        Ok(())
    }

    /// Declared values, in declaration order.
    pub fn values(&self) -> &[ValueDef] {
        &self.values
    }

    /// Value names, in declaration order (the record field order).
    pub fn header(&self) -> Vec<&str> {
        self.values.iter().map(|v| v.name.as_str()).collect()
    }

    /// Names of values flagged `Key`.
    ///
    /// For callers that want to identify rows; `Key` does not change how
    /// records are extracted.
    pub fn keys(&self) -> Vec<&str> {
        self.values
            .iter()
            .filter(|v| v.has(ValueOption::Key))
            .map(|v| v.name.as_str())
            .collect()
    }

    /// Get a state by name.
    pub fn state(&self, name: &str) -> Option<&State> {
        self.states.get(name)
    }

    /// All states, in declaration order.
    pub fn states(&self) -> impl Iterator<Item = &State> {
        self.states.values()
    }

    /// Check if the template declares a state.
    pub fn has_state(&self, name: &str) -> bool {
        self.states.contains_key(name)
    }
}

fn is_comment(line: &str) -> bool {
    line.trim_start().starts_with('#')
}

/// Consume the Value section, up to and including the first blank line.
fn parse_values<'a, I>(lines: &mut I) -> Result<Vec<ValueDef>, TemplateError>
where
    I: Iterator<Item = (usize, &'a str)>,
{
    let mut values: Vec<ValueDef> = Vec::new();
    let mut last_line = 0;

    for (line_num, line) in lines.by_ref() {
        last_line = line_num;
        if line.is_empty() {
            break;
        }
        if is_comment(line) {
            continue;
        }

        if line.starts_with("Value ") {
            let value = ValueDef::parse(line, line_num)?;
            if values.iter().any(|v| v.name == value.name) {
                return Err(TemplateError::InvalidValue {
                    line: line_num,
                    message: format!("duplicate declarations for Value '{}'", value.name),
                });
            }
            values.push(value);
        } else if values.is_empty() {
            return Err(TemplateError::ValueSection {
                line: line_num,
                message: "No Value definitions found".to_string(),
            });
        } else {
            return Err(TemplateError::ValueSection {
                line: line_num,
                message: "Expected blank line after last Value entry".to_string(),
            });
        }
    }

    if values.is_empty() {
        return Err(TemplateError::ValueSection {
            line: last_line,
            message: "No Value definitions found".to_string(),
        });
    }

    Ok(values)
}

/// Parse the next state block and its header line, or `None` at end of
/// template.
fn parse_state<'a, I>(
    lines: &mut I,
    groups: &HashMap<&str, (usize, String)>,
) -> Result<Option<(usize, State)>, TemplateError>
where
    I: Iterator<Item = (usize, &'a str)>,
{
    let Some((header_line, name)) = lines
        .by_ref()
        .find(|(_, line)| !line.is_empty() && !is_comment(line))
    else {
        return Ok(None);
    };

    if name.len() > MAX_NAME_LEN || !rule::is_word(name) || rule::is_reserved(name) {
        return Err(TemplateError::InvalidStateName {
            line: header_line,
            name: name.to_string(),
        });
    }

    let mut state = State {
        name: name.to_string(),
        rules: Vec::new(),
    };

    for (line_num, line) in lines.by_ref() {
        if line.trim().is_empty() {
            break;
        }
        if is_comment(line) {
            continue;
        }
        if !(line.starts_with(" ^") || line.starts_with("  ^") || line.starts_with("\t^")) {
            return Err(TemplateError::InvalidRule {
                state: state.name.clone(),
                line: line_num,
                message: "missing white space or carat ('^') before rule".to_string(),
            });
        }
        state
            .rules
            .push(Rule::parse(line, line_num, &state.name, groups)?);
    }

    Ok(Some((header_line, state)))
}
