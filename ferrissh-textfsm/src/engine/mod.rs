//! Record extraction engine.
//!
//! Runs a [`TemplateDefinition`] over text one line at a time. In the
//! current state the rules are tried in order; the first match binds its
//! captures and executes its action. Lines that match no rule are skipped.
//!
//! When the input runs out (or a rule moves to `EOF`) the engine performs
//! an implicit `Record`, unless the template declares an `EOF` state of its
//! own. Moving to `End` stops immediately without one.

pub mod record;

pub use record::{FieldValue, Record};

use std::fmt;

use indexmap::IndexMap;
use log::trace;

use crate::error::ParseError;
use crate::template::{
    END_STATE, EOF_STATE, LineOp, RecordOp, START_STATE, State, TemplateDefinition, ValueOption,
};

/// A non-fatal finding from an extraction run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseWarning {
    /// A `Required` value is empty in every emitted record (or none were
    /// emitted).
    RequiredNeverFilled { value: String },
}

impl fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseWarning::RequiredNeverFilled { value } => {
                write!(f, "Required value '{}' never received a value", value)
            }
        }
    }
}

/// Records produced by one run, plus any warnings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseOutcome {
    pub records: Vec<Record>,
    pub warnings: Vec<ParseWarning>,
}

/// Run a template over `text`.
///
/// Returns an empty outcome, not an error, when no rows matched.
pub fn extract(template: &TemplateDefinition, text: &str) -> Result<ParseOutcome, ParseError> {
    let mut ctx = ParseContext::new(template)?;

    for line in text.lines().map(|l| l.strip_suffix('\r').unwrap_or(l)) {
        ctx.line_index += 1;
        ctx.check_line(line)?;
        if !matches!(ctx.position, Position::Running(_)) {
            break;
        }
    }

    // End of input is seen by the rules as one last empty line.
    if matches!(ctx.position, Position::Running(_)) {
        ctx.line_index += 1;
        ctx.check_line("")?;
    }

    Ok(ctx.finish())
}

/// Where the machine is.
#[derive(Debug, Clone, Copy)]
enum Position<'t> {
    Running(&'t State),
    End,
    Eof,
}

/// Current value of one template Value.
#[derive(Debug, Clone)]
enum Slot {
    Scalar(Option<String>),
    List(Vec<String>),
}

impl Slot {
    fn new(list: bool) -> Self {
        if list {
            Slot::List(Vec::new())
        } else {
            Slot::Scalar(None)
        }
    }

    /// Never assigned (an explicitly matched empty string counts as set).
    fn is_unset(&self) -> bool {
        match self {
            Slot::Scalar(value) => value.is_none(),
            Slot::List(items) => items.is_empty(),
        }
    }

    fn is_empty(&self) -> bool {
        match self {
            Slot::Scalar(value) => value.as_deref().is_none_or(str::is_empty),
            Slot::List(items) => items.is_empty(),
        }
    }

    fn reset(&mut self) {
        match self {
            Slot::Scalar(value) => *value = None,
            Slot::List(items) => items.clear(),
        }
    }

    fn to_field(&self) -> FieldValue {
        match self {
            Slot::Scalar(value) => FieldValue::Single(value.clone().unwrap_or_default()),
            Slot::List(items) => FieldValue::List(items.clone()),
        }
    }
}

/// Live state of one extraction run.
struct ParseContext<'t> {
    template: &'t TemplateDefinition,
    position: Position<'t>,

    /// Record being assembled, one slot per template value.
    slots: Vec<Slot>,

    /// Emitted rows, in template value order.
    rows: Vec<Vec<FieldValue>>,

    /// 1-based number of the line being processed.
    line_index: usize,
}

impl<'t> ParseContext<'t> {
    fn new(template: &'t TemplateDefinition) -> Result<Self, ParseError> {
        let start = template
            .state(START_STATE)
            .ok_or_else(|| ParseError::Internal("template has no Start state".to_string()))?;

        Ok(Self {
            template,
            position: Position::Running(start),
            slots: template
                .values()
                .iter()
                .map(|v| Slot::new(v.has(ValueOption::List)))
                .collect(),
            rows: Vec::new(),
            line_index: 0,
        })
    }

    fn check_line(&mut self, line: &str) -> Result<(), ParseError> {
        let Position::Running(state) = self.position else {
            return Ok(());
        };

        for rule in &state.rules {
            let captures = rule.regex.captures(line).map_err(|e| {
                ParseError::Internal(format!(
                    "matching rule at template line {} against input line {}: {}",
                    rule.line, self.line_index, e
                ))
            })?;
            let Some(captures) = captures else {
                continue;
            };

            for &idx in &rule.bindings {
                let name = &self.template.values()[idx].name;
                let matched = captures.name(name).map(|m| m.as_str());
                self.assign(idx, matched);
            }

            match rule.action.record {
                RecordOp::NoRecord => {}
                RecordOp::Record => self.append_record(),
                RecordOp::Clear => self.clear_record(),
                RecordOp::Clearall => self.clear_all(),
            }

            match &rule.action.line {
                LineOp::Continue => continue,
                LineOp::Error(message) => {
                    return Err(ParseError::InputRejected {
                        state: state.name.clone(),
                        rule_line: rule.line,
                        line_number: self.line_index,
                        input_line: line.to_string(),
                        message: message
                            .clone()
                            .unwrap_or_else(|| "State Error raised".to_string()),
                    });
                }
                LineOp::Next => {}
            }

            if let Some(target) = &rule.action.next_state {
                self.transition(target)?;
            }
            break;
        }

        Ok(())
    }

    fn transition(&mut self, target: &str) -> Result<(), ParseError> {
        trace!("Line {}: transition to state '{}'", self.line_index, target);
        self.position = match target {
            END_STATE => Position::End,
            EOF_STATE => Position::Eof,
            _ => Position::Running(self.template.state(target).ok_or_else(|| {
                ParseError::Internal(format!("transition to undeclared state '{}'", target))
            })?),
        };
        Ok(())
    }

    fn assign(&mut self, idx: usize, matched: Option<&str>) {
        match &mut self.slots[idx] {
            // A group that did not take part leaves the current value alone.
            Slot::Scalar(value) => {
                if let Some(m) = matched {
                    *value = Some(m.to_string());
                }
            }
            Slot::List(items) => items.extend(matched.map(str::to_string)),
        }

        if let Some(value) = matched.filter(|m| !m.is_empty()) {
            if self.template.values()[idx].has(ValueOption::Fillup) {
                self.fill_up(idx, value);
            }
        }
    }

    /// Copy a value into earlier rows, newest first, until one already has it.
    fn fill_up(&mut self, idx: usize, value: &str) {
        for row in self.rows.iter_mut().rev() {
            if !row[idx].is_empty() {
                break;
            }
            row[idx] = FieldValue::Single(value.to_string());
        }
    }

    fn append_record(&mut self) {
        let missing_required = self
            .template
            .values()
            .iter()
            .zip(&self.slots)
            .any(|(value, slot)| value.has(ValueOption::Required) && slot.is_empty());
        if missing_required {
            self.clear_record();
            return;
        }

        if self.slots.iter().all(Slot::is_unset) {
            return;
        }

        self.rows.push(self.slots.iter().map(Slot::to_field).collect());
        self.clear_record();
    }

    /// Reset every value not flagged `Filldown`.
    fn clear_record(&mut self) {
        for (value, slot) in self.template.values().iter().zip(&mut self.slots) {
            if !value.has(ValueOption::Filldown) {
                slot.reset();
            }
        }
    }

    fn clear_all(&mut self) {
        self.slots.iter_mut().for_each(Slot::reset);
    }

    fn finish(mut self) -> ParseOutcome {
        if !matches!(self.position, Position::End) && !self.template.has_state(EOF_STATE) {
            self.append_record();
        }

        let header = self.template.header();
        let warnings = self
            .template
            .values()
            .iter()
            .enumerate()
            .filter(|(idx, value)| {
                value.has(ValueOption::Required) && self.rows.iter().all(|row| row[*idx].is_empty())
            })
            .map(|(_, value)| ParseWarning::RequiredNeverFilled {
                value: value.name.clone(),
            })
            .collect();

        let records = self
            .rows
            .into_iter()
            .map(|row| {
                let fields: IndexMap<String, FieldValue> = header
                    .iter()
                    .map(|name| name.to_string())
                    .zip(row)
                    .collect();
                Record::new(fields)
            })
            .collect();

        ParseOutcome { records, warnings }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(template: &str, text: &str) -> ParseOutcome {
        let template = TemplateDefinition::parse(template).unwrap();
        extract(&template, text).unwrap()
    }

    fn column<'a>(outcome: &'a ParseOutcome, name: &str) -> Vec<&'a str> {
        outcome
            .records
            .iter()
            .map(|r| r.get_str(name).unwrap())
            .collect()
    }

    #[test]
    fn test_one_record_per_line() {
        let template = "Value NAME (\\S+)\n\nStart\n  ^${NAME}$$ -> Record\n  ^$$ -> Record\n";
        let outcome = run(template, "alpha\nbeta\ngamma\n\n");
        assert_eq!(outcome.records.len(), 3);
        assert_eq!(column(&outcome, "NAME"), vec!["alpha", "beta", "gamma"]);
        assert!(outcome.records.iter().all(|r| r.len() == 1));
    }

    #[test]
    fn test_implicit_record_at_eof() {
        let template = "Value VERSION (\\S+)\nValue UPTIME (.+)\n\nStart\n  \
                        ^Version ${VERSION}\n  ^uptime is ${UPTIME}\n";
        let outcome = run(template, "Version 15.2(4)M\nuptime is 3 weeks\n");
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.records[0].get_str("VERSION"), Some("15.2(4)M"));
        assert_eq!(outcome.records[0].get_str("UPTIME"), Some("3 weeks"));
    }

    #[test]
    fn test_declared_eof_suppresses_implicit_record() {
        let template = "Value VERSION (\\S+)\n\nStart\n  ^Version ${VERSION}\n\nEOF\n";
        let outcome = run(template, "Version 1.0\n");
        assert!(outcome.records.is_empty());
    }

    #[test]
    fn test_unmatched_lines_ignored() {
        let template = "Value Required PORT (\\S+)\n\nStart\n  ^port ${PORT} -> Record\n";
        let outcome = run(template, "banner\nport eth0\n---\nport eth1\n");
        assert_eq!(column(&outcome, "PORT"), vec!["eth0", "eth1"]);
        assert!(outcome.warnings.is_empty());
    }

    #[test]
    fn test_filldown_persists_across_records() {
        let template = "Value Filldown VRF (\\S+)\nValue Required ROUTE (\\S+)\n\nStart\n  \
                        ^VRF ${VRF}\n  ^route ${ROUTE} -> Record\n";
        let text = "VRF red\nroute 10.0.0.0/8\nroute 10.1.0.0/16\nVRF blue\nroute 0.0.0.0/0\n";
        let outcome = run(template, text);
        assert_eq!(outcome.records.len(), 3);
        assert_eq!(column(&outcome, "VRF"), vec!["red", "red", "blue"]);
        assert_eq!(
            column(&outcome, "ROUTE"),
            vec!["10.0.0.0/8", "10.1.0.0/16", "0.0.0.0/0"]
        );
    }

    #[test]
    fn test_clearall_resets_filldown() {
        let template = "Value Filldown VRF (\\S+)\nValue ROUTE (\\S+)\n\nStart\n  \
                        ^VRF ${VRF}\n  ^route ${ROUTE} -> Record\n  ^reset -> Clearall\n";
        let outcome = run(template, "VRF red\nroute a\nreset\nroute b\n");
        assert_eq!(column(&outcome, "VRF"), vec!["red", ""]);
        assert_eq!(column(&outcome, "ROUTE"), vec!["a", "b"]);
    }

    #[test]
    fn test_list_accumulates_and_resets() {
        let template = "Value Required IFACE (\\S+)\nValue List ADDR (\\S+)\n\nStart\n  \
                        ^interface ${IFACE}\n  ^ address ${ADDR}\n  ^! -> Record\n";
        let text = "interface Gi1\n address 10.0.0.1\n address 10.0.0.2\n address 10.0.0.3\n!\n\
                    interface Gi2\n!\n";
        let outcome = run(template, text);
        assert_eq!(outcome.records.len(), 2);
        assert_eq!(
            outcome.records[0].get_list("ADDR").unwrap(),
            ["10.0.0.1", "10.0.0.2", "10.0.0.3"]
        );
        assert!(outcome.records[1].get_list("ADDR").unwrap().is_empty());
    }

    #[test]
    fn test_required_skips_record_and_warns() {
        let template = "Value Required NAME (\\S+)\nValue OTHER (\\S+)\n\nStart\n  \
                        ^other ${OTHER} -> Record\n";
        let outcome = run(template, "other x\nother y\n");
        assert!(outcome.records.is_empty());
        assert_eq!(
            outcome.warnings,
            vec![ParseWarning::RequiredNeverFilled {
                value: "NAME".to_string()
            }]
        );
    }

    #[test]
    fn test_continue_reapplies_line() {
        let template = "Value Required IFACE (\\S+)\nValue STATUS (up|down)\n\nStart\n  \
                        ^\\S+ is -> Continue.Record\n  ^${IFACE} is ${STATUS}\n";
        let outcome = run(template, "Gi1 is up\nGi2 is down\n");
        assert_eq!(column(&outcome, "IFACE"), vec!["Gi1", "Gi2"]);
        assert_eq!(column(&outcome, "STATUS"), vec!["up", "down"]);
    }

    #[test]
    fn test_state_transitions() {
        let template = "Value Required NAME (\\S+)\nValue PID (\\d+)\n\nStart\n  \
                        ^NAME\\s+PID -> Table\n\nTable\n  ^${NAME}\\s+${PID} -> Record\n  \
                        ^-- -> End\n";
        let text = "junk 1\nNAME PID\nsshd 100\ninit 1\n--\nafter 2\n";
        let outcome = run(template, text);
        assert_eq!(column(&outcome, "NAME"), vec!["sshd", "init"]);
        assert_eq!(column(&outcome, "PID"), vec!["100", "1"]);
    }

    #[test]
    fn test_eof_transition_records() {
        let template = "Value A (\\S+)\n\nStart\n  ^a ${A}\n  ^stop -> EOF\n";
        let outcome = run(template, "a 1\nstop\na 2\n");
        assert_eq!(column(&outcome, "A"), vec!["1"]);
    }

    #[test]
    fn test_fillup() {
        let template = "Value Required IFACE (\\S+)\nValue Fillup AREA (\\d+)\n\nStart\n  \
                        ^iface ${IFACE} -> Record\n  ^area ${AREA}\n";
        let text = "iface a\niface b\narea 0\n";
        let outcome = run(template, text);
        assert_eq!(column(&outcome, "AREA"), vec!["0", "0"]);
    }

    #[test]
    fn test_error_action() {
        let template = "Value A (\\S+)\n\nStart\n  ^a ${A}\n  ^. -> Error \"unexpected\"\n";
        let parsed = TemplateDefinition::parse(template).unwrap();
        let err = extract(&parsed, "a 1\nboom\n").unwrap_err();
        match err {
            ParseError::InputRejected {
                state,
                rule_line,
                line_number,
                input_line,
                message,
            } => {
                assert_eq!(state, "Start");
                assert_eq!(rule_line, 5);
                assert_eq!(line_number, 2);
                assert_eq!(input_line, "boom");
                assert_eq!(message, "unexpected");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_empty_result_is_not_an_error() {
        let template = "Value A (\\d+)\n\nStart\n  ^value ${A} -> Record\n";
        let outcome = run(template, "nothing here\n");
        assert!(outcome.records.is_empty());
        assert!(outcome.warnings.is_empty());
    }

    #[test]
    fn test_crlf_input() {
        let template = "Value A (\\S+)\n\nStart\n  ^a ${A}$$ -> Record\n";
        let outcome = run(template, "a 1\r\na 2\r\n");
        assert_eq!(column(&outcome, "A"), vec!["1", "2"]);

        // Bare carriage return on the last line, no trailing newline.
        let outcome = run(template, "a 1\r\na 2\r");
        assert_eq!(column(&outcome, "A"), vec!["1", "2"]);
    }

    #[test]
    fn test_key_does_not_change_records() {
        let template = "Value Key NAME (\\S+)\n\nStart\n  ^${NAME}$$ -> Record\n";
        let parsed = TemplateDefinition::parse(template).unwrap();
        assert_eq!(parsed.keys(), vec!["NAME"]);
        let outcome = extract(&parsed, "a\na\nb\n").unwrap();
        assert_eq!(column(&outcome, "NAME"), vec!["a", "a", "b"]);
    }

    #[test]
    fn test_optional_group_keeps_filldown() {
        let template = "Value Filldown VRF (\\S+)\nValue Required R (\\S+)\n\nStart\n  \
                        ^route ${R}(?: vrf ${VRF})? -> Record\n";
        let outcome = run(template, "route a vrf red\nroute b\n");
        assert_eq!(column(&outcome, "R"), vec!["a", "b"]);
        assert_eq!(column(&outcome, "VRF"), vec!["red", "red"]);
    }

    #[test]
    fn test_end_of_input_checked_as_empty_line() {
        let template = "Value A (\\S+)\n\nStart\n  ^a ${A}\n  ^$$ -> Record\n\nEOF\n";
        let outcome = run(template, "a 1");
        assert_eq!(column(&outcome, "A"), vec!["1"]);

        // End stops before the final empty line is seen.
        let template = "Value A (\\S+)\n\nStart\n  ^a ${A}\n  ^stop -> End\n  ^$$ -> Record\n";
        let outcome = run(template, "a 1\nstop\n");
        assert!(outcome.records.is_empty());
    }
}
