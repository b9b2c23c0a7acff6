//! `Value` declarations.

use std::fmt;
use std::str::FromStr;

use crate::error::TemplateError;

/// Longest accepted Value or state name.
pub const MAX_NAME_LEN: usize = 48;

/// A flag on a Value declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueOption {
    /// Records with this value empty are discarded.
    Required,

    /// Value persists across records until overwritten or `Clearall`.
    Filldown,

    /// Newly matched value is copied up into earlier records missing it.
    Fillup,

    /// Marks the value as part of the record's identity.
    Key,

    /// Every match is appended to a list instead of overwriting.
    List,
}

impl ValueOption {
    /// Keyword as written in templates.
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueOption::Required => "Required",
            ValueOption::Filldown => "Filldown",
            ValueOption::Fillup => "Fillup",
            ValueOption::Key => "Key",
            ValueOption::List => "List",
        }
    }
}

impl FromStr for ValueOption {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Required" => Ok(ValueOption::Required),
            "Filldown" => Ok(ValueOption::Filldown),
            "Fillup" => Ok(ValueOption::Fillup),
            "Key" => Ok(ValueOption::Key),
            "List" => Ok(ValueOption::List),
            _ => Err(()),
        }
    }
}

impl fmt::Display for ValueOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed `Value [Options] Name (regex)` line.
#[derive(Debug, Clone)]
pub struct ValueDef {
    /// Value name, also the named capture group in rule patterns.
    pub name: String,

    /// The capture pattern as declared, including the outer parentheses.
    pub pattern: String,

    /// Declared options, in declaration order.
    pub options: Vec<ValueOption>,
}

impl ValueDef {
    /// Parse a Value declaration. `line` is the 1-based template line.
    pub fn parse(source: &str, line: usize) -> Result<Self, TemplateError> {
        let invalid = |message: String| TemplateError::InvalidValue { line, message };

        let rest = source
            .trim()
            .strip_prefix("Value")
            .filter(|r| r.starts_with(char::is_whitespace))
            .ok_or_else(|| invalid("line must start with 'Value'".to_string()))?
            .trim_start();

        let (first, remainder) = split_token(rest);
        let (options, name, pattern) = if remainder.starts_with('(') {
            ("", first, remainder)
        } else {
            let (name, pattern) = split_token(remainder);
            (first, name, pattern)
        };

        if name.is_empty() || pattern.is_empty() {
            return Err(invalid("expect at least 3 tokens on line".to_string()));
        }
        if name.len() > MAX_NAME_LEN || !name.chars().all(|c| c.is_alphanumeric() || c == '_') {
            return Err(invalid(format!("invalid value name '{}'", name)));
        }
        if !pattern.starts_with('(') || !pattern.ends_with(')') {
            return Err(invalid(format!(
                "value '{}' must be contained within a '()' pair",
                pattern
            )));
        }
        fancy_regex::Regex::new(pattern)
            .map_err(|e| invalid(format!("invalid regular expression '{}': {}", pattern, e)))?;

        let mut value = Self {
            name: name.to_string(),
            pattern: pattern.to_string(),
            options: Vec::new(),
        };
        for option in options.split(',').filter(|o| !o.is_empty()) {
            let option: ValueOption = option
                .parse()
                .map_err(|_| invalid(format!("unknown option \"{}\"", option)))?;
            if value.has(option) {
                return Err(invalid(format!("duplicate option \"{}\"", option)));
            }
            value.options.push(option);
        }

        Ok(value)
    }

    /// Check if an option is set.
    pub fn has(&self, option: ValueOption) -> bool {
        self.options.contains(&option)
    }

    /// The pattern with its outer group named after the value.
    ///
    /// `(\S+)` for value `Name` becomes `(?P<Name>\S+)`.
    pub fn group_pattern(&self) -> String {
        format!("(?P<{}>{}", self.name, &self.pattern[1..])
    }
}

/// Split off the first whitespace-delimited token.
fn split_token(s: &str) -> (&str, &str) {
    match s.find(char::is_whitespace) {
        Some(pos) => (&s[..pos], s[pos..].trim()),
        None => (s, ""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_without_options() {
        let value = ValueDef::parse(r"Value VERSION (\S+)", 1).unwrap();
        assert_eq!(value.name, "VERSION");
        assert_eq!(value.pattern, r"(\S+)");
        assert!(value.options.is_empty());
        assert_eq!(value.group_pattern(), r"(?P<VERSION>\S+)");
    }

    #[test]
    fn test_parse_with_options() {
        let value = ValueDef::parse(r"Value Filldown,Required CHASSIS (\S+ \S+)", 3).unwrap();
        assert_eq!(value.name, "CHASSIS");
        assert_eq!(value.pattern, r"(\S+ \S+)");
        assert!(value.has(ValueOption::Filldown));
        assert!(value.has(ValueOption::Required));
        assert!(!value.has(ValueOption::List));
    }

    #[test]
    fn test_parse_errors() {
        assert!(ValueDef::parse(r"Value (\S+)", 1).is_err());
        assert!(ValueDef::parse(r"Value NAME \S+", 1).is_err());
        assert!(ValueDef::parse(r"Value Bogus NAME (\S+)", 1).is_err());
        assert!(ValueDef::parse(r"Value List,List NAME (\S+)", 1).is_err());
        assert!(ValueDef::parse(r"Value NAME ((\S+)", 1).is_err());
        assert!(ValueDef::parse(r"Values NAME (\S+)", 1).is_err());
        assert!(ValueDef::parse(r"Value NA-ME (\S+)", 1).is_err());
    }

    #[test]
    fn test_error_carries_line() {
        let err = ValueDef::parse(r"Value Bogus NAME (\S+)", 7).unwrap_err();
        assert!(matches!(err, TemplateError::InvalidValue { line: 7, .. }));
    }
}
