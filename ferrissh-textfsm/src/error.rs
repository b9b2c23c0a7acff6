//! Error types for ferrissh-textfsm.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Main error type for ferrissh-textfsm operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Template index errors
    #[error("Index error: {0}")]
    Index(#[from] IndexLoadError),

    /// Template definition errors
    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    /// Output parsing errors
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// Record serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Index loading errors (missing file, bad header).
#[derive(Error, Debug)]
pub enum IndexLoadError {
    /// Index file does not exist
    #[error("Index file not found at {}", path.display())]
    NotFound { path: PathBuf },

    /// Index file could not be read
    #[error("Failed to read index file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// No header row before end of file
    #[error("No header found in index file")]
    MissingHeader,

    /// Header lacks one of the required columns
    #[error("Missing '{column}' column in index header: {header}")]
    MissingColumn {
        column: &'static str,
        header: String,
    },
}

/// Template authoring errors.
///
/// Line numbers are 1-based positions in the template source.
#[derive(Error, Debug)]
pub enum TemplateError {
    /// Template file could not be read
    #[error("Failed to read template {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Malformed `Value` declaration
    #[error("Invalid Value declaration: {message}. Line: {line}")]
    InvalidValue { line: usize, message: String },

    /// Value section missing or not terminated correctly
    #[error("{message}. Line: {line}")]
    ValueSection { line: usize, message: String },

    /// Malformed state header
    #[error("Invalid state name '{name}'. Line: {line}")]
    InvalidStateName { line: usize, name: String },

    /// State declared twice
    #[error("Duplicate state name '{name}'. Line: {line}")]
    DuplicateState { line: usize, name: String },

    /// Malformed rule line
    #[error("Invalid rule in state '{state}': {message}. Line: {line}")]
    InvalidRule {
        state: String,
        line: usize,
        message: String,
    },

    /// Rule pattern failed to compile
    #[error("Invalid regular expression '{pattern}' in state '{state}': {message}. Line: {line}")]
    InvalidPattern {
        state: String,
        line: usize,
        pattern: String,
        message: String,
    },

    /// Template has no `Start` state
    #[error("Missing state 'Start'")]
    MissingStart,

    /// `End` or `EOF` declared with rules
    #[error("Non-empty '{name}' state")]
    NonEmptyTerminal { name: String },

    /// Transition to a state that was never declared
    #[error("State '{target}' not found, referenced in state '{state}'. Line: {line}")]
    UndefinedState {
        state: String,
        target: String,
        line: usize,
    },
}

/// Errors returned by the output parser facade.
#[derive(Error, Debug)]
pub enum ParseError {
    /// No text supplied
    #[error("Empty output provided for parsing")]
    EmptyInput,

    /// Platform has no entries in the template index
    #[error("No templates registered for platform '{platform}'")]
    UnsupportedPlatform { platform: String },

    /// Platform is known but no entry matched the command
    #[error("No template found for platform '{platform}' command '{command}'")]
    NoTemplate { platform: String, command: String },

    /// The selected template is malformed
    #[error("Template definition error: {0}")]
    TemplateDefinition(#[from] TemplateError),

    /// A template `Error` action rejected an input line
    #[error(
        "Input rejected in state '{state}' by rule at line {rule_line}: {message}. Input line {line_number}: '{input_line}'"
    )]
    InputRejected {
        state: String,
        rule_line: usize,
        line_number: usize,
        input_line: String,
        message: String,
    },

    /// Unexpected engine fault
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using ferrissh-textfsm's Error.
pub type Result<T> = std::result::Result<T, Error>;
