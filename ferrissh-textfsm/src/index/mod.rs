//! Template index loading.
//!
//! The index is a comma-delimited file mapping (template, platform, command
//! pattern) rows. Comment lines start with `#`; the first other line is the
//! header and fixes the column order.

pub mod command;
pub mod matcher;

pub use command::{CommandMatcher, expand_pattern, normalize};
pub use matcher::{MatchKind, Resolution, TemplateRef, find};

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use log::{debug, warn};

use crate::error::IndexLoadError;

/// One row of the template index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    /// Lowercased platform identifier (e.g., "cisco_ios").
    pub platform: String,

    /// Raw command pattern, possibly with `[[...]]` completion groups.
    pub command_pattern: String,

    /// Template file name, relative to the template directory.
    pub template_name: String,
}

/// Platform -> ordered index entries.
///
/// Built once per load and never mutated afterwards. Entry order within a
/// platform is the row order of the index file.
#[derive(Debug, Default)]
pub struct TemplateRegistry {
    platforms: HashMap<String, Vec<IndexEntry>>,

    /// Compiled matchers keyed by raw command pattern.
    matchers: HashMap<String, Arc<CommandMatcher>>,
}

impl TemplateRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from index entries, preserving their order.
    pub fn from_entries(entries: impl IntoIterator<Item = IndexEntry>) -> Self {
        let mut registry = Self::new();
        for entry in entries {
            registry.insert(entry);
        }
        registry
    }

    fn insert(&mut self, entry: IndexEntry) {
        self.matchers
            .entry(entry.command_pattern.clone())
            .or_insert_with(|| Arc::new(expand_pattern(&entry.command_pattern)));
        self.platforms
            .entry(entry.platform.clone())
            .or_default()
            .push(entry);
    }

    /// Entries registered for a platform, in index order.
    pub fn entries(&self, platform: &str) -> Option<&[IndexEntry]> {
        self.platforms.get(platform).map(Vec::as_slice)
    }

    /// The compiled matcher for a raw command pattern.
    pub fn matcher(&self, pattern: &str) -> Option<&CommandMatcher> {
        self.matchers.get(pattern).map(Arc::as_ref)
    }

    /// Check if a platform has any entries.
    pub fn contains(&self, platform: &str) -> bool {
        self.platforms.contains_key(platform)
    }

    /// All platform names, sorted.
    pub fn platforms(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.platforms.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Full command forms supported by a platform, in index order.
    pub fn commands(&self, platform: &str) -> Vec<String> {
        self.entries(platform)
            .unwrap_or_default()
            .iter()
            .map(|e| command::literal_core(&e.command_pattern))
            .collect()
    }

    /// Number of platforms.
    pub fn len(&self) -> usize {
        self.platforms.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.platforms.is_empty()
    }
}

/// Load a registry from an index file on disk.
pub fn load(path: &Path) -> Result<TemplateRegistry, IndexLoadError> {
    if !path.is_file() {
        return Err(IndexLoadError::NotFound {
            path: path.to_path_buf(),
        });
    }

    let content = fs::read_to_string(path).map_err(|source| IndexLoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let registry = parse_index(&content)?;
    debug!(
        "Loaded templates for {} platforms from {}",
        registry.len(),
        path.display()
    );
    Ok(registry)
}

/// Parse index file contents into a registry.
pub fn parse_index(content: &str) -> Result<TemplateRegistry, IndexLoadError> {
    let mut lines = content
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'));

    let (_, header) = lines.next().ok_or(IndexLoadError::MissingHeader)?;
    let columns = Columns::from_header(header)?;

    let mut registry = TemplateRegistry::new();
    for (line_num, line) in lines {
        let fields = split_fields(line);
        match columns.entry(&fields) {
            Some(entry) => registry.insert(entry),
            None => warn!("Skipping malformed index row at line {}: '{}'", line_num, line),
        }
    }

    Ok(registry)
}

/// Column positions resolved from the header row.
#[derive(Debug, Clone, Copy)]
struct Columns {
    template: usize,
    platform: usize,
    command: usize,
}

impl Columns {
    fn from_header(header: &str) -> Result<Self, IndexLoadError> {
        let names: Vec<String> = split_fields(header)
            .iter()
            .map(|h| h.to_lowercase())
            .collect();
        let position = |column: &'static str, accepted: &[&str]| {
            names
                .iter()
                .position(|h| accepted.contains(&h.as_str()))
                .ok_or_else(|| IndexLoadError::MissingColumn {
                    column,
                    header: header.to_string(),
                })
        };

        Ok(Self {
            template: position("template", &["template"])?,
            platform: position("platform", &["platform", "vendor"])?,
            command: position("command", &["command"])?,
        })
    }

    fn entry(&self, fields: &[String]) -> Option<IndexEntry> {
        let template = fields.get(self.template)?;
        let platform = fields.get(self.platform)?;
        let command = fields.get(self.command)?;
        if template.is_empty() || platform.is_empty() || command.is_empty() {
            return None;
        }

        Some(IndexEntry {
            platform: platform.to_lowercase(),
            command_pattern: command.clone(),
            template_name: template.clone(),
        })
    }
}

/// Split a comma-delimited row, honouring double-quoted fields.
///
/// Inside quotes, `""` is a literal quote. Fields are trimmed.
fn split_fields(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                field.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                fields.push(field.trim().to_string());
                field.clear();
            }
            _ => field.push(c),
        }
    }
    fields.push(field.trim().to_string());

    fields
}
