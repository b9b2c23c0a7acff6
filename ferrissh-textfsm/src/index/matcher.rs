//! Template selection for a (platform, command) pair.

use std::path::PathBuf;

use log::{debug, trace};

use super::command::normalize;
use super::{IndexEntry, TemplateRegistry};

/// How an index entry was selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    /// The expanded command pattern fully matched the command.
    Exact,

    /// Fallback: one side's literal text contained the other.
    Substring,
}

/// A resolved template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateRef {
    /// Normalized platform the lookup ran against.
    pub platform: String,

    /// Template file name as written in the index.
    pub template_name: String,

    /// Template file path, from the first template directory holding the file.
    pub path: PathBuf,

    /// Raw command pattern of the selected entry.
    pub command_pattern: String,

    /// Which pass selected the entry.
    pub match_kind: MatchKind,
}

/// Outcome of a template lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// A template was selected.
    Found(TemplateRef),

    /// The platform has no entries at all.
    UnsupportedPlatform,

    /// The platform is known but no entry with an existing template file
    /// matched the command.
    NoMatch,
}

impl Resolution {
    /// The selected template, if any.
    pub fn template(&self) -> Option<&TemplateRef> {
        match self {
            Resolution::Found(template) => Some(template),
            _ => None,
        }
    }

    /// Consume the resolution, returning the selected template.
    pub fn into_template(self) -> Option<TemplateRef> {
        match self {
            Resolution::Found(template) => Some(template),
            _ => None,
        }
    }
}

/// Select the template for `platform` + `command`.
///
/// The exact pass runs over every entry before the substring pass starts, so
/// an exact match always wins over an earlier substring match. Within a pass
/// the first entry in index order wins. Entries whose file is not present in
/// any of `template_dirs` are skipped.
pub fn find(
    registry: &TemplateRegistry,
    template_dirs: &[PathBuf],
    platform: &str,
    command: &str,
) -> Resolution {
    let platform = platform.trim().to_lowercase();
    let command = normalize(command);

    let Some(entries) = registry.entries(&platform) else {
        debug!("No templates found for platform '{}'", platform);
        return Resolution::UnsupportedPlatform;
    };

    trace!(
        "Looking for command '{}' in platform '{}' with {} templates",
        command,
        platform,
        entries.len()
    );

    let found = |entry: &IndexEntry, path: PathBuf, match_kind: MatchKind| {
        debug!(
            "Found {:?} match template {} for '{}'",
            match_kind,
            path.display(),
            command
        );
        Resolution::Found(TemplateRef {
            platform: platform.clone(),
            template_name: entry.template_name.clone(),
            path,
            command_pattern: entry.command_pattern.clone(),
            match_kind,
        })
    };

    let matches = |entry: &IndexEntry, kind: MatchKind| {
        registry
            .matcher(&entry.command_pattern)
            .is_some_and(|m| match kind {
                MatchKind::Exact => m.is_exact_match(&command),
                MatchKind::Substring => m.is_substring_match(&command),
            })
    };

    for kind in [MatchKind::Exact, MatchKind::Substring] {
        for entry in entries.iter().filter(|e| matches(*e, kind)) {
            match locate(template_dirs, &entry.template_name) {
                Some(path) => return found(entry, path, kind),
                None => debug!(
                    "Skipping {:?} match {} for '{}': file not found",
                    kind, entry.template_name, command
                ),
            }
        }
    }

    debug!("No template found for '{}' command '{}'", platform, command);
    Resolution::NoMatch
}

/// First directory, in order, that holds `template_name`.
fn locate(template_dirs: &[PathBuf], template_name: &str) -> Option<PathBuf> {
    template_dirs
        .iter()
        .map(|dir| dir.join(template_name))
        .find(|path| path.exists())
}
