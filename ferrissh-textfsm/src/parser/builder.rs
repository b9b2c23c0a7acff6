//! Builder for creating output parsers.

use std::path::PathBuf;

use super::OutputParser;
use super::config::ParserConfig;

/// Builder for constructing an [`OutputParser`].
///
/// # Example
///
/// ```rust,no_run
/// use ferrissh_textfsm::ParserBuilder;
///
/// let parser = ParserBuilder::new("/opt/ntc-templates/templates")
///     .index_file("index")
///     .template_cache_size(128)
///     .build();
///
/// let records = parser.parse("cisco_ios", "sh ver", "Cisco IOS Software, Version 15.2(4)M")?;
/// # Ok::<(), ferrissh_textfsm::error::ParseError>(())
/// ```
pub struct ParserBuilder {
    config: ParserConfig,
}

impl ParserBuilder {
    /// Create a new parser builder for the specified template directory.
    pub fn new(template_dir: impl Into<PathBuf>) -> Self {
        Self {
            config: ParserConfig::new(template_dir),
        }
    }

    /// Start from an existing configuration.
    pub fn from_config(config: ParserConfig) -> Self {
        Self { config }
    }

    /// Add a directory searched for template files after the main one.
    ///
    /// Directories are searched in the order they were added.
    pub fn extra_template_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.extra_template_dirs.push(dir.into());
        self
    }

    /// Set the index file name (default: "index").
    pub fn index_file(mut self, index_file: impl Into<String>) -> Self {
        self.config.index_file = index_file.into();
        self
    }

    /// Set how many parsed templates to keep (default: 64, 0 disables).
    pub fn template_cache_size(mut self, size: usize) -> Self {
        self.config.template_cache_size = size;
        self
    }

    /// Disable the parsed-template cache.
    pub fn no_template_cache(self) -> Self {
        self.template_cache_size(0)
    }

    /// Build the parser.
    ///
    /// The index is not read here; it is loaded on first use, or by calling
    /// [`OutputParser::reload`].
    pub fn build(self) -> OutputParser {
        OutputParser::new(self.config)
    }
}
