//! Output parser configuration.

use std::env;
use std::path::PathBuf;

use serde::Deserialize;

/// Environment variable naming the template directory.
pub const TEMPLATE_DIR_ENV: &str = "FERRISSH_TEMPLATE_DIR";

/// Template directory used when nothing else is configured.
pub const DEFAULT_TEMPLATE_DIR: &str = "./templates";

/// Index file name used when nothing else is configured.
pub const DEFAULT_INDEX_FILE: &str = "index";

/// Default number of parsed templates kept in memory.
pub const DEFAULT_TEMPLATE_CACHE_SIZE: usize = 64;

/// Output parser configuration.
///
/// Every field has a default, so a partial document deserializes:
///
/// ```rust
/// use ferrissh_textfsm::ParserConfig;
///
/// let config: ParserConfig =
///     serde_json::from_str(r#"{"template_dir": "/opt/templates"}"#).unwrap();
/// assert_eq!(config.index_file, "index");
/// assert_eq!(config.template_cache_size, 64);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Directory holding the index file and the templates it names.
    pub template_dir: PathBuf,

    /// Further directories searched for template files, after `template_dir`.
    pub extra_template_dirs: Vec<PathBuf>,

    /// Index file name, relative to `template_dir`.
    pub index_file: String,

    /// Maximum number of parsed templates to keep (0 disables caching).
    pub template_cache_size: usize,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            template_dir: PathBuf::from(DEFAULT_TEMPLATE_DIR),
            extra_template_dirs: Vec::new(),
            index_file: DEFAULT_INDEX_FILE.to_string(),
            template_cache_size: DEFAULT_TEMPLATE_CACHE_SIZE,
        }
    }
}

impl ParserConfig {
    /// Create a configuration for a template directory.
    pub fn new(template_dir: impl Into<PathBuf>) -> Self {
        Self {
            template_dir: template_dir.into(),
            ..Self::default()
        }
    }

    /// Create a configuration from `FERRISSH_TEMPLATE_DIR`, falling back to
    /// `./templates`.
    pub fn from_env() -> Self {
        match env::var_os(TEMPLATE_DIR_ENV) {
            Some(dir) if !dir.is_empty() => Self::new(dir),
            _ => Self::default(),
        }
    }

    /// Directories searched for template files, in order.
    pub fn template_dirs(&self) -> Vec<PathBuf> {
        std::iter::once(self.template_dir.clone())
            .chain(self.extra_template_dirs.iter().cloned())
            .collect()
    }

    /// Full path of the index file.
    pub fn index_path(&self) -> PathBuf {
        self.template_dir.join(&self.index_file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ParserConfig::default();
        assert_eq!(config.template_dir, PathBuf::from("./templates"));
        assert_eq!(config.index_path(), PathBuf::from("./templates/index"));
        assert_eq!(config.template_cache_size, 64);
        assert_eq!(config.template_dirs(), vec![PathBuf::from("./templates")]);
    }

    #[test]
    fn test_deserialize_partial() {
        let config: ParserConfig =
            serde_json::from_str(r#"{"template_dir": "/srv/t", "template_cache_size": 0}"#)
                .unwrap();
        assert!(config.extra_template_dirs.is_empty());
        assert_eq!(config.template_dir, PathBuf::from("/srv/t"));
        assert_eq!(config.index_file, "index");
        assert_eq!(config.template_cache_size, 0);
        assert_eq!(config.index_path(), PathBuf::from("/srv/t/index"));
    }

    #[test]
    fn test_template_dirs_order() {
        let config: ParserConfig = serde_json::from_str(
            r#"{"template_dir": "/srv/t", "extra_template_dirs": ["/srv/site", "/srv/lab"]}"#,
        )
        .unwrap();
        assert_eq!(
            config.template_dirs(),
            vec![
                PathBuf::from("/srv/t"),
                PathBuf::from("/srv/site"),
                PathBuf::from("/srv/lab")
            ]
        );
        assert_eq!(config.index_path(), PathBuf::from("/srv/t/index"));
    }
}
