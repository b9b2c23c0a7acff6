//! Output parser: template lookup plus record extraction in one call.
//!
//! [`OutputParser`] owns the configuration, a snapshot of the template
//! registry and a small cache of parsed templates. The registry is loaded on
//! first use and replaced wholesale by [`OutputParser::reload`]; readers
//! always see either the old or the new snapshot, never a partial one.

pub mod builder;
pub mod config;

pub use builder::ParserBuilder;
pub use config::ParserConfig;

use std::num::NonZeroUsize;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use log::{debug, error, warn};
use lru::LruCache;
use parking_lot::Mutex;

use crate::engine::{self, ParseOutcome, Record};
use crate::error::{IndexLoadError, ParseError, Result};
use crate::index::{self, Resolution, TemplateRef, TemplateRegistry};
use crate::template::TemplateDefinition;

/// Parsed templates keyed by path, tagged with the reload generation.
struct TemplateCache {
    generation: u64,
    entries: LruCache<PathBuf, Arc<TemplateDefinition>>,
}

impl TemplateCache {
    fn new(size: NonZeroUsize) -> Self {
        Self {
            generation: 0,
            entries: LruCache::new(size),
        }
    }

    /// Insert a template parsed under `generation`. Dropped if a reload has
    /// happened since.
    fn insert(&mut self, generation: u64, path: PathBuf, template: Arc<TemplateDefinition>) {
        if self.generation == generation {
            self.entries.put(path, template);
        }
    }

    fn invalidate(&mut self) {
        self.generation += 1;
        self.entries.clear();
    }
}

/// Parses device command output into records using an index of templates.
///
/// `OutputParser` is `Send + Sync`; share it behind an `Arc` to parse from
/// several threads at once.
pub struct OutputParser {
    config: ParserConfig,
    registry: ArcSwapOption<TemplateRegistry>,
    cache: Option<Mutex<TemplateCache>>,
}

impl OutputParser {
    /// Create a parser. The index is loaded lazily.
    pub fn new(config: ParserConfig) -> Self {
        let cache = NonZeroUsize::new(config.template_cache_size)
            .map(|size| Mutex::new(TemplateCache::new(size)));
        Self {
            config,
            registry: ArcSwapOption::empty(),
            cache,
        }
    }

    /// Create a parser configured from the environment.
    pub fn from_env() -> Self {
        Self::new(ParserConfig::from_env())
    }

    /// Get the configuration.
    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// Parse `text`, the output of `command` on `platform`.
    ///
    /// A template that matched no rows yields an empty vector. Warnings from
    /// the run are logged; use [`parse_outcome`](Self::parse_outcome) to
    /// inspect them.
    pub fn parse(
        &self,
        platform: &str,
        command: &str,
        text: &str,
    ) -> std::result::Result<Vec<Record>, ParseError> {
        let outcome = self.parse_outcome(platform, command, text)?;
        for warning in &outcome.warnings {
            warn!("{} ({} '{}')", warning, platform, command);
        }
        Ok(outcome.records)
    }

    /// Parse `text` and return the records together with any warnings.
    pub fn parse_outcome(
        &self,
        platform: &str,
        command: &str,
        text: &str,
    ) -> std::result::Result<ParseOutcome, ParseError> {
        if text.is_empty() {
            return Err(ParseError::EmptyInput);
        }

        let template_ref = match self.resolve(platform, command) {
            Resolution::Found(template_ref) => template_ref,
            Resolution::UnsupportedPlatform => {
                return Err(ParseError::UnsupportedPlatform {
                    platform: platform.to_string(),
                });
            }
            Resolution::NoMatch => {
                return Err(ParseError::NoTemplate {
                    platform: platform.to_string(),
                    command: command.to_string(),
                });
            }
        };

        debug!(
            "Parsing {} '{}' with template {}",
            platform,
            command,
            template_ref.path.display()
        );
        let template = self.template(&template_ref)?;

        panic::catch_unwind(AssertUnwindSafe(|| engine::extract(&template, text))).unwrap_or_else(
            |payload| {
                let detail = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                error!(
                    "Extraction panicked for template {}: {}",
                    template_ref.template_name, detail
                );
                Err(ParseError::Internal(format!(
                    "extraction with template '{}' panicked: {}",
                    template_ref.template_name, detail
                )))
            },
        )
    }

    /// Parse `text` and render the records as pretty-printed JSON.
    pub fn parse_to_json(&self, platform: &str, command: &str, text: &str) -> Result<String> {
        let records = self.parse(platform, command, text)?;
        Ok(serde_json::to_string_pretty(&records)?)
    }

    /// Look up the template for a command without parsing anything.
    pub fn resolve(&self, platform: &str, command: &str) -> Resolution {
        match self.current_registry() {
            Some(registry) => {
                index::find(&registry, &self.config.template_dirs(), platform, command)
            }
            None => Resolution::UnsupportedPlatform,
        }
    }

    /// Platforms with at least one index entry, sorted.
    pub fn platforms(&self) -> Vec<String> {
        self.current_registry()
            .map(|registry| registry.platforms().into_iter().map(String::from).collect())
            .unwrap_or_default()
    }

    /// Commands registered for a platform, in index order.
    pub fn commands(&self, platform: &str) -> Vec<String> {
        self.current_registry()
            .map(|registry| registry.commands(&platform.to_lowercase()))
            .unwrap_or_default()
    }

    /// Re-read the index and publish it, dropping cached templates.
    ///
    /// On failure the previous registry stays in place.
    pub fn reload(&self) -> std::result::Result<(), IndexLoadError> {
        let registry = index::load(&self.config.index_path())?;
        self.registry.store(Some(Arc::new(registry)));
        if let Some(cache) = &self.cache {
            cache.lock().invalidate();
        }
        Ok(())
    }

    /// The currently published registry, if one has been loaded.
    pub fn registry(&self) -> Option<Arc<TemplateRegistry>> {
        self.registry.load_full()
    }

    /// Get the registry, loading it on first use.
    ///
    /// Load failures are logged and not remembered, so a later call retries.
    fn current_registry(&self) -> Option<Arc<TemplateRegistry>> {
        if let Some(registry) = self.registry.load_full() {
            return Some(registry);
        }

        match index::load(&self.config.index_path()) {
            Ok(registry) => {
                let registry = Arc::new(registry);
                self.registry.store(Some(Arc::clone(&registry)));
                Some(registry)
            }
            Err(e) => {
                error!("Failed to load template index: {}", e);
                None
            }
        }
    }

    fn template(
        &self,
        template_ref: &TemplateRef,
    ) -> std::result::Result<Arc<TemplateDefinition>, ParseError> {
        let Some(cache) = &self.cache else {
            return Ok(Arc::new(TemplateDefinition::from_file(&template_ref.path)?));
        };

        let generation = {
            let mut cache = cache.lock();
            if let Some(template) = cache.entries.get(&template_ref.path) {
                return Ok(Arc::clone(template));
            }
            cache.generation
        };

        // Parse outside the lock; a concurrent miss just parses twice.
        let template = Arc::new(TemplateDefinition::from_file(&template_ref.path)?);
        cache
            .lock()
            .insert(generation, template_ref.path.clone(), Arc::clone(&template));
        Ok(template)
    }
}

impl std::fmt::Debug for OutputParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputParser")
            .field("config", &self.config)
            .field("loaded", &self.registry.load().is_some())
            .finish_non_exhaustive()
    }
}
