use super::{
    is_search_engine_host, DefaultExtractor, ExtractionRecord, Extractor, SearchResultsExtractor,
    SelectorExtractor,
};
use crate::url::extract_domain;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use url::Url;

/// Resolves and caches the extractor for each host
///
/// The registry of host plugins is filled once, at construction, by scanning
/// the plugin directory. Resolution happens once per distinct host and is
/// cached for the rest of the run.
pub struct PluginManager {
    registry: HashMap<String, Arc<dyn Extractor>>,
    resolved: Mutex<HashMap<String, Arc<dyn Extractor>>>,
    default: Arc<dyn Extractor>,
    search: Arc<dyn Extractor>,
}

impl Default for PluginManager {
    fn default() -> Self {
        Self {
            registry: HashMap::new(),
            resolved: Mutex::new(HashMap::new()),
            default: Arc::new(DefaultExtractor::new()),
            search: Arc::new(SearchResultsExtractor::new()),
        }
    }
}

impl PluginManager {
    /// Creates a manager with only the built-in extractors
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a manager, registering every `*.toml` plugin in `plugin_dir`
    ///
    /// A missing directory or an invalid plugin file is logged and skipped.
    pub fn load(plugin_dir: Option<&Path>) -> Self {
        let mut manager = Self::new();
        let Some(dir) = plugin_dir else {
            return manager;
        };

        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!("Plugin directory {} unreadable: {}", dir.display(), e);
                return manager;
            }
        };

        let mut paths: Vec<_> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.extension().is_some_and(|ext| ext == "toml"))
            .collect();
        paths.sort();

        for path in paths {
            match SelectorExtractor::from_file(&path) {
                Ok((host, extractor)) => {
                    tracing::info!("Loaded plugin for {} from {}", host, path.display());
                    manager.register(&host, Arc::new(extractor));
                }
                Err(e) => tracing::warn!("Skipping plugin: {}", e),
            }
        }

        manager
    }

    /// Registers a host-specific extractor, replacing any previous one
    pub fn register(&mut self, host: &str, extractor: Arc<dyn Extractor>) {
        let host = host.to_ascii_lowercase();
        self.resolved
            .get_mut()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(&host);
        self.registry.insert(host, extractor);
    }

    /// Number of registered host plugins
    pub fn plugin_count(&self) -> usize {
        self.registry.len()
    }

    /// Returns the extractor for `host`
    pub fn extractor_for(&self, host: &str) -> Arc<dyn Extractor> {
        let host = host.to_ascii_lowercase();
        let mut resolved = self
            .resolved
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(extractor) = resolved.get(&host) {
            return Arc::clone(extractor);
        }

        let extractor = if is_search_engine_host(&host) {
            Arc::clone(&self.search)
        } else if let Some(plugin) = self.registry.get(&host) {
            Arc::clone(plugin)
        } else {
            Arc::clone(&self.default)
        };

        tracing::debug!("Resolved extractor {} for {}", extractor.name(), host);
        resolved.insert(host, Arc::clone(&extractor));
        extractor
    }

    /// Extracts a page with its host's extractor
    ///
    /// Returns the extractor name alongside the record.
    pub fn extract(&self, url: &Url, html: &str) -> (String, ExtractionRecord) {
        let host = extract_domain(url).unwrap_or_default();
        let extractor = self.extractor_for(&host);
        (extractor.name().to_string(), extractor.extract(url, html))
    }
}
