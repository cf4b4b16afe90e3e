use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

// --- Constants for Default Configuration ---
pub const DEFAULT_SEARCH_CACHE_SIZE: usize = 100;
pub const DEFAULT_SEARCH_LIMIT: usize = 20;
pub const DEFAULT_SEARCH_THRESHOLD: f64 = 0.3;
pub const DEFAULT_SUGGESTION_THRESHOLD: f64 = 0.6;
pub const DEFAULT_MAX_SUGGESTIONS: usize = 3;
pub const DEFAULT_HISTORY_LIMIT: usize = 50;
pub const DEFAULT_EXPORT_DIRECTION: &str = "TB";
pub const DEFAULT_EXPORT_MAX_NODES: usize = 50;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    pub cache_size: usize,
    pub default_limit: usize,
    pub default_threshold: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    pub suggestion_threshold: f64,
    pub max_suggestions: usize,
    pub history_limit: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    pub direction: String,
    pub max_nodes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub search: SearchConfig,
    pub classifier: ClassifierConfig,
    pub export: ExportConfig,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            cache_size: DEFAULT_SEARCH_CACHE_SIZE,
            default_limit: DEFAULT_SEARCH_LIMIT,
            default_threshold: DEFAULT_SEARCH_THRESHOLD,
        }
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            suggestion_threshold: DEFAULT_SUGGESTION_THRESHOLD,
            max_suggestions: DEFAULT_MAX_SUGGESTIONS,
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            direction: DEFAULT_EXPORT_DIRECTION.into(),
            max_nodes: DEFAULT_EXPORT_MAX_NODES,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            search: SearchConfig::default(),
            classifier: ClassifierConfig::default(),
            export: ExportConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let s = Config::builder()
            // Default settings
            .set_default("search.cache_size", DEFAULT_SEARCH_CACHE_SIZE as i64)?
            .set_default("search.default_limit", DEFAULT_SEARCH_LIMIT as i64)?
            .set_default("search.default_threshold", DEFAULT_SEARCH_THRESHOLD)?
            .set_default(
                "classifier.suggestion_threshold",
                DEFAULT_SUGGESTION_THRESHOLD,
            )?
            .set_default("classifier.max_suggestions", DEFAULT_MAX_SUGGESTIONS as i64)?
            .set_default("classifier.history_limit", DEFAULT_HISTORY_LIMIT as i64)?
            .set_default("export.direction", DEFAULT_EXPORT_DIRECTION)?
            .set_default("export.max_nodes", DEFAULT_EXPORT_MAX_NODES as i64)?
            // File: kgraph.toml
            .add_source(File::with_name("kgraph").required(false))
            // Environment: KGRAPH_SEARCH__CACHE_SIZE=200 -> search.cache_size=200
            .add_source(Environment::with_prefix("KGRAPH").separator("__"))
            .build()?;

        s.try_deserialize()
    }

    /// Render the configuration as TOML, e.g. for seeding a `kgraph.toml`.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}
