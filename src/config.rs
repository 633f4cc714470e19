use crate::core::{Matcher, RetrievalMode};
use crate::models::{
    default_anchor_buckets, AnchorBucket, MatchScoreConfig, RetrievalConfig, ScoringWeights,
    WatcherConfig,
};
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub store: StoreSettings,
    #[serde(default)]
    pub appwrite: Option<AppwriteSettings>,
    #[serde(default)]
    pub database: DatabaseSettings,
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub matching: MatchingSettings,
    #[serde(default)]
    pub watcher: WatcherConfig,
    /// Per-scope watcher overrides seeded into the watcher store at startup
    #[serde(default)]
    pub watcher_scopes: HashMap<String, WatcherConfig>,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub workers: Option<usize>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            workers: None,
        }
    }
}

fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Local,
    Appwrite,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreSettings {
    #[serde(default)]
    pub backend: StoreBackend,
    /// Directory holding profiles.json and listings.json
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            data_dir: default_data_dir(),
        }
    }
}

fn default_data_dir() -> String { "data".to_string() }

#[derive(Debug, Clone, Deserialize)]
pub struct AppwriteSettings {
    pub endpoint: String,
    pub api_key: String,
    pub project_id: String,
    pub database_id: String,
    #[serde(default = "default_profiles_collection")]
    pub profiles_collection: String,
    #[serde(default = "default_listings_collection")]
    pub listings_collection: String,
}

fn default_profiles_collection() -> String { "profiles".to_string() }
fn default_listings_collection() -> String { "listings".to_string() }

/// Postgres is optional; without a URL notified ids live in memory
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DatabaseSettings {
    pub url: Option<String>,
    pub max_connections: Option<u32>,
    pub min_connections: Option<u32>,
    pub acquire_timeout_secs: Option<u64>,
    pub idle_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CacheSettings {
    pub redis_url: Option<String>,
    pub ttl_secs: Option<u64>,
    pub l1_cache_size: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MatchingSettings {
    /// Default retrieval mode: "online" or "degraded"
    #[serde(default = "default_mode")]
    pub mode: String,
    #[serde(default)]
    pub weights: ScoringWeights,
    #[serde(default = "default_anchor_buckets")]
    pub anchor_buckets: Vec<AnchorBucket>,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
}

impl Default for MatchingSettings {
    fn default() -> Self {
        Self {
            mode: default_mode(),
            weights: ScoringWeights::default(),
            anchor_buckets: default_anchor_buckets(),
            retrieval: RetrievalConfig::default(),
        }
    }
}

fn default_mode() -> String { "degraded".to_string() }

impl MatchingSettings {
    pub fn retrieval_mode(&self) -> RetrievalMode {
        RetrievalMode::parse(&self.mode)
    }

    pub fn match_config(&self) -> MatchScoreConfig {
        MatchScoreConfig::new(self.weights, self.anchor_buckets.clone())
    }

    /// Matcher built from the configured snapshots
    pub fn matcher(&self) -> Matcher {
        Matcher::new(self.match_config(), self.retrieval.clone())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "json".to_string() }

fn environment() -> Environment {
    Environment::with_prefix("ROOMIE")
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("watcher.channels")
        .with_list_parse_key("watcher.partner_webhooks")
}

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration file (config/default.toml)
    /// 3. Local overrides (config/local.toml)
    /// 4. Environment variables (prefixed with ROOMIE__)
    pub fn load() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // e.g., ROOMIE__SERVER__PORT -> server.port
            .add_source(environment())
            .build()?;

        apply_well_known_env(settings)?.try_deserialize()
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(environment())
            .build()?;

        settings.try_deserialize()
    }
}

/// Honour the conventional DATABASE_URL and REDIS_URL variables
fn apply_well_known_env(settings: Config) -> Result<Config, ConfigError> {
    use std::env;

    let mut builder = Config::builder().add_source(settings);

    if let Ok(url) = env::var("DATABASE_URL") {
        builder = builder.set_override("database.url", url)?;
    }
    if let Ok(url) = env::var("REDIS_URL") {
        builder = builder.set_override("cache.redis_url", url)?;
    }

    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_without_sources() {
        let settings: Settings = Config::builder().build().unwrap().try_deserialize().unwrap();

        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.store.backend, StoreBackend::Local);
        assert_eq!(settings.matching.retrieval_mode(), RetrievalMode::Degraded);
        assert_eq!(settings.matching.weights.sum(), 100);
        assert_eq!(settings.watcher.min_score, 55);
        assert!(settings.database.url.is_none());
        assert!(settings.appwrite.is_none());
        assert!(settings.watcher_scopes.is_empty());
    }

    #[test]
    fn test_default_logging() {
        assert_eq!(default_log_level(), "info");
        assert_eq!(default_log_format(), "json");
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[store]
backend = "appwrite"

[appwrite]
endpoint = "https://appwrite.test/v1"
api_key = "key"
project_id = "proj"
database_id = "db"

[matching]
mode = "ONLINE"
anchor_buckets = []

[matching.weights]
city = 40
budget = 60

[watcher]
min_score = 70

[watcher_scopes.lums]
top_k = 8
"#
        )
        .unwrap();

        let settings = Settings::load_from(file.path()).unwrap();

        assert_eq!(settings.store.backend, StoreBackend::Appwrite);
        assert_eq!(
            settings.appwrite.as_ref().map(|a| a.profiles_collection.as_str()),
            Some("profiles")
        );
        assert_eq!(settings.matching.retrieval_mode(), RetrievalMode::Online);
        assert_eq!(settings.matching.weights.city, 40);
        assert_eq!(settings.matching.weights.sleep, 0);
        assert!(settings.matching.match_config().anchor_buckets.is_empty());
        assert_eq!(settings.watcher.min_score, 70);
        assert_eq!(settings.watcher.top_k, 5);

        let lums = &settings.watcher_scopes["lums"];
        assert_eq!(lums.top_k, 8);
        assert_eq!(lums.min_score, 55);
    }
}
