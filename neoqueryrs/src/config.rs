//! Configuration system for neoquery.
//!
//! Supports TOML-based configuration with global defaults and per-datasource overrides.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

use crate::error::{NeoQueryError, Result};

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct NeoQueryConfig {
    /// Global defaults applied to all datasources unless overridden.
    pub defaults: GlobalDefaults,

    pub logging: LoggingConfig,

    /// Per-datasource configuration overrides (keyed by datasource name).
    #[serde(default)]
    pub datasources: HashMap<String, DatasourceConfig>,
}

/// Global default settings.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct GlobalDefaults {
    pub compiler: CompilerConfig,
    pub schema_cache: SchemaCacheConfig,
}

/// Query compilation settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// Resolutions at or above this width (ms) bucket through a sub-query
    /// (default: one day).
    pub sub_query_threshold_ms: u64,
    /// Rollup width used inside sub-queries (default: "1 hour").
    pub sub_query_rollup_interval: String,
    /// Row limit for unbucketed queries or when the panel sets no point budget.
    pub default_limit: u64,
    /// Multiplier applied to `maxDataPoints` for bucketed queries.
    pub limit_headroom: u64,
}

/// Schema cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SchemaCacheConfig {
    /// Cache TTL in seconds (default: 300).
    pub ttl_secs: u64,
    /// Maximum cached tables (default: 256).
    pub max_size: usize,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset (default: "info").
    pub filter: String,
    /// Include the event target in log lines.
    pub with_target: bool,
}

/// Per-datasource configuration (can override globals).
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct DatasourceConfig {
    /// Backend address, e.g. `http://127.0.0.1:5654`.
    pub address: Option<String>,
    pub compiler: Option<CompilerConfig>,
    pub schema_cache: Option<SchemaCacheConfig>,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            sub_query_threshold_ms: 86_400_000,
            sub_query_rollup_interval: "1 hour".to_string(),
            default_limit: 5000,
            limit_headroom: 2,
        }
    }
}

impl Default for SchemaCacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 300,
            max_size: 256,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            with_target: false,
        }
    }
}

impl NeoQueryConfig {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| NeoQueryError::Config(format!("failed to read config file: {e}")))?;
        Self::from_toml(&contents)
    }

    /// Load configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str)
            .map_err(|e| NeoQueryError::Config(format!("failed to parse config: {e}")))
    }

    /// Load from default locations (env var, cwd, user config dir, or defaults).
    ///
    /// Search order:
    /// 1. `NEOQUERY_CONFIG` environment variable
    /// 2. `./neoquery.toml` (current directory)
    /// 3. `~/.config/neoquery/config.toml` (user config dir)
    /// 4. Built-in defaults
    pub fn load_default() -> Self {
        if let Ok(path) = std::env::var("NEOQUERY_CONFIG") {
            match Self::from_file(&path) {
                Ok(cfg) => {
                    tracing::info!(path = %path, "loaded config from NEOQUERY_CONFIG");
                    return cfg;
                }
                Err(e) => tracing::warn!(path = %path, error = %e, "ignoring NEOQUERY_CONFIG"),
            }
        }

        if let Ok(cfg) = Self::from_file("neoquery.toml") {
            tracing::info!("loaded config from ./neoquery.toml");
            return cfg;
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("neoquery").join("config.toml");
            if let Ok(cfg) = Self::from_file(&user_config) {
                tracing::info!(path = %user_config.display(), "loaded config from user config dir");
                return cfg;
            }
        }

        tracing::debug!("no config file found, using defaults");
        Self::default()
    }

    /// Get resolved config for a specific datasource (merges global defaults).
    pub fn for_datasource(&self, name: &str) -> ResolvedDatasourceConfig {
        let ds_config = self.datasources.get(name);
        ResolvedDatasourceConfig::merge(&self.defaults, ds_config)
    }
}

/// Fully resolved configuration for a datasource (no Option fields except the address).
#[derive(Debug, Clone)]
pub struct ResolvedDatasourceConfig {
    pub address: Option<String>,
    pub compiler: CompilerConfig,
    pub schema_cache: SchemaCacheConfig,
}

impl ResolvedDatasourceConfig {
    fn merge(defaults: &GlobalDefaults, override_cfg: Option<&DatasourceConfig>) -> Self {
        match override_cfg {
            Some(ds) => Self {
                address: ds.address.clone(),
                compiler: ds
                    .compiler
                    .clone()
                    .unwrap_or_else(|| defaults.compiler.clone()),
                schema_cache: ds
                    .schema_cache
                    .clone()
                    .unwrap_or_else(|| defaults.schema_cache.clone()),
            },
            None => Self {
                address: None,
                compiler: defaults.compiler.clone(),
                schema_cache: defaults.schema_cache.clone(),
            },
        }
    }
}

/// Install a global `fmt` subscriber. `RUST_LOG` takes precedence over the
/// configured filter. Calling this twice is a no-op.
pub fn init_tracing(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(config.with_target)
        .try_init();
    if installed.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}
