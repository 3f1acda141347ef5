use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use clap::ValueEnum;
use directories::ProjectDirs;
use log::{debug, info};
use regex::Regex;
use thiserror::Error;

use crate::matcher::ScoreWeights;
use crate::results::ScoreOrder;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid blacklist pattern {pattern:?} for provider {provider}: {source}")]
    Blacklist {
        provider: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub scoring: ScoreWeights,
    #[serde(default)]
    pub highlight: HighlightConfig,
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
}

#[derive(Deserialize, ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Engine {
    #[default]
    Quick,
    Nucleo,
}

#[derive(Deserialize, Debug, Clone)]
pub struct GeneralConfig {
    #[serde(default)]
    pub engine: Engine,
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub score_order: ScoreOrder,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

fn default_limit() -> usize { 50 }
fn default_batch_size() -> usize { 256 }

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            engine: Engine::default(),
            limit: default_limit(),
            score_order: ScoreOrder::default(),
            batch_size: default_batch_size(),
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct HighlightConfig {
    #[serde(default = "default_normal_tag")]
    pub normal: String,
    #[serde(default = "default_special_tag")]
    pub special: String,
    #[serde(default)]
    pub close: Option<String>,
}

fn default_normal_tag() -> String { "<b>".to_string() }
fn default_special_tag() -> String { "<color=#ff8000>".to_string() }

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            normal: default_normal_tag(),
            special: default_special_tag(),
            close: None,
        }
    }
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct ProviderConfig {
    /// Lower values rank first.
    #[serde(default)]
    pub priority: i32,
    pub whitelist: Option<Vec<String>>,
    pub blacklist: Option<Vec<String>>,
    #[serde(default)]
    pub items: Vec<StaticItem>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct StaticItem {
    pub name: String,
    pub id: Option<String>,
    pub description: Option<String>,
}

/// Compiled whitelist/blacklist for one provider.
#[derive(Debug, Clone, Default)]
pub struct ProviderFilter {
    whitelist: Option<Vec<String>>,
    blacklist: Vec<Regex>,
}

impl ProviderFilter {
    pub fn compile(provider: &str, config: &ProviderConfig) -> Result<Self, ConfigError> {
        let blacklist = config
            .blacklist
            .iter()
            .flatten()
            .map(|pattern| {
                Regex::new(pattern).map_err(|source| ConfigError::Blacklist {
                    provider: provider.to_string(),
                    pattern: pattern.clone(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            whitelist: config.whitelist.clone(),
            blacklist,
        })
    }

    pub fn allows(&self, id: &str, label: &str) -> bool {
        if let Some(whitelist) = &self.whitelist {
            if !whitelist.iter().any(|w| label.contains(w.as_str()) || id.contains(w.as_str())) {
                return false;
            }
        }
        !self.blacklist.iter().any(|re| re.is_match(label) || re.is_match(id))
    }
}

impl Config {
    pub fn provider(&self, name: &str) -> Option<&ProviderConfig> {
        self.providers.get(name)
    }

    pub fn priority_of(&self, name: &str) -> i32 {
        self.provider(name).map(|p| p.priority).unwrap_or_default()
    }
}

pub fn default_config_path() -> PathBuf {
    match ProjectDirs::from("org", "quickfind", "quickfind") {
        Some(dirs) => dirs.config_dir().join("config.toml"),
        None => PathBuf::from("config.toml"),
    }
}

/// Loads the config at `path`, or the default location when `None`.
/// A missing file yields the defaults.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let config_path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);

    if !config_path.exists() {
        debug!("No config at {:?}, using defaults", config_path);
        return Ok(Config::default());
    }

    let content = fs::read_to_string(&config_path).map_err(|source| ConfigError::Read {
        path: config_path.clone(),
        source,
    })?;
    let config = parse_config(&content).map_err(|source| ConfigError::Parse {
        path: config_path.clone(),
        source,
    })?;
    info!("Loaded config from {:?} ({} providers)", config_path, config.providers.len());
    Ok(config)
}

pub fn parse_config(content: &str) -> Result<Config, toml::de::Error> {
    toml::from_str(content)
}
