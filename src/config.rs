use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::api::DEFAULT_BASE_URL;
use crate::view::DEFAULT_MAX_COMMENTS;

const DEFAULT_ENV_PREFIX: &str = "BLOGVIEW";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub comments: CommentsConfig,
    #[serde(default)]
    pub share: ShareConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Unset leaves the HTTP client's own default in place.
    #[serde(default, with = "humantime_serde")]
    pub timeout: Option<Duration>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            user_agent: default_user_agent(),
            timeout: None,
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_user_agent() -> String {
    format!("blogview/{}", crate::VERSION)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommentsConfig {
    #[serde(default = "default_max_display")]
    pub max_display: usize,
}

impl Default for CommentsConfig {
    fn default() -> Self {
        Self {
            max_display: default_max_display(),
        }
    }
}

fn default_max_display() -> usize {
    DEFAULT_MAX_COMMENTS
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ShareConfig {
    #[serde(default = "default_page_base_url")]
    pub page_base_url: String,
}

impl Default for ShareConfig {
    fn default() -> Self {
        Self {
            page_base_url: default_page_base_url(),
        }
    }
}

impl ShareConfig {
    pub fn page_url(&self, post_id: &str) -> String {
        format!("{}/{}", self.page_base_url.trim_end_matches('/'), post_id)
    }
}

fn default_page_base_url() -> String {
    "http://localhost:5173/blog".into()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct StorageConfig {
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    pub config_file: Option<PathBuf>,
    pub env_prefix: Option<String>,
}

pub fn load(options: LoadOptions) -> Result<Config> {
    let mut cfg = Config::default();

    if let Some(path) = options.config_file.as_ref() {
        if path.exists() {
            let from_file = read_config_file(path)?;
            cfg = merge_config(cfg, from_file);
        }
    } else if let Some(default_path) = default_config_path() {
        if default_path.exists() {
            let from_file = read_config_file(&default_path)?;
            cfg = merge_config(cfg, from_file);
        }
    }

    let prefix = options.env_prefix.as_deref().unwrap_or(DEFAULT_ENV_PREFIX);
    load_env(&mut cfg, prefix);

    Ok(cfg)
}

fn read_config_file(path: &Path) -> Result<Config> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file at {}", path.display()))?;
    let config: Config = serde_yaml::from_str(&data)
        .with_context(|| format!("Failed to parse config file at {}", path.display()))?;
    Ok(config)
}

fn merge_config(mut base: Config, other: Config) -> Config {
    if !other.api.base_url.is_empty() {
        base.api.base_url = other.api.base_url;
    }
    if !other.api.user_agent.is_empty() {
        base.api.user_agent = other.api.user_agent;
    }
    if other.api.timeout.is_some() {
        base.api.timeout = other.api.timeout;
    }

    if other.comments.max_display != 0 {
        base.comments.max_display = other.comments.max_display;
    }

    if !other.share.page_base_url.is_empty() {
        base.share.page_base_url = other.share.page_base_url;
    }

    if other.storage.path.is_some() {
        base.storage.path = other.storage.path;
    }

    base
}

/// Applies `<PREFIX>_SECTION__KEY` variables on top of `cfg`. Unset keys keep their value.
fn load_env(cfg: &mut Config, prefix: &str) {
    let mut map: HashMap<String, String> = HashMap::new();
    let upper_prefix = format!("{}_", prefix.to_uppercase());

    for (key, value) in env::vars() {
        if let Some(stripped) = key.strip_prefix(&upper_prefix) {
            let normalized = stripped.to_ascii_lowercase().replace("__", ".");
            map.insert(normalized, value);
        }
    }

    for (key, value) in map {
        apply_env_value(cfg, &key, value);
    }
}

fn apply_env_value(cfg: &mut Config, key: &str, value: String) {
    match key {
        "api.base_url" => cfg.api.base_url = value,
        "api.user_agent" => cfg.api.user_agent = value,
        "api.timeout" => {
            if let Ok(duration) = humantime::parse_duration(&value) {
                cfg.api.timeout = Some(duration);
            }
        }
        "comments.max_display" => {
            if let Ok(parsed) = value.parse::<usize>() {
                cfg.comments.max_display = parsed;
            }
        }
        "share.page_base_url" => cfg.share.page_base_url = value,
        "storage.path" => {
            if !value.trim().is_empty() {
                cfg.storage.path = Some(PathBuf::from(value));
            }
        }
        _ => {}
    }
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("blogview").join("config.yaml"))
}
