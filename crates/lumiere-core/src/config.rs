//! Runtime configuration
//!
//! Layering (lowest to highest precedence):
//! 1. Built-in defaults
//! 2. `<config_dir>/lumiere/config.toml`
//! 3. `LUMIERE_*` environment variables
//!
//! The binary applies CLI flags on top.

use crate::error::{CoreError, Result};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

pub const DEFAULT_TMDB_BASE_URL: &str = "https://api.themoviedb.org/3";

pub const ENV_TMDB_API_KEY: &str = "LUMIERE_TMDB_API_KEY";
pub const ENV_TMDB_BASE_URL: &str = "LUMIERE_TMDB_BASE_URL";
pub const ENV_BAAS_URL: &str = "LUMIERE_BAAS_URL";
pub const ENV_BAAS_ANON_KEY: &str = "LUMIERE_BAAS_ANON_KEY";
pub const ENV_CACHE_DIR: &str = "LUMIERE_CACHE_DIR";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub tmdb_api_key: Option<String>,
    pub tmdb_base_url: String,
    pub baas_url: Option<String>,
    pub baas_anon_key: Option<String>,
    pub cache_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tmdb_api_key: None,
            tmdb_base_url: DEFAULT_TMDB_BASE_URL.to_string(),
            baas_url: None,
            baas_anon_key: None,
            cache_dir: None,
        }
    }
}

impl Config {
    /// `<config_dir>/lumiere/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("lumiere").join("config.toml"))
    }

    /// Parse a config file; a missing file yields defaults
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config: {}", path.display()))?;

        debug!(path = %path.display(), "Config loaded");
        Ok(config)
    }

    /// Apply overrides from a variable lookup (the process environment in production)
    pub fn with_env<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup(ENV_TMDB_API_KEY) {
            self.tmdb_api_key = Some(v);
        }
        if let Some(v) = lookup(ENV_TMDB_BASE_URL) {
            self.tmdb_base_url = v;
        }
        if let Some(v) = lookup(ENV_BAAS_URL) {
            self.baas_url = Some(v);
        }
        if let Some(v) = lookup(ENV_BAAS_ANON_KEY) {
            self.baas_anon_key = Some(v);
        }
        if let Some(v) = lookup(ENV_CACHE_DIR) {
            self.cache_dir = Some(PathBuf::from(v));
        }
        self
    }

    /// Defaults, then the default config file, then the process environment
    pub fn load() -> anyhow::Result<Self> {
        let base = match Self::default_path() {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        Ok(base.with_env(|name| std::env::var(name).ok().filter(|v| !v.is_empty())))
    }

    pub fn tmdb_api_key(&self) -> Result<&str> {
        self.tmdb_api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| CoreError::InvalidConfig {
                message: format!("metadata API key missing (set {})", ENV_TMDB_API_KEY),
            })
    }

    /// BaaS project URL and anon key, both required for any table or auth call
    pub fn baas(&self) -> Result<(&str, &str)> {
        let url = self
            .baas_url
            .as_deref()
            .filter(|u| !u.is_empty())
            .ok_or_else(|| CoreError::InvalidConfig {
                message: format!("BaaS URL missing (set {})", ENV_BAAS_URL),
            })?;
        let key = self
            .baas_anon_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| CoreError::InvalidConfig {
                message: format!("BaaS anon key missing (set {})", ENV_BAAS_ANON_KEY),
            })?;
        Ok((url, key))
    }
}
