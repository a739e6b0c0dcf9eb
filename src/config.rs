//! Provider configuration
//!
//! Loaded from a TOML file (`~/.suntrack/config.toml` by default). `${VAR}`
//! placeholders are substituted from the environment before parsing, so
//! API tokens can stay out of the file.

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::types::{ProviderKind, Result, SuntrackError};

/// Environment variable that overrides the config file location
pub const CONFIG_ENV: &str = "SUNTRACK_CONFIG";

const DEFAULT_TIMEOUT_SECS: u64 = 15;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Timeout applied to providers without their own `timeout_secs`
    #[serde(default = "default_timeout_secs")]
    pub default_timeout_secs: u64,
    /// Providers in reporting order
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    /// Display name; defaults to the provider kind
    #[serde(default)]
    pub name: Option<String>,
    pub base_url: String,
    #[serde(default)]
    pub api_token: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    /// Restrict the summary to these station ids (empty = all)
    #[serde(default)]
    pub stations: Vec<String>,
}

impl ProviderConfig {
    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or(self.kind.as_str())
    }

    pub fn timeout(&self, default_secs: u64) -> Duration {
        Duration::from_secs(self.timeout_secs.unwrap_or(default_secs).max(1))
    }

    /// Base URL without trailing slash
    pub fn base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}

impl Config {
    /// Load, expand `${VAR}` from the process environment, parse and validate
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|e| {
            SuntrackError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&raw, |name| std::env::var(name).ok())
    }

    /// Parse configuration text, resolving placeholders with `lookup`
    pub fn from_toml_str<F>(raw: &str, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let expanded = expand_env_placeholders(raw, lookup)?;
        let config: Self =
            toml::from_str(&expanded).map_err(|e| SuntrackError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Pick the config path: explicit flag, then `SUNTRACK_CONFIG`, then default
    pub fn resolve_path(explicit: Option<PathBuf>) -> Result<PathBuf> {
        if let Some(path) = explicit {
            return Ok(path);
        }
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            if !path.trim().is_empty() {
                return Ok(PathBuf::from(path));
            }
        }
        Self::default_path()
    }

    /// Default config path (~/.suntrack/config.toml)
    pub fn default_path() -> Result<PathBuf> {
        let home = directories::UserDirs::new()
            .ok_or_else(|| SuntrackError::Config("Failed to get home directory".into()))?
            .home_dir()
            .to_path_buf();
        Ok(home.join(".suntrack").join("config.toml"))
    }

    /// Find a provider by configured name
    pub fn provider(&self, name: &str) -> Option<&ProviderConfig> {
        self.providers.iter().find(|p| p.name() == name)
    }

    fn validate(&self) -> Result<()> {
        if self.providers.is_empty() {
            return Err(SuntrackError::Config(
                "config must include at least one provider".into(),
            ));
        }

        let mut names = HashSet::new();
        for provider in &self.providers {
            if provider.base_url.trim().is_empty() {
                return Err(SuntrackError::Config(format!(
                    "provider '{}' has an empty base_url",
                    provider.name()
                )));
            }
            if !names.insert(provider.name()) {
                return Err(SuntrackError::Config(format!(
                    "duplicate provider name '{}'",
                    provider.name()
                )));
            }
        }
        Ok(())
    }
}

/// Replace `${VAR}` placeholders; an unset variable is an error
fn expand_env_placeholders<F>(input: &str, lookup: F) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    let pattern = Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}")
        .map_err(|e| SuntrackError::Config(e.to_string()))?;

    let mut missing: Option<String> = None;
    let expanded = pattern.replace_all(input, |caps: &Captures| {
        let name = &caps[1];
        match lookup(name) {
            Some(value) => value,
            None => {
                missing.get_or_insert_with(|| name.to_string());
                String::new()
            }
        }
    });

    match missing {
        Some(name) => Err(SuntrackError::Config(format!(
            "missing environment variable: {}",
            name
        ))),
        None => Ok(expanded.into_owned()),
    }
}
