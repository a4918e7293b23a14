//! # Configuration Management Module
//!
//! Settings come from two places:
//!
//! - a TOML file ([`Config::load`]) for the bot's name, static command prefix,
//!   fault policy and logging
//! - an [`Environ`] key/default lookup for secrets and deployment overrides
//!
//! ## Configuration File Format
//!
//! ```toml
//! [bot]
//! name = "discobot"
//! prefix = "!"
//! fault_policy = "isolate"   # or "fail_fast"
//! superusers = []
//!
//! [logging]
//! level = "info"
//! ```
//!
//! ## Environment Keys
//!
//! - `DISCOBOT_EMAIL` / `DISCOBOT_PASSWORD` - transport credentials (required to run)
//! - `DISCOBOT_BOTMASTERS` - semicolon separated superuser ids
//! - `DISCOBOT_PREFIX` - overrides `[bot] prefix`
//!
//! Precedence: environment > config file > defaults.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tokio::fs;

use crate::bot::dispatcher::FaultPolicy;
use crate::chat::UserId;
use crate::error::{BotError, BotResult};

pub const ENV_EMAIL: &str = "DISCOBOT_EMAIL";
pub const ENV_PASSWORD: &str = "DISCOBOT_PASSWORD";
pub const ENV_BOTMASTERS: &str = "DISCOBOT_BOTMASTERS";
pub const ENV_PREFIX: &str = "DISCOBOT_PREFIX";

/// Abstract key/default lookup used for configuration that is read once at startup.
pub trait Environ: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    fn get_or(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }

    fn require(&self, key: &str) -> BotResult<String> {
        self.get(key)
            .ok_or_else(|| BotError::MissingConfig(key.to_string()))
    }
}

/// Reads from the process environment.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessEnviron;

impl Environ for ProcessEnviron {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// Fixed in-memory lookup table.
#[derive(Debug, Default, Clone)]
pub struct MapEnviron {
    values: HashMap<String, String>,
}

impl MapEnviron {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.values.insert(key.to_string(), value.to_string());
        self
    }
}

impl Environ for MapEnviron {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}

#[derive(Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn from_environ(environ: &dyn Environ) -> BotResult<Self> {
        Ok(Self {
            email: environ.require(ENV_EMAIL)?,
            password: environ.require(ENV_PASSWORD)?,
        })
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    /// Display name used by the console transport.
    #[serde(default = "default_name")]
    pub name: String,
    /// Static command prefix. Must be non-empty and contain no whitespace.
    #[serde(default = "default_prefix")]
    pub prefix: String,
    #[serde(default)]
    pub fault_policy: FaultPolicy,
    /// User ids that bypass every permission check.
    #[serde(default)]
    pub superusers: Vec<String>,
}

fn default_name() -> String {
    "discobot".to_string()
}

fn default_prefix() -> String {
    "!".to_string()
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            prefix: default_prefix(),
            fault_policy: FaultPolicy::default(),
            superusers: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            file: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub bot: BotConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a file
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path, e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {}: {}", path, e))?;

        Ok(config)
    }

    /// Create a default configuration file
    pub async fn create_default(path: &str) -> Result<()> {
        let config = Config::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| anyhow!("Failed to serialize default config: {}", e))?;

        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path, e))?;

        Ok(())
    }

    /// Overlay prefix and superusers from the environment.
    pub fn apply_environ(&mut self, environ: &dyn Environ) {
        if let Some(prefix) = environ.get(ENV_PREFIX) {
            self.bot.prefix = prefix;
        }
        for id in environ
            .get_or(ENV_BOTMASTERS, "")
            .split(';')
            .map(str::trim)
            .filter(|id| !id.is_empty())
        {
            if !self.bot.superusers.iter().any(|s| s == id) {
                self.bot.superusers.push(id.to_string());
            }
        }
    }

    pub fn validate(&self) -> BotResult<()> {
        if self.bot.prefix.is_empty() {
            return Err(BotError::InvalidConfig("bot.prefix must not be empty".into()));
        }
        if self.bot.prefix.chars().any(char::is_whitespace) {
            return Err(BotError::InvalidConfig(format!(
                "bot.prefix '{}' must not contain whitespace",
                self.bot.prefix
            )));
        }
        if self.bot.name.trim().is_empty() {
            return Err(BotError::InvalidConfig("bot.name must not be empty".into()));
        }
        Ok(())
    }

    pub fn superuser_ids(&self) -> Vec<UserId> {
        self.bot
            .superusers
            .iter()
            .map(|s| UserId::from(s.as_str()))
            .collect()
    }
}
