//! Configuration file structures for the Herald bot.
//!
//! The configuration is read from a YAML file and merged with environment
//! variables prefixed with `HERALD_`. Nested keys are separated by a double
//! underscore, so `HERALD_DISCORD__TOKEN` overrides `discord.token`.
//!
//! # Configuration File Format
//!
//! ```yaml
//! discord:
//!   # Bot token
//!   token: "bot-token"
//!   # Id of the bot application
//!   application_id: "1234"
//!   # Optional: publish commands to this guild only
//!   dev_guild_id: "5678"
//!   # Optional: send REST calls through a rate limiting proxy
//!   proxy_url: "http://localhost:3000"
//!
//! bot:
//!   # Sigil of text commands
//!   prefix: "!"
//!   # Users bypassing every caller capability requirement
//!   owner_ids: ["42"]
//!   # Optional: forget cooldowns older than this many hours
//!   cooldown_retention_hours: 24
//! ```

use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::Deserialize;
use thiserror::Error;

fn default_prefix() -> char {
    '!'
}

/// Invalid or unreadable configuration. Always fatal at start-up.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read configuration: {0}")]
    Load(#[from] Box<figment::Error>),

    #[error("missing required setting `{0}`")]
    Missing(&'static str),

    #[error("invalid command prefix {0:?}: it must not be whitespace")]
    InvalidPrefix(char),

    #[error(
        "cooldown retention of {retention_hours}h must exceed the longest cooldown ({}s)",
        longest_cooldown.as_secs()
    )]
    RetentionTooShort {
        retention_hours: u64,
        longest_cooldown: Duration,
    },
}

/// Root configuration structure.
#[derive(Debug, Deserialize)]
pub struct Config {
    pub discord: DiscordConfig,
    #[serde(default)]
    pub bot: BotConfig,
}

/// Discord connection settings.
#[derive(Debug, Deserialize)]
pub struct DiscordConfig {
    /// Bot token.
    #[serde(default)]
    pub token: String,

    /// Id of the bot application, used to publish commands.
    #[serde(default)]
    pub application_id: String,

    /// When set, structured commands are published to this guild only.
    ///
    /// Guild commands are updated instantly which makes them handy while
    /// developing.
    pub dev_guild_id: Option<String>,

    /// REST proxy replacing `https://discord.com` in every request url.
    ///
    /// The proxy is trusted with rate limiting, so the local rate limiter is
    /// turned off when it is set.
    pub proxy_url: Option<String>,
}

/// Engine settings.
#[derive(Debug, Deserialize)]
pub struct BotConfig {
    /// Sigil starting a text command.
    #[serde(default = "default_prefix")]
    pub prefix: char,

    /// Users bypassing caller capability requirements.
    #[serde(default)]
    pub owner_ids: Vec<String>,

    /// Cooldown records older than this are periodically forgotten.
    ///
    /// Must exceed the longest cooldown of the catalog. Disabled when unset.
    pub cooldown_retention_hours: Option<u64>,
}

impl Default for BotConfig {
    fn default() -> Self {
        BotConfig {
            prefix: default_prefix(),
            owner_ids: Vec::new(),
            cooldown_retention_hours: None,
        }
    }
}

impl BotConfig {
    /// Returns the age past which cooldown records are evicted, if eviction is on.
    ///
    /// Absurdly large retentions saturate instead of overflowing.
    ///
    /// # Errors
    ///
    /// [`ConfigError::RetentionTooShort`] when the retention does not exceed
    /// `longest_cooldown`, which would let a caller skip a running cooldown.
    pub fn cooldown_retention(
        &self,
        longest_cooldown: Duration,
    ) -> Result<Option<Duration>, ConfigError> {
        let Some(hours) = self.cooldown_retention_hours else {
            return Ok(None);
        };

        let retention = Duration::from_secs(hours.saturating_mul(60 * 60));
        if retention <= longest_cooldown {
            return Err(ConfigError::RetentionTooShort {
                retention_hours: hours,
                longest_cooldown,
            });
        }

        Ok(Some(retention))
    }
}

impl Config {
    /// Loads the configuration from `path`, with `HERALD_` environment overrides.
    ///
    /// # Errors
    ///
    /// * [`ConfigError::Load`] - the file cannot be read or has the wrong shape
    /// * [`ConfigError::Missing`] - the token or the application id is empty
    /// * [`ConfigError::InvalidPrefix`] - the prefix is whitespace
    pub fn load(path: &str) -> Result<Config, ConfigError> {
        let mut config: Config = Figment::new()
            .merge(Yaml::file(path))
            .merge(Env::prefixed("HERALD_").split("__"))
            .extract()
            .map_err(Box::new)?;

        config.discord.token = config.discord.token.trim().to_owned();
        config.discord.application_id = config.discord.application_id.trim().to_owned();

        if config.discord.token.is_empty() {
            return Err(ConfigError::Missing("discord.token"));
        }
        if config.discord.application_id.is_empty() {
            return Err(ConfigError::Missing("discord.application_id"));
        }
        if config.bot.prefix.is_whitespace() {
            return Err(ConfigError::InvalidPrefix(config.bot.prefix));
        }

        // Normalize proxy URL by removing trailing slash if present
        if let Some(proxy_url) = config.discord.proxy_url.as_mut()
            && proxy_url.ends_with('/')
        {
            proxy_url.pop();
        }

        Ok(config)
    }
}
