//! Runtime configuration.
//!
//! Sources, later ones winning:
//! 1. `config.toml` (explicit `--config` path, or the platform config dir)
//! 2. Environment variables, including a `.env` file in the working directory
//!
//! The bot token and the Yandex.Weather key are mandatory; [`Config::validate`]
//! reports every missing one at once.

use crate::weather::session::DEFAULT_SESSION_MAX_AGE;
use crate::weather::yandex::{DEFAULT_LANG, REQUEST_TIMEOUT, YANDEX_WEATHER_API};
use crate::Identity;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const ENV_BOT_TOKEN: &str = "TELEGRAM_BOT_TOKEN";
pub const ENV_WEATHER_KEY: &str = "YANDEX_WEATHER_API_KEY";
pub const ENV_ALLOWED_USERS: &str = "ALLOWED_USER_IDS";
pub const ENV_GATEWAY_BIND: &str = "WEATHERBOT_GATEWAY_BIND";

pub const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("missing required settings: {}", .0.join(", "))]
    MissingKeys(Vec<&'static str>),

    #[error("forecast.timeout_secs must be between 1 and {max}, got {0}", max = REQUEST_TIMEOUT.as_secs())]
    InvalidTimeout(u64),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub telegram_bot_token: String,
    pub yandex_weather_api_key: String,
    /// Empty means everyone may use the bot.
    pub allowed_user_ids: Vec<Identity>,
    pub forecast: ForecastConfig,
    pub telegram: TelegramConfig,
    pub gateway: GatewayConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    pub api_url: String,
    pub lang: String,
    /// Whole-request budget; may be lowered but never exceeds five seconds.
    pub timeout_secs: u64,
    pub session_max_age_secs: u64,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            api_url: YANDEX_WEATHER_API.to_string(),
            lang: DEFAULT_LANG.to_string(),
            timeout_secs: REQUEST_TIMEOUT.as_secs(),
            session_max_age_secs: DEFAULT_SESSION_MAX_AGE.as_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    pub api_base: String,
    /// Long-poll timeout passed to `getUpdates`.
    pub poll_timeout_secs: u64,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            api_base: TELEGRAM_API_BASE.to_string(),
            poll_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Address for the health/metrics endpoint, e.g. `127.0.0.1:9090`.
    /// Unset disables the endpoint.
    pub bind: Option<String>,
}

impl Config {
    /// Load from `.env`, the optional config file and the process environment.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!("Loaded environment from {}", path.display());
        }
        Self::load_with(explicit_path, |key| std::env::var(key).ok())
    }

    /// Like [`load`](Self::load), with environment lookups supplied by the caller.
    pub fn load_with(
        explicit_path: Option<&Path>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut config = match explicit_path {
            Some(path) => Self::from_file(path)?,
            None => match default_config_path().filter(|p| p.exists()) {
                Some(path) => Self::from_file(&path)?,
                None => Self::default(),
            },
        };
        config.apply_env(env);
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::info!("Loaded config file {}", path.display());
        Ok(config)
    }

    fn apply_env(&mut self, env: impl Fn(&str) -> Option<String>) {
        let non_blank = |key: &str| env(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(token) = non_blank(ENV_BOT_TOKEN) {
            self.telegram_bot_token = token;
        }
        if let Some(key) = non_blank(ENV_WEATHER_KEY) {
            self.yandex_weather_api_key = key;
        }
        if let Some(raw) = non_blank(ENV_ALLOWED_USERS) {
            self.allowed_user_ids = match parse_allow_list(&raw) {
                Ok(ids) => ids,
                Err(e) => {
                    tracing::warn!(
                        "{ENV_ALLOWED_USERS} contains an invalid id ({e}); falling back to an empty list"
                    );
                    Vec::new()
                }
            };
        }
        if let Some(bind) = non_blank(ENV_GATEWAY_BIND) {
            self.gateway.bind = Some(bind);
        }
    }

    /// Fail if a mandatory credential is missing or the forecast timeout is out of range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let timeout = self.forecast.timeout_secs;
        if timeout == 0 || timeout > REQUEST_TIMEOUT.as_secs() {
            return Err(ConfigError::InvalidTimeout(timeout));
        }

        let mut missing = Vec::new();
        if self.telegram_bot_token.trim().is_empty() {
            missing.push(ENV_BOT_TOKEN);
        }
        if self.yandex_weather_api_key.trim().is_empty() {
            missing.push(ENV_WEATHER_KEY);
        }
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::MissingKeys(missing))
        }
    }

    /// Human-readable summary with secrets masked.
    pub fn summary(&self) -> String {
        let access = if self.allowed_user_ids.is_empty() {
            "open (no allow-list)".to_string()
        } else {
            format!("{} allowed user(s)", self.allowed_user_ids.len())
        };
        format!(
            "telegram_bot_token: {}\n\
             yandex_weather_api_key: {}\n\
             access: {access}\n\
             forecast api: {} (lang {}, timeout {}s)\n\
             telegram api: {} (poll timeout {}s)\n\
             gateway: {}",
            mask(&self.telegram_bot_token),
            mask(&self.yandex_weather_api_key),
            self.forecast.api_url,
            self.forecast.lang,
            self.forecast.timeout_secs,
            self.telegram.api_base,
            self.telegram.poll_timeout_secs,
            self.gateway.bind.as_deref().unwrap_or("disabled"),
        )
    }
}

/// Parse a comma-separated id list. Blank entries are skipped.
pub fn parse_allow_list(raw: &str) -> Result<Vec<Identity>, std::num::ParseIntError> {
    raw.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::parse)
        .collect()
}

/// `<config dir>/weatherbot/config.toml` for the current platform.
pub fn default_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "weatherbot")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

fn mask(secret: &str) -> String {
    if secret.is_empty() {
        "<missing>".to_string()
    } else {
        let skip = secret.chars().count().saturating_sub(4);
        let tail: String = secret.chars().skip(skip).collect();
        format!("***{tail}")
    }
}
