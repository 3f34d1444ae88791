//! Configuration types for douk-hooks
//!
//! A single [`Config`] value is built once at process start, validated, and then
//! shared read-only (`Arc<Config>`) with the access gate, the pacer and the
//! throttle. There is no runtime mutation path.

use crate::error::{Error, Result};
use crate::notice::Locale;
use crate::pacing::PacingWindow;
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::Path, time::Duration};

/// Environment variables probed for the API secret, in order
pub const DEFAULT_ENV_TOKEN_NAMES: [&str; 2] = ["API_TOKEN", "DOUK_API_TOKEN"];

/// Allow-list baked in at build time (comma separated, blanks ignored)
const STATIC_TOKENS: Option<&str> = option_env!("DOUK_STATIC_TOKENS");

/// Batch cool-down settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ThrottleConfig {
    /// Units processed between two cool-downs (default: 10)
    #[serde(default = "default_batch_size")]
    pub batch_size: u64,

    /// Length of each cool-down (default: 300 seconds)
    #[serde(default = "default_cool_down", with = "duration_serde")]
    pub cool_down: Duration,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            cool_down: default_cool_down(),
        }
    }
}

/// Jitter delay inserted before each network-bound fetch
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PacingConfig {
    /// Shortest delay in seconds (default: 0.5)
    #[serde(default = "default_pacing_lower")]
    pub pacing_lower_seconds: f64,

    /// Longest delay in seconds (default: 2.0)
    #[serde(default = "default_pacing_upper")]
    pub pacing_upper_seconds: f64,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            pacing_lower_seconds: default_pacing_lower(),
            pacing_upper_seconds: default_pacing_upper(),
        }
    }
}

/// Credentials accepted by the API-mode access gate
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AccessConfig {
    /// Static allow-list (default: the list compiled in via `DOUK_STATIC_TOKENS`)
    #[serde(default = "default_tokens")]
    pub tokens: Vec<String>,

    /// Environment variables probed for a single secret; first non-empty wins
    #[serde(default = "default_env_token_names")]
    pub env_token_names: Vec<String>,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            tokens: default_tokens(),
            env_token_names: default_env_token_names(),
        }
    }
}

/// REST API configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Address to bind to (default: 127.0.0.1:5555)
    #[serde(default = "default_bind_address")]
    pub bind_address: SocketAddr,

    /// Enable CORS for browser access (default: true)
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Allowed CORS origins (default: ["*"])
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            cors_enabled: true,
            cors_origins: default_cors_origins(),
        }
    }
}

/// Rules for the built-in item filter
///
/// Both rules are off by default, which keeps every item.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FilterConfig {
    /// Items whose `ratio` attribute is one of these are dropped (e.g. "540p")
    #[serde(default)]
    pub excluded_resolutions: Vec<String>,

    /// Items whose `digg_count` is below this are dropped
    #[serde(default)]
    pub min_engagement: Option<u64>,
}

impl FilterConfig {
    /// True when no rule is configured
    pub fn is_empty(&self) -> bool {
        self.excluded_resolutions.is_empty() && self.min_engagement.is_none()
    }
}

/// What the batch loop does after an account or collection fails to fetch
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicyKind {
    /// Move on to the next unit
    #[default]
    Continue,
    /// Stop processing units
    Stop,
    /// Ask the operator on the terminal
    Prompt,
}

/// Main configuration for douk-hooks
///
/// Sub-configs are flattened, so the JSON form is a single flat object:
///
/// ```json
/// { "batch_size": 20, "cool_down": 600, "tokens": ["abc"], "locale": "en_US" }
/// ```
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Cool-down after every batch of units
    #[serde(flatten)]
    pub throttle: ThrottleConfig,

    /// Jitter delay before fetches
    #[serde(flatten)]
    pub pacing: PacingConfig,

    /// API-mode credentials
    #[serde(flatten)]
    pub access: AccessConfig,

    /// API server settings
    #[serde(flatten)]
    pub api: ApiConfig,

    /// Language of user-visible notices
    #[serde(default)]
    pub locale: Locale,

    /// Decision after a failed unit
    #[serde(default)]
    pub failure_policy: FailurePolicyKind,

    /// Built-in item filter rules
    #[serde(default)]
    pub filter: FilterConfig,
}

impl Config {
    /// Parse and validate a JSON configuration
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON configuration file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        tracing::debug!(path = %path.display(), "Loaded configuration file");
        Self::from_json(&contents)
    }

    /// Check every invariant the hooks rely on
    pub fn validate(&self) -> Result<()> {
        if self.throttle.batch_size == 0 {
            return Err(Error::config("batch_size", "batch_size must be at least 1"));
        }

        PacingWindow::from_config(&self.pacing)?;

        if self.access.tokens.iter().any(|t| t.is_empty()) {
            return Err(Error::config("tokens", "tokens must not contain empty strings"));
        }
        if self.access.env_token_names.iter().any(|n| n.is_empty()) {
            return Err(Error::config(
                "env_token_names",
                "env_token_names must not contain empty names",
            ));
        }

        Ok(())
    }
}

fn default_batch_size() -> u64 {
    10
}

fn default_cool_down() -> Duration {
    Duration::from_secs(5 * 60)
}

fn default_pacing_lower() -> f64 {
    0.5
}

fn default_pacing_upper() -> f64 {
    2.0
}

fn default_tokens() -> Vec<String> {
    parse_token_list(STATIC_TOKENS.unwrap_or_default())
}

fn default_env_token_names() -> Vec<String> {
    DEFAULT_ENV_TOKEN_NAMES.iter().map(|s| s.to_string()).collect()
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 5555))
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_true() -> bool {
    true
}

/// Split a comma separated token list, dropping blank entries
pub(crate) fn parse_token_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Serialize `Duration` as whole seconds
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
