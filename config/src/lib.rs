//! Configuration loading for fanout.
//!
//! Settings come from `~/.fanout/config.toml`. Every field is optional; a
//! missing file or section falls back to the built-in defaults. String values
//! may reference environment variables as `${NAME}`.
//!
//! ```toml
//! [upstream]
//! url = "http://localhost:8080/api/sleep"
//! connect_timeout_ms = 2000
//! min_ms = 1000
//! max_ms = 4000
//!
//! [request]
//! timeout_ms = 1000
//! policy = "first"
//! ```

use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use fanout_types::{DEFAULT_TIMEOUT_MS, PolicyKind};
use fanout_upstream::{DEFAULT_UPSTREAM_URL, UpstreamOptions, Url};
use serde::Deserialize;
use thiserror::Error;

/// Environment variable overriding `[upstream] url`.
pub const UPSTREAM_URL_ENV: &str = "FANOUT_UPSTREAM_URL";

#[derive(Debug, Default, Deserialize)]
pub struct FanoutConfig {
    pub upstream: Option<UpstreamConfig>,
    pub request: Option<RequestConfig>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpstreamConfig {
    pub url: Option<String>,
    pub connect_timeout_ms: Option<u64>,
    /// Lower latency bound forwarded to the upstream as `min`.
    pub min_ms: Option<u64>,
    /// Upper latency bound forwarded to the upstream as `max`.
    pub max_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RequestConfig {
    /// Validated per request, so an out-of-range value surfaces as an invalid timeout.
    pub timeout_ms: Option<i64>,
    pub policy: Option<PolicyKind>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: io::Error,
    },
    #[error("failed to parse config at {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid upstream url '{url}': {source}")]
    InvalidUrl {
        url: String,
        source: url::ParseError,
    },
}

impl FanoutConfig {
    /// Load the config from its default location.
    ///
    /// Returns `Ok(None)` when no config file exists.
    pub fn load() -> Result<Option<Self>, ConfigError> {
        let Some(path) = config_path() else {
            return Ok(None);
        };
        if !path.exists() {
            return Ok(None);
        }
        Self::load_from(&path).map(Some)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!("Failed to read config at {:?}: {}", path, err);
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source: err,
                });
            }
        };

        match toml::from_str(&content) {
            Ok(config) => Ok(config),
            Err(err) => {
                tracing::warn!("Failed to parse config at {:?}: {}", path, err);
                Err(ConfigError::Parse {
                    path: path.to_path_buf(),
                    source: err,
                })
            }
        }
    }

    #[must_use]
    pub fn path() -> Option<PathBuf> {
        config_path()
    }

    /// Connection settings for the upstream.
    ///
    /// URL precedence: `FANOUT_UPSTREAM_URL`, then `[upstream] url`, then the default.
    pub fn upstream_options(&self) -> Result<UpstreamOptions, ConfigError> {
        self.upstream_options_with(env::var(UPSTREAM_URL_ENV).ok().as_deref())
    }

    fn upstream_options_with(&self, env_url: Option<&str>) -> Result<UpstreamOptions, ConfigError> {
        let section = self.upstream.as_ref();
        let raw = env_url
            .map(str::to_string)
            .or_else(|| section.and_then(|u| u.url.as_deref()).map(expand_env_vars))
            .unwrap_or_else(|| DEFAULT_UPSTREAM_URL.to_string());

        let mut options = UpstreamOptions::new(parse_url(&raw)?);
        if let Some(section) = section {
            if let Some(ms) = section.connect_timeout_ms {
                options.connect_timeout = Duration::from_millis(ms);
            }
            options.min_ms = section.min_ms;
            options.max_ms = section.max_ms;
        }
        Ok(options)
    }

    /// Timeout applied when the caller gives none.
    #[must_use]
    pub fn default_timeout_ms(&self) -> i64 {
        self.request
            .as_ref()
            .and_then(|r| r.timeout_ms)
            .unwrap_or(DEFAULT_TIMEOUT_MS as i64)
    }

    #[must_use]
    pub fn default_policy(&self) -> PolicyKind {
        self.request
            .as_ref()
            .and_then(|r| r.policy)
            .unwrap_or_default()
    }
}

/// Parse and validate an upstream URL.
pub fn parse_url(raw: &str) -> Result<Url, ConfigError> {
    Url::parse(raw.trim()).map_err(|source| ConfigError::InvalidUrl {
        url: raw.to_string(),
        source,
    })
}

/// Replace `${NAME}` references with the value of the environment variable.
///
/// Unset variables and `${}` expand to the empty string. Unterminated
/// references are left as written.
#[must_use]
pub fn expand_env_vars(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                let name = &after[..end];
                if !name.is_empty() {
                    out.push_str(&env::var(name).unwrap_or_default());
                }
                rest = &after[end + 1..];
            }
            None => {
                out.push_str("${");
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}

#[must_use]
pub fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".fanout").join("config.toml"))
}
