use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Upper bound for `FEED_MAX_LIMIT`. Sequential fetching binds one SQL
/// parameter per already chosen topic, which must stay well under SQLite's
/// bind-variable limit.
pub const FEED_LIMIT_CEILING: u32 = 1000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {name}: {message}")]
    InvalidValue { name: String, message: String },
    #[error("failed to parse {name} as integer: {source}")]
    ParseInt {
        name: String,
        #[source]
        source: std::num::ParseIntError,
    },
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Database
    pub database_path: PathBuf,

    // Web Server
    pub web_host: String,
    pub web_port: u16,
    pub cors_allowed_origins: Vec<String>,

    // Feed
    pub feed_default_limit: u32,
    /// Largest accepted `limit`. Requests above it get a 400 rather than an
    /// oversized feed, so this narrows "any positive limit" to
    /// `1..=feed_max_limit`.
    pub feed_max_limit: u32,
    pub segment_timeout: Duration,
    pub fetch_strategy: FetchStrategy,
    pub utc_offset_minutes: i32,
}

/// How the segment queries of one feed request are scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStrategy {
    /// One segment at a time; later queries exclude IDs already chosen.
    Sequential,
    /// All segments at once; duplicates are dropped while assembling.
    Concurrent,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set but cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            // Database
            database_path: PathBuf::from(env_or_default("DATABASE_PATH", "./data/forum.sqlite")),

            // Web Server
            web_host: env_or_default("WEB_HOST", "0.0.0.0"),
            web_port: parse_env_u16("WEB_PORT", 8080)?,
            cors_allowed_origins: optional_env("CORS_ALLOWED_ORIGINS")
                .map(|v| parse_origin_list(&v))
                .unwrap_or_default(),

            // Feed
            feed_default_limit: parse_env_u32("FEED_DEFAULT_LIMIT", 20)?,
            feed_max_limit: parse_env_u32("FEED_MAX_LIMIT", 100)?,
            segment_timeout: Duration::from_millis(parse_env_u64("FEED_SEGMENT_TIMEOUT_MS", 2000)?),
            fetch_strategy: parse_fetch_strategy(&env_or_default("FEED_FETCH_STRATEGY", "sequential"))?,
            utc_offset_minutes: parse_env_i32("FEED_UTC_OFFSET_MINUTES", 0)?,
        })
    }

    /// Validate that the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.feed_default_limit == 0 {
            return Err(ConfigError::InvalidValue {
                name: "FEED_DEFAULT_LIMIT".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.feed_max_limit < self.feed_default_limit {
            return Err(ConfigError::InvalidValue {
                name: "FEED_MAX_LIMIT".to_string(),
                message: format!(
                    "must be at least FEED_DEFAULT_LIMIT ({})",
                    self.feed_default_limit
                ),
            });
        }
        if self.feed_max_limit > FEED_LIMIT_CEILING {
            return Err(ConfigError::InvalidValue {
                name: "FEED_MAX_LIMIT".to_string(),
                message: format!("must not exceed {FEED_LIMIT_CEILING}"),
            });
        }
        if self.segment_timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                name: "FEED_SEGMENT_TIMEOUT_MS".to_string(),
                message: "must be greater than 0".to_string(),
            });
        }
        // Real-world offsets stay within +/- 14 hours.
        if self.utc_offset_minutes.abs() > 14 * 60 {
            return Err(ConfigError::InvalidValue {
                name: "FEED_UTC_OFFSET_MINUTES".to_string(),
                message: format!("{} is outside -840..=840", self.utc_offset_minutes),
            });
        }
        Ok(())
    }
}

fn optional_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.is_empty())
}

fn env_or_default(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_env_u64(name: &str, default: u64) -> Result<u64, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => val.parse().map_err(|e| ConfigError::ParseInt {
            name: name.to_string(),
            source: e,
        }),
        _ => Ok(default),
    }
}

fn parse_env_u32(name: &str, default: u32) -> Result<u32, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => val.parse().map_err(|e| ConfigError::ParseInt {
            name: name.to_string(),
            source: e,
        }),
        _ => Ok(default),
    }
}

fn parse_env_i32(name: &str, default: i32) -> Result<i32, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => val.parse().map_err(|e| ConfigError::ParseInt {
            name: name.to_string(),
            source: e,
        }),
        _ => Ok(default),
    }
}

fn parse_env_u16(name: &str, default: u16) -> Result<u16, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => val.parse().map_err(|e| ConfigError::ParseInt {
            name: name.to_string(),
            source: e,
        }),
        _ => Ok(default),
    }
}

fn parse_fetch_strategy(value: &str) -> Result<FetchStrategy, ConfigError> {
    match value.to_lowercase().as_str() {
        "sequential" => Ok(FetchStrategy::Sequential),
        "concurrent" => Ok(FetchStrategy::Concurrent),
        _ => Err(ConfigError::InvalidValue {
            name: "FEED_FETCH_STRATEGY".to_string(),
            message: format!("must be 'sequential' or 'concurrent', got '{value}'"),
        }),
    }
}

fn parse_origin_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
