use std::str::FromStr;
use std::time::Duration;

use crate::constants::*;
use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct Config {
    pub feed: FeedConfig,
    pub sync: SyncConfig,
    /// MySQL/TiDB connection string. Without it the process runs on the in-memory store.
    pub database_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct FeedConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub sport: String,
    pub regions: String,
    pub markets: String,
    pub scores_days_from: u32,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub refresh_cooldown: Duration,
    pub resolve_interval: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup; blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let feed = FeedConfig {
            api_key: get("ODDS_API_KEY"),
            base_url: get("ODDS_API_URL").unwrap_or_else(|| ODDS_API_URL.to_string()),
            sport: get("ODDS_SPORT").unwrap_or_else(|| DEFAULT_SPORT.to_string()),
            regions: get("ODDS_REGIONS").unwrap_or_else(|| DEFAULT_REGIONS.to_string()),
            markets: get("ODDS_MARKETS").unwrap_or_else(|| DEFAULT_MARKETS.to_string()),
            scores_days_from: parse_or(
                "ODDS_SCORES_DAYS_FROM",
                get("ODDS_SCORES_DAYS_FROM"),
                DEFAULT_SCORES_DAYS_FROM,
            )?,
            timeout: Duration::from_secs(parse_or(
                "FEED_TIMEOUT_SECS",
                get("FEED_TIMEOUT_SECS"),
                DEFAULT_FEED_TIMEOUT_SECS,
            )?),
        };

        let sync = SyncConfig {
            refresh_cooldown: Duration::from_secs(parse_or(
                "REFRESH_COOLDOWN_SECS",
                get("REFRESH_COOLDOWN_SECS"),
                DEFAULT_REFRESH_COOLDOWN_SECS,
            )?),
            resolve_interval: Duration::from_secs(parse_or(
                "RESOLVE_INTERVAL_SECS",
                get("RESOLVE_INTERVAL_SECS"),
                DEFAULT_RESOLVE_INTERVAL_SECS,
            )?),
        };

        if sync.resolve_interval.is_zero() {
            return Err(Error::Config("RESOLVE_INTERVAL_SECS must be greater than zero".into()));
        }

        Ok(Config {
            feed,
            sync,
            database_url: get("DATABASE_URL"),
        })
    }
}

fn parse_or<T: FromStr>(key: &str, raw: Option<String>, default: T) -> Result<T> {
    match raw {
        Some(value) => value
            .parse()
            .map_err(|_| Error::Config(format!("{} is not a valid number: {}", key, value))),
        None => Ok(default),
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: ODDS_API_URL.to_string(),
            sport: DEFAULT_SPORT.to_string(),
            regions: DEFAULT_REGIONS.to_string(),
            markets: DEFAULT_MARKETS.to_string(),
            scores_days_from: DEFAULT_SCORES_DAYS_FROM,
            timeout: Duration::from_secs(DEFAULT_FEED_TIMEOUT_SECS),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            refresh_cooldown: Duration::from_secs(DEFAULT_REFRESH_COOLDOWN_SECS),
            resolve_interval: Duration::from_secs(DEFAULT_RESOLVE_INTERVAL_SECS),
        }
    }
}
