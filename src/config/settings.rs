use std::env;
use std::net::SocketAddr;
use std::str::FromStr;

use anyhow::{anyhow, Context, Result};
use chrono::Duration;

/// How the `search` parameter of the follow listing is matched against the
/// followed username. Matching is always case-insensitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchMode {
    #[default]
    Contains,
    Prefix,
}

impl FromStr for SearchMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "contains" => Ok(SearchMode::Contains),
            "prefix" => Ok(SearchMode::Prefix),
            other => Err(anyhow!("unknown search mode '{}'", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub port: u16,
    pub addr: SocketAddr,
    pub database_url: String,
    pub database_max_connections: u32,
    pub jwt_secret: String,
    pub access_token_ttl: Duration,
    pub refresh_token_ttl: Duration,
    pub follow_search_mode: SearchMode,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        let port: u16 = parse_or("PORT", 3000)?;
        let addr = SocketAddr::from(([0, 0, 0, 0], port));

        let database_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET must be set")?;

        let access_token_ttl = duration_or("JWT_ACCESS_TTL_MINUTES", 60, Duration::try_minutes)?;
        let refresh_token_ttl = duration_or("JWT_REFRESH_TTL_DAYS", 1, Duration::try_days)?;

        Ok(Self {
            port,
            addr,
            database_url,
            database_max_connections: parse_or("DATABASE_MAX_CONNECTIONS", 5)?,
            jwt_secret,
            access_token_ttl,
            refresh_token_ttl,
            follow_search_mode: parse_or("FOLLOW_SEARCH_MODE", SearchMode::default())?,
        })
    }

    /// `memory://` keeps everything in process; anything else is a Postgres URL.
    pub fn uses_memory_store(&self) -> bool {
        self.database_url.starts_with("memory://")
    }
}

fn parse_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| anyhow!("invalid value for {}: {}", key, e)),
        Err(_) => Ok(default),
    }
}

/// `unit` converts the raw amount; chrono refuses amounts it cannot represent.
fn duration_or(key: &str, default: i64, unit: fn(i64) -> Option<Duration>) -> Result<Duration> {
    let amount: i64 = parse_or(key, default)?;
    unit(amount).ok_or_else(|| anyhow!("value for {} is out of range: {}", key, amount))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_mode_parses_case_insensitively() {
        assert_eq!("Prefix".parse::<SearchMode>().unwrap(), SearchMode::Prefix);
        assert_eq!(" contains ".parse::<SearchMode>().unwrap(), SearchMode::Contains);
        assert!("fuzzy".parse::<SearchMode>().is_err());
    }

    #[test]
    fn unrepresentable_ttl_is_an_error() {
        env::set_var("BLOG_API_TEST_TTL_DAYS", i64::MAX.to_string());
        let err = duration_or("BLOG_API_TEST_TTL_DAYS", 1, Duration::try_days).unwrap_err();
        assert!(err.to_string().contains("out of range"));

        let ttl = duration_or("BLOG_API_TEST_TTL_UNSET", 90, Duration::try_minutes).unwrap();
        assert_eq!(ttl, Duration::minutes(90));
    }
}
