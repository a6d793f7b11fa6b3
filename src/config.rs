//! Service configuration, read from the environment (and `.env`).

use thiserror::Error;

use crate::domain::value_objects::DepthLimit;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),

    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub nats_url: Option<String>,
    pub db_max_connections: u32,
    pub depth_limit: DepthLimit,
}

impl Config {
    pub const DEFAULT_PORT: u16 = 8083;
    pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;

    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a config from any variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let database_url = lookup("DATABASE_URL").filter(|url| !url.is_empty()).ok_or(ConfigError::Missing("DATABASE_URL"))?;
        let port = parse_or(&lookup, "PORT", Self::DEFAULT_PORT)?;
        let db_max_connections = parse_or(&lookup, "DB_MAX_CONNECTIONS", Self::DEFAULT_MAX_CONNECTIONS)?;
        let levels = parse_or(&lookup, "MENU_MAX_DEPTH", DepthLimit::DEFAULT_LEVELS)?;
        if !(1..=DepthLimit::MAX_LEVELS).contains(&levels) {
            return Err(ConfigError::Invalid { name: "MENU_MAX_DEPTH", value: levels.to_string() });
        }
        Ok(Self {
            database_url,
            port,
            nats_url: lookup("NATS_URL").filter(|url| !url.is_empty()),
            db_max_connections,
            depth_limit: DepthLimit::new(levels),
        })
    }

    pub fn listen_addr(&self) -> String { format!("0.0.0.0:{}", self.port) }
}

fn parse_or<T: std::str::FromStr>(lookup: &impl Fn(&str) -> Option<String>, name: &'static str, default: T) -> Result<T, ConfigError> {
    match lookup(name) {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid { name, value }),
    }
}
