use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use thiserror::Error;

pub const LISTEN_ADDR_ENV: &str = "TESTCASES_LISTEN_ADDR";
pub const DATABASE_URL_ENV: &str = "DATABASE_URL";
pub const MAX_CONNECTIONS_ENV: &str = "TESTCASES_DB_MAX_CONNECTIONS";
pub const FRONTEND_DIR_ENV: &str = "TESTCASES_FRONTEND_DIR";

const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8000";
const DEFAULT_DATABASE_URL: &str = "sqlite://testcases.db";
const DEFAULT_MAX_CONNECTIONS: u32 = 5;

#[derive(Debug, Error)]
#[error("invalid value {value:?} for {name}: {reason}")]
pub struct ConfigError {
    name: &'static str,
    value: String,
    reason: String,
}

#[derive(Clone, Debug)]
pub struct StoreConfig {
    pub database_url: String,
    pub max_connections: u32,
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub listen_addr: SocketAddr,
    pub store: StoreConfig,
    pub frontend_dir: Option<PathBuf>,
}

fn env_or(name: &str, default: &str) -> String {
    env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_env<T>(name: &'static str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let value = env_or(name, default);
    value.trim().parse::<T>().map_err(|e| ConfigError {
        name,
        reason: e.to_string(),
        value,
    })
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let max_connections: u32 = parse_env(MAX_CONNECTIONS_ENV, &DEFAULT_MAX_CONNECTIONS.to_string())?;
        if max_connections == 0 {
            return Err(ConfigError {
                name: MAX_CONNECTIONS_ENV,
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(Self {
            listen_addr: parse_env(LISTEN_ADDR_ENV, DEFAULT_LISTEN_ADDR)?,
            store: StoreConfig {
                database_url: env_or(DATABASE_URL_ENV, DEFAULT_DATABASE_URL),
                max_connections,
            },
            frontend_dir: env::var(FRONTEND_DIR_ENV)
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
        })
    }
}
