//! Runtime configuration read from the environment.
//!
//! - `ADMIN_PASSWORD` - admin secret checked at login (no default)
//! - `SHEETDB_URL` - spreadsheet endpoint, takes priority over the table store
//! - `DATABASE_URL` - SQLite URL for the table store
//! - `SESSION_SECRET` - key for signing session cookies (optional)
//! - `HOST` / `PORT` - bind address (default `0.0.0.0:3000`)

use std::net::{IpAddr, SocketAddr};

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(&'static str, String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub admin_password: Option<SecretString>,
    pub session_secret: Option<SecretString>,
    pub sheetdb_url: Option<Url>,
    pub database_url: Option<String>,
    pub addr: SocketAddr,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            admin_password: None,
            session_secret: None,
            sheetdb_url: None,
            database_url: None,
            addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
        }
    }
}

/// Reads a variable, treating empty values as unset.
fn var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(var)
    }

    /// Builds a config from any variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let sheetdb_url = lookup("SHEETDB_URL")
            .map(|raw| {
                Url::parse(&raw).map_err(|e| ConfigError::InvalidEnvVar("SHEETDB_URL", e.to_string()))
            })
            .transpose()?;

        let host: IpAddr = match lookup("HOST") {
            Some(raw) => raw
                .parse()
                .map_err(|e: std::net::AddrParseError| ConfigError::InvalidEnvVar("HOST", e.to_string()))?,
            None => IpAddr::from([0, 0, 0, 0]),
        };
        let port: u16 = match lookup("PORT") {
            Some(raw) => raw
                .parse()
                .map_err(|e: std::num::ParseIntError| ConfigError::InvalidEnvVar("PORT", e.to_string()))?,
            None => 3000,
        };

        Ok(Self {
            admin_password: lookup("ADMIN_PASSWORD").map(SecretString::from),
            session_secret: lookup("SESSION_SECRET").map(SecretString::from),
            sheetdb_url,
            database_url: lookup("DATABASE_URL"),
            addr: SocketAddr::new(host, port),
        })
    }
}
