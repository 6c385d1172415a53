//! Server configuration with layered loading.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::Deserialize;
use thiserror::Error;

use crate::bus::DEFAULT_BUS_CAPACITY;

/// Errors that can occur when loading or parsing server configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Error from the Figment configuration library.
    #[error("Configuration error: {0}")]
    Figment(Box<figment::Error>),

    /// The specified configuration file was not found.
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    /// The configuration is invalid or malformed.
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Address to bind the HTTP listener to.
    #[serde(default = "default_bind_address")]
    pub bind_address: SocketAddr,

    /// HTTP path the packet endpoint is mounted at.
    #[serde(default = "default_path")]
    pub path: String,

    /// Policy XML served at `/crossdomain.xml`.
    #[serde(default = "default_crossdomain")]
    pub crossdomain: String,

    /// Whether to serve the built-in home page at `/`.
    #[serde(default = "default_default_home")]
    pub default_home: bool,

    /// Packet-ready bus capacity per subscriber.
    #[serde(default = "default_bus_capacity")]
    pub bus_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            path: default_path(),
            crossdomain: default_crossdomain(),
            default_home: default_default_home(),
            bus_capacity: default_bus_capacity(),
        }
    }
}

impl ServerConfig {
    /// Loads configuration from the default path (`parallax.toml`).
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("parallax.toml")
    }

    /// Loads configuration from the specified file path.
    ///
    /// Environment variables prefixed with `PARALLAX_` override file
    /// settings (`__` separates nesting levels).
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let figment = Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed("PARALLAX_").split("__").lowercase(false));

        Self::validated(figment.extract::<Self>()?)
    }

    /// Parses configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let figment = Figment::new().merge(Toml::string(content));
        Self::validated(figment.extract::<Self>()?)
    }

    fn validated(config: Self) -> Result<Self, ConfigError> {
        if !config.path.starts_with('/') {
            return Err(ConfigError::Invalid(format!(
                "packet path must start with '/': {}",
                config.path
            )));
        }
        Ok(config)
    }
}

const fn default_bind_address() -> SocketAddr {
    SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 8080)
}

fn default_path() -> String {
    "/".to_owned()
}

fn default_crossdomain() -> String {
    "<cross-domain-policy><allow-access-from domain=\"*\" to-ports=\"*\" /></cross-domain-policy>"
        .to_owned()
}

const fn default_default_home() -> bool {
    true
}

const fn default_bus_capacity() -> usize {
    DEFAULT_BUS_CAPACITY
}
