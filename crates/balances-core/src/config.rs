//! Relay configuration.
//!
//! Values arrive as raw strings (environment variables or command-line flags) in a
//! [`RawConfig`] and are validated into a [`RelayConfig`]. Any error here is fatal at startup.

use std::net::IpAddr;
use std::path::PathBuf;

use thiserror::Error;
use url::Url;

use crate::egress::{validate_outbound_url, EgressError};
use crate::gate::Credentials;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_FRONTEND_DIR: &str = "frontend";
pub const DEFAULT_WEBHOOK_URL: &str =
    "https://n8n.bitwiki.org/webhook/5777be58-9a54-4524-a1fc-5d6ef88931a3";
/// Request bodies above this are refused before parsing.
pub const DEFAULT_BODY_LIMIT: usize = 1024 * 1024;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("API_USER and API_PASS environment variables are required")]
    MissingCredentials,
    #[error("invalid PORT value: {0}")]
    InvalidPort(String),
    #[error("invalid HOST value: {0}")]
    InvalidHost(String),
    #[error("invalid TRIGGER_WEBHOOK_URL: {0}")]
    InvalidWebhook(#[from] EgressError),
}

/// Deployment environment, taken from `NODE_ENV`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Environment {
    Production,
    Development,
}

impl Environment {
    pub fn from_node_env(value: Option<&str>) -> Self {
        match value {
            Some("production") => Self::Production,
            _ => Self::Development,
        }
    }

    /// Whether auth attempts and raw write bodies may be logged.
    pub fn verbose_diagnostics(self) -> bool {
        !matches!(self, Self::Production)
    }
}

/// Unvalidated settings as supplied by the environment or flags.
#[derive(Clone, Debug, Default)]
pub struct RawConfig {
    pub api_user: Option<String>,
    pub api_pass: Option<String>,
    pub port: Option<String>,
    pub host: Option<String>,
    pub node_env: Option<String>,
    pub frontend_dir: Option<PathBuf>,
    pub webhook_url: Option<String>,
    pub trigger_require_auth: bool,
}

#[derive(Clone, Debug)]
pub struct RelayConfig {
    pub credentials: Credentials,
    pub host: IpAddr,
    pub port: u16,
    pub environment: Environment,
    pub frontend_dir: PathBuf,
    pub webhook_url: Url,
    /// Put `/api/trigger-update` behind the same credential check as writes.
    pub trigger_require_auth: bool,
    pub body_limit: usize,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}

fn parse_port(raw: Option<&str>) -> Result<u16, ConfigError> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(DEFAULT_PORT);
    };
    match raw.parse::<i64>() {
        Ok(n) if (1..=65535).contains(&n) => Ok(n as u16),
        _ => Err(ConfigError::InvalidPort(raw.to_string())),
    }
}

impl RelayConfig {
    pub fn from_raw(raw: RawConfig) -> Result<Self, ConfigError> {
        let (Some(api_user), Some(api_pass)) = (non_empty(raw.api_user), non_empty(raw.api_pass))
        else {
            return Err(ConfigError::MissingCredentials);
        };

        let port = parse_port(raw.port.as_deref())?;

        let host = match raw.host.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(h) => h
                .parse::<IpAddr>()
                .map_err(|_| ConfigError::InvalidHost(h.to_string()))?,
            None => DEFAULT_HOST
                .parse()
                .map_err(|_| ConfigError::InvalidHost(DEFAULT_HOST.to_string()))?,
        };

        let webhook_url = validate_outbound_url(
            raw.webhook_url
                .as_deref()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(DEFAULT_WEBHOOK_URL),
        )?;

        Ok(Self {
            credentials: Credentials::new(api_user, api_pass),
            host,
            port,
            environment: Environment::from_node_env(raw.node_env.as_deref()),
            frontend_dir: raw
                .frontend_dir
                .unwrap_or_else(|| PathBuf::from(DEFAULT_FRONTEND_DIR)),
            webhook_url,
            trigger_require_auth: raw.trigger_require_auth,
            body_limit: DEFAULT_BODY_LIMIT,
        })
    }
}
