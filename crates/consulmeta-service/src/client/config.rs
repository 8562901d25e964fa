//! Store client configuration
//!
//! Defaults match a local Consul agent and can be overridden from the
//! environment with the variables the Consul tooling uses:
//!
//! - `CONSUL_HTTP_ADDR`: agent address, optionally with `http://` or `https://`
//! - `CONSUL_HTTP_TOKEN`: ACL token sent with every request
//! - `CONSUL_HTTP_SSL`: use HTTPS when true

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{StoreError, StoreResult};

/// Address of the local agent when nothing else is configured
pub const DEFAULT_ADDRESS: &str = "127.0.0.1:8500";

/// Prefix of the environment variables read by [`ClientConfig::from_env`]
pub const ENV_PREFIX: &str = "CONSUL";

/// URL scheme used to reach the agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    #[default]
    Http,
    Https,
}

impl Scheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }
}

/// Connection settings for [`super::ConsulHttpClient`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// `host:port` of the agent
    pub address: String,
    pub scheme: Scheme,
    /// ACL token
    pub token: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS.to_string(),
            scheme: Scheme::Http,
            token: None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct EnvOverrides {
    http_addr: Option<String>,
    http_token: Option<String>,
    http_ssl: Option<bool>,
}

impl ClientConfig {
    /// Defaults overridden by `CONSUL_HTTP_*` environment variables
    pub fn from_env() -> StoreResult<Self> {
        Self::from_environment(::config::Environment::with_prefix(ENV_PREFIX))
    }

    fn from_environment(source: ::config::Environment) -> StoreResult<Self> {
        let overrides: EnvOverrides = ::config::Config::builder()
            .add_source(source)
            .build()
            .and_then(|settings| settings.try_deserialize())
            .map_err(|e| StoreError::InvalidConfig(e.to_string()))?;

        let mut config = Self::default();
        if let Some(address) = overrides.http_addr.filter(|a| !a.is_empty()) {
            config.set_address(&address);
        }
        if let Some(ssl) = overrides.http_ssl {
            config.scheme = if ssl { Scheme::Https } else { Scheme::Http };
        }
        config.token = overrides.http_token.filter(|t| !t.is_empty());

        Ok(config)
    }

    /// Override the agent address. A leading `http://` or `https://` also
    /// sets the scheme.
    pub fn with_address(mut self, address: &str) -> Self {
        self.set_address(address);
        self
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    fn set_address(&mut self, address: &str) {
        if let Some(rest) = address.strip_prefix("https://") {
            self.scheme = Scheme::Https;
            self.address = rest.trim_end_matches('/').to_string();
        } else if let Some(rest) = address.strip_prefix("http://") {
            self.scheme = Scheme::Http;
            self.address = rest.trim_end_matches('/').to_string();
        } else {
            self.address = address.to_string();
        }
    }

    /// Root URL of the agent, always ending in `/`
    pub fn base_url(&self) -> StoreResult<Url> {
        let raw = format!("{}://{}/", self.scheme.as_str(), self.address);
        Url::parse(&raw).map_err(|e| {
            StoreError::InvalidConfig(format!("Invalid Consul address '{}': {}", self.address, e))
        })
    }
}
