//! Client configuration.
//!
//! A process installs one `ClientConfig` at startup with [`init`]; it cannot
//! be replaced afterwards. Clients may also be built from an explicit config,
//! which is what tests do.

use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{ApiError, Result};
use crate::transport::TransportKind;

/// Version segment of every index API path.
pub const API_VERSION: &str = "v1";

/// Sent on every request.
pub const USER_AGENT: &str = concat!("tank-core/", env!("CARGO_PKG_VERSION"));

pub const ENV_API_URL: &str = "TANK_API_URL";
pub const ENV_FETCH_PROXY: &str = "TANK_FETCH_PROXY";
pub const ENV_FETCH_CONTEXT: &str = "TANK_FETCH_CONTEXT";

static GLOBAL: OnceLock<ClientConfig> = OnceLock::new();

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    pub api_url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default)]
    pub transport: TransportKind,
}

fn default_user_agent() -> String {
    USER_AGENT.to_string()
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8080".to_string(),
            user_agent: default_user_agent(),
            transport: TransportKind::Direct,
        }
    }
}

impl ClientConfig {
    pub fn new(api_url: &str) -> Self {
        Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            ..Self::default()
        }
    }

    /// Read the config from `TANK_*` environment variables. Setting
    /// `TANK_FETCH_PROXY` selects the hosted transport.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = match lookup(ENV_API_URL) {
            Some(url) => Self::new(&url),
            None => Self::default(),
        };
        if let Some(proxy) = lookup(ENV_FETCH_PROXY).filter(|p| !p.is_empty()) {
            config.transport = TransportKind::Hosted {
                proxy,
                context: lookup(ENV_FETCH_CONTEXT),
            };
        }
        config
    }
}

/// Install the process-wide configuration. Fails if one is already installed.
pub fn init(config: ClientConfig) -> Result<&'static ClientConfig> {
    GLOBAL
        .set(config)
        .map_err(|_| ApiError::Config("client configuration already initialized".to_string()))?;
    let config = global();
    info!(api_url = %config.api_url, transport = ?config.transport, "client configuration initialized");
    Ok(config)
}

/// The installed configuration, or the default one if [`init`] was never called.
pub fn global() -> &'static ClientConfig {
    GLOBAL.get_or_init(ClientConfig::default)
}
