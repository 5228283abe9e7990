//! Configuration for the remote store client and editing sessions.

use std::time::Duration;

use busline_transit::PositionBase;
use serde::Deserialize;

use crate::editor::save::SavePolicy;

pub const ROUTES_URL_VAR: &str = "BUSLINE_ROUTES_URL";
pub const STOPS_URL_VAR: &str = "BUSLINE_STOPS_URL";
pub const TIMEOUT_VAR: &str = "BUSLINE_TIMEOUT_SECS";
pub const POSITION_BASE_VAR: &str = "BUSLINE_POSITION_BASE";

const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_USER_AGENT: &str = concat!("busline/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("invalid value {value:?} for {key}")]
    Invalid { key: &'static str, value: String },

    #[error("failed to build http client")]
    Client(#[from] reqwest::Error),
}

/// Where the remote Routes and Stops resources live
#[derive(Clone, Debug, Deserialize)]
pub struct StoreConfig {
    pub routes_url: String,
    pub stops_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Ordering convention of `Stop.position` in the remote store
    #[serde(default)]
    pub position_base: PositionBase,
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_owned()
}

impl StoreConfig {
    pub fn new(routes_url: impl Into<String>, stops_url: impl Into<String>) -> Self {
        Self {
            routes_url: routes_url.into(),
            stops_url: stops_url.into(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            user_agent: default_user_agent(),
            position_base: PositionBase::default(),
        }
    }

    /// Read the configuration from `BUSLINE_*` environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let routes_url = lookup(ROUTES_URL_VAR).ok_or(ConfigError::Missing(ROUTES_URL_VAR))?;
        let stops_url = lookup(STOPS_URL_VAR).ok_or(ConfigError::Missing(STOPS_URL_VAR))?;
        let mut config = Self::new(routes_url, stops_url);

        if let Some(value) = lookup(TIMEOUT_VAR) {
            config.timeout_secs = value.trim().parse().map_err(|_| ConfigError::Invalid {
                key: TIMEOUT_VAR,
                value: value.clone(),
            })?;
        }

        if let Some(value) = lookup(POSITION_BASE_VAR) {
            config.position_base = value
                .trim()
                .parse()
                .ok()
                .and_then(PositionBase::from_offset)
                .ok_or(ConfigError::Invalid {
                    key: POSITION_BASE_VAR,
                    value,
                })?;
        }

        Ok(config)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Behaviour of an editing session
#[derive(Clone, Debug)]
pub struct SessionConfig {
    pub save_policy: SavePolicy,
    /// Name given to stops added with `add_stop`
    pub placeholder_stop_name: String,
    pub position_base: PositionBase,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            save_policy: SavePolicy::NameOnly,
            placeholder_stop_name: "Новая остановка".to_owned(),
            position_base: PositionBase::default(),
        }
    }
}
