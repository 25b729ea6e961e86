//! Configuration for the gateway and the widget.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const ENV_STORE_URL: &str = "LIST_STORE_URL";
pub const ENV_LIST_NAME: &str = "LIST_NAME";
pub const ENV_TIMEOUT_SECS: &str = "LIST_STORE_TIMEOUT_SECS";

/// Properties a host persists for one widget instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetProperties {
    /// Title of the list the widget operates on.
    pub list_name: String,
}

/// Connection settings for the remote list store.
///
/// ```
/// use listitem_core::StoreConfig;
/// use std::time::Duration;
///
/// let config = StoreConfig::new()
///     .with_base_url("http://127.0.0.1:8080")
///     .with_list_name("Tasks")
///     .with_timeout(Duration::from_secs(5));
/// assert_eq!(config.list_name(), "Tasks");
/// ```
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub(crate) base_url: String,
    pub(crate) list_name: String,
    pub(crate) timeout: Duration,
    pub(crate) user_agent: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:3000".to_string(),
            list_name: "Items".to_string(),
            timeout: Duration::from_secs(30),
            user_agent: concat!("listitem-core/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl StoreConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read `LIST_STORE_URL` and `LIST_NAME` (both required) and the optional
    /// `LIST_STORE_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let base_url = lookup(ENV_STORE_URL)
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing(ENV_STORE_URL))?;
        let list_name = lookup(ENV_LIST_NAME)
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing(ENV_LIST_NAME))?;

        let mut config = Self::new().with_base_url(base_url).with_list_name(list_name);
        if let Some(raw) = lookup(ENV_TIMEOUT_SECS) {
            let secs: u64 = raw.trim().parse().map_err(|_| ConfigError::Invalid {
                name: ENV_TIMEOUT_SECS,
                value: raw.clone(),
            })?;
            config = config.with_timeout(Duration::from_secs(secs));
        }
        Ok(config)
    }

    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    #[must_use]
    pub fn with_list_name(mut self, name: impl Into<String>) -> Self {
        self.list_name = name.into();
        self
    }

    /// Apply the list chosen in a widget's properties.
    #[must_use]
    pub fn with_properties(self, properties: &WidgetProperties) -> Self {
        self.with_list_name(properties.list_name.clone())
    }

    /// Defaults to 30 seconds.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn list_name(&self) -> &str {
        &self.list_name
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }
}
