//! Client configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::types::ApiUrl;

/// Default bound on a single renewal call.
pub const DEFAULT_RENEWAL_TIMEOUT: Duration = Duration::from_secs(10);

pub const DEFAULT_LOGIN_PATH: &str = "/auth/login";
pub const DEFAULT_REGISTER_PATH: &str = "/auth/register";
pub const DEFAULT_REFRESH_PATH: &str = "/auth/refresh";

/// Settings for an [`AuthClient`](crate::AuthClient).
///
/// Only the base URL is required; every other field has a default, so a
/// config file may be as small as `{"base_url": "https://api.example.com"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    pub base_url: ApiUrl,

    #[serde(default = "default_login_path")]
    pub login_path: String,

    #[serde(default = "default_register_path")]
    pub register_path: String,

    #[serde(default = "default_refresh_path")]
    pub refresh_path: String,

    /// Further paths that must never trigger a renewal.
    #[serde(default)]
    pub extra_excluded_paths: Vec<String>,

    #[serde(default = "default_renewal_timeout_ms")]
    pub renewal_timeout_ms: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_login_path() -> String {
    DEFAULT_LOGIN_PATH.to_string()
}

fn default_register_path() -> String {
    DEFAULT_REGISTER_PATH.to_string()
}

fn default_refresh_path() -> String {
    DEFAULT_REFRESH_PATH.to_string()
}

fn default_renewal_timeout_ms() -> u64 {
    duration_ms(DEFAULT_RENEWAL_TIMEOUT)
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

fn default_user_agent() -> String {
    concat!("tokenflight/", env!("CARGO_PKG_VERSION")).to_string()
}

impl ClientConfig {
    pub fn new(base_url: ApiUrl) -> Self {
        Self {
            base_url,
            login_path: default_login_path(),
            register_path: default_register_path(),
            refresh_path: default_refresh_path(),
            extra_excluded_paths: Vec::new(),
            renewal_timeout_ms: default_renewal_timeout_ms(),
            user_agent: default_user_agent(),
        }
    }

    pub fn with_login_path(mut self, path: impl Into<String>) -> Self {
        self.login_path = path.into();
        self
    }

    pub fn with_register_path(mut self, path: impl Into<String>) -> Self {
        self.register_path = path.into();
        self
    }

    pub fn with_refresh_path(mut self, path: impl Into<String>) -> Self {
        self.refresh_path = path.into();
        self
    }

    pub fn with_excluded_path(mut self, path: impl Into<String>) -> Self {
        self.extra_excluded_paths.push(path.into());
        self
    }

    pub fn with_renewal_timeout(mut self, timeout: Duration) -> Self {
        self.renewal_timeout_ms = duration_ms(timeout);
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn renewal_timeout(&self) -> Duration {
        Duration::from_millis(self.renewal_timeout_ms)
    }
}
