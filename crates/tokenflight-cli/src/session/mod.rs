//! Client construction from flags, environment and stored state.

pub mod storage;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use tokenflight::{ApiUrl, AuthClient, ClientConfig};

use crate::cli::ConnectionArgs;

/// A client plus the config it was built from.
pub struct CliSession {
    pub client: AuthClient,
    pub config_path: PathBuf,
}

impl CliSession {
    /// Build a client backed by the stored credentials.
    pub async fn open(args: &ConnectionArgs) -> Result<Self> {
        let config_path = match &args.config {
            Some(path) => path.clone(),
            None => storage::default_config_path()?,
        };
        let config = resolve_config(args, storage::read_config(&config_path)?)?;

        let credentials = storage::open_credentials()?;
        let client = AuthClient::with_storage(config, credentials)
            .await
            .context("Failed to create client")?;

        Ok(Self {
            client,
            config_path,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        self.client.config()
    }

    /// Persist the effective config so later commands find the same API.
    pub fn remember_config(&self) -> Result<()> {
        storage::write_config(&self.config_path, self.config())
    }
}

/// Merge flag/env overrides onto the config file, if any.
fn resolve_config(args: &ConnectionArgs, file: Option<ClientConfig>) -> Result<ClientConfig> {
    let mut config = match (&args.base_url, file) {
        (Some(url), Some(file)) => ClientConfig {
            base_url: ApiUrl::new(url).context("Invalid API base URL")?,
            ..file
        },
        (Some(url), None) => ClientConfig::new(ApiUrl::new(url).context("Invalid API base URL")?),
        (None, Some(file)) => file,
        (None, None) => bail!(
            "No API base URL configured. Pass --base-url or set TOKENFLIGHT_BASE_URL."
        ),
    };

    if let Some(ms) = args.renewal_timeout_ms {
        config = config.with_renewal_timeout(Duration::from_millis(ms));
    }

    Ok(config)
}
