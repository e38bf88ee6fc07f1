//! On-disk locations for the CLI's credentials and client config.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use tokenflight::{ClientConfig, FileStorage};

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

const CREDENTIALS_FILE: &str = "credentials.json";
const CONFIG_FILE: &str = "config.json";

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("", "", "tokenflight").context("Could not determine home directory")
}

/// Get the credentials file path, creating its directory.
pub fn credentials_path() -> Result<PathBuf> {
    let dirs = project_dirs()?;
    let data_dir = dirs.data_dir();
    fs::create_dir_all(data_dir).context("Failed to create data directory")?;
    Ok(data_dir.join(CREDENTIALS_FILE))
}

/// Get the default config file path.
pub fn default_config_path() -> Result<PathBuf> {
    Ok(project_dirs()?.config_dir().join(CONFIG_FILE))
}

/// Open the durable credential storage.
pub fn open_credentials() -> Result<Arc<FileStorage>> {
    Ok(Arc::new(FileStorage::new(credentials_path()?)))
}

/// Read a client config file. A missing file is not an error.
pub fn read_config(path: &Path) -> Result<Option<ClientConfig>> {
    if !path.exists() {
        return Ok(None);
    }

    let json = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let config = serde_json::from_str(&json)
        .with_context(|| format!("Invalid config file {}", path.display()))?;
    Ok(Some(config))
}

/// Write a client config file.
pub fn write_config(path: &Path, config: &ClientConfig) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("Failed to create config directory")?;
    }

    let json = serde_json::to_string_pretty(config)?;
    fs::write(path, json).context("Failed to write config file")?;

    #[cfg(unix)]
    {
        let mut perms = fs::metadata(path)?.permissions();
        perms.set_mode(0o600);
        fs::set_permissions(path, perms)?;
    }

    Ok(())
}
