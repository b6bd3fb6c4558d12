mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    let default_paths = [
        "./ripvault.toml",
        "./config.toml",
        "~/.config/ripvault/config.toml",
        "/etc/ripvault/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            tracing::debug!("Using config file {:?}", path);
            return load_config(path);
        }
    }

    Ok(Config::default())
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    if config.ingest.command_timeout_secs == 0 {
        anyhow::bail!("ingest.command_timeout_secs cannot be 0");
    }
    if config.ingest.transfer_timeout_secs == 0 {
        anyhow::bail!("ingest.transfer_timeout_secs cannot be 0");
    }
    if config.drive.device.is_empty() {
        anyhow::bail!("drive.device cannot be empty");
    }

    for target in &config.targets {
        match target.scheme.as_str() {
            "" | "file" => {}
            "ssh" => {
                if target.host.as_deref().unwrap_or("").is_empty() {
                    anyhow::bail!("Target '{}' uses ssh but has no host", target);
                }
            }
            other => anyhow::bail!("Target '{}' has unsupported scheme '{}'", target, other),
        }
        if target.path.as_os_str().is_empty() {
            anyhow::bail!("Target with scheme '{}' has an empty path", target.scheme);
        }
    }

    if config.targets.is_empty() {
        tracing::warn!("No ingest targets configured; ripped files will stay in the rip directory");
    }

    Ok(())
}
