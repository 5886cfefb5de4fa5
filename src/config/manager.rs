//! Configuration Manager

use super::Config;
use crate::Result;
use anyhow::{Context, bail};
use std::net::SocketAddr;
use std::path::Path;

/// Manages configuration loading and validation
pub struct ConfigManager;

impl ConfigManager {
    /// Load configuration from file
    pub fn load_from_file(path: &Path) -> Result<Config> {
        if path.exists() {
            tracing::info!("Loading configuration from: {}", path.display());
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;

            let config: Config = toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

            config.validate()
                .with_context(|| "Configuration validation failed")?;

            tracing::info!("Configuration loaded and validated successfully");
            Ok(config)
        } else {
            tracing::warn!("Configuration file not found at {}, using defaults", path.display());
            let config = Config::default();
            config.validate()?;
            Ok(config)
        }
    }

    /// Load configuration from environment variables
    pub fn load_from_env() -> Result<Config> {
        let mut config = Config::default();

        // Override with environment variables if present
        if let Ok(bind_addr) = std::env::var("PACKETHUB_BIND_ADDR") {
            config.server.bind_addr = bind_addr.parse::<SocketAddr>()
                .with_context(|| format!("Invalid PACKETHUB_BIND_ADDR: {}", bind_addr))?;
        }

        if let Ok(backlog) = std::env::var("PACKETHUB_BACKLOG") {
            config.server.backlog = backlog.parse::<u32>()
                .with_context(|| format!("Invalid PACKETHUB_BACKLOG: {}", backlog))?;
        }

        if let Ok(buffer_size) = std::env::var("PACKETHUB_RECV_BUFFER_SIZE") {
            config.server.recv_buffer_size = buffer_size.parse::<usize>()
                .with_context(|| format!("Invalid PACKETHUB_RECV_BUFFER_SIZE: {}", buffer_size))?;
        }

        config.validate()?;
        Ok(config)
    }
}

impl Config {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.server.backlog == 0 {
            bail!("backlog must be greater than 0");
        }

        if self.server.backlog > 4096 {
            bail!("backlog cannot exceed 4096");
        }

        if self.server.recv_buffer_size == 0 {
            bail!("recv_buffer_size must be greater than 0");
        }

        if self.server.recv_buffer_size > 1048576 {
            bail!("recv_buffer_size cannot exceed 1MB");
        }

        Ok(())
    }
}
