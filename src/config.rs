//! Bridge configuration.
//!
//! Loaded from an explicit path, .streambridge.yml, or
//! ~/.config/streambridge/streambridge.yml, falling back to defaults.

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tokio::runtime::Handle;

use crate::context::{ContextRef, SerialQueue};

/// Which execution context adapters deliver on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextKind {
    /// Inline on the caller's turn
    #[default]
    Immediate,
    /// FIFO queue drained by one task on a tokio runtime
    Serial,
}

/// Configuration for a [`crate::bridge::Bridge`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct BridgeConfig {
    /// Delivery context for forwarded events.
    pub context: ContextKind,

    /// Label of the serial queue, used in logs.
    pub queue_label: String,

    /// Settings for commands built from actions.
    pub command: CommandConfig,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            context: ContextKind::Immediate,
            queue_label: "streambridge".to_string(),
            command: CommandConfig::default(),
        }
    }
}

/// Settings for commands built from actions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CommandConfig {
    /// Accept executions while one is already in flight.
    pub allows_concurrent_execution: bool,
}

impl BridgeConfig {
    /// Load configuration with fallback chain.
    ///
    /// Search order:
    /// 1. Explicit path if provided
    /// 2. .streambridge.yml in current directory
    /// 3. ~/.config/streambridge/streambridge.yml
    /// 4. Defaults
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        let project_config = PathBuf::from(".streambridge.yml");
        if project_config.exists() {
            match Self::load_from_file(&project_config) {
                Ok(config) => {
                    tracing::info!("Loaded config from .streambridge.yml");
                    return Ok(config);
                }
                Err(e) => {
                    tracing::warn!("Failed to load .streambridge.yml: {}", e);
                }
            }
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("streambridge").join("streambridge.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {}", user_config.display());
                        return Ok(config);
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        tracing::debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Parse configuration from YAML text.
    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(content).context("Failed to parse config file")?;
        config.validate()?;
        Ok(config)
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;
        Self::from_yaml(&content)
    }

    pub fn validate(&self) -> Result<()> {
        if self.context == ContextKind::Serial && self.queue_label.trim().is_empty() {
            eyre::bail!("queue-label must not be empty for a serial context");
        }
        Ok(())
    }

    /// Build the configured context.
    ///
    /// A serial queue is spawned on `handle`, or on the current runtime when
    /// none is given.
    pub fn build_context(&self, handle: Option<&Handle>) -> crate::error::Result<ContextRef> {
        match self.context {
            ContextKind::Immediate => Ok(ContextRef::immediate()),
            ContextKind::Serial => {
                let queue = match handle {
                    Some(handle) => SerialQueue::spawn(self.queue_label.clone(), handle),
                    None => SerialQueue::spawn_current(self.queue_label.clone())?,
                };
                Ok(ContextRef::new(queue))
            }
        }
    }
}
