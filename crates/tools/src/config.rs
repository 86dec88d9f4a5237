//! Configuration management for bitlink tools

use anyhow::{Context, Result};
use bitlink_channel::noisy::{entropy_rng, seeded_rng, ChannelConfig};
use bitlink_frame::link::LinkAlgorithm;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::pipeline::LinkPipeline;
use crate::transport::TcpTransport;
use crate::LinkError;

/// Link configuration shared by the sender and the listener
///
/// Every field has a default, so a config file only needs the values it
/// changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    pub algorithm: LinkAlgorithm,
    /// Per-bit flip probability of the simulated channel
    pub error_rate: f64,
    /// Channel seed; fresh entropy when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    pub host: String,
    pub port: u16,
    pub timeout_ms: u64,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            algorithm: LinkAlgorithm::Crc32,
            error_rate: 0.01,
            seed: None,
            host: "127.0.0.1".to_string(),
            port: 8888,
            timeout_ms: 5000,
        }
    }
}

impl LinkConfig {
    /// Load configuration from TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let config: Self = toml::from_str(&content).context("Failed to parse config file")?;

        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {:?}", path))?;

        Ok(())
    }

    /// Reject values no pipeline or transport can run with
    pub fn validate(&self) -> crate::Result<()> {
        self.channel_config()?;
        if self.port == 0 {
            return Err(LinkError::Config {
                msg: "port must be non-zero".to_string(),
            });
        }
        if self.timeout_ms == 0 {
            return Err(LinkError::Config {
                msg: "timeout_ms must be non-zero".to_string(),
            });
        }
        if self.host.trim().is_empty() {
            return Err(LinkError::Config {
                msg: "host must not be empty".to_string(),
            });
        }
        Ok(())
    }

    pub fn channel_config(&self) -> crate::Result<ChannelConfig> {
        Ok(ChannelConfig::new(self.error_rate)?)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Pipeline for the configured algorithm and channel
    pub fn pipeline(&self) -> crate::Result<LinkPipeline> {
        Ok(LinkPipeline::new(self.algorithm, self.channel_config()?))
    }

    pub fn transport(&self) -> TcpTransport {
        TcpTransport::new(&self.host, self.port).with_timeout(self.timeout())
    }

    /// Channel random source, reproducible when a seed is configured
    pub fn rng(&self) -> ChaCha8Rng {
        match self.seed {
            Some(seed) => seeded_rng(seed),
            None => entropy_rng(),
        }
    }
}
