//! Common utilities and configuration for tools

use anyhow::{Context, Result};
use clap::Parser;
use serde::{de::DeserializeOwned, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, Level};

/// Global configuration options
#[derive(Debug, Clone, Default, Parser)]
pub struct GlobalConfig {
    /// Configuration file path (TOML, or JSON with a .json extension)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log pipeline outcomes
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log per-frame detail (syndromes, residuals, flipped bits)
    #[arg(long, global = true)]
    pub debug: bool,
}

impl GlobalConfig {
    /// Most verbose level the subscriber lets through
    pub fn log_level(&self) -> Level {
        if self.debug {
            Level::DEBUG
        } else if self.verbose {
            Level::INFO
        } else {
            Level::WARN
        }
    }
}

/// Progress reporter for long-running operations
pub struct ProgressReporter {
    label: String,
    total: usize,
    current: usize,
    last_percent: u8,
}

impl ProgressReporter {
    /// Create a new progress reporter
    pub fn new(label: impl Into<String>, total: usize) -> Self {
        Self {
            label: label.into(),
            total,
            current: 0,
            last_percent: 0,
        }
    }

    /// Update progress, logging every tenth of the way
    pub fn update(&mut self, current: usize) {
        self.current = current.min(self.total);

        if self.total > 0 {
            let percent = ((self.current * 100) / self.total) as u8;
            if percent != self.last_percent && percent % 10 == 0 {
                info!("{}: {}%", self.label, percent);
                self.last_percent = percent;
            }
        }
    }

    /// Advance by one step
    pub fn advance(&mut self) {
        self.update(self.current + 1);
    }

    pub fn current(&self) -> usize {
        self.current
    }

    /// Mark as complete
    pub fn complete(&mut self) {
        self.current = self.total;
        info!("{}: complete {}/{}", self.label, self.current, self.total);
    }
}

/// Install the global `tracing` subscriber
pub fn init_logging(config: &GlobalConfig) -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(config.log_level())
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to install log subscriber: {}", e))?;
    Ok(())
}

fn is_json(path: &Path) -> bool {
    path.extension().and_then(|ext| ext.to_str()) == Some("json")
}

/// Load configuration from file
pub fn load_config<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    if is_json(path) {
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse JSON config: {:?}", path))
    } else {
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config: {:?}", path))
    }
}

/// Save configuration to file
pub fn save_config<T: Serialize>(config: &T, path: &Path) -> Result<()> {
    let content = if is_json(path) {
        serde_json::to_string_pretty(config)?
    } else {
        toml::to_string_pretty(config)?
    };

    std::fs::write(path, content)
        .with_context(|| format!("Failed to write config file: {:?}", path))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_from_flags() {
        let mut config = GlobalConfig::default();
        assert_eq!(config.log_level(), Level::WARN);
        config.verbose = true;
        assert_eq!(config.log_level(), Level::INFO);
        config.debug = true;
        assert_eq!(config.log_level(), Level::DEBUG);
    }

    #[test]
    fn test_global_flags_parse() {
        let config = GlobalConfig::try_parse_from(["bitlink", "--debug", "--config", "link.toml"]).unwrap();
        assert!(config.debug);
        assert!(!config.verbose);
        assert_eq!(config.config, Some(PathBuf::from("link.toml")));
    }

    #[test]
    fn test_progress_reporter() {
        let mut reporter = ProgressReporter::new("trials", 4);
        reporter.advance();
        reporter.advance();
        assert_eq!(reporter.current(), 2);
        reporter.update(10);
        assert_eq!(reporter.current(), 4);
        reporter.complete();
        assert_eq!(reporter.current(), 4);
    }
}
