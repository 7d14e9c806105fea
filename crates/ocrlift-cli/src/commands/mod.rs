//! Subcommands and the pieces they share.

pub mod config;
pub mod extract;
pub mod process;

use std::path::{Path, PathBuf};

use clap::Args;
use tracing::debug;

use ocrlift_core::extract::patterns::{DEFAULT_ANCHOR, DEFAULT_WINDOW};
use ocrlift_core::{ExtractionRule, OcrliftConfig};

/// Extraction rule overrides accepted by `process` and `extract`.
#[derive(Args, Debug, Default)]
pub struct RuleArgs {
    /// Find the date/time following this anchor keyword
    #[arg(long)]
    anchor: Option<String>,

    /// Characters to look ahead of the anchor for a date/time
    #[arg(long)]
    window: Option<usize>,

    /// Take the rest of the line following this label
    #[arg(long, conflicts_with_all = ["anchor", "window"])]
    label: Option<String>,
}

impl RuleArgs {
    /// The rule to use: an override from the command line, or the configured one.
    pub fn resolve(&self, config: &OcrliftConfig) -> ExtractionRule {
        if let Some(label) = &self.label {
            return ExtractionRule::labeled_field(label.clone());
        }
        if self.anchor.is_some() || self.window.is_some() {
            return ExtractionRule::anchored_date(
                self.anchor.clone().unwrap_or_else(|| DEFAULT_ANCHOR.to_string()),
                self.window.unwrap_or(DEFAULT_WINDOW),
            );
        }
        config.extraction.rule.clone()
    }
}

pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ocrlift")
        .join("config.json")
}

/// Where the config lives: the `--config` path, or the per-user default.
pub fn config_path(explicit: Option<&str>) -> PathBuf {
    explicit.map(PathBuf::from).unwrap_or_else(default_config_path)
}

/// Load and validate configuration. An explicit path must exist; the default
/// path falls back to built-in defaults when absent.
pub fn load_config(explicit: Option<&str>) -> anyhow::Result<OcrliftConfig> {
    let config = match explicit {
        Some(path) => OcrliftConfig::from_file(Path::new(path))
            .map_err(|e| anyhow::anyhow!("Failed to read config {}: {}", path, e))?,
        None => {
            let path = default_config_path();
            if path.exists() {
                debug!("Using config at {}", path.display());
                OcrliftConfig::from_file(&path)?
            } else {
                OcrliftConfig::default()
            }
        }
    };

    config.validate()?;
    Ok(config)
}
