//! Configuration file support for deduplication jobs

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sqldedup_core::DedupMode;
use sqldedup_formats::RecordSchema;
use std::path::Path;

/// A complete job: what to read, what to do, where to write
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConfig {
    pub input: InputConfig,
    pub dedup: DedupConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<OutputConfig>,
}

impl JobConfig {
    /// Load configuration from a file (YAML or TOML)
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let extension = path.extension().and_then(|s| s.to_str()).unwrap_or("");

        let config: Self = match extension {
            "yaml" | "yml" => serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse YAML config: {}", path.display()))?,
            "toml" => toml::from_str(&content)
                .with_context(|| format!("Failed to parse TOML config: {}", path.display()))?,
            _ => {
                return Err(anyhow::anyhow!(
                    "Unsupported config file format: {}. Use .yaml, .yml, or .toml",
                    extension
                ))
            }
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject settings that contradict each other
    pub fn validate(&self) -> Result<()> {
        if let Some(ref output) = self.output {
            if output.path.is_some() && output.in_place {
                anyhow::bail!("output.path and output.in_place are mutually exclusive");
            }
        }
        Ok(())
    }

    /// Save configuration to a file
    #[allow(dead_code)]
    pub fn save(&self, path: &Path) -> Result<()> {
        let extension = path.extension().and_then(|s| s.to_str()).unwrap_or("");

        let content = match extension {
            "yaml" | "yml" => serde_yaml::to_string(self)?,
            "toml" => toml::to_string_pretty(self)?,
            _ => {
                return Err(anyhow::anyhow!(
                    "Unsupported config file format: {}. Use .yaml, .yml, or .toml",
                    extension
                ))
            }
        };

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }
}

/// Input configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    pub path: String,
    #[serde(default)]
    pub schema: RecordSchema,
    /// Email-domain markers a record line must contain (empty = any)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub domains: Vec<String>,
}

/// What the job does
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Report,
    Remove,
    Audit,
}

/// Deduplication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DedupConfig {
    pub action: Action,
    /// Keys deciding a duplicate (removal only)
    #[serde(default)]
    pub by: DedupMode,
    /// Compare trimmed, lower-cased keys
    #[serde(default)]
    pub normalize: bool,
}

/// Output configuration (removal only)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Overwrite the input instead of writing a new file
    #[serde(default)]
    pub in_place: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub removed_log: Option<String>,
    #[serde(default)]
    pub dry_run: bool,
}
