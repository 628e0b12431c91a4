use anyhow::{Context, Result};
use card_compose::ComposeOptions;
use card_impose::{CmykOptions, LayoutOptions};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Settings file for all commands; command-line flags override it
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolConfig {
    pub compose: ComposeOptions,
    pub layout: LayoutOptions,
    pub cmyk: CmykOptions,
    /// Concurrent record renders; all cores when unset
    pub workers: Option<usize>,
}

impl ToolConfig {
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        Ok(config)
    }

    /// The file's settings, or defaults when no file was given
    pub async fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path).await,
            None => Ok(Self::default()),
        }
    }
}
