use crate::types::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Order in which fields are layered onto the base image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldOrder {
    /// Ascending `z_index`; equal values keep declaration order
    #[default]
    ZIndex,
    /// Exactly as listed in the template
    Declaration,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComposeOptions {
    pub field_order: FieldOrder,
    /// First path segment of internal storage references (`/<prefix>/<bucket>/<id>`)
    pub files_prefix: String,
    /// Directory relative image paths are resolved against
    pub base_dir: PathBuf,
    pub font_dirs: Vec<PathBuf>,
    pub font_files: Vec<PathBuf>,
    pub http_timeout_secs: u64,
}

impl Default for ComposeOptions {
    fn default() -> Self {
        Self {
            field_order: FieldOrder::ZIndex,
            files_prefix: crate::sources::DEFAULT_FILES_PREFIX.to_string(),
            base_dir: PathBuf::from("."),
            font_dirs: Vec::new(),
            font_files: Vec::new(),
            http_timeout_secs: 30,
        }
    }
}

impl ComposeOptions {
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = tokio::fs::read_to_string(path).await?;
        Ok(serde_json::from_str(&contents)?)
    }

    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_uses_defaults() {
        let options: ComposeOptions =
            serde_json::from_str(r#"{ "field_order": "declaration" }"#).unwrap();
        assert_eq!(options.field_order, FieldOrder::Declaration);
        assert_eq!(options.files_prefix, "files");
        assert_eq!(options.http_timeout_secs, 30);
    }

    #[tokio::test]
    async fn test_save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("compose.json");
        let options = ComposeOptions {
            font_dirs: vec![PathBuf::from("/opt/fonts")],
            ..ComposeOptions::default()
        };
        options.save(&path).await.unwrap();
        assert_eq!(ComposeOptions::load(&path).await.unwrap(), options);
    }
}
