use crate::constants::{
    DEFAULT_CONVERSION_TIMEOUT_SECS, DEFAULT_CONVERTER_BINARY, DEFAULT_MARGIN_PT,
};
use crate::layout::{LayoutPlan, plan_layout};
use crate::types::*;
use std::path::PathBuf;

/// Page setup for batch output
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct LayoutOptions {
    pub paper: PaperSize,
    pub orientation: Orientation,
    /// Margin on every page edge, in points
    pub margin_pt: f32,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            paper: PaperSize::A4,
            orientation: Orientation::Portrait,
            margin_pt: DEFAULT_MARGIN_PT,
        }
    }
}

impl LayoutOptions {
    /// Page width and height in points
    pub fn page_size_pt(&self) -> (f32, f32) {
        self.paper.dimensions_pt(self.orientation)
    }

    /// Plan cards of the given aspect ratio onto this page setup
    pub fn plan(&self, aspect_ratio: f32) -> LayoutPlan {
        let (width, height) = self.page_size_pt();
        plan_layout(aspect_ratio, width, height, self.margin_pt)
    }

    pub fn validate(&self) -> Result<()> {
        let (width, height) = self.page_size_pt();
        if !(width > 0.0 && height > 0.0) {
            return Err(ImposeError::Config(format!(
                "Paper size must be positive, got {}x{}pt",
                width, height
            )));
        }
        if self.margin_pt < 0.0 || 2.0 * self.margin_pt >= width.min(height) {
            return Err(ImposeError::Config(format!(
                "Margin {}pt leaves no usable area on a {}x{}pt page",
                self.margin_pt, width, height
            )));
        }
        Ok(())
    }

    /// Load options from JSON file
    #[cfg(feature = "serde")]
    pub async fn load(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let options = serde_json::from_slice(&bytes)
            .map_err(|e| ImposeError::Config(format!("Failed to parse config: {}", e)))?;
        Ok(options)
    }

    /// Save options to JSON file
    #[cfg(feature = "serde")]
    pub async fn save(&self, path: impl AsRef<std::path::Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| ImposeError::Config(format!("Failed to serialize config: {}", e)))?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }
}

/// Output resolution tier for converted images
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ConversionQuality {
    #[default]
    High,
    Medium,
    Low,
}

impl ConversionQuality {
    pub fn dpi(self) -> u32 {
        match self {
            ConversionQuality::High => 300,
            ConversionQuality::Medium => 150,
            ConversionQuality::Low => 72,
        }
    }

    /// Ghostscript distiller preset matching the tier
    pub fn pdf_settings(self) -> &'static str {
        match self {
            ConversionQuality::High => "/prepress",
            ConversionQuality::Medium => "/printer",
            ConversionQuality::Low => "/screen",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CmykOptions {
    /// Ghostscript executable, looked up on PATH unless absolute
    pub binary: String,
    pub quality: ConversionQuality,
    pub timeout_secs: u64,
    /// Where scratch files go; the system temp dir when unset
    pub temp_dir: Option<PathBuf>,
}

impl Default for CmykOptions {
    fn default() -> Self {
        Self {
            binary: DEFAULT_CONVERTER_BINARY.to_string(),
            quality: ConversionQuality::High,
            timeout_secs: DEFAULT_CONVERSION_TIMEOUT_SECS,
            temp_dir: None,
        }
    }
}

impl CmykOptions {
    pub fn validate(&self) -> Result<()> {
        if self.binary.trim().is_empty() {
            return Err(ImposeError::Config("Converter binary is empty".to_string()));
        }
        if self.timeout_secs == 0 {
            return Err(ImposeError::Config(
                "Conversion timeout must be at least one second".to_string(),
            ));
        }
        Ok(())
    }

    #[cfg(feature = "serde")]
    pub async fn load(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let options = serde_json::from_slice(&bytes)
            .map_err(|e| ImposeError::Config(format!("Failed to parse config: {}", e)))?;
        Ok(options)
    }
}
