//! Ghostscript-based RGB to CMYK conversion

use super::{CapabilityCache, CmykError, ColorSpaceReport, validate};
use crate::constants::STDERR_TAIL_BYTES;
use crate::options::{CmykOptions, ConversionQuality};
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tempfile::NamedTempFile;
use tokio::process::Command;

/// Outcome of a conversion attempt
#[derive(Debug, Clone, PartialEq)]
pub struct CmykConversionResult {
    /// Converted document, or the untouched input when no converter exists
    pub buffer: Vec<u8>,
    pub fully_converted: bool,
    pub original_size: usize,
    pub converted_size: usize,
    pub validation: ColorSpaceReport,
}

impl CmykConversionResult {
    /// The input passed through unchanged
    pub fn unconverted(buffer: Vec<u8>) -> Self {
        let size = buffer.len();
        Self {
            buffer,
            fully_converted: false,
            original_size: size,
            converted_size: size,
            validation: ColorSpaceReport::default(),
        }
    }
}

pub struct CmykConverter {
    options: CmykOptions,
    capability: CapabilityCache,
}

impl CmykConverter {
    pub fn new(options: CmykOptions) -> Self {
        Self {
            options,
            capability: CapabilityCache::new(),
        }
    }

    pub fn options(&self) -> &CmykOptions {
        &self.options
    }

    /// Whether the converter binary can be run (cached after the first probe)
    pub async fn is_available(&self) -> bool {
        self.capability.is_available(&self.options.binary).await
    }

    /// Drop the cached probe result, e.g. after installing Ghostscript
    pub fn invalidate(&self) {
        self.capability.invalidate();
    }

    /// Convert an RGB document to CMYK
    ///
    /// Without a converter the input comes back unchanged with
    /// `fully_converted == false`. Failures of an available converter are
    /// errors. Scratch files are removed on every path, including when the
    /// returned future is dropped.
    pub async fn convert(&self, input: Vec<u8>) -> Result<CmykConversionResult, CmykError> {
        if !self.is_available().await {
            log::info!(
                "Converter {} not available; keeping the document in RGB",
                self.options.binary
            );
            return Ok(CmykConversionResult::unconverted(input));
        }

        let original_size = input.len();
        let converted = self.run_converter(&input).await?;

        let (converted, validation) = tokio::task::spawn_blocking(move || {
            let validation = validate(&converted);
            (converted, validation)
        })
        .await?;

        let validation = validation.unwrap_or_else(|e| {
            log::warn!("Could not inspect converted document: {}", e);
            ColorSpaceReport::default()
        });
        if validation.has_rgb {
            log::warn!("Converted document still contains RGB content");
        }

        log::info!(
            "Converted to CMYK: {} -> {} bytes (cmyk={}, rgb={})",
            original_size,
            converted.len(),
            validation.is_cmyk,
            validation.has_rgb
        );

        Ok(CmykConversionResult {
            converted_size: converted.len(),
            buffer: converted,
            fully_converted: validation.fully_cmyk(),
            original_size,
            validation,
        })
    }

    async fn run_converter(&self, input: &[u8]) -> Result<Vec<u8>, CmykError> {
        let input_file = self.scratch_file("cardt-rgb-")?;
        let output_file = self.scratch_file("cardt-cmyk-")?;
        tokio::fs::write(input_file.path(), input).await?;

        let binary = &self.options.binary;
        let mut command = Command::new(binary);
        command
            .args(ghostscript_args(
                input_file.path(),
                output_file.path(),
                self.options.quality,
            ))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        log::debug!("Running {} for CMYK conversion", binary);
        let child = command.spawn().map_err(|source| CmykError::Spawn {
            binary: binary.clone(),
            source,
        })?;

        let timeout = Duration::from_secs(self.options.timeout_secs);
        let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(output) => output?,
            Err(_) => {
                log::warn!("{} exceeded {}s, killed", binary, self.options.timeout_secs);
                return Err(CmykError::Timeout(self.options.timeout_secs));
            }
        };

        if !output.status.success() {
            return Err(CmykError::Failed {
                code: output.status.code(),
                stderr: stderr_tail(&output.stderr),
            });
        }

        let converted = tokio::fs::read(output_file.path()).await?;
        if converted.is_empty() {
            return Err(CmykError::EmptyOutput);
        }
        Ok(converted)
    }

    fn scratch_file(&self, prefix: &str) -> Result<NamedTempFile, CmykError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(prefix).suffix(".pdf");
        let file = match &self.options.temp_dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        Ok(file)
    }
}

/// Command line for a pdfwrite pass that converts all color to DeviceCMYK
pub fn ghostscript_args(input: &Path, output: &Path, quality: ConversionQuality) -> Vec<String> {
    let dpi = quality.dpi();
    vec![
        "-dSAFER".to_string(),
        "-dBATCH".to_string(),
        "-dNOPAUSE".to_string(),
        "-dQUIET".to_string(),
        "-sDEVICE=pdfwrite".to_string(),
        format!("-dPDFSETTINGS={}", quality.pdf_settings()),
        "-sColorConversionStrategy=CMYK".to_string(),
        "-sColorConversionStrategyForImages=CMYK".to_string(),
        "-dProcessColorModel=/DeviceCMYK".to_string(),
        format!("-dColorImageResolution={}", dpi),
        format!("-dGrayImageResolution={}", dpi),
        format!("-dMonoImageResolution={}", dpi),
        format!("-sOutputFile={}", output.display()),
        input.display().to_string(),
    ]
}

fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let text = text.trim();
    if text.len() <= STDERR_TAIL_BYTES {
        return text.to_string();
    }
    let mut start = text.len() - STDERR_TAIL_BYTES;
    while !text.is_char_boundary(start) {
        start += 1;
    }
    text[start..].to_string()
}
