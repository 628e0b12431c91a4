use card_compose::{ComposeError, StoreError};
use card_impose::{BatchStatistics, ColorSpaceReport, ImposeError, LayoutOptions, LayoutPlan};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum JobError {
    #[error(transparent)]
    Compose(#[from] ComposeError),
    #[error(transparent)]
    Impose(ImposeError),
    #[error("Layout has no room for cards: {0}")]
    LayoutDegenerate(String),
    #[error("Job cancelled")]
    Cancelled,
    #[error("Task join error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
}

impl From<ImposeError> for JobError {
    fn from(e: ImposeError) -> Self {
        match e {
            ImposeError::LayoutDegenerate(msg) => JobError::LayoutDegenerate(msg),
            other => JobError::Impose(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, JobError>;

/// Color model of the delivered document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorMode {
    #[default]
    Rgb,
    Cmyk,
}

#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Records rendered concurrently
    pub workers: usize,
    /// Requested color model; CMYK falls back to RGB when conversion fails
    pub color_mode: ColorMode,
    pub layout: LayoutOptions,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            workers: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
            color_mode: ColorMode::Rgb,
            layout: LayoutOptions::default(),
        }
    }
}

/// A finished batch document
#[derive(Debug, Clone)]
pub struct BatchOutput {
    pub document: Vec<u8>,
    /// Color model actually delivered
    pub color_mode: ColorMode,
    /// Converted and validated as CMYK only, with no RGB left
    pub fully_converted: bool,
    /// Why a requested CMYK conversion fell back to RGB
    pub conversion_error: Option<String>,
    pub validation: ColorSpaceReport,
    pub plan: LayoutPlan,
    pub stats: BatchStatistics,
}

/// Updates sent from a running job to its caller
#[derive(Debug, Clone, PartialEq)]
pub enum JobUpdate {
    Progress {
        operation: String,
        current: usize,
        total: usize,
    },
    ConversionFallback {
        reason: String,
    },
    Complete {
        pages: usize,
        color_mode: ColorMode,
        fully_converted: bool,
    },
}
