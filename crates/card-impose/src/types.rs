use crate::constants::mm_to_pt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImposeError {
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("Task join error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
    #[error("No cards to impose")]
    NoCards,
    #[error("Layout has no room for cards: {0}")]
    LayoutDegenerate(String),
}

pub type Result<T> = std::result::Result<T, ImposeError>;

/// Paper orientation
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Orientation {
    #[default]
    Portrait,
    Landscape,
}

/// Standard paper sizes
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PaperSize {
    A3,
    #[default]
    A4,
    A5,
    Letter,
    Legal,
    Tabloid,
    Custom { width_mm: f32, height_mm: f32 },
}

impl PaperSize {
    /// Base dimensions, portrait
    pub fn dimensions_mm(self) -> (f32, f32) {
        match self {
            PaperSize::A3 => (297.0, 420.0),
            PaperSize::A4 => (210.0, 297.0),
            PaperSize::A5 => (148.0, 210.0),
            PaperSize::Letter => (215.9, 279.4),
            PaperSize::Legal => (215.9, 355.6),
            PaperSize::Tabloid => (279.4, 431.8),
            PaperSize::Custom {
                width_mm,
                height_mm,
            } => (width_mm, height_mm),
        }
    }

    /// Page size in points with orientation applied
    pub fn dimensions_pt(self, orientation: Orientation) -> (f32, f32) {
        let (w, h) = self.dimensions_mm();
        let (w, h) = (mm_to_pt(w), mm_to_pt(h));
        match orientation {
            Orientation::Portrait => (w, h),
            Orientation::Landscape => (h, w),
        }
    }
}

/// Summary of a batch imposition
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BatchStatistics {
    pub cards: usize,
    pub pages: usize,
    pub cards_per_page: usize,
    /// Unused cells on the final page
    pub empty_cells_last_page: usize,
}
