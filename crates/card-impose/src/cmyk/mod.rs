//! CMYK conversion for print output
//!
//! Conversion shells out to Ghostscript. When the converter is missing the
//! document passes through unchanged and is reported as not converted.

mod convert;
mod palette;
mod probe;
mod validate;

pub use convert::*;
pub use palette::*;
pub use probe::*;
pub use validate::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CmykError {
    #[error("Failed to start converter {binary}: {source}")]
    Spawn {
        binary: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Conversion timed out after {0}s")]
    Timeout(u64),
    #[error("Converter exited with {code:?}: {stderr}")]
    Failed { code: Option<i32>, stderr: String },
    #[error("Converter produced no output")]
    EmptyOutput,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),
    #[error("Task join error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}
