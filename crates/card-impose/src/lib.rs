pub mod cmyk;
mod compose;
pub mod constants;
mod io;
pub mod layout;
pub mod marks;
mod options;
pub mod render;
mod stats;
mod types;

pub use cmyk::{
    CapabilityCache, CmykColor, CmykConversionResult, CmykConverter, CmykError, ColorSpaceReport,
    probe_converter, validate,
};
pub use compose::{PageOptions, blank_document, compose_pages, impose_cards};
pub use io::{document_to_bytes, load_pdf, save_pdf};
pub use layout::{LayoutPlan, ensure_usable, plan_for_paper, plan_layout};
pub use options::*;
pub use stats::calculate_statistics;
pub use types::*;
