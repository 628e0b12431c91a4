//! Job orchestration for card previews and print batches

mod batch;
mod deliver;
mod types;

pub use batch::{CardRuntime, plan_for_template};
pub use deliver::{PDF_CONTENT_TYPE, PNG_CONTENT_TYPE, deliver_batch, deliver_preview};
pub use types::*;

// Re-export types from library crates
pub use card_compose::{DataRecord, RenderedCard, Template};
pub use card_impose::{BatchStatistics, CmykOptions, LayoutOptions, LayoutPlan};
pub use tokio_util::sync::CancellationToken;
