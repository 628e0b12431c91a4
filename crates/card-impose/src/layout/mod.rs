//! Layout calculation for card imposition
//!
//! - Card size search (how many cards fit a page)
//! - Grid geometry (gaps, cell rectangles, card-to-cell assignment)
//! - Card placement inside a cell (aspect-preserving fit and centering)

mod grid;
mod placement;
mod plan;
mod types;

pub use grid::*;
pub use placement::*;
pub use plan::*;
pub use types::*;
