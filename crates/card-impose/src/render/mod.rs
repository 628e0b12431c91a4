//! PDF rendering for card sheets
//!
//! - Cards become image XObjects
//! - Pages collect placement commands and marks

mod page;
mod xobject;

pub use page::*;
pub use xobject::*;
