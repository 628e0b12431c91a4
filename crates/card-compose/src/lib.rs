//! Record-to-image composition: templates, field value resolution and rendering

pub mod dataset;
pub mod http;
pub mod options;
pub mod render;
pub mod resolve;
pub mod sources;
pub mod storage;
pub mod text;
pub mod types;

pub use dataset::{CsvDirectory, Dataset, DatasetProvider, load_from_csv, parse_csv};
pub use http::{FetchError, HttpFetch, NoFetch, ReqwestFetcher};
pub use options::{ComposeOptions, FieldOrder};
pub use render::{Composer, PreparedTemplate};
pub use resolve::{FieldValue, ResolvedValue, classify, looks_like_image, resolve, resolve_field};
pub use sources::{ImageSources, ResolveError};
pub use storage::{DirStore, MemoryStore, ObjectStore, StoreError};
pub use text::FontBook;
pub use types::*;
