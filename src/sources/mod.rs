//! Formula and source-code sources.
//!
//! Sources are responsible for finding formula files, downloading and
//! verifying upstream archives, unpacking them and applying patches.

pub mod extract;
pub mod fetch;
pub mod patch;
pub mod registry;

pub use extract::extract_archive;
pub use fetch::{Downloader, FetchError};
pub use patch::apply_patches;
pub use registry::{FormulaRegistry, FormulaSource};
