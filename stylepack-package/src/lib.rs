//! Package export and reading.
//!
//! A package is a gzip-compressed tar archive (or an unpacked directory with
//! the same layout):
//!
//! ```text
//! manifest.json
//! scan.json
//! assets/<category>/<basename-or-hash>.<ext>
//! ```
//!
//! Readers index entries by name and never depend on archive order.

mod error;
mod export;
mod reader;

pub use error::{ExportError, PackageError};
pub use export::{ExportOptions, export, sanitize_basename};
pub use reader::Package;
