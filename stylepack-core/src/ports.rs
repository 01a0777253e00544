//! Port traits for I/O abstraction.

use camino::Utf8Path;
use stylepack_baseline::BaselineStore;

/// Abstraction over loading the baseline store.
pub trait BaselineSource {
    fn load_store(&self) -> anyhow::Result<BaselineStore>;
}

/// Abstraction over writing artifacts to disk.
pub trait WritePort {
    fn write_file(&self, path: &Utf8Path, contents: &[u8]) -> anyhow::Result<()>;
    fn create_dir_all(&self, path: &Utf8Path) -> anyhow::Result<()>;
}
