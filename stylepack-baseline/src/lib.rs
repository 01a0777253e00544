//! Baseline store.
//!
//! A baseline records the stock value of every known key for one OS build.
//! Baseline files are loaded tolerantly: a file that fails to parse is
//! reported and skipped, and the remaining files still form a usable store.

mod load;
mod store;

pub use load::{BaselineLoadError, LoadedBaseline, load_baselines, parse_baseline};
pub use store::{Baseline, BaselineStore, Correction, Resolution};
