//! Shared DTOs (schemas-as-code) for the stylepack workspace.
//!
//! # Design constraints
//! - These types are serialized to disk and travel between machines inside packages.
//! - Be conservative with breaking changes.
//! - Prefer adding optional fields over changing semantics.

pub mod apply;
pub mod diff;
pub mod item;
pub mod manifest;
pub mod os;
pub mod plan;
pub mod value;

pub use item::{RawObservation, ScanResult, ScannedItem};
pub use os::OsBuild;
pub use value::{Category, ChangeType, ConfigValue};

/// Schema identifiers.
pub mod schema {
    pub const STYLEPACK_SCAN_V1: &str = "stylepack.scan.v1";
    pub const STYLEPACK_MANIFEST_V1: &str = "stylepack.manifest.v1";
    pub const STYLEPACK_PLAN_V1: &str = "stylepack.plan.v1";
    pub const STYLEPACK_APPLY_V1: &str = "stylepack.apply.v1";
    pub const STYLEPACK_BASELINE_V1: &str = "stylepack.baseline.v1";
}
