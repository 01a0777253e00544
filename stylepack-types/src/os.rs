use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Numeric OS build identifier (e.g. `22631`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OsBuild(pub u32);

impl OsBuild {
    pub fn number(&self) -> u32 {
        self.0
    }

    pub fn distance(&self, other: OsBuild) -> u32 {
        self.0.abs_diff(other.0)
    }
}

impl fmt::Display for OsBuild {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid OS build '{0}'")]
pub struct InvalidOsBuild(pub String);

/// Accepts a bare build number (`22631`) or a dotted version whose last
/// component is the build (`10.0.22631`).
impl FromStr for OsBuild {
    type Err = InvalidOsBuild;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let last = s.trim().rsplit('.').next().unwrap_or_default();
        last.parse::<u32>()
            .map(OsBuild)
            .map_err(|_| InvalidOsBuild(s.to_string()))
    }
}
