use camino::Utf8PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("io error at {path}: {source}")]
    Io {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("serialize {what}: {source}")]
    Serialize {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("destination {0} has no parent directory")]
    InvalidDestination(Utf8PathBuf),
}

impl ExportError {
    pub(crate) fn io(path: impl Into<Utf8PathBuf>, source: std::io::Error) -> Self {
        ExportError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Errors that make a whole package unusable.
#[derive(Debug, Error)]
pub enum PackageError {
    #[error("io error at {path}: {source}")]
    Io {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("package is corrupt: {reason}")]
    Corrupt { reason: String },
}

impl PackageError {
    pub(crate) fn corrupt(reason: impl Into<String>) -> Self {
        PackageError::Corrupt {
            reason: reason.into(),
        }
    }
}
