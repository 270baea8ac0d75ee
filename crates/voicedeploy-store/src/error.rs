use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Required file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("{document} is missing required field '{field}'")]
    MissingField {
        document: &'static str,
        field: &'static str,
    },

    #[error("Failed to parse {}: {source}", path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{} does not contain a JSON object", .0.display())]
    NotAnObject(PathBuf),

    #[error("Failed to serialize document: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid agent roster: {0}")]
    InvalidRoster(String),

    #[error("Failed to read agent roster: {0}")]
    Csv(#[from] csv::Error),
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            StoreError::NotFound(path)
        } else {
            StoreError::Io { path, source }
        }
    }

    /// True when the error means "the file is not there".
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}
