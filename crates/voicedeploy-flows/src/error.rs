use std::path::PathBuf;

use thiserror::Error;
use voicedeploy_store::StoreError;

#[derive(Error, Debug)]
pub enum FlowError {
    #[error("Template not found: {}", .0.display())]
    TemplateMissing(PathBuf),

    #[error("Template {} is not valid JSON: {source}", path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Message bundle {} has no '{region}' entry and no 'us' fallback", path.display())]
    MissingBundle { path: PathBuf, region: String },

    #[error("Failed to read language list: {0}")]
    Languages(#[from] csv::Error),

    #[error("Unknown language: {0}")]
    UnknownLanguage(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl FlowError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            FlowError::TemplateMissing(path)
        } else {
            FlowError::Io { path, source }
        }
    }
}
