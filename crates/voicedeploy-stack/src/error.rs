use std::path::PathBuf;

use thiserror::Error;
use voicedeploy_store::StoreError;

#[derive(Error, Debug)]
pub enum StackError {
    #[error("{tool} is not installed or not on PATH. {hint}")]
    ToolMissing { tool: String, hint: String },

    #[error("Failed to launch {tool}: {source}")]
    SpawnFailed {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read stack status: {0}")]
    Status(String),

    #[error("Failed to write stack template {}: {source}", path.display())]
    TemplateWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}
