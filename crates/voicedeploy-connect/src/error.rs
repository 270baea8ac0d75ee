use thiserror::Error;
use voicedeploy_store::StoreError;

#[derive(Error, Debug)]
pub enum LookupError {
    #[error("Invalid Connect instance identifier: {0}")]
    InvalidIdentifier(String),

    #[error("Failed to look up Connect instance '{identifier}': {reason}")]
    LookupFailed { identifier: String, reason: String },

    #[error("Security profile '{name}' not found in instance {instance_id}")]
    ProfileNotFound { instance_id: String, name: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}
