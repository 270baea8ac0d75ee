//! # voicedeploy-connect
//!
//! Resolves the Amazon Connect instance and its "Agent" security profile,
//! caching both in the working directory.
//!
//! The Connect control plane is reached through the [`ConnectApi`] trait.
//! [`AwsConnectApi`] implements it with `aws-sdk-connect`; tests substitute
//! an in-memory fake.

mod api;
mod aws;
mod error;
mod lookup;

pub use api::{ApiError, ConnectApi, InstanceSummary, SecurityProfilePage, SecurityProfileSummary};
pub use aws::AwsConnectApi;
pub use error::LookupError;
pub use lookup::{
    instance_id_from_identifier, PermissionUpdate, RemoteLookup, AGENT_PERMISSIONS,
    AGENT_PROFILE_NAME,
};
