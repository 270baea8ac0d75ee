use async_trait::async_trait;
use thiserror::Error;

/// A failed Connect control-plane call, with the service's message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct ApiError(pub String);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceSummary {
    pub id: String,
    pub arn: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityProfileSummary {
    pub id: String,
    pub arn: String,
    pub name: String,
}

/// One page of `ListSecurityProfiles`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SecurityProfilePage {
    pub profiles: Vec<SecurityProfileSummary>,
    pub next_token: Option<String>,
}

/// The Connect operations a deployment needs.
#[async_trait]
pub trait ConnectApi: Send + Sync {
    async fn describe_instance(&self, instance_id: &str) -> Result<InstanceSummary, ApiError>;

    async fn list_security_profiles(
        &self,
        instance_id: &str,
        next_token: Option<String>,
    ) -> Result<SecurityProfilePage, ApiError>;

    /// Replace the permission set of a security profile.
    async fn update_security_profile(
        &self,
        instance_id: &str,
        profile_id: &str,
        permissions: &[String],
    ) -> Result<(), ApiError>;
}
