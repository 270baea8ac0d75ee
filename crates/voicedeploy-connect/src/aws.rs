use async_trait::async_trait;
use aws_sdk_connect::error::DisplayErrorContext;
use aws_sdk_connect::Client;
use tracing::debug;

use crate::api::{ApiError, ConnectApi, InstanceSummary, SecurityProfilePage, SecurityProfileSummary};

/// [`ConnectApi`] backed by `aws-sdk-connect`.
#[derive(Debug, Clone)]
pub struct AwsConnectApi {
    client: Client,
}

impl AwsConnectApi {
    pub fn new(config: &aws_config::SdkConfig) -> Self {
        Self {
            client: Client::new(config),
        }
    }
}

fn api_error<E: std::error::Error>(err: E) -> ApiError {
    ApiError(DisplayErrorContext(err).to_string())
}

#[async_trait]
impl ConnectApi for AwsConnectApi {
    async fn describe_instance(&self, instance_id: &str) -> Result<InstanceSummary, ApiError> {
        debug!(instance_id, "DescribeInstance");
        let output = self
            .client
            .describe_instance()
            .instance_id(instance_id)
            .send()
            .await
            .map_err(api_error)?;

        let instance = output.instance();
        Ok(InstanceSummary {
            id: instance
                .and_then(|i| i.id())
                .unwrap_or(instance_id)
                .to_string(),
            arn: instance.and_then(|i| i.arn()).map(str::to_string),
        })
    }

    async fn list_security_profiles(
        &self,
        instance_id: &str,
        next_token: Option<String>,
    ) -> Result<SecurityProfilePage, ApiError> {
        debug!(instance_id, has_token = next_token.is_some(), "ListSecurityProfiles");
        let output = self
            .client
            .list_security_profiles()
            .instance_id(instance_id)
            .set_next_token(next_token)
            .send()
            .await
            .map_err(api_error)?;

        let profiles = output
            .security_profile_summary_list()
            .iter()
            .filter_map(|summary| {
                Some(SecurityProfileSummary {
                    id: summary.id()?.to_string(),
                    arn: summary.arn()?.to_string(),
                    name: summary.name()?.to_string(),
                })
            })
            .collect();

        Ok(SecurityProfilePage {
            profiles,
            next_token: output.next_token().map(str::to_string),
        })
    }

    async fn update_security_profile(
        &self,
        instance_id: &str,
        profile_id: &str,
        permissions: &[String],
    ) -> Result<(), ApiError> {
        debug!(instance_id, profile_id, count = permissions.len(), "UpdateSecurityProfile");
        self.client
            .update_security_profile()
            .instance_id(instance_id)
            .security_profile_id(profile_id)
            .set_permissions(Some(permissions.to_vec()))
            .send()
            .await
            .map_err(api_error)?;
        Ok(())
    }
}
