use async_trait::async_trait;
use aws_sdk_cloudformation::error::DisplayErrorContext;
use aws_sdk_cloudformation::Client;
use tracing::trace;

use crate::StackError;

/// Where the driver reads stack statuses from
#[async_trait]
pub trait StackStatusSource: Send + Sync {
    /// Current status of the named stack, or `None` while it is not listed.
    async fn stack_status(&self, stack_name: &str) -> Result<Option<String>, StackError>;
}

/// Reads statuses by listing the account's stacks with `DescribeStacks`.
/// A stack not yet created, or already deleted, reads as `None`.
#[derive(Debug, Clone)]
pub struct CloudFormationStatus {
    client: Client,
}

impl CloudFormationStatus {
    pub fn new(config: &aws_config::SdkConfig) -> Self {
        Self {
            client: Client::new(config),
        }
    }
}

#[async_trait]
impl StackStatusSource for CloudFormationStatus {
    async fn stack_status(&self, stack_name: &str) -> Result<Option<String>, StackError> {
        let mut next_token: Option<String> = None;
        loop {
            let output = self
                .client
                .describe_stacks()
                .set_next_token(next_token)
                .send()
                .await
                .map_err(|e| StackError::Status(DisplayErrorContext(e).to_string()))?;

            let found = output
                .stacks()
                .iter()
                .find(|stack| stack.stack_name() == Some(stack_name));

            if let Some(stack) = found {
                let status = stack.stack_status().map(|s| s.as_str().to_string());
                trace!(stack_name, status = ?status, "Stack listed");
                return Ok(status);
            }

            match output.next_token() {
                Some(token) if !token.is_empty() => next_token = Some(token.to_string()),
                _ => return Ok(None),
            }
        }
    }
}
