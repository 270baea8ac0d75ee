//! # voicedeploy-stack
//!
//! Runs the infrastructure-as-code tool that creates or removes a tenant's
//! stack, then watches CloudFormation until the stack settles.
//!
//! ## Key Types
//!
//! - [`InfraTool`] - An external IaC CLI ([`CdkTool`], [`CloudFormationTool`])
//! - [`StackDriver`] - `submit` / `poll` / `wait` over a launched tool
//! - [`StackStatusSource`] - Where stack statuses come from ([`CloudFormationStatus`])
//! - [`StackOutcome`] - Terminal result with its process exit code
//! - [`StackTemplate`] - CloudFormation template synthesized from the working directory

mod cdk;
mod cloudformation;
mod driver;
mod error;
mod outcome;
mod spawner;
mod status;
mod template;
mod tool;

pub use cdk::CdkTool;
pub use cloudformation::CloudFormationTool;
pub use driver::{classify, Classification, PollResult, PollSettings, StackDriver, StackHandle};
pub use error::StackError;
pub use outcome::StackOutcome;
pub use spawner::{LaunchedProcess, ProcessSpawner};
pub use status::{CloudFormationStatus, StackStatusSource};
pub use template::{StackInputs, StackTemplate, INLINE_TEMPLATE_LIMIT, TEMPLATE_FILE};
pub use tool::{InfraTool, Operation, ToolConfig, ToolKind};

/// Create a tool by kind
pub fn create_tool(kind: ToolKind) -> Box<dyn InfraTool> {
    match kind {
        ToolKind::Cdk => Box::new(CdkTool::new()),
        ToolKind::CloudFormation => Box::new(CloudFormationTool::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_tool_matches_kind() {
        for kind in [ToolKind::Cdk, ToolKind::CloudFormation] {
            assert_eq!(create_tool(kind).kind(), kind);
        }
        assert!(create_tool(ToolKind::CloudFormation).needs_template());
        assert!(!create_tool(ToolKind::Cdk).needs_template());
    }
}
