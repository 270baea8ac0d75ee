use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::{InfraTool, Operation, ToolConfig, ToolKind};

/// The AWS CLI's `cloudformation` commands, deploying the template that
/// voicedeploy synthesizes into the working directory.
pub struct CloudFormationTool {
    binary_path: PathBuf,
}

impl CloudFormationTool {
    pub fn new() -> Self {
        Self {
            binary_path: PathBuf::from("aws"),
        }
    }

    pub fn with_binary_path(path: PathBuf) -> Self {
        Self { binary_path: path }
    }
}

impl Default for CloudFormationTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl InfraTool for CloudFormationTool {
    fn name(&self) -> &str {
        "AWS CLI"
    }

    fn kind(&self) -> ToolKind {
        ToolKind::CloudFormation
    }

    fn binary_path(&self) -> &Path {
        &self.binary_path
    }

    fn install_hint(&self) -> &str {
        "See https://docs.aws.amazon.com/cli/latest/userguide/getting-started-install.html"
    }

    fn needs_template(&self) -> bool {
        true
    }

    fn args(&self, operation: Operation, config: &ToolConfig) -> Vec<String> {
        match operation {
            Operation::Deploy => vec![
                "cloudformation".to_string(),
                "deploy".to_string(),
                "--template-file".to_string(),
                config.template_file.display().to_string(),
                "--stack-name".to_string(),
                config.stack_name.clone(),
                "--no-fail-on-empty-changeset".to_string(),
            ],
            Operation::Destroy => vec![
                "cloudformation".to_string(),
                "delete-stack".to_string(),
                "--stack-name".to_string(),
                config.stack_name.clone(),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use voicedeploy_store::DeployParameters;

    #[test]
    fn test_cloudformation_args() {
        let tool = CloudFormationTool::new();
        let config = ToolConfig::new("/work", &DeployParameters::for_destroy("Acme", "Acme"));

        let deploy = tool.args(Operation::Deploy, &config);
        assert_eq!(&deploy[..2], &["cloudformation", "deploy"]);
        assert!(deploy.contains(&"/work/connect_stack.template.json".to_string()));
        assert!(deploy.windows(2).any(|w| w[0] == "--stack-name" && w[1] == "Acme"));

        assert_eq!(
            tool.args(Operation::Destroy, &config),
            vec!["cloudformation", "delete-stack", "--stack-name", "Acme"]
        );
    }

    #[tokio::test]
    async fn test_missing_binary_is_unavailable() {
        let tool = CloudFormationTool::with_binary_path(PathBuf::from("/nonexistent/aws-cli"));
        assert!(!tool.is_available().await);
    }
}
