use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::{InfraTool, Operation, ToolConfig, ToolKind};

/// AWS CDK. The CDK app in the working directory reads the generated
/// documents and the parameter environment itself.
pub struct CdkTool {
    binary_path: PathBuf,
}

impl CdkTool {
    pub fn new() -> Self {
        Self {
            binary_path: PathBuf::from("cdk"),
        }
    }

    pub fn with_binary_path(path: PathBuf) -> Self {
        Self { binary_path: path }
    }
}

impl Default for CdkTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl InfraTool for CdkTool {
    fn name(&self) -> &str {
        "AWS CDK"
    }

    fn kind(&self) -> ToolKind {
        ToolKind::Cdk
    }

    fn binary_path(&self) -> &Path {
        &self.binary_path
    }

    fn install_hint(&self) -> &str {
        "Install it with: npm install -g aws-cdk"
    }

    fn needs_template(&self) -> bool {
        false
    }

    fn args(&self, operation: Operation, _config: &ToolConfig) -> Vec<String> {
        let args: &[&str] = match operation {
            Operation::Deploy => &["deploy", "--require-approval", "never"],
            Operation::Destroy => &["destroy", "--force"],
        };
        args.iter().map(|a| a.to_string()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use voicedeploy_store::DeployParameters;

    #[test]
    fn test_cdk_args() {
        let tool = CdkTool::new();
        let config = ToolConfig::new("/work", &DeployParameters::for_destroy("Acme", "Acme"));

        assert_eq!(
            tool.args(Operation::Deploy, &config),
            vec!["deploy", "--require-approval", "never"]
        );
        assert_eq!(tool.args(Operation::Destroy, &config), vec!["destroy", "--force"]);
    }

    #[tokio::test]
    async fn test_missing_binary_is_unavailable() {
        let tool = CdkTool::with_binary_path(PathBuf::from("/nonexistent/cdk-binary"));
        assert!(!tool.is_available().await);
    }
}
