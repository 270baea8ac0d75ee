use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::process::Command;
use voicedeploy_store::DeployParameters;

use crate::{LaunchedProcess, ProcessSpawner, StackError};

/// What the tool is asked to do with the stack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Deploy,
    Destroy,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operation::Deploy => write!(f, "deploy"),
            Operation::Destroy => write!(f, "destroy"),
        }
    }
}

/// Supported IaC tools
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ToolKind {
    Cdk,
    #[default]
    CloudFormation,
}

impl std::fmt::Display for ToolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ToolKind::Cdk => write!(f, "cdk"),
            ToolKind::CloudFormation => write!(f, "cloudformation"),
        }
    }
}

impl std::str::FromStr for ToolKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cdk" | "aws-cdk" => Ok(ToolKind::Cdk),
            "cloudformation" | "cfn" | "aws" => Ok(ToolKind::CloudFormation),
            _ => Err(format!("Unknown tool: {}", s)),
        }
    }
}

/// How to run the tool for one tenant
#[derive(Debug, Clone)]
pub struct ToolConfig {
    /// Working directory holding the generated documents
    pub working_dir: PathBuf,
    pub stack_name: String,
    /// Template handed to tools that deploy a prepared template
    pub template_file: PathBuf,
    /// Environment for the child process only
    pub env_vars: Vec<(String, String)>,
}

impl ToolConfig {
    pub fn new(working_dir: impl Into<PathBuf>, params: &DeployParameters) -> Self {
        let working_dir = working_dir.into();
        Self {
            template_file: working_dir.join(crate::TEMPLATE_FILE),
            working_dir,
            stack_name: params.stack_name.clone(),
            env_vars: params.to_env(),
        }
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env_vars.push((key.into(), value.into()));
        self
    }

    pub fn with_template_file(mut self, path: PathBuf) -> Self {
        self.template_file = path;
        self
    }
}

/// An external infrastructure-as-code CLI
#[async_trait]
pub trait InfraTool: Send + Sync {
    /// Human-readable name (e.g., "AWS CDK")
    fn name(&self) -> &str;

    fn kind(&self) -> ToolKind;

    fn binary_path(&self) -> &Path;

    /// How to install the tool when it is missing
    fn install_hint(&self) -> &str;

    /// Whether `deploy` reads the synthesized CloudFormation template
    fn needs_template(&self) -> bool;

    /// Command-line arguments for an operation
    fn args(&self, operation: Operation, config: &ToolConfig) -> Vec<String>;

    /// Check if the tool CLI is available on the system
    async fn is_available(&self) -> bool {
        Command::new(self.binary_path())
            .arg("--version")
            .output()
            .await
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    /// Start the tool without waiting for it
    async fn launch(
        &self,
        operation: Operation,
        config: &ToolConfig,
    ) -> Result<LaunchedProcess, StackError> {
        if !self.is_available().await {
            return Err(StackError::ToolMissing {
                tool: self.name().to_string(),
                hint: self.install_hint().to_string(),
            });
        }
        let args = self.args(operation, config);
        ProcessSpawner::launch(self.name(), self.binary_path(), &args, config)
    }
}
