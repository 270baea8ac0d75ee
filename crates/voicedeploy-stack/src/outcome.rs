use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::Operation;

/// The final outcome of a stack operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StackOutcome {
    /// The stack reached its target state
    Succeeded {
        operation: Operation,
        stack_name: String,
        final_status: Option<String>,
        polls: usize,
        total_duration_secs: f64,
    },
    /// CloudFormation reported a failure status
    Failed {
        operation: Operation,
        stack_name: String,
        final_status: Option<String>,
        polls: usize,
        total_duration_secs: f64,
    },
    /// The configured deadline passed first
    TimedOut {
        operation: Operation,
        stack_name: String,
        last_status: Option<String>,
        polls: usize,
        total_duration_secs: f64,
    },
    /// User requested stop (e.g., Ctrl+C)
    Interrupted {
        operation: Operation,
        stack_name: String,
        last_status: Option<String>,
        polls: usize,
        total_duration_secs: f64,
    },
}

impl StackOutcome {
    pub fn succeeded(
        operation: Operation,
        stack_name: &str,
        final_status: Option<String>,
        polls: usize,
        duration: Duration,
    ) -> Self {
        Self::Succeeded {
            operation,
            stack_name: stack_name.to_string(),
            final_status,
            polls,
            total_duration_secs: duration.as_secs_f64(),
        }
    }

    pub fn failed(
        operation: Operation,
        stack_name: &str,
        final_status: Option<String>,
        polls: usize,
        duration: Duration,
    ) -> Self {
        Self::Failed {
            operation,
            stack_name: stack_name.to_string(),
            final_status,
            polls,
            total_duration_secs: duration.as_secs_f64(),
        }
    }

    pub fn timed_out(
        operation: Operation,
        stack_name: &str,
        last_status: Option<String>,
        polls: usize,
        duration: Duration,
    ) -> Self {
        Self::TimedOut {
            operation,
            stack_name: stack_name.to_string(),
            last_status,
            polls,
            total_duration_secs: duration.as_secs_f64(),
        }
    }

    pub fn interrupted(
        operation: Operation,
        stack_name: &str,
        last_status: Option<String>,
        polls: usize,
        duration: Duration,
    ) -> Self {
        Self::Interrupted {
            operation,
            stack_name: stack_name.to_string(),
            last_status,
            polls,
            total_duration_secs: duration.as_secs_f64(),
        }
    }

    pub fn operation(&self) -> Operation {
        match self {
            Self::Succeeded { operation, .. }
            | Self::Failed { operation, .. }
            | Self::TimedOut { operation, .. }
            | Self::Interrupted { operation, .. } => *operation,
        }
    }

    pub fn stack_name(&self) -> &str {
        match self {
            Self::Succeeded { stack_name, .. }
            | Self::Failed { stack_name, .. }
            | Self::TimedOut { stack_name, .. }
            | Self::Interrupted { stack_name, .. } => stack_name,
        }
    }

    pub fn polls(&self) -> usize {
        match self {
            Self::Succeeded { polls, .. }
            | Self::Failed { polls, .. }
            | Self::TimedOut { polls, .. }
            | Self::Interrupted { polls, .. } => *polls,
        }
    }

    pub fn duration_secs(&self) -> f64 {
        match self {
            Self::Succeeded {
                total_duration_secs,
                ..
            }
            | Self::Failed {
                total_duration_secs,
                ..
            }
            | Self::TimedOut {
                total_duration_secs,
                ..
            }
            | Self::Interrupted {
                total_duration_secs,
                ..
            } => *total_duration_secs,
        }
    }

    /// Last status CloudFormation reported, if the stack was ever listed.
    pub fn status(&self) -> Option<&str> {
        match self {
            Self::Succeeded { final_status, .. } | Self::Failed { final_status, .. } => {
                final_status.as_deref()
            }
            Self::TimedOut { last_status, .. } | Self::Interrupted { last_status, .. } => {
                last_status.as_deref()
            }
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }

    /// Short label for logs and the web form
    pub fn label(&self) -> &'static str {
        match self {
            Self::Succeeded { .. } => "succeeded",
            Self::Failed { .. } => "failed",
            Self::TimedOut { .. } => "timed_out",
            Self::Interrupted { .. } => "interrupted",
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Succeeded { .. } => 0,
            Self::Failed { .. } => 1,
            Self::TimedOut { .. } => 2,
            Self::Interrupted { .. } => 130,
        }
    }
}
