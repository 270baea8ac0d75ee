//! Terminal output shared by the interactive commands.

use colored::Colorize;
use std::fmt;

use voicedeploy_stack::{Operation, StackOutcome};

/// Raised when the user declines a confirmation prompt.
#[derive(Debug)]
pub struct Cancelled;

impl fmt::Display for Cancelled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cancelled")
    }
}

impl std::error::Error for Cancelled {}

pub fn banner() {
    eprintln!();
    eprintln!(
        "{}",
        "Amazon Connect Voice Channel Deployment".bold().bright_cyan()
    );
}

pub fn header(step: usize, title: &str) {
    eprintln!();
    eprintln!("{}", "=".repeat(60).dimmed());
    eprintln!("  {} {}", format!("Step {}:", step).bold(), title.bold());
    eprintln!("{}", "=".repeat(60).dimmed());
}

pub fn summary(label: &str, value: impl fmt::Display) {
    eprintln!("  {} {}: {}", "✓".bright_green(), label, value);
}

pub fn note(text: impl fmt::Display) {
    eprintln!("  {} {}", "ℹ".bright_blue(), text);
}

pub fn warning(text: impl fmt::Display) {
    eprintln!("  {} {}", "⚠".bright_yellow(), text);
}

/// First `max` characters of `text`, with an ellipsis when cut.
pub fn preview(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let cut: String = text.chars().take(max).collect();
    format!("{}...", cut)
}

pub fn enabled(flag: bool) -> &'static str {
    if flag {
        "enabled"
    } else {
        "disabled"
    }
}

pub fn print_outcome(outcome: &StackOutcome) {
    let action = match outcome.operation() {
        Operation::Deploy => "DEPLOY",
        Operation::Destroy => "DESTROY",
    };
    let status = outcome.status().unwrap_or("not listed");

    eprintln!();
    match outcome {
        StackOutcome::Succeeded { .. } => {
            eprintln!("{}", format!("=== {} COMPLETE ===", action).bright_green().bold());
        }
        StackOutcome::Failed { .. } => {
            eprintln!("{}", format!("=== {} FAILED ===", action).bright_red().bold());
        }
        StackOutcome::TimedOut { .. } => {
            eprintln!("{}", format!("=== {} TIMED OUT ===", action).bright_yellow().bold());
        }
        StackOutcome::Interrupted { .. } => {
            eprintln!("{}", "=== INTERRUPTED ===".bright_yellow().bold());
        }
    }
    eprintln!("Stack: {}", outcome.stack_name());
    eprintln!("Status: {}", status);
    eprintln!("Polls: {}", outcome.polls());
    eprintln!("Duration: {:.1}s", outcome.duration_secs());

    match outcome {
        StackOutcome::Failed { .. } => {
            eprintln!("Check the stack events in the CloudFormation console for details.");
        }
        StackOutcome::TimedOut { .. } => {
            eprintln!("The stack is still changing. Follow it in the CloudFormation console.");
        }
        StackOutcome::Interrupted { .. } => {
            eprintln!("Stopped watching. The tool keeps running until it finishes on its own.");
        }
        StackOutcome::Succeeded { .. } => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_cuts_on_characters() {
        assert_eq!(preview("short", 10), "short");
        assert_eq!(preview("abcdefghij", 4), "abcd...");
        assert_eq!(preview("感谢您的来电", 2), "感谢...");
    }
}
