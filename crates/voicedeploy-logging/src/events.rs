use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Structured events of a deploy or destroy run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LogEvent {
    OperationStarted {
        operation: String,
        tenant_name: String,
        stack_name: String,
        working_dir: PathBuf,
    },
    InstanceVerified {
        id: String,
        arn: String,
    },
    ProfileResolved {
        name: String,
        arn: String,
    },
    PermissionsUpdated {
        count: usize,
    },
    PermissionsDegraded {
        reason: String,
    },
    FlowsPrepared {
        template: String,
        screen_pop: bool,
        survey: bool,
    },
    FlowResolved {
        name: String,
        path: PathBuf,
    },
    TemplateSynthesized {
        path: PathBuf,
        resources: usize,
    },
    ToolLaunched {
        tool: String,
        command: String,
    },
    ToolExited {
        exit_code: Option<i32>,
    },
    StackStatus {
        stack_name: String,
        status: Option<String>,
        poll: usize,
        elapsed_secs: f64,
    },
    OperationCompleted {
        operation: String,
        stack_name: String,
        outcome: String,
        duration_secs: f64,
    },
    FilesRemoved {
        count: usize,
    },
    ErrorEncountered {
        error: String,
    },
}

impl LogEvent {
    /// Add a timestamp to serialize with the event
    fn with_timestamp(&self) -> serde_json::Value {
        let mut value = serde_json::to_value(self).unwrap_or_default();
        if let Some(obj) = value.as_object_mut() {
            obj.insert(
                "timestamp".to_string(),
                serde_json::Value::String(chrono::Utc::now().to_rfc3339()),
            );
        }
        value
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable format with colors and visual structure
    #[default]
    Pretty,
    /// JSON lines format for machine consumption
    Json,
    /// Compact single-line format
    Compact,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            "compact" => Ok(LogFormat::Compact),
            _ => Err(format!("Unknown log format: {}", s)),
        }
    }
}

/// Events a capturing logger keeps; older ones are dropped first.
pub const HISTORY_LIMIT: usize = 500;

/// Logger for deployment events - console output, file logging, and an
/// optional in-memory history for the web form.
pub struct Logger {
    format: LogFormat,
    quiet: bool,
    file_writer: Option<Mutex<File>>,
    history: Option<Mutex<VecDeque<LogEvent>>>,
    history_limit: usize,
}

impl Logger {
    pub fn new(format: LogFormat) -> Self {
        Self {
            format,
            quiet: false,
            file_writer: None,
            history: None,
            history_limit: HISTORY_LIMIT,
        }
    }

    /// Create a logger with file output in addition to console
    pub fn with_file(format: LogFormat, log_path: &Path) -> std::io::Result<Self> {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)?;

        Ok(Self {
            file_writer: Some(Mutex::new(file)),
            ..Self::new(format)
        })
    }

    /// Create a logger that records the last [`HISTORY_LIMIT`] events
    /// without printing them.
    pub fn capturing() -> Self {
        Self::capturing_with_limit(HISTORY_LIMIT)
    }

    pub fn capturing_with_limit(limit: usize) -> Self {
        Self {
            quiet: true,
            history: Some(Mutex::new(VecDeque::new())),
            history_limit: limit.max(1),
            ..Self::new(LogFormat::Json)
        }
    }

    /// Events recorded so far by a capturing logger.
    pub fn history(&self) -> Vec<LogEvent> {
        self.history
            .as_ref()
            .and_then(|h| h.lock().ok().map(|events| events.iter().cloned().collect()))
            .unwrap_or_default()
    }

    pub fn log(&self, event: &LogEvent) {
        // Log to file if configured (always JSON format for file)
        if let Some(ref writer) = self.file_writer {
            if let Ok(mut file) = writer.lock() {
                let json = event.with_timestamp();
                let _ = writeln!(file, "{}", json);
            }
        }

        if let Some(ref history) = self.history {
            if let Ok(mut events) = history.lock() {
                if events.len() >= self.history_limit {
                    events.pop_front();
                }
                events.push_back(event.clone());
            }
        }

        if self.quiet {
            return;
        }

        match self.format {
            LogFormat::Json => self.log_json(event),
            LogFormat::Pretty => self.log_pretty(event),
            LogFormat::Compact => self.log_compact(event),
        }
    }

    fn log_json(&self, event: &LogEvent) {
        if let Ok(json) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{}", json);
        }
    }

    fn log_pretty(&self, event: &LogEvent) {
        let mut stderr = std::io::stderr();
        match event {
            LogEvent::OperationStarted {
                operation,
                tenant_name,
                stack_name,
                working_dir,
            } => {
                let _ = writeln!(stderr);
                let _ = writeln!(
                    stderr,
                    "{}",
                    "╭─────────────────────────────────────────────────────────────────────╮"
                        .bright_blue()
                );
                let _ = writeln!(
                    stderr,
                    "{}  {} {}",
                    "│".bright_blue(),
                    "voicedeploy".bold().bright_white(),
                    operation.bright_white()
                );
                let _ = writeln!(
                    stderr,
                    "{}  {} {}",
                    "│".bright_blue(),
                    "Tenant:".dimmed(),
                    Self::truncate(tenant_name, 58).dimmed()
                );
                let _ = writeln!(
                    stderr,
                    "{}  {} {}",
                    "│".bright_blue(),
                    "Stack:".dimmed(),
                    Self::truncate(stack_name, 59).dimmed()
                );
                let _ = writeln!(
                    stderr,
                    "{}  {} {}",
                    "│".bright_blue(),
                    "Dir:".dimmed(),
                    Self::truncate(&working_dir.display().to_string(), 61).dimmed()
                );
                let _ = writeln!(
                    stderr,
                    "{}",
                    "╰─────────────────────────────────────────────────────────────────────╯"
                        .bright_blue()
                );
                let _ = writeln!(stderr);
            }
            LogEvent::InstanceVerified { id, arn } => {
                let _ = writeln!(stderr, "  {} Instance verified: {}", "✓".bright_green(), id);
                let _ = writeln!(stderr, "    {}", arn.dimmed());
            }
            LogEvent::ProfileResolved { name, arn } => {
                let _ = writeln!(
                    stderr,
                    "  {} Security profile '{}' found",
                    "✓".bright_green(),
                    name
                );
                let _ = writeln!(stderr, "    {}", arn.dimmed());
            }
            LogEvent::PermissionsUpdated { count } => {
                let _ = writeln!(
                    stderr,
                    "  {} Agent profile permissions updated ({})",
                    "✓".bright_green(),
                    count
                );
            }
            LogEvent::PermissionsDegraded { reason } => {
                let _ = writeln!(
                    stderr,
                    "  {} Could not update agent profile permissions: {}",
                    "⚠".bright_yellow(),
                    reason.bright_yellow()
                );
            }
            LogEvent::FlowsPrepared {
                template,
                screen_pop,
                survey,
            } => {
                let _ = writeln!(
                    stderr,
                    "  {} Contact flows prepared: {} (screen pop: {}, survey: {})",
                    "✓".bright_green(),
                    template,
                    on_off(*screen_pop),
                    on_off(*survey)
                );
            }
            LogEvent::FlowResolved { name, path } => {
                let _ = writeln!(
                    stderr,
                    "    {} {} {}",
                    "→".bright_cyan(),
                    name,
                    path.display().to_string().dimmed()
                );
            }
            LogEvent::TemplateSynthesized { path, resources } => {
                let _ = writeln!(
                    stderr,
                    "  {} Stack template written ({} resources): {}",
                    "✓".bright_green(),
                    resources,
                    path.display().to_string().dimmed()
                );
            }
            LogEvent::ToolLaunched { tool, command } => {
                let _ = writeln!(stderr);
                let _ = writeln!(
                    stderr,
                    "  {} {} {}",
                    "▶".bright_cyan(),
                    tool.bright_cyan().bold(),
                    command.dimmed()
                );
            }
            LogEvent::ToolExited { exit_code } => {
                let code = exit_code
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "signal".to_string());
                let _ = writeln!(stderr, "    {} tool exited ({})", "│".dimmed(), code);
            }
            LogEvent::StackStatus {
                status,
                elapsed_secs,
                ..
            } => {
                let status = status.as_deref().unwrap_or("NOT_LISTED");
                let _ = writeln!(
                    stderr,
                    "    {} {} ({:.0}s)",
                    "│".dimmed(),
                    status.bright_white(),
                    elapsed_secs
                );
            }
            LogEvent::OperationCompleted { .. } => {
                // Printed by the front-end together with the exit status
            }
            LogEvent::FilesRemoved { count } => {
                let _ = writeln!(stderr, "  {} Removed {} generated file(s)", "✓".bright_green(), count);
            }
            LogEvent::ErrorEncountered { error } => {
                let _ = writeln!(stderr);
                let _ = writeln!(stderr, "{} {}", "✗".bright_red(), error.bright_red());
            }
        }
    }

    fn log_compact(&self, event: &LogEvent) {
        let mut stderr = std::io::stderr();
        let timestamp = chrono::Utc::now().format("%H:%M:%S");
        let msg = match event {
            LogEvent::OperationStarted {
                operation,
                stack_name,
                ..
            } => format!("[{}] {}:start {}", timestamp, operation, stack_name),
            LogEvent::InstanceVerified { id, .. } => format!("[{}] instance:ok {}", timestamp, id),
            LogEvent::ProfileResolved { name, .. } => format!("[{}] profile:ok {}", timestamp, name),
            LogEvent::PermissionsUpdated { count } => {
                format!("[{}] permissions:ok {}", timestamp, count)
            }
            LogEvent::PermissionsDegraded { reason } => {
                format!("[{}] permissions:degraded {}", timestamp, reason)
            }
            LogEvent::FlowsPrepared { template, .. } => {
                format!("[{}] flows:prepared {}", timestamp, template)
            }
            LogEvent::FlowResolved { name, .. } => format!("[{}] flow:resolved {}", timestamp, name),
            LogEvent::TemplateSynthesized { resources, .. } => {
                format!("[{}] template:written {}r", timestamp, resources)
            }
            LogEvent::ToolLaunched { tool, .. } => format!("[{}] tool:start {}", timestamp, tool),
            LogEvent::ToolExited { exit_code } => format!(
                "[{}] tool:exit {}",
                timestamp,
                exit_code.map(|c| c.to_string()).unwrap_or_default()
            ),
            LogEvent::StackStatus {
                status,
                poll,
                elapsed_secs,
                ..
            } => format!(
                "[{}] poll:{} {} {:.0}s",
                timestamp,
                poll,
                status.as_deref().unwrap_or("-"),
                elapsed_secs
            ),
            LogEvent::OperationCompleted {
                operation,
                outcome,
                duration_secs,
                ..
            } => format!(
                "[{}] {}:done {} {:.1}s",
                timestamp, operation, outcome, duration_secs
            ),
            LogEvent::FilesRemoved { count } => format!("[{}] clean:{}", timestamp, count),
            LogEvent::ErrorEncountered { error } => format!("[{}] error:{}", timestamp, error),
        };
        let _ = writeln!(stderr, "{}", msg);
    }

    fn truncate(s: &str, max_chars: usize) -> String {
        if s.chars().count() > max_chars {
            let kept: String = s.chars().take(max_chars.saturating_sub(3)).collect();
            format!("{}...", kept)
        } else {
            s.to_string()
        }
    }
}

fn on_off(value: bool) -> &'static str {
    if value {
        "on"
    } else {
        "off"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_from_str() {
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("compact".parse::<LogFormat>().unwrap(), LogFormat::Compact);
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_event_tagging() {
        let event = LogEvent::StackStatus {
            stack_name: "Acme".to_string(),
            status: Some("CREATE_IN_PROGRESS".to_string()),
            poll: 2,
            elapsed_secs: 10.0,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "stack_status");
        assert_eq!(json["status"], "CREATE_IN_PROGRESS");
    }

    #[test]
    fn test_truncate_is_char_safe() {
        assert_eq!(Logger::truncate("客服中心客服中心", 5), "客服...");
        assert_eq!(Logger::truncate("Acme", 10), "Acme");
    }

    #[test]
    fn test_capturing_logger_keeps_history() {
        let logger = Logger::capturing();
        logger.log(&LogEvent::FilesRemoved { count: 3 });
        logger.log(&LogEvent::ToolExited { exit_code: Some(0) });

        let history = logger.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0], LogEvent::FilesRemoved { count: 3 });
    }

    #[test]
    fn test_capturing_logger_drops_oldest_past_limit() {
        let logger = Logger::capturing_with_limit(3);
        for count in 0..5 {
            logger.log(&LogEvent::FilesRemoved { count });
        }

        let counts: Vec<usize> = logger
            .history()
            .iter()
            .map(|e| match e {
                LogEvent::FilesRemoved { count } => *count,
                _ => usize::MAX,
            })
            .collect();
        assert_eq!(counts, vec![2, 3, 4]);
    }

    #[test]
    fn test_default_capture_is_bounded() {
        let logger = Logger::capturing();
        for count in 0..HISTORY_LIMIT + 20 {
            logger.log(&LogEvent::FilesRemoved { count });
        }
        let history = logger.history();
        assert_eq!(history.len(), HISTORY_LIMIT);
        assert_eq!(history[0], LogEvent::FilesRemoved { count: 20 });
    }
}
