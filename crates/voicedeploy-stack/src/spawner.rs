use std::path::Path;
use std::process::Stdio;
use tokio::process::{Child, Command};
use tracing::debug;

use crate::{StackError, ToolConfig};

/// A running IaC tool process
pub struct LaunchedProcess {
    child: Child,
    command: String,
    exit_code: Option<Option<i32>>,
}

impl LaunchedProcess {
    /// The command line, for display
    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    /// `Some(code)` once the process has exited (`code` is `None` when it was
    /// killed by a signal), `None` while it is still running.
    pub fn try_exit(&mut self) -> Option<Option<i32>> {
        if self.exit_code.is_none() {
            if let Ok(Some(status)) = self.child.try_wait() {
                self.exit_code = Some(status.code());
            }
        }
        self.exit_code
    }
}

/// Utility for spawning tool processes
pub struct ProcessSpawner;

impl ProcessSpawner {
    /// Spawn a process in the working directory with the configured
    /// environment. Output goes straight to the terminal. On Unix the child
    /// gets its own process group, so a terminal interrupt leaves it running.
    pub fn launch(
        tool: &str,
        binary: &Path,
        args: &[String],
        config: &ToolConfig,
    ) -> Result<LaunchedProcess, StackError> {
        debug!(
            binary = %binary.display(),
            args = ?args,
            working_dir = %config.working_dir.display(),
            env_count = config.env_vars.len(),
            "Spawning tool process"
        );

        let mut cmd = Command::new(binary);
        cmd.args(args)
            .current_dir(&config.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        for (key, value) in &config.env_vars {
            cmd.env(key, value);
        }

        // Own process group: Ctrl+C stops the watch, not the tool.
        #[cfg(unix)]
        cmd.process_group(0);

        let child = cmd.spawn().map_err(|source| StackError::SpawnFailed {
            tool: tool.to_string(),
            source,
        })?;

        let command = std::iter::once(binary.display().to_string())
            .chain(args.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ");

        Ok(LaunchedProcess {
            child,
            command,
            exit_code: None,
        })
    }
}
