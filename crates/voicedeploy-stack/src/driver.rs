use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use voicedeploy_logging::{LogEvent, Logger};

use crate::{InfraTool, LaunchedProcess, Operation, StackError, StackOutcome, StackStatusSource, ToolConfig};

/// Longest single sleep between interrupt checks
const INTERRUPT_CHECK: Duration = Duration::from_millis(200);

/// What one status observation means for an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Succeeded,
    Failed,
    Pending,
}

/// Map a stack status (`None` = not listed) to a classification.
///
/// Any status not named here keeps the operation pending.
pub fn classify(operation: Operation, status: Option<&str>) -> Classification {
    match (operation, status) {
        (Operation::Deploy, Some("CREATE_COMPLETE")) => Classification::Succeeded,
        (Operation::Deploy, Some("CREATE_FAILED" | "ROLLBACK_COMPLETE")) => Classification::Failed,
        (Operation::Destroy, None | Some("DELETE_COMPLETE")) => Classification::Succeeded,
        (Operation::Destroy, Some("DELETE_FAILED")) => Classification::Failed,
        _ => Classification::Pending,
    }
}

/// Timing of the polling loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    /// Delay between launching the tool and the first poll
    pub settle: Duration,
    pub interval: Duration,
    /// Give up after this long (None = no limit)
    pub deadline: Option<Duration>,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            settle: Duration::from_secs(5),
            interval: Duration::from_secs(5),
            deadline: None,
        }
    }
}

impl PollSettings {
    /// No delays, for scripted status sources.
    pub fn immediate() -> Self {
        Self {
            settle: Duration::ZERO,
            interval: Duration::ZERO,
            deadline: None,
        }
    }
}

/// A submitted operation being watched
pub struct StackHandle {
    operation: Operation,
    stack_name: String,
    process: Option<LaunchedProcess>,
    started: Instant,
    settled: bool,
    polls: usize,
    last_status: Option<String>,
    tool_exit: Option<Option<i32>>,
}

impl StackHandle {
    /// Handle for an operation whose tool was started elsewhere.
    pub fn detached(operation: Operation, stack_name: impl Into<String>) -> Self {
        Self {
            operation,
            stack_name: stack_name.into(),
            process: None,
            started: Instant::now(),
            settled: false,
            polls: 0,
            last_status: None,
            tool_exit: None,
        }
    }

    pub fn polls(&self) -> usize {
        self.polls
    }

    pub fn last_status(&self) -> Option<&str> {
        self.last_status.as_deref()
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Exit code of the tool once it has been seen finished.
    pub fn tool_exit(&self) -> Option<Option<i32>> {
        self.tool_exit
    }

    fn tool_failed_without_stack(&self) -> bool {
        self.operation == Operation::Deploy
            && self.last_status.is_none()
            && matches!(self.tool_exit, Some(code) if code != Some(0))
    }
}

/// Result of a single [`StackDriver::poll`]
#[derive(Debug, Clone, PartialEq)]
pub enum PollResult {
    Pending { status: Option<String> },
    Finished(StackOutcome),
}

/// Launches IaC tools and watches the stack they change
pub struct StackDriver {
    status: Arc<dyn StackStatusSource>,
    settings: PollSettings,
    logger: Arc<Logger>,
    interrupted: Arc<AtomicBool>,
}

impl StackDriver {
    pub fn new(status: Arc<dyn StackStatusSource>, settings: PollSettings, logger: Arc<Logger>) -> Self {
        Self {
            status,
            settings,
            logger,
            interrupted: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Use an externally owned interrupt flag (e.g. one set by a Ctrl+C handler)
    pub fn with_interrupt(mut self, flag: Arc<AtomicBool>) -> Self {
        self.interrupted = flag;
        self
    }

    /// Get a handle to signal interruption
    pub fn interrupt_handle(&self) -> Arc<AtomicBool> {
        self.interrupted.clone()
    }

    /// Launch the tool for an operation. Returns as soon as it is running.
    pub async fn submit(
        &self,
        tool: &dyn InfraTool,
        operation: Operation,
        config: &ToolConfig,
    ) -> Result<StackHandle, StackError> {
        info!(tool = tool.name(), %operation, stack = %config.stack_name, "Submitting stack operation");

        let process = tool.launch(operation, config).await?;
        self.logger.log(&LogEvent::ToolLaunched {
            tool: tool.name().to_string(),
            command: process.command().to_string(),
        });
        debug!(pid = ?process.id(), "Tool process started");

        let mut handle = StackHandle::detached(operation, config.stack_name.clone());
        handle.process = Some(process);
        Ok(handle)
    }

    /// Observe the stack once.
    pub async fn poll(&self, handle: &mut StackHandle) -> Result<PollResult, StackError> {
        self.report_tool_exit(handle);

        let status = self.status.stack_status(&handle.stack_name).await?;
        handle.polls += 1;
        handle.last_status = status.clone();

        self.logger.log(&LogEvent::StackStatus {
            stack_name: handle.stack_name.clone(),
            status: status.clone(),
            poll: handle.polls,
            elapsed_secs: handle.elapsed().as_secs_f64(),
        });

        let duration = handle.elapsed();
        let mut classification = classify(handle.operation, status.as_deref());
        if classification == Classification::Pending && handle.tool_failed_without_stack() {
            warn!(stack = %handle.stack_name, "Tool failed and the stack is not listed");
            classification = Classification::Failed;
        }
        let result = match classification {
            Classification::Succeeded => PollResult::Finished(StackOutcome::succeeded(
                handle.operation,
                &handle.stack_name,
                status,
                handle.polls,
                duration,
            )),
            Classification::Failed => PollResult::Finished(StackOutcome::failed(
                handle.operation,
                &handle.stack_name,
                status,
                handle.polls,
                duration,
            )),
            Classification::Pending => PollResult::Pending { status },
        };
        Ok(result)
    }

    /// Poll until the stack settles, the deadline passes or the interrupt flag is set.
    ///
    /// CloudFormation's status decides the outcome. The tool's exit only
    /// matters for a deploy whose tool fails before the stack is ever listed,
    /// which ends as failed instead of polling forever. Redeploying an
    /// existing stack reads `CREATE_COMPLETE` on the first poll and so
    /// reports success before an update has run.
    pub async fn wait(&self, handle: &mut StackHandle) -> Result<StackOutcome, StackError> {
        if !handle.settled {
            self.sleep(self.settings.settle).await;
            handle.settled = true;
        }

        loop {
            if let Some(outcome) = self.stopped(handle) {
                return Ok(outcome);
            }

            if let PollResult::Finished(outcome) = self.poll(handle).await? {
                self.finish(&outcome);
                return Ok(outcome);
            }

            self.sleep(self.settings.interval).await;
        }
    }

    fn stopped(&self, handle: &StackHandle) -> Option<StackOutcome> {
        let elapsed = handle.elapsed();
        let outcome = if self.interrupted.load(Ordering::SeqCst) {
            info!(stack = %handle.stack_name, "Stack watch interrupted by user");
            StackOutcome::interrupted(
                handle.operation,
                &handle.stack_name,
                handle.last_status.clone(),
                handle.polls,
                elapsed,
            )
        } else if self.settings.deadline.is_some_and(|d| elapsed >= d) {
            warn!(stack = %handle.stack_name, polls = handle.polls, "Stack watch deadline reached");
            StackOutcome::timed_out(
                handle.operation,
                &handle.stack_name,
                handle.last_status.clone(),
                handle.polls,
                elapsed,
            )
        } else {
            return None;
        };
        self.finish(&outcome);
        Some(outcome)
    }

    fn finish(&self, outcome: &StackOutcome) {
        self.logger.log(&LogEvent::OperationCompleted {
            operation: outcome.operation().to_string(),
            stack_name: outcome.stack_name().to_string(),
            outcome: outcome.label().to_string(),
            duration_secs: outcome.duration_secs(),
        });
    }

    /// Logs `ToolExited` once, the first time the process is seen finished.
    fn report_tool_exit(&self, handle: &mut StackHandle) {
        if handle.tool_exit.is_some() {
            return;
        }
        let Some(process) = handle.process.as_mut() else {
            return;
        };
        if let Some(exit_code) = process.try_exit() {
            handle.tool_exit = Some(exit_code);
            if exit_code != Some(0) {
                warn!(?exit_code, "Tool exited with a failure status");
            }
            self.logger.log(&LogEvent::ToolExited { exit_code });
        }
    }

    /// Sleep, waking early when the interrupt flag is set.
    async fn sleep(&self, duration: Duration) {
        let until = Instant::now() + duration;
        loop {
            if self.interrupted.load(Ordering::SeqCst) {
                return;
            }
            let now = Instant::now();
            if now >= until {
                return;
            }
            tokio::time::sleep((until - now).min(INTERRUPT_CHECK)).await;
        }
    }
}
