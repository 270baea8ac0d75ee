use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use voicedeploy_logging::{LogEvent, Logger};
use voicedeploy_stack::{
    CdkTool, InfraTool, Operation, PollResult, PollSettings, StackDriver, StackError, StackHandle,
    StackOutcome, StackStatusSource, ToolConfig, ToolKind,
};
use voicedeploy_store::DeployParameters;

/// Replays a fixed list of statuses; the last one repeats forever.
struct ScriptedStatus {
    statuses: Mutex<VecDeque<Option<String>>>,
    last: Mutex<Option<String>>,
    calls: Mutex<usize>,
}

impl ScriptedStatus {
    fn new(statuses: &[Option<&str>]) -> Arc<Self> {
        Arc::new(Self {
            statuses: Mutex::new(statuses.iter().map(|s| s.map(String::from)).collect()),
            last: Mutex::new(None),
            calls: Mutex::new(0),
        })
    }

    fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl StackStatusSource for ScriptedStatus {
    async fn stack_status(&self, _stack_name: &str) -> Result<Option<String>, StackError> {
        *self.calls.lock().unwrap() += 1;
        let mut last = self.last.lock().unwrap();
        if let Some(next) = self.statuses.lock().unwrap().pop_front() {
            *last = next;
        }
        Ok(last.clone())
    }
}

struct FailingStatus;

#[async_trait]
impl StackStatusSource for FailingStatus {
    async fn stack_status(&self, _stack_name: &str) -> Result<Option<String>, StackError> {
        Err(StackError::Status("throttled".to_string()))
    }
}

fn driver(source: Arc<dyn StackStatusSource>, settings: PollSettings) -> (StackDriver, Arc<Logger>) {
    let logger = Arc::new(Logger::capturing());
    (StackDriver::new(source, settings, logger.clone()), logger)
}

// ============================================================================
// Deploy
// ============================================================================

#[tokio::test]
async fn test_deploy_succeeds_on_third_poll() {
    let source = ScriptedStatus::new(&[
        Some("CREATE_IN_PROGRESS"),
        Some("CREATE_IN_PROGRESS"),
        Some("CREATE_COMPLETE"),
    ]);
    let (driver, _logger) = driver(source.clone(), PollSettings::immediate());
    let mut handle = StackHandle::detached(Operation::Deploy, "Acme");

    let first = driver.poll(&mut handle).await.unwrap();
    assert_eq!(
        first,
        PollResult::Pending {
            status: Some("CREATE_IN_PROGRESS".to_string())
        }
    );

    let outcome = driver.wait(&mut handle).await.unwrap();
    assert!(outcome.is_success());
    assert_eq!(outcome.polls(), 3);
    assert_eq!(source.calls(), 3);
    assert_eq!(outcome.status(), Some("CREATE_COMPLETE"));
    assert_eq!(outcome.exit_code(), 0);
}

#[tokio::test]
async fn test_deploy_not_yet_listed_keeps_polling() {
    let source = ScriptedStatus::new(&[None, None, Some("CREATE_COMPLETE")]);
    let (driver, _logger) = driver(source, PollSettings::immediate());
    let mut handle = StackHandle::detached(Operation::Deploy, "Acme");

    let outcome = driver.wait(&mut handle).await.unwrap();
    assert!(outcome.is_success());
    assert_eq!(outcome.polls(), 3);
}

#[tokio::test]
async fn test_deploy_failure_statuses() {
    for terminal in ["CREATE_FAILED", "ROLLBACK_COMPLETE"] {
        let source = ScriptedStatus::new(&[Some("CREATE_IN_PROGRESS"), Some(terminal)]);
        let (driver, _logger) = driver(source, PollSettings::immediate());
        let mut handle = StackHandle::detached(Operation::Deploy, "Acme");

        let outcome = driver.wait(&mut handle).await.unwrap();
        assert!(matches!(outcome, StackOutcome::Failed { .. }), "{}", terminal);
        assert_eq!(outcome.status(), Some(terminal));
        assert_eq!(outcome.exit_code(), 1);
    }
}

// ============================================================================
// Destroy
// ============================================================================

#[tokio::test]
async fn test_destroy_succeeds_when_stack_disappears() {
    let source = ScriptedStatus::new(&[
        Some("DELETE_IN_PROGRESS"),
        Some("DELETE_IN_PROGRESS"),
        None,
    ]);
    let (driver, _logger) = driver(source, PollSettings::immediate());
    let mut handle = StackHandle::detached(Operation::Destroy, "Acme");

    let outcome = driver.wait(&mut handle).await.unwrap();
    assert!(outcome.is_success());
    assert_eq!(outcome.polls(), 3);
    assert_eq!(outcome.status(), None);
}

#[tokio::test]
async fn test_destroy_failed() {
    let source = ScriptedStatus::new(&[Some("DELETE_IN_PROGRESS"), Some("DELETE_FAILED")]);
    let (driver, _logger) = driver(source, PollSettings::immediate());
    let mut handle = StackHandle::detached(Operation::Destroy, "Acme");

    let outcome = driver.wait(&mut handle).await.unwrap();
    assert!(matches!(outcome, StackOutcome::Failed { .. }));
    assert_eq!(outcome.polls(), 2);
}

// ============================================================================
// Deadline, interrupt, errors
// ============================================================================

#[tokio::test]
async fn test_deadline_gives_timed_out() {
    let source = ScriptedStatus::new(&[Some("UPDATE_ROLLBACK_COMPLETE")]);
    let settings = PollSettings {
        settle: Duration::ZERO,
        interval: Duration::from_millis(10),
        deadline: Some(Duration::from_millis(60)),
    };
    let (driver, _logger) = driver(source, settings);
    let mut handle = StackHandle::detached(Operation::Deploy, "Acme");

    let outcome = driver.wait(&mut handle).await.unwrap();
    assert!(matches!(outcome, StackOutcome::TimedOut { .. }));
    assert!(outcome.polls() >= 1);
    assert_eq!(outcome.status(), Some("UPDATE_ROLLBACK_COMPLETE"));
    assert_eq!(outcome.exit_code(), 2);
}

#[tokio::test]
async fn test_interrupt_gives_interrupted() {
    let source = ScriptedStatus::new(&[Some("CREATE_IN_PROGRESS")]);
    let settings = PollSettings {
        settle: Duration::from_secs(60),
        interval: Duration::from_secs(60),
        deadline: None,
    };
    let (driver, _logger) = driver(source.clone(), settings);
    let flag = driver.interrupt_handle();
    let mut handle = StackHandle::detached(Operation::Deploy, "Acme");

    let setter = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        flag.store(true, Ordering::SeqCst);
    });

    let outcome = tokio::time::timeout(Duration::from_secs(5), driver.wait(&mut handle))
        .await
        .expect("interrupt should end the settle delay early")
        .unwrap();
    setter.await.unwrap();

    assert!(matches!(outcome, StackOutcome::Interrupted { .. }));
    assert_eq!(source.calls(), 0);
    assert_eq!(outcome.exit_code(), 130);
}

#[tokio::test]
async fn test_status_error_propagates() {
    let (driver, _logger) = driver(Arc::new(FailingStatus), PollSettings::immediate());
    let mut handle = StackHandle::detached(Operation::Deploy, "Acme");

    let err = driver.wait(&mut handle).await.unwrap_err();
    assert!(matches!(err, StackError::Status(_)));
    assert_eq!(handle.polls(), 0);
}

// ============================================================================
// Events
// ============================================================================

#[tokio::test]
async fn test_logs_each_poll_and_completion() {
    let source = ScriptedStatus::new(&[Some("CREATE_IN_PROGRESS"), Some("CREATE_COMPLETE")]);
    let (driver, logger) = driver(source, PollSettings::immediate());
    let mut handle = StackHandle::detached(Operation::Deploy, "Acme");

    driver.wait(&mut handle).await.unwrap();
    assert_eq!(handle.last_status(), Some("CREATE_COMPLETE"));

    let history = logger.history();
    let polls: Vec<usize> = history
        .iter()
        .filter_map(|e| match e {
            LogEvent::StackStatus { poll, .. } => Some(*poll),
            _ => None,
        })
        .collect();
    assert_eq!(polls, vec![1, 2]);

    match history.last() {
        Some(LogEvent::OperationCompleted { outcome, stack_name, .. }) => {
            assert_eq!(outcome, "succeeded");
            assert_eq!(stack_name, "Acme");
        }
        other => panic!("unexpected last event: {:?}", other),
    }
}

// ============================================================================
// Tool launch
// ============================================================================

/// Runs a shell script in place of an IaC CLI.
struct ShellTool {
    shell: PathBuf,
    script: String,
}

impl ShellTool {
    fn new(script: &str) -> Self {
        Self {
            shell: PathBuf::from("/bin/sh"),
            script: script.to_string(),
        }
    }
}

#[async_trait]
impl InfraTool for ShellTool {
    fn name(&self) -> &str {
        "shell"
    }

    fn kind(&self) -> ToolKind {
        ToolKind::Cdk
    }

    fn binary_path(&self) -> &Path {
        &self.shell
    }

    fn install_hint(&self) -> &str {
        "sh ships with the system"
    }

    fn needs_template(&self) -> bool {
        false
    }

    fn args(&self, _operation: Operation, _config: &ToolConfig) -> Vec<String> {
        vec!["-c".to_string(), self.script.clone()]
    }

    async fn is_available(&self) -> bool {
        true
    }
}

fn tool_config(dir: &Path) -> ToolConfig {
    let params = DeployParameters::for_destroy("Acme Ops", "Acme-Ops");
    ToolConfig::new(dir, &params).with_env("AWS_REGION", "us-west-2")
}

async fn poll_until_tool_exits(driver: &StackDriver, handle: &mut StackHandle) {
    for _ in 0..500 {
        driver.poll(handle).await.unwrap();
        if handle.tool_exit().is_some() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("tool process did not exit");
}

fn tool_exits(logger: &Logger) -> Vec<Option<i32>> {
    logger
        .history()
        .iter()
        .filter_map(|e| match e {
            LogEvent::ToolExited { exit_code } => Some(*exit_code),
            _ => None,
        })
        .collect()
}

#[cfg(unix)]
#[tokio::test]
async fn test_submit_runs_tool_with_parameter_env_in_working_dir() {
    let dir = tempfile::tempdir().unwrap();
    let tool = ShellTool::new("env > env.txt; pwd -P > cwd.txt");
    let (driver, logger) = driver(ScriptedStatus::new(&[None]), PollSettings::immediate());

    let mut handle = driver
        .submit(&tool, Operation::Deploy, &tool_config(dir.path()))
        .await
        .unwrap();
    poll_until_tool_exits(&driver, &mut handle).await;
    assert_eq!(handle.tool_exit(), Some(Some(0)));

    let env = std::fs::read_to_string(dir.path().join("env.txt")).unwrap();
    assert!(env.lines().any(|l| l == "tenant_name=Acme Ops"));
    assert!(env.lines().any(|l| l == "stack_name=Acme-Ops"));
    assert!(env.lines().any(|l| l == "deploy_survey_flow=False"));
    assert!(env.lines().any(|l| l == "AWS_REGION=us-west-2"));

    let cwd = std::fs::read_to_string(dir.path().join("cwd.txt")).unwrap();
    assert_eq!(
        PathBuf::from(cwd.trim()),
        std::fs::canonicalize(dir.path()).unwrap()
    );

    match logger.history().first() {
        Some(LogEvent::ToolLaunched { tool, command }) => {
            assert_eq!(tool, "shell");
            assert!(command.starts_with("/bin/sh -c env"));
        }
        other => panic!("unexpected first event: {:?}", other),
    }
}

#[cfg(unix)]
#[tokio::test]
async fn test_tool_exit_is_logged_once() {
    let dir = tempfile::tempdir().unwrap();
    let tool = ShellTool::new("exit 0");
    let (driver, logger) = driver(ScriptedStatus::new(&[None]), PollSettings::immediate());

    let mut handle = driver
        .submit(&tool, Operation::Deploy, &tool_config(dir.path()))
        .await
        .unwrap();
    poll_until_tool_exits(&driver, &mut handle).await;

    // the stack is still pending, so polling continues past the exit
    for _ in 0..2 {
        let result = driver.poll(&mut handle).await.unwrap();
        assert_eq!(result, PollResult::Pending { status: None });
    }
    assert_eq!(tool_exits(&logger), vec![Some(0)]);
}

#[cfg(unix)]
#[tokio::test]
async fn test_failed_tool_without_stack_fails_deploy() {
    let dir = tempfile::tempdir().unwrap();
    let tool = ShellTool::new("exit 3");
    let settings = PollSettings {
        settle: Duration::ZERO,
        interval: Duration::from_millis(10),
        deadline: Some(Duration::from_secs(10)),
    };
    let (driver, logger) = driver(ScriptedStatus::new(&[None]), settings);

    let mut handle = driver
        .submit(&tool, Operation::Deploy, &tool_config(dir.path()))
        .await
        .unwrap();
    let outcome = driver.wait(&mut handle).await.unwrap();

    assert!(matches!(outcome, StackOutcome::Failed { .. }));
    assert_eq!(outcome.status(), None);
    assert_eq!(outcome.exit_code(), 1);
    assert_eq!(tool_exits(&logger), vec![Some(3)]);
}

#[cfg(unix)]
#[tokio::test]
async fn test_failed_tool_does_not_override_listed_stack() {
    let dir = tempfile::tempdir().unwrap();
    let tool = ShellTool::new("exit 3");
    let (driver, _logger) = driver(
        ScriptedStatus::new(&[Some("CREATE_IN_PROGRESS")]),
        PollSettings::immediate(),
    );

    let mut handle = driver
        .submit(&tool, Operation::Deploy, &tool_config(dir.path()))
        .await
        .unwrap();
    poll_until_tool_exits(&driver, &mut handle).await;

    let result = driver.poll(&mut handle).await.unwrap();
    assert_eq!(
        result,
        PollResult::Pending {
            status: Some("CREATE_IN_PROGRESS".to_string())
        }
    );
}

#[cfg(target_os = "linux")]
#[tokio::test]
async fn test_tool_runs_in_its_own_process_group() {
    let dir = tempfile::tempdir().unwrap();
    let tool = ShellTool::new("echo $$ $(cut -d' ' -f5 /proc/$$/stat) > pgrp.txt");
    let (driver, _logger) = driver(ScriptedStatus::new(&[None]), PollSettings::immediate());

    let mut handle = driver
        .submit(&tool, Operation::Deploy, &tool_config(dir.path()))
        .await
        .unwrap();
    poll_until_tool_exits(&driver, &mut handle).await;

    let line = std::fs::read_to_string(dir.path().join("pgrp.txt")).unwrap();
    let ids: Vec<&str> = line.split_whitespace().collect();
    assert_eq!(ids.len(), 2);
    assert_eq!(ids[0], ids[1], "tool should lead its own process group");
}

#[tokio::test]
async fn test_submit_missing_tool() {
    let dir = tempfile::tempdir().unwrap();
    let tool = CdkTool::with_binary_path(PathBuf::from("/nonexistent/cdk-binary"));
    let (driver, logger) = driver(ScriptedStatus::new(&[None]), PollSettings::immediate());

    let Err(err) = driver
        .submit(&tool, Operation::Deploy, &tool_config(dir.path()))
        .await
    else {
        panic!("a missing binary should not launch");
    };
    match err {
        StackError::ToolMissing { tool, hint } => {
            assert_eq!(tool, "AWS CDK");
            assert!(hint.contains("npm install -g aws-cdk"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert!(logger.history().is_empty());
}
