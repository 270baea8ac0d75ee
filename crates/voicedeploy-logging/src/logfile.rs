use std::io;
use std::path::PathBuf;

use chrono::Utc;

/// Directory for deployment logs: `~/.local/share/voicedeploy/logs/`.
pub fn logs_dir() -> io::Result<PathBuf> {
    let data_dir = dirs::data_dir().ok_or_else(|| {
        io::Error::new(io::ErrorKind::NotFound, "could not determine data directory")
    })?;
    Ok(data_dir.join("voicedeploy").join("logs"))
}

/// A fresh log file path for one operation on a stack, e.g.
/// `2026-01-20T10-00-00Z_deploy_Acme.jsonl`. The directory is created.
pub fn default_log_path(operation: &str, stack_name: &str) -> io::Result<PathBuf> {
    let dir = logs_dir()?;
    std::fs::create_dir_all(&dir)?;
    Ok(dir.join(file_name(operation, stack_name)))
}

fn file_name(operation: &str, stack_name: &str) -> String {
    let timestamp = Utc::now().format("%Y-%m-%dT%H-%M-%SZ");
    format!("{}_{}_{}.jsonl", timestamp, operation, stack_name)
}
