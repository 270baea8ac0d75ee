use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::StoreError;
use crate::store::remove_if_exists;

/// Everything a deployment writes into its working directory.
pub const GENERATED_FILES: &[&str] = &[
    "connect.json",
    "security_profile.json",
    "environment_config.json",
    "hours_of_operation.json",
    "ivr_messages.json",
    "survey_message.json",
    "inbound_flow.json",
    "inbound_flow_updated.json",
    "survey_message_flow.json",
    "screenpop_message_flow.json",
    "connect_flow_screenpop_updated.json",
    "connect_flow_survey_updated.json",
    "connect_stack.template.json",
    "agents.csv",
];

/// What the web form's "Clear" button removes. The instance reference and
/// roster survive so the next deployment can reuse them.
pub const FORM_CLEAR_FILES: &[&str] = &[
    "environment_config.json",
    "hours_of_operation.json",
    "inbound_flow_updated.json",
    "inbound_flow.json",
    "ivr_messages.json",
    "security_profile.json",
];

/// Files removed by a cleanup pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanReport {
    pub removed: Vec<PathBuf>,
}

impl CleanReport {
    pub fn is_empty(&self) -> bool {
        self.removed.is_empty()
    }
}

/// Remove every listed file that exists under `dir`. Other files are left alone.
pub fn remove_listed(dir: &Path, files: &[&str]) -> Result<CleanReport, StoreError> {
    let mut report = CleanReport::default();
    for name in files {
        let path = dir.join(name);
        if remove_if_exists(&path)? {
            debug!(path = %path.display(), "Removed generated file");
            report.removed.push(path);
        }
    }
    Ok(report)
}

/// Remove all generated files from the working directory.
pub fn clean(dir: &Path) -> Result<CleanReport, StoreError> {
    remove_listed(dir, GENERATED_FILES)
}

/// Remove the files the web form resets between deployments.
pub fn clear_form_files(dir: &Path) -> Result<CleanReport, StoreError> {
    remove_listed(dir, FORM_CLEAR_FILES)
}
