//! Project configuration file support for voicedeploy.
//!
//! Loads defaults from `voicedeploy.toml` in the working directory. Command
//! line flags take precedence over the file.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use voicedeploy_stack::{PollSettings, ToolKind};

/// The config file name
pub const CONFIG_FILE_NAME: &str = "voicedeploy.toml";

/// Environment variable pointing at the template tree
pub const TEMPLATES_ENV: &str = "VOICEDEPLOY_TEMPLATES_DIR";

/// Project-level configuration loaded from `voicedeploy.toml`
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    /// IaC tool: "cdk" or "cloudformation"
    pub tool: Option<String>,
    /// Template tree, relative to the working directory unless absolute
    pub templates_dir: Option<PathBuf>,
    #[serde(default)]
    pub aws: AwsSection,
    #[serde(default)]
    pub polling: PollingSection,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct AwsSection {
    pub region: Option<String>,
    pub profile: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct PollingSection {
    pub interval_secs: Option<u64>,
    pub settle_secs: Option<u64>,
    /// Give up watching the stack after this many seconds
    pub timeout_secs: Option<u64>,
}

impl ProjectConfig {
    /// Load configuration from the working directory.
    ///
    /// Returns:
    /// - `Ok(Some(config))` if file exists and parses successfully
    /// - `Ok(None)` if file does not exist
    /// - `Err(...)` if file exists but fails to parse (hard error)
    pub fn load(working_dir: &Path) -> Result<Option<Self>> {
        let config_path = working_dir.join(CONFIG_FILE_NAME);

        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;

        let config: ProjectConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", config_path.display()))?;

        Ok(Some(config))
    }
}

/// Values from the command line that override the project file
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub templates_dir: Option<PathBuf>,
    pub tool: Option<ToolKind>,
    pub region: Option<String>,
    pub profile: Option<String>,
    pub timeout_secs: Option<u64>,
}

/// Effective settings for one run
#[derive(Debug, Clone)]
pub struct Settings {
    pub working_dir: PathBuf,
    pub templates_dir: PathBuf,
    pub tool: ToolKind,
    pub region: Option<String>,
    pub profile: Option<String>,
    pub poll: PollSettings,
}

impl Settings {
    /// Merge flags over the project file over built-in defaults.
    pub fn resolve(
        working_dir: &Path,
        overrides: Overrides,
        project: Option<ProjectConfig>,
    ) -> Result<Self> {
        let project = project.unwrap_or_default();

        let tool = match (overrides.tool, project.tool.as_deref()) {
            (Some(tool), _) => tool,
            (None, Some(name)) => name
                .parse::<ToolKind>()
                .map_err(anyhow::Error::msg)
                .with_context(|| format!("Invalid tool in {}", CONFIG_FILE_NAME))?,
            (None, None) => ToolKind::default(),
        };

        let templates_dir = match overrides.templates_dir.or(project.templates_dir) {
            Some(dir) if dir.is_absolute() => dir,
            Some(dir) => working_dir.join(dir),
            None => find_templates_dir(working_dir)?,
        };

        if project.polling.interval_secs == Some(0) {
            anyhow::bail!(
                "polling.interval_secs in {} must be at least 1",
                CONFIG_FILE_NAME
            );
        }

        let defaults = PollSettings::default();
        let poll = PollSettings {
            settle: project
                .polling
                .settle_secs
                .map_or(defaults.settle, Duration::from_secs),
            interval: project
                .polling
                .interval_secs
                .map_or(defaults.interval, Duration::from_secs),
            deadline: overrides
                .timeout_secs
                .or(project.polling.timeout_secs)
                .map(Duration::from_secs),
        };

        Ok(Self {
            working_dir: working_dir.to_path_buf(),
            templates_dir,
            tool,
            region: overrides.region.or(project.aws.region),
            profile: overrides.profile.or(project.aws.profile),
            poll,
        })
    }
}

/// Locate the bundled template tree.
fn find_templates_dir(working_dir: &Path) -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(TEMPLATES_ENV) {
        let path = PathBuf::from(dir);
        if path.exists() {
            return Ok(path);
        }
    }

    let local = working_dir.join("templates");
    if local.exists() {
        return Ok(local);
    }

    // Development: binary is in target/debug or target/release,
    // templates/ is at the workspace root
    if let Ok(exe) = std::env::current_exe() {
        if let Some(workspace_root) = exe
            .parent()
            .and_then(|p| p.parent())
            .and_then(|p| p.parent())
        {
            let candidate = workspace_root.join("templates");
            if candidate.exists() {
                return Ok(candidate);
            }
        }
    }

    // ~/.local/share/voicedeploy/templates/
    if let Some(data_dir) = dirs::data_dir() {
        let candidate = data_dir.join("voicedeploy").join("templates");
        if candidate.exists() {
            return Ok(candidate);
        }
    }

    anyhow::bail!(
        "Could not find the templates directory. Pass --templates-dir or set {}.",
        TEMPLATES_ENV
    )
}
