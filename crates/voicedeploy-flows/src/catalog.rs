use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use voicedeploy_store::{IvrMessages, SurveyMessages};

use crate::error::FlowError;
use crate::language::{hours_region, LanguageCatalog, DEFAULT_REGION};
use crate::selection::{InboundTemplate, SCREENPOP_FLOW_TEMPLATE, SURVEY_FLOW_TEMPLATE};

const LANGUAGES_CSV: &str = "languages/languages_neural.csv";
const AGENTS_CSV: &str = "agents/agents.csv";
const IVR_BUNDLE: &str = "flows/welcome_message_flow/ivr_messages.json";
const SURVEY_BUNDLE: &str = "flows/survey_message_flow/survey_messages.json";

/// The bundled template tree.
///
/// ```text
/// <root>/
///   agents/agents.csv
///   languages/languages_neural.csv
///   hoursofoperation/hours_of_operation_{us,hk,de,dubai}.json
///   flows/...
/// ```
#[derive(Debug, Clone)]
pub struct TemplateCatalog {
    root: PathBuf,
}

impl TemplateCatalog {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }

    pub fn inbound_template(&self, template: InboundTemplate) -> PathBuf {
        self.path(template.relative_path())
    }

    pub fn survey_flow_template(&self) -> PathBuf {
        self.path(SURVEY_FLOW_TEMPLATE)
    }

    pub fn screenpop_flow_template(&self) -> PathBuf {
        self.path(SCREENPOP_FLOW_TEMPLATE)
    }

    pub fn languages_csv(&self) -> PathBuf {
        self.path(LANGUAGES_CSV)
    }

    pub fn sample_agents(&self) -> PathBuf {
        self.path(AGENTS_CSV)
    }

    pub fn languages(&self) -> Result<LanguageCatalog, FlowError> {
        LanguageCatalog::read(&self.languages_csv())
    }

    /// Hours template for a region key, falling back to the US file when the
    /// regional one is not shipped.
    pub fn hours_template(&self, region: &str) -> PathBuf {
        let regional = self.hours_file(hours_region(region));
        if regional.exists() {
            return regional;
        }
        warn!(
            region,
            path = %regional.display(),
            "Regional hours template missing, using US hours"
        );
        self.hours_file(DEFAULT_REGION)
    }

    /// Hours template used when a stack is built without one on disk.
    pub fn fallback_hours_template(&self) -> PathBuf {
        self.hours_file("hk")
    }

    fn hours_file(&self, key: &str) -> PathBuf {
        self.path(&format!("hoursofoperation/hours_of_operation_{}.json", key))
    }

    pub fn ivr_messages(&self, region: &str) -> Result<IvrMessages, FlowError> {
        self.bundle_entry(&self.path(IVR_BUNDLE), region)
    }

    pub fn survey_messages(&self, region: &str) -> Result<SurveyMessages, FlowError> {
        self.bundle_entry(&self.path(SURVEY_BUNDLE), region)
    }

    fn bundle_entry<T: DeserializeOwned>(&self, path: &Path, region: &str) -> Result<T, FlowError> {
        let content = fs::read_to_string(path).map_err(|e| FlowError::io(path, e))?;
        let mut bundle: HashMap<String, T> =
            serde_json::from_str(&content).map_err(|source| FlowError::Malformed {
                path: path.to_path_buf(),
                source,
            })?;

        if let Some(entry) = bundle.remove(region) {
            return Ok(entry);
        }
        debug!(region, path = %path.display(), "No messages for region, using 'us'");
        bundle
            .remove(DEFAULT_REGION)
            .ok_or_else(|| FlowError::MissingBundle {
                path: path.to_path_buf(),
                region: region.to_string(),
            })
    }
}
