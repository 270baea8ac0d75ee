use std::fmt;

use serde::{Deserialize, Serialize};

/// Leaf survey flow, relative to the templates directory.
pub const SURVEY_FLOW_TEMPLATE: &str = "flows/survey_message_flow/survey_message_flow.json";

/// Leaf screen-pop flow, relative to the templates directory.
pub const SCREENPOP_FLOW_TEMPLATE: &str = "flows/screenpop_message_flow/screenpop_message_flow.json";

/// Optional flows a tenant can deploy next to the inbound IVR.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSet {
    pub screen_pop: bool,
    pub survey: bool,
}

impl FeatureSet {
    pub fn new(screen_pop: bool, survey: bool) -> Self {
        Self { screen_pop, survey }
    }
}

/// The four inbound flow variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboundTemplate {
    WelcomeOnly,
    Survey,
    ScreenPop,
    SurveyScreenPop,
}

impl InboundTemplate {
    pub fn select(features: FeatureSet) -> Self {
        match (features.screen_pop, features.survey) {
            (true, true) => InboundTemplate::SurveyScreenPop,
            (false, true) => InboundTemplate::Survey,
            (true, false) => InboundTemplate::ScreenPop,
            (false, false) => InboundTemplate::WelcomeOnly,
        }
    }

    /// Path relative to the templates directory.
    pub fn relative_path(&self) -> &'static str {
        match self {
            InboundTemplate::SurveyScreenPop => "flows/ivr_survey_screenpop_flow.json",
            InboundTemplate::Survey => "flows/ivr_survey_flow.json",
            InboundTemplate::ScreenPop => "flows/ivr_screenpop_flow.json",
            InboundTemplate::WelcomeOnly => "flows/welcome_message_flow/welcome_message_flow.json",
        }
    }
}

impl fmt::Display for InboundTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InboundTemplate::WelcomeOnly => write!(f, "welcome message only"),
            InboundTemplate::Survey => write!(f, "IVR with survey"),
            InboundTemplate::ScreenPop => write!(f, "IVR with screen pop"),
            InboundTemplate::SurveyScreenPop => write!(f, "IVR with survey and screen pop"),
        }
    }
}
