use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::naming::stack_name_for;

/// A JSON document kept in the working directory.
pub trait Document: Serialize + DeserializeOwned {
    /// File name inside the working directory.
    const FILE_NAME: &'static str;

    /// Top-level keys that must be present for the document to load.
    const REQUIRED_FIELDS: &'static [&'static str];
}

/// The Amazon Connect instance a deployment targets (`connect.json`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct InstanceReference {
    pub id: String,
    pub arn: String,
}

impl InstanceReference {
    /// The `arn:aws:connect:<region>` part of the instance ARN
    pub fn arn_prefix(&self) -> &str {
        arn_prefix(&self.arn)
    }
}

impl Document for InstanceReference {
    const FILE_NAME: &'static str = "connect.json";
    const REQUIRED_FIELDS: &'static [&'static str] = &["Id", "Arn"];
}

/// Strip the account and resource segments from an ARN.
///
/// `arn:aws:connect:us-east-1:123456789012:instance/abc` becomes
/// `arn:aws:connect:us-east-1`.
pub fn arn_prefix(arn: &str) -> &str {
    arn.rsplitn(3, ':').last().unwrap_or(arn)
}

/// The "Agent" security profile of the instance (`security_profile.json`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SecurityProfileReference {
    pub id: String,
    pub arn: String,
    pub name: String,
}

impl Document for SecurityProfileReference {
    const FILE_NAME: &'static str = "security_profile.json";
    const REQUIRED_FIELDS: &'static [&'static str] = &["Id", "Arn", "Name"];
}

/// Tenant choices made in a front-end (`environment_config.json`)
///
/// The feature flags are written as `"True"`/`"False"` strings, which is what
/// the CDK app reading this file expects. Plain JSON booleans load too.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantConfig {
    pub tenant_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack_name: Option<String>,
    pub tenant_description: String,
    pub tts_voice: String,
    #[serde(with = "flag")]
    pub deploy_survey_flow: bool,
    #[serde(with = "flag")]
    pub deploy_screen_flow: bool,
}

impl TenantConfig {
    /// Stack name to use, derived from the tenant name when not stored.
    pub fn effective_stack_name(&self) -> String {
        match &self.stack_name {
            Some(name) if !name.is_empty() => name.clone(),
            _ => stack_name_for(&self.tenant_name),
        }
    }
}

impl Document for TenantConfig {
    const FILE_NAME: &'static str = "environment_config.json";
    const REQUIRED_FIELDS: &'static [&'static str] = &[
        "tenant_name",
        "tenant_description",
        "tts_voice",
        "deploy_survey_flow",
        "deploy_screen_flow",
    ];
}

/// One opening window of a weekday
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSlice {
    pub day: String,
    pub start_h: u32,
    pub start_m: u32,
    pub end_h: u32,
    pub end_m: u32,
}

/// Business hours for the tenant queue (`hours_of_operation.json`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HoursOfOperation {
    pub name: String,
    pub description: String,
    pub time_zone: String,
    pub timeslices: Vec<TimeSlice>,
}

impl Document for HoursOfOperation {
    const FILE_NAME: &'static str = "hours_of_operation.json";
    const REQUIRED_FIELDS: &'static [&'static str] =
        &["name", "description", "timeZone", "timeslices"];
}

/// Prompts played by the inbound IVR flow (`ivr_messages.json`)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IvrMessages {
    pub welcome_message: String,
    pub open_hour_message: String,
    pub error_message: String,
}

impl Document for IvrMessages {
    const FILE_NAME: &'static str = "ivr_messages.json";
    const REQUIRED_FIELDS: &'static [&'static str] =
        &["welcomeMessage", "openHourMessage", "errorMessage"];
}

/// Prompts played by the post-call survey flow (`survey_message.json`)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SurveyMessages {
    pub survey_message: String,
    pub survey_message_feedback: String,
}

impl Document for SurveyMessages {
    const FILE_NAME: &'static str = "survey_message.json";
    const REQUIRED_FIELDS: &'static [&'static str] = &["surveyMessage", "surveyMessageFeedback"];
}

/// `"True"`/`"False"` on the wire, `bool` in Rust.
mod flag {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &bool, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(if *value { "True" } else { "False" })
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<bool, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Bool(bool),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Bool(value) => Ok(value),
            Raw::Text(text) => match text.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "1" => Ok(true),
                "false" | "no" | "0" | "" => Ok(false),
                other => Err(de::Error::custom(format!(
                    "expected True or False, got '{}'",
                    other
                ))),
            },
        }
    }
}
