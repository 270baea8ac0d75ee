use crate::document::{IvrMessages, SurveyMessages, TenantConfig};

/// Voice written into the teardown parameter set. The tool only needs some
/// value for the variable; nothing is synthesized during a destroy.
pub const PLACEHOLDER_VOICE: &str = "Joanna";

/// Everything the infrastructure tool needs to know about a tenant.
///
/// Built from the persisted documents and handed to the stack step, which
/// sets these values on the child process only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployParameters {
    pub tenant_name: String,
    pub stack_name: String,
    pub tenant_description: String,
    pub tts_voice: String,
    pub deploy_survey_flow: bool,
    pub deploy_screen_flow: bool,
    pub ivr: IvrMessages,
    /// Present when the survey flow is part of the deployment.
    pub survey: Option<SurveyMessages>,
}

impl DeployParameters {
    pub fn new(config: &TenantConfig, ivr: IvrMessages, survey: Option<SurveyMessages>) -> Self {
        Self {
            tenant_name: config.tenant_name.clone(),
            stack_name: config.effective_stack_name(),
            tenant_description: config.tenant_description.clone(),
            tts_voice: config.tts_voice.clone(),
            deploy_survey_flow: config.deploy_survey_flow,
            deploy_screen_flow: config.deploy_screen_flow,
            ivr,
            survey: if config.deploy_survey_flow { survey } else { None },
        }
    }

    /// The parameter set used when tearing a stack down.
    pub fn for_destroy(tenant_name: impl Into<String>, stack_name: impl Into<String>) -> Self {
        Self {
            tenant_name: tenant_name.into(),
            stack_name: stack_name.into(),
            tenant_description: String::new(),
            tts_voice: PLACEHOLDER_VOICE.to_string(),
            deploy_survey_flow: false,
            deploy_screen_flow: false,
            ivr: IvrMessages::default(),
            survey: Some(SurveyMessages::default()),
        }
    }

    /// The tenant document these parameters correspond to.
    pub fn tenant_config(&self) -> TenantConfig {
        TenantConfig {
            tenant_name: self.tenant_name.clone(),
            stack_name: Some(self.stack_name.clone()),
            tenant_description: self.tenant_description.clone(),
            tts_voice: self.tts_voice.clone(),
            deploy_survey_flow: self.deploy_survey_flow,
            deploy_screen_flow: self.deploy_screen_flow,
        }
    }

    /// Environment variables for the infrastructure tool's process.
    pub fn to_env(&self) -> Vec<(String, String)> {
        let mut env = vec![
            ("tenant_name", self.tenant_name.clone()),
            ("stack_name", self.stack_name.clone()),
            ("tenant_description", self.tenant_description.clone()),
            ("tts_voice", self.tts_voice.clone()),
            ("deploy_survey_flow", flag_text(self.deploy_survey_flow)),
            ("deploy_screen_flow", flag_text(self.deploy_screen_flow)),
            ("ivr_welcome_message", self.ivr.welcome_message.clone()),
            ("ivr_open_hour_message", self.ivr.open_hour_message.clone()),
            ("ivr_error_message", self.ivr.error_message.clone()),
        ];

        if let Some(survey) = &self.survey {
            env.push(("survey_message", survey.survey_message.clone()));
            env.push((
                "survey_message_feedback",
                survey.survey_message_feedback.clone(),
            ));
        }

        env.into_iter()
            .map(|(key, value)| (key.to_string(), value))
            .collect()
    }
}

fn flag_text(value: bool) -> String {
    let text = if value { "True" } else { "False" };
    text.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tenant(survey: bool) -> TenantConfig {
        TenantConfig {
            tenant_name: "Acme Support".to_string(),
            stack_name: None,
            tenant_description: "Support line".to_string(),
            tts_voice: "Matthew".to_string(),
            deploy_survey_flow: survey,
            deploy_screen_flow: true,
        }
    }

    fn lookup<'a>(env: &'a [(String, String)], key: &str) -> Option<&'a str> {
        env.iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn test_env_includes_survey_only_when_enabled() {
        let survey = SurveyMessages {
            survey_message: "Rate us".to_string(),
            survey_message_feedback: "Thanks".to_string(),
        };

        let with = DeployParameters::new(&tenant(true), IvrMessages::default(), Some(survey.clone()));
        let env = with.to_env();
        assert_eq!(lookup(&env, "survey_message"), Some("Rate us"));
        assert_eq!(lookup(&env, "deploy_survey_flow"), Some("True"));

        let without = DeployParameters::new(&tenant(false), IvrMessages::default(), Some(survey));
        let env = without.to_env();
        assert!(lookup(&env, "survey_message").is_none());
        assert_eq!(lookup(&env, "deploy_survey_flow"), Some("False"));
    }

    #[test]
    fn test_stack_name_is_derived() {
        let params = DeployParameters::new(&tenant(false), IvrMessages::default(), None);
        let env = params.to_env();
        assert_eq!(lookup(&env, "tenant_name"), Some("Acme Support"));
        assert_eq!(lookup(&env, "stack_name"), Some("Acme-Support"));
        assert_eq!(lookup(&env, "deploy_screen_flow"), Some("True"));
    }

    #[test]
    fn test_destroy_parameters_are_blank() {
        let params = DeployParameters::for_destroy("Acme", "Acme");
        let env = params.to_env();
        assert_eq!(lookup(&env, "tts_voice"), Some(PLACEHOLDER_VOICE));
        assert_eq!(lookup(&env, "deploy_screen_flow"), Some("False"));
        assert_eq!(lookup(&env, "ivr_welcome_message"), Some(""));
        assert_eq!(lookup(&env, "survey_message"), Some(""));
    }
}
