use std::path::PathBuf;

use serde_json::Value;
use tracing::{debug, info};
use voicedeploy_store::{arn_prefix, ConfigStore, IvrMessages, SurveyMessages};

use crate::catalog::TemplateCatalog;
use crate::error::FlowError;
use crate::selection::{FeatureSet, InboundTemplate};
use crate::tokens::{substitute_json, token, TokenMap};

/// Stable CloudFormation logical IDs of the stack resources.
pub mod logical_ids {
    pub const HOURS_OF_OPERATION: &str = "HoursOfOperation";
    pub const QUEUE: &str = "Queue";
    pub const SCREENPOP_FLOW: &str = "ScreenPopFlow";
    pub const SURVEY_FLOW: &str = "SurveyFlow";
    pub const INBOUND_FLOW: &str = "InboundFlow";
    pub const ROUTING_PROFILE: &str = "RoutingProfile";
    /// Users are `Agent1`, `Agent2`, ... in roster order.
    pub const AGENT_PREFIX: &str = "Agent";
}

/// Queue ARN as seen from inside the inbound flow's `Fn::Sub` content.
pub const QUEUE_ARN_REFERENCE: &str = "${Queue.QueueArn}";

/// Name of the tenant's queue.
pub fn queue_name(tenant_name: &str) -> String {
    format!("{} Queue", tenant_name)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowKind {
    ScreenPop,
    Survey,
    Inbound,
}

impl FlowKind {
    /// Unresolved copy in the working directory.
    pub fn working_file(&self) -> &'static str {
        match self {
            FlowKind::ScreenPop => "screenpop_message_flow.json",
            FlowKind::Survey => "survey_message_flow.json",
            FlowKind::Inbound => "inbound_flow.json",
        }
    }

    /// Resolved output in the working directory.
    pub fn resolved_file(&self) -> &'static str {
        match self {
            FlowKind::ScreenPop => "connect_flow_screenpop_updated.json",
            FlowKind::Survey => "connect_flow_survey_updated.json",
            FlowKind::Inbound => "inbound_flow_updated.json",
        }
    }

    pub fn logical_id(&self) -> &'static str {
        match self {
            FlowKind::ScreenPop => logical_ids::SCREENPOP_FLOW,
            FlowKind::Survey => logical_ids::SURVEY_FLOW,
            FlowKind::Inbound => logical_ids::INBOUND_FLOW,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            FlowKind::ScreenPop => "ScreenPop flow created using cfn",
            FlowKind::Survey => "Survey flow created using cfn",
            FlowKind::Inbound => "IVR flow created using cfn",
        }
    }

    /// Connect display name of this flow for a tenant.
    pub fn flow_name(&self, tenant_name: &str) -> String {
        let suffix = match self {
            FlowKind::ScreenPop => "ScreenPop Flow",
            FlowKind::Survey => "Survey Flow",
            FlowKind::Inbound => "Inbound Flow",
        };
        format!("{} {}", tenant_name, suffix)
    }
}

/// How the inbound flow points at a leaf flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowReference {
    pub name: String,
    pub id: String,
}

impl FlowReference {
    /// Reference resolved by CloudFormation when the stack is created.
    pub fn for_stack(kind: FlowKind, tenant_name: &str) -> Self {
        Self {
            name: kind.flow_name(tenant_name),
            id: format!("${{{}.ContactFlowArn}}", kind.logical_id()),
        }
    }
}

/// Values the tokens are filled with.
#[derive(Debug, Clone)]
pub struct FlowContext {
    pub tenant_name: String,
    pub tts_voice: String,
    pub instance_arn: String,
    pub ivr: IvrMessages,
    /// Present when the survey flow is deployed.
    pub survey: Option<SurveyMessages>,
}

impl FlowContext {
    pub fn screenpop_tokens(&self) -> TokenMap {
        TokenMap::new()
            .with(token::ARN_PREFIX, arn_prefix(&self.instance_arn))
            .with(token::QUEUE_NAME, queue_name(&self.tenant_name))
    }

    pub fn survey_tokens(&self, survey: &SurveyMessages) -> TokenMap {
        TokenMap::new()
            .with(token::VOICE, self.tts_voice.as_str())
            .with(token::SURVEY_MESSAGE, survey.survey_message.as_str())
            .with(token::SURVEY_FEEDBACK, survey.survey_message_feedback.as_str())
    }

    pub fn inbound_tokens(
        &self,
        screenpop: Option<&FlowReference>,
        survey: Option<&FlowReference>,
    ) -> TokenMap {
        let mut tokens = TokenMap::new()
            .with(token::QUEUE_NAME, queue_name(&self.tenant_name))
            .with(token::CONTACT_NAME, self.tenant_name.as_str())
            .with(token::VOICE, self.tts_voice.as_str())
            .with(token::WELCOME_MESSAGE, self.ivr.welcome_message.as_str())
            .with(token::OPEN_HOUR_MESSAGE, self.ivr.open_hour_message.as_str())
            .with(token::ERROR_MESSAGE, self.ivr.error_message.as_str())
            .with(token::QUEUE_ARN, QUEUE_ARN_REFERENCE);

        if let Some(reference) = screenpop {
            tokens.insert(token::SCREENPOP_FLOW_NAME, reference.name.as_str());
            tokens.insert(token::SCREENPOP_FLOW_ID, reference.id.as_str());
        }
        if let Some(reference) = survey {
            tokens.insert(token::SURVEY_FLOW_NAME, reference.name.as_str());
            tokens.insert(token::SURVEY_FLOW_ID, reference.id.as_str());
        }
        tokens
    }
}

/// Working copies made by [`TemplateResolver::materialize`].
#[derive(Debug, Clone)]
pub struct MaterializedFlows {
    pub inbound_template: InboundTemplate,
    pub inbound: PathBuf,
    pub survey: Option<PathBuf>,
    pub screenpop: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct ResolvedFlow {
    pub kind: FlowKind,
    pub name: String,
    pub path: PathBuf,
    /// Compact JSON.
    pub content: String,
}

#[derive(Debug, Clone)]
pub struct ResolvedFlows {
    pub screenpop: Option<ResolvedFlow>,
    pub survey: Option<ResolvedFlow>,
    pub inbound: ResolvedFlow,
}

/// Copies templates into a working directory and resolves their tokens.
#[derive(Debug, Clone)]
pub struct TemplateResolver {
    catalog: TemplateCatalog,
    store: ConfigStore,
}

impl TemplateResolver {
    pub fn new(catalog: TemplateCatalog, store: ConfigStore) -> Self {
        Self { catalog, store }
    }

    /// Copy the templates a feature set needs into the working directory.
    ///
    /// Leaf copies for disabled features are removed so a previous run's
    /// choices cannot leak into this one.
    pub fn materialize(&self, features: FeatureSet) -> Result<MaterializedFlows, FlowError> {
        let inbound_template = InboundTemplate::select(features);
        let inbound = self.copy_template(
            &self.catalog.inbound_template(inbound_template),
            FlowKind::Inbound,
        )?;

        let survey = if features.survey {
            Some(self.copy_template(&self.catalog.survey_flow_template(), FlowKind::Survey)?)
        } else {
            self.discard(FlowKind::Survey)?;
            None
        };

        let screenpop = if features.screen_pop {
            Some(self.copy_template(&self.catalog.screenpop_flow_template(), FlowKind::ScreenPop)?)
        } else {
            self.discard(FlowKind::ScreenPop)?;
            None
        };

        info!(template = %inbound_template, "Prepared contact flow templates");

        Ok(MaterializedFlows {
            inbound_template,
            inbound,
            survey,
            screenpop,
        })
    }

    fn copy_template(&self, source: &std::path::Path, kind: FlowKind) -> Result<PathBuf, FlowError> {
        if !source.exists() {
            return Err(FlowError::TemplateMissing(source.to_path_buf()));
        }
        Ok(self.store.copy_in(source, kind.working_file())?)
    }

    fn discard(&self, kind: FlowKind) -> Result<(), FlowError> {
        for file in [kind.working_file(), kind.resolved_file()] {
            let path = self.store.path(file);
            match std::fs::remove_file(&path) {
                Ok(()) => debug!(path = %path.display(), "Removed stale flow file"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(FlowError::io(path, e)),
            }
        }
        Ok(())
    }

    /// Resolve the screen-pop flow, if its working copy exists.
    pub fn resolve_screenpop(&self, ctx: &FlowContext) -> Result<Option<ResolvedFlow>, FlowError> {
        if !self.store.path(FlowKind::ScreenPop.working_file()).exists() {
            return Ok(None);
        }
        self.resolve(FlowKind::ScreenPop, ctx, &ctx.screenpop_tokens())
            .map(Some)
    }

    /// Resolve the survey flow, if its working copy exists and the context
    /// carries survey messages.
    pub fn resolve_survey(&self, ctx: &FlowContext) -> Result<Option<ResolvedFlow>, FlowError> {
        let Some(survey) = &ctx.survey else {
            return Ok(None);
        };
        if !self.store.path(FlowKind::Survey.working_file()).exists() {
            return Ok(None);
        }
        self.resolve(FlowKind::Survey, ctx, &ctx.survey_tokens(survey))
            .map(Some)
    }

    /// Resolve the inbound flow against already-resolved leaf flows.
    pub fn resolve_inbound(
        &self,
        ctx: &FlowContext,
        screenpop: Option<&FlowReference>,
        survey: Option<&FlowReference>,
    ) -> Result<ResolvedFlow, FlowError> {
        self.resolve(FlowKind::Inbound, ctx, &ctx.inbound_tokens(screenpop, survey))
    }

    /// Resolve every flow in dependency order.
    pub fn resolve_all(&self, ctx: &FlowContext) -> Result<ResolvedFlows, FlowError> {
        let screenpop = self.resolve_screenpop(ctx)?;
        let survey = self.resolve_survey(ctx)?;

        let screenpop_ref = screenpop
            .as_ref()
            .map(|_| FlowReference::for_stack(FlowKind::ScreenPop, &ctx.tenant_name));
        let survey_ref = survey
            .as_ref()
            .map(|_| FlowReference::for_stack(FlowKind::Survey, &ctx.tenant_name));

        let inbound = self.resolve_inbound(ctx, screenpop_ref.as_ref(), survey_ref.as_ref())?;

        Ok(ResolvedFlows {
            screenpop,
            survey,
            inbound,
        })
    }

    fn resolve(
        &self,
        kind: FlowKind,
        ctx: &FlowContext,
        tokens: &TokenMap,
    ) -> Result<ResolvedFlow, FlowError> {
        let source = self.store.path(kind.working_file());
        let raw = self.store.read_raw(kind.working_file())?;
        let template: Value = serde_json::from_str(&raw).map_err(|e| FlowError::Malformed {
            path: source.clone(),
            source: e,
        })?;

        let resolved = substitute_json(&template, tokens);
        let content = serde_json::to_string(&resolved).map_err(|e| FlowError::Malformed {
            path: source,
            source: e,
        })?;
        let path = self.store.write_raw(kind.resolved_file(), &content)?;

        debug!(
            flow = kind.working_file(),
            tokens = tokens.len(),
            output = %path.display(),
            "Resolved contact flow"
        );

        Ok(ResolvedFlow {
            kind,
            name: kind.flow_name(&ctx.tenant_name),
            path,
            content,
        })
    }
}
