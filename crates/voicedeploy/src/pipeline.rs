//! The deployment steps shared by the wizard, `destroy` and the web form.

use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use voicedeploy_flows::{
    FeatureSet, FlowContext, FlowKind, InboundTemplate, MaterializedFlows, ResolvedFlows,
    TemplateCatalog, TemplateResolver,
};
use voicedeploy_logging::{default_log_path, LogEvent, LogFormat, Logger};
use voicedeploy_stack::{
    create_tool, InfraTool, Operation, StackDriver, StackError, StackInputs, StackOutcome,
    StackStatusSource, StackTemplate, ToolConfig,
};
use voicedeploy_store::{
    save_to, ConfigStore, DeployParameters, Document, HoursOfOperation, InstanceReference,
    IvrMessages, SecurityProfileReference, SurveyMessages, TenantConfig, ROSTER_FILE,
};

use crate::config::Settings;

/// Instance written for a CDK teardown when none is cached
const PLACEHOLDER_INSTANCE_ARN: &str = "arn:aws:connect:us-east-1:000000000000:instance/placeholder";

pub struct Pipeline {
    store: ConfigStore,
    catalog: TemplateCatalog,
    settings: Settings,
    status: Arc<dyn StackStatusSource>,
}

impl Pipeline {
    pub fn new(settings: Settings, status: Arc<dyn StackStatusSource>) -> Self {
        Self {
            store: ConfigStore::new(&settings.working_dir),
            catalog: TemplateCatalog::new(&settings.templates_dir),
            settings,
            status,
        }
    }

    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    pub fn catalog(&self) -> &TemplateCatalog {
        &self.catalog
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn tool(&self) -> Box<dyn InfraTool> {
        create_tool(self.settings.tool)
    }

    fn resolver(&self) -> TemplateResolver {
        TemplateResolver::new(self.catalog.clone(), self.store.clone())
    }

    /// Copy the regional hours template. Unless `replace` is set, hours
    /// already on disk (e.g. an uploaded file) are kept.
    pub fn seed_hours(&self, region: &str, replace: bool) -> Result<HoursOfOperation> {
        if replace || !self.store.exists::<HoursOfOperation>() {
            let source = self.catalog.hours_template(region);
            self.store
                .copy_in(&source, HoursOfOperation::FILE_NAME)
                .with_context(|| format!("Failed to copy hours template {}", source.display()))?;
        }
        Ok(self.store.load()?)
    }

    /// Write the region's IVR messages.
    pub fn seed_ivr_messages(&self, region: &str) -> Result<IvrMessages> {
        let messages = self.catalog.ivr_messages(region)?;
        self.store.save(&messages)?;
        Ok(messages)
    }

    /// Write the region's survey messages.
    pub fn seed_survey_messages(&self, region: &str) -> Result<SurveyMessages> {
        let messages = self.catalog.survey_messages(region)?;
        self.store.save(&messages)?;
        Ok(messages)
    }

    /// Copy the sample roster unless the working directory has one.
    pub fn seed_agents(&self) -> Result<bool> {
        if self.store.path(ROSTER_FILE).exists() {
            return Ok(false);
        }
        let sample = self.catalog.sample_agents();
        if !sample.exists() {
            warn!(path = %sample.display(), "No sample agent roster to copy");
            return Ok(false);
        }
        self.store.copy_in(&sample, ROSTER_FILE)?;
        Ok(true)
    }

    /// Copy the flow templates the tenant's features need.
    pub fn prepare_flows(&self, features: FeatureSet, logger: &Logger) -> Result<MaterializedFlows> {
        let flows = self.resolver().materialize(features)?;
        logger.log(&LogEvent::FlowsPrepared {
            template: flows.inbound_template.to_string(),
            screen_pop: features.screen_pop,
            survey: features.survey,
        });
        Ok(flows)
    }

    /// Assemble the deploy parameters from the saved documents.
    pub fn parameters(&self) -> Result<DeployParameters> {
        let tenant: TenantConfig = self
            .store
            .load()
            .context("No saved tenant configuration")?;
        let ivr: IvrMessages = self.store.load().context("No saved IVR messages")?;
        let survey = if tenant.deploy_survey_flow {
            Some(
                self.store
                    .load::<SurveyMessages>()
                    .context("Survey flow is enabled but no survey messages are saved")?,
            )
        } else {
            None
        };
        Ok(DeployParameters::new(&tenant, ivr, survey))
    }

    /// Prepare everything the tool reads for a deploy: flow copies, resolved
    /// flows and, when the tool takes one, the CloudFormation template.
    pub fn build(
        &self,
        params: &DeployParameters,
        tool: &dyn InfraTool,
        logger: &Logger,
    ) -> Result<ToolConfig> {
        let features = FeatureSet::new(params.deploy_screen_flow, params.deploy_survey_flow);
        self.prepare_flows(features, logger)?;

        if !self.store.exists::<HoursOfOperation>() {
            let fallback = self.catalog.fallback_hours_template();
            warn!(path = %fallback.display(), "No hours of operation saved, using the default template");
            self.store
                .copy_in(&fallback, HoursOfOperation::FILE_NAME)
                .context("Failed to copy the default hours template")?;
        }

        let instance: InstanceReference = self
            .store
            .load()
            .context("No Connect instance recorded. Verify the instance first")?;

        let flows = self.resolve_flows(params, &instance, logger)?;

        let mut config = self.tool_config(params);
        if tool.needs_template() {
            let inputs = StackInputs::load(&self.store, &params.tenant_name, flows)?;
            let template = StackTemplate::synthesize(&inputs);
            let path = template.write(self.store.dir())?;
            logger.log(&LogEvent::TemplateSynthesized {
                path: path.clone(),
                resources: template.resource_count(),
            });
            config = config.with_template_file(path);
        }
        Ok(config)
    }

    /// The tool runs against the same account and region as the lookups.
    fn tool_config(&self, params: &DeployParameters) -> ToolConfig {
        let mut config = ToolConfig::new(self.store.dir(), params);
        if let Some(region) = &self.settings.region {
            config = config
                .with_env("AWS_REGION", region)
                .with_env("AWS_DEFAULT_REGION", region);
        }
        if let Some(profile) = &self.settings.profile {
            config = config.with_env("AWS_PROFILE", profile);
        }
        config
    }

    fn resolve_flows(
        &self,
        params: &DeployParameters,
        instance: &InstanceReference,
        logger: &Logger,
    ) -> Result<ResolvedFlows> {
        let ctx = FlowContext {
            tenant_name: params.tenant_name.clone(),
            tts_voice: params.tts_voice.clone(),
            instance_arn: instance.arn.clone(),
            ivr: params.ivr.clone(),
            survey: params.survey.clone(),
        };
        let flows = self.resolver().resolve_all(&ctx)?;

        for flow in [&flows.screenpop, &flows.survey]
            .into_iter()
            .flatten()
            .chain(std::iter::once(&flows.inbound))
        {
            logger.log(&LogEvent::FlowResolved {
                name: flow.name.clone(),
                path: flow.path.clone(),
            });
        }
        Ok(flows)
    }

    /// Tool config for a teardown. A CDK app synthesizes its stack before
    /// destroying it, so missing inputs are stood in for; the returned paths
    /// are those placeholders, to be removed afterwards.
    pub fn prepare_destroy(
        &self,
        params: &DeployParameters,
        tool: &dyn InfraTool,
    ) -> Result<(ToolConfig, Vec<PathBuf>)> {
        let config = self.tool_config(params);
        if tool.needs_template() {
            return Ok((config, Vec::new()));
        }

        let mut created = Vec::new();
        let instance = InstanceReference {
            id: "placeholder".to_string(),
            arn: PLACEHOLDER_INSTANCE_ARN.to_string(),
        };
        let profile = SecurityProfileReference {
            id: "placeholder".to_string(),
            arn: format!("{}/security-profile/placeholder", PLACEHOLDER_INSTANCE_ARN),
            name: "Agent".to_string(),
        };
        self.write_placeholder(&instance, &mut created)?;
        self.write_placeholder(&profile, &mut created)?;
        self.write_placeholder(&params.tenant_config(), &mut created)?;

        if !self.store.exists::<HoursOfOperation>() {
            let source = self.catalog.hours_template(voicedeploy_flows::DEFAULT_REGION);
            if source.exists() {
                created.push(self.store.copy_in(&source, HoursOfOperation::FILE_NAME)?);
            }
        }
        if !self.store.exists::<IvrMessages>() {
            let messages = self.catalog.ivr_messages(voicedeploy_flows::DEFAULT_REGION)?;
            created.push(self.store.save(&messages)?);
        }

        let inbound = FlowKind::Inbound.working_file();
        if !self.store.path(inbound).exists() {
            let source = self.catalog.inbound_template(InboundTemplate::WelcomeOnly);
            created.push(
                self.store
                    .copy_in(&source, inbound)
                    .with_context(|| format!("Failed to copy {}", source.display()))?,
            );
        }

        Ok((config, created))
    }

    fn write_placeholder<D: Document>(&self, document: &D, created: &mut Vec<PathBuf>) -> Result<()> {
        let path = self.store.path_of::<D>();
        if !path.exists() {
            save_to(document, &path)?;
            created.push(path);
        }
        Ok(())
    }

    pub fn remove_placeholders(&self, created: &[PathBuf]) {
        for path in created {
            if let Err(e) = std::fs::remove_file(path) {
                warn!(path = %path.display(), error = %e, "Failed to remove placeholder");
            }
        }
    }

    /// Fail early, with install instructions, when the tool is not on PATH.
    pub async fn ensure_tool(&self, tool: &dyn InfraTool) -> Result<()> {
        if tool.is_available().await {
            return Ok(());
        }
        Err(StackError::ToolMissing {
            tool: tool.name().to_string(),
            hint: tool.install_hint().to_string(),
        }
        .into())
    }

    /// Launch the tool and watch the stack until it settles.
    pub async fn run(
        &self,
        tool: &dyn InfraTool,
        operation: Operation,
        config: &ToolConfig,
        logger: Arc<Logger>,
        interrupted: Arc<AtomicBool>,
    ) -> Result<StackOutcome> {
        info!(%operation, stack = %config.stack_name, tool = tool.name(), "Running stack operation");
        let driver = StackDriver::new(self.status.clone(), self.settings.poll, logger)
            .with_interrupt(interrupted);

        let mut handle = driver.submit(tool, operation, config).await?;
        let outcome = driver.wait(&mut handle).await?;
        Ok(outcome)
    }
}

/// Logger for one stack operation, also appending to a log file when the
/// logs directory is usable.
pub fn open_run_logger(format: LogFormat, operation: Operation, stack_name: &str) -> Arc<Logger> {
    let path = match default_log_path(&operation.to_string(), stack_name) {
        Ok(path) => path,
        Err(e) => {
            warn!(error = %e, "Logs directory unavailable, logging to the console only");
            return Arc::new(Logger::new(format));
        }
    };
    match Logger::with_file(format, &path) {
        Ok(logger) => {
            info!(path = %path.display(), "Writing run log");
            Arc::new(logger)
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to open run log");
            Arc::new(Logger::new(format))
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::path::Path;
    use tempfile::TempDir;
    use voicedeploy_stack::{CdkTool, CloudFormationTool, ToolKind, TEMPLATE_FILE};

    pub(crate) struct NeverListed;

    #[async_trait]
    impl StackStatusSource for NeverListed {
        async fn stack_status(&self, _stack_name: &str) -> Result<Option<String>, StackError> {
            Ok(None)
        }
    }

    pub(crate) fn bundled_templates() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("../../templates")
    }

    pub(crate) fn pipeline(dir: &Path, tool: ToolKind) -> Pipeline {
        let settings = Settings {
            working_dir: dir.to_path_buf(),
            templates_dir: bundled_templates(),
            tool,
            region: None,
            profile: None,
            poll: Default::default(),
        };
        Pipeline::new(settings, Arc::new(NeverListed))
    }

    pub(crate) fn save_tenant(pipeline: &Pipeline, screen_pop: bool, survey: bool) {
        let store = pipeline.store();
        store
            .save(&InstanceReference {
                id: "inst-1".to_string(),
                arn: "arn:aws:connect:us-east-1:123456789012:instance/inst-1".to_string(),
            })
            .unwrap();
        store
            .save(&SecurityProfileReference {
                id: "sp-1".to_string(),
                arn: "arn:aws:connect:us-east-1:123456789012:instance/inst-1/security-profile/sp-1"
                    .to_string(),
                name: "Agent".to_string(),
            })
            .unwrap();
        store
            .save(&TenantConfig {
                tenant_name: "Acme Support".to_string(),
                stack_name: None,
                tenant_description: "Test tenant".to_string(),
                tts_voice: "Matthew".to_string(),
                deploy_survey_flow: survey,
                deploy_screen_flow: screen_pop,
            })
            .unwrap();
        pipeline.seed_ivr_messages("us").unwrap();
        if survey {
            pipeline.seed_survey_messages("us").unwrap();
        }
    }

    #[test]
    fn test_parameters_from_saved_documents() {
        let dir = TempDir::new().unwrap();
        let pipeline = pipeline(dir.path(), ToolKind::CloudFormation);
        save_tenant(&pipeline, false, true);

        let params = pipeline.parameters().unwrap();
        assert_eq!(params.stack_name, "Acme-Support");
        assert!(params.survey.is_some());
        assert!(!params.ivr.welcome_message.is_empty());
    }

    #[test]
    fn test_parameters_require_survey_messages_when_enabled() {
        let dir = TempDir::new().unwrap();
        let pipeline = pipeline(dir.path(), ToolKind::CloudFormation);
        save_tenant(&pipeline, false, false);

        let mut tenant: TenantConfig = pipeline.store().load().unwrap();
        tenant.deploy_survey_flow = true;
        pipeline.store().save(&tenant).unwrap();

        assert!(pipeline.parameters().is_err());
    }

    #[test]
    fn test_build_synthesizes_template_for_cloudformation() {
        let dir = TempDir::new().unwrap();
        let pipeline = pipeline(dir.path(), ToolKind::CloudFormation);
        save_tenant(&pipeline, true, true);
        pipeline.seed_agents().unwrap();
        let logger = Logger::capturing();

        let params = pipeline.parameters().unwrap();
        let config = pipeline.build(&params, &CloudFormationTool::new(), &logger).unwrap();

        assert_eq!(config.template_file, dir.path().join(TEMPLATE_FILE));
        assert!(config.template_file.exists());
        // hours fell back to the default template
        assert!(dir.path().join("hours_of_operation.json").exists());

        let template: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&config.template_file).unwrap()).unwrap();
        let resources = template["Resources"].as_object().unwrap();
        assert!(resources.contains_key("ScreenPopFlow"));
        assert!(resources.contains_key("SurveyFlow"));
        assert!(resources.contains_key("Agent2"));

        let inbound = resources["InboundFlow"]["Properties"]["Content"]["Fn::Sub"]
            .as_str()
            .unwrap();
        assert!(inbound.contains("${Queue.QueueArn}"));
        assert!(inbound.contains("${ScreenPopFlow.ContactFlowArn}"));
        assert!(inbound.contains("${SurveyFlow.ContactFlowArn}"));
        assert!(inbound.contains("Matthew"));
        assert!(!inbound.contains("contact_queue_name"));

        let events = logger.history();
        assert!(events
            .iter()
            .any(|e| matches!(e, LogEvent::TemplateSynthesized { .. })));
    }

    #[test]
    fn test_build_for_cdk_skips_template() {
        let dir = TempDir::new().unwrap();
        let pipeline = pipeline(dir.path(), ToolKind::Cdk);
        save_tenant(&pipeline, false, false);

        let params = pipeline.parameters().unwrap();
        pipeline
            .build(&params, &CdkTool::new(), &Logger::capturing())
            .unwrap();

        assert!(!dir.path().join(TEMPLATE_FILE).exists());
        assert!(dir.path().join("inbound_flow_updated.json").exists());
        assert!(!dir.path().join("survey_message_flow.json").exists());
    }

    #[test]
    fn test_build_without_instance_fails() {
        let dir = TempDir::new().unwrap();
        let pipeline = pipeline(dir.path(), ToolKind::CloudFormation);
        save_tenant(&pipeline, false, false);
        std::fs::remove_file(dir.path().join("connect.json")).unwrap();

        let params = pipeline.parameters().unwrap();
        let err = pipeline
            .build(&params, &CloudFormationTool::new(), &Logger::capturing())
            .unwrap_err();
        assert!(err.to_string().contains("No Connect instance"));
    }

    #[test]
    fn test_cdk_destroy_placeholders_are_listed_and_removed() {
        let dir = TempDir::new().unwrap();
        let pipeline = pipeline(dir.path(), ToolKind::Cdk);
        let params = DeployParameters::for_destroy("Acme", "Acme");

        let (config, created) = pipeline.prepare_destroy(&params, &CdkTool::new()).unwrap();
        assert_eq!(config.stack_name, "Acme");
        assert!(created.contains(&dir.path().join("connect.json")));
        assert!(created.contains(&dir.path().join("inbound_flow.json")));
        assert!(created.iter().all(|p| p.exists()));

        pipeline.remove_placeholders(&created);
        assert!(created.iter().all(|p| !p.exists()));
    }

    #[test]
    fn test_cdk_destroy_keeps_existing_documents() {
        let dir = TempDir::new().unwrap();
        let pipeline = pipeline(dir.path(), ToolKind::Cdk);
        save_tenant(&pipeline, false, false);

        let params = DeployParameters::for_destroy("Acme", "Acme");
        let (_, created) = pipeline.prepare_destroy(&params, &CdkTool::new()).unwrap();
        assert!(!created.contains(&dir.path().join("connect.json")));
        assert!(!created.contains(&dir.path().join("environment_config.json")));
    }

    #[test]
    fn test_cdk_destroy_leaves_leaf_flows_alone() {
        let dir = TempDir::new().unwrap();
        let pipeline = pipeline(dir.path(), ToolKind::Cdk);
        save_tenant(&pipeline, true, true);
        pipeline.seed_hours("us", false).unwrap();
        pipeline
            .prepare_flows(FeatureSet::new(true, true), &Logger::capturing())
            .unwrap();
        std::fs::remove_file(dir.path().join("inbound_flow.json")).unwrap();

        let params = DeployParameters::for_destroy("Acme", "Acme");
        let (_, created) = pipeline.prepare_destroy(&params, &CdkTool::new()).unwrap();
        assert_eq!(created, vec![dir.path().join("inbound_flow.json")]);

        pipeline.remove_placeholders(&created);
        assert!(dir.path().join("survey_message_flow.json").exists());
        assert!(dir.path().join("screenpop_message_flow.json").exists());
    }

    #[test]
    fn test_cloudformation_destroy_needs_no_placeholders() {
        let dir = TempDir::new().unwrap();
        let pipeline = pipeline(dir.path(), ToolKind::CloudFormation);
        let params = DeployParameters::for_destroy("Acme", "Acme");

        let (_, created) = pipeline
            .prepare_destroy(&params, &CloudFormationTool::new())
            .unwrap();
        assert!(created.is_empty());
        assert!(!dir.path().join("connect.json").exists());
    }

    #[test]
    fn test_seed_agents_only_when_absent() {
        let dir = TempDir::new().unwrap();
        let pipeline = pipeline(dir.path(), ToolKind::CloudFormation);

        assert!(pipeline.seed_agents().unwrap());
        std::fs::write(dir.path().join(ROSTER_FILE), "Username,FirstName,LastName,Password\n").unwrap();
        assert!(!pipeline.seed_agents().unwrap());
        assert_eq!(
            std::fs::read_to_string(dir.path().join(ROSTER_FILE)).unwrap(),
            "Username,FirstName,LastName,Password\n"
        );
    }

    #[test]
    fn test_seed_hours_replace_follows_language() {
        let dir = TempDir::new().unwrap();
        let pipeline = pipeline(dir.path(), ToolKind::CloudFormation);

        let de = pipeline.seed_hours("de", true).unwrap();
        assert_eq!(de.time_zone, "Europe/Berlin");
        let ar = pipeline.seed_hours("ar", true).unwrap();
        assert_eq!(ar.time_zone, "Asia/Dubai");
        let saved: HoursOfOperation = pipeline.store().load().unwrap();
        assert_eq!(saved.time_zone, "Asia/Dubai");
    }

    #[test]
    fn test_seed_hours_keeps_uploaded_file() {
        let dir = TempDir::new().unwrap();
        let pipeline = pipeline(dir.path(), ToolKind::CloudFormation);

        let de = pipeline.seed_hours("de", false).unwrap();
        assert_eq!(de.time_zone, "Europe/Berlin");
        let again = pipeline.seed_hours("us", false).unwrap();
        assert_eq!(again.time_zone, "Europe/Berlin");
    }
}
