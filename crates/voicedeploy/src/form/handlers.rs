use std::fmt::Display;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use voicedeploy_connect::{LookupError, PermissionUpdate};
use voicedeploy_flows::{region_for_language, FeatureSet, InboundTemplate, DEFAULT_REGION};
use voicedeploy_logging::{LogEvent, Logger};
use voicedeploy_stack::{Operation, StackOutcome, ToolConfig};
use voicedeploy_store::{
    clear_form_files, stack_name_for, AgentRecord, AgentRoster, DeployParameters,
    HoursOfOperation, InstanceReference, IvrMessages, SecurityProfileReference, SurveyMessages,
    TenantConfig, ROSTER_FILE,
};

use super::AppState;
use crate::destroy::target_for;

type ApiError = (StatusCode, String);
type ApiResult<T> = Result<Json<T>, ApiError>;

fn internal(e: impl Display) -> ApiError {
    (StatusCode::INTERNAL_SERVER_ERROR, format!("{:#}", e))
}

fn bad_request(e: impl Display) -> ApiError {
    (StatusCode::BAD_REQUEST, format!("{:#}", e))
}

fn lookup_error(e: LookupError) -> ApiError {
    let status = match &e {
        LookupError::InvalidIdentifier(_) => StatusCode::BAD_REQUEST,
        LookupError::ProfileNotFound { .. } => StatusCode::NOT_FOUND,
        LookupError::LookupFailed { .. } => StatusCode::BAD_GATEWAY,
        LookupError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, e.to_string())
}

fn require(field: &str, value: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(bad_request(format!("{} cannot be empty", field)));
    }
    Ok(())
}

// ============================================================================
// Operation tracking
// ============================================================================

/// A deploy or destroy started from the form.
pub struct OperationRecord {
    operation: Operation,
    stack_name: String,
    started_at: DateTime<Utc>,
    logger: Arc<Logger>,
    result: Option<Result<StackOutcome, String>>,
}

impl OperationRecord {
    fn new(operation: Operation, stack_name: &str, logger: Arc<Logger>) -> Self {
        Self {
            operation,
            stack_name: stack_name.to_string(),
            started_at: Utc::now(),
            logger,
            result: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.result.is_none()
    }

    fn status(&self) -> OperationStatus {
        let (outcome, error) = match &self.result {
            Some(Ok(outcome)) => (Some(outcome.clone()), None),
            Some(Err(message)) => (None, Some(message.clone())),
            None => (None, None),
        };
        OperationStatus {
            operation: self.operation,
            stack_name: self.stack_name.clone(),
            started_at: self.started_at,
            running: self.is_running(),
            outcome,
            error,
            events: self.logger.history(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationStatus {
    pub operation: Operation,
    pub stack_name: String,
    pub started_at: DateTime<Utc>,
    pub running: bool,
    pub outcome: Option<StackOutcome>,
    pub error: Option<String>,
    pub events: Vec<LogEvent>,
}

fn spawn_operation(
    state: &AppState,
    operation: Operation,
    config: ToolConfig,
    logger: Arc<Logger>,
    placeholders: Vec<PathBuf>,
) {
    let pipeline = state.pipeline.clone();
    let slot = state.operation.clone();

    tokio::spawn(async move {
        let tool = pipeline.tool();
        let result = pipeline
            .run(
                tool.as_ref(),
                operation,
                &config,
                logger,
                Arc::new(AtomicBool::new(false)),
            )
            .await;
        pipeline.remove_placeholders(&placeholders);

        let result = result.map_err(|e| {
            error!(%operation, error = %e, "Stack operation failed");
            format!("{:#}", e)
        });
        if let Some(record) = slot.lock().await.as_mut() {
            record.result = Some(result);
        }
    });
}

// ============================================================================
// Page and state
// ============================================================================

pub async fn index() -> Html<&'static str> {
    Html(include_str!("page.html"))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormState {
    pub instance: Option<InstanceReference>,
    pub security_profile: Option<SecurityProfileReference>,
    pub tenant: Option<TenantConfig>,
    pub ivr_messages: IvrMessages,
    pub survey_messages: SurveyMessages,
    pub hours: Option<HoursOfOperation>,
    pub agents: Vec<AgentRecord>,
    pub tool: String,
    pub working_dir: PathBuf,
}

/// Everything saved so far, with the default region's messages standing in
/// for ones not yet written.
pub async fn get_state(State(state): State<AppState>) -> ApiResult<FormState> {
    let pipeline = &state.pipeline;
    let store = pipeline.store();
    let catalog = pipeline.catalog();

    let ivr_messages = match store.load_optional::<IvrMessages>().map_err(internal)? {
        Some(messages) => messages,
        None => catalog.ivr_messages(DEFAULT_REGION).unwrap_or_default(),
    };
    let survey_messages = match store.load_optional::<SurveyMessages>().map_err(internal)? {
        Some(messages) => messages,
        None => catalog.survey_messages(DEFAULT_REGION).unwrap_or_default(),
    };

    let roster_path = store.path(ROSTER_FILE);
    let agents = if roster_path.exists() {
        match AgentRoster::read(&roster_path) {
            Ok(roster) => roster.records().to_vec(),
            Err(e) => {
                warn!(error = %e, "Saved agent roster is unreadable");
                Vec::new()
            }
        }
    } else {
        Vec::new()
    };

    Ok(Json(FormState {
        instance: store.load_optional().map_err(internal)?,
        security_profile: store.load_optional().map_err(internal)?,
        tenant: store.load_optional().map_err(internal)?,
        ivr_messages,
        survey_messages,
        hours: store.load_optional().map_err(internal)?,
        agents,
        tool: pipeline.settings().tool.to_string(),
        working_dir: pipeline.settings().working_dir.clone(),
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceEntry {
    pub voice: String,
    pub gender: String,
    pub is_default: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LanguageEntry {
    pub name: String,
    pub region: &'static str,
    pub voices: Vec<VoiceEntry>,
}

pub async fn list_languages(State(state): State<AppState>) -> ApiResult<Vec<LanguageEntry>> {
    let languages = state.pipeline.catalog().languages().map_err(internal)?;

    let entries = languages
        .names()
        .into_iter()
        .map(|name| LanguageEntry {
            name: name.to_string(),
            region: region_for_language(name),
            voices: languages
                .voices(name)
                .into_iter()
                .map(|v| VoiceEntry {
                    voice: v.voice.clone(),
                    gender: v.gender.clone(),
                    is_default: v.is_default,
                })
                .collect(),
        })
        .collect();

    Ok(Json(entries))
}

// ============================================================================
// Configuration steps
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceRequest {
    pub identifier: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceResponse {
    pub instance: InstanceReference,
    pub security_profile: SecurityProfileReference,
    pub permissions_applied: bool,
    /// Why the permission update was skipped, when it was.
    pub permissions_warning: Option<String>,
}

pub async fn verify_instance(
    State(state): State<AppState>,
    Json(request): Json<InstanceRequest>,
) -> ApiResult<InstanceResponse> {
    let lookup = &state.lookup;
    let instance = lookup
        .resolve_instance(&request.identifier)
        .await
        .map_err(lookup_error)?;
    let profile = lookup
        .resolve_security_profile(&instance)
        .await
        .map_err(lookup_error)?;

    let update = lookup.widen_permissions(&instance, &profile, &[]).await;
    let permissions_applied = update.is_applied();
    let permissions_warning = match update {
        PermissionUpdate::Applied(_) => None,
        PermissionUpdate::Degraded(reason) => Some(reason),
    };

    Ok(Json(InstanceResponse {
        permissions_applied,
        permissions_warning,
        instance,
        security_profile: profile,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigRequest {
    pub tenant_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub language: Option<String>,
    /// Empty picks the language's default voice.
    #[serde(default)]
    pub voice: String,
    #[serde(default)]
    pub screen_pop: bool,
    #[serde(default)]
    pub survey: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigResponse {
    pub tenant_name: String,
    pub stack_name: String,
    pub region: &'static str,
    pub inbound_template: String,
    pub agents_seeded: bool,
}

/// Save the tenant choices and seed the regional documents that are not on
/// disk yet. Messages already saved are kept.
pub async fn save_config(
    State(state): State<AppState>,
    Json(request): Json<ConfigRequest>,
) -> ApiResult<ConfigResponse> {
    require("Tenant name", &request.tenant_name)?;
    let pipeline = &state.pipeline;
    let store = pipeline.store();

    let (region, voice) = match request.language.as_deref().filter(|l| !l.trim().is_empty()) {
        Some(query) => {
            let languages = pipeline.catalog().languages().map_err(internal)?;
            let language = languages
                .find(query)
                .ok_or_else(|| bad_request(format!("Unknown language: {}", query)))?;

            let voice = if request.voice.trim().is_empty() {
                languages
                    .default_voice(language)
                    .map(|v| v.voice.clone())
                    .ok_or_else(|| bad_request(format!("No voices listed for {}", language)))?
            } else if languages.voices(language).iter().any(|v| v.voice == request.voice) {
                request.voice.clone()
            } else {
                return Err(bad_request(format!(
                    "Voice {} is not available for {}",
                    request.voice, language
                )));
            };
            (region_for_language(language), voice)
        }
        None => {
            require("Voice", &request.voice)?;
            (DEFAULT_REGION, request.voice.clone())
        }
    };

    let tenant_name = request.tenant_name.trim().to_string();
    let stack_name = stack_name_for(&tenant_name);
    let features = FeatureSet::new(request.screen_pop, request.survey);

    store
        .save(&TenantConfig {
            tenant_name: tenant_name.clone(),
            stack_name: Some(stack_name.clone()),
            tenant_description: request.description.trim().to_string(),
            tts_voice: voice,
            deploy_survey_flow: features.survey,
            deploy_screen_flow: features.screen_pop,
        })
        .map_err(internal)?;

    if !store.exists::<IvrMessages>() {
        pipeline.seed_ivr_messages(region).map_err(internal)?;
    }
    if features.survey {
        if !store.exists::<SurveyMessages>() {
            pipeline.seed_survey_messages(region).map_err(internal)?;
        }
    } else {
        store.remove::<SurveyMessages>().map_err(internal)?;
    }
    pipeline.seed_hours(region, false).map_err(internal)?;
    let agents_seeded = pipeline.seed_agents().map_err(internal)?;

    info!(tenant = %tenant_name, stack = %stack_name, region, "Tenant configuration saved");
    Ok(Json(ConfigResponse {
        tenant_name,
        stack_name,
        region,
        inbound_template: InboundTemplate::select(features).to_string(),
        agents_seeded,
    }))
}

pub async fn save_ivr_messages(
    State(state): State<AppState>,
    Json(messages): Json<IvrMessages>,
) -> ApiResult<IvrMessages> {
    require("Welcome message", &messages.welcome_message)?;
    require("Closed message", &messages.open_hour_message)?;
    require("Error message", &messages.error_message)?;
    state.pipeline.store().save(&messages).map_err(internal)?;
    Ok(Json(messages))
}

pub async fn save_survey_messages(
    State(state): State<AppState>,
    Json(messages): Json<SurveyMessages>,
) -> ApiResult<SurveyMessages> {
    require("Survey message", &messages.survey_message)?;
    require("Survey feedback", &messages.survey_message_feedback)?;
    state.pipeline.store().save(&messages).map_err(internal)?;
    Ok(Json(messages))
}

#[derive(Debug, Serialize)]
pub struct AgentsResponse {
    pub count: usize,
}

/// Replace `agents.csv` with the uploaded CSV body.
pub async fn upload_agents(State(state): State<AppState>, body: String) -> ApiResult<AgentsResponse> {
    let roster = AgentRoster::from_reader(body.as_bytes()).map_err(bad_request)?;
    if roster.is_empty() {
        return Err(bad_request("The roster has no agents"));
    }
    roster
        .write(&state.pipeline.store().path(ROSTER_FILE))
        .map_err(internal)?;
    Ok(Json(AgentsResponse {
        count: roster.len(),
    }))
}

pub async fn upload_hours(
    State(state): State<AppState>,
    Json(hours): Json<HoursOfOperation>,
) -> ApiResult<HoursOfOperation> {
    require("Time zone", &hours.time_zone)?;
    if hours.timeslices.is_empty() {
        return Err(bad_request("Hours of operation need at least one time slice"));
    }
    state.pipeline.store().save(&hours).map_err(internal)?;
    Ok(Json(hours))
}

#[derive(Debug, Serialize)]
pub struct ClearResponse {
    pub removed: Vec<String>,
}

pub async fn clear(State(state): State<AppState>) -> ApiResult<ClearResponse> {
    if running(&state).await {
        return Err(conflict());
    }
    let report = clear_form_files(state.pipeline.store().dir()).map_err(internal)?;
    let removed = report
        .removed
        .iter()
        .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        .collect();
    Ok(Json(ClearResponse { removed }))
}

// ============================================================================
// Stack operations
// ============================================================================

async fn running(state: &AppState) -> bool {
    state
        .operation
        .lock()
        .await
        .as_ref()
        .is_some_and(OperationRecord::is_running)
}

fn conflict() -> ApiError {
    (
        StatusCode::CONFLICT,
        "A deployment is already running".to_string(),
    )
}

pub async fn deploy(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<OperationStatus>), ApiError> {
    let mut slot = state.operation.lock().await;
    if slot.as_ref().is_some_and(OperationRecord::is_running) {
        return Err(conflict());
    }

    let pipeline = &state.pipeline;
    let tool = pipeline.tool();
    pipeline
        .ensure_tool(tool.as_ref())
        .await
        .map_err(|e| (StatusCode::PRECONDITION_FAILED, format!("{:#}", e)))?;

    let params = pipeline.parameters().map_err(bad_request)?;
    let logger = Arc::new(Logger::capturing());
    let config = pipeline
        .build(&params, tool.as_ref(), &logger)
        .map_err(bad_request)?;

    logger.log(&LogEvent::OperationStarted {
        operation: Operation::Deploy.to_string(),
        tenant_name: params.tenant_name.clone(),
        stack_name: params.stack_name.clone(),
        working_dir: pipeline.settings().working_dir.clone(),
    });

    let record = OperationRecord::new(Operation::Deploy, &params.stack_name, logger.clone());
    let status = record.status();
    *slot = Some(record);
    drop(slot);

    spawn_operation(&state, Operation::Deploy, config, logger, Vec::new());
    Ok((StatusCode::ACCEPTED, Json(status)))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DestroyRequest {
    #[serde(default)]
    pub tenant_name: Option<String>,
}

pub async fn destroy(
    State(state): State<AppState>,
    Json(request): Json<DestroyRequest>,
) -> Result<(StatusCode, Json<OperationStatus>), ApiError> {
    let mut slot = state.operation.lock().await;
    if slot.as_ref().is_some_and(OperationRecord::is_running) {
        return Err(conflict());
    }

    let pipeline = &state.pipeline;
    let saved = pipeline
        .store()
        .load_optional::<TenantConfig>()
        .map_err(internal)?;
    let tenant_name = request
        .tenant_name
        .filter(|name| !name.trim().is_empty())
        .or_else(|| saved.as_ref().map(|config| config.tenant_name.clone()))
        .ok_or_else(|| bad_request("No tenant saved; pass tenantName"))?;
    let target = target_for(&tenant_name, saved.as_ref());

    let tool = pipeline.tool();
    pipeline
        .ensure_tool(tool.as_ref())
        .await
        .map_err(|e| (StatusCode::PRECONDITION_FAILED, format!("{:#}", e)))?;

    let params = DeployParameters::for_destroy(&target.tenant_name, &target.stack_name);
    let (config, placeholders) = pipeline
        .prepare_destroy(&params, tool.as_ref())
        .map_err(internal)?;

    let logger = Arc::new(Logger::capturing());
    logger.log(&LogEvent::OperationStarted {
        operation: Operation::Destroy.to_string(),
        tenant_name: target.tenant_name.clone(),
        stack_name: target.stack_name.clone(),
        working_dir: pipeline.settings().working_dir.clone(),
    });

    let record = OperationRecord::new(Operation::Destroy, &target.stack_name, logger.clone());
    let status = record.status();
    *slot = Some(record);
    drop(slot);

    spawn_operation(&state, Operation::Destroy, config, logger, placeholders);
    Ok((StatusCode::ACCEPTED, Json(status)))
}

pub async fn get_operation(State(state): State<AppState>) -> Json<Option<OperationStatus>> {
    Json(
        state
            .operation
            .lock()
            .await
            .as_ref()
            .map(OperationRecord::status),
    )
}
