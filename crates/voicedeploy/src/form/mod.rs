mod handlers;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;

use voicedeploy_connect::RemoteLookup;

use crate::pipeline::Pipeline;

pub use handlers::OperationRecord;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    pub lookup: Arc<RemoteLookup>,
    /// The single deploy/destroy the form may run at a time.
    pub operation: Arc<Mutex<Option<OperationRecord>>>,
}

impl AppState {
    pub fn new(pipeline: Arc<Pipeline>, lookup: Arc<RemoteLookup>) -> Self {
        Self {
            pipeline,
            lookup,
            operation: Arc::new(Mutex::new(None)),
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/api/state", get(handlers::get_state))
        .route("/api/languages", get(handlers::list_languages))
        .route("/api/instance", post(handlers::verify_instance))
        .route("/api/config", post(handlers::save_config))
        .route("/api/messages/ivr", post(handlers::save_ivr_messages))
        .route("/api/messages/survey", post(handlers::save_survey_messages))
        .route("/api/agents", post(handlers::upload_agents))
        .route("/api/hours", post(handlers::upload_hours))
        .route("/api/clear", post(handlers::clear))
        .route("/api/deploy", post(handlers::deploy))
        .route("/api/destroy", post(handlers::destroy))
        .route("/api/operation", get(handlers::get_operation))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
