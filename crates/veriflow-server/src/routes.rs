//! Route table and handlers.

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use axum::Router;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use veriflow_core::{
    boundary_from_content_type, decode, EmailScanResult, LogEntry, MailboxScanner, RequestError,
    VerificationSession, VerificationWorkflow, VerifyConfig, WorkflowOutcome, DOCUMENT_FIELD,
};

/// Shared immutable state; cheap to clone per request.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<VerifyConfig>,
}

/// Build the full route table for one config.
///
/// The mailbox route is mounted only when credentials are configured, so an
/// unconfigured deployment 404s instead of half-working.
pub fn router(config: VerifyConfig) -> Router {
    let mailbox_enabled = config.mailbox.is_some();
    let state = AppState {
        config: Arc::new(config),
    };

    let mut app = Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/api/verify", get(verify_info).post(verify));

    if mailbox_enabled {
        app = app.route("/api/emails", get(scan_emails));
    }

    app.layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            ),
    )
    .with_state(state)
}

/// Terminal outcome plus the chronological run log.
#[derive(Serialize)]
struct VerifyResponse {
    #[serde(flatten)]
    outcome: WorkflowOutcome,
    logs: Vec<LogEntry>,
}

enum ApiError {
    BadRequest(String),
    Upstream(String),
    Internal,
}

impl From<RequestError> for ApiError {
    fn from(err: RequestError) -> Self {
        Self::BadRequest(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            Self::Upstream(message) => (StatusCode::BAD_GATEWAY, message),
            Self::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal error".to_string(),
            ),
        };
        let body = Json(json!({ "success": false, "message": message }));
        (status, body).into_response()
    }
}

async fn index() -> Json<serde_json::Value> {
    Json(json!({
        "service": "veriflow",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// Describes the POST contract for interactive exploration.
async fn verify_info() -> Json<serde_json::Value> {
    Json(json!({
        "method": "POST",
        "contentType": "multipart/form-data",
        "fields": ["verificationId", "firstName", "lastName", "email", "birthDate"],
        "document": DOCUMENT_FIELD,
    }))
}

/// Decode the multipart form, run the workflow, return outcome plus log.
///
/// The HTTP status reflects request validity only; a failed verification is
/// still a 200 with `success: false`.
async fn verify(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<VerifyResponse>, ApiError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    let boundary = boundary_from_content_type(content_type)
        .ok_or(RequestError::MissingBoundary)?
        .to_string();

    let parts = decode(&body, &boundary, DOCUMENT_FIELD);
    let session = VerificationSession::from_parts(&parts, state.config.max_upload_bytes)?;

    let workflow = VerificationWorkflow::new(&state.config).map_err(|err| {
        error!("could not construct service client: {err}");
        ApiError::Internal
    })?;

    info!(verification_id = %session.verification_id, "verification run started");
    let run = workflow.run(&session).await;
    info!(
        verification_id = %session.verification_id,
        success = run.outcome.success,
        "verification run finished"
    );

    Ok(Json(VerifyResponse {
        outcome: run.outcome,
        logs: run.log,
    }))
}

#[derive(Deserialize)]
struct ScanQuery {
    /// Look-back window in minutes.
    since: Option<u32>,
}

async fn scan_emails(
    State(state): State<AppState>,
    Query(query): Query<ScanQuery>,
) -> Result<Json<EmailScanResult>, ApiError> {
    let mailbox = state.config.mailbox.as_ref().ok_or_else(|| {
        ApiError::BadRequest("mailbox scan is not configured".to_string())
    })?;

    let scanner = MailboxScanner::new(mailbox);
    let result = scanner
        .scan(query.since.unwrap_or(10))
        .await
        .map_err(|err| ApiError::Upstream(err.to_string()))?;
    Ok(Json(result))
}
