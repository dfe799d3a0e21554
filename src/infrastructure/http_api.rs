// HTTP surface of the singleton document store:
// - GET/POST /api/document: read or upsert the whole document
// - POST /api/email: logging email stub
// - GET /api/health: liveness

use crate::domain::models::Document;
use crate::infrastructure::dashboard_client::{EmailRequest, EmailResponse};
use crate::infrastructure::document_repository::DocumentRepository;
use crate::infrastructure::error::InfraError;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;

#[derive(Clone)]
pub struct ApiState {
    pub repository: Arc<dyn DocumentRepository>,
}

impl ApiState {
    pub fn new(repository: Arc<dyn DocumentRepository>) -> Self {
        Self { repository }
    }
}

#[derive(Debug)]
pub struct ApiError(InfraError);

impl From<InfraError> for ApiError {
    fn from(error: InfraError) -> Self {
        Self(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            InfraError::Validation(_) => StatusCode::BAD_REQUEST,
            InfraError::NotFound(_) => StatusCode::NOT_FOUND,
            InfraError::AccessDenied(_) => StatusCode::FORBIDDEN,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        tracing::error!(status = status.as_u16(), error = %self.0, "api request failed");
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

/// Runs a repository call on the blocking pool; SQLite access is synchronous.
async fn with_repository<T, F>(state: &ApiState, call: F) -> Result<T, InfraError>
where
    T: Send + 'static,
    F: FnOnce(&dyn DocumentRepository) -> Result<T, InfraError> + Send + 'static,
{
    let repository = Arc::clone(&state.repository);
    tokio::task::spawn_blocking(move || call(repository.as_ref())).await?
}

pub fn router(state: ApiState) -> Router {
    let api = Router::new()
        .route("/document", get(get_document).post(put_document))
        .route("/email", post(send_email))
        .route("/health", get(health));

    Router::new().nest("/api", api).with_state(state)
}

// -----------------------------
// GET /api/document
// Creates the default document on first read
// -----------------------------
pub async fn get_document(State(state): State<ApiState>) -> Result<Json<Document>, ApiError> {
    let document = with_repository(&state, |repository| repository.load_or_create()).await?;
    tracing::debug!(
        events = document.events.len(),
        personnel = document.personnel.len(),
        projects = document.projects.len(),
        "document read"
    );
    Ok(Json(document))
}

// -----------------------------
// POST /api/document
// Last write wins; echoes what was stored
// -----------------------------
pub async fn put_document(
    State(state): State<ApiState>,
    Json(document): Json<Document>,
) -> Result<Json<Document>, ApiError> {
    let document = with_repository(&state, move |repository| {
        repository.save(&document, Utc::now())?;
        Ok(document)
    })
    .await?;
    tracing::info!(
        events = document.events.len(),
        personnel = document.personnel.len(),
        projects = document.projects.len(),
        "document saved"
    );
    Ok(Json(document))
}

pub async fn send_email(Json(request): Json<EmailRequest>) -> (StatusCode, Json<EmailResponse>) {
    if !request.to.contains('@') {
        tracing::warn!(to = %request.to, kind = request.kind.as_str(), "rejected email with invalid recipient");
        return (
            StatusCode::BAD_REQUEST,
            Json(EmailResponse {
                success: false,
                message: "Invalid email address".to_string(),
                kind: request.kind,
            }),
        );
    }

    tracing::info!(
        to = %request.to,
        subject = %request.subject,
        kind = request.kind.as_str(),
        "email queued (not delivered)"
    );
    (
        StatusCode::OK,
        Json(EmailResponse {
            success: true,
            message: format!("Email sent to {}", request.to),
            kind: request.kind,
        }),
    )
}

pub async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}
