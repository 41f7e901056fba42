//! HTTP server.
//!
//! # Endpoints
//!
//! | Method | Path | Auth | Description |
//! |--------|------|------|-------------|
//! | `GET`  | `/` | no | Greeting |
//! | `GET`  | `/health` | no | Health check (returns version) |
//! | `POST` | `/ingest` | `X-API-KEY` | Multipart upload of one document |
//! | `POST` | `/ask` | `X-API-KEY` | Answer a question from the caller's documents |
//!
//! # Error Contract
//!
//! All error responses use one shape:
//!
//! ```json
//! { "error": { "code": "rate_limited", "message": "Rate limit exceeded for ask: 20 requests per 86400 seconds" } }
//! ```
//!
//! # Uploads
//!
//! `/ingest` expects a multipart form with a text field `user_email`
//! followed by a file field `file`. The identity may instead come from the
//! `X-User-Email` header. The body limit is disabled at the router so the
//! streamed size check in the validator is the only authority.

use axum::{
    extract::{
        multipart::{Field, Multipart},
        rejection::JsonRejection,
        DefaultBodyLimit, FromRef, State,
    },
    http::{header::CONTENT_LENGTH, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use futures_util::TryStreamExt;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio_util::io::StreamReader;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::auth::{ApiKey, ApiKeyGuard};
use crate::config::Config;
use crate::error::ServiceError;
use crate::intake::IntakeOutcome;
use crate::services::AppServices;
use crate::validate::UploadRequest;

pub const USER_EMAIL_HEADER: &str = "x-user-email";

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub services: AppServices,
    pub api_key: ApiKey,
}

impl FromRef<AppState> for ApiKey {
    fn from_ref(state: &AppState) -> Self {
        state.api_key.clone()
    }
}

/// Starts the HTTP server on `[server].bind` and runs until the process
/// is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let services = AppServices::from_config(config).await?;
    let state = AppState {
        services,
        api_key: ApiKey::from_env(&config.server.api_key_env),
    };

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    tracing::info!("listening on http://{}", config.server.bind);
    axum::serve(listener, router(state)).await?;
    Ok(())
}

/// Build the router. Exposed for tests.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handle_root))
        .route("/health", get(handle_health))
        .route(
            "/ingest",
            post(handle_ingest).layer(DefaultBodyLimit::disable()),
        )
        .route("/ask", post(handle_ask))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    /// Machine-readable error code (e.g., `"bad_request"`, `"rate_limited"`).
    code: String,
    message: String,
}

/// Error type that converts into an Axum HTTP response.
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        AppError {
            status: err.status(),
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    ServiceError::BadRequest(message.into()).into()
}

// ============ GET / and /health ============

async fn handle_root() -> Json<serde_json::Value> {
    Json(json!({ "message": "Hello, World!" }))
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ POST /ingest ============

async fn handle_ingest(
    _guard: ApiKeyGuard,
    State(state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<serde_json::Value>, AppError> {
    let declared_content_length = headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok());
    let mut identity = headers
        .get(USER_EMAIL_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(format!("Invalid multipart body: {}", e)))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("user_email") => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| bad_request(format!("Invalid user_email field: {}", e)))?;
                identity = Some(value);
            }
            Some("file") => {
                let user_identity = identity
                    .take()
                    .ok_or_else(|| bad_request("user_email is required before the file part"))?;
                let request = UploadRequest {
                    content_type: field.content_type().map(str::to_string),
                    declared_content_length,
                    filename: field.file_name().map(str::to_string),
                    user_identity,
                };
                let outcome = ingest_field(&state, request, field).await?;
                return Ok(Json(render_outcome(outcome)));
            }
            _ => {}
        }
    }

    Err(bad_request("file is required"))
}

async fn ingest_field(
    state: &AppState,
    request: UploadRequest,
    field: Field<'_>,
) -> Result<IntakeOutcome, AppError> {
    let stream = field.map_err(|e| std::io::Error::other(e));
    let reader = StreamReader::new(stream);
    tokio::pin!(reader);
    Ok(state.services.intake.handle(request, &mut reader).await?)
}

/// JSON body for a completed upload.
pub fn render_outcome(outcome: IntakeOutcome) -> serde_json::Value {
    match outcome {
        IntakeOutcome::Ingested { filename, summary } => json!({
            "filename": filename,
            "message": "PDF file ingested successfully",
            "metadata": summary,
        }),
        IntakeOutcome::Unsupported { filename } => json!({
            "filename": filename,
            "error": "File type not supported",
        }),
    }
}

// ============ POST /ask ============

#[derive(Deserialize)]
struct AskRequest {
    query: String,
    user_email: String,
}

#[derive(Serialize)]
struct AskResponse {
    answer: String,
}

async fn handle_ask(
    _guard: ApiKeyGuard,
    State(state): State<AppState>,
    body: Result<Json<AskRequest>, JsonRejection>,
) -> Result<Json<AskResponse>, AppError> {
    let Json(req) = body.map_err(|e| bad_request(e.body_text()))?;
    let answer = state
        .services
        .query
        .handle(&req.query, &req.user_email)
        .await?;
    Ok(Json(AskResponse { answer }))
}
