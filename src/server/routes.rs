//! Router and handlers. Handlers only parse, call the engine and format.

use axum::{
    extract::State,
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Extension, Json, Router,
};
use homebase_core::{PullRequest, PullResponse, PushRequest, PushResponse};
use serde::Serialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

use super::{auth_middleware, ApiKeyStore, AuthUser};
use crate::sync::{SyncEngine, SyncError};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub engine: SyncEngine,
    pub api_keys: Arc<ApiKeyStore>,
    /// Cancelled when the server shuts down; in-flight calls stop early.
    pub shutdown: CancellationToken,
}

pub fn router(state: AppState) -> Router {
    // Public routes (no auth)
    let public_routes = Router::new().route("/health", get(health));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/sync/pull", post(pull))
        .route("/sync/push", post(push))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Health check response
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// Health check endpoint (no auth required)
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn pull(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<PullRequest>,
) -> Result<Json<PullResponse>, ApiError> {
    let cancel = state.shutdown.child_token();
    let response = state.engine.pull(&user, &request, &cancel).await?;
    Ok(Json(response))
}

async fn push(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<PushRequest>,
) -> Result<Json<PushResponse>, ApiError> {
    let cancel = state.shutdown.child_token();
    let response = state.engine.push(&user, &request, &cancel).await?;
    Ok(Json(response))
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

/// A sync failure rendered as `{error, message}` JSON.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    error: &'static str,
    message: String,
}

impl From<SyncError> for ApiError {
    fn from(err: SyncError) -> Self {
        let (status, error) = match &err {
            SyncError::Cancelled => (StatusCode::SERVICE_UNAVAILABLE, "cancelled"),
            SyncError::UnknownEntityKind(_)
            | SyncError::UnsupportedKind(_)
            | SyncError::Decode(_) => (StatusCode::BAD_REQUEST, "invalid_entry"),
            SyncError::Storage(_) | SyncError::CorruptLedger { .. } => {
                tracing::error!("Sync call failed: {}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, "storage_error")
            }
        };
        Self {
            status,
            error,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorBody {
                error: self.error,
                message: self.message,
            }),
        )
            .into_response()
    }
}
