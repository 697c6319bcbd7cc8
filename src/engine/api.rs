//! ClinAudit API Module
//! Shared endpoint server speaking the `{action, payload}` store contract

use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use utoipa::OpenApi;

use crate::engine::store::protocol::{
    Action, ApiRequest, ApiResponse, IdPayload, ItemPayload, ItemsPayload,
};
use crate::engine::store::{AuditStore, LocalStore, StoreError};

#[derive(Clone)]
pub struct ApiState {
    pub store: Arc<LocalStore>,
    /// Serializes writes so keyed load-modify-save cycles never interleave.
    write_lock: Arc<Mutex<()>>,
}

impl ApiState {
    pub fn new(store: LocalStore) -> Self {
        Self {
            store: Arc::new(store),
            write_lock: Arc::new(Mutex::new(())),
        }
    }
}

#[derive(Error, Debug)]
enum ApiError {
    #[error("Invalid payload: {0}")]
    BadPayload(String),
    #[error("{0}")]
    Store(#[from] StoreError),
}

#[derive(OpenApi)]
#[openapi(
    paths(exec),
    components(schemas(ApiRequest, ApiResponse)),
    tags(
        (name = "audits", description = "Audit collection contract"),
    )
)]
pub struct ApiDoc;

pub fn create_router(state: ApiState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", post(exec))
        .route("/exec", post(exec))
        .route("/api/health", get(health_check))
        .route("/api/openapi.json", get(openapi_spec))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

/// Bind `addr` and serve until Ctrl+C.
pub async fn serve(state: ApiState, addr: &str) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "endpoint server listening");
    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        warn!("could not listen for Ctrl+C; running until killed");
        std::future::pending::<()>().await;
    }
    info!("shutting down endpoint server");
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn openapi_spec() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// The body is read as text: clients post JSON with a `text/plain` type.
#[utoipa::path(
    post,
    path = "/exec",
    request_body(content = ApiRequest, content_type = "text/plain"),
    responses(
        (status = 200, description = "Action applied", body = ApiResponse),
        (status = 400, description = "Malformed request or unknown action", body = ApiResponse),
        (status = 500, description = "Storage failure", body = ApiResponse)
    ),
    tag = "audits"
)]
async fn exec(State(state): State<ApiState>, body: String) -> (StatusCode, Json<ApiResponse>) {
    let request: ApiRequest = match serde_json::from_str(&body) {
        Ok(request) => request,
        Err(err) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ApiResponse::failure(format!("Invalid request body: {}", err))),
            )
        }
    };

    let Some(action) = Action::parse(&request.action) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::failure(format!("Unknown action: {}", request.action))),
        );
    };

    match handle(&state, action, request.payload).await {
        Ok(response) => (StatusCode::OK, Json(response)),
        Err(err @ ApiError::BadPayload(_)) => (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::failure(err.to_string())),
        ),
        Err(err @ ApiError::Store(_)) => {
            warn!(action = action.as_str(), error = %err, "store action failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::failure(err.to_string())),
            )
        }
    }
}

async fn handle(state: &ApiState, action: Action, payload: Value) -> Result<ApiResponse, ApiError> {
    match action {
        Action::List => Ok(ApiResponse::with_items(state.store.load().await?)),
        Action::ReplaceAll => {
            let payload: ItemsPayload = parse_payload(payload)?;
            let _guard = state.write_lock.lock().await;
            state.store.save_all(&payload.items).await?;
            info!(count = payload.items.len(), "collection replaced");
            Ok(ApiResponse::success())
        }
        Action::Upsert => {
            let payload: ItemPayload = parse_payload(payload)?;
            let _guard = state.write_lock.lock().await;
            state.store.upsert(&payload.item).await?;
            info!(id = %payload.item.id, "record upserted");
            Ok(ApiResponse::success())
        }
        Action::Delete => {
            let payload: IdPayload = parse_payload(payload)?;
            let _guard = state.write_lock.lock().await;
            let deleted = state.store.delete(&payload.id).await?;
            info!(id = %payload.id, deleted, "record delete requested");
            Ok(ApiResponse::with_deleted(deleted))
        }
    }
}

fn parse_payload<T: DeserializeOwned>(payload: Value) -> Result<T, ApiError> {
    serde_json::from_value(payload).map_err(|err| ApiError::BadPayload(err.to_string()))
}
