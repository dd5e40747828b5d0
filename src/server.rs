//! HTTP front end for the save handler.
//!
//! Lets the action group reach [`SaveHandler`] over plain HTTP, for
//! example from a container or a local test harness instead of a
//! serverless runtime.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/invoke` | Run the save handler on an action event |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! A rejected event (missing content) answers `400` with the handler's own
//! `{ "statusCode": 400, "body": "..." }` object. A body that is not an
//! action event answers `400` with
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "..." } }
//! ```
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::aws::{BedrockAgentClient, Credentials, S3Client};
use crate::config::Config;
use crate::save_handler::{ActionEvent, HandlerOutcome, SaveHandler, SaveSettings};
use crate::upload::SystemClock;

#[derive(Clone)]
struct AppState {
    handler: Arc<SaveHandler>,
}

/// Start the server on `[server].bind` with AWS-backed collaborators.
///
/// Runs until the process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let creds = Credentials::resolve(config)?;
    let store = Arc::new(S3Client::new(config, creds.clone())?);
    let admin = Arc::new(BedrockAgentClient::new(config, creds)?);
    let handler = SaveHandler::new(
        store,
        admin,
        Arc::new(SystemClock),
        SaveSettings::from_config(config),
    );

    let bind_addr = config.server.bind.clone();
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    println!("Save handler listening on http://{}", bind_addr);
    tracing::info!(%bind_addr, "server started");

    axum::serve(listener, router(Arc::new(handler))).await?;
    Ok(())
}

/// Routes for a given handler.
pub fn router(handler: Arc<SaveHandler>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/invoke", post(handle_invoke))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(AppState { handler })
}

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: String,
    message: String,
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

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
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

async fn handle_invoke(
    State(state): State<AppState>,
    Json(body): Json<serde_json::Value>,
) -> Result<Response, AppError> {
    let event: ActionEvent = serde_json::from_value(body)
        .map_err(|e| bad_request(format!("invalid action event: {}", e)))?;

    let outcome = state.handler.handle(&event).await;
    let status = match outcome {
        HandlerOutcome::Rejected { status_code, .. } => {
            StatusCode::from_u16(status_code).unwrap_or(StatusCode::BAD_REQUEST)
        }
        HandlerOutcome::Responded(_) => StatusCode::OK,
    };
    Ok((status, Json(outcome.to_json())).into_response())
}
