use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::{MatchedPath, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use shared::{
    domain::{self, TerrainMap},
    error::{ApiError, ErrorCode},
    parser,
    protocol::{DescriptionResponse, InstructionRequest, StatusResponse},
};
use tower_http::limit::RequestBodyLimitLayer;
use tracing::{error, info, warn};

mod auth;
mod config;
mod llm;

use config::{load_settings, validate_settings, PipelineKind, Settings};
use llm::{LlmClient, LlmConfig};

const MAX_BODY_BYTES: usize = 16 * 1024;
const APIKEY_HEADER: &str = "apikey";

#[derive(Clone)]
struct AppState {
    terrain: TerrainMap,
    access_key: String,
    pipeline: PipelineKind,
    llm: Option<LlmClient>,
}

impl AppState {
    fn from_settings(settings: &Settings) -> Self {
        let llm = match settings.pipeline {
            PipelineKind::Remote => settings.llm_api_key.as_ref().map(|api_key| {
                LlmClient::new(LlmConfig {
                    endpoint: settings.llm_endpoint.clone(),
                    model: settings.llm_model.clone(),
                    api_key: api_key.clone(),
                })
            }),
            PipelineKind::Local => None,
        };
        Self {
            terrain: TerrainMap::default(),
            access_key: settings.access_key.clone(),
            pipeline: settings.pipeline,
            llm,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let settings = load_settings();
    validate_settings(&settings)?;

    let state = AppState::from_settings(&settings);
    let app = build_router(Arc::new(state));

    let addr: SocketAddr = settings.server_bind.parse()?;
    info!(%addr, pipeline = ?settings.pipeline, "map service listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/healthz", get(healthz))
        .route("/map", post(describe_map))
        .route("/map/", post(describe_map))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .with_state(state)
}

async fn root() -> Json<StatusResponse> {
    Json(StatusResponse {
        message: "map service ready".to_string(),
    })
}

async fn healthz() -> &'static str {
    "ok"
}

/// Authorization is checked before the body is interpreted, so a wrong key is
/// answered with 403 whatever the body contains.
async fn describe_map(
    State(state): State<Arc<AppState>>,
    path: MatchedPath,
    headers: HeaderMap,
    body: String,
) -> Result<Json<DescriptionResponse>, (StatusCode, Json<ApiError>)> {
    let provided_key = headers
        .get(APIKEY_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    if !auth::keys_match(provided_key, &state.access_key) {
        return Err(reject(
            StatusCode::FORBIDDEN,
            ErrorCode::Forbidden,
            "invalid api key",
            &headers,
            path.as_str(),
            &body,
        ));
    }

    let request: InstructionRequest = serde_json::from_str(&body).map_err(|err| {
        reject(
            StatusCode::BAD_REQUEST,
            ErrorCode::Validation,
            format!("invalid request body: {err}"),
            &headers,
            path.as_str(),
            &body,
        )
    })?;

    match state.pipeline {
        PipelineKind::Local => {
            let moves = parser::parse_instruction(&request.instruction).map_err(|err| {
                reject(
                    StatusCode::BAD_REQUEST,
                    ErrorCode::Validation,
                    err.to_string(),
                    &headers,
                    path.as_str(),
                    &body,
                )
            })?;
            let position = domain::resolve(&moves);
            Ok(Json(DescriptionResponse {
                description: state.terrain.describe(position),
            }))
        }
        PipelineKind::Remote => {
            let Some(client) = state.llm.as_ref() else {
                return Err(reject(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::Internal,
                    "language model client is not configured",
                    &headers,
                    path.as_str(),
                    &body,
                ));
            };
            let prompt = llm::build_terrain_prompt(&state.terrain, &request.instruction);
            let raw = client.complete(&prompt).await.map_err(|err| {
                reject(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::Upstream,
                    format!("language model call failed: {err:#}"),
                    &headers,
                    path.as_str(),
                    &body,
                )
            })?;
            let description = llm::parse_description(&raw).map_err(|err| {
                reject(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::Upstream,
                    format!("language model reply rejected: {err:#}"),
                    &headers,
                    path.as_str(),
                    &body,
                )
            })?;
            Ok(Json(DescriptionResponse { description }))
        }
    }
}

/// Logs a failed request with its context before surfacing the error payload.
fn reject(
    status: StatusCode,
    code: ErrorCode,
    message: impl Into<String>,
    headers: &HeaderMap,
    path: &str,
    body: &str,
) -> (StatusCode, Json<ApiError>) {
    let message = message.into();
    let headers = sanitized_headers(headers);
    if status.is_server_error() {
        error!(method = "POST", path, ?headers, body, %status, %message, "request failed");
    } else {
        warn!(method = "POST", path, ?headers, body, %status, %message, "request rejected");
    }
    (status, Json(ApiError::new(code, message)))
}

/// Header listing safe to log; the api key value is redacted.
fn sanitized_headers(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(name, value)| {
            let value = if name.as_str() == APIKEY_HEADER {
                "[redacted]".to_string()
            } else {
                value.to_str().unwrap_or("[binary]").to_string()
            };
            (name.as_str().to_string(), value)
        })
        .collect()
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
