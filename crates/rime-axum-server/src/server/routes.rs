use super::config::ServerConfig;
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use rime::{Error, IdParts, SnowflakeGenerator, SnowflakeId, WallClock};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    generator: Arc<SnowflakeGenerator<WallClock>>,
    max_batch_ids: usize,
}

/// Builds the service router with its generator state and CORS layer.
pub fn router(config: &ServerConfig) -> anyhow::Result<Router> {
    let generator = SnowflakeGenerator::new(config.machine_id, WallClock)?;
    let state = AppState {
        generator: Arc::new(generator),
        max_batch_ids: config.max_batch_ids,
    };

    Ok(Router::new()
        .route("/", get(root))
        .route("/id", get(generate_id))
        .route("/id/raw", get(generate_id_raw))
        .route("/ids", get(generate_batch))
        .route("/parse/{id}", get(parse_id))
        .layer(
            ServiceBuilder::new().layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            ),
        )
        .with_state(state))
}

/// Error surface of the HTTP layer.
///
/// Generator failures keep their typed identity until the response is built
/// so each variant can pick its own status code.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Generator(Error),
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self::Generator(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Generator(err) => {
                let status = match &err {
                    // The caller gets a retryable status: the generator
                    // refuses to serve until the clock catches up.
                    Error::ClockRegression { .. } => {
                        tracing::error!("refusing to generate: {err}");
                        StatusCode::SERVICE_UNAVAILABLE
                    }
                    Error::MalformedId { .. } => StatusCode::BAD_REQUEST,
                    _ => {
                        tracing::error!("ID generation failed: {err}");
                        StatusCode::INTERNAL_SERVER_ERROR
                    }
                };
                (status, err.to_string())
            }
        };

        let body = Json(json!({
            "error": message,
            "status": status.as_u16()
        }));
        (status, body).into_response()
    }
}

#[derive(Serialize)]
struct ServiceInfo {
    service: &'static str,
    machine_id: u64,
}

async fn root(State(state): State<AppState>) -> Json<ServiceInfo> {
    Json(ServiceInfo {
        service: "rime ID service",
        machine_id: state.generator.machine_id(),
    })
}

#[derive(Serialize)]
struct IdResponse {
    id: SnowflakeId,
}

async fn generate_id(State(state): State<AppState>) -> Result<Json<IdResponse>, ApiError> {
    let id = state.generator.generate()?;
    Ok(Json(IdResponse { id }))
}

/// The raw-integer response form: just the decimal ID, no JSON envelope.
async fn generate_id_raw(State(state): State<AppState>) -> Result<String, ApiError> {
    Ok(state.generator.generate()?.to_string())
}

#[derive(Deserialize)]
struct BatchParams {
    count: usize,
}

#[derive(Serialize)]
struct BatchResponse {
    ids: Vec<SnowflakeId>,
}

/// Batch generation is a plain repetition of single generation; every ID
/// still passes through the generator's critical section individually.
async fn generate_batch(
    State(state): State<AppState>,
    Query(params): Query<BatchParams>,
) -> Result<Json<BatchResponse>, ApiError> {
    if params.count == 0 || params.count > state.max_batch_ids {
        return Err(ApiError::BadRequest(format!(
            "count must be in 1..={}",
            state.max_batch_ids
        )));
    }

    let ids = (0..params.count)
        .map(|_| state.generator.generate())
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(BatchResponse { ids }))
}

/// Decodes an ID into its components. The `u64` extractor already rejects
/// negative or non-numeric path segments before this handler runs.
async fn parse_id(Path(id): Path<u64>) -> Result<Json<IdParts>, ApiError> {
    Ok(Json(SnowflakeId::from_raw(id)?.decode()))
}
