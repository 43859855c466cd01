//! Route handler functions for all API endpoints.
//!
//! Each handler decodes its JSON body, calls into the index or the
//! embedding provider, and returns a JSON response. Body decode failures
//! are turned into `ApiError::BadRequest` so every error shares one shape.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use lexis_core::error::LexisError;
use lexis_core::types::NeighborResult;

use crate::error::ApiError;
use crate::state::AppState;

// =============================================================================
// Request types
// =============================================================================

/// Request body for POST /neighbors.
#[derive(Debug, Deserialize)]
pub struct NeighborsRequest {
    /// Label echoed back in the response; not used for ranking.
    #[serde(default)]
    pub word: Option<String>,
    #[serde(default)]
    pub embedding: Option<Vec<f32>>,
    #[serde(default)]
    pub k: Option<usize>,
}

/// Request body for POST /embeddings.
#[derive(Debug, Deserialize)]
pub struct EmbeddingRequest {
    #[serde(default)]
    pub text: Option<String>,
}

/// Request body for POST /similar.
#[derive(Debug, Deserialize)]
pub struct SimilarRequest {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub k: Option<usize>,
}

// =============================================================================
// Response types
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub vocabulary_size: usize,
    pub dimension: Option<usize>,
    pub reload_policy: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NeighborsResponse {
    pub word: Option<String>,
    pub neighbors: Vec<NeighborResult>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EmbeddingResponse {
    pub text: String,
    pub embedding: Vec<f32>,
    pub dimensions: usize,
}

// =============================================================================
// Handlers
// =============================================================================

/// GET /health - liveness plus a summary of the served vocabulary.
///
/// A store that fails to load still answers, with status "degraded".
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let (status, vocabulary_size, dimension) = match state.index.snapshot().await {
        Ok(snapshot) => ("ok", snapshot.len(), snapshot.dimension()),
        Err(e) => {
            warn!(error = %e, "Health check could not load the embedding store");
            ("degraded", 0, None)
        }
    };

    Json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        vocabulary_size,
        dimension,
        reload_policy: state.index.policy().to_string(),
    })
}

/// POST /neighbors - the `k` vocabulary words closest to a vector.
pub async fn neighbors(
    State(state): State<AppState>,
    payload: Result<Json<NeighborsRequest>, JsonRejection>,
) -> Result<Json<NeighborsResponse>, ApiError> {
    let Json(req) = payload?;
    let embedding = match req.embedding {
        Some(v) if !v.is_empty() => v,
        _ => return Err(ApiError::BadRequest("Missing or empty embedding".to_string())),
    };

    let k = state.resolve_k(req.k);
    let neighbors = state.index.query(&embedding, k).await?;

    debug!(
        word = req.word.as_deref().unwrap_or(""),
        k,
        returned = neighbors.len(),
        "Neighbors served"
    );
    Ok(Json(NeighborsResponse {
        word: req.word,
        neighbors,
    }))
}

/// POST /embeddings - embed free text with the configured provider.
pub async fn embeddings(
    State(state): State<AppState>,
    payload: Result<Json<EmbeddingRequest>, JsonRejection>,
) -> Result<Json<EmbeddingResponse>, ApiError> {
    let Json(req) = payload?;
    let text = required_text(req.text)?;

    let embedding = state.provider.embed_boxed(&text).await?;
    Ok(Json(EmbeddingResponse {
        dimensions: embedding.len(),
        text,
        embedding,
    }))
}

/// POST /similar - embed `text`, then answer as `/neighbors` would.
pub async fn similar(
    State(state): State<AppState>,
    payload: Result<Json<SimilarRequest>, JsonRejection>,
) -> Result<Json<NeighborsResponse>, ApiError> {
    let Json(req) = payload?;
    let text = required_text(req.text)?;

    let embedding = state.provider.embed_boxed(&text).await?;
    let k = state.resolve_k(req.k);
    // The vector came from the configured provider: a size disagreement
    // with the store is a deployment fault.
    let neighbors = state
        .index
        .query(&embedding, k)
        .await
        .map_err(|e| match e {
            LexisError::DimensionMismatch { expected, actual } => {
                error!(expected, actual, "Provider and store dimensions disagree");
                ApiError::Internal(format!(
                    "Embedding provider produces {}-dimensional vectors but the store holds {}",
                    actual, expected
                ))
            }
            other => ApiError::from(other),
        })?;

    Ok(Json(NeighborsResponse {
        word: Some(text),
        neighbors,
    }))
}

fn required_text(text: Option<String>) -> Result<String, ApiError> {
    match text {
        Some(t) if !t.trim().is_empty() => Ok(t),
        _ => Err(ApiError::BadRequest("Missing or empty text".to_string())),
    }
}
