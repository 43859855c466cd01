//! Embedding provider trait and implementations.
//!
//! - `OpenAiEmbedding` calls an OpenAI-compatible `/embeddings` endpoint
//!   over HTTP. This is the production backend for ingestion and for the
//!   text-to-vector API routes.
//! - `MockEmbedding` provides deterministic hash-based vectors for tests,
//!   benches, and offline runs.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use lexis_core::config::ProviderConfig;
use lexis_core::error::{LexisError, Result};

/// Source of embedding vectors for text.
///
/// `RateLimited` errors are transient: callers back off and move on.
/// Every other error is permanent for that input.
pub trait EmbeddingProvider: Send + Sync {
    /// Generate an embedding vector for the given text.
    fn embed(
        &self,
        text: &str,
    ) -> impl std::future::Future<Output = Result<Vec<f32>>> + Send;

    /// Return the dimensionality of vectors produced by this provider.
    fn dimensions(&self) -> usize;
}

/// Object-safe version of [`EmbeddingProvider`] for dynamic dispatch.
///
/// `EmbeddingProvider::embed` returns `impl Future`, so it cannot be used
/// behind `dyn`. This trait boxes the future instead, allowing
/// `Arc<dyn DynEmbeddingProvider>` to live in shared server state.
pub trait DynEmbeddingProvider: Send + Sync {
    /// Generate an embedding vector for the given text (boxed future).
    fn embed_boxed<'a>(
        &'a self,
        text: &'a str,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<Vec<f32>>> + Send + 'a>>;

    /// Return the dimensionality of vectors produced by this provider.
    fn dimensions(&self) -> usize;
}

impl<T: EmbeddingProvider> DynEmbeddingProvider for T {
    fn embed_boxed<'a>(
        &'a self,
        text: &'a str,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<Vec<f32>>> + Send + 'a>> {
        Box::pin(self.embed(text))
    }

    fn dimensions(&self) -> usize {
        EmbeddingProvider::dimensions(self)
    }
}

// ---------------------------------------------------------------------------
// OpenAiEmbedding - remote /embeddings endpoint
// ---------------------------------------------------------------------------

pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

/// Embedding provider backed by an OpenAI-compatible HTTP API.
#[derive(Debug, Clone)]
pub struct OpenAiEmbedding {
    client: Client,
    endpoint: String,
    api_key: String,
    project_id: Option<String>,
    model: String,
    dimensions: usize,
}

impl OpenAiEmbedding {
    /// Create a provider for `model` against the public OpenAI API.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        Self::build(
            api_key.into(),
            model.into(),
            None,
            DEFAULT_API_BASE,
            std::time::Duration::from_secs(30),
        )
    }

    /// Create a provider from the `[provider]` config section.
    ///
    /// The API key may come from the config file or `OPENAI_API_KEY`;
    /// without one this fails with a `Config` error.
    pub fn from_config(config: &ProviderConfig) -> Result<Self> {
        let api_key = config.resolve_api_key().ok_or_else(|| {
            LexisError::Config(
                "No API key: set provider.api_key or OPENAI_API_KEY".to_string(),
            )
        })?;
        Self::build(
            api_key,
            config.model.clone(),
            config.resolve_project_id(),
            &config.api_base,
            config.timeout(),
        )
    }

    fn build(
        api_key: String,
        model: String,
        project_id: Option<String>,
        api_base: &str,
        timeout: std::time::Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LexisError::Config(format!("HTTP client: {}", e)))?;

        let dimensions = match model.as_str() {
            "text-embedding-3-large" => 3072,
            "text-embedding-3-small" | "text-embedding-ada-002" => 1536,
            _ => 1536,
        };
        let endpoint = format!("{}/embeddings", api_base.trim_end_matches('/'));

        info!(model = %model, endpoint = %endpoint, dimensions, "OpenAI embedding provider ready");

        Ok(Self {
            client,
            endpoint,
            api_key,
            project_id,
            model,
            dimensions,
        })
    }

    /// Point the provider at another OpenAI-compatible base URL.
    pub fn with_api_base(mut self, api_base: &str) -> Self {
        self.endpoint = format!("{}/embeddings", api_base.trim_end_matches('/'));
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Decode a response body into a single vector.
    ///
    /// Anything other than `{"data": [{"embedding": [..]}, ..]}` with a
    /// non-empty first vector is a provider error.
    fn decode(body: &[u8]) -> Result<Vec<f32>> {
        let response: EmbeddingResponse = serde_json::from_slice(body)
            .map_err(|e| LexisError::Provider(format!("Unexpected response shape: {}", e)))?;

        let embedding = response
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| LexisError::Provider("No embedding returned".to_string()))?;

        if embedding.is_empty() {
            return Err(LexisError::Provider("Empty embedding returned".to_string()));
        }
        Ok(embedding)
    }
}

impl EmbeddingProvider for OpenAiEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if text.trim().is_empty() {
            return Err(LexisError::MissingInput("Cannot embed empty text".to_string()));
        }

        let mut request = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&EmbeddingRequest {
                model: &self.model,
                input: text,
            });
        if let Some(project) = &self.project_id {
            request = request.header("OpenAI-Project", project);
        }

        let response = request
            .send()
            .await
            .map_err(|e| LexisError::Provider(format!("Request failed: {}", e)))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            debug!(text, "Embedding request rate limited");
            return Err(LexisError::RateLimited);
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| LexisError::Provider(format!("Failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(LexisError::Provider(format!(
                "API error ({}): {}",
                status,
                String::from_utf8_lossy(&body)
            )));
        }

        Self::decode(&body)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

// ---------------------------------------------------------------------------
// MockEmbedding - deterministic hash-based vectors for testing
// ---------------------------------------------------------------------------

/// Mock provider that returns deterministic unit vectors.
///
/// The output is derived from a hash of the input text, so identical inputs
/// always produce identical outputs.
#[derive(Debug, Clone)]
pub struct MockEmbedding {
    dimensions: usize,
}

impl MockEmbedding {
    /// 384-dimensional mock vectors.
    pub fn new() -> Self {
        Self { dimensions: 384 }
    }

    pub fn with_dimensions(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    fn hash_to_vector(&self, text: &str) -> Vec<f32> {
        let mut result = Vec::with_capacity(self.dimensions);
        for i in 0..self.dimensions {
            let mut hasher = DefaultHasher::new();
            text.hash(&mut hasher);
            i.hash(&mut hasher);
            let h = hasher.finish();
            let val = ((h as f64) / (u64::MAX as f64)) * 2.0 - 1.0;
            result.push(val as f32);
        }

        let norm: f32 = result.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for val in &mut result {
                *val /= norm;
            }
        }

        result
    }
}

impl Default for MockEmbedding {
    fn default() -> Self {
        Self::new()
    }
}

impl EmbeddingProvider for MockEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if text.trim().is_empty() {
            return Err(LexisError::MissingInput("Cannot embed empty text".to_string()));
        }
        Ok(self.hash_to_vector(text))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}
