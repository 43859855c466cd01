//! Application state shared across all route handlers.

use std::sync::Arc;
use std::time::Instant;

use lexis_core::config::LexisConfig;
use lexis_vector::embedding::DynEmbeddingProvider;
use lexis_vector::NeighborIndex;

/// Shared application state.
///
/// Every field is behind an `Arc`, so cloning per request is cheap. Nothing
/// here is mutated after startup; the index guards its own lazy load.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration, fixed for the life of the server.
    pub config: Arc<LexisConfig>,
    /// Top-K neighbor lookup over the embedding store.
    pub index: Arc<NeighborIndex>,
    /// Provider used to embed free text for `/embeddings` and `/similar`.
    pub provider: Arc<dyn DynEmbeddingProvider>,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    pub fn new(
        config: LexisConfig,
        index: NeighborIndex,
        provider: Arc<dyn DynEmbeddingProvider>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            index: Arc::new(index),
            provider,
            start_time: Instant::now(),
        }
    }

    /// Clamp a requested neighbor count to `[1, max_k]`, falling back to
    /// the configured default when none was given.
    pub fn resolve_k(&self, requested: Option<usize>) -> usize {
        let index = &self.config.index;
        requested
            .unwrap_or(index.default_k)
            .clamp(1, index.max_k.max(1))
    }
}
