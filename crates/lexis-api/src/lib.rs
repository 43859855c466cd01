//! Lexis API crate - axum HTTP server and route handlers.
//!
//! Exposes the neighbor index and the embedding provider over JSON:
//! neighbor lookup by vector, text embedding, text-to-neighbors, and a
//! health check.

pub mod error;
pub mod handlers;
pub mod rate_limit;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::{create_router, start_server};
pub use state::AppState;
