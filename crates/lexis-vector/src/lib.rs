//! Lexis vector crate - similarity math, embedding store, providers,
//! ingestion pipeline, and the exact nearest-neighbor index.
//!
//! The pipeline turns a word list into a persisted [`EmbeddingStore`]
//! through an [`EmbeddingProvider`]; the [`NeighborIndex`] loads that store
//! and ranks the whole vocabulary against a query vector.

pub mod embedding;
pub mod index;
pub mod pipeline;
pub mod similarity;
pub mod store;
pub mod wordlist;

pub use embedding::{DynEmbeddingProvider, EmbeddingProvider, MockEmbedding, OpenAiEmbedding};
pub use index::{NeighborIndex, Snapshot, DEFAULT_K};
pub use pipeline::{IngestReport, IngestSettings, IngestionPipeline};
pub use similarity::cosine_similarity;
pub use store::EmbeddingStore;
pub use wordlist::{load_word_list, parse_word_list};
