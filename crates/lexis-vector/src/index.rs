//! Exact nearest-neighbor index over the embedding store.
//!
//! Every query scores the whole vocabulary by cosine similarity, so a
//! query costs O(vocabulary × dimension). The snapshot being ranked is
//! read-only; concurrent queries share it through an `Arc`.
//!
//! How often the snapshot is refreshed is fixed at construction by a
//! [`ReloadPolicy`]: `Always` re-reads the store file on every query so
//! words appended by a running ingestion show up at once, `Once` loads it
//! on first use and keeps serving that copy.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::{debug, info};

use lexis_core::error::{LexisError, Result};
use lexis_core::types::{NeighborResult, ReloadPolicy, VocabEntry};

use crate::similarity::{cosine_similarity, is_finite};
use crate::store::EmbeddingStore;

/// Neighbors returned when the caller does not ask for a specific count.
pub const DEFAULT_K: usize = 5;

/// Immutable copy of the store contents used for ranking.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    entries: Vec<VocabEntry>,
    dimension: Option<usize>,
}

impl Snapshot {
    pub fn from_store(store: EmbeddingStore) -> Self {
        let dimension = store.dimension();
        Self {
            entries: store.into_entries(),
            dimension,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    pub fn entries(&self) -> &[VocabEntry] {
        &self.entries
    }

    /// Rank every entry against `query` and return the best `k`.
    ///
    /// Results are sorted by descending score; equal scores keep store
    /// order. An empty vocabulary yields no results rather than an error.
    /// An empty query, or one with a `NaN` or infinite component, fails
    /// with `MissingInput`.
    pub fn rank(&self, query: &[f32], k: usize) -> Result<Vec<NeighborResult>> {
        check_query(query)?;
        let Some(dimension) = self.dimension else {
            return Ok(Vec::new());
        };
        if query.len() != dimension {
            return Err(LexisError::DimensionMismatch {
                expected: dimension,
                actual: query.len(),
            });
        }
        if k == 0 {
            return Ok(Vec::new());
        }

        let mut scored: Vec<(usize, f64)> = Vec::with_capacity(self.entries.len());
        for (i, entry) in self.entries.iter().enumerate() {
            scored.push((i, cosine_similarity(query, &entry.embedding)?));
        }

        // sort_by is stable, so ties stay in store order.
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(i, score)| NeighborResult {
                word: self.entries[i].word.clone(),
                score,
            })
            .collect())
    }
}

/// Top-K cosine neighbor lookup with a configurable reload policy.
#[derive(Debug)]
pub struct NeighborIndex {
    path: Option<PathBuf>,
    policy: ReloadPolicy,
    cached: OnceCell<Arc<Snapshot>>,
}

impl NeighborIndex {
    /// Serve the store at `path`. Nothing is read until the first query.
    pub fn open(path: impl Into<PathBuf>, policy: ReloadPolicy) -> Self {
        Self {
            path: Some(path.into()),
            policy,
            cached: OnceCell::new(),
        }
    }

    /// Serve an in-memory store. The snapshot never changes.
    pub fn from_store(store: EmbeddingStore) -> Self {
        Self {
            path: None,
            policy: ReloadPolicy::Once,
            cached: OnceCell::from(Arc::new(Snapshot::from_store(store))),
        }
    }

    pub fn policy(&self) -> ReloadPolicy {
        self.policy
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// The snapshot the next query would rank against.
    ///
    /// Under `Once` the first call loads the store; concurrent first calls
    /// wait on the same load and all see the finished snapshot. A failed
    /// load is not cached, so the next call tries again. Neither is a
    /// missing store file: until the first ingest writes it, every call
    /// serves an empty vocabulary and checks again.
    pub async fn snapshot(&self) -> Result<Arc<Snapshot>> {
        if let (ReloadPolicy::Always, Some(path)) = (self.policy, &self.path) {
            return load_snapshot(path.clone()).await.map(Arc::new);
        }
        if let Some(snapshot) = self.cached.get() {
            return Ok(Arc::clone(snapshot));
        }
        if let Some(path) = &self.path {
            if !path.exists() {
                debug!(path = %path.display(), "Store file not written yet, serving empty vocabulary");
                return Ok(Arc::new(Snapshot::default()));
            }
        }

        self.cached
            .get_or_try_init(|| async {
                let snapshot = match &self.path {
                    Some(path) => load_snapshot(path.clone()).await?,
                    None => Snapshot::default(),
                };
                info!(
                    entries = snapshot.len(),
                    dimension = ?snapshot.dimension(),
                    "Neighbor index cached"
                );
                Ok::<_, LexisError>(Arc::new(snapshot))
            })
            .await
            .cloned()
    }

    /// Return the `k` vocabulary words most similar to `vector`.
    ///
    /// Fails with `MissingInput` for an empty or non-finite vector and with
    /// `DimensionMismatch` when its length differs from the store's.
    pub async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<NeighborResult>> {
        check_query(vector)?;

        let snapshot = self.snapshot().await?;
        let results = snapshot.rank(vector, k)?;

        debug!(
            k,
            vocabulary = snapshot.len(),
            returned = results.len(),
            "Neighbor query answered"
        );
        Ok(results)
    }
}

fn check_query(query: &[f32]) -> Result<()> {
    if query.is_empty() {
        return Err(LexisError::MissingInput("empty query vector".to_string()));
    }
    if !is_finite(query) {
        return Err(LexisError::MissingInput(
            "query vector has a NaN or infinite component".to_string(),
        ));
    }
    Ok(())
}

async fn load_snapshot(path: PathBuf) -> Result<Snapshot> {
    let store = tokio::task::spawn_blocking(move || EmbeddingStore::load(&path))
        .await
        .map_err(|e| LexisError::Io(std::io::Error::other(format!("Store load task failed: {}", e))))??;
    Ok(Snapshot::from_store(store))
}
