//! Vocabulary ingestion pipeline.
//!
//! Drives an [`EmbeddingProvider`] over a word list one request at a time
//! and checkpoints the results into an [`EmbeddingStore`]:
//! 1. Skip words the store already holds (resume)
//! 2. Embed each remaining word, pacing requests with a fixed delay
//! 3. Flush every `flush_every` successful embeddings
//! 4. Flush once more at the end
//!
//! A word that is rate limited or fails is left out of this pass. Running
//! the pipeline again picks it up, since only missing words are requested.

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use lexis_core::config::IngestConfig;
use lexis_core::error::{LexisError, Result};
use lexis_core::types::VocabEntry;

use crate::embedding::EmbeddingProvider;
use crate::store::EmbeddingStore;

/// Pacing and checkpoint settings for a pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestSettings {
    /// Flush after this many successful embeddings. Bounds the loss on a
    /// crash to `flush_every - 1` entries.
    pub flush_every: usize,
    /// Delay after every provider call, whatever its outcome.
    pub request_delay: Duration,
    /// Extra delay after a rate-limit response.
    pub rate_limit_backoff: Duration,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            flush_every: 50,
            request_delay: Duration::from_millis(100),
            rate_limit_backoff: Duration::from_secs(5),
        }
    }
}

impl From<&IngestConfig> for IngestSettings {
    fn from(config: &IngestConfig) -> Self {
        Self {
            flush_every: config.flush_every.max(1),
            request_delay: config.request_delay(),
            rate_limit_backoff: config.rate_limit_backoff(),
        }
    }
}

/// Summary of one pipeline pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestReport {
    /// Distinct words in the input.
    pub total_words: usize,
    /// Words the store already held before this pass.
    pub already_present: usize,
    /// Words embedded and stored during this pass.
    pub embedded: usize,
    /// Words skipped because the provider was rate limiting.
    pub rate_limited: usize,
    /// Words skipped because of a permanent provider or validation error.
    pub failed: usize,
    /// Words still missing after this pass, in input order.
    pub skipped_words: Vec<String>,
    /// Store size after the final flush.
    pub store_size: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl IngestReport {
    /// Words a re-run would still have to request.
    pub fn remaining(&self) -> usize {
        self.skipped_words.len()
    }

    /// True when every input word is now in the store.
    pub fn is_complete(&self) -> bool {
        self.skipped_words.is_empty()
    }
}

/// Resumable, rate-limited word list ingestion.
pub struct IngestionPipeline<P: EmbeddingProvider> {
    provider: P,
    settings: IngestSettings,
}

impl<P: EmbeddingProvider> IngestionPipeline<P> {
    pub fn new(provider: P, settings: IngestSettings) -> Self {
        Self { provider, settings }
    }

    /// Create a pipeline with the default pacing (flush every 50, 100 ms
    /// between requests, 5 s backoff).
    pub fn with_defaults(provider: P) -> Self {
        Self::new(provider, IngestSettings::default())
    }

    /// Load the store at `store_path` (empty if absent) and run one pass.
    ///
    /// Store corruption and dimension inconsistencies in the existing file
    /// abort before any provider call.
    pub async fn run(&self, words: &[String], store_path: &Path) -> Result<IngestReport> {
        if words.iter().all(|w| w.trim().is_empty()) {
            return Err(LexisError::MissingInput("word list is empty".to_string()));
        }
        let mut store = EmbeddingStore::load(store_path)?;
        self.run_with_store(words, &mut store, store_path).await
    }

    /// Run one pass against a store the caller already holds.
    pub async fn run_with_store(
        &self,
        words: &[String],
        store: &mut EmbeddingStore,
        store_path: &Path,
    ) -> Result<IngestReport> {
        let started_at = Utc::now();

        let mut seen = HashSet::new();
        let unique: Vec<&str> = words
            .iter()
            .map(|w| w.trim())
            .filter(|w| !w.is_empty() && seen.insert(*w))
            .collect();
        if unique.is_empty() {
            return Err(LexisError::MissingInput("word list is empty".to_string()));
        }

        let todo: Vec<&str> = unique
            .iter()
            .copied()
            .filter(|w| !store.contains(w))
            .collect();
        let already_present = unique.len() - todo.len();

        info!(
            total = unique.len(),
            already_present,
            to_do = todo.len(),
            "Starting vocabulary ingestion"
        );

        let mut report = IngestReport {
            total_words: unique.len(),
            already_present,
            embedded: 0,
            rate_limited: 0,
            failed: 0,
            skipped_words: Vec::new(),
            store_size: store.len(),
            started_at,
            finished_at: started_at,
        };
        let mut since_flush = 0usize;

        for (i, word) in todo.iter().enumerate() {
            match self.provider.embed(word).await {
                Ok(embedding) => match store.append(VocabEntry::new(*word, embedding)) {
                    Ok(_) => {
                        report.embedded += 1;
                        since_flush += 1;
                        if since_flush >= self.settings.flush_every {
                            store.flush(store_path)?;
                            since_flush = 0;
                            info!(
                                done = store.len(),
                                remaining = todo.len() - i - 1,
                                "Saved progress"
                            );
                        }
                    }
                    Err(e) => {
                        warn!(word, error = %e, "Rejected embedding, skipping");
                        report.failed += 1;
                        report.skipped_words.push(word.to_string());
                    }
                },
                Err(LexisError::RateLimited) => {
                    warn!(
                        word,
                        backoff_ms = self.settings.rate_limit_backoff.as_millis() as u64,
                        "Rate limited, backing off"
                    );
                    report.rate_limited += 1;
                    report.skipped_words.push(word.to_string());
                    pause(self.settings.rate_limit_backoff).await;
                }
                Err(e) => {
                    warn!(word, error = %e, "Failed to embed word, skipping");
                    report.failed += 1;
                    report.skipped_words.push(word.to_string());
                }
            }

            pause(self.settings.request_delay).await;
        }

        store.flush(store_path)?;

        report.store_size = store.len();
        report.finished_at = Utc::now();
        info!(
            store_size = report.store_size,
            embedded = report.embedded,
            rate_limited = report.rate_limited,
            failed = report.failed,
            remaining = report.remaining(),
            path = %store_path.display(),
            "Ingestion finished"
        );
        Ok(report)
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn settings(&self) -> &IngestSettings {
        &self.settings
    }
}

async fn pause(delay: Duration) {
    if !delay.is_zero() {
        debug!(delay_ms = delay.as_millis() as u64, "Pausing");
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};

    /// Provider whose outcome per word is decided by a closure.
    struct FnProvider<F> {
        f: F,
        calls: Arc<Mutex<Vec<String>>>,
    }

    impl<F> FnProvider<F>
    where
        F: Fn(&str) -> Result<Vec<f32>> + Send + Sync,
    {
        fn new(f: F) -> Self {
            Self {
                f,
                calls: Arc::new(Mutex::new(Vec::new())),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl<F> EmbeddingProvider for FnProvider<F>
    where
        F: Fn(&str) -> Result<Vec<f32>> + Send + Sync,
    {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            self.calls.lock().unwrap().push(text.to_string());
            (self.f)(text)
        }

        fn dimensions(&self) -> usize {
            2
        }
    }

    fn ok_vector(word: &str) -> Result<Vec<f32>> {
        Ok(vec![word.len() as f32, 1.0])
    }

    fn fast_settings(flush_every: usize) -> IngestSettings {
        IngestSettings {
            flush_every,
            request_delay: Duration::ZERO,
            rate_limit_backoff: Duration::ZERO,
        }
    }

    fn words(list: &[&str]) -> Vec<String> {
        list.iter().map(|w| w.to_string()).collect()
    }

    fn store_path(dir: &tempfile::TempDir) -> PathBuf {
        dir.path().join("vocab-embeddings.json")
    }

    #[tokio::test]
    async fn test_duplicate_input_words_stored_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = store_path(&dir);
        let pipeline = IngestionPipeline::new(FnProvider::new(ok_vector), fast_settings(50));

        let report = pipeline.run(&words(&["a", "b", "a"]), &path).await.unwrap();

        assert_eq!(report.total_words, 2);
        assert_eq!(report.embedded, 2);
        assert_eq!(pipeline.provider().calls(), vec!["a", "b"]);

        let store = EmbeddingStore::load(&path).unwrap();
        assert_eq!(store.words().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_rerun_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = store_path(&dir);
        let input = words(&["cat", "dog", "car", "dog"]);

        let first = IngestionPipeline::new(FnProvider::new(ok_vector), fast_settings(2));
        first.run(&input, &path).await.unwrap();
        let after_first = std::fs::read_to_string(&path).unwrap();

        let second = IngestionPipeline::new(FnProvider::new(ok_vector), fast_settings(2));
        let report = second.run(&input, &path).await.unwrap();

        assert!(second.provider().calls().is_empty());
        assert_eq!(report.already_present, 3);
        assert_eq!(report.embedded, 0);
        assert_eq!(report.store_size, 3);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), after_first);
    }

    #[tokio::test]
    async fn test_rate_limited_word_is_skipped_then_picked_up_on_rerun() {
        let dir = tempfile::tempdir().unwrap();
        let path = store_path(&dir);
        let input = words(&["alpha", "beta", "gamma"]);

        let limited = IngestionPipeline::new(
            FnProvider::new(|w: &str| {
                if w == "beta" {
                    Err(LexisError::RateLimited)
                } else {
                    ok_vector(w)
                }
            }),
            fast_settings(50),
        );
        let report = limited.run(&input, &path).await.unwrap();

        // Not retried within the pass.
        assert_eq!(limited.provider().calls(), vec!["alpha", "beta", "gamma"]);
        assert_eq!(report.rate_limited, 1);
        assert_eq!(report.skipped_words, vec!["beta"]);
        assert!(!EmbeddingStore::load(&path).unwrap().contains("beta"));

        let healthy = IngestionPipeline::new(FnProvider::new(ok_vector), fast_settings(50));
        let report = healthy.run(&input, &path).await.unwrap();

        assert_eq!(healthy.provider().calls(), vec!["beta"]);
        assert!(report.is_complete());
        assert_eq!(report.store_size, 3);
    }

    #[tokio::test]
    async fn test_provider_error_skips_word_and_continues() {
        let dir = tempfile::tempdir().unwrap();
        let path = store_path(&dir);

        let pipeline = IngestionPipeline::new(
            FnProvider::new(|w: &str| {
                if w == "bad" {
                    Err(LexisError::Provider("invalid input".to_string()))
                } else {
                    ok_vector(w)
                }
            }),
            fast_settings(50),
        );
        let report = pipeline
            .run(&words(&["good", "bad", "fine"]), &path)
            .await
            .unwrap();

        assert_eq!(report.failed, 1);
        assert_eq!(report.embedded, 2);
        assert_eq!(report.remaining(), 1);
        let store = EmbeddingStore::load(&path).unwrap();
        assert_eq!(store.words().collect::<Vec<_>>(), vec!["good", "fine"]);
    }

    #[tokio::test]
    async fn test_mismatched_dimension_from_provider_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = store_path(&dir);

        let pipeline = IngestionPipeline::new(
            FnProvider::new(|w: &str| {
                if w == "odd" {
                    Ok(vec![1.0, 2.0, 3.0])
                } else {
                    ok_vector(w)
                }
            }),
            fast_settings(50),
        );
        let report = pipeline
            .run(&words(&["one", "odd", "two"]), &path)
            .await
            .unwrap();

        assert_eq!(report.failed, 1);
        assert_eq!(report.skipped_words, vec!["odd"]);
        assert_eq!(EmbeddingStore::load(&path).unwrap().dimension(), Some(2));
    }

    #[tokio::test]
    async fn test_periodic_flush_is_visible_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = store_path(&dir);
        let observed = Arc::new(Mutex::new(Vec::new()));

        let probe_path = path.clone();
        let probe = Arc::clone(&observed);
        let pipeline = IngestionPipeline::new(
            FnProvider::new(move |w: &str| {
                let on_disk = EmbeddingStore::load(&probe_path).unwrap().len();
                probe.lock().unwrap().push(on_disk);
                ok_vector(w)
            }),
            fast_settings(2),
        );
        pipeline
            .run(&words(&["w0", "w1", "w2", "w3", "w4"]), &path)
            .await
            .unwrap();

        // Entries on disk at the moment each word was requested.
        assert_eq!(*observed.lock().unwrap(), vec![0, 0, 2, 2, 4]);
        assert_eq!(EmbeddingStore::load(&path).unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_resume_after_interrupted_run() {
        let dir = tempfile::tempdir().unwrap();
        let path = store_path(&dir);
        let input = words(&["w0", "w1", "w2", "w3", "w4", "w5"]);

        // A crash after the first checkpoint leaves only the flushed prefix.
        let mut partial = EmbeddingStore::new();
        for w in &input[..2] {
            partial
                .append(VocabEntry::new(w.as_str(), ok_vector(w).unwrap()))
                .unwrap();
        }
        partial.flush(&path).unwrap();

        let pipeline = IngestionPipeline::new(FnProvider::new(ok_vector), fast_settings(2));
        let report = pipeline.run(&input, &path).await.unwrap();
        assert_eq!(pipeline.provider().calls(), vec!["w2", "w3", "w4", "w5"]);
        assert_eq!(report.already_present, 2);

        let uninterrupted_dir = tempfile::tempdir().unwrap();
        let uninterrupted_path = store_path(&uninterrupted_dir);
        IngestionPipeline::new(FnProvider::new(ok_vector), fast_settings(2))
            .run(&input, &uninterrupted_path)
            .await
            .unwrap();

        assert_eq!(
            EmbeddingStore::load(&path).unwrap().entries(),
            EmbeddingStore::load(&uninterrupted_path).unwrap().entries()
        );
    }

    #[tokio::test]
    async fn test_empty_word_list_rejected_before_any_request() {
        let dir = tempfile::tempdir().unwrap();
        let path = store_path(&dir);
        let pipeline = IngestionPipeline::new(FnProvider::new(ok_vector), fast_settings(50));

        let err = pipeline.run(&words(&[]), &path).await.unwrap_err();
        assert!(matches!(err, LexisError::MissingInput(_)));
        let err = pipeline.run(&words(&["  ", ""]), &path).await.unwrap_err();
        assert!(matches!(err, LexisError::MissingInput(_)));

        assert!(pipeline.provider().calls().is_empty());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_corrupt_store_aborts_run() {
        let dir = tempfile::tempdir().unwrap();
        let path = store_path(&dir);
        std::fs::write(&path, "garbage").unwrap();

        let pipeline = IngestionPipeline::new(FnProvider::new(ok_vector), fast_settings(50));
        let err = pipeline.run(&words(&["a"]), &path).await.unwrap_err();

        assert!(matches!(err, LexisError::CorruptStore(_)));
        assert!(pipeline.provider().calls().is_empty());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "garbage");
    }

    #[tokio::test]
    async fn test_final_flush_when_nothing_to_do() {
        let dir = tempfile::tempdir().unwrap();
        let path = store_path(&dir);
        let pipeline = IngestionPipeline::new(
            FnProvider::new(|_: &str| Err(LexisError::Provider("down".to_string()))),
            fast_settings(50),
        );

        let report = pipeline.run(&words(&["a", "b"]), &path).await.unwrap();
        assert_eq!(report.store_size, 0);
        assert_eq!(report.failed, 2);
        // The store file exists and is a valid, empty store.
        assert!(EmbeddingStore::load(&path).unwrap().is_empty());
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_run_with_mock_provider() {
        let dir = tempfile::tempdir().unwrap();
        let path = store_path(&dir);
        let pipeline = IngestionPipeline::new(
            crate::embedding::MockEmbedding::with_dimensions(16),
            fast_settings(50),
        );
        let report = pipeline
            .run(&words(&["river", "ocean"]), &path)
            .await
            .unwrap();
        assert_eq!(report.store_size, 2);
        assert_eq!(EmbeddingStore::load(&path).unwrap().dimension(), Some(16));
    }

    #[test]
    fn test_settings_from_config() {
        let config = IngestConfig {
            flush_every: 10,
            request_delay_ms: 250,
            rate_limit_backoff_ms: 1_000,
            ..IngestConfig::default()
        };
        let settings = IngestSettings::from(&config);
        assert_eq!(settings.flush_every, 10);
        assert_eq!(settings.request_delay, Duration::from_millis(250));
        assert_eq!(settings.rate_limit_backoff, Duration::from_secs(1));
        assert_eq!(IngestSettings::default().flush_every, 50);
    }
}
