//! Durable word → embedding store.
//!
//! Entries are kept in insertion order alongside a set of the words already
//! present, which makes appends idempotent and lets an interrupted
//! ingestion resume where the last flush left off. The whole store is
//! rewritten on every flush: the JSON array is written to a temp file in
//! the target directory and then renamed over the old file.

use std::collections::HashSet;
use std::io::{BufWriter, Write};
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use lexis_core::error::{LexisError, Result};
use lexis_core::types::VocabEntry;

use crate::similarity::is_finite;

/// Ordered vocabulary of embeddings with O(1) membership checks.
#[derive(Debug, Clone, Default)]
pub struct EmbeddingStore {
    entries: Vec<VocabEntry>,
    words: HashSet<String>,
    dimension: Option<usize>,
}

impl EmbeddingStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from entries, applying the same rules as [`append`].
    ///
    /// [`append`]: EmbeddingStore::append
    pub fn from_entries(entries: impl IntoIterator<Item = VocabEntry>) -> Result<Self> {
        let mut store = Self::new();
        for entry in entries {
            if store.contains(&entry.word) {
                warn!(word = %entry.word, "Duplicate word in store, keeping first occurrence");
                continue;
            }
            store.append(entry)?;
        }
        Ok(store)
    }

    /// Read a store from disk.
    ///
    /// A missing file yields an empty store so a first ingestion can start
    /// fresh. Content that is not a JSON array of `{word, embedding}`
    /// records, or that holds empty or non-finite vectors, fails with
    /// `CorruptStore`; entries whose vector lengths disagree fail with
    /// `DimensionMismatch`.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "No store file yet, starting empty");
            return Ok(Self::new());
        }

        let content = std::fs::read_to_string(path)?;
        let entries: Vec<VocabEntry> = serde_json::from_str(&content).map_err(|e| {
            LexisError::CorruptStore(format!("{}: {}", path.display(), e))
        })?;

        let store = Self::from_entries(entries).map_err(|e| match e {
            LexisError::MissingInput(msg) => {
                LexisError::CorruptStore(format!("{}: {}", path.display(), msg))
            }
            other => other,
        })?;
        info!(
            path = %path.display(),
            entries = store.len(),
            dimension = ?store.dimension(),
            "Embedding store loaded"
        );
        Ok(store)
    }

    /// Return true if the word already has an embedding.
    pub fn contains(&self, word: &str) -> bool {
        self.words.contains(word)
    }

    /// Add an entry in memory.
    ///
    /// Returns `Ok(false)` without changing anything when the word is
    /// already present. The first entry fixes the store dimension; later
    /// entries of another length fail with `DimensionMismatch`. An empty
    /// vector, or one with a `NaN` or infinite component, fails with
    /// `MissingInput`.
    pub fn append(&mut self, entry: VocabEntry) -> Result<bool> {
        if self.contains(&entry.word) {
            return Ok(false);
        }
        if entry.embedding.is_empty() {
            return Err(LexisError::MissingInput(format!(
                "empty embedding for '{}'",
                entry.word
            )));
        }
        if !is_finite(&entry.embedding) {
            return Err(LexisError::MissingInput(format!(
                "non-finite embedding component for '{}'",
                entry.word
            )));
        }
        match self.dimension {
            Some(expected) if expected != entry.dim() => {
                return Err(LexisError::DimensionMismatch {
                    expected,
                    actual: entry.dim(),
                });
            }
            Some(_) => {}
            None => self.dimension = Some(entry.dim()),
        }

        self.words.insert(entry.word.clone());
        self.entries.push(entry);
        Ok(true)
    }

    /// Atomically write the full store to `path`.
    ///
    /// Creates the parent directory if needed. Readers see either the
    /// previous file or the new one, never a partial write.
    pub fn flush(&self, path: &Path) -> Result<()> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;

        let mut tmp = NamedTempFile::new_in(dir)?;
        {
            let mut writer = BufWriter::new(tmp.as_file_mut());
            serde_json::to_writer(&mut writer, &self.entries)?;
            writer.flush()?;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| LexisError::Io(e.error))?;

        debug!(path = %path.display(), entries = self.len(), "Embedding store flushed");
        Ok(())
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Return true if the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Vector length shared by every entry, once the first entry exists.
    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    /// Entries in insertion order.
    pub fn entries(&self) -> &[VocabEntry] {
        &self.entries
    }

    /// Consume the store and return its entries in insertion order.
    pub fn into_entries(self) -> Vec<VocabEntry> {
        self.entries
    }

    /// Words in insertion order.
    pub fn words(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.word.as_str())
    }
}
