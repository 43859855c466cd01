//! Domain types shared across the Lexis crates.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::LexisError;

/// An embedding vector. Its length is fixed per store by the first entry.
pub type Vector = Vec<f32>;

/// One word of the vocabulary and its embedding.
///
/// This is also the on-disk record shape: the store file is a JSON array
/// of `{"word": ..., "embedding": [...]}` objects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VocabEntry {
    pub word: String,
    pub embedding: Vector,
}

impl VocabEntry {
    pub fn new(word: impl Into<String>, embedding: Vector) -> Self {
        Self {
            word: word.into(),
            embedding,
        }
    }

    /// Length of the embedding vector.
    pub fn dim(&self) -> usize {
        self.embedding.len()
    }
}

/// A ranked neighbor returned from a query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeighborResult {
    pub word: String,
    /// Cosine similarity in `[-1, 1]`.
    pub score: f64,
}

/// When the neighbor index re-reads the store file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReloadPolicy {
    /// Reload on every query so freshly ingested words show up immediately.
    Always,
    /// Load on first use and serve every later query from the cached copy.
    #[default]
    Once,
}

impl fmt::Display for ReloadPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReloadPolicy::Always => write!(f, "always"),
            ReloadPolicy::Once => write!(f, "once"),
        }
    }
}

impl FromStr for ReloadPolicy {
    type Err = LexisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "always" | "development" | "dev" => Ok(ReloadPolicy::Always),
            "once" | "production" | "prod" => Ok(ReloadPolicy::Once),
            other => Err(LexisError::Config(format!(
                "Invalid reload policy '{}'. Must be one of: always, once",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vocab_entry_json_shape() {
        let entry = VocabEntry::new("cat", vec![1.0, 0.5]);
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json, serde_json::json!({"word": "cat", "embedding": [1.0, 0.5]}));
        assert_eq!(entry.dim(), 2);
    }

    #[test]
    fn test_reload_policy_parse() {
        assert_eq!("always".parse::<ReloadPolicy>().unwrap(), ReloadPolicy::Always);
        assert_eq!("ONCE".parse::<ReloadPolicy>().unwrap(), ReloadPolicy::Once);
        assert_eq!(
            "development".parse::<ReloadPolicy>().unwrap(),
            ReloadPolicy::Always
        );
        assert_eq!(
            "production".parse::<ReloadPolicy>().unwrap(),
            ReloadPolicy::Once
        );
        assert!("sometimes".parse::<ReloadPolicy>().is_err());
    }

    #[test]
    fn test_reload_policy_serde_lowercase() {
        let json = serde_json::to_string(&ReloadPolicy::Always).unwrap();
        assert_eq!(json, "\"always\"");
        let policy: ReloadPolicy = serde_json::from_str("\"once\"").unwrap();
        assert_eq!(policy, ReloadPolicy::Once);
        assert_eq!(ReloadPolicy::default(), ReloadPolicy::Once);
        assert_eq!(ReloadPolicy::Always.to_string(), "always");
    }
}
