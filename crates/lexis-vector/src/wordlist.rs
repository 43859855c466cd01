//! Word list input for ingestion.

use std::collections::HashSet;
use std::path::Path;

use lexis_core::error::{LexisError, Result};

/// Split newline-delimited text into words.
///
/// Surrounding whitespace is trimmed, blank lines are ignored, and repeated
/// words keep only their first position.
pub fn parse_word_list(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    text.lines()
        .map(str::trim)
        .filter(|w| !w.is_empty())
        .filter(|w| seen.insert(*w))
        .map(str::to_string)
        .collect()
}

/// Read a word list file. An absent file or one without any words fails
/// with `MissingInput`.
pub fn load_word_list(path: &Path) -> Result<Vec<String>> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        LexisError::MissingInput(format!("cannot read word list {}: {}", path.display(), e))
    })?;

    let words = parse_word_list(&text);
    if words.is_empty() {
        return Err(LexisError::MissingInput(format!(
            "word list {} contains no words",
            path.display()
        )));
    }
    Ok(words)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_trims_and_skips_blanks() {
        let words = parse_word_list("  cat \n\n dog\r\n\t\ncar  \n");
        assert_eq!(words, vec!["cat", "dog", "car"]);
    }

    #[test]
    fn test_parse_dedups_preserving_order() {
        let words = parse_word_list("a\nb\na\nc\nb\n");
        assert_eq!(words, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_parse_keeps_inner_spaces() {
        assert_eq!(parse_word_list("ice cream\n"), vec!["ice cream"]);
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_word_list(Path::new("/does/not/exist/words.txt")).unwrap_err();
        assert!(matches!(err, LexisError::MissingInput(_)));
    }

    #[test]
    fn test_load_blank_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("words.txt");
        std::fs::write(&path, "\n   \n").unwrap();
        assert!(matches!(
            load_word_list(&path),
            Err(LexisError::MissingInput(_))
        ));
    }

    #[test]
    fn test_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("words.txt");
        std::fs::write(&path, "apple\nbanana\n").unwrap();
        assert_eq!(load_word_list(&path).unwrap(), vec!["apple", "banana"]);
    }
}
