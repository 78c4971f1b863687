//! # Recursive Character Splitting
//!
//! Splits text on the most significant separator present (paragraph break,
//! line break, space, then single characters) and greedily merges the pieces
//! back into chunks of at most `chunk_size` characters. Consecutive chunks share
//! up to `chunk_overlap` characters of trailing context. Pieces that are still
//! too large are split again with the next separator.
//!
//! Lengths are counted in characters, never bytes, so multi-byte text is never
//! cut inside a code point.

use crate::processor::config::{ChunkOptions, ProcessorConfig};
use crate::processor::error::ProcessError;
use std::collections::VecDeque;
use tracing::warn;

/// Recursive character text splitter
#[derive(Debug, Clone)]
pub struct RecursiveCharacterSplitter {
    options: ChunkOptions,
    separators: Vec<String>,
}

impl RecursiveCharacterSplitter {
    /// Create a splitter with the default separators
    pub fn new(options: ChunkOptions) -> Result<Self, ProcessError> {
        Self::from_config(&ProcessorConfig {
            chunk_options: options,
            ..Default::default()
        })
    }

    /// Create a splitter from a processor configuration
    pub fn from_config(config: &ProcessorConfig) -> Result<Self, ProcessError> {
        config.chunk_options.validate()?;
        Ok(Self {
            options: config.chunk_options.clone(),
            separators: config.separators.clone(),
        })
    }

    /// The chunking options in use
    pub fn options(&self) -> &ChunkOptions {
        &self.options
    }

    /// Split text into trimmed, non-empty chunks
    pub fn split_text(&self, text: &str) -> Vec<String> {
        self.split_recursive(text, &self.separators)
    }

    fn split_recursive(&self, text: &str, separators: &[String]) -> Vec<String> {
        let mut separator = separators.last().map(String::as_str).unwrap_or("");
        let mut finer: &[String] = &[];
        for (i, candidate) in separators.iter().enumerate() {
            if candidate.is_empty() {
                separator = "";
                break;
            }
            if text.contains(candidate.as_str()) {
                separator = candidate;
                finer = &separators[i + 1..];
                break;
            }
        }

        let mut chunks = Vec::new();
        let mut small: Vec<&str> = Vec::new();
        for piece in split_on(text, separator) {
            if char_len(piece) < self.options.chunk_size {
                small.push(piece);
                continue;
            }

            if !small.is_empty() {
                chunks.extend(self.merge_splits(&small, separator));
                small.clear();
            }
            if finer.is_empty() {
                chunks.push(piece.to_string());
            } else {
                chunks.extend(self.split_recursive(piece, finer));
            }
        }
        if !small.is_empty() {
            chunks.extend(self.merge_splits(&small, separator));
        }

        chunks
    }

    fn merge_splits(&self, splits: &[&str], separator: &str) -> Vec<String> {
        let ChunkOptions {
            chunk_size,
            chunk_overlap,
        } = self.options;
        let separator_len = char_len(separator);
        let joiner_len = |current: &VecDeque<&str>| {
            if current.is_empty() { 0 } else { separator_len }
        };

        let mut chunks = Vec::new();
        let mut current: VecDeque<&str> = VecDeque::new();
        let mut total = 0usize;

        for &split in splits {
            let len = char_len(split);
            if total + len + joiner_len(&current) > chunk_size {
                if total > chunk_size {
                    warn!(
                        "Created a chunk of size {}, which is longer than the specified {}",
                        total, chunk_size
                    );
                }
                if !current.is_empty() {
                    if let Some(chunk) = join(&current, separator) {
                        chunks.push(chunk);
                    }
                    while total > chunk_overlap
                        || (total + len + joiner_len(&current) > chunk_size && total > 0)
                    {
                        let Some(first) = current.pop_front() else {
                            break;
                        };
                        total = total.saturating_sub(char_len(first) + joiner_len(&current));
                    }
                }
            }
            current.push_back(split);
            total += len + if current.len() > 1 { separator_len } else { 0 };
        }

        if let Some(chunk) = join(&current, separator) {
            chunks.push(chunk);
        }
        chunks
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

fn split_on<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    if separator.is_empty() {
        text.char_indices()
            .map(|(i, c)| &text[i..i + c.len_utf8()])
            .collect()
    } else {
        text.split(separator).filter(|piece| !piece.is_empty()).collect()
    }
}

fn join(pieces: &VecDeque<&str>, separator: &str) -> Option<String> {
    let joined = pieces.iter().copied().collect::<Vec<_>>().join(separator);
    let trimmed = joined.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn splitter(chunk_size: usize, chunk_overlap: usize) -> RecursiveCharacterSplitter {
        RecursiveCharacterSplitter::new(ChunkOptions {
            chunk_size,
            chunk_overlap,
        })
        .unwrap()
    }

    #[test]
    fn test_merges_words_without_overlap() {
        let chunks = splitter(9, 0).split_text("aaaa bbbb cccc dddd");
        assert_eq!(chunks, vec!["aaaa bbbb", "cccc dddd"]);
    }

    #[test]
    fn test_merges_words_with_overlap() {
        let chunks = splitter(9, 4).split_text("aaaa bbbb cccc dddd");
        assert_eq!(chunks, vec!["aaaa bbbb", "bbbb cccc", "cccc dddd"]);
    }

    #[test]
    fn test_prefers_paragraph_breaks() {
        let chunks = splitter(12, 0).split_text("para one.\n\npara two.");
        assert_eq!(chunks, vec!["para one.", "para two."]);
    }

    #[test]
    fn test_falls_back_to_characters() {
        let chunks = splitter(4, 1).split_text("abcdefghij");
        assert_eq!(chunks, vec!["abcd", "defg", "ghij"]);
    }

    #[test]
    fn test_short_and_empty_text() {
        assert_eq!(splitter(50, 5).split_text("  hello  "), vec!["hello"]);
        assert!(splitter(50, 5).split_text("").is_empty());
        assert!(splitter(50, 5).split_text(" \n\n ").is_empty());
    }

    #[test]
    fn test_counts_characters_not_bytes() {
        let chunks = splitter(3, 0).split_text("ééé ééé");
        assert_eq!(chunks, vec!["ééé", "ééé"]);
    }

    #[test]
    fn test_chunks_respect_size() {
        let text = "Indexing keeps a vector store in sync with its sources. ".repeat(40)
            + "\n\n"
            + &"Records track when each chunk was last seen. ".repeat(30);
        let splitter = splitter(120, 20);

        let chunks = splitter.split_text(&text);

        assert!(chunks.len() > 10);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 120, "chunk too long: {}", chunk);
            assert!(!chunk.is_empty());
        }
    }

    #[test]
    fn test_rejects_invalid_options() {
        let result = RecursiveCharacterSplitter::new(ChunkOptions {
            chunk_size: 10,
            chunk_overlap: 20,
        });
        assert!(matches!(result, Err(ProcessError::InvalidOptions(_))));
    }
}
