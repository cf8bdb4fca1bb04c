use std::collections::VecDeque;

use tracing::warn;

/// Separators tried in order: paragraphs, lines, words, characters.
pub const DEFAULT_SEPARATORS: &[&str] = &["\n\n", "\n", " ", ""];

/// Splits text into chunks of at most `chunk_size` characters, preferring
/// the coarsest separator that occurs in the text and recursing into
/// pieces that are still too long.
///
/// Lengths are measured in characters. Separators are not counted towards
/// a chunk's size, so a merged chunk may run slightly over.
#[derive(Debug, Clone)]
pub struct RecursiveCharacterSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
}

impl RecursiveCharacterSplitter {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            chunk_overlap,
            separators: DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn split_text(&self, text: &str) -> Vec<String> {
        let mut chunks = Vec::new();
        self.split_recursive(text, &self.separators, &mut chunks);
        chunks
    }

    /// Byte offsets in `text` at which each chunk of [`split_text`] ends.
    ///
    /// Chunks are trimmed substrings of `text` in order, so every offset is a
    /// char boundary and `text[..end]` never ends in whitespace.
    ///
    /// [`split_text`]: Self::split_text
    pub fn chunk_ends(&self, text: &str) -> Vec<usize> {
        let mut ends = Vec::new();
        let mut cursor = 0;
        for chunk in self.split_text(text) {
            if let Some(pos) = text[cursor..].find(chunk.as_str()) {
                cursor += pos + chunk.len();
                ends.push(cursor);
            }
        }
        ends
    }

    fn split_recursive(&self, text: &str, separators: &[String], out: &mut Vec<String>) {
        let position = separators
            .iter()
            .position(|s| s.is_empty() || text.contains(s.as_str()));
        let (separator, remaining) = match position {
            Some(i) => (separators[i].as_str(), &separators[i + 1..]),
            None => ("", &separators[separators.len()..]),
        };

        let pieces: Vec<&str> = if separator.is_empty() {
            text.char_indices()
                .map(|(i, c)| &text[i..i + c.len_utf8()])
                .collect()
        } else {
            text.split(separator).collect()
        };

        let mut good: Vec<&str> = Vec::new();
        for piece in pieces {
            if char_len(piece) < self.chunk_size {
                good.push(piece);
                continue;
            }

            if !good.is_empty() {
                self.merge_splits(&good, separator, out);
                good.clear();
            }

            if remaining.is_empty() {
                // Nothing finer to split on.
                let trimmed = piece.trim();
                if !trimmed.is_empty() {
                    out.push(trimmed.to_string());
                }
            } else {
                self.split_recursive(piece, remaining, out);
            }
        }

        if !good.is_empty() {
            self.merge_splits(&good, separator, out);
        }
    }

    fn merge_splits(&self, splits: &[&str], separator: &str, out: &mut Vec<String>) {
        let mut current: VecDeque<&str> = VecDeque::new();
        let mut total = 0usize;

        for &piece in splits {
            let len = char_len(piece);

            if total + len >= self.chunk_size {
                if total > self.chunk_size {
                    warn!(
                        total,
                        chunk_size = self.chunk_size,
                        "Created a chunk larger than the configured size"
                    );
                }

                if !current.is_empty() {
                    if let Some(doc) = join_docs(&current, separator) {
                        out.push(doc);
                    }

                    while total > self.chunk_overlap || (total + len > self.chunk_size && total > 0) {
                        match current.pop_front() {
                            Some(first) => total -= char_len(first),
                            None => break,
                        }
                    }
                }
            }

            current.push_back(piece);
            total += len;
        }

        if let Some(doc) = join_docs(&current, separator) {
            out.push(doc);
        }
    }
}

fn join_docs(docs: &VecDeque<&str>, separator: &str) -> Option<String> {
    let joined = docs.iter().copied().collect::<Vec<_>>().join(separator);
    let trimmed = joined.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

pub(crate) fn char_len(text: &str) -> usize {
    text.chars().count()
}
