//! Prompt budgeting.
//!
//! Shortens text so its token count fits a limit, cutting on paragraph,
//! line and word boundaries where possible.

mod splitter;
mod tokenizer;

use std::sync::Arc;

use thiserror::Error;
use tracing::{trace, warn};

pub use splitter::{RecursiveCharacterSplitter, DEFAULT_SEPARATORS};
pub use tokenizer::{ApproxTokenizer, TiktokenTokenizer, Tokenizer};

use splitter::char_len;

/// Granularity of trim cut points, and the shortest prefix a trim
/// returns once nothing on a boundary fits.
pub const MIN_CHUNK_SIZE: usize = 140;

#[derive(Error, Debug)]
pub enum BudgetError {
    #[error("Tokenizer unavailable: {0}")]
    Tokenizer(String),
}

/// Fits text into a token budget.
#[derive(Clone)]
pub struct PromptBudgeter {
    tokenizer: Arc<dyn Tokenizer>,
}

impl PromptBudgeter {
    pub fn new(tokenizer: Arc<dyn Tokenizer>) -> Self {
        Self { tokenizer }
    }

    /// Budgeter backed by the `o200k_base` BPE encoding, or `cl100k_base`
    /// when that one cannot be loaded.
    pub fn tiktoken() -> Result<Self, BudgetError> {
        let tokenizer = TiktokenTokenizer::o200k_base().or_else(|e| {
            warn!(error = %e, "o200k_base unavailable, using cl100k_base");
            TiktokenTokenizer::cl100k_base()
        })?;
        Ok(Self::new(Arc::new(tokenizer)))
    }

    /// Budgeter using a character-ratio estimate instead of a real encoder.
    pub fn approximate() -> Self {
        Self::new(Arc::new(ApproxTokenizer::default()))
    }

    pub fn count(&self, text: &str) -> usize {
        self.tokenizer.count(text)
    }

    /// Returns `text` unchanged if it fits `max_tokens`, otherwise its
    /// longest prefix that fits and ends on a chunk boundary.
    ///
    /// Chunks come from a [`RecursiveCharacterSplitter`] with
    /// [`MIN_CHUNK_SIZE`] and no overlap, so cuts land on paragraph, line or
    /// word boundaries when the text has them. Cut points do not depend on
    /// the budget: a larger budget never yields a shorter prefix, and
    /// trimming a trimmed string returns it unchanged. When no boundary
    /// prefix fits, the first [`MIN_CHUNK_SIZE`] characters are returned.
    pub fn trim(&self, text: &str, max_tokens: usize) -> String {
        if text.is_empty() {
            return String::new();
        }

        let tokens = self.tokenizer.count(text);
        if tokens <= max_tokens {
            return text.to_string();
        }

        let ends = RecursiveCharacterSplitter::new(MIN_CHUNK_SIZE, 0).chunk_ends(text);

        // Largest number of leading chunks that fits.
        let (mut lo, mut hi) = (0usize, ends.len());
        while lo < hi {
            let mid = (lo + hi + 1) / 2;
            if self.tokenizer.count(&text[..ends[mid - 1]]) <= max_tokens {
                lo = mid;
            } else {
                hi = mid - 1;
            }
        }

        let fitted = if lo == 0 { "" } else { &text[..ends[lo - 1]] };
        let floor = take_chars(text, MIN_CHUNK_SIZE);
        let kept = if fitted.len() >= floor.len() { fitted } else { floor };

        trace!(
            tokens,
            max_tokens,
            chunks = lo,
            kept_chars = char_len(kept),
            "Trimmed prompt"
        );
        kept.to_string()
    }
}

impl std::fmt::Debug for PromptBudgeter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PromptBudgeter").finish_non_exhaustive()
    }
}

/// The first `n` characters of `text`, never splitting a code point.
pub fn take_chars(text: &str, n: usize) -> &str {
    match text.char_indices().nth(n) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
