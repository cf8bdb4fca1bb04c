use std::sync::Arc;

use tiktoken_rs::CoreBPE;

use super::BudgetError;

/// Counts tokens for length estimation.
pub trait Tokenizer: Send + Sync {
    fn count(&self, text: &str) -> usize;
}

/// BPE tokenizer backed by `tiktoken-rs`.
///
/// Cloning is cheap; the encoder is shared.
#[derive(Clone)]
pub struct TiktokenTokenizer {
    encoder: Arc<CoreBPE>,
}

impl TiktokenTokenizer {
    /// The `o200k_base` encoding used by current OpenAI models.
    pub fn o200k_base() -> Result<Self, BudgetError> {
        let encoder = tiktoken_rs::o200k_base().map_err(|e| BudgetError::Tokenizer(e.to_string()))?;
        Ok(Self {
            encoder: Arc::new(encoder),
        })
    }

    /// The older `cl100k_base` encoding.
    pub fn cl100k_base() -> Result<Self, BudgetError> {
        let encoder = tiktoken_rs::cl100k_base().map_err(|e| BudgetError::Tokenizer(e.to_string()))?;
        Ok(Self {
            encoder: Arc::new(encoder),
        })
    }
}

impl Tokenizer for TiktokenTokenizer {
    fn count(&self, text: &str) -> usize {
        self.encoder.encode_with_special_tokens(text).len()
    }
}

impl std::fmt::Debug for TiktokenTokenizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TiktokenTokenizer").finish_non_exhaustive()
    }
}

/// Character-ratio estimate. Deterministic and allocation-free.
#[derive(Debug, Clone)]
pub struct ApproxTokenizer {
    pub chars_per_token: f32,
}

impl ApproxTokenizer {
    pub fn new(chars_per_token: f32) -> Self {
        Self { chars_per_token }
    }
}

impl Default for ApproxTokenizer {
    fn default() -> Self {
        Self {
            chars_per_token: 4.0,
        }
    }
}

impl Tokenizer for ApproxTokenizer {
    fn count(&self, text: &str) -> usize {
        (text.chars().count() as f32 / self.chars_per_token).ceil() as usize
    }
}
