use std::sync::OnceLock;

use tiktoken_rs::CoreBPE;

use crate::error::ConfigurationError;

/// Counts tokens in a piece of text. Implementations must be deterministic.
pub trait TokenCounter: Send + Sync {
    fn count(&self, text: &str) -> usize;

    /// Byte offset in `text` where its trailing `tokens` tokens begin.
    ///
    /// The default searches for the earliest char boundary whose suffix
    /// counts no more than `tokens`. Counters that can see their own token
    /// stream should cut on a token boundary instead.
    fn tail_start(&self, text: &str, tokens: usize) -> usize {
        let bounds: Vec<usize> = text
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(text.len()))
            .collect();

        let fits = |at: usize| self.count(&text[at..]) <= tokens;
        let found = bounds.partition_point(|&at| !fits(at));

        bounds[found..]
            .iter()
            .copied()
            .find(|&at| fits(at))
            .unwrap_or(text.len())
    }
}

impl<T: TokenCounter + ?Sized> TokenCounter for &T {
    fn count(&self, text: &str) -> usize {
        (**self).count(text)
    }

    fn tail_start(&self, text: &str, tokens: usize) -> usize {
        (**self).tail_start(text, tokens)
    }
}

/// GPT-4 (`cl100k_base`) token counts.
#[derive(Clone, Copy)]
pub struct TiktokenCounter {
    encoder: &'static CoreBPE,
}

impl TiktokenCounter {
    pub fn new() -> Result<Self, ConfigurationError> {
        static ENCODER: OnceLock<Result<CoreBPE, String>> = OnceLock::new();

        let encoder = ENCODER
            .get_or_init(|| tiktoken_rs::cl100k_base().map_err(|e| e.to_string()))
            .as_ref()
            .map_err(|reason| ConfigurationError::Tokenizer {
                reason: reason.clone(),
            })?;

        Ok(Self { encoder })
    }
}

impl TokenCounter for TiktokenCounter {
    fn count(&self, text: &str) -> usize {
        self.encoder.encode_ordinary(text).len()
    }

    fn tail_start(&self, text: &str, tokens: usize) -> usize {
        let mut encoded = self.encoder.encode_ordinary(text);
        encoded.truncate(encoded.len().saturating_sub(tokens));

        let mut at: usize = self
            .encoder
            ._decode_native_and_split(encoded)
            .map(|bytes| bytes.len())
            .sum();
        // A multi-byte char can be split across tokens.
        while !text.is_char_boundary(at) {
            at += 1;
        }
        at
    }
}

/// Whitespace-delimited word count.
///
/// Text that is not empty but has no words still counts as one token.
#[derive(Debug, Clone, Copy, Default)]
pub struct WhitespaceCounter;

impl TokenCounter for WhitespaceCounter {
    fn count(&self, text: &str) -> usize {
        let count = text.split_whitespace().count();
        if count == 0 && !text.is_empty() {
            1
        } else {
            count
        }
    }

    fn tail_start(&self, text: &str, tokens: usize) -> usize {
        if tokens == 0 {
            return text.len();
        }

        let mut previous_is_space = true;
        let starts: Vec<usize> = text
            .char_indices()
            .filter_map(|(i, c)| {
                let starts_word = !c.is_whitespace() && previous_is_space;
                previous_is_space = c.is_whitespace();
                starts_word.then_some(i)
            })
            .collect();

        if starts.len() <= tokens {
            0
        } else {
            starts[starts.len() - tokens]
        }
    }
}
