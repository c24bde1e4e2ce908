//! Token-aware text chunking with a hierarchy of separators.
//!
//! Text is first cut into pieces: anything over the piece budget is split on
//! paragraph breaks, and whatever is still too large is split again on the
//! next finer separator, down to single grapheme clusters. Pieces are then
//! merged greedily into chunks of at most `max_size` tokens, each chunk
//! starting with the trailing `overlap` tokens of the chunk before it.

use std::ops::Range;

use tracing::{debug, warn};
use unicode_segmentation::UnicodeSegmentation;

use crate::{error::ConfigurationError, tokens::TokenCounter};

/// Smallest chunk size accepted, in tokens.
pub const MIN_CHUNK_SIZE: usize = 200;

/// Candidate split points, coarsest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Separator {
    /// Blank line between paragraphs.
    Paragraph,
    /// Single line break.
    Line,
    /// Unicode sentence boundary.
    Sentence,
    /// Start of a whitespace run; each word keeps the whitespace before it.
    Word,
    /// Grapheme cluster.
    Character,
}

impl Separator {
    pub const HIERARCHY: [Separator; 5] = [
        Separator::Paragraph,
        Separator::Line,
        Separator::Sentence,
        Separator::Word,
        Separator::Character,
    ];

    /// Consecutive spans of `text`; joined together they give back `text`.
    pub fn split(self, text: &str) -> Vec<&str> {
        match self {
            Separator::Paragraph => text.split_inclusive("\n\n").collect(),
            Separator::Line => text.split_inclusive('\n').collect(),
            Separator::Sentence => text.split_sentence_bounds().collect(),
            Separator::Word => split_words(text),
            Separator::Character => text.graphemes(true).collect(),
        }
    }
}

fn split_words(text: &str) -> Vec<&str> {
    let mut spans = Vec::new();
    let mut start = 0;
    let mut previous_is_space = true;

    for (i, c) in text.char_indices() {
        let is_space = c.is_whitespace();
        if is_space && !previous_is_space && i > start {
            spans.push(&text[start..i]);
            start = i;
        }
        previous_is_space = is_space;
    }

    if start < text.len() {
        spans.push(&text[start..]);
    }
    spans
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkerConfig {
    max_size: usize,
    overlap: usize,
    separators: Vec<Separator>,
}

impl ChunkerConfig {
    /// Validate sizes before any chunking work happens.
    pub fn new(max_size: usize, overlap: usize) -> Result<Self, ConfigurationError> {
        if max_size < MIN_CHUNK_SIZE {
            return Err(ConfigurationError::ChunkSizeTooSmall {
                chunk_size: max_size,
                minimum: MIN_CHUNK_SIZE,
            });
        }
        if overlap >= max_size {
            return Err(ConfigurationError::OverlapTooLarge {
                overlap,
                chunk_size: max_size,
            });
        }

        Ok(Self {
            max_size,
            overlap,
            separators: Separator::HIERARCHY.to_vec(),
        })
    }

    /// Replace the separator hierarchy. Without `Character` at the end, a
    /// piece that no separator can split may produce an oversized chunk.
    pub fn with_separators(mut self, separators: Vec<Separator>) -> Self {
        self.separators = separators;
        self
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    pub fn separators(&self) -> &[Separator] {
        &self.separators
    }
}

/// A contiguous span of the source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk<'a> {
    pub index: usize,
    pub text: &'a str,
    /// Byte range of `text` in the source.
    pub range: Range<usize>,
    /// Length in bytes of the prefix repeated from the previous chunk.
    pub overlap: usize,
    pub token_count: usize,
}

impl<'a> Chunk<'a> {
    /// The part of the chunk not shared with its predecessor.
    pub fn fresh_text(&self) -> &'a str {
        &self.text[self.overlap..]
    }

    pub fn overlap_text(&self) -> &'a str {
        &self.text[..self.overlap]
    }
}

pub struct TextChunker<C> {
    config: ChunkerConfig,
    counter: C,
}

impl<C: TokenCounter> TextChunker<C> {
    pub fn new(config: ChunkerConfig, counter: C) -> Self {
        Self { config, counter }
    }

    pub fn config(&self) -> &ChunkerConfig {
        &self.config
    }

    /// Split `text` into chunks.
    ///
    /// Pieces are cut up front; chunks are assembled one at a time as the
    /// iterator is driven.
    pub fn chunks<'t>(&self, text: &'t str) -> Chunks<'t, '_, C> {
        let budget = self.config.max_size - self.config.overlap;
        let mut pieces = Vec::new();
        if !text.is_empty() {
            cut_pieces(
                text,
                0,
                &self.config.separators,
                budget,
                &self.counter,
                &mut pieces,
            );
        }
        debug!(
            pieces = pieces.len(),
            bytes = text.len(),
            budget,
            "cut text into pieces"
        );

        Chunks {
            text,
            counter: &self.counter,
            max_size: self.config.max_size,
            overlap: self.config.overlap,
            pieces,
            next_piece: 0,
            carry: None,
            index: 0,
        }
    }
}

#[derive(Debug, Clone)]
struct Piece {
    range: Range<usize>,
    tokens: usize,
}

fn cut_pieces<C: TokenCounter>(
    span: &str,
    offset: usize,
    separators: &[Separator],
    budget: usize,
    counter: &C,
    out: &mut Vec<Piece>,
) {
    let tokens = counter.count(span);
    let range = offset..offset + span.len();

    if tokens <= budget {
        out.push(Piece { range, tokens });
        return;
    }

    let Some((separator, finer)) = separators.split_first() else {
        out.push(Piece { range, tokens });
        return;
    };

    let parts = separator.split(span);
    if parts.len() <= 1 {
        cut_pieces(span, offset, finer, budget, counter, out);
        return;
    }

    let mut at = offset;
    for part in parts {
        cut_pieces(part, at, finer, budget, counter, out);
        at += part.len();
    }
}

/// Lazy chunk sequence produced by [`TextChunker::chunks`].
pub struct Chunks<'t, 'c, C> {
    text: &'t str,
    counter: &'c C,
    max_size: usize,
    overlap: usize,
    pieces: Vec<Piece>,
    next_piece: usize,
    /// Byte offset where the next chunk's overlap begins.
    carry: Option<usize>,
    index: usize,
}

impl<C: TokenCounter> Chunks<'_, '_, C> {
    fn measure(&self, start: usize, end_piece: usize) -> usize {
        let end = self.pieces[end_piece - 1].range.end;
        self.counter.count(&self.text[start..end])
    }

    /// Largest run of pieces from `first` that fits beside the text starting
    /// at `start`. Always takes at least one piece.
    fn fit(&self, start: usize, first: usize) -> (usize, usize) {
        let piece_start = self.pieces[first].range.start;
        let mut estimate = if start < piece_start {
            self.counter.count(&self.text[start..piece_start])
        } else {
            0
        };

        let mut end_piece = first;
        while end_piece < self.pieces.len()
            && estimate + self.pieces[end_piece].tokens <= self.max_size
        {
            estimate += self.pieces[end_piece].tokens;
            end_piece += 1;
        }
        end_piece = end_piece.max(first + 1);

        // Piece counts do not add up exactly under BPE, so settle on the
        // real count of the joined text.
        let mut tokens = self.measure(start, end_piece);
        while tokens > self.max_size && end_piece > first + 1 {
            end_piece -= 1;
            tokens = self.measure(start, end_piece);
        }
        while end_piece < self.pieces.len() {
            let candidate = self.measure(start, end_piece + 1);
            if candidate > self.max_size {
                break;
            }
            end_piece += 1;
            tokens = candidate;
        }

        (end_piece, tokens)
    }

    /// Where the trailing `overlap` tokens of `start..end` begin.
    fn overlap_start(&self, start: usize, end: usize) -> usize {
        start + self.counter.tail_start(&self.text[start..end], self.overlap)
    }
}

impl<'t, C: TokenCounter> Iterator for Chunks<'t, '_, C> {
    type Item = Chunk<'t>;

    fn next(&mut self) -> Option<Self::Item> {
        let first = self.next_piece;
        if first >= self.pieces.len() {
            return None;
        }

        let piece_start = self.pieces[first].range.start;
        let mut start = self.carry.take().unwrap_or(piece_start);
        let (mut end_piece, mut tokens) = self.fit(start, first);

        if tokens > self.max_size && start < piece_start {
            debug!(
                index = self.index,
                "overlap does not fit beside the next piece, dropping it"
            );
            start = piece_start;
            (end_piece, tokens) = self.fit(start, first);
        }

        if tokens > self.max_size {
            warn!(
                index = self.index,
                tokens,
                max_size = self.max_size,
                "emitting oversized chunk for an indivisible piece"
            );
        }

        let end = self.pieces[end_piece - 1].range.end;
        let chunk = Chunk {
            index: self.index,
            text: &self.text[start..end],
            range: start..end,
            overlap: piece_start - start,
            token_count: tokens,
        };

        self.next_piece = end_piece;
        self.index += 1;
        if self.overlap > 0 && end_piece < self.pieces.len() {
            self.carry = Some(self.overlap_start(start, end));
        }

        Some(chunk)
    }
}
