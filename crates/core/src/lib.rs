//! Video info, transcripts and map-reduce synopses for YouTube videos.
//!
//! The three entry points live in [`pipeline`]; everything they need
//! (page scanning, token counting, chunking, the chat client) is exposed
//! so callers can assemble their own flows.

pub mod chunker;
pub mod error;
pub mod format;
pub mod llm;
pub mod pipeline;
pub mod provider;
pub mod scanner;
pub mod source;
pub mod summarize;
pub mod tokens;
pub mod types;

pub use chunker::{Chunk, ChunkerConfig, MIN_CHUNK_SIZE, Separator, TextChunker};
pub use error::{
    ConfigurationError, InferenceFailure, InsightError, LookupFailure, Result, RetrievalFailure,
};
pub use format::{format_timestamp, format_transcript_with_timestamps, format_video_info};
pub use llm::{ChatClient, LanguageModel};
pub use pipeline::{SummaryParams, get_transcript, get_video_info, summarize};
pub use provider::{Provider, ProviderConfig, ProviderError};
pub use scanner::{scan_quoted_field, scan_quoted_field_after, scan_title};
pub use source::{TranscriptSource, VideoRef, YoutubeSource};
pub use summarize::{MapReduceSummarizer, SummarizerConfig};
pub use tokens::{TiktokenCounter, TokenCounter, WhitespaceCounter};
pub use types::{Segment, Transcript, TranscriptReport, VideoInfo};
