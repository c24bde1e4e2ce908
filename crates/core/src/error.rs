use thiserror::Error;

use crate::provider::ProviderError;

/// The scanner could not find or close a quoted field in the page markup.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupFailure {
    #[error("Marker {marker:?} not found in markup")]
    MarkerNotFound { marker: String },

    #[error("Value after marker {marker:?} has no closing quote")]
    Unterminated { marker: String },
}

#[derive(Error, Debug)]
pub enum RetrievalFailure {
    #[error("Invalid video reference {reference:?}: {reason}")]
    InvalidReference { reference: String, reason: String },

    #[error("Request to {url} failed with status {status}")]
    Status { url: String, status: u16 },

    #[error("No transcript available for {reference}")]
    NoTranscript { reference: String },

    #[error("Malformed caption data: {reason}")]
    MalformedCaptions { reason: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
}

#[derive(Error, Debug)]
pub enum InferenceFailure {
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error {status}: {body}")]
    ApiError { status: u16, body: String },

    #[error("Invalid API response: {0}")]
    InvalidApiResponse(serde_json::Value),

    #[error("Nothing to summarize: the transcript produced no chunks")]
    EmptyInput,

    #[error("Partial summaries still exceed {budget} tokens after {passes} collapse passes")]
    ReduceDiverged { passes: usize, budget: usize },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    #[error("Overlap of {overlap} tokens must be smaller than the chunk size of {chunk_size}")]
    OverlapTooLarge { overlap: usize, chunk_size: usize },

    #[error("Chunk size {chunk_size} is below the minimum of {minimum} tokens")]
    ChunkSizeTooSmall { chunk_size: usize, minimum: usize },

    #[error("Temperature {temperature} is outside [0.0, 1.0]")]
    TemperatureOutOfRange { temperature: f32 },

    #[error("Reduce budget {budget} is below the minimum of {minimum} tokens")]
    ReduceBudgetTooSmall { budget: usize, minimum: usize },

    #[error("Tokenizer unavailable: {reason}")]
    Tokenizer { reason: String },
}

#[derive(Error, Debug)]
pub enum InsightError {
    #[error(transparent)]
    Lookup(#[from] LookupFailure),

    #[error(transparent)]
    Retrieval(#[from] RetrievalFailure),

    #[error(transparent)]
    Inference(#[from] InferenceFailure),

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}

pub type Result<T> = std::result::Result<T, InsightError>;
