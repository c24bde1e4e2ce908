use serde::{Deserialize, Serialize};

/// Shown in place of a title or description that could not be found.
pub const MISSING_VALUE: &str = "None";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    pub text: String,
    pub segments: Vec<Segment>,
    pub language: String,
}

impl Transcript {
    /// Build a transcript whose text is the segments joined by single spaces,
    /// in segment order.
    pub fn from_segments(segments: Vec<Segment>, language: impl Into<String>) -> Self {
        let text = segments
            .iter()
            .map(|seg| seg.text.trim_matches(' '))
            .collect::<Vec<_>>()
            .join(" ")
            .trim()
            .to_string();

        Self {
            text,
            segments,
            language: language.into(),
        }
    }

    pub fn duration_seconds(&self) -> f64 {
        self.segments.last().map(|s| s.end).unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoInfo {
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptReport {
    pub transcript: String,
    pub token_count: usize,
}
