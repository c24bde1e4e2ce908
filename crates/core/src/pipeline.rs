use tracing::{info, warn};

use crate::{
    chunker::{ChunkerConfig, TextChunker},
    error::{LookupFailure, Result},
    llm::LanguageModel,
    scanner::{DESCRIPTION_MARKER, scan_quoted_field, scan_title},
    source::{TranscriptSource, VideoRef},
    summarize::{DEFAULT_REDUCE_TOKEN_MAX, MapReduceSummarizer, SummarizerConfig},
    tokens::TokenCounter,
    types::{MISSING_VALUE, TranscriptReport, VideoInfo},
};

/// User-facing knobs of a summarization run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SummaryParams {
    pub temperature: f32,
    pub chunk_size: usize,
    pub overlap_size: usize,
    pub reduce_token_max: usize,
}

impl SummaryParams {
    pub fn new(temperature: f32, chunk_size: usize, overlap_size: usize) -> Self {
        Self {
            temperature,
            chunk_size,
            overlap_size,
            reduce_token_max: DEFAULT_REDUCE_TOKEN_MAX,
        }
    }
}

fn or_missing(field: &str, value: std::result::Result<String, LookupFailure>) -> String {
    value.unwrap_or_else(|e| {
        warn!(field, error = %e, "field not found in page, using default");
        MISSING_VALUE.to_string()
    })
}

/// Title and description scanned from the video's watch page. Either one
/// falls back to `"None"` when the page does not carry it. The title has its
/// JSON escapes decoded; the description is kept raw.
pub async fn get_video_info<S>(source: &S, reference: &str) -> Result<VideoInfo>
where
    S: TranscriptSource + ?Sized,
{
    let video = VideoRef::parse(reference)?;
    let markup = source.watch_page(&video).await?;

    let title = or_missing("title", scan_title(&markup));
    let description = or_missing("description", scan_quoted_field(&markup, DESCRIPTION_MARKER));

    Ok(VideoInfo { title, description })
}

/// Full transcript text and its token count.
pub async fn get_transcript<S, C>(
    source: &S,
    counter: &C,
    reference: &str,
) -> Result<TranscriptReport>
where
    S: TranscriptSource + ?Sized,
    C: TokenCounter + ?Sized,
{
    let video = VideoRef::parse(reference)?;
    let transcript = source.transcript(&video).await?;
    let token_count = counter.count(&transcript.text);

    info!(
        segments = transcript.segments.len(),
        token_count, "transcript retrieved"
    );

    Ok(TranscriptReport {
        transcript: transcript.text,
        token_count,
    })
}

/// Chunk the transcript and reduce it to one synopsis.
///
/// All parameters are validated before anything is fetched.
pub async fn summarize<S, M, C>(
    source: &S,
    model: &M,
    counter: &C,
    reference: &str,
    params: SummaryParams,
) -> Result<String>
where
    S: TranscriptSource + ?Sized,
    M: LanguageModel + ?Sized,
    C: TokenCounter + ?Sized,
{
    let chunker_config = ChunkerConfig::new(params.chunk_size, params.overlap_size)?;
    let summarizer_config = SummarizerConfig::new(params.temperature)?
        .with_reduce_token_max(params.reduce_token_max)?;
    let video = VideoRef::parse(reference)?;

    let transcript = source.transcript(&video).await?;
    info!(
        segments = transcript.segments.len(),
        chunk_size = params.chunk_size,
        overlap_size = params.overlap_size,
        "summarizing transcript"
    );

    let chunker = TextChunker::new(chunker_config, counter);
    let summarizer = MapReduceSummarizer::new(model, counter, summarizer_config);

    Ok(summarizer.summarize(chunker.chunks(&transcript.text)).await?)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::{
        error::{ConfigurationError, InferenceFailure, InsightError, RetrievalFailure},
        tokens::WhitespaceCounter,
        types::{Segment, Transcript},
    };

    struct FakeSource {
        markup: String,
        segments: Vec<&'static str>,
        fetches: AtomicUsize,
    }

    impl FakeSource {
        fn new(markup: &str, segments: Vec<&'static str>) -> Self {
            Self {
                markup: markup.to_string(),
                segments,
                fetches: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl TranscriptSource for FakeSource {
        async fn watch_page(
            &self,
            _video: &VideoRef,
        ) -> std::result::Result<String, RetrievalFailure> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            Ok(self.markup.clone())
        }

        async fn transcript(
            &self,
            _video: &VideoRef,
        ) -> std::result::Result<Transcript, RetrievalFailure> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            let segments = self
                .segments
                .iter()
                .enumerate()
                .map(|(i, text)| Segment {
                    start: i as f64,
                    end: i as f64 + 1.0,
                    text: text.to_string(),
                })
                .collect();
            Ok(Transcript::from_segments(segments, "en"))
        }
    }

    struct EchoModel {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl LanguageModel for EchoModel {
        async fn complete(
            &self,
            _system: &str,
            _user: &str,
            _temperature: f32,
        ) -> std::result::Result<String, InferenceFailure> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(format!("summary {n}"))
        }
    }

    const URL: &str = "https://www.youtube.com/watch?v=abc123";

    #[tokio::test]
    async fn test_video_info_from_markup() {
        let source = FakeSource::new(
            r#"{"videoDetails":{"title":"Rust \u0026 \"C\"","shortDescription":"A \"fast\" intro"}}"#,
            vec![],
        );

        let info = get_video_info(&source, URL).await.unwrap();

        assert_eq!(info.title, r#"Rust & "C""#);
        assert_eq!(info.description, r#"A \"fast\" intro"#);
    }

    #[tokio::test]
    async fn test_video_info_defaults_to_none() {
        let source = FakeSource::new("<html>consent wall</html>", vec![]);

        let info = get_video_info(&source, URL).await.unwrap();

        assert_eq!(info.title, "None");
        assert_eq!(info.description, "None");
    }

    #[tokio::test]
    async fn test_invalid_reference_never_reaches_source() {
        let source = FakeSource::new("", vec![]);

        let err = get_video_info(&source, "definitely not a link").await.unwrap_err();

        assert!(matches!(
            err,
            InsightError::Retrieval(RetrievalFailure::InvalidReference { .. })
        ));
        assert_eq!(source.fetches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_transcript_joined_and_counted() {
        let source = FakeSource::new("", vec![" so today ", "we talk", "about chunking"]);

        let report = get_transcript(&source, &WhitespaceCounter, URL).await.unwrap();

        assert_eq!(report.transcript, "so today we talk about chunking");
        assert_eq!(report.token_count, 6);
    }

    #[tokio::test]
    async fn test_summarize_runs_map_and_reduce() {
        let segment: &'static str = Box::leak(
            (0..100)
                .map(|i| format!("w{i}"))
                .collect::<Vec<_>>()
                .join(" ")
                .into_boxed_str(),
        );
        let source = FakeSource::new("", vec![segment; 5]);
        let model = EchoModel {
            calls: AtomicUsize::new(0),
        };

        let summary = summarize(
            &source,
            &model,
            &WhitespaceCounter,
            URL,
            SummaryParams::new(0.7, 200, 0),
        )
        .await
        .unwrap();

        // 500 words in chunks of 200: three map calls and one reduce.
        assert_eq!(summary, "summary 4");
        assert_eq!(model.calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_summarize_rejects_config_before_fetching() {
        let source = FakeSource::new("", vec!["text"]);
        let model = EchoModel {
            calls: AtomicUsize::new(0),
        };

        let err = summarize(
            &source,
            &model,
            &WhitespaceCounter,
            URL,
            SummaryParams::new(0.7, 4000, 4000),
        )
        .await
        .unwrap_err();

        assert!(matches!(
            err,
            InsightError::Configuration(ConfigurationError::OverlapTooLarge {
                overlap: 4000,
                chunk_size: 4000
            })
        ));
        assert_eq!(source.fetches.load(Ordering::SeqCst), 0);
        assert_eq!(model.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_summarize_rejects_bad_temperature() {
        let source = FakeSource::new("", vec!["text"]);
        let model = EchoModel {
            calls: AtomicUsize::new(0),
        };

        let err = summarize(
            &source,
            &model,
            &WhitespaceCounter,
            URL,
            SummaryParams::new(-0.1, 4000, 0),
        )
        .await
        .unwrap_err();

        assert!(matches!(
            err,
            InsightError::Configuration(ConfigurationError::TemperatureOutOfRange { .. })
        ));
        assert_eq!(source.fetches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_summarize_empty_transcript() {
        let source = FakeSource::new("", vec![]);
        let model = EchoModel {
            calls: AtomicUsize::new(0),
        };

        let err = summarize(
            &source,
            &model,
            &WhitespaceCounter,
            URL,
            SummaryParams::new(0.7, 4000, 0),
        )
        .await
        .unwrap_err();

        assert!(matches!(
            err,
            InsightError::Inference(InferenceFailure::EmptyInput)
        ));
    }
}
