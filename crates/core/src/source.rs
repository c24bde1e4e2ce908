//! Retrieval of watch pages and caption tracks.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::{
    error::RetrievalFailure,
    types::{Segment, Transcript},
};

const WATCH_URL: &str = "https://www.youtube.com/watch";
const CAPTION_TRACKS_MARKER: &str = r#""captionTracks":"#;

/// A parsed video reference.
///
/// YouTube links in any of the common shapes are normalised to the canonical
/// watch page; other http(s) URLs are fetched as given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoRef {
    reference: String,
    video_id: Option<String>,
    page_url: Url,
}

impl VideoRef {
    pub fn parse(reference: &str) -> Result<Self, RetrievalFailure> {
        let invalid = |reason: &str| RetrievalFailure::InvalidReference {
            reference: reference.to_string(),
            reason: reason.to_string(),
        };

        let url = Url::parse(reference.trim()).map_err(|e| invalid(&e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid("only http and https links are supported"));
        }

        let host = url.host_str().unwrap_or_default();
        let host = host
            .strip_prefix("www.")
            .or_else(|| host.strip_prefix("m."))
            .unwrap_or(host);

        let video_id = match host {
            "youtube.com" | "music.youtube.com" | "youtube-nocookie.com" => {
                let id = if url.path() == "/watch" {
                    url.query_pairs()
                        .find(|(key, _)| key == "v")
                        .map(|(_, value)| value.into_owned())
                } else {
                    let mut segments = url.path_segments().into_iter().flatten();
                    match segments.next() {
                        Some("shorts" | "embed" | "live" | "v") => {
                            segments.next().map(String::from)
                        }
                        _ => None,
                    }
                };
                Some(id.ok_or_else(|| invalid("no video id in link"))?)
            }
            "youtu.be" => Some(
                url.path_segments()
                    .into_iter()
                    .flatten()
                    .next()
                    .map(String::from)
                    .ok_or_else(|| invalid("no video id in link"))?,
            ),
            _ => None,
        };

        let page_url = match &video_id {
            Some(id) => {
                if id.is_empty()
                    || !id
                        .chars()
                        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
                {
                    return Err(invalid("malformed video id"));
                }
                Url::parse_with_params(WATCH_URL, &[("v", id)])
                    .map_err(|e| invalid(&e.to_string()))?
            }
            None => url,
        };

        Ok(Self {
            reference: reference.to_string(),
            video_id,
            page_url,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.reference
    }

    pub fn video_id(&self) -> Option<&str> {
        self.video_id.as_deref()
    }

    pub fn page_url(&self) -> &Url {
        &self.page_url
    }
}

/// Where page markup and transcripts come from.
#[async_trait]
pub trait TranscriptSource: Send + Sync {
    /// Raw markup of the page behind the reference.
    async fn watch_page(&self, video: &VideoRef) -> Result<String, RetrievalFailure>;

    /// Caption segments for the video, in playback order.
    async fn transcript(&self, video: &VideoRef) -> Result<Transcript, RetrievalFailure>;
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptionTrack {
    pub base_url: String,
    pub language_code: String,
    /// `"asr"` for auto-generated captions.
    #[serde(default)]
    pub kind: Option<String>,
}

impl CaptionTrack {
    pub fn is_generated(&self) -> bool {
        self.kind.as_deref() == Some("asr")
    }
}

#[derive(Debug, Deserialize)]
struct TimedText {
    #[serde(default)]
    events: Vec<CaptionEvent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CaptionEvent {
    #[serde(default)]
    t_start_ms: u64,
    #[serde(default)]
    d_duration_ms: u64,
    #[serde(default)]
    segs: Vec<CaptionSeg>,
}

#[derive(Debug, Deserialize)]
struct CaptionSeg {
    #[serde(default)]
    utf8: String,
}

/// Decode the `captionTracks` array embedded in a watch page.
///
/// Returns an empty list when the page has no captions at all.
pub fn caption_tracks(markup: &str) -> Result<Vec<CaptionTrack>, RetrievalFailure> {
    let Some(position) = markup.find(CAPTION_TRACKS_MARKER) else {
        return Ok(Vec::new());
    };

    let rest = &markup[position + CAPTION_TRACKS_MARKER.len()..];
    serde_json::Deserializer::from_str(rest)
        .into_iter::<Vec<CaptionTrack>>()
        .next()
        .unwrap_or_else(|| Ok(Vec::new()))
        .map_err(|e| RetrievalFailure::MalformedCaptions {
            reason: e.to_string(),
        })
}

/// Pick a track: for each preferred language, a manual track first and an
/// auto-generated one second; otherwise the first track listed.
pub fn select_track<'a>(
    tracks: &'a [CaptionTrack],
    languages: &[String],
) -> Option<&'a CaptionTrack> {
    languages
        .iter()
        .find_map(|lang| {
            let mut matching = tracks.iter().filter(|t| &t.language_code == lang);
            let manual = matching.clone().find(|t| !t.is_generated());
            manual.or_else(|| matching.next())
        })
        .or_else(|| tracks.first())
}

fn segments_from_timed_text(timed_text: TimedText) -> Vec<Segment> {
    timed_text
        .events
        .into_iter()
        .filter_map(|event| {
            let text: String = event.segs.iter().map(|s| s.utf8.as_str()).collect();
            let text = text.replace('\n', " ").trim().to_string();
            if text.is_empty() {
                return None;
            }
            let start = event.t_start_ms as f64 / 1000.0;
            Some(Segment {
                start,
                end: start + event.d_duration_ms as f64 / 1000.0,
                text,
            })
        })
        .collect()
}

/// Watch pages and caption tracks fetched over HTTP.
pub struct YoutubeSource {
    client: reqwest::Client,
    languages: Vec<String>,
}

impl YoutubeSource {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            languages: vec!["en".to_string()],
        }
    }

    /// Preferred caption languages, most preferred first.
    pub fn with_languages(mut self, languages: Vec<String>) -> Self {
        self.languages = languages;
        self
    }

    async fn fetch_text(&self, url: &Url) -> Result<String, RetrievalFailure> {
        debug!(%url, "fetching");
        let response = self
            .client
            .get(url.clone())
            .header("Accept-Language", "en-US,en;q=0.9")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RetrievalFailure::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(response.text().await?)
    }
}

impl Default for YoutubeSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TranscriptSource for YoutubeSource {
    async fn watch_page(&self, video: &VideoRef) -> Result<String, RetrievalFailure> {
        self.fetch_text(video.page_url()).await
    }

    async fn transcript(&self, video: &VideoRef) -> Result<Transcript, RetrievalFailure> {
        let markup = self.watch_page(video).await?;
        let tracks = caption_tracks(&markup)?;
        let no_transcript = || RetrievalFailure::NoTranscript {
            reference: video.as_str().to_string(),
        };
        let track = select_track(&tracks, &self.languages).ok_or_else(no_transcript)?;

        let mut url = video
            .page_url()
            .join(&track.base_url)
            .map_err(|e| RetrievalFailure::MalformedCaptions {
                reason: e.to_string(),
            })?;
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(key, _)| key != "fmt")
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect();
        url.query_pairs_mut()
            .clear()
            .extend_pairs(pairs)
            .append_pair("fmt", "json3");

        debug!(
            language = %track.language_code,
            generated = track.is_generated(),
            "fetching caption track"
        );
        let body = self.fetch_text(&url).await?;
        if body.trim().is_empty() {
            return Err(no_transcript());
        }

        let timed_text: TimedText =
            serde_json::from_str(&body).map_err(|e| RetrievalFailure::MalformedCaptions {
                reason: e.to_string(),
            })?;

        Ok(Transcript::from_segments(
            segments_from_timed_text(timed_text),
            track.language_code.clone(),
        ))
    }
}
