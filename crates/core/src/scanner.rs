//! Escape-aware extraction of a quoted field from raw page markup.
//!
//! The value is returned exactly as it appears in the markup: escape
//! sequences such as `\"` or `\n` are kept as raw characters. Only
//! [`scan_title`] decodes them.

use crate::error::LookupFailure;

/// Marker preceding the video description in a YouTube watch page.
pub const DESCRIPTION_MARKER: &str = r#"shortDescription":""#;

/// Marker preceding the video title inside the `videoDetails` object.
pub const TITLE_MARKER: &str = r#""title":""#;

/// Anchor for the object that holds the canonical title.
pub const VIDEO_DETAILS_ANCHOR: &str = r#""videoDetails""#;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Scanning,
    Done,
}

/// Scan the value that follows the first occurrence of `marker`.
///
/// A `"` ends the value unless the character right before it is a
/// backslash, in which case it is kept and scanning goes on.
pub fn scan_quoted_field(markup: &str, marker: &str) -> Result<String, LookupFailure> {
    let start = markup
        .find(marker)
        .ok_or_else(|| LookupFailure::MarkerNotFound {
            marker: marker.to_string(),
        })?
        + marker.len();

    let mut value = String::new();
    let mut state = ScanState::Scanning;
    let mut previous = markup[..start].chars().next_back();
    let mut cursor = markup[start..].chars();

    while state == ScanState::Scanning {
        let Some(letter) = cursor.next() else {
            return Err(LookupFailure::Unterminated {
                marker: marker.to_string(),
            });
        };

        if letter == '"' && previous != Some('\\') {
            state = ScanState::Done;
        } else {
            value.push(letter);
            previous = Some(letter);
        }
    }

    Ok(value)
}

/// Scan `marker`, starting the search at the first occurrence of `anchor`.
///
/// Falls back to the whole markup when the anchor is absent.
pub fn scan_quoted_field_after(
    markup: &str,
    anchor: &str,
    marker: &str,
) -> Result<String, LookupFailure> {
    let offset = markup.find(anchor).unwrap_or(0);
    scan_quoted_field(&markup[offset..], marker)
}

/// Video title from the `videoDetails` object, with JSON escapes decoded.
///
/// A value that does not decode as a JSON string is returned raw.
pub fn scan_title(markup: &str) -> Result<String, LookupFailure> {
    let raw = scan_quoted_field_after(markup, VIDEO_DETAILS_ANCHOR, TITLE_MARKER)?;
    Ok(serde_json::from_str::<String>(&format!("\"{raw}\"")).unwrap_or(raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_description() {
        let html = r#"<script>var x = {"shortDescription":"Just a video","isCrawlable":true}</script>"#;
        assert_eq!(
            scan_quoted_field(html, DESCRIPTION_MARKER).unwrap(),
            "Just a video"
        );
    }

    #[test]
    fn test_escaped_quotes_are_kept_literally() {
        let html = r#"..."shortDescription":"A \"cool\" video"..."#;
        assert_eq!(
            scan_quoted_field(html, DESCRIPTION_MARKER).unwrap(),
            r#"A \"cool\" video"#
        );
    }

    #[test]
    fn test_other_escapes_pass_through() {
        let html = r#""shortDescription":"line one\nline two & more","x":1"#;
        assert_eq!(
            scan_quoted_field(html, DESCRIPTION_MARKER).unwrap(),
            r#"line one\nline two & more"#
        );
    }

    #[test]
    fn test_empty_value() {
        let html = r#""shortDescription":"","lengthSeconds":"10""#;
        assert_eq!(scan_quoted_field(html, DESCRIPTION_MARKER).unwrap(), "");
    }

    #[test]
    fn test_first_occurrence_wins() {
        let html = r#""shortDescription":"first" "shortDescription":"second""#;
        assert_eq!(scan_quoted_field(html, DESCRIPTION_MARKER).unwrap(), "first");
    }

    #[test]
    fn test_multibyte_characters() {
        let html = r#""shortDescription":"Привет 🌍 \"мир\"""#;
        assert_eq!(
            scan_quoted_field(html, DESCRIPTION_MARKER).unwrap(),
            r#"Привет 🌍 \"мир\""#
        );
    }

    #[test]
    fn test_missing_marker() {
        let err = scan_quoted_field("<html></html>", DESCRIPTION_MARKER).unwrap_err();
        assert_eq!(
            err,
            LookupFailure::MarkerNotFound {
                marker: DESCRIPTION_MARKER.to_string()
            }
        );
    }

    #[test]
    fn test_unterminated_value() {
        let err = scan_quoted_field(r#""shortDescription":"never closed \""#, DESCRIPTION_MARKER)
            .unwrap_err();
        assert!(matches!(err, LookupFailure::Unterminated { .. }));
    }

    #[test]
    fn test_title_is_read_from_video_details() {
        let html = concat!(
            r#"{"title":"Page chrome"} "#,
            r#"{"videoDetails":{"videoId":"abc","title":"Real \"Title\"","lengthSeconds":"61"}}"#
        );
        assert_eq!(scan_title(html).unwrap(), r#"Real "Title""#);
        assert_eq!(
            scan_quoted_field_after(html, VIDEO_DETAILS_ANCHOR, TITLE_MARKER).unwrap(),
            r#"Real \"Title\""#
        );
    }

    #[test]
    fn test_title_escapes_are_decoded() {
        let html = r#"{"videoDetails":{"title":"Tips \u0026 Tricks\nPart 2"}}"#;
        assert_eq!(scan_title(html).unwrap(), "Tips & Tricks\nPart 2");
    }

    #[test]
    fn test_undecodable_title_stays_raw() {
        let html = r#"{"videoDetails":{"title":"bad \x escape"}}"#;
        assert_eq!(scan_title(html).unwrap(), r"bad \x escape");
    }

    #[test]
    fn test_missing_title() {
        assert!(matches!(
            scan_title("<html></html>"),
            Err(LookupFailure::MarkerNotFound { .. })
        ));
    }

    #[test]
    fn test_title_without_anchor_uses_whole_markup() {
        let html = r#"{"title":"Only title"}"#;
        assert_eq!(
            scan_quoted_field_after(html, VIDEO_DETAILS_ANCHOR, TITLE_MARKER).unwrap(),
            "Only title"
        );
    }
}
