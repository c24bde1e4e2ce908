use crate::types::{Transcript, VideoInfo};

/// Format seconds as MM:SS timestamp
pub fn format_timestamp(seconds: f64) -> String {
    let mins = (seconds / 60.0) as u32;
    let secs = (seconds % 60.0) as u32;
    format!("{:02}:{:02}", mins, secs)
}

/// Format transcript segments with timestamps
pub fn format_transcript_with_timestamps(transcript: &Transcript) -> String {
    transcript
        .segments
        .iter()
        .map(|seg| format!("[{}] {}", format_timestamp(seg.start), seg.text.trim()))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_video_info(info: &VideoInfo) -> String {
    let mut output = String::new();
    output.push_str(&format!("# {}\n\n", info.title));
    output.push_str("## Description\n\n");
    output.push_str(&info.description);
    output.push('\n');
    output
}
