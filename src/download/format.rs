//! yt-dlp format selection.
//!
//! Japanese audio is preferred everywhere, falling back tier by tier to
//! whatever is available.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// What the caller wants back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DownloadKind {
    Audio,
    /// Anything unrecognised is treated as video.
    #[default]
    #[serde(other)]
    Video,
}

impl DownloadKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DownloadKind::Audio => "audio",
            DownloadKind::Video => "video",
        }
    }
}

/// Audio: Japanese m4a, Japanese any container, any m4a, best available.
pub const DEFAULT_AUDIO_SELECTOR: &str =
    "bestaudio[language=ja][ext=m4a]/bestaudio[language=ja]/bestaudio[ext=m4a]/bestaudio";

/// Video: best mp4 video paired with the same audio preference chain.
pub const DEFAULT_VIDEO_SELECTOR: &str =
    "bestvideo[ext=mp4]+bestaudio[language=ja]/bestvideo+bestaudio[language=ja]/bestvideo[ext=mp4]+bestaudio/best";

#[allow(clippy::expect_used)]
static RESOLUTION_ONLY: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+p$").expect("resolution regex"));

/// Whether a video format id already carries both tracks (HLS/DASH
/// manifests, or a bare resolution label like `720p`).
pub fn is_streaming_format(format_id: &str) -> bool {
    format_id.contains("hls-")
        || format_id.contains("dash-")
        || format_id.contains("m3u8")
        || RESOLUTION_ONLY.is_match(format_id)
}

/// Map a request's format id and kind to a yt-dlp `-f` expression.
///
/// # Examples
/// ```
/// use nulldl::download::format::{resolve_format_selector, DownloadKind};
///
/// assert_eq!(resolve_format_selector(Some("hls-1080"), DownloadKind::Video), "hls-1080");
/// assert_eq!(
///     resolve_format_selector(Some("137"), DownloadKind::Video),
///     "137+bestaudio[language=ja]/137+bestaudio/best"
/// );
/// ```
pub fn resolve_format_selector(format_id: Option<&str>, kind: DownloadKind) -> String {
    let Some(format_id) = format_id.filter(|f| !f.is_empty()) else {
        return match kind {
            DownloadKind::Audio => DEFAULT_AUDIO_SELECTOR.to_string(),
            DownloadKind::Video => DEFAULT_VIDEO_SELECTOR.to_string(),
        };
    };

    if kind == DownloadKind::Audio {
        return format_id.to_string();
    }

    if is_streaming_format(format_id) {
        log::info!("[Format] Streaming format detected: {}", format_id);
        return format_id.to_string();
    }

    // A bare video-only id would otherwise produce a silent file.
    let selector = format!("{id}+bestaudio[language=ja]/{id}+bestaudio/best", id = format_id);
    log::info!("[Format] Separate video track, adding audio: {}", selector);
    selector
}
