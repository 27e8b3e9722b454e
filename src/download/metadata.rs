//! Metadata probing via `yt-dlp --dump-json`.
//!
//! Results are cached per URL; a cache hit never spawns a process and a
//! parse failure is never cached.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::core::process::CommandRunner;
use crate::download::command::build_probe_command;
use crate::download::error::DownloadError;
use crate::storage::cache::AnalysisCache;

/// Subset of the yt-dlp info dict we care about.
#[derive(Debug, Deserialize)]
struct RawInfo {
    title: Option<String>,
    duration: Option<f64>,
    thumbnail: Option<String>,
    uploader: Option<String>,
    view_count: Option<u64>,
    #[serde(default)]
    formats: Vec<RawFormat>,
}

#[derive(Debug, Deserialize)]
struct RawFormat {
    format_id: String,
    ext: Option<String>,
    vcodec: Option<String>,
    acodec: Option<String>,
    height: Option<u32>,
    fps: Option<f64>,
    abr: Option<f64>,
    filesize: Option<f64>,
    filesize_approx: Option<f64>,
    format_note: Option<String>,
}

impl RawFormat {
    fn size(&self) -> Option<u64> {
        self.filesize
            .or(self.filesize_approx)
            .filter(|s| *s > 0.0)
            .map(|s| s as u64)
    }

    /// A missing vcodec is not "none".
    fn has_video(&self) -> bool {
        self.vcodec.as_deref() != Some("none")
    }

    fn is_audio_only(&self) -> bool {
        self.acodec.as_deref() != Some("none") && self.vcodec.as_deref() == Some("none")
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct VideoInfo {
    pub title: Option<String>,
    pub duration: Option<f64>,
    pub thumbnail: Option<String>,
    pub uploader: Option<String>,
    pub view_count: Option<u64>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct VideoFormat {
    pub format_id: String,
    pub ext: Option<String>,
    /// `"{height}p"`
    pub resolution: String,
    pub height: u32,
    pub fps: Option<f64>,
    pub vcodec: Option<String>,
    pub acodec: Option<String>,
    pub filesize: Option<u64>,
    pub format_note: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AudioFormat {
    pub format_id: String,
    pub ext: Option<String>,
    pub abr: Option<f64>,
    pub acodec: Option<String>,
    pub filesize: Option<u64>,
    pub format_note: String,
}

/// What `/analyze` returns and what the cache stores.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AnalyzeResult {
    pub video_info: VideoInfo,
    pub video_formats: Vec<VideoFormat>,
    pub audio_formats: Vec<AudioFormat>,
}

/// Parse `--dump-json` output and rank the formats.
///
/// Video formats need a video codec and a non-zero height, highest first.
/// Audio formats are audio-only streams, highest bitrate first (missing = 0).
pub fn parse_analysis(json: &str) -> Result<AnalyzeResult, DownloadError> {
    let info: RawInfo = serde_json::from_str(json.trim())?;

    let mut video_formats: Vec<VideoFormat> = info
        .formats
        .iter()
        .filter(|f| f.has_video())
        .filter_map(|f| {
            let height = f.height.filter(|h| *h > 0)?;
            Some(VideoFormat {
                format_id: f.format_id.clone(),
                ext: f.ext.clone(),
                resolution: format!("{}p", height),
                height,
                fps: f.fps,
                vcodec: f.vcodec.clone(),
                acodec: f.acodec.clone(),
                filesize: f.size(),
                format_note: f.format_note.clone().unwrap_or_default(),
            })
        })
        .collect();
    video_formats.sort_by(|a, b| b.height.cmp(&a.height));

    let mut audio_formats: Vec<AudioFormat> = info
        .formats
        .iter()
        .filter(|f| f.is_audio_only())
        .map(|f| AudioFormat {
            format_id: f.format_id.clone(),
            ext: f.ext.clone(),
            abr: f.abr,
            acodec: f.acodec.clone(),
            filesize: f.size(),
            format_note: f.format_note.clone().unwrap_or_default(),
        })
        .collect();
    audio_formats.sort_by(|a, b| b.abr.unwrap_or(0.0).total_cmp(&a.abr.unwrap_or(0.0)));

    Ok(AnalyzeResult {
        video_info: VideoInfo {
            title: info.title,
            duration: info.duration,
            thumbnail: info.thumbnail,
            uploader: info.uploader,
            view_count: info.view_count,
        },
        video_formats,
        audio_formats,
    })
}

/// Fronts the metadata probe with [`AnalysisCache`].
pub struct Analyzer {
    runner: Arc<dyn CommandRunner>,
    cache: Arc<AnalysisCache>,
    ytdlp_bin: String,
}

impl Analyzer {
    pub fn new(runner: Arc<dyn CommandRunner>, cache: Arc<AnalysisCache>, ytdlp_bin: impl Into<String>) -> Self {
        Self {
            runner,
            cache,
            ytdlp_bin: ytdlp_bin.into(),
        }
    }

    pub fn cache(&self) -> &Arc<AnalysisCache> {
        &self.cache
    }

    pub async fn analyze(&self, url: &str) -> Result<Arc<AnalyzeResult>, DownloadError> {
        log::info!("[Analyze] URL: {}", url);

        if let Some(cached) = self.cache.get(url).await {
            log::info!("[Cache] Hit");
            return Ok(cached);
        }
        log::info!("[Cache] Miss, fetching...");

        let command = build_probe_command(&self.ytdlp_bin, url);
        let stdout = self
            .runner
            .run(&command)
            .await
            .map_err(|e| DownloadError::YtDlp(e.message().to_string()))?;

        let result = Arc::new(parse_analysis(&stdout)?);
        self.cache.insert(url, Arc::clone(&result)).await;

        log::info!(
            "[Success] {} video, {} audio formats",
            result.video_formats.len(),
            result.audio_formats.len()
        );
        Ok(result)
    }
}
