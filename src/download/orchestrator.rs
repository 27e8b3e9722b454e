//! Download orchestration.
//!
//! resolve selector → build command → run yt-dlp → reconcile artifacts →
//! stat. Every file the request creates carries its token; if any step
//! fails the token is swept before the error is returned.

use fs_err as fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::Instrument;

use crate::core::process::CommandRunner;
use crate::download::command::build_download_command;
use crate::download::error::DownloadError;
use crate::download::format::{resolve_format_selector, DownloadKind};
use crate::download::reconcile::ArtifactReconciler;
use crate::storage::temp::{TemporaryStore, TokenGuard};

/// Default audio encoding when the caller does not name one.
pub const DEFAULT_AUDIO_FORMAT: &str = "mp3";

/// An accepted download request. Immutable once built.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DownloadRequest {
    pub url: String,
    pub format_id: Option<String>,
    pub kind: DownloadKind,
    pub audio_format: Option<String>,
    pub title: Option<String>,
}

impl DownloadRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Requested audio encoding, `mp3` when absent or empty.
    pub fn audio_format(&self) -> &str {
        self.audio_format
            .as_deref()
            .filter(|f| !f.is_empty())
            .unwrap_or(DEFAULT_AUDIO_FORMAT)
    }

    /// Extension of the canonical output file.
    pub fn extension(&self) -> &str {
        match self.kind {
            DownloadKind::Audio => self.audio_format(),
            DownloadKind::Video => "mp4",
        }
    }
}

/// MIME type for the canonical output.
pub fn content_type_for(kind: DownloadKind, extension: &str) -> &'static str {
    match kind {
        DownloadKind::Video => "video/mp4",
        DownloadKind::Audio => match extension.to_ascii_lowercase().as_str() {
            "wav" => "audio/wav",
            "m4a" => "audio/mp4",
            "aac" => "audio/aac",
            "flac" => "audio/flac",
            "opus" | "ogg" | "vorbis" => "audio/ogg",
            _ => "audio/mpeg",
        },
    }
}

/// Per-request identity: token plus what the output should look like.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestContext {
    pub token: String,
    pub extension: String,
    pub content_type: &'static str,
    pub output_path: PathBuf,
}

impl RequestContext {
    pub fn new(store: &TemporaryStore, request: &DownloadRequest) -> Self {
        let token = store.mint_token();
        let extension = request.extension().to_string();
        let content_type = content_type_for(request.kind, &extension);
        let output_path = store.path_for(&token, &extension);
        Self {
            token,
            extension,
            content_type,
            output_path,
        }
    }
}

/// The canonical output of a successful download.
///
/// Owns the request's files until they are streamed ([`finish`](Self::finish))
/// or moved out ([`persist_to`](Self::persist_to)). Dropped any other way,
/// its guard sweeps the token.
#[derive(Debug)]
pub struct DownloadedFile {
    pub path: PathBuf,
    pub content_type: &'static str,
    pub content_length: u64,
    pub extension: String,
    guard: TokenGuard,
}

impl DownloadedFile {
    pub fn token(&self) -> &str {
        self.guard.token()
    }

    /// Delete the canonical file after a complete transfer.
    ///
    /// If the delete fails the guard sweeps the token instead.
    pub async fn finish(self) {
        let DownloadedFile { path, guard, .. } = self;
        match fs::tokio::remove_file(&path).await {
            Ok(()) => {
                log::info!("[Cleanup] Success");
                guard.release();
            }
            Err(e) => {
                log::error!("[Cleanup Error] {}", e);
                guard.sweep().await;
            }
        }
    }

    /// Move the canonical file out of scratch storage (CLI downloads).
    pub async fn persist_to(self, dest: &Path) -> std::io::Result<u64> {
        let DownloadedFile {
            path,
            guard,
            content_length,
            ..
        } = self;

        if fs::tokio::rename(&path, dest).await.is_err() {
            // Different filesystem: copy, then let the guard remove the original.
            fs::tokio::copy(&path, dest).await?;
            guard.sweep().await;
            return Ok(content_length);
        }
        guard.release();
        Ok(content_length)
    }
}

pub struct DownloadOrchestrator {
    runner: Arc<dyn CommandRunner>,
    store: Arc<TemporaryStore>,
    ytdlp_bin: String,
    ffmpeg_bin: String,
    limiter: Option<Arc<Semaphore>>,
}

impl DownloadOrchestrator {
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        store: Arc<TemporaryStore>,
        ytdlp_bin: impl Into<String>,
        ffmpeg_bin: impl Into<String>,
    ) -> Self {
        Self {
            runner,
            store,
            ytdlp_bin: ytdlp_bin.into(),
            ffmpeg_bin: ffmpeg_bin.into(),
            limiter: None,
        }
    }

    /// Cap the number of pipelines running at once. Unbounded by default.
    pub fn with_concurrency_limit(mut self, limit: Option<usize>) -> Self {
        self.limiter = limit.filter(|n| *n > 0).map(|n| Arc::new(Semaphore::new(n)));
        self
    }

    pub fn store(&self) -> &Arc<TemporaryStore> {
        &self.store
    }

    pub async fn download(&self, request: &DownloadRequest) -> Result<DownloadedFile, DownloadError> {
        let ctx = RequestContext::new(&self.store, request);
        let guard = self.store.claim(&ctx.token);
        let span = tracing::info_span!("download", token = %ctx.token);

        log::info!(
            "[Download] URL: {}, Format: {}, Type: {}",
            request.url,
            request.format_id.as_deref().unwrap_or("auto"),
            request.kind.as_str()
        );

        match self.run_pipeline(request, &ctx).instrument(span).await {
            Ok(content_length) => {
                log::info!("[Success] {}", ctx.output_path.display());
                Ok(DownloadedFile {
                    path: ctx.output_path,
                    content_type: ctx.content_type,
                    content_length,
                    extension: ctx.extension,
                    guard,
                })
            }
            Err(e) => {
                log::error!("[Download Error] ({}) {}", e.subcategory(), e);
                guard.sweep().await;
                Err(e)
            }
        }
    }

    async fn run_pipeline(&self, request: &DownloadRequest, ctx: &RequestContext) -> Result<u64, DownloadError> {
        let _permit = match &self.limiter {
            Some(limiter) => Some(
                Arc::clone(limiter)
                    .acquire_owned()
                    .await
                    .map_err(|e| DownloadError::Process(format!("Download limiter closed: {}", e)))?,
            ),
            None => None,
        };

        let selector = resolve_format_selector(request.format_id.as_deref(), request.kind);
        let command = build_download_command(
            &self.ytdlp_bin,
            &request.url,
            &selector,
            request.kind,
            request.audio_format(),
            &ctx.output_path,
        );
        log::info!("[Execute] {}", command);

        self.runner
            .run(&command)
            .await
            .map_err(|e| DownloadError::YtDlp(e.message().to_string()))?;

        ArtifactReconciler::new(self.runner.as_ref(), &self.store, &self.ffmpeg_bin)
            .reconcile(&ctx.token, &ctx.output_path)
            .await?;

        let metadata = fs::tokio::metadata(&ctx.output_path).await?;
        Ok(metadata.len())
    }
}
