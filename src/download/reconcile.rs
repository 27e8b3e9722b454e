//! Post-extraction reconciliation.
//!
//! yt-dlp may leave the finished file at the expected path, or stop short
//! and leave per-format intermediates named `{token}.f<id>.<ext>`. This
//! module turns whatever is there into exactly one canonical file.

use fs_err as fs;
use std::path::{Path, PathBuf};

use crate::core::process::CommandRunner;
use crate::download::command::build_merge_command;
use crate::download::error::DownloadError;
use crate::storage::temp::TemporaryStore;

const VIDEO_EXTENSIONS: &[&str] = &["mp4", "webm"];
const AUDIO_EXTENSIONS: &[&str] = &["m4a", "webm"];

/// Intermediate files found for one token. `webm` lands in both lists.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct IntermediateFileSet {
    pub video: Vec<PathBuf>,
    pub audio: Vec<PathBuf>,
}

impl IntermediateFileSet {
    /// Partition paths (already sorted by name) by extension.
    pub fn classify(paths: &[PathBuf]) -> Self {
        let has_ext = |path: &Path, exts: &[&str]| {
            path.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| exts.contains(&e))
        };

        Self {
            video: paths.iter().filter(|p| has_ext(p, VIDEO_EXTENSIONS)).cloned().collect(),
            audio: paths.iter().filter(|p| has_ext(p, AUDIO_EXTENSIONS)).cloned().collect(),
        }
    }
}

/// What reconciliation decided to do.
#[derive(Debug, Clone, PartialEq)]
pub enum Reconciliation {
    /// yt-dlp produced the canonical file itself
    AlreadyComplete,
    /// Separate tracks were merged with ffmpeg
    Merged { video: PathBuf, audio: PathBuf },
    /// A lone intermediate was renamed into place
    Renamed { from: PathBuf },
}

pub struct ArtifactReconciler<'a> {
    runner: &'a dyn CommandRunner,
    store: &'a TemporaryStore,
    ffmpeg_bin: &'a str,
}

impl<'a> ArtifactReconciler<'a> {
    pub fn new(runner: &'a dyn CommandRunner, store: &'a TemporaryStore, ffmpeg_bin: &'a str) -> Self {
        Self {
            runner,
            store,
            ffmpeg_bin,
        }
    }

    /// Make sure `output` exists, merging or renaming intermediates of `token`.
    pub async fn reconcile(&self, token: &str, output: &Path) -> Result<Reconciliation, DownloadError> {
        if fs::tokio::metadata(output).await.is_ok() {
            return Ok(Reconciliation::AlreadyComplete);
        }

        log::info!("[Check] Output not found, checking intermediate files...");
        let found = self.store.files_with_prefix(&format!("{}.f", token)).await?;
        let set = IntermediateFileSet::classify(&found);

        let video = set.video.first();
        // The same .webm may sit in both lists; never merge a file with itself.
        let audio = set.audio.iter().find(|a| Some(*a) != video);

        match (video, audio) {
            (Some(video), Some(audio)) => {
                log::info!("[Merge] Manual merge required");
                self.merge(video, audio, output).await?;
                Ok(Reconciliation::Merged {
                    video: video.clone(),
                    audio: audio.clone(),
                })
            }
            (Some(single), None) | (None, Some(single)) => {
                log::info!(
                    "[Rename] {} → {}",
                    single.display(),
                    output.file_name().map(|n| n.to_string_lossy()).unwrap_or_default()
                );
                fs::tokio::rename(single, output).await?;
                Ok(Reconciliation::Renamed { from: single.clone() })
            }
            (None, None) => Err(DownloadError::no_output()),
        }
    }

    async fn merge(&self, video: &Path, audio: &Path, output: &Path) -> Result<(), DownloadError> {
        let command = build_merge_command(self.ffmpeg_bin, video, audio, output);
        log::info!("[Merge] {}", command);

        if let Err(e) = self.runner.run(&command).await {
            log::error!("[Merge Error] {}", e);
            return Err(DownloadError::merge_unavailable());
        }
        log::info!("[Merge] Success");

        fs::tokio::remove_file(video).await?;
        fs::tokio::remove_file(audio).await?;
        log::info!("[Cleanup] Intermediate files deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_classify_partitions_by_extension() {
        let set = IntermediateFileSet::classify(&[
            PathBuf::from("t/x.f137.mp4"),
            PathBuf::from("t/x.f140.m4a"),
            PathBuf::from("t/x.f251.webm"),
            PathBuf::from("t/x.f999.part"),
        ]);
        assert_eq!(set.video, vec![PathBuf::from("t/x.f137.mp4"), PathBuf::from("t/x.f251.webm")]);
        assert_eq!(set.audio, vec![PathBuf::from("t/x.f140.m4a"), PathBuf::from("t/x.f251.webm")]);
    }

    #[test]
    fn test_classify_empty() {
        assert_eq!(IntermediateFileSet::classify(&[]), IntermediateFileSet::default());
    }
}
