//! Common test utilities
//!
//! This module is shared across all integration tests. [`FakeRunner`] stands
//! in for yt-dlp and ffmpeg: instead of downloading it writes the files the
//! real tools would leave in the scratch directory.

#![allow(dead_code)]

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use nulldl::core::process::CommandRunner;
use nulldl::download::command::ToolCommand;
use nulldl::download::error::DownloadError;

pub const VIDEO_BYTES: &[u8] = b"fake video track";
pub const AUDIO_BYTES: &[u8] = b"fake audio track";
pub const MERGED_BYTES: &[u8] = b"fake merged media";

/// Size of the [`Scenario::LargeComplete`] output; many read chunks long.
pub const LARGE_LEN: usize = 256 * 1024;

pub fn large_payload() -> Vec<u8> {
    (0..LARGE_LEN).map(|i| (i % 251) as u8).collect()
}

/// Minimal `--dump-json` payload.
pub const PROBE_JSON: &str = r#"{
    "title": "Test Video",
    "duration": 61,
    "thumbnail": "https://i.ytimg.com/vi/test/hqdefault.jpg",
    "uploader": "Tester",
    "view_count": 42,
    "formats": [
        {"format_id": "140", "ext": "m4a", "vcodec": "none", "acodec": "mp4a.40.2", "abr": 129.4},
        {"format_id": "137", "ext": "mp4", "vcodec": "avc1.640028", "acodec": "none", "height": 1080, "fps": 30},
        {"format_id": "18", "ext": "mp4", "vcodec": "avc1.42001E", "acodec": "mp4a.40.2", "height": 360}
    ]
}"#;

/// What the fake yt-dlp leaves behind for a download.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scenario {
    /// The canonical file at the `-o` path
    Complete,
    /// Like `Complete`, but [`LARGE_LEN`] bytes
    LargeComplete,
    /// `{token}.f137.mp4` + `{token}.f140.m4a`
    SplitTracks,
    /// Only `{token}.f140.m4a`
    AudioIntermediate,
    /// Only `{token}.f251.webm`
    SingleWebm,
    /// Writes `{token}.f137.mp4.part`, then exits with an error
    FailAfterIntermediate,
    /// Split tracks, but ffmpeg cannot be spawned
    FfmpegMissing,
    /// Exit 0 without writing anything
    NoOutput,
}

pub struct FakeRunner {
    scenario: Scenario,
    probe_output: String,
    probe_count: AtomicUsize,
    calls: Mutex<Vec<ToolCommand>>,
}

impl FakeRunner {
    pub fn new(scenario: Scenario) -> Self {
        Self {
            scenario,
            probe_output: PROBE_JSON.to_string(),
            probe_count: AtomicUsize::new(0),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Replace the `--dump-json` output.
    pub fn with_probe_output(mut self, output: &str) -> Self {
        self.probe_output = output.to_string();
        self
    }

    pub fn probe_count(&self) -> usize {
        self.probe_count.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<ToolCommand> {
        self.calls.lock().unwrap().clone()
    }

    pub fn ffmpeg_calls(&self) -> usize {
        self.calls().iter().filter(|c| c.program == "ffmpeg").count()
    }

    fn fake_ytdlp_download(&self, command: &ToolCommand) -> Result<String, DownloadError> {
        let output = PathBuf::from(command.arg_value("-o").unwrap());
        let intermediate = |suffix: &str| sibling(&output, suffix);

        match self.scenario {
            Scenario::Complete => std::fs::write(&output, MERGED_BYTES).unwrap(),
            Scenario::LargeComplete => std::fs::write(&output, large_payload()).unwrap(),
            Scenario::SplitTracks | Scenario::FfmpegMissing => {
                std::fs::write(intermediate("f137.mp4"), VIDEO_BYTES).unwrap();
                std::fs::write(intermediate("f140.m4a"), AUDIO_BYTES).unwrap();
            }
            Scenario::AudioIntermediate => std::fs::write(intermediate("f140.m4a"), AUDIO_BYTES).unwrap(),
            Scenario::SingleWebm => std::fs::write(intermediate("f251.webm"), AUDIO_BYTES).unwrap(),
            Scenario::FailAfterIntermediate => {
                std::fs::write(intermediate("f137.mp4.part"), VIDEO_BYTES).unwrap();
                return Err(DownloadError::Process("ERROR: unable to download video data: HTTP Error 403".into()));
            }
            Scenario::NoOutput => {}
        }
        Ok(String::new())
    }

    fn fake_ffmpeg(&self, command: &ToolCommand) -> Result<String, DownloadError> {
        if self.scenario == Scenario::FfmpegMissing {
            return Err(DownloadError::Process(
                "Failed to execute ffmpeg: No such file or directory (os error 2)".into(),
            ));
        }
        let output = command.args.last().unwrap();
        std::fs::write(output, MERGED_BYTES).unwrap();
        Ok(String::new())
    }
}

/// `<dir>/<token>.<suffix>` next to a canonical `<dir>/<token>.<ext>`.
fn sibling(output: &Path, suffix: &str) -> PathBuf {
    let stem = output.with_extension("");
    PathBuf::from(format!("{}.{}", stem.display(), suffix))
}

#[async_trait]
impl CommandRunner for FakeRunner {
    async fn run(&self, command: &ToolCommand) -> Result<String, DownloadError> {
        self.calls.lock().unwrap().push(command.clone());

        if command.has_flag("--version") || command.has_flag("-version") {
            return Ok("2025.01.15\n".to_string());
        }
        if command.has_flag("--dump-json") {
            self.probe_count.fetch_add(1, Ordering::SeqCst);
            return Ok(self.probe_output.clone());
        }
        if command.program == "ffmpeg" {
            return self.fake_ffmpeg(command);
        }
        self.fake_ytdlp_download(command)
    }
}

/// File names left in `dir`, sorted.
pub fn list_dir(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .flatten()
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
