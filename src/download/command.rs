//! Command construction for yt-dlp and ffmpeg.
//!
//! Every builder here is pure: no I/O, no failure. A bad URL or selector only
//! shows up once the command is executed.

use std::fmt;
use std::path::Path;

use crate::download::format::DownloadKind;

/// One external-tool invocation: program plus argument vector.
///
/// Arguments are passed to the OS as-is, never through a shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl ToolCommand {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Value following `flag`, if present.
    pub fn arg_value(&self, flag: &str) -> Option<&str> {
        self.args
            .iter()
            .position(|a| a == flag)
            .and_then(|i| self.args.get(i + 1))
            .map(String::as_str)
    }

    pub fn has_flag(&self, flag: &str) -> bool {
        self.args.iter().any(|a| a == flag)
    }
}

impl fmt::Display for ToolCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " \"{}\"", arg)?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}

/// yt-dlp throughput tuning, applied to every download.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PerformanceProfile {
    /// `-N`
    pub connections: u32,
    /// `--concurrent-fragments`
    pub fragments: u32,
    /// `--buffer-size`
    pub buffer_size: &'static str,
    /// `--http-chunk-size`
    pub http_chunk_size: &'static str,
    /// `--throttled-rate`
    pub throttled_rate: &'static str,
    /// `--extractor-retries`
    pub extractor_retries: u32,
    /// `--file-access-retries`
    pub file_access_retries: u32,
}

impl PerformanceProfile {
    pub const DEFAULT: PerformanceProfile = PerformanceProfile {
        connections: 16,
        fragments: 16,
        buffer_size: "16K",
        http_chunk_size: "10M",
        throttled_rate: "100K",
        extractor_retries: 3,
        file_access_retries: 3,
    };
}

impl Default for PerformanceProfile {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// The web player client keeps the original audio track instead of an
/// auto-dubbed substitute.
pub const EXTRACTOR_ARGS: &str = "youtube:player_client=web";

/// Container forced for merged video output.
pub const MERGE_OUTPUT_FORMAT: &str = "mp4";

/// Flags shared by every download invocation.
fn base_args(profile: &PerformanceProfile) -> Vec<String> {
    vec![
        "--no-playlist".to_string(),
        "-N".to_string(),
        profile.connections.to_string(),
        "--concurrent-fragments".to_string(),
        profile.fragments.to_string(),
        "--buffer-size".to_string(),
        profile.buffer_size.to_string(),
        "--http-chunk-size".to_string(),
        profile.http_chunk_size.to_string(),
        "--throttled-rate".to_string(),
        profile.throttled_rate.to_string(),
        "--extractor-retries".to_string(),
        profile.extractor_retries.to_string(),
        "--file-access-retries".to_string(),
        profile.file_access_retries.to_string(),
        "--extractor-args".to_string(),
        EXTRACTOR_ARGS.to_string(),
    ]
}

/// Build the yt-dlp download invocation.
///
/// `audio_format` is only used for [`DownloadKind::Audio`].
pub fn build_download_command(
    ytdlp_bin: &str,
    url: &str,
    selector: &str,
    kind: DownloadKind,
    audio_format: &str,
    output_path: &Path,
) -> ToolCommand {
    let mut args = base_args(&PerformanceProfile::DEFAULT);
    args.push("-f".to_string());
    args.push(selector.to_string());

    match kind {
        DownloadKind::Audio => {
            args.extend(
                ["--extract-audio", "--audio-format", audio_format, "--audio-quality", "0"]
                    .iter()
                    .map(|s| s.to_string()),
            );
        }
        DownloadKind::Video => {
            args.push("--merge-output-format".to_string());
            args.push(MERGE_OUTPUT_FORMAT.to_string());
        }
    }

    args.push("-o".to_string());
    args.push(output_path.to_string_lossy().into_owned());
    // Everything after `--` is positional, even if it starts with a dash.
    args.push("--".to_string());
    args.push(url.to_string());

    ToolCommand::new(ytdlp_bin, args)
}

/// Build the ffmpeg invocation that stream-copies separate video and audio
/// tracks into one fast-start container.
pub fn build_merge_command(ffmpeg_bin: &str, video: &Path, audio: &Path, output: &Path) -> ToolCommand {
    ToolCommand::new(
        ffmpeg_bin,
        [
            "-i".to_string(),
            video.to_string_lossy().into_owned(),
            "-i".to_string(),
            audio.to_string_lossy().into_owned(),
            "-c".to_string(),
            "copy".to_string(),
            "-movflags".to_string(),
            "+faststart".to_string(),
            output.to_string_lossy().into_owned(),
        ],
    )
}

/// Build the yt-dlp metadata probe (`--dump-json`).
pub fn build_probe_command(ytdlp_bin: &str, url: &str) -> ToolCommand {
    ToolCommand::new(ytdlp_bin, ["--dump-json", "--no-playlist", "--", url])
}

/// Build a version query (`yt-dlp --version`, `ffmpeg -version`).
pub fn build_version_command(bin: &str, flag: &str) -> ToolCommand {
    ToolCommand::new(bin, [flag])
}
