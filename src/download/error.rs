use std::fmt;

/// Structured error type for download and analysis operations.
///
/// Categorized variants keep "merge tool unavailable" apart from "no output
/// produced", and tool diagnostics apart from local I/O failures.
#[derive(Debug)]
pub enum DownloadError {
    /// yt-dlp exited non-zero without usable stdout; carries its diagnostic text
    YtDlp(String),
    /// The ffmpeg merge step failed or ffmpeg is not installed
    Ffmpeg(String),
    /// Extraction finished but no output file was found
    FileNotFound(String),
    /// Process execution failure (spawn, pipe)
    Process(String),
    /// yt-dlp metadata output could not be parsed
    Parse(String),
    /// Local filesystem failure in the scratch directory
    Io(String),
}

impl fmt::Display for DownloadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DownloadError::YtDlp(msg) => write!(f, "{}", msg),
            DownloadError::Ffmpeg(msg) => write!(f, "{}", msg),
            DownloadError::FileNotFound(msg) => write!(f, "{}", msg),
            DownloadError::Process(msg) => write!(f, "{}", msg),
            DownloadError::Parse(msg) => write!(f, "{}", msg),
            DownloadError::Io(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for DownloadError {}

impl DownloadError {
    /// Message reported when the merge step cannot run.
    pub const MERGE_UNAVAILABLE: &'static str = "FFmpeg is not available. Install FFmpeg and add it to PATH.";

    /// Message reported when extraction left nothing behind.
    pub const NO_OUTPUT: &'static str = "Downloaded file not found";

    /// Returns subcategory for logs
    pub fn subcategory(&self) -> &'static str {
        match self {
            DownloadError::YtDlp(_) => "ytdlp",
            DownloadError::Ffmpeg(_) => "ffmpeg",
            DownloadError::FileNotFound(_) => "file_not_found",
            DownloadError::Process(_) => "process",
            DownloadError::Parse(_) => "parse",
            DownloadError::Io(_) => "io",
        }
    }

    /// Returns the inner message
    pub fn message(&self) -> &str {
        match self {
            DownloadError::YtDlp(msg)
            | DownloadError::Ffmpeg(msg)
            | DownloadError::FileNotFound(msg)
            | DownloadError::Process(msg)
            | DownloadError::Parse(msg)
            | DownloadError::Io(msg) => msg,
        }
    }

    pub fn merge_unavailable() -> Self {
        DownloadError::Ffmpeg(Self::MERGE_UNAVAILABLE.to_string())
    }

    pub fn no_output() -> Self {
        DownloadError::FileNotFound(Self::NO_OUTPUT.to_string())
    }
}

impl From<std::io::Error> for DownloadError {
    fn from(err: std::io::Error) -> Self {
        DownloadError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for DownloadError {
    fn from(err: serde_json::Error) -> Self {
        DownloadError::Parse(format!("Invalid yt-dlp JSON output: {}", err))
    }
}
