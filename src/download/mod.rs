//! Download pipeline: format selection, yt-dlp/ffmpeg invocation and delivery

pub mod command;
pub mod error;
pub mod format;
pub mod metadata;
pub mod orchestrator;
pub mod reconcile;
pub mod send;
pub mod tools;

// Re-exports for convenience
pub use error::DownloadError;
pub use format::DownloadKind;
pub use metadata::{AnalyzeResult, Analyzer};
pub use orchestrator::{DownloadOrchestrator, DownloadRequest, DownloadedFile};
