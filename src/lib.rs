//! Null Downloader - web front end for yt-dlp and ffmpeg
//!
//! Accepts a video URL, reports the available formats and streams the
//! downloaded file back, cleaning up every scratch file it created.
//!
//! # Module Structure
//!
//! - `core`: Configuration, errors, logging, process execution and the HTTP server
//! - `download`: Format selection, command building, reconciliation and streaming
//! - `storage`: Scratch directory and the analysis cache

pub mod cli;
pub mod core;
pub mod download;
pub mod storage;

// Re-exports for convenience
pub use core::{AppError, AppResult, Config};
pub use download::{DownloadError, DownloadOrchestrator, DownloadRequest};
