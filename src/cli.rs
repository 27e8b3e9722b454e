use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "nulldl")]
#[command(author, version, about = "Web front end for yt-dlp and ffmpeg downloads", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP server (default)
    Serve {
        /// Override the configured port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Show metadata and available formats for a URL
    Analyze {
        /// Video URL
        url: String,

        /// Print the raw analysis as JSON
        #[arg(long)]
        json: bool,
    },

    /// Download a URL to a local file
    Download {
        /// Video URL
        url: String,

        /// yt-dlp format id (see `analyze`)
        #[arg(short, long)]
        format_id: Option<String>,

        /// Extract audio instead of downloading video
        #[arg(short, long)]
        audio: bool,

        /// Audio encoding when --audio is set
        #[arg(long, default_value = "mp3")]
        audio_format: String,

        /// Destination path (defaults to the video title in the current directory)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Report installed yt-dlp and ffmpeg versions
    CheckTools,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
