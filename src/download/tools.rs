//! External tool presence checks.

use crate::core::process::CommandRunner;
use crate::download::command::build_version_command;

/// Installed version of one external tool.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolVersion {
    pub name: &'static str,
    pub version: Option<String>,
}

impl ToolVersion {
    pub fn is_available(&self) -> bool {
        self.version.is_some()
    }
}

async fn probe(runner: &dyn CommandRunner, name: &'static str, bin: &str, flag: &str) -> ToolVersion {
    let command = build_version_command(bin, flag);
    let version = match runner.run(&command).await {
        Ok(out) => out.lines().next().map(str::trim).filter(|l| !l.is_empty()).map(String::from),
        Err(e) => {
            log::debug!("{} version probe failed: {}", name, e);
            None
        }
    };

    match &version {
        Some(v) => log::info!("{} version: {}", name, v),
        None => log::warn!("{} is not installed or not on PATH ({})", name, bin),
    }
    ToolVersion { name, version }
}

/// `yt-dlp --version` and the first line of `ffmpeg -version`.
pub async fn check_tools(runner: &dyn CommandRunner, ytdlp_bin: &str, ffmpeg_bin: &str) -> Vec<ToolVersion> {
    vec![
        probe(runner, "yt-dlp", ytdlp_bin, "--version").await,
        probe(runner, "ffmpeg", ffmpeg_bin, "-version").await,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::download::command::ToolCommand;
    use crate::download::error::DownloadError;
    use async_trait::async_trait;

    struct Canned;

    #[async_trait]
    impl CommandRunner for Canned {
        async fn run(&self, command: &ToolCommand) -> Result<String, DownloadError> {
            match command.program.as_str() {
                "yt-dlp" => Ok("2025.01.15\n".to_string()),
                _ => Err(DownloadError::Process("Failed to execute ffmpeg: not found".to_string())),
            }
        }
    }

    #[tokio::test]
    async fn test_check_tools_reports_missing_ffmpeg() {
        let versions = check_tools(&Canned, "yt-dlp", "ffmpeg").await;
        assert_eq!(versions[0].version.as_deref(), Some("2025.01.15"));
        assert!(versions[0].is_available());
        assert_eq!(versions[1].name, "ffmpeg");
        assert!(!versions[1].is_available());
    }
}
