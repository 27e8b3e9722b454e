//! Process execution for external tools (yt-dlp, ffmpeg)
//!
//! Output is captured up to a ceiling per stream; anything beyond it is
//! drained and dropped so the child never blocks on a full pipe.
//!
//! A non-zero exit is forgiven when stdout carries something: yt-dlp exits
//! non-zero on warnings while still producing usable output.

use async_trait::async_trait;
use std::process::Stdio;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;

use crate::core::config::DEFAULT_MAX_OUTPUT_BYTES;
use crate::download::command::ToolCommand;
use crate::download::error::DownloadError;

/// Seam between the pipeline and the operating system.
///
/// The real implementation is [`ProcessExecutor`]; tests substitute a scripted
/// runner that writes the files yt-dlp/ffmpeg would have written.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run one command to completion and return its stdout.
    async fn run(&self, command: &ToolCommand) -> Result<String, DownloadError>;
}

/// Spawns real subprocesses.
#[derive(Debug, Clone)]
pub struct ProcessExecutor {
    max_output_bytes: usize,
}

impl Default for ProcessExecutor {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_OUTPUT_BYTES)
    }
}

impl ProcessExecutor {
    pub fn new(max_output_bytes: usize) -> Self {
        Self { max_output_bytes }
    }
}

#[async_trait]
impl CommandRunner for ProcessExecutor {
    async fn run(&self, command: &ToolCommand) -> Result<String, DownloadError> {
        log::debug!("[Execute] {}", command);

        let mut child = Command::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| DownloadError::Process(format!("Failed to execute {}: {}", command.program, e)))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| DownloadError::Process("stdout pipe missing".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| DownloadError::Process("stderr pipe missing".to_string()))?;

        let limit = self.max_output_bytes;
        let (stdout, stderr, status) = tokio::try_join!(
            read_bounded(stdout, limit),
            read_bounded(stderr, limit),
            child.wait()
        )
        .map_err(|e| DownloadError::Process(format!("Failed to collect output of {}: {}", command.program, e)))?;

        if stdout.truncated || stderr.truncated {
            log::warn!(
                "[Command] {} output exceeded {} bytes, remainder discarded",
                command.program,
                limit
            );
        }

        classify_output(
            &command.program,
            status.code(),
            String::from_utf8_lossy(&stdout.bytes).into_owned(),
            String::from_utf8_lossy(&stderr.bytes).into_owned(),
        )
    }
}

struct Captured {
    bytes: Vec<u8>,
    truncated: bool,
}

async fn read_bounded<R: AsyncRead + Unpin>(mut reader: R, limit: usize) -> std::io::Result<Captured> {
    let mut bytes = Vec::new();
    (&mut reader).take(limit as u64).read_to_end(&mut bytes).await?;
    let drained = tokio::io::copy(&mut reader, &mut tokio::io::sink()).await?;
    Ok(Captured {
        bytes,
        truncated: drained > 0,
    })
}

/// Turn a finished process into stdout or an error.
///
/// `exit_code` is `None` when the process was killed by a signal.
pub fn classify_output(
    program: &str,
    exit_code: Option<i32>,
    stdout: String,
    stderr: String,
) -> Result<String, DownloadError> {
    let stderr = stderr.trim();

    if exit_code == Some(0) {
        if !stderr.is_empty() {
            log::warn!("[Command] {} warning: {}", program, stderr);
        }
        return Ok(stdout);
    }

    if !stdout.trim().is_empty() {
        log::warn!(
            "[Command] {} exited with {:?} but produced output; stderr: {}",
            program,
            exit_code,
            stderr
        );
        return Ok(stdout);
    }

    let detail = if stderr.is_empty() {
        match exit_code {
            Some(code) => format!("Command failed: {} exited with status {}", program, code),
            None => format!("Command failed: {} was terminated by a signal", program),
        }
    } else {
        stderr.to_string()
    };
    log::error!("[Command Error] {}", detail);
    Err(DownloadError::Process(detail))
}
