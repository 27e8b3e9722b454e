use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;

use nulldl::cli::{Cli, Commands};
use nulldl::core::config::Config;
use nulldl::core::logging::init_logger;
use nulldl::core::process::{CommandRunner, ProcessExecutor};
use nulldl::core::utils::{download_filename, format_bytes};
use nulldl::core::validation::{require_url, validate_audio_format};
use nulldl::core::web_server::{start_web_server, AppState};
use nulldl::download::format::DownloadKind;
use nulldl::download::orchestrator::DownloadRequest;
use nulldl::download::tools::check_tools;

/// Parses CLI arguments and dispatches to the subcommand.
///
/// # Errors
/// Returns an error if configuration, logging or the chosen command fails.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();
    let mut config = Config::load()?;

    init_logger(&config.log_level)?;

    match cli.command {
        None => start_web_server(&config).await,
        Some(Commands::Serve { port }) => {
            if let Some(port) = port {
                config.port = port;
            }
            start_web_server(&config).await
        }
        Some(Commands::Analyze { url, json }) => run_cli_analyze(&config, &url, json).await,
        Some(Commands::Download {
            url,
            format_id,
            audio,
            audio_format,
            output,
        }) => run_cli_download(&config, &url, format_id, audio, audio_format, output).await,
        Some(Commands::CheckTools) => run_check_tools(&config).await,
    }
}

fn build_state(config: &Config) -> Result<AppState> {
    let runner: Arc<dyn CommandRunner> = Arc::new(ProcessExecutor::new(config.max_output_bytes));
    Ok(AppState::build(config, runner)?)
}

async fn run_cli_analyze(config: &Config, url: &str, json: bool) -> Result<()> {
    let url = require_url(Some(url))?;
    let state = build_state(config)?;
    let result = state.analyzer.analyze(&url).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(result.as_ref())?);
        return Ok(());
    }

    let info = &result.video_info;
    println!("Title:    {}", info.title.as_deref().unwrap_or("Unknown"));
    println!("Uploader: {}", info.uploader.as_deref().unwrap_or("Unknown"));
    if let Some(duration) = info.duration {
        let secs = duration as u64;
        println!("Duration: {}:{:02}", secs / 60, secs % 60);
    }

    println!("\nVideo formats:");
    for f in &result.video_formats {
        println!(
            "  {:<10} {:>6} {:<5} {:>10}  {}",
            f.format_id,
            f.resolution,
            f.ext.as_deref().unwrap_or("-"),
            f.filesize.map(format_bytes).unwrap_or_else(|| "?".to_string()),
            f.format_note
        );
    }

    println!("\nAudio formats:");
    for f in &result.audio_formats {
        println!(
            "  {:<10} {:>6} {:<5} {:>10}  {}",
            f.format_id,
            f.abr.map(|a| format!("{:.0}k", a)).unwrap_or_else(|| "-".to_string()),
            f.ext.as_deref().unwrap_or("-"),
            f.filesize.map(format_bytes).unwrap_or_else(|| "?".to_string()),
            f.format_note
        );
    }
    Ok(())
}

async fn run_cli_download(
    config: &Config,
    url: &str,
    format_id: Option<String>,
    audio: bool,
    audio_format: String,
    output: Option<PathBuf>,
) -> Result<()> {
    let url = require_url(Some(url))?;
    let kind = if audio { DownloadKind::Audio } else { DownloadKind::Video };
    if kind == DownloadKind::Audio {
        validate_audio_format(&audio_format)?;
    }

    let state = build_state(config)?;

    // Only probe for a title when we have to name the file ourselves.
    let title = match &output {
        Some(_) => None,
        None => match state.analyzer.analyze(&url).await {
            Ok(result) => result.video_info.title.clone(),
            Err(e) => {
                log::warn!("Could not fetch title, using a generated name: {}", e);
                None
            }
        },
    };

    let request = DownloadRequest {
        url,
        format_id,
        kind,
        audio_format: Some(audio_format),
        title,
    };

    println!("Downloading {} ({})...", request.url, kind.as_str());
    let file = state.orchestrator.download(&request).await?;

    let dest = output.unwrap_or_else(|| PathBuf::from(download_filename(request.title.as_deref(), &file.extension)));
    let size = file.persist_to(&dest).await?;

    println!("Saved {} ({})", dest.display(), format_bytes(size));
    Ok(())
}

async fn run_check_tools(config: &Config) -> Result<()> {
    let runner = ProcessExecutor::new(config.max_output_bytes);
    let versions = check_tools(&runner, &config.ytdlp_bin, &config.ffmpeg_bin).await;

    let mut missing = Vec::new();
    for tool in &versions {
        match &tool.version {
            Some(v) => println!("{:<7} {}", tool.name, v),
            None => {
                println!("{:<7} not found", tool.name);
                missing.push(tool.name);
            }
        }
    }

    if missing.is_empty() {
        Ok(())
    } else {
        Err(anyhow::anyhow!("Missing tools: {}", missing.join(", ")))
    }
}
