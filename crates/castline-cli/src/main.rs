//! castline - spoken digests of syndicated news feeds
//!
//! Polls RSS/Atom feeds, extracts and condenses new articles, and
//! synthesizes each summary into an audio file, once or on a schedule.

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use castline_core::{ProgressContext, Shutdown};

mod cmd;
mod config;

use config::Config;

#[derive(Parser)]
#[command(name = "castline")]
#[command(about = "Turn news feeds into spoken digests")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Config file path (default: ./castline.toml or ~/.config/castline/config.toml)
    #[arg(short, long, global = true)]
    config: Option<std::path::PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Process new feed items once and exit
    Run(cmd::run::RunArgs),
    /// Process new feed items now and then on a fixed interval
    Schedule(cmd::schedule::ScheduleArgs),
    /// Show per-feed progress recorded in the state file
    Status(cmd::status::StatusArgs),
    /// Show current configuration
    Config,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Progress context (TTY auto-detect)
    let progress = ProgressContext::new();

    // Logging:
    //   TTY:     quiet (warn) unless --debug; progress bars show activity
    //   non-TTY: info unless --debug; logs are the only progress indicator
    let is_tty = progress.is_tty();
    let multi = if is_tty { Some(progress.multi()) } else { None };
    let quiet = if is_tty { !cli.debug } else { false };
    castline_core::init_logging(quiet, cli.debug, multi);

    match try_main(cli, &progress) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            log::error!("{e:#}");
            ExitCode::from(cmd::ABORTED)
        }
    }
}

fn try_main(cli: Cli, progress: &ProgressContext) -> Result<u8> {
    let config = if let Some(path) = &cli.config {
        Config::from_file(path)?
    } else {
        Config::load()?
    };

    match cli.command {
        Command::Run(args) => {
            let shutdown = install_shutdown()?;
            cmd::run::run(args, &config, progress, &shutdown)
        }
        Command::Schedule(args) => {
            let shutdown = install_shutdown()?;
            cmd::schedule::run(args, &config, progress, &shutdown)
        }
        Command::Status(args) => cmd::status::run(args, &config),
        Command::Config => {
            let mut table = cmd::table(&["Setting", "Value"]);

            table.add_row(vec!["Feeds", &config.feeds.len().to_string()]);
            for feed in config.feed_sources() {
                table.add_row(vec![format!("  {}", feed.id()), feed.url.clone()]);
            }
            table.add_row(vec![
                "Output directory",
                &config.output.dir.display().to_string(),
            ]);
            table.add_row(vec![
                "State file",
                &config.output.state_file.display().to_string(),
            ]);
            table.add_row(vec![
                "Transcripts",
                if config.output.transcripts { "on" } else { "off" },
            ]);
            table.add_row(vec![
                "Workers",
                &format!("{} (max: {})", config.workers.default, config.workers.max),
            ]);
            table.add_row(vec![
                "Max sentences",
                &config.summary.max_sentences.to_string(),
            ]);
            table.add_row(vec![
                "Max items per feed",
                &match config.summary.max_items_per_feed {
                    0 => "unlimited".to_string(),
                    n => n.to_string(),
                },
            ]);
            table.add_row(vec![
                "TTS",
                &format!("{} ({})", config.tts.engine, config.tts.language),
            ]);
            table.add_row(vec![
                "User agent",
                config.http.user_agent.as_deref().unwrap_or("default"),
            ]);
            table.add_row(vec![
                "Timeouts",
                &format!(
                    "feed {}s, extract {}s, synthesize {}s",
                    config.http.feed_timeout,
                    config.http.extract_timeout,
                    config.http.synthesize_timeout
                ),
            ]);
            table.add_row(vec!["Max retries", &config.http.max_retries.to_string()]);
            table.add_row(vec![
                "Schedule",
                &format!("every {} min", config.schedule.every_minutes),
            ]);

            eprintln!("\n{table}");
            Ok(0)
        }
    }
}

fn install_shutdown() -> Result<Shutdown> {
    let shutdown = Shutdown::new();
    shutdown
        .install_signal_handlers()
        .context("Failed to install signal handlers")?;
    Ok(shutdown)
}
