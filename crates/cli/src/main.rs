//! Syncr CLI - syncr command

use anyhow::{Context, Result};
use clap::Parser;
use cli_lib::config::{self, Overrides, SyncConfig};
use cli_lib::{banner, prompt, SyncController};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use syncr_core::check_directory;
use tracing::{error, info, Level};

/// Syncr - mirror a directory into another whenever matching files change
#[derive(Parser)]
#[command(name = "syncr")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Source directory (prompted for when omitted)
    #[arg(long)]
    source: Option<PathBuf>,

    /// Target directory (prompted for when omitted)
    #[arg(long)]
    target: Option<PathBuf>,

    /// Regex matched against file names (default: ^.*\.(java)$)
    #[arg(long)]
    pattern: Option<String>,

    /// Poll interval in milliseconds (default: 100)
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Events reported per poll tick, 0 for no cap (default: 1)
    #[arg(long)]
    max_events: Option<usize>,

    /// Only watch the top level of the source directory
    #[arg(long)]
    no_recursive: bool,

    /// Match the pattern against full paths as well as file names
    #[arg(long)]
    full_path: bool,

    /// Copy once at startup before waiting for changes
    #[arg(long)]
    initial_sync: bool,

    /// TOML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print the effective configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            source: self.source.clone(),
            target: self.target.clone(),
            pattern: self.pattern.clone(),
            poll_interval_ms: self.interval_ms,
            max_events: self.max_events,
            no_recursive: self.no_recursive,
            match_full_path: self.full_path,
            initial_sync: self.initial_sync,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::INFO })
        .with_target(false)
        .init();

    let mut config = match &cli.config {
        Some(path) => config::load(path)?,
        None => SyncConfig::default(),
    };
    config.apply(&cli.overrides());
    config.validate().context("Invalid configuration")?;

    if cli.print_config {
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    banner::print_banner();

    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut output = io::stdout();

    let source = resolve_root("Source directory", config.sync.source.clone(), &mut input, &mut output)?;
    println!();
    let target = resolve_root("Target directory", config.sync.target.clone(), &mut input, &mut output)?;
    drop(input);

    let watch = config.watch_target(&source)?;
    let controller = SyncController::new(watch, target)?.with_initial_sync(config.sync.initial_sync);
    let handle = controller.handle();

    println!("\n==============================");
    println!("Syncr service has started. Press [CTRL] + [C] to terminate.");

    tokio::select! {
        result = controller.run() => {
            let summary = result.context("Watcher failed")?;
            info!("Watcher closed after {} sync passes", summary.passes);
        }
        signal = tokio::signal::ctrl_c() => {
            if let Err(err) = signal {
                error!("Failed to listen for Ctrl-C: {}", err);
            }
            info!("Stopping");
            handle.close();
        }
    }

    Ok(())
}

/// Use a preset directory if one was configured, otherwise prompt for it
fn resolve_root<R: BufRead, W: Write>(
    label: &str,
    preset: Option<PathBuf>,
    input: &mut R,
    output: &mut W,
) -> Result<PathBuf> {
    match preset {
        Some(path) => {
            check_directory(&path).with_context(|| format!("Invalid {}", label.to_lowercase()))?;
            Ok(path)
        }
        None => prompt::prompt_directory(label, input, output)
            .with_context(|| format!("Failed to read {}", label.to_lowercase())),
    }
}
