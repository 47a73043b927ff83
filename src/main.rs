//! rating-overlay CLI entry point

use clap::Parser;
use console::style;
use rating_overlay::cli::{Cli, Commands};
use rating_overlay::config::{Config, ConfigManager};
use rating_overlay::error::OverlayResult;
use rating_overlay::ui;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> OverlayResult<()> {
    let cli = Cli::parse();

    let config_manager = match cli.config {
        Some(ref path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    };
    let config = config_manager.load().await?;

    init_logging(cli.verbose, &config);
    ui::init_theme();

    match cli.command {
        Commands::Resolve(args) => rating_overlay::cli::commands::resolve(args, &config).await,
        Commands::Scan(args) => rating_overlay::cli::commands::scan(args, &config).await,
        Commands::Badge(args) => rating_overlay::cli::commands::badge(args).await,
        Commands::Cache(args) => rating_overlay::cli::commands::cache(args, &config).await,
        Commands::Config(args) => {
            rating_overlay::cli::commands::config(args, &config_manager, &config).await
        }
    }
}

/// 0 = warn, 1 = info, 2+ = debug; `general.verbose` counts as one level
fn init_logging(verbose: u8, config: &Config) {
    let level = verbose.saturating_add(u8::from(config.general.verbose));
    let filter = match level {
        0 => EnvFilter::new("rating_overlay=warn"),
        1 => EnvFilter::new("rating_overlay=info"),
        _ => EnvFilter::new("rating_overlay=debug"),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if config.general.log_format == "json" {
        builder.json().init();
    } else {
        builder.without_time().init();
    }
}
