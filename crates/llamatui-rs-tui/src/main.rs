//! `llamatui`: terminal console for launching and watching `llama-server`.

use clap::Parser;
use llamatui_rs_tui::ConsoleOptions;
use log::{LevelFilter, info};
use std::path::PathBuf;
use std::process::ExitCode;

/// Command-line options for the console.
#[derive(Parser)]
#[command(name = "llamatui", version)]
struct Cli {
    /// Settings file to use instead of ~/.llamatui/config.json5
    #[arg(long)]
    config: Option<PathBuf>,
    /// Directory to scan for .gguf models this session
    #[arg(long)]
    models_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    // log lines on stderr would tear the alternate screen; keep quiet unless asked
    let _ = env_logger::builder()
        .filter_level(LevelFilter::Error)
        .format_timestamp_millis()
        .parse_default_env()
        .try_init();

    let cli = Cli::parse();
    info!(
        "starting console (config_set={}, models_dir_set={})",
        cli.config.is_some(),
        cli.models_dir.is_some()
    );
    let options = ConsoleOptions {
        config_path: cli.config,
        models_dir: cli.models_dir,
    };
    match llamatui_rs_tui::run(options).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Fatal Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
