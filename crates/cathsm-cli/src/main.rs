mod cli;
mod commands;
mod config;
mod error;
mod logging;
mod ui;

use crate::cli::{Cli, Commands};
use crate::error::{CliError, Result};
use crate::logging::LoggingConfig;
use crate::ui::{UiEvent, UiManager};
use clap::Parser;
use tokio::sync::{mpsc, watch};
use tokio::task::{self, JoinHandle};
use tracing::{debug, error, info, warn};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let logging = LoggingConfig::from(&cli);

    if let Err(e) = run(cli, &logging).await {
        eprintln!("\n❌ Error: {}", e);
        if let Some(hint) = e.hint() {
            eprintln!("   Hint: {}", hint);
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli, logging: &LoggingConfig) -> Result<()> {
    let (ui_manager, ui_sender, shutdown_sender) = UiManager::new();
    logging::setup_logging(logging, Some(ui_sender.clone()))?;
    install_error_hooks()?;
    let ui_handle = task::spawn(ui_manager.run());

    info!("cathsm v{} starting up.", env!("CARGO_PKG_VERSION"));
    debug!("Parsed arguments: {:?}", &cli);

    let result = match configure_thread_pool(cli.threads) {
        Ok(()) => dispatch(cli.command, ui_sender).await,
        Err(e) => Err(e),
    };

    match &result {
        Ok(()) => info!("Command completed successfully."),
        Err(e) => error!("Command failed: {}", e),
    }

    stop_ui(shutdown_sender, ui_handle).await?;
    if result.is_ok() && !logging.quiet {
        println!("✅ Done.");
    }
    result
}

/// Routes panics through the log so they print above any progress bars.
fn install_error_hooks() -> Result<()> {
    let (panic_hook, eyre_hook) = color_eyre::config::HookBuilder::default().into_hooks();
    eyre_hook.install().map_err(|e| CliError::Other(e.into()))?;
    std::panic::set_hook(Box::new(move |info| {
        error!("{}", panic_hook.panic_report(info));
    }));
    Ok(())
}

/// Sizes the global rayon pool that `pipeline` fans sequences out on.
fn configure_thread_pool(threads: Option<usize>) -> Result<()> {
    let Some(threads) = threads else {
        return Ok(());
    };
    debug!("Processing up to {} sequences in parallel.", threads);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .map_err(|e| CliError::Other(anyhow::anyhow!("Failed to build thread pool: {}", e)))
}

async fn dispatch(command: Commands, ui_sender: mpsc::Sender<UiEvent>) -> Result<()> {
    match command {
        Commands::SelectTemplate(args) => commands::select_template::run(args, ui_sender).await,
        Commands::Model(args) => commands::model::run(args, ui_sender).await,
        Commands::Pipeline(args) => commands::pipeline::run(args, ui_sender).await,
    }
}

async fn stop_ui(shutdown: watch::Sender<bool>, handle: JoinHandle<()>) -> Result<()> {
    if shutdown.send(true).is_err() {
        warn!("UI task exited before the shutdown signal.");
    }
    handle
        .await
        .map_err(|e| CliError::Other(anyhow::anyhow!("UI task failed: {}", e)))
}
