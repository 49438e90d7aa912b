use clap::{Parser, Subcommand};
use std::path::PathBuf;

use tracing::info;

use tally_sync::commands::{CompaniesCommand, LoginCommand, SetupCommand, SyncCommand};
use tally_sync::config::Config;
use tally_sync::worker::SyncWorker;

#[derive(Parser)]
#[command(name = "tally-sync")]
#[command(version)]
#[command(about = "Sync agent for Tally accounting data", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure the agent interactively
    Setup(SetupCommand),

    /// Authenticate with the backend via email OTP
    Login(LoginCommand),

    /// Run a sync cycle now, or inspect sync status
    Sync(SyncCommand),

    /// List companies available on the Tally engine
    Companies(CompaniesCommand),
}

#[tokio::main]
async fn main() {
    tally_sync::logging::init();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(cli.config.clone())?;

    match cli.command {
        Some(Commands::Setup(cmd)) => {
            cmd.run(&config, cli.config).await?;
        }
        Some(Commands::Login(cmd)) => {
            cmd.run(&config, cli.config).await?;
        }
        Some(Commands::Sync(cmd)) => {
            cmd.run(&config).await?;
        }
        Some(Commands::Companies(cmd)) => {
            cmd.run(&config).await?;
        }
        None => {
            run_worker(&config).await?;
        }
    }

    Ok(())
}

/// Run the background worker until Ctrl-C.
async fn run_worker(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let mut worker = SyncWorker::from_config(config)?;
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown requested");
            let _ = shutdown_tx.send(true);
        }
    });

    worker.run(shutdown_rx).await;
    Ok(())
}
