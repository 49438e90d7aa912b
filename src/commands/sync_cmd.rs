//! Sync CLI commands: one-shot cycle and status.

use clap::{Args, Subcommand};

use crate::auth::AuthManager;
use crate::backend::BackendClient;
use crate::config::{Config, ConfigError};
use crate::tally::TallyClient;
use crate::worker::SyncWorker;

/// Run a sync cycle now, or inspect sync status
#[derive(Debug, Args)]
pub struct SyncCommand {
    #[command(subcommand)]
    command: Option<SyncSubcommand>,
}

#[derive(Debug, Subcommand)]
enum SyncSubcommand {
    /// Show configuration, connectivity and session state
    Status,
}

impl SyncCommand {
    pub async fn run(&self, config: &Config) -> Result<(), SyncCommandError> {
        match &self.command {
            None => self.sync_once(config).await,
            Some(SyncSubcommand::Status) => self.status(config).await,
        }
    }

    async fn sync_once(&self, config: &Config) -> Result<(), SyncCommandError> {
        let mut worker = SyncWorker::from_config(config)?;

        println!("Running one sync cycle...");
        let outcome = worker.run_cycle().await;
        println!();

        if outcome.failed == 0 {
            println!("✓ Sync complete: {} table(s) exported", outcome.synced);
            Ok(())
        } else {
            println!(
                "✗ Sync finished with errors: {} ok, {} failed",
                outcome.synced, outcome.failed
            );
            Err(SyncCommandError::TablesFailed(outcome.failed))
        }
    }

    async fn status(&self, config: &Config) -> Result<(), SyncCommandError> {
        println!("Sync Status");
        println!("===========");
        println!();

        match &config.config_file {
            Some(path) => println!("Config file:  {}", path.display()),
            None => println!(
                "Config file:  {} (not found, using defaults)",
                Config::default_config_path().display()
            ),
        }
        println!("Interval:     {} minute(s)", config.sync.interval_minutes);
        println!("Export path:  {}", config.sync.export_path.display());
        println!("Tables:");
        match config.sync.table_kinds() {
            Ok(kinds) => {
                for kind in kinds {
                    println!("  • {} - {}", kind.name(), kind.description());
                }
            }
            Err(e) => println!("  ✗ {}", e),
        }
        println!();

        let tally = TallyClient::new(&config.tally);
        print!(
            "Tally engine {}:{} - ",
            config.tally.server, config.tally.port
        );
        if tally.test_connection().await {
            println!("✓ reachable");
        } else {
            println!("✗ unreachable");
        }

        let backend = BackendClient::new(&config.backend.url);
        print!("Backend {} - ", backend.base_url());
        match backend.fetch_public_key().await {
            Ok(_) => println!("✓ reachable"),
            Err(e) => println!("✗ {}", e),
        }

        let mut auth = AuthManager::load(Config::default_auth_state_path(), backend);
        if auth.is_authenticated() {
            println!(
                "Session:      ✓ logged in as {}",
                auth.user_email().unwrap_or("unknown")
            );
        } else {
            println!("Session:      ✗ not logged in (run 'tally-sync login')");
        }
        match config.backend.organisation_id {
            Some(id) => println!("Organisation: {}", id),
            None => println!("Organisation: not selected"),
        }

        Ok(())
    }
}

/// Errors from sync commands
#[derive(Debug)]
pub enum SyncCommandError {
    Config(ConfigError),
    TablesFailed(usize),
}

impl std::fmt::Display for SyncCommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncCommandError::Config(e) => write!(f, "{}", e),
            SyncCommandError::TablesFailed(n) => write!(f, "{} table(s) failed to sync", n),
        }
    }
}

impl std::error::Error for SyncCommandError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SyncCommandError::Config(e) => Some(e),
            SyncCommandError::TablesFailed(_) => None,
        }
    }
}

impl From<ConfigError> for SyncCommandError {
    fn from(e: ConfigError) -> Self {
        SyncCommandError::Config(e)
    }
}
