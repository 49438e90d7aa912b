//! Interactive first-run configuration.

use std::io::{self, Write};
use std::path::PathBuf;

use clap::Args;

use crate::config::{Config, ConfigError};
use crate::tally::TallyClient;

/// Configure the agent interactively
#[derive(Args)]
pub struct SetupCommand {}

impl SetupCommand {
    pub async fn run(
        &self,
        config: &Config,
        cli_config_path: Option<PathBuf>,
    ) -> Result<(), SetupError> {
        println!("Tally Sync Setup");
        println!("================");
        println!();

        let mut updated = config.clone();

        println!("Tally engine");
        updated.tally.server = prompt("Tally server", &updated.tally.server)?;
        let port_input = prompt("Tally port", &updated.tally.port.to_string())?;
        match port_input.parse() {
            Ok(port) => updated.tally.port = port,
            Err(_) => println!("Invalid port, keeping {}", updated.tally.port),
        }
        let company = prompt_optional(
            "Company name (leave empty to use the engine's open company)",
            updated.tally.company.as_deref().unwrap_or(""),
        )?;
        updated.tally.company = Some(company).filter(|c| !c.is_empty());

        println!();
        println!("Sync schedule");
        let interval_input = prompt(
            "Sync interval in minutes",
            &updated.sync.interval_minutes.to_string(),
        )?;
        match interval_input.parse() {
            Ok(minutes) => updated.sync.interval_minutes = minutes,
            Err(_) => println!(
                "Invalid interval, keeping {}",
                updated.sync.interval_minutes
            ),
        }
        let export_path = prompt(
            "Export path",
            &updated.sync.export_path.to_string_lossy(),
        )?;
        updated.sync.export_path = PathBuf::from(export_path);

        println!();
        println!("Backend");
        let url = prompt("Backend base URL", &updated.backend.url)?;
        updated.backend.url = url.trim_end_matches('/').to_string();

        let path = config.save_path(cli_config_path);
        updated.save(&path)?;
        println!();
        println!("✓ Configuration saved to {}", path.display());
        println!();

        println!("Testing Tally connection...");
        let tally = TallyClient::new(&updated.tally);
        if tally.test_connection().await {
            println!(
                "✓ Successfully connected to Tally at {}:{}",
                updated.tally.server, updated.tally.port
            );
            match tally.list_companies().await {
                Ok(companies) => {
                    println!("✓ Found {} company(ies):", companies.len());
                    for company in &companies {
                        println!("  • {}", company.name);
                    }
                }
                Err(e) => println!("✗ Could not list companies: {}", e),
            }
        } else {
            println!(
                "✗ Could not connect to Tally at {}:{}",
                updated.tally.server, updated.tally.port
            );
            println!("  Make sure Tally is running and the XML interface is enabled");
        }

        println!();
        println!("Setup complete! You can now:");
        println!("  1. Log in:     tally-sync login");
        println!("  2. Start sync: tally-sync");

        Ok(())
    }
}

/// Prompt with a default shown in brackets; empty input keeps the default.
fn prompt(label: &str, default: &str) -> Result<String, io::Error> {
    print!("{} [{}]: ", label, default);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    let input = input.trim();

    if input.is_empty() {
        Ok(default.to_string())
    } else {
        Ok(input.to_string())
    }
}

/// Prompt where an empty answer is meaningful, so no default is substituted
/// unless one was already set.
fn prompt_optional(label: &str, current: &str) -> Result<String, io::Error> {
    if current.is_empty() {
        print!("{}: ", label);
    } else {
        print!("{} [{}]: ", label, current);
    }
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    let input = input.trim();

    if input.is_empty() {
        Ok(current.to_string())
    } else {
        Ok(input.to_string())
    }
}

/// Errors from the setup command
#[derive(Debug)]
pub enum SetupError {
    Io(io::Error),
    Config(ConfigError),
}

impl std::fmt::Display for SetupError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SetupError::Io(e) => write!(f, "I/O error: {}", e),
            SetupError::Config(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for SetupError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SetupError::Io(e) => Some(e),
            SetupError::Config(e) => Some(e),
        }
    }
}

impl From<io::Error> for SetupError {
    fn from(e: io::Error) -> Self {
        SetupError::Io(e)
    }
}

impl From<ConfigError> for SetupError {
    fn from(e: ConfigError) -> Self {
        SetupError::Config(e)
    }
}
