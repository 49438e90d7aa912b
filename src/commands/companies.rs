//! List companies known to the engine.

use clap::Args;

use crate::config::Config;
use crate::tally::{TallyClient, TallyError};

/// List companies available on the Tally engine
#[derive(Args)]
pub struct CompaniesCommand {}

impl CompaniesCommand {
    pub async fn run(&self, config: &Config) -> Result<(), CompaniesError> {
        let tally = TallyClient::new(&config.tally);
        let companies = tally.list_companies().await?;

        if companies.is_empty() {
            println!(
                "No companies found on {}:{}",
                config.tally.server, config.tally.port
            );
            return Ok(());
        }

        println!(
            "Companies on {}:{}",
            config.tally.server, config.tally.port
        );
        for company in &companies {
            let marker = if tally.active_company() == Some(company.name.as_str()) {
                " (active)"
            } else {
                ""
            };
            println!("  • {}{}", company.name, marker);
        }

        Ok(())
    }
}

/// Errors from the companies command
#[derive(Debug)]
pub enum CompaniesError {
    Tally(TallyError),
}

impl std::fmt::Display for CompaniesError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompaniesError::Tally(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for CompaniesError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CompaniesError::Tally(e) => Some(e),
        }
    }
}

impl From<TallyError> for CompaniesError {
    fn from(e: TallyError) -> Self {
        CompaniesError::Tally(e)
    }
}
