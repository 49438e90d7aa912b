//! Email OTP login against the backend.

use std::io::{self, Write};
use std::path::PathBuf;

use clap::Args;

use crate::auth::{AuthError, AuthManager};
use crate::backend::{BackendClient, BackendError};
use crate::config::{Config, ConfigError};

/// Authenticate with the backend via email OTP
#[derive(Args)]
pub struct LoginCommand {
    /// Backend base URL (defaults to the configured one)
    url: Option<String>,
}

impl LoginCommand {
    pub async fn run(
        &self,
        config: &Config,
        cli_config_path: Option<PathBuf>,
    ) -> Result<(), LoginError> {
        println!("Tally Sync Login");
        println!("================");
        println!();

        let backend_url = self
            .url
            .clone()
            .unwrap_or_else(|| config.backend.url.clone())
            .trim_end_matches('/')
            .to_string();

        let backend = BackendClient::new(&backend_url);
        let mut auth = AuthManager::load(Config::default_auth_state_path(), backend.clone());

        if auth.is_authenticated() {
            let email = auth.user_email().unwrap_or("unknown").to_string();
            println!("Already logged in as {}.", email);
            let answer = prompt("Log in with a different account? [y/N] ")?;
            if !answer.eq_ignore_ascii_case("y") {
                println!("Keeping existing session.");
                return Ok(());
            }
            println!();
        }

        println!("Fetching encryption key from backend...");
        auth.ensure_public_key().await?;
        println!("✓ Encryption key fetched");
        println!();

        let email = prompt("Email: ")?;
        if email.is_empty() {
            println!("Email cannot be empty.");
            return Ok(());
        }

        println!("Sending one-time password to {}...", email);
        auth.send_otp(&email).await?;
        println!("✓ One-time password sent");
        println!();

        let code = prompt("Enter the code: ")?;
        if code.is_empty() {
            println!("Code cannot be empty.");
            return Ok(());
        }

        auth.validate_otp(&email, &code).await?;
        println!("✓ Successfully authenticated!");
        println!();

        let token = match auth.get_valid_token() {
            Some(token) => token,
            None => return Err(LoginError::NoSession),
        };

        let organisations = backend.fetch_organisations(&token).await?;
        if organisations.is_empty() {
            println!("No organisations are linked to this account yet.");
            return Ok(());
        }

        let selected = if organisations.len() == 1 {
            &organisations[0]
        } else {
            println!("Your organisations:");
            for (i, org) in organisations.iter().enumerate() {
                println!("  {}. {}", i + 1, org.organisation_code);
            }
            loop {
                let input = prompt("Select organisation [1]: ")?;
                let choice = if input.is_empty() {
                    1
                } else {
                    match input.parse::<usize>() {
                        Ok(n) => n,
                        Err(_) => {
                            println!("Enter a number between 1 and {}", organisations.len());
                            continue;
                        }
                    }
                };
                if (1..=organisations.len()).contains(&choice) {
                    break &organisations[choice - 1];
                }
                println!("Enter a number between 1 and {}", organisations.len());
            }
        };

        let mut updated = config.clone();
        updated.backend.url = backend_url;
        updated.backend.organisation_id = Some(selected.organisation_id);

        let path = config.save_path(cli_config_path);
        updated.save(&path)?;
        println!(
            "✓ Organisation {} saved to {}",
            selected.organisation_code,
            path.display()
        );

        Ok(())
    }
}

fn prompt(label: &str) -> Result<String, io::Error> {
    print!("{}", label);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

/// Errors from the login command
#[derive(Debug)]
pub enum LoginError {
    Auth(AuthError),
    Backend(BackendError),
    Config(ConfigError),
    Io(io::Error),
    /// Token vanished between validation and organisation lookup.
    NoSession,
}

impl std::fmt::Display for LoginError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoginError::Auth(e) => write!(f, "{}", e),
            LoginError::Backend(e) => write!(f, "{}", e),
            LoginError::Config(e) => write!(f, "{}", e),
            LoginError::Io(e) => write!(f, "I/O error: {}", e),
            LoginError::NoSession => write!(f, "Session was not persisted after login"),
        }
    }
}

impl std::error::Error for LoginError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LoginError::Auth(e) => Some(e),
            LoginError::Backend(e) => Some(e),
            LoginError::Config(e) => Some(e),
            LoginError::Io(e) => Some(e),
            LoginError::NoSession => None,
        }
    }
}

impl From<AuthError> for LoginError {
    fn from(e: AuthError) -> Self {
        LoginError::Auth(e)
    }
}

impl From<BackendError> for LoginError {
    fn from(e: BackendError) -> Self {
        LoginError::Backend(e)
    }
}

impl From<ConfigError> for LoginError {
    fn from(e: ConfigError) -> Self {
        LoginError::Config(e)
    }
}

impl From<io::Error> for LoginError {
    fn from(e: io::Error) -> Self {
        LoginError::Io(e)
    }
}
