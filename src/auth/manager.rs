//! OTP state machine and token lifecycle.

use std::path::PathBuf;

use chrono::Utc;
use thiserror::Error;
use tracing::{info, warn};

use crate::backend::{BackendClient, BackendError};

use super::crypto::{CryptoError, RsaEnvelope};
use super::state::AuthState;

/// Errors from the authentication flow.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("No public key available for encryption")]
    NoKey,

    #[error("Backend returned an empty token")]
    EmptyToken,
}

/// Owns the persisted session, the public-key cache and the backend
/// connection for the OTP flow.
///
/// Absence of a valid session is not an error: `get_valid_token` and
/// `is_authenticated` answer `None`/`false`. Only network and crypto
/// failures surface as `Err`. The manager never reads stdin; the
/// interactive login command drives it.
pub struct AuthManager {
    state: AuthState,
    state_path: PathBuf,
    backend: BackendClient,
    // Fetched at most once per process; invalidated only by restart.
    public_key: Option<RsaEnvelope>,
}

impl AuthManager {
    /// Loads the persisted session, or a logged-out default when the state
    /// file is missing or unreadable.
    pub fn load(state_path: PathBuf, backend: BackendClient) -> Self {
        let state = AuthState::load(&state_path);
        Self {
            state,
            state_path,
            backend,
            public_key: None,
        }
    }

    /// Fetches and caches the backend's public key if not already held.
    pub async fn ensure_public_key(&mut self) -> Result<(), AuthError> {
        if self.public_key.is_none() {
            let key_text = self.backend.fetch_public_key().await?;
            self.public_key = Some(RsaEnvelope::from_key_text(&key_text)?);
        }
        Ok(())
    }

    /// Seals the email and asks the backend to send an OTP to it.
    ///
    /// A key-fetch failure aborts before anything reaches `/sendotpmail`.
    pub async fn send_otp(&mut self, email: &str) -> Result<(), AuthError> {
        self.ensure_public_key().await?;
        let key = self.public_key.as_ref().ok_or(AuthError::NoKey)?;

        let email_ciphertext = key.encrypt(email)?;
        self.backend.send_otp(&email_ciphertext).await?;

        info!("OTP requested for {}", email);
        Ok(())
    }

    /// Validates the OTP and, on success, persists the new session.
    ///
    /// Email and code are sealed independently, two separate OAEP
    /// operations. The stored expiry is a 30-day client-side convention;
    /// the token's own claims are never decoded.
    pub async fn validate_otp(&mut self, email: &str, code: &str) -> Result<(), AuthError> {
        self.ensure_public_key().await?;
        let key = self.public_key.as_ref().ok_or(AuthError::NoKey)?;

        let email_ciphertext = key.encrypt(email)?;
        let code_ciphertext = key.encrypt(code)?;
        let token = self
            .backend
            .validate_otp(&email_ciphertext, &code_ciphertext)
            .await?;
        if token.is_empty() {
            return Err(AuthError::EmptyToken);
        }

        self.state = AuthState {
            jwt_token: Some(token),
            token_expiry: Some(Utc::now() + chrono::Duration::days(30)),
            user_email: Some(email.to_string()),
            is_authenticated: true,
        };
        self.persist();

        info!("Successfully authenticated as {}", email);
        Ok(())
    }

    /// Returns the stored token if the session is still valid.
    ///
    /// A session found expired is flipped to logged-out and persisted once;
    /// repeat calls return `None` without touching the file again.
    pub fn get_valid_token(&mut self) -> Option<String> {
        if self.session_valid() {
            return self.state.jwt_token.clone();
        }
        self.expire_if_needed();
        None
    }

    /// Same check as `get_valid_token` without cloning the token.
    pub fn is_authenticated(&mut self) -> bool {
        if self.session_valid() {
            return true;
        }
        self.expire_if_needed();
        false
    }

    pub fn user_email(&self) -> Option<&str> {
        self.state.user_email.as_deref()
    }

    fn session_valid(&self) -> bool {
        self.state.is_authenticated
            && self.state.jwt_token.is_some()
            && self
                .state
                .token_expiry
                .map_or(false, |expiry| expiry > Utc::now())
    }

    fn expire_if_needed(&mut self) {
        if self.state.is_authenticated {
            warn!("Stored session has expired; login required");
            self.state.is_authenticated = false;
            self.persist();
        }
    }

    fn persist(&self) {
        if let Err(e) = self.state.save(&self.state_path) {
            warn!(
                "Failed to persist auth state to {}: {}",
                self.state_path.display(),
                e
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn manager_with_state(state: AuthState) -> (AuthManager, PathBuf, tempfile::TempDir) {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("auth-state.json");
        state.save(&path).unwrap();
        let manager = AuthManager::load(path.clone(), BackendClient::new("http://127.0.0.1:1"));
        (manager, path, temp_dir)
    }

    #[test]
    fn test_valid_session_yields_token() {
        let (mut manager, _path, _tmp) = manager_with_state(AuthState {
            jwt_token: Some("tok".to_string()),
            token_expiry: Some(Utc::now() + chrono::Duration::days(1)),
            user_email: Some("user@example.com".to_string()),
            is_authenticated: true,
        });

        assert_eq!(manager.get_valid_token().as_deref(), Some("tok"));
        assert!(manager.is_authenticated());
        assert_eq!(manager.user_email(), Some("user@example.com"));
    }

    #[test]
    fn test_expired_session_flips_and_persists() {
        let (mut manager, path, _tmp) = manager_with_state(AuthState {
            jwt_token: Some("tok".to_string()),
            token_expiry: Some(Utc::now() - chrono::Duration::seconds(1)),
            user_email: Some("user@example.com".to_string()),
            is_authenticated: true,
        });

        assert_eq!(manager.get_valid_token(), None);
        assert!(!AuthState::load(&path).is_authenticated);

        // Idempotent: a second read stays logged out.
        assert_eq!(manager.get_valid_token(), None);
        assert!(!manager.is_authenticated());
    }

    #[test]
    fn test_never_authenticated_has_no_token() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("auth-state.json");
        let mut manager = AuthManager::load(path.clone(), BackendClient::new("http://127.0.0.1:1"));

        assert_eq!(manager.get_valid_token(), None);
        assert!(!manager.is_authenticated());
        // Never-authenticated state is not re-persisted.
        assert!(!path.exists());
    }
}
