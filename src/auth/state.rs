//! Persisted session state.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// The single persisted session record (one logical session per install).
///
/// `is_authenticated` implies the token was present and unexpired at the
/// last validation; readers that find the expiry in the past flip the flag
/// and re-persist. The file stays forward compatible: unknown fields are
/// ignored on load, and a missing or unreadable file is a logged-out state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthState {
    pub jwt_token: Option<String>,
    pub token_expiry: Option<DateTime<Utc>>,
    pub user_email: Option<String>,
    pub is_authenticated: bool,
}

impl AuthState {
    /// Loads state from disk. Missing or corrupt files yield the default
    /// logged-out state rather than an error.
    pub fn load(path: &Path) -> AuthState {
        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(state) => {
                    debug!("Auth state loaded from {}", path.display());
                    state
                }
                Err(e) => {
                    warn!("Ignoring corrupt auth state file {}: {}", path.display(), e);
                    AuthState::default()
                }
            },
            Err(_) => AuthState::default(),
        }
    }

    /// Writes state to disk, creating parent directories as needed.
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        std::fs::write(path, json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_is_logged_out() {
        let temp_dir = tempdir().unwrap();
        let state = AuthState::load(&temp_dir.path().join("auth-state.json"));

        assert!(!state.is_authenticated);
        assert!(state.jwt_token.is_none());
        assert!(state.user_email.is_none());
    }

    #[test]
    fn test_corrupt_file_is_logged_out() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("auth-state.json");
        std::fs::write(&path, "{not json").unwrap();

        let state = AuthState::load(&path);
        assert!(!state.is_authenticated);
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("nested").join("auth-state.json");

        let state = AuthState {
            jwt_token: Some("tok".to_string()),
            token_expiry: Some(Utc::now() + chrono::Duration::days(30)),
            user_email: Some("user@example.com".to_string()),
            is_authenticated: true,
        };
        state.save(&path).unwrap();

        let loaded = AuthState::load(&path);
        assert_eq!(loaded.jwt_token.as_deref(), Some("tok"));
        assert_eq!(loaded.user_email.as_deref(), Some("user@example.com"));
        assert_eq!(loaded.token_expiry, state.token_expiry);
        assert!(loaded.is_authenticated);
    }

    #[test]
    fn test_unknown_fields_are_ignored() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("auth-state.json");
        std::fs::write(
            &path,
            r#"{"jwt_token": "tok", "is_authenticated": true, "device_label": "laptop"}"#,
        )
        .unwrap();

        let state = AuthState::load(&path);
        assert_eq!(state.jwt_token.as_deref(), Some("tok"));
        assert!(state.is_authenticated);
        assert!(state.token_expiry.is_none());
    }
}
