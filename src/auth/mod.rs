//! Email plus one-time-password authentication against the backend.
//!
//! Credentials are sealed with the backend's RSA public key before they
//! leave the process; the resulting session token is persisted next to the
//! application data and expires client-side after thirty days.

mod crypto;
mod manager;
mod state;

pub use crypto::{CryptoError, RsaEnvelope};
pub use manager::{AuthError, AuthManager};
pub use state::AuthState;
