//! HTTP client for the remote backend.
//!
//! Covers the auth endpoints (`/key`, `/sendotpmail`, `/validateotp`,
//! `/users/orgs`) and the data ingest endpoint (`/api/data`). The backend
//! expects the raw token in the `Authorization` header, without a `Bearer`
//! prefix.

use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors from backend requests.
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Backend returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Unexpected backend response: {0}")]
    Parse(String),
}

/// An organisation the logged-in user belongs to.
#[derive(Debug, Clone, Deserialize)]
pub struct UserOrganisation {
    pub user_id: u32,
    pub organisation_id: u32,
    #[serde(rename = "OrganisationCode")]
    pub organisation_code: String,
}

#[derive(Deserialize)]
struct KeyResponse {
    key: String,
}

#[derive(Deserialize)]
struct TokenResponse {
    token: String,
}

/// Typed surface over the backend API.
#[derive(Clone)]
pub struct BackendClient {
    base_url: String,
    client: reqwest::Client,
}

impl BackendClient {
    pub fn new(base_url: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetches the RSA public key used to seal credentials.
    ///
    /// The body is usually JSON `{"key": …}` but some deployments return
    /// the bare key text, so anything that is not that JSON shape passes
    /// through verbatim.
    pub async fn fetch_public_key(&self) -> Result<String, BackendError> {
        info!("Fetching RSA public key from /key endpoint");

        let response = self
            .client
            .get(format!("{}/key", self.base_url))
            .send()
            .await?;
        let body = Self::success_body(response).await?;

        match serde_json::from_str::<KeyResponse>(&body) {
            Ok(parsed) => Ok(parsed.key),
            Err(_) => Ok(body),
        }
    }

    /// Requests an OTP email; `email_ciphertext` is already sealed.
    pub async fn send_otp(&self, email_ciphertext: &str) -> Result<(), BackendError> {
        let response = self
            .client
            .post(format!("{}/sendotpmail", self.base_url))
            .json(&serde_json::json!({ "email": email_ciphertext }))
            .send()
            .await?;
        Self::success_body(response).await?;
        Ok(())
    }

    /// Exchanges a sealed email/code pair for a token.
    pub async fn validate_otp(
        &self,
        email_ciphertext: &str,
        code_ciphertext: &str,
    ) -> Result<String, BackendError> {
        let response = self
            .client
            .post(format!("{}/validateotp", self.base_url))
            .json(&serde_json::json!({
                "email": email_ciphertext,
                "code": code_ciphertext,
            }))
            .send()
            .await?;
        let body = Self::success_body(response).await?;

        let parsed: TokenResponse =
            serde_json::from_str(&body).map_err(|e| BackendError::Parse(e.to_string()))?;
        Ok(parsed.token)
    }

    /// Lists the organisations linked to the authenticated user.
    pub async fn fetch_organisations(
        &self,
        token: &str,
    ) -> Result<Vec<UserOrganisation>, BackendError> {
        let response = self
            .client
            .get(format!("{}/users/orgs", self.base_url))
            .header("Authorization", token)
            .send()
            .await?;
        let body = Self::success_body(response).await?;

        serde_json::from_str(&body).map_err(|e| BackendError::Parse(e.to_string()))
    }

    /// Pushes one exported table to the ingest endpoint.
    pub async fn push_table(
        &self,
        token: &str,
        organisation_id: Option<u32>,
        table: &str,
        xml: &str,
    ) -> Result<(), BackendError> {
        debug!("Pushing {} export ({} bytes) to backend", table, xml.len());

        let response = self
            .client
            .post(format!("{}/api/data", self.base_url))
            .header("Authorization", token)
            .json(&serde_json::json!({
                "table": table,
                "organisation_id": organisation_id,
                "data": xml,
            }))
            .send()
            .await?;
        Self::success_body(response).await?;
        Ok(())
    }

    async fn success_body(response: reqwest::Response) -> Result<String, BackendError> {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(BackendError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }
}
