//! HTTP client for the accounting engine.

use std::time::Duration;

use chrono::NaiveDate;
use tracing::{error, info, warn};

use crate::config::TallyConfig;

use super::tables::TableKind;
use super::xml::{parse_companies, Company};
use super::TallyError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const CONNECT_TEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Minimal export request used for the connectivity test.
const PING_REQUEST: &str = r"<ENVELOPE>
  <HEADER><VERSION>1</VERSION><TALLYREQUEST>Export</TALLYREQUEST></HEADER>
  <BODY><DESC><STATICVARIABLES><SVEXPORTFORMAT>$SysName:XML</SVEXPORTFORMAT></STATICVARIABLES></DESC></BODY>
</ENVELOPE>";

const COMPANY_LIST_REQUEST: &str = r"<ENVELOPE>
  <HEADER>
    <VERSION>1</VERSION>
    <TALLYREQUEST>Export</TALLYREQUEST>
    <TYPE>Collection</TYPE>
    <ID>ListOfCompanies</ID>
  </HEADER>
  <BODY>
    <DESC>
      <STATICVARIABLES>
        <SVEXPORTFORMAT>$$SysName:XML</SVEXPORTFORMAT>
      </STATICVARIABLES>
      <TDL>
        <TDLMESSAGE>
          <COLLECTION NAME='ListOfCompanies'>
            <TYPE>Company</TYPE>
            <FETCH>NAME</FETCH>
          </COLLECTION>
        </TDLMESSAGE>
      </TDL>
    </DESC>
  </BODY>
</ENVELOPE>";

/// Client for the engine's collection-export interface.
///
/// All requests are `POST /` with a `text/xml` body; the interface is a
/// local plain-HTTP listener with no authentication.
pub struct TallyClient {
    base_url: String,
    client: reqwest::Client,
    active_company: Option<String>,
}

impl TallyClient {
    pub fn new(config: &TallyConfig) -> Self {
        let mut client = Self::from_base_url(&format!("http://{}:{}", config.server, config.port));
        client.active_company = config.company.clone().filter(|c| !c.is_empty());
        client
    }

    /// Builds a client against an explicit base URL.
    pub fn from_base_url(base_url: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            active_company: None,
        }
    }

    /// Scopes subsequent exports to the given company.
    pub fn set_active_company(&mut self, company: &str) {
        info!("Active company set to: {}", company);
        self.active_company = Some(company.to_string());
    }

    pub fn active_company(&self) -> Option<&str> {
        self.active_company.as_deref()
    }

    /// Probes the engine with a minimal export request, bounded to ten
    /// seconds. Failures are logged by kind; the caller only sees the bool.
    pub async fn test_connection(&self) -> bool {
        info!("Attempting to connect to the engine at {}...", self.base_url);

        let result = self
            .client
            .post(&self.base_url)
            .timeout(CONNECT_TEST_TIMEOUT)
            .header("Content-Type", "text/xml")
            .body(PING_REQUEST)
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {
                info!("Engine connection successful");
                true
            }
            Ok(response) => {
                warn!("Engine connection returned status {}", response.status());
                false
            }
            Err(e) if e.is_timeout() => {
                error!(
                    "Engine connection timed out; ensure the engine is running at {} with its XML interface enabled",
                    self.base_url
                );
                false
            }
            Err(e) if e.is_connect() => {
                error!("Unable to reach the engine at {}: {}", self.base_url, e);
                false
            }
            Err(e) => {
                error!("Unexpected error probing the engine: {}", e);
                false
            }
        }
    }

    /// Lists the companies loaded in the engine.
    pub async fn list_companies(&self) -> Result<Vec<Company>, TallyError> {
        let body = self.post_xml(COMPANY_LIST_REQUEST.to_string()).await?;
        let companies = parse_companies(&body)?;
        info!("Found {} companies in the engine", companies.len());
        Ok(companies)
    }

    /// Exports one table, returning the raw response body.
    ///
    /// The date pair and the active company are injected into the request
    /// envelope; see [`TableKind::request_body`] for the exact rules.
    pub async fn fetch_table(
        &self,
        kind: TableKind,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<String, TallyError> {
        let request = kind.request_body(from, to, self.active_company.as_deref());
        let body = self.post_xml(request).await?;

        info!(
            "Fetched {} export ({} bytes){}",
            kind.name(),
            body.len(),
            match self.active_company.as_deref() {
                Some(company) => format!(" [company: {}]", company),
                None => String::new(),
            }
        );
        Ok(body)
    }

    async fn post_xml(&self, request: String) -> Result<String, TallyError> {
        let response = self
            .client
            .post(&self.base_url)
            .header("Content-Type", "text/xml")
            .body(request)
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(TallyError::Http {
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(classify_transport_error)
    }
}

fn classify_transport_error(e: reqwest::Error) -> TallyError {
    if e.is_timeout() {
        TallyError::Timeout
    } else if e.is_connect() {
        TallyError::Connect(e.to_string())
    } else {
        TallyError::Protocol(e.to_string())
    }
}
