// Integration tests for the engine client using wiremock.

use chrono::NaiveDate;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use tally_sync::config::TallyConfig;
use tally_sync::tally::{TableKind, TallyClient, TallyError};

const LEDGER_EXPORT: &str = "<ENVELOPE><BODY><DATA><COLLECTION>\
     <LEDGER><NAME>Cash</NAME></LEDGER>\
     <LEDGER><NAME>Bank</NAME></LEDGER>\
     </COLLECTION></DATA></BODY></ENVELOPE>";

const COMPANY_EXPORT: &str = "<ENVELOPE><BODY><DATA><COLLECTION>\
     <COMPANY><NAME>Acme Ltd</NAME><GUID>abc-123</GUID></COMPANY>\
     <COMPANY><NAME>Beta GmbH</NAME></COMPANY>\
     </COLLECTION></DATA></BODY></ENVELOPE>";

// ── Connectivity ────────────────────────────────────────────────────

#[tokio::test]
async fn test_test_connection_success() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<RESPONSE/>"))
        .mount(&server)
        .await;

    let client = TallyClient::from_base_url(&server.uri());
    assert!(client.test_connection().await);
}

#[tokio::test]
async fn test_test_connection_http_error_is_false() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = TallyClient::from_base_url(&server.uri());
    assert!(!client.test_connection().await);
}

#[tokio::test]
async fn test_test_connection_refused() {
    // Nothing listens on port 1.
    let client = TallyClient::from_base_url("http://127.0.0.1:1");
    assert!(!client.test_connection().await);
}

// ── Collection exports ──────────────────────────────────────────────

#[tokio::test]
async fn test_fetch_table_posts_collection_envelope() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/"))
        .and(header("Content-Type", "text/xml"))
        .and(body_string_contains("<ID>Ledgers</ID>"))
        .respond_with(ResponseTemplate::new(200).set_body_string(LEDGER_EXPORT))
        .mount(&server)
        .await;

    let client = TallyClient::from_base_url(&server.uri());
    let body = client
        .fetch_table(TableKind::Ledgers, None, None)
        .await
        .unwrap();

    assert_eq!(body, LEDGER_EXPORT);
}

#[tokio::test]
async fn test_fetch_table_http_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let client = TallyClient::from_base_url(&server.uri());
    let result = client.fetch_table(TableKind::Ledgers, None, None).await;

    assert!(matches!(result, Err(TallyError::Http { status: 503 })));
}

#[tokio::test]
async fn test_configured_company_is_injected() {
    let server = MockServer::start().await;
    // Only a request carrying the company variable matches; anything
    // else falls through to wiremock's 404.
    Mock::given(method("POST"))
        .and(body_string_contains(
            "<SVCURRENTCOMPANY>Acme Ltd</SVCURRENTCOMPANY>",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_string("<ENVELOPE/>"))
        .mount(&server)
        .await;

    let config = TallyConfig {
        server: "127.0.0.1".to_string(),
        port: server.address().port(),
        company: Some("Acme Ltd".to_string()),
    };
    let client = TallyClient::new(&config);

    client
        .fetch_table(TableKind::Units, None, None)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_set_active_company_scopes_requests() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_string_contains(
            "<SVCURRENTCOMPANY>Beta GmbH</SVCURRENTCOMPANY>",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_string("<ENVELOPE/>"))
        .mount(&server)
        .await;

    let mut client = TallyClient::from_base_url(&server.uri());
    assert_eq!(client.active_company(), None);

    client.set_active_company("Beta GmbH");
    assert_eq!(client.active_company(), Some("Beta GmbH"));

    client
        .fetch_table(TableKind::Groups, None, None)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_date_window_filters_vouchers() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_string_contains("<SVFROMDATE>20240401</SVFROMDATE>"))
        .and(body_string_contains("<SVTODATE>20240430</SVTODATE>"))
        .and(body_string_contains("<FILTER>DateFilter</FILTER>"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<ENVELOPE/>"))
        .mount(&server)
        .await;

    let from = NaiveDate::from_ymd_opt(2024, 4, 1).unwrap();
    let to = NaiveDate::from_ymd_opt(2024, 4, 30).unwrap();

    let client = TallyClient::from_base_url(&server.uri());
    client
        .fetch_table(TableKind::Vouchers, Some(from), Some(to))
        .await
        .unwrap();
}

// ── Company listing ─────────────────────────────────────────────────

#[tokio::test]
async fn test_list_companies() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_string_contains("<ID>ListOfCompanies</ID>"))
        .respond_with(ResponseTemplate::new(200).set_body_string(COMPANY_EXPORT))
        .mount(&server)
        .await;

    let client = TallyClient::from_base_url(&server.uri());
    let companies = client.list_companies().await.unwrap();

    assert_eq!(companies.len(), 2);
    assert_eq!(companies[0].name, "Acme Ltd");
    assert_eq!(companies[0].guid, "abc-123");
    assert_eq!(companies[1].name, "Beta GmbH");
    assert_eq!(companies[1].guid, "");
}

#[tokio::test]
async fn test_list_companies_malformed_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("<ENVELOPE><COMPANY><NAME>Broken</WRONG>"),
        )
        .mount(&server)
        .await;

    let client = TallyClient::from_base_url(&server.uri());
    let result = client.list_companies().await;

    assert!(matches!(result, Err(TallyError::Protocol(_))));
}
