// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use mpncrawl::config::settings::LookupSettings;
use mpncrawl::domain::models::product::ProductRecord;
use mpncrawl::domain::services::part_lookup::{LookupError, PartLookup};
use mpncrawl::infrastructure::lookup::http_lookup::HttpPartLookup;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer, api_key: Option<&str>) -> HttpPartLookup {
    client_for(server.uri(), api_key)
}

fn client_for(base_url: String, api_key: Option<&str>) -> HttpPartLookup {
    HttpPartLookup::new(
        &LookupSettings {
            base_url,
            api_key: api_key.map(str::to_string),
        },
        Duration::from_secs(2),
    )
    .unwrap()
}

async fn respond_with(status: u16) -> Result<Option<ProductRecord>, LookupError> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/parts/LM358"))
        .respond_with(ResponseTemplate::new(status))
        .mount(&server)
        .await;
    client(&server, None).lookup("LM358", "USD").await
}

#[tokio::test]
async fn test_found_part_is_decoded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/parts/LM358"))
        .and(query_param("currency", "EUR"))
        .and(header("authorization", "Bearer secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "mpn": "LM358",
            "url": "https://parts.example.com/LM358",
            "brand": "Texas Instruments",
            "distributors": [{
                "name": "Mouser",
                "sku": "595-LM358P",
                "stock": 5000,
                "min": 1,
                "pkg": "Tube",
                "currency": "EUR",
                "prices": { "1": 0.48, "10": 0.41 },
                "updated": "2025-03-01"
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let record = client(&server, Some("secret"))
        .lookup("LM358", "EUR")
        .await
        .unwrap()
        .unwrap();

    assert_eq!(record.mpn, "LM358");
    assert_eq!(record.brand.as_deref(), Some("Texas Instruments"));
    assert_eq!(record.distributors.len(), 1);
    assert_eq!(record.distributors[0].price_at("10"), Some(0.41));
}

#[tokio::test]
async fn test_not_found_is_not_an_error() {
    assert_eq!(respond_with(404).await, Ok(None));
}

#[tokio::test]
async fn test_throttling_and_server_errors_are_transient() {
    for status in [408, 429, 500, 503] {
        let result = respond_with(status).await;
        assert!(
            matches!(result, Err(LookupError::Transient(_))),
            "status {} gave {:?}",
            status,
            result
        );
    }
}

#[tokio::test]
async fn test_client_errors_are_fatal() {
    for status in [400, 401, 422] {
        let result = respond_with(status).await;
        assert!(
            matches!(result, Err(LookupError::Fatal(_))),
            "status {} gave {:?}",
            status,
            result
        );
    }
}

#[tokio::test]
async fn test_undecodable_body_is_fatal() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/parts/LM358"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>captcha</html>"))
        .mount(&server)
        .await;

    let result = client(&server, None).lookup("LM358", "USD").await;
    assert!(matches!(result, Err(LookupError::Fatal(_))));
}

#[tokio::test]
async fn test_identifier_is_path_encoded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/parts/AB%2FC"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let result = client(&server, None).lookup("AB/C", "USD").await;
    assert_eq!(result, Ok(None));
}

#[tokio::test]
async fn test_unreachable_source_is_transient() {
    // Bind then release a port so nothing is listening on it
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    let lookup = client_for(format!("http://127.0.0.1:{}", port), None);

    let result = lookup.lookup("LM358", "USD").await;
    assert!(matches!(result, Err(LookupError::Transient(_))));
}
