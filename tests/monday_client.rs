use serde_json::{json, Value};
use wiremock::matchers::{body_partial_json, body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use skylark_bi::app::ports::BoardSourcePort;
use skylark_bi::config::MondayConfig;
use skylark_bi::error::AnalystError;
use skylark_bi::infra::monday_client::MondayClient;
use skylark_bi::pipeline::processing::normalize::RawValue;

fn test_client(mock_server: &MockServer, page_limit: u32, max_items: usize) -> MondayClient {
    let config = MondayConfig {
        api_url: mock_server.uri(),
        page_limit,
        max_items,
        timeout_seconds: 5,
        api_token: Some("test-token".to_string()),
        ..MondayConfig::default()
    };
    MondayClient::new(&config).unwrap()
}

fn item(name: &str, value: &str) -> Value {
    json!({"name": name, "column_values": [{"id": "numbers", "text": value}]})
}

fn first_page(cursor: Option<&str>, items: Vec<Value>) -> Value {
    json!({
        "data": {
            "boards": [{
                "name": "Deals",
                "columns": [
                    {"id": "name", "title": "Name"},
                    {"id": "numbers", "title": "Deal Value"}
                ],
                "items_page": {"cursor": cursor, "items": items}
            }]
        }
    })
}

fn next_page(cursor: Option<&str>, items: Vec<Value>) -> Value {
    json!({"data": {"next_items_page": {"cursor": cursor, "items": items}}})
}

#[tokio::test]
async fn fetch_board_follows_cursor_until_exhausted() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/"))
        .and(body_string_contains("boards"))
        .and(body_partial_json(json!({"variables": {"ids": ["42"], "limit": 2}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(first_page(
            Some("c1"),
            vec![item("Acme", "$100"), item("Globex", "$200")],
        )))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(body_string_contains("next_items_page"))
        .and(body_partial_json(json!({"variables": {"cursor": "c1"}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(next_page(
            Some("c2"),
            vec![item("Initech", "$300"), item("Umbrella", "$400")],
        )))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(body_string_contains("next_items_page"))
        .and(body_partial_json(json!({"variables": {"cursor": "c2"}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(next_page(None, vec![item("Hooli", "$500")])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server, 2, 100);
    let board = client.fetch_board("42").await.unwrap();

    assert_eq!(board.board_id, "42");
    assert_eq!(board.name.as_deref(), Some("Deals"));
    assert_eq!(board.columns, vec!["Item Name", "Deal Value"]);
    assert_eq!(board.rows.len(), 5);
    assert_eq!(board.rows[4].get("Item Name"), Some(&RawValue::Text("Hooli".to_string())));
    assert_eq!(board.rows[4].get("Deal Value"), Some(&RawValue::Text("$500".to_string())));
}

#[tokio::test]
async fn fetch_board_stops_at_max_items() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_string_contains("boards"))
        .respond_with(ResponseTemplate::new(200).set_body_json(first_page(
            Some("c1"),
            vec![item("Acme", "1"), item("Globex", "2"), item("Initech", "3")],
        )))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(body_string_contains("next_items_page"))
        .respond_with(ResponseTemplate::new(200).set_body_json(next_page(None, vec![item("Hooli", "4")])))
        .expect(0)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server, 3, 2);
    let board = client.fetch_board("42").await.unwrap();

    assert_eq!(board.rows.len(), 2);
    assert_eq!(board.rows[1].get("Item Name"), Some(&RawValue::Text("Globex".to_string())));
}

#[tokio::test]
async fn fetch_board_maps_server_error_status() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("<html>Internal Server Error</html>"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server, 500, 100);
    let err = client.fetch_board("42").await.unwrap_err();

    match err {
        AnalystError::Api { message } => assert!(message.starts_with("HTTP 500"), "{}", message),
        other => panic!("expected Api error, got {:?}", other),
    }
}

#[tokio::test]
async fn fetch_board_surfaces_graphql_error_on_error_status() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "errors": [{"message": "Not Authenticated"}]
        })))
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server, 500, 100);
    let err = client.fetch_board("42").await.unwrap_err();

    assert!(matches!(err, AnalystError::Api { ref message } if message == "Not Authenticated"));
}

#[tokio::test]
async fn fetch_board_sends_auth_and_version_headers() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(header("authorization", "test-token"))
        .and(header("api-version", "2023-10"))
        .and(header("content-type", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(first_page(None, vec![item("Acme", "$1")])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server, 500, 100);
    let board = client.fetch_board("42").await.unwrap();

    assert_eq!(board.rows.len(), 1);
}
