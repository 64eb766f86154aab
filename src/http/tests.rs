//! Tests for the HTTP client module

use super::*;
use crate::auth::AuthConfig;
use crate::error::Error;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const API: &str = "/slm/webservice/v2.0";

fn config_for(server: &MockServer) -> HttpClientConfig {
    HttpClientConfig::builder().server(server.uri()).build()
}

#[test]
fn test_http_client_config_default() {
    let config = HttpClientConfig::default();
    assert_eq!(config.timeout, Duration::from_secs(30));
    assert_eq!(config.server, "https://rally1.rallydev.com");
    assert_eq!(config.api_base(), "https://rally1.rallydev.com/slm/webservice/v2.0");
}

#[test]
fn test_http_client_config_builder() {
    let config = HttpClientConfig::builder()
        .server("https://example.com/")
        .api_path("/api/")
        .api_version("v3")
        .timeout(Duration::from_secs(60))
        .header("X-Custom", "value")
        .user_agent("test-agent/1.0")
        .build();

    assert_eq!(config.api_base(), "https://example.com/api/v3");
    assert_eq!(config.timeout, Duration::from_secs(60));
    assert_eq!(
        config.default_headers.get("X-Custom"),
        Some(&"value".to_string())
    );
    assert_eq!(config.user_agent, "test-agent/1.0");
}

#[test]
fn test_request_config_builder() {
    let config = RequestConfig::new()
        .query("start", "1")
        .queries([("pagesize", "10")])
        .header("X-Request-Id", "abc123")
        .json(json!({"key": "value"}))
        .timeout(Duration::from_secs(10));

    assert_eq!(
        config.query,
        vec![
            ("start".to_string(), "1".to_string()),
            ("pagesize".to_string(), "10".to_string())
        ]
    );
    assert_eq!(
        config.headers.get("X-Request-Id"),
        Some(&"abc123".to_string())
    );
    assert!(config.body.is_some());
    assert_eq!(config.timeout, Some(Duration::from_secs(10)));
}

#[test]
fn test_build_url() {
    let client = HttpClient::with_config(HttpClientConfig::default()).unwrap();
    assert_eq!(
        client.build_url("/defect/1234"),
        "https://rally1.rallydev.com/slm/webservice/v2.0/defect/1234"
    );
    assert_eq!(
        client.build_url("defect"),
        "https://rally1.rallydev.com/slm/webservice/v2.0/defect"
    );
    assert_eq!(
        client.build_url("/slm/webservice/v2.0/defect/1234"),
        "https://rally1.rallydev.com/slm/webservice/v2.0/defect/1234"
    );
    assert_eq!(
        client.build_url("https://other.example.com/slm/webservice/v2.0/defect/1"),
        "https://other.example.com/slm/webservice/v2.0/defect/1"
    );
}

#[test]
fn test_unwrap_envelope() {
    let inner = unwrap_envelope(json!({
        "QueryResult": {"Results": [], "Errors": [], "Warnings": ["old"]}
    }))
    .unwrap();
    assert!(inner["Results"].is_array());
    // Warnings stay in the body for the pager to report
    assert_eq!(inner["Warnings"], json!(["old"]));

    let err = unwrap_envelope(json!({
        "CreateResult": {"Errors": ["Validation error: Name is required"]}
    }))
    .unwrap_err();
    assert_eq!(err.messages(), vec!["Validation error: Name is required"]);

    // Bodies without a result wrapper pass through
    let raw = unwrap_envelope(json!({"a": 1, "b": 2})).unwrap();
    assert_eq!(raw, json!({"a": 1, "b": 2}));
}

#[test]
fn test_unwrap_envelope_only_strips_result_wrappers() {
    let bare = json!({"Results": [{"ObjectID": 1}]});
    assert_eq!(unwrap_envelope(bare.clone()).unwrap(), bare);

    let object = json!({"Defect": {"Name": "Broken"}});
    assert_eq!(unwrap_envelope(object.clone()).unwrap(), object);

    for wrapper in RESULT_WRAPPERS {
        let inner = unwrap_envelope(json!({ wrapper: {"TotalResultCount": 1} })).unwrap();
        assert_eq!(inner, json!({"TotalResultCount": 1}));
    }
}

#[tokio::test]
async fn test_http_client_get() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("{API}/defect/1")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Defect": {"_ref": "/defect/1", "Name": "Broken"}
        })))
        .mount(&mock_server)
        .await;

    let client = HttpClient::with_config(config_for(&mock_server)).unwrap();
    let body = client.get("/defect/1", RequestConfig::new()).await.unwrap();

    // Only result wrappers are stripped; object-type keys are left to the caller
    assert_eq!(body["Defect"]["Name"], "Broken");
}

#[tokio::test]
async fn test_http_client_query_params() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("{API}/defect")))
        .and(query_param("start", "201"))
        .and(query_param("pagesize", "200"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "QueryResult": {"Results": [], "TotalResultCount": 0}
        })))
        .mount(&mock_server)
        .await;

    let client = HttpClient::with_config(config_for(&mock_server)).unwrap();
    let body = client
        .get(
            "defect",
            RequestConfig::new().query("start", "201").query("pagesize", "200"),
        )
        .await
        .unwrap();

    assert_eq!(body["TotalResultCount"], 0);
}

#[tokio::test]
async fn test_http_client_default_and_request_headers() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("{API}/defect")))
        .and(header("X-Integration", "pager"))
        .and(header("X-Request-Id", "req-456"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"QueryResult": {}})))
        .mount(&mock_server)
        .await;

    let config = HttpClientConfig::builder()
        .server(mock_server.uri())
        .header("X-Integration", "pager")
        .build();

    let client = HttpClient::with_config(config).unwrap();
    client
        .get("defect", RequestConfig::new().header("X-Request-Id", "req-456"))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_http_client_404_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("{API}/defect/9")))
        .respond_with(ResponseTemplate::new(404).set_body_string("Not found"))
        .mount(&mock_server)
        .await;

    let client = HttpClient::with_config(config_for(&mock_server)).unwrap();
    let err = client.get("/defect/9", RequestConfig::new()).await.unwrap_err();

    assert!(matches!(err, Error::HttpStatus { status: 404, .. }));
}

#[tokio::test]
async fn test_http_client_does_not_retry_500() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("{API}/defect")))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = HttpClient::with_config(config_for(&mock_server)).unwrap();
    let err = client.get("defect", RequestConfig::new()).await.unwrap_err();

    assert!(matches!(err, Error::HttpStatus { status: 500, .. }));
}

#[tokio::test]
async fn test_http_client_server_errors() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("{API}/defect")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "QueryResult": {"Errors": ["Could not parse: bad query"], "Results": []}
        })))
        .mount(&mock_server)
        .await;

    let client = HttpClient::with_config(config_for(&mock_server)).unwrap();
    let err = client.get("defect", RequestConfig::new()).await.unwrap_err();

    assert_eq!(err.messages(), vec!["Could not parse: bad query"]);
}

#[tokio::test]
async fn test_http_client_timeout() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("{API}/slow")))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"QueryResult": {}}))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&mock_server)
        .await;

    let client = HttpClient::with_config(config_for(&mock_server)).unwrap();
    let err = client
        .get("slow", RequestConfig::new().timeout(Duration::from_millis(50)))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Timeout { timeout_ms: 50 }));
}

#[tokio::test]
async fn test_api_key_write_has_no_security_token() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(format!("{API}/defect/create")))
        .and(header("ZSESSIONID", "_key"))
        .and(body_json(json!({"defect": {"Name": "New"}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "CreateResult": {"Object": {"_ref": "/defect/5"}, "Errors": []}
        })))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("{API}/security/authorize")))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let client =
        HttpClient::with_auth(config_for(&mock_server), AuthConfig::api_key("_key")).unwrap();
    let body = client
        .post(
            "/defect/create",
            json!({"defect": {"Name": "New"}}),
            RequestConfig::new(),
        )
        .await
        .unwrap();

    assert_eq!(body["Object"]["_ref"], "/defect/5");
}

#[tokio::test]
async fn test_basic_auth_write_sends_security_token() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("{API}/security/authorize")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "OperationResult": {"SecurityToken": "tok-1", "Errors": []}
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("DELETE"))
        .and(path(format!("{API}/defect/5")))
        .and(query_param("key", "tok-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "OperationResult": {"Errors": [], "Warnings": []}
        })))
        .expect(2)
        .mount(&mock_server)
        .await;

    let client =
        HttpClient::with_auth(config_for(&mock_server), AuthConfig::basic("u", "p")).unwrap();
    client.delete("/defect/5", RequestConfig::new()).await.unwrap();
    client.delete("/defect/5", RequestConfig::new()).await.unwrap();
}

#[tokio::test]
async fn test_rejected_security_token_is_renewed_once() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("{API}/security/authorize")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "OperationResult": {"SecurityToken": "stale", "Errors": []}
        })))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("{API}/security/authorize")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "OperationResult": {"SecurityToken": "fresh", "Errors": []}
        })))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path(format!("{API}/defect/5")))
        .and(query_param("key", "stale"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "OperationResult": {"Errors": ["Not authorized to perform action: Invalid key"]}
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path(format!("{API}/defect/5")))
        .and(query_param("key", "fresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "OperationResult": {"Object": {"Name": "Renamed"}, "Errors": []}
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client =
        HttpClient::with_auth(config_for(&mock_server), AuthConfig::basic("u", "p")).unwrap();
    let body = client
        .post("/defect/5", json!({"defect": {"Name": "Renamed"}}), RequestConfig::new())
        .await
        .unwrap();

    assert_eq!(body["Object"]["Name"], "Renamed");
}
