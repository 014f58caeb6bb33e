//! HttpCallProvider against a local stand-in for the provider API.

mod common;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use common::{job, provider_server, test_config, utc_window, weekday_afternoon, Harness};
use dialer_core::error::DialerError;
use dialer_core::provider::{CallProvider, CallRequest, HttpCallProvider};
use dialer_core::store::EntryStatus;

fn request() -> CallRequest {
    CallRequest {
        assistant_id: "asst-1".into(),
        line_id: "line-1".into(),
        customer_number: "+15550001".into(),
        customer_name: "Ann".into(),
        variables: BTreeMap::from([("greeting".to_string(), "Good morning".to_string())]),
    }
}

#[tokio::test]
async fn create_call_posts_json_and_returns_id() {
    let (url, recorded) = provider_server::start(201, r#"{"id":"call-123","status":"queued"}"#);
    let provider = HttpCallProvider::new(url, Some("secret".into()), Duration::from_secs(5));

    let id = provider.create_call(&request()).await.unwrap();
    assert_eq!(id, "call-123");

    let reqs = recorded.lock().unwrap().clone();
    assert_eq!(reqs.len(), 1);
    assert!(reqs[0].request_line.starts_with("POST /call "));
    assert_eq!(reqs[0].header("authorization"), Some("Bearer secret"));
    assert_eq!(reqs[0].header("content-type"), Some("application/json"));
    let body: serde_json::Value = serde_json::from_str(&reqs[0].body).unwrap();
    assert_eq!(body["assistantId"], "asst-1");
    assert_eq!(body["phoneNumberId"], "line-1");
    assert_eq!(body["customer"]["number"], "+15550001");
    assert_eq!(body["customer"]["name"], "Ann");
    assert_eq!(body["assistantOverrides"]["variableValues"]["greeting"], "Good morning");
}

#[tokio::test]
async fn error_status_maps_to_provider_error() {
    let (url, _) = provider_server::start(500, r#"{"message":"boom"}"#);
    let provider = HttpCallProvider::new(url, None, Duration::from_secs(5));
    let err = provider.create_call(&request()).await.unwrap_err();
    match err {
        DialerError::Provider(msg) => assert!(msg.contains("HTTP 500"), "{msg}"),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn response_without_id_is_an_error() {
    let (url, _) = provider_server::start(200, r#"{"status":"queued"}"#);
    let provider = HttpCallProvider::new(url, None, Duration::from_secs(5));
    let err = provider.create_call(&request()).await.unwrap_err();
    assert!(matches!(err, DialerError::Provider(_)));
}

#[tokio::test]
async fn connection_refused_is_a_provider_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    let provider = HttpCallProvider::new(format!("http://127.0.0.1:{port}"), None, Duration::from_secs(2));
    let err = provider.create_call(&request()).await.unwrap_err();
    assert!(matches!(err, DialerError::Provider(_)));
}

#[tokio::test]
async fn dispatcher_dials_through_http_provider() {
    let (url, recorded) = provider_server::start(201, r#"{"id":"call-77"}"#);
    let provider = Arc::new(HttpCallProvider::new(url, None, Duration::from_secs(5)));
    let h = Harness::new(provider, &test_config(), weekday_afternoon()).await;
    let job_id = h.add_job(&job("http", &["+15550001"], &["line-9"], utc_window())).await;

    assert_eq!(h.dispatcher.tick().await.unwrap().dispatched, 1);
    let entry = h.db().find_entry_by_call_id("call-77").await.unwrap().unwrap();
    assert_eq!(entry.job_id, job_id);
    assert_eq!(entry.status, EntryStatus::Dispatched);
    assert_eq!(entry.line_id.as_deref(), Some("line-9"));
    let body: serde_json::Value = serde_json::from_str(&recorded.lock().unwrap()[0].body).unwrap();
    assert_eq!(body["assistantOverrides"]["variableValues"]["greeting"], "Good afternoon");
}
