//! End-to-end publisher tests against a local mock HTTP server

mod support;

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use mockito::Matcher;
use serde_json::{json, Map, Value};
use unicall_core::{
    Completion, Demand, Error, ErrorDelivery, ErrorModel, Method, RequestConfig,
    RequestPublisher,
};

use support::{collect, recorder, silent_server, CountingTransport, Event};

const WAIT: Duration = Duration::from_secs(5);

fn params(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => panic!("expected object"),
    }
}

fn publisher(transport: &Arc<CountingTransport>, url: String) -> RequestPublisher {
    RequestConfig::builder()
        .transport(transport.clone())
        .url(url)
        .build()
        .unwrap()
        .publisher()
}

fn expect_value_then_finished(events: &[Event]) -> Bytes {
    match events {
        [Event::Value(body), Event::Completion(Completion::Finished)] => body.clone(),
        other => panic!("expected value then finished, got {:?}", other),
    }
}

fn expect_failure(events: &[Event]) -> &Error {
    match events {
        [Event::Completion(Completion::Failed(error))] => error,
        other => panic!("expected a single failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_get_success_emits_body_once() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/users")
        .match_header("content-type", "application/json")
        .with_status(200)
        .with_body(r#"[{"id":1}]"#)
        .expect(1)
        .create_async()
        .await;

    let transport = CountingTransport::new();
    let (subscriber, mut rx) = recorder(Some(Demand::max(1)));
    let subscription = publisher(&transport, format!("{}/users", server.url())).subscribe(subscriber);

    let events = collect(&mut rx, WAIT).await;
    assert_eq!(expect_value_then_finished(&events), Bytes::from_static(br#"[{"id":1}]"#));
    assert!(subscription.is_terminated());
    assert_eq!(transport.calls(), 1);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_get_parameters_become_query_string() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/search")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("q".into(), "rust lang".into()),
            Matcher::UrlEncoded("page".into(), "2".into()),
        ]))
        .with_status(200)
        .with_body("ok")
        .create_async()
        .await;

    let transport = CountingTransport::new();
    let body = RequestConfig::builder()
        .transport(transport.clone())
        .url(format!("{}/search", server.url()))
        .parameters(params(json!({"q": "rust lang", "page": 2})))
        .build()
        .unwrap()
        .publisher()
        .value()
        .await
        .unwrap();

    assert_eq!(body, Bytes::from_static(b"ok"));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_post_parameters_become_json_body() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/users")
        .match_header("x-api-key", "secret")
        .match_body(Matcher::Json(json!({"name": "ada", "admin": true})))
        .with_status(201)
        .with_body(r#"{"id":7}"#)
        .create_async()
        .await;

    let transport = CountingTransport::new();
    let created: Value = RequestConfig::builder()
        .transport(transport.clone())
        .url(format!("{}/users", server.url()))
        .method(Method::POST)
        .header("X-Api-Key", "secret")
        .parameters(params(json!({"name": "ada", "admin": true})))
        .build()
        .unwrap()
        .publisher()
        .json()
        .await
        .unwrap();

    assert_eq!(created["id"], 7);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_not_found_with_error_body() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/missing")
        .with_status(404)
        .with_body(r#"{"status":"404","message":"missing"}"#)
        .create_async()
        .await;

    let transport = CountingTransport::new();
    let (subscriber, mut rx) = recorder(Some(Demand::unlimited()));
    publisher(&transport, format!("{}/missing", server.url())).subscribe(subscriber);

    let events = collect(&mut rx, WAIT).await;
    let error = expect_failure(&events);
    assert_eq!(error.model(), Some(&ErrorModel::new(404, "missing")));
}

#[tokio::test]
async fn test_server_error_with_malformed_body() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/boom")
        .with_status(502)
        .with_body("<html>bad gateway</html>")
        .create_async()
        .await;

    let transport = CountingTransport::new();
    let err = publisher(&transport, format!("{}/boom", server.url()))
        .value()
        .await
        .unwrap_err();

    let model = err.model().expect("api error");
    assert_eq!(model.status, 502);
    assert_eq!(model.message, "Response status code was unacceptable: 502.");
}

#[tokio::test]
async fn test_unlisted_status_passes_through() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("PUT", "/items/1")
        .with_status(409)
        .with_body("conflict")
        .create_async()
        .await;

    let transport = CountingTransport::new();
    let body = RequestConfig::builder()
        .transport(transport.clone())
        .url(format!("{}/items/1", server.url()))
        .method(Method::PUT)
        .build()
        .unwrap()
        .publisher()
        .value()
        .await
        .unwrap();

    assert_eq!(body, Bytes::from_static(b"conflict"));
}

#[tokio::test]
async fn test_errors_as_values() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("DELETE", "/items/1")
        .with_status(403)
        .with_body(r#"{"status":"403","message":"forbidden"}"#)
        .create_async()
        .await;

    let transport = CountingTransport::new();
    let (subscriber, mut rx) = recorder(Some(Demand::max(1)));
    RequestConfig::builder()
        .transport(transport.clone())
        .url(format!("{}/items/1", server.url()))
        .method(Method::DELETE)
        .error_delivery(ErrorDelivery::Value)
        .build()
        .unwrap()
        .publisher()
        .subscribe(subscriber);

    let events = collect(&mut rx, WAIT).await;
    let body = expect_value_then_finished(&events);
    assert_eq!(
        ErrorModel::from_bytes(&body).unwrap(),
        ErrorModel::new(403, "forbidden")
    );
}

#[tokio::test]
async fn test_each_subscription_issues_one_call() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/count")
        .with_status(200)
        .with_body("n")
        .expect(3)
        .create_async()
        .await;

    let transport = CountingTransport::new();
    let publisher = publisher(&transport, format!("{}/count", server.url()));
    assert_eq!(transport.calls(), 0);

    for expected in 1..=3 {
        publisher.value().await.unwrap();
        assert_eq!(transport.calls(), expected);
    }
    mock.assert_async().await;
}

#[tokio::test]
async fn test_bad_url_fails_without_transport_call() {
    let transport = CountingTransport::new();
    let (subscriber, mut rx) = recorder(Some(Demand::max(1)));
    let subscription =
        publisher(&transport, "http://exa\u{7}mple.com/path".to_string()).subscribe(subscriber);

    let events = collect(&mut rx, WAIT).await;
    assert!(expect_failure(&events).is_bad_url());
    assert!(subscription.is_terminated());
    assert_eq!(transport.calls(), 0);
}

#[tokio::test]
async fn test_request_timeout_is_soft_failure() {
    let addr = silent_server().await;
    let transport = CountingTransport::new();
    let err = RequestConfig::builder()
        .transport(transport.clone())
        .url(format!("http://{}/slow", addr))
        .request_timeout(Duration::from_millis(200))
        .build()
        .unwrap()
        .publisher()
        .value()
        .await
        .unwrap_err();

    assert_eq!(err.model().map(|m| m.status), Some(-1001));
}

#[tokio::test]
async fn test_cancel_before_completion_emits_nothing() {
    let addr = silent_server().await;
    let transport = CountingTransport::new();
    let (subscriber, mut rx) = recorder(Some(Demand::max(1)));
    let subscription = publisher(&transport, format!("http://{}/hang", addr)).subscribe(subscriber);

    subscription.cancel();
    subscription.cancel();

    let events = collect(&mut rx, Duration::from_millis(300)).await;
    assert!(events.is_empty(), "unexpected events: {:?}", events);
    assert!(subscription.is_terminated());
    assert_eq!(transport.calls(), 1);
}

#[tokio::test]
async fn test_no_demand_no_emission() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/idle")
        .with_status(200)
        .with_body("idle")
        .create_async()
        .await;

    let transport = CountingTransport::new();
    let (subscriber, mut rx) = recorder(None);
    let subscription = publisher(&transport, format!("{}/idle", server.url())).subscribe(subscriber);

    assert!(collect(&mut rx, Duration::from_millis(300)).await.is_empty());
    assert!(!subscription.is_terminated());

    // Late demand still gets the already completed response
    subscription.request(Demand::max(1));
    let events = collect(&mut rx, WAIT).await;
    assert_eq!(expect_value_then_finished(&events), Bytes::from_static(b"idle"));
}
