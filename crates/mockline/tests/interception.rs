use assert_matches::assert_matches;
use futures::FutureExt;
use mockline::{init_test_logging, ErrorDescriptor, MockError, MockTransport, ResponseDescriptor};
use mockline_http::{ErrorCode, HttpClient, HttpResult, Response};
use regex::Regex;
use serde_json::{json, Value};
use serial_test::serial;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

fn user_fred() -> Value {
    json!({
        "id": 12345,
        "firstName": "Fred",
        "lastName": "Flintstone"
    })
}

fn spawn_get(client: &HttpClient, url: &'static str) -> JoinHandle<HttpResult<Response>> {
    let client = client.clone();
    tokio::spawn(async move { client.get(url).await })
}

fn installed() -> (HttpClient, MockTransport) {
    init_test_logging();
    let client = HttpClient::new();
    let mock = MockTransport::new();
    mock.install_on(&client).expect("fresh transport installs");
    (client, mock)
}

#[test]
#[serial]
fn install_replaces_global_adapter() {
    init_test_logging();
    let default_adapter = HttpClient::global().adapter();
    let mock = MockTransport::new();

    mock.install().expect("install succeeds");
    assert!(!Arc::ptr_eq(&HttpClient::global().adapter(), &default_adapter));

    mock.uninstall();
    assert!(Arc::ptr_eq(&HttpClient::global().adapter(), &default_adapter));
}

#[test]
#[serial]
fn install_twice_fails_and_keeps_session() {
    init_test_logging();
    let mock = MockTransport::new();
    mock.install().expect("install succeeds");
    mock.stub_request("GET", "/kept", ResponseDescriptor::new(200));

    assert_matches!(mock.install(), Err(MockError::AlreadyInstalled { .. }));
    assert_eq!(mock.stubs().count(), 1);
    assert_eq!(HttpClient::global().adapter().name(), "mock");

    mock.uninstall();
    assert_eq!(HttpClient::global().adapter().name(), "network");
}

#[tokio::test(start_paused = true)]
async fn intercepts_requests() {
    let (client, mock) = installed();
    let _pending = spawn_get(&client, "/users/12345");

    mock.wait().await;
    let request = mock.requests().most_recent().expect("request tracked");
    assert_eq!(mock.requests().count(), 1);
    assert_eq!(request.url(), "/users/12345");
    assert_eq!(request.method().as_str(), "GET");
    assert!(!request.is_settled());
}

#[tokio::test(start_paused = true)]
async fn responds_to_pending_request() {
    let (client, mock) = installed();
    let pending = spawn_get(&client, "/users/12345");

    mock.wait().await;
    let request = mock.requests().most_recent().expect("request tracked");
    request
        .respond_with(ResponseDescriptor::new(200).with_body(user_fred()))
        .await
        .expect("first settlement succeeds");

    assert!(pending.is_finished());
    let response = pending.await.unwrap().expect("2xx resolves");
    assert_eq!(response.status, 200);
    assert_eq!(response.status_text, "OK");
    assert_eq!(response.data, user_fred());
}

#[tokio::test(start_paused = true)]
async fn rejects_on_error_status() {
    let (client, mock) = installed();
    let pending = spawn_get(&client, "/users/12346");

    mock.wait().await;
    let request = mock.requests().most_recent().expect("request tracked");
    let delivered = request
        .respond_with(ResponseDescriptor::new(404))
        .await
        .expect("first settlement succeeds");
    assert_eq!(delivered.status, 404);

    let err = pending.await.unwrap().expect_err("4xx rejects");
    assert_eq!(err.status(), Some(404));
    assert_eq!(err.code, ErrorCode::BadRequest);
    assert_eq!(err.message, "Request failed with status code 404");
}

#[tokio::test(start_paused = true)]
async fn settles_only_once() {
    let (client, mock) = installed();
    let pending = spawn_get(&client, "/users/12345");

    mock.wait().await;
    let request = mock.requests().most_recent().expect("request tracked");
    request
        .respond_with(ResponseDescriptor::new(200))
        .await
        .expect("first settlement succeeds");

    assert_matches!(
        request.respond_with(ResponseDescriptor::new(500)).await,
        Err(MockError::AlreadySettled { sequence: 0, .. })
    );
    assert_matches!(request.respond_with_timeout().await, Err(MockError::AlreadySettled { .. }));
    assert_eq!(pending.await.unwrap().unwrap().status, 200);
}

#[tokio::test(start_paused = true)]
async fn responds_with_arbitrary_error() {
    let (client, mock) = installed();
    let pending = spawn_get(&client, "/users/12345");

    mock.wait().await;
    let request = mock.requests().most_recent().expect("request tracked");
    request
        .respond_with_error(ErrorDescriptor::new("ERR_NETWORK", "Network Error"))
        .expect("first settlement succeeds");

    let err = pending.await.unwrap().expect_err("error settles as rejection");
    assert_eq!(err.code, ErrorCode::Network);
    assert_eq!(err.message, "Network Error");
    assert!(err.response.is_none());
}

#[tokio::test(start_paused = true)]
#[serial]
async fn with_mock_scopes_global_interception() {
    init_test_logging();
    let default_adapter = HttpClient::global().adapter();
    let mock = MockTransport::new();

    let status = mock
        .with_mock(|| async {
            assert_eq!(HttpClient::global().adapter().name(), "mock");
            let pending = tokio::spawn(HttpClient::global().get("/users/12345"));

            mock.wait().await;
            let request = mock.requests().most_recent().expect("request tracked");
            request
                .respond_with(ResponseDescriptor::new(200).with_body(user_fred()))
                .await
                .expect("first settlement succeeds");
            pending.await.unwrap().expect("2xx resolves").status
        })
        .await
        .expect("not installed before");

    assert_eq!(status, 200);
    assert!(!mock.is_installed());
    assert!(Arc::ptr_eq(&HttpClient::global().adapter(), &default_adapter));
}

#[tokio::test(start_paused = true)]
#[serial]
async fn with_mock_times_out_request() {
    init_test_logging();
    let mock = MockTransport::new();

    let err = mock
        .with_mock(|| async {
            let pending = tokio::spawn(HttpClient::global().get("/users/12345"));

            mock.wait().await;
            let request = mock.requests().most_recent().expect("request tracked");
            let delivered = request
                .respond_with_timeout()
                .await
                .expect("first settlement succeeds");
            assert_eq!(delivered.code.as_str(), "ECONNABORTED");
            pending.await.unwrap().expect_err("timeout rejects")
        })
        .await
        .expect("not installed before");

    assert!(err.is_timeout());
    assert_eq!(err.message, "timeout of 0ms exceeded");
}

#[tokio::test(start_paused = true)]
async fn manual_timeout_never_fires_early() {
    let (client, mock) = installed();
    let pending = spawn_get(&client, "/users/12345");

    mock.wait().await;
    let request = mock.requests().most_recent().expect("request tracked");
    let early = mock.delay() - Duration::from_millis(1);

    // Give up on the responder before the delay ends; the rejection still lands.
    let responder = tokio::time::timeout(early, request.respond_with_timeout()).await;
    assert!(responder.is_err());
    assert!(request.is_settled());
    assert!(!pending.is_finished());

    let err = pending.await.unwrap().expect_err("timeout rejects");
    assert_eq!(err.code.as_str(), "ECONNABORTED");
    assert!(request.respond_with(ResponseDescriptor::new(200)).await.is_err());
}

#[test]
fn second_transport_on_same_client_is_rejected() {
    init_test_logging();
    let client = HttpClient::new();
    let default_adapter = client.adapter();
    let first = MockTransport::new();
    let second = MockTransport::new();

    first.install_on(&client).expect("first install succeeds");
    assert_matches!(
        second.install_on(&client),
        Err(MockError::AlreadyInstalled { client: id }) if id == client.id()
    );

    first.uninstall();
    second.uninstall();
    assert!(Arc::ptr_eq(&client.adapter(), &default_adapter));
}

#[tokio::test(start_paused = true)]
async fn with_mock_restores_adapter_on_panic() {
    init_test_logging();
    let client = HttpClient::new();
    let default_adapter = client.adapter();
    let mock = MockTransport::new();

    let outcome = AssertUnwindSafe(mock.with_mock_on(&client, || async {
        panic!("test body failed");
    }))
    .catch_unwind()
    .await;

    assert!(outcome.is_err());
    assert!(!mock.is_installed());
    assert!(Arc::ptr_eq(&client.adapter(), &default_adapter));
}

#[tokio::test(start_paused = true)]
async fn with_mock_waits_for_trailing_settlements() {
    init_test_logging();
    let client = HttpClient::new();
    let mock = MockTransport::new();
    mock.set_delay(Duration::from_millis(40));

    let start = tokio::time::Instant::now();
    mock.with_mock_on(&client, || async {}).await.unwrap();
    assert!(start.elapsed() >= Duration::from_millis(40));
}

#[tokio::test(start_paused = true)]
async fn records_timestamp() {
    let (client, mock) = installed();
    let _pending = spawn_get(&client, "/users/12345");

    mock.wait().await;
    let request = mock.requests().most_recent().expect("request tracked");
    let diff = chrono::Utc::now() - request.timestamp();
    assert!(diff.num_milliseconds() >= 0);
    assert!(diff.num_milliseconds() <= 1000);
}

#[tokio::test(start_paused = true)]
async fn debug_output_is_timestamped() {
    let (client, mock) = installed();
    let _a = spawn_get(&client, "/users/12345");
    let _b = spawn_get(&client, "/users/12346");
    let _c = tokio::spawn({
        let client = client.clone();
        async move { client.delete("/users/12345").await }
    });

    mock.wait().await;
    let lines = mock.requests().debug();
    assert_eq!(lines.len(), 3);

    let prefix = Regex::new(r"^\d\d:\d\d\.\d{1,3} ").unwrap();
    assert!(lines.iter().all(|line| prefix.is_match(line)));
    assert!(lines[2].ends_with("DELETE /users/12345"));
}

#[tokio::test(start_paused = true)]
async fn ledger_preserves_issue_order() {
    let (client, mock) = installed();
    for url in ["/a", "/b", "/c"] {
        let _ = spawn_get(&client, url);
        tokio::task::yield_now().await;
    }

    mock.wait().await;
    let requests = mock.requests();
    assert_eq!(requests.first().unwrap().url(), "/a");
    assert_eq!(requests.at(1).unwrap().url(), "/b");
    assert_eq!(requests.most_recent().unwrap().url(), "/c");
    assert!(requests.at(3).is_none());
}

#[tokio::test(start_paused = true)]
async fn uninstall_forgets_requests() {
    let (client, mock) = installed();
    let _pending = spawn_get(&client, "/users/12345");

    mock.wait().await;
    assert_eq!(mock.requests().count(), 1);

    mock.uninstall();
    assert!(mock.requests().is_empty());
    assert!(mock.requests().most_recent().is_none());
}
