//! HTTP transport tests against a local mock server.

use pacer_client::*;
use serde::Deserialize;
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Debug, Clone, PartialEq, Deserialize)]
struct User {
    id: u64,
    name: String,
}

fn transport(server: &MockServer) -> HttpTransport {
    HttpTransport::new(
        HttpTransportConfig::builder()
            .base_url(server.uri())
            .default_header("x-api-version", "2")
            .build(),
    )
    .unwrap()
}

fn runtime<T: Transport + 'static>(transport: T, retry: RetryConfig) -> InvocationRuntime {
    InvocationRuntime::builder()
        .transport(transport)
        .rate(RateControllerConfig::new(1000.0, 1.0))
        .retry(retry)
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_success_decodes_json() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/7"))
        .and(header("x-api-version", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"id":7,"name":"ada"}"#))
        .expect(1)
        .mount(&server)
        .await;

    let runtime = runtime(transport(&server), RetryConfig::disabled());
    let outcome = runtime
        .call_json::<User>(&RequestSpec::get("/users/7"))
        .await
        .unwrap();

    assert_eq!(outcome.status(), Status::Success);
    assert_eq!(outcome.entity().map(|u| u.name.as_str()), Some("ada"));
    assert_eq!(runtime.current_rate(), 1000.0);
}

#[tokio::test]
async fn test_statuses_are_classified() {
    let server = MockServer::start().await;
    Mock::given(path("/denied"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;
    Mock::given(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(path("/invalid"))
        .respond_with(
            ResponseTemplate::new(422)
                .insert_header(VALIDATION_EXCEPTION_HEADER, "true")
                .set_body_string("name is required"),
        )
        .mount(&server)
        .await;
    Mock::given(path("/created"))
        .respond_with(ResponseTemplate::new(201))
        .mount(&server)
        .await;

    let runtime = runtime(transport(&server), RetryConfig::disabled());
    let status = |outcome: Outcome<String>| outcome.status();

    let denied = runtime.call_text(&RequestSpec::get("/denied")).await.unwrap();
    assert_eq!(status(denied), Status::Denied);

    let missing = runtime.call_text(&RequestSpec::get("/missing")).await.unwrap();
    assert_eq!(status(missing), Status::NotFound);

    let invalid = runtime
        .call_text(&RequestSpec::post("/invalid"))
        .await
        .unwrap();
    assert_eq!(invalid.status(), Status::Invalid);
    assert_eq!(
        invalid.errors(),
        Some("POST /invalid: 422 Unprocessable Entity name is required")
    );

    let created = runtime.call_text(&RequestSpec::put("/created")).await.unwrap();
    assert_eq!(created.status(), Status::Error);
    assert!(created.errors().unwrap().contains("201"));
}

#[tokio::test]
async fn test_raised_service_unavailable_is_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&server)
        .await;

    let transport = HttpTransport::new(
        HttpTransportConfig::builder()
            .base_url(server.uri())
            .raise_transient_status(true)
            .build(),
    )
    .unwrap();
    let runtime = runtime(transport, RetryConfig::fixed(Duration::from_millis(10)));

    let outcome = runtime.call_text(&RequestSpec::get("/flaky")).await.unwrap();
    assert_eq!(outcome.into_entity().as_deref(), Some("ok"));
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
    assert_eq!(runtime.rate_controller().snapshot().permits_granted, 3);
}

#[tokio::test]
async fn test_unraised_service_unavailable_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(path("/busy"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let runtime = runtime(transport(&server), RetryConfig::fixed(Duration::from_millis(10)));
    let outcome = runtime.call(&RequestSpec::get("/busy")).await.unwrap();

    assert_eq!(outcome.status(), Status::Error);
    assert_eq!(runtime.current_rate(), 500.0);
}

#[tokio::test]
async fn test_timeout_is_io_error() {
    let server = MockServer::start().await;
    Mock::given(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    let transport = HttpTransport::new(
        HttpTransportConfig::builder()
            .base_url(server.uri())
            .timeout(Duration::from_millis(100))
            .build(),
    )
    .unwrap();
    let runtime = runtime(transport, RetryConfig::disabled());

    let outcome = runtime.call(&RequestSpec::get("/slow")).await.unwrap();
    assert_eq!(outcome.status(), Status::Error);
    assert!(outcome.cause().is_some());
}

#[tokio::test]
async fn test_refused_connection_is_transient() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let address = listener.local_addr().unwrap();
    drop(listener);

    let transport = HttpTransport::new(
        HttpTransportConfig::builder()
            .base_url(format!("http://{address}"))
            .build(),
    )
    .unwrap();
    let runtime = runtime(transport, RetryConfig::disabled());

    let err = runtime.call(&RequestSpec::get("/")).await.unwrap_err();
    assert!(err.is_transient());
    assert!(matches!(
        err.transport_error(),
        Some(TransportError::ConnectionReset(_))
    ));
}

#[tokio::test]
async fn test_read_through_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"id":1,"name":"ada"}"#))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/users/2"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let runtime = runtime(transport(&server), RetryConfig::disabled());
    let loader = runtime.json_loader::<u64, User, _>(|id| RequestSpec::get(format!("/users/{id}")));
    let users = runtime.read_through(loader, CacheConfig::default()).unwrap();

    for _ in 0..3 {
        assert_eq!(
            users.get(&1).await,
            Lookup::Found(User {
                id: 1,
                name: "ada".to_string()
            })
        );
    }
    assert_eq!(users.get(&2).await, Lookup::NotFound);
    assert_eq!(users.get(&2).await, Lookup::NotFound);
    assert_eq!(users.stats().hits, 3);
}

fn raising_not_found(server: &MockServer) -> HttpTransport {
    HttpTransport::new(
        HttpTransportConfig::builder()
            .base_url(server.uri())
            .raise_not_found(true)
            .build(),
    )
    .unwrap()
}

#[tokio::test]
async fn test_raised_not_found_is_absent_by_default() {
    let server = MockServer::start().await;
    Mock::given(path("/media/M1"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let runtime = runtime(raising_not_found(&server), RetryConfig::disabled());
    let outcome = runtime
        .call_json::<User>(&RequestSpec::get("/media/M1"))
        .await
        .unwrap();

    assert_eq!(outcome.status(), Status::Success);
    assert!(outcome.entity().is_none());
    assert_eq!(runtime.current_rate(), 1000.0);
}

#[tokio::test]
async fn test_raised_not_found_can_be_reported() {
    let server = MockServer::start().await;
    Mock::given(path("/media/M1"))
        .respond_with(ResponseTemplate::new(404).set_body_string("no such media"))
        .expect(1)
        .mount(&server)
        .await;

    let runtime = runtime(raising_not_found(&server), RetryConfig::disabled());
    let request = RequestSpec::get("/media/M1")
        .describe("load media M1")
        .not_found(NotFoundPolicy::Report);
    let outcome = runtime.call(&request).await.unwrap();

    assert_eq!(outcome.status(), Status::NotFound);
    assert_eq!(
        outcome.errors(),
        Some("load media M1: NOTFOUND 404 Not Found no such media")
    );
}

#[tokio::test]
async fn test_raised_not_found_lookups_leave_rate_alone() {
    let server = MockServer::start().await;
    Mock::given(path("/users/9"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let runtime = runtime(raising_not_found(&server), RetryConfig::disabled());
    let loader = runtime.json_loader::<u64, User, _>(|id| RequestSpec::get(format!("/users/{id}")));
    let users = runtime.read_through(loader, CacheConfig::default()).unwrap();

    assert_eq!(users.get(&9).await, Lookup::NotFound);
    assert_eq!(users.get(&9).await, Lookup::NotFound);
    assert_eq!(runtime.current_rate(), 1000.0);
    assert_eq!(users.stats().hits, 1);
}

#[tokio::test]
async fn test_unbuildable_request_names_target() {
    let runtime = runtime(
        HttpTransport::new(HttpTransportConfig::default()).unwrap(),
        RetryConfig::disabled(),
    );
    let request = RequestSpec::get("no-scheme").describe("load media M1");
    let outcome = runtime.call(&request).await.unwrap();

    assert_eq!(outcome.status(), Status::FatalError);
    assert!(outcome.errors().unwrap().starts_with("load media M1: FATAL_ERROR"));
}
