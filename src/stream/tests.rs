//! Tests for the result stream module

use super::*;
use crate::decode::TypedDecoder;
use futures::StreamExt;
use serde::Deserialize;
use serde_json::json;
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use wiremock::matchers::{method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SEARCH_PATH: &str = "/2/tweets/search/recent";

fn items(ids: &[u32]) -> Vec<serde_json::Value> {
    ids.iter()
        .map(|id| json!({"id": id.to_string(), "text": format!("tweet {id}")}))
        .collect()
}

fn page(ids: &[u32], next_token: Option<&str>) -> ResponseTemplate {
    let mut meta = json!({"result_count": ids.len()});
    if let Some(token) = next_token {
        meta["next_token"] = json!(token);
    }
    ResponseTemplate::new(200).set_body_json(json!({"data": items(ids), "meta": meta}))
}

fn result_stream(server: &MockServer) -> ResultStream {
    ResultStream::new(
        &format!("{}{SEARCH_PATH}", server.uri()),
        RequestPayload::new("snow day").unwrap(),
        SessionConfig::new("test-token"),
    )
    .unwrap()
    .with_retry_policy(RetryPolicy::new().with_backoff_unit(Duration::from_millis(5)))
    .with_counter(RequestCounter::new())
}

/// Address of a local port with nothing listening on it
fn closed_addr() -> SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap()
}

/// Answer exactly one request with a page, then stop listening
async fn serve_one_page(ids: &[u32], next_token: &str) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let body = json!({
        "data": items(ids),
        "meta": {"result_count": ids.len(), "next_token": next_token}
    })
    .to_string();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        drop(listener);

        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            request.extend_from_slice(&buf[..n]);
        }

        let response = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.unwrap();
    });

    addr
}

async fn drain<D: ItemDecoder>(stream: &mut ResultStream<D>) -> Vec<Result<D::Item>> {
    let mut out = Vec::new();
    while let Some(item) = stream.next_result().await {
        out.push(item);
    }
    out
}

// ============================================================================
// Construction Tests
// ============================================================================

#[test]
fn test_new_requires_token() {
    let result = ResultStream::new(
        "https://api.twitter.com/2/tweets/search/recent",
        RequestPayload::new("rust").unwrap(),
        SessionConfig::default(),
    );
    assert!(matches!(result, Err(Error::Auth { .. })));
}

#[test]
fn test_new_rejects_bad_endpoint() {
    let result = ResultStream::new(
        "not a url",
        RequestPayload::new("rust").unwrap(),
        SessionConfig::new("token"),
    );
    assert!(matches!(result, Err(Error::InvalidUrl(_))));
}

#[test]
fn test_counts_payload_rewrites_endpoint() {
    let stream = ResultStream::new(
        "https://api.twitter.com/1.1/tweets/search/30day/dev.json",
        RequestPayload::new("rust").unwrap().with_bucket("day"),
        SessionConfig::new("token"),
    )
    .unwrap();

    assert_eq!(stream.kind(), EndpointKind::Counts);
    assert_eq!(
        stream.endpoint(),
        "https://api.twitter.com/1.1/tweets/search/30day/dev/counts.json"
    );
}

#[test]
fn test_default_config() {
    let config = StreamConfig::default();
    assert_eq!(config.max_results, Some(DEFAULT_MAX_RESULTS));
    assert_eq!(config.max_requests, None);
    assert_eq!(config.session_refresh_interval, SESSION_REFRESH_INTERVAL);
    assert!(!config.strict_parsing);
}

#[test]
fn test_display_hides_token() {
    let stream = ResultStream::new(
        "https://api.twitter.com/2/tweets/search/recent",
        RequestPayload::new("rust").unwrap(),
        SessionConfig::new("super-secret"),
    )
    .unwrap();

    let rendered = stream.to_string();
    assert!(rendered.starts_with("ResultStream: \n\t"));
    assert!(rendered.contains("\"query\": \"rust\""));
    assert!(rendered.contains("\"decoder\": \"identity\""));
    assert!(!rendered.contains("super-secret"));
}

// ============================================================================
// Pagination Tests
// ============================================================================

#[tokio::test]
async fn test_follows_cursor_until_last_page() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .and(query_param_is_missing("next_token"))
        .respond_with(page(&[1, 2], Some("t1")))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .and(query_param("next_token", "t1"))
        .respond_with(page(&[3], None))
        .expect(1)
        .mount(&server)
        .await;

    let mut stream = result_stream(&server);
    let results: Vec<_> = drain(&mut stream)
        .await
        .into_iter()
        .map(|r| r.unwrap()["id"].as_str().unwrap().to_string())
        .collect();

    assert_eq!(results, vec!["1", "2", "3"]);
    assert_eq!(stream.payload().next_token.as_deref(), Some("t1"));
    assert!(stream.state().is_closed());

    let stats = stream.stats();
    assert_eq!(stats.requests, 2);
    assert_eq!(stats.results, 3);
    assert_eq!(stats.sessions_opened, 1);
}

#[tokio::test]
async fn test_result_budget_stops_mid_batch() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .respond_with(page(&[1, 2, 3, 4, 5], Some("more")))
        .expect(1)
        .mount(&server)
        .await;

    let mut stream = result_stream(&server).with_max_results(Some(1));
    let results = drain(&mut stream).await;

    assert_eq!(results.len(), 1);
    assert_eq!(stream.stats().requests, 1);
}

#[tokio::test]
async fn test_result_budget_spans_batches() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .respond_with(page(&[1, 2], Some("more")))
        .expect(2)
        .mount(&server)
        .await;

    let mut stream = result_stream(&server).with_max_results(Some(3));
    let results = drain(&mut stream).await;

    assert_eq!(results.len(), 3);
    assert_eq!(stream.stats().requests, 2);
}

#[tokio::test]
async fn test_request_budget() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .respond_with(page(&[1, 2], Some("more")))
        .expect(3)
        .mount(&server)
        .await;

    let mut stream = result_stream(&server)
        .with_max_results(None)
        .with_max_requests(Some(3));
    let results = drain(&mut stream).await;

    assert_eq!(results.len(), 6);
    assert_eq!(stream.stats().requests, 3);
}

#[tokio::test]
async fn test_zero_request_budget_issues_nothing() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(page(&[1], None))
        .expect(0)
        .mount(&server)
        .await;

    let mut stream = result_stream(&server).with_max_requests(Some(0));
    assert!(stream.next_result().await.is_none());
    assert_eq!(stream.stats().sessions_opened, 0);
}

#[tokio::test]
async fn test_empty_data_ends_stream() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"meta": {"result_count": 0}})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let mut stream = result_stream(&server);
    assert!(stream.next_result().await.is_none());
}

#[tokio::test]
async fn test_session_refresh_every_twenty_requests() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .respond_with(page(&[1], Some("more")))
        .expect(45)
        .mount(&server)
        .await;

    let mut stream = result_stream(&server)
        .with_max_results(None)
        .with_max_requests(Some(45));
    let results = drain(&mut stream).await;

    assert_eq!(results.len(), 45);
    // Initial session plus refreshes before requests 21 and 41
    assert_eq!(stream.stats().sessions_opened, 3);
}

// ============================================================================
// Failure Tests
// ============================================================================

#[tokio::test]
async fn test_malformed_body_is_an_empty_batch() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("{not json"))
        .expect(1)
        .mount(&server)
        .await;

    let mut stream = result_stream(&server);
    assert!(stream.next_result().await.is_none());
    assert_eq!(stream.stats().parse_failures, 1);
    assert!(stream.state().is_closed());
}

#[tokio::test]
async fn test_strict_parsing_raises() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
        .mount(&server)
        .await;

    let mut stream =
        result_stream(&server).with_config(StreamConfig::new().with_strict_parsing(true));
    let first = stream.next_result().await.unwrap();
    assert!(matches!(first, Err(Error::Parse { .. })));
    assert!(stream.state().is_closed());
    assert!(stream.next_result().await.is_none());
    assert_eq!(stream.stats().parse_failures, 1);
}

#[tokio::test]
async fn test_protocol_error_terminates() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let mut stream = result_stream(&server);
    let first = stream.next_result().await.unwrap();
    assert!(matches!(first, Err(Error::Protocol { status: 503, .. })));
    assert!(stream.next_result().await.is_none());
    assert_eq!(stream.stats().requests, 0);
}

#[tokio::test]
async fn test_rate_limit_ends_quietly() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .respond_with(ResponseTemplate::new(429))
        .expect(3)
        .mount(&server)
        .await;

    let mut stream = result_stream(&server);
    assert!(stream.next_result().await.is_none());
    assert_eq!(stream.stats().requests, 1);
    assert!(stream.stats().rate_limited);
}

#[tokio::test]
async fn test_connection_error_terminates() {
    let endpoint = format!("http://{}{SEARCH_PATH}", closed_addr());
    let counter = RequestCounter::new();

    let mut stream = ResultStream::new(
        &endpoint,
        RequestPayload::new("rust").unwrap(),
        SessionConfig::new("token"),
    )
    .unwrap()
    .with_counter(counter.clone());

    // Default policy: a retry would sleep for at least a second.
    let started = Instant::now();
    let first = stream.next_result().await.unwrap();
    assert!(started.elapsed() < Duration::from_secs(1));

    assert!(matches!(first, Err(Error::Connection(_))));
    assert!(stream.next_result().await.is_none());
    assert_eq!(stream.stats().requests, 0);
    assert_eq!(stream.stats().sessions_opened, 1);
    assert_eq!(counter.get(), 0);
}

#[tokio::test]
async fn test_connection_error_after_first_page() {
    let addr = serve_one_page(&[1, 2], "p2").await;
    let endpoint = format!("http://{addr}{SEARCH_PATH}");

    let mut stream = ResultStream::new(
        &endpoint,
        RequestPayload::new("rust").unwrap(),
        SessionConfig::new("token"),
    )
    .unwrap()
    .with_counter(RequestCounter::new());

    assert_eq!(stream.next_result().await.unwrap().unwrap()["id"], "1");
    assert_eq!(stream.next_result().await.unwrap().unwrap()["id"], "2");

    let started = Instant::now();
    let third = stream.next_result().await.unwrap();
    assert!(started.elapsed() < Duration::from_secs(1));

    assert!(matches!(third, Err(Error::Connection(_))));
    assert_eq!(stream.payload().next_token.as_deref(), Some("p2"));
    assert!(stream.next_result().await.is_none());
    assert_eq!(stream.stats().requests, 1);
    assert_eq!(stream.stats().results, 2);
}

// ============================================================================
// Decoding and Lifecycle Tests
// ============================================================================

#[derive(Debug, Deserialize)]
struct Tweet {
    id: String,
    text: String,
}

#[tokio::test]
async fn test_typed_decoder_via_stream() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .respond_with(page(&[7, 8], None))
        .mount(&server)
        .await;

    let tweets: Vec<Tweet> = result_stream(&server)
        .with_decoder(TypedDecoder::<Tweet>::new())
        .stream()
        .map(|r| r.unwrap())
        .collect()
        .await;

    assert_eq!(tweets.len(), 2);
    assert_eq!(tweets[0].id, "7");
    assert_eq!(tweets[1].text, "tweet 8");
}

#[tokio::test]
async fn test_decode_error_terminates() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"data": [{"id": 1}, {"id": 2}]})),
        )
        .mount(&server)
        .await;

    let mut stream = result_stream(&server).with_decoder(TypedDecoder::<Tweet>::new());
    assert!(matches!(
        stream.next_result().await,
        Some(Err(Error::Decode { .. }))
    ));
    assert!(stream.next_result().await.is_none());
}

#[tokio::test]
async fn test_abandon_closes_session() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .respond_with(page(&[1, 2, 3], Some("more")))
        .expect(1)
        .mount(&server)
        .await;

    let mut stream = result_stream(&server);
    assert!(stream.next_result().await.unwrap().is_ok());

    stream.close();
    assert!(stream.state().is_closed());
    assert!(stream.state().batch.is_empty());
    assert!(stream.next_result().await.is_none());
}

#[tokio::test]
async fn test_injected_counter() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .respond_with(page(&[1], Some("more")))
        .mount(&server)
        .await;

    let counter = RequestCounter::new();
    let first = result_stream(&server)
        .with_counter(counter.clone())
        .with_max_requests(Some(2));
    let second = result_stream(&server)
        .with_counter(counter.clone())
        .with_max_requests(Some(1));

    assert_eq!(first.collect().await.unwrap().len(), 2);
    assert_eq!(second.collect().await.unwrap().len(), 1);
    assert_eq!(counter.get(), 3);
}

#[test]
fn test_request_counter_is_shared_between_clones() {
    let counter = RequestCounter::new();
    let clone = counter.clone();
    assert_eq!(counter.increment(), 1);
    assert_eq!(clone.increment(), 2);
    assert_eq!(counter.get(), 2);
}

#[test]
fn test_zero_result_budget_closes_without_runtime() {
    let mut stream = ResultStream::new(
        "https://api.twitter.com/2/tweets/search/recent",
        RequestPayload::new("rust").unwrap(),
        SessionConfig::new("test-token"),
    )
    .unwrap()
    .with_max_results(Some(0))
    .with_counter(RequestCounter::new());

    assert!(tokio_test::block_on(stream.next_result()).is_none());
    assert!(stream.state().is_closed());
    assert_eq!(stream.stats().requests, 0);
}

#[test]
fn test_envelope_reads_meta() {
    let envelope = ResponseEnvelope::from_slice(
        br#"{"data": [{"id": "1"}], "meta": {"result_count": 1, "next_token": "abc"}}"#,
    )
    .unwrap();
    assert_eq!(envelope.data.len(), 1);
    assert_eq!(envelope.meta.result_count, Some(1));
    assert_eq!(envelope.meta.next_token.as_deref(), Some("abc"));

    let empty = ResponseEnvelope::from_slice(b"{}").unwrap();
    assert!(empty.data.is_empty());
    assert_eq!(empty.meta.result_count, None);
}
