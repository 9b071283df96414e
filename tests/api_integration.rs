//! Integration tests for the Wistia stats API client.
//!
//! Every test runs against a local `wiremock` server. Backoff units are
//! shrunk to milliseconds so retry timing can be observed quickly.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use futures_util::{StreamExt, TryStreamExt};
use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use wistia_ingest::api::*;

const TOKEN: &str = "test-token";
// base64("api:test-token")
const BASIC_AUTH: &str = "Basic YXBpOnRlc3QtdG9rZW4=";

fn client_for(server: &MockServer, max_retries: u32, base_delay: Duration) -> WistiaApiClient {
    WistiaApiClient::builder(TOKEN)
        .base_url(server.uri())
        .timeout(Duration::from_secs(5))
        .with_retry(RetryConfig::new(max_retries).with_base_delay(base_delay))
        .build()
        .unwrap()
}

async fn request_count(server: &MockServer) -> usize {
    server.received_requests().await.unwrap().len()
}

// =============================================================================
// Success path
// =============================================================================

mod single_fetch {
    use super::*;

    #[tokio::test]
    async fn test_ok_returns_body_unchanged() {
        let server = MockServer::start().await;
        let body = json!({
            "load_count": 12,
            "play_rate": 0.5,
            "hours_watched": null,
            "nested": {"list": [1, "two", false], "empty": {}}
        });

        Mock::given(method("GET"))
            .and(path("/stats/medias/gskhw4w4lm.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&body))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, 6, Duration::from_millis(10));
        let stats = client.get_media_stats("gskhw4w4lm").await.unwrap();
        assert_eq!(stats, body);
    }

    #[tokio::test]
    async fn test_basic_auth_sent_with_api_username() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/stats/medias/abc/engagement.json"))
            .and(header("authorization", BASIC_AUTH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"engagement": 0.8})))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, 1, Duration::from_millis(10));
        let engagement = client.get_media_engagement("abc").await.unwrap();
        assert_eq!(engagement["engagement"], json!(0.8));
    }

    #[tokio::test]
    async fn test_by_date_passes_date_params() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/stats/medias/abc/by_date.json"))
            .and(query_param("start_date", "2024-03-01"))
            .and(query_param("end_date", "2024-03-07"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"date": "2024-03-01"}])))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, 1, Duration::from_millis(10));
        let start = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        let data = client.get_media_by_date("abc", start, end).await.unwrap();
        assert_eq!(data, json!([{"date": "2024-03-01"}]));
    }

    #[tokio::test]
    async fn test_generic_fetch_with_params() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/stats/account.json"))
            .and(query_param("verbose", "true"))
            .and(query_param("limit", "5"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!("ok")))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, 1, Duration::from_millis(10));
        let params = QueryParams::new().with("verbose", true).with("limit", 5u32);
        let data = client.fetch("/stats/account.json", &params).await.unwrap();
        assert_eq!(data, json!("ok"));
    }

    #[tokio::test]
    async fn test_invalid_json_on_200_is_not_retried() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, 4, Duration::from_millis(10));
        let err = client.get_media_stats("abc").await.unwrap_err();
        assert!(matches!(err, ApiError::Deserialize(_)));
    }
}

// =============================================================================
// Retry and backoff
// =============================================================================

mod backoff {
    use super::*;

    #[tokio::test]
    async fn test_429_then_200_waits_one_unit() {
        let server = MockServer::start().await;
        let unit = Duration::from_millis(100);

        Mock::given(method("GET"))
            .and(path("/stats/medias/abc.json"))
            .respond_with(ResponseTemplate::new(429))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/stats/medias/abc.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"plays": 3})))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, 6, unit);
        let started = Instant::now();
        let data = client.get_media_stats("abc").await.unwrap();
        let elapsed = started.elapsed();

        assert_eq!(data, json!({"plays": 3}));
        assert_eq!(request_count(&server).await, 2);
        // 2^0 units, no jitter for rate limiting.
        assert!(elapsed >= unit, "waited only {:?}", elapsed);
        assert!(elapsed < unit * 2 + Duration::from_secs(1), "waited {:?}", elapsed);
    }

    #[tokio::test]
    async fn test_three_server_errors_then_success() {
        let server = MockServer::start().await;
        let unit = Duration::from_millis(20);

        Mock::given(method("GET"))
            .and(path("/stats/medias/abc.json"))
            .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
            .up_to_n_times(3)
            .expect(3)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/stats/medias/abc.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([1])))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, 6, unit);
        let started = Instant::now();
        let data = client.get_media_stats("abc").await.unwrap();
        let elapsed = started.elapsed();

        assert_eq!(data, json!([1]));
        assert_eq!(request_count(&server).await, 4);
        // 1 + 2 + 4 units, plus up to one unit of jitter each.
        assert!(elapsed >= unit * 7, "waited only {:?}", elapsed);
        assert!(elapsed < unit * 10 + Duration::from_secs(1), "waited {:?}", elapsed);
    }

    #[tokio::test]
    async fn test_mixed_server_error_codes_are_retried() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(502))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        let client = client_for(&server, 3, Duration::from_millis(5));
        let data = client.get_media_engagement("abc").await.unwrap();
        assert_eq!(data, json!({}));
        assert_eq!(request_count(&server).await, 3);
    }

    #[tokio::test]
    async fn test_rate_limited_until_exhausted() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/stats/medias/abc.json"))
            .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
            .expect(3)
            .mount(&server)
            .await;

        let client = client_for(&server, 3, Duration::from_millis(5));
        let err = client.get_media_stats("abc").await.unwrap_err();

        match &err {
            ApiError::RetriesExhausted {
                url,
                attempts,
                last,
            } => {
                assert_eq!(url, &format!("{}/stats/medias/abc.json", server.uri()));
                assert_eq!(*attempts, 3);
                assert_eq!(*last, RetryReason::RateLimited);
            }
            other => panic!("expected RetriesExhausted, got {:?}", other),
        }
        assert_eq!(err.status(), Some(429));
        assert_eq!(request_count(&server).await, 3);
    }

    #[tokio::test]
    async fn test_server_errors_until_exhausted_keep_last_body() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .expect(2)
            .mount(&server)
            .await;

        let client = client_for(&server, 2, Duration::from_millis(5));
        let err = client.get_media_stats("abc").await.unwrap_err();

        match err {
            ApiError::RetriesExhausted { attempts, last, .. } => {
                assert_eq!(attempts, 2);
                assert_eq!(
                    last,
                    RetryReason::ServerError {
                        status: 500,
                        body: "boom".to_string()
                    }
                );
            }
            other => panic!("expected RetriesExhausted, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_404_fails_immediately_without_waiting() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/stats/medias/missing.json"))
            .respond_with(ResponseTemplate::new(404).set_body_string("Media not found"))
            .expect(1)
            .mount(&server)
            .await;

        // Full one-second unit: any backoff would show up in the elapsed time.
        let client = client_for(&server, 6, Duration::from_secs(1));
        let started = Instant::now();
        let err = client.get_media_stats("missing").await.unwrap_err();

        assert!(started.elapsed() < Duration::from_millis(900));
        match err {
            ApiError::ClientError { status, body } => {
                assert_eq!(status, 404);
                assert_eq!(body, "Media not found");
            }
            other => panic!("expected ClientError, got {:?}", other),
        }
        assert_eq!(request_count(&server).await, 1);
    }

    #[tokio::test]
    async fn test_auth_failure_and_non_200_success_codes_are_fatal() {
        for status in [401u16, 403, 400, 201, 204] {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .respond_with(ResponseTemplate::new(status))
                .expect(1)
                .mount(&server)
                .await;

            let client = client_for(&server, 6, Duration::from_millis(5));
            let err = client.get_media_stats("abc").await.unwrap_err();
            assert_eq!(err.status(), Some(status));
            assert!(matches!(err, ApiError::ClientError { .. }));
        }
    }

    #[tokio::test]
    async fn test_transport_failure_is_retried_then_exhausted() {
        // Nothing listens on port 1.
        let client = WistiaApiClient::builder(TOKEN)
            .base_url("http://127.0.0.1:1")
            .timeout(Duration::from_secs(2))
            .with_retry(RetryConfig::new(2).with_base_delay(Duration::from_millis(5)))
            .build()
            .unwrap();

        let err = client.get_media_stats("abc").await.unwrap_err();
        match err {
            ApiError::RetriesExhausted {
                url,
                attempts,
                last,
            } => {
                assert_eq!(url, "http://127.0.0.1:1/stats/medias/abc.json");
                assert_eq!(attempts, 2);
                assert!(matches!(last, RetryReason::Transport(_)));
            }
            other => panic!("expected RetriesExhausted, got {:?}", other),
        }
    }

    /// Serve raw HTTP/1.1 responses; the first connection promises 100 body
    /// bytes but hangs up after five.
    async fn spawn_truncating_server(hits: Arc<AtomicUsize>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            loop {
                let (mut socket, _) = match listener.accept().await {
                    Ok(conn) => conn,
                    Err(_) => return,
                };
                let hit = hits.fetch_add(1, Ordering::SeqCst);

                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => request.extend_from_slice(&buf[..n]),
                    }
                }

                let response: &[u8] = if hit == 0 {
                    b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 100\r\nConnection: close\r\n\r\n[1, 2"
                } else {
                    b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 3\r\nConnection: close\r\n\r\n[1]"
                };
                let _ = socket.write_all(response).await;
                let _ = socket.shutdown().await;
            }
        });

        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_body_cut_off_mid_read_is_retried() {
        let hits = Arc::new(AtomicUsize::new(0));
        let base_url = spawn_truncating_server(hits.clone()).await;

        let client = WistiaApiClient::builder(TOKEN)
            .base_url(base_url)
            .timeout(Duration::from_secs(5))
            .with_retry(RetryConfig::new(3).with_base_delay(Duration::from_millis(5)))
            .build()
            .unwrap();

        let body = client.get_media_stats("abc").await.unwrap();
        assert_eq!(body, json!([1]));
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_no_wait_after_final_attempt() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429))
            .expect(2)
            .mount(&server)
            .await;

        // One unit is slept between the two attempts, never a second one after the last.
        let unit = Duration::from_millis(300);
        let client = client_for(&server, 2, unit);
        let started = Instant::now();
        let err = client.get_media_stats("abc").await.unwrap_err();
        let elapsed = started.elapsed();

        assert!(err.is_retries_exhausted());
        assert!(elapsed >= unit, "elapsed {:?}", elapsed);
        assert!(elapsed < unit * 2, "elapsed {:?}", elapsed);
        assert_eq!(request_count(&server).await, 2);
    }
}

// =============================================================================
// Pagination
// =============================================================================

mod paging {
    use super::*;

    async fn mount_page(server: &MockServer, page: &str, body: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path("/stats/events.json"))
            .and(query_param("page", page))
            .and(query_param("per_page", "100"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .expect(1)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_stops_at_first_empty_page() {
        let server = MockServer::start().await;
        mount_page(&server, "1", json!([{"event_key": "a"}])).await;
        mount_page(&server, "2", json!([{"event_key": "b"}])).await;
        mount_page(&server, "3", json!([])).await;
        Mock::given(method("GET"))
            .and(query_param("page", "4"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"event_key": "c"}])))
            .expect(0)
            .mount(&server)
            .await;

        let client = client_for(&server, 1, Duration::from_millis(5));
        let pages: Vec<Page> = client
            .paginate("/stats/events.json", DEFAULT_PER_PAGE)
            .try_collect()
            .await
            .unwrap();

        let parts: Vec<(u32, serde_json::Value)> = pages.into_iter().map(Page::into_parts).collect();
        assert_eq!(
            parts,
            vec![
                (1, json!([{"event_key": "a"}])),
                (2, json!([{"event_key": "b"}])),
            ]
        );
        assert_eq!(request_count(&server).await, 3);
    }

    #[tokio::test]
    async fn test_page_params_increment_from_one() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/stats/visitors.json"))
            .and(query_param("page", "3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/stats/visitors.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"visitor_key": "v"}])))
            .mount(&server)
            .await;

        let client = client_for(&server, 1, Duration::from_millis(5));
        let pages: Vec<Page> = client.visitors(25).try_collect().await.unwrap();
        assert_eq!(pages.len(), 2);

        let requests = server.received_requests().await.unwrap();
        let seen: Vec<(String, String)> = requests
            .iter()
            .map(|req| {
                let pairs: std::collections::HashMap<String, String> =
                    req.url.query_pairs().into_owned().collect();
                (pairs["page"].clone(), pairs["per_page"].clone())
            })
            .collect();
        assert_eq!(
            seen,
            vec![
                ("1".to_string(), "25".to_string()),
                ("2".to_string(), "25".to_string()),
                ("3".to_string(), "25".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_is_lazy() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/stats/events.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([1])))
            .mount(&server)
            .await;

        let client = client_for(&server, 1, Duration::from_millis(5));

        let stream = client.events(100);
        assert_eq!(request_count(&server).await, 0);

        let first: Vec<_> = stream.take(1).collect().await;
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].as_ref().unwrap().number, 1);
        assert_eq!(request_count(&server).await, 1);
    }

    #[tokio::test]
    async fn test_error_halts_pagination() {
        let server = MockServer::start().await;
        mount_page(&server, "1", json!([1])).await;
        Mock::given(method("GET"))
            .and(path("/stats/events.json"))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, 3, Duration::from_millis(5));
        let items: Vec<ApiResult<Page>> = client.events(100).collect().await;

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().unwrap().number, 1);
        assert!(matches!(
            items[1],
            Err(ApiError::ClientError { status: 403, .. })
        ));
        assert_eq!(request_count(&server).await, 2);
    }

    #[tokio::test]
    async fn test_restart_begins_at_page_one() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("page", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!(["x"])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!(null)))
            .mount(&server)
            .await;

        let client = client_for(&server, 1, Duration::from_millis(5));
        for _ in 0..2 {
            let pages: Vec<Page> = client.events(100).try_collect().await.unwrap();
            assert_eq!(pages.len(), 1);
            assert_eq!(pages[0].number, 1);
        }
    }
}
