// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use yare::parameterized;

/// Request as seen by the stub server: request line and body.
#[derive(Debug)]
struct Seen {
    line: String,
    body: String,
}

/// Serve one canned `(status, body)` response per connection, in order.
async fn stub_server(responses: Vec<(u16, &'static str)>) -> (String, JoinHandle<Vec<Seen>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        let mut seen = Vec::new();
        for (status, body) in responses {
            let (stream, _) = listener.accept().await.unwrap();
            let mut reader = BufReader::new(stream);

            let mut line = String::new();
            reader.read_line(&mut line).await.unwrap();
            let mut content_length = 0usize;
            loop {
                let mut header = String::new();
                reader.read_line(&mut header).await.unwrap();
                if header == "\r\n" || header.is_empty() {
                    break;
                }
                let lower = header.to_ascii_lowercase();
                if let Some(value) = lower.strip_prefix("content-length:") {
                    content_length = value.trim().parse().unwrap();
                }
            }
            let mut request_body = vec![0u8; content_length];
            reader.read_exact(&mut request_body).await.unwrap();

            let response = format!(
                "HTTP/1.1 {} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            reader.get_mut().write_all(response.as_bytes()).await.unwrap();
            reader.get_mut().shutdown().await.unwrap();

            seen.push(Seen {
                line: line.trim_end().to_string(),
                body: String::from_utf8(request_body).unwrap(),
            });
        }
        seen
    });
    (format!("http://{}/api", addr), handle)
}

fn client(base_url: &str) -> HttpCoordinator {
    HttpCoordinator::new(base_url, Duration::from_secs(5)).unwrap()
}

#[parameterized(
    truncates_not_rounds = { 1.23456, 1.234 },
    exact = { 2.5, 2.5 },
    zero = { 0.0, 0.0 },
    not_a_number = { f64::NAN, 0.0 },
)]
fn rate_truncation(rate: f64, expected: f64) {
    assert_eq!(truncate_rate(rate), expected);
}

#[test]
fn base_url_gets_trailing_slash() {
    assert_eq!(client("http://localhost:8000/api").base_url(), "http://localhost:8000/api/");
    assert_eq!(client("http://localhost:8000/api/").base_url(), "http://localhost:8000/api/");
}

#[tokio::test]
async fn job_calls_require_active_job() {
    let coordinator = client("http://127.0.0.1:9/");
    assert_eq!(coordinator.job_status().await.unwrap_err(), CoordinatorError::NoActiveJob);
    assert_eq!(
        coordinator.put_update(Progress::default()).await.unwrap_err(),
        CoordinatorError::NoActiveJob
    );
}

#[tokio::test]
async fn active_jobs_decodes_list() {
    let (url, server) = stub_server(vec![(
        200,
        r#"{"count": 1, "results": [{"id": 4, "name": "j", "status": 2}]}"#,
    )])
    .await;

    let jobs = client(&url).active_jobs().await.unwrap();

    assert_eq!(jobs.count, 1);
    assert_eq!(jobs.results[0].id, JobId(4));
    let seen = server.await.unwrap();
    assert_eq!(seen[0].line, "GET /api/activejobs/ HTTP/1.1");
}

#[tokio::test]
async fn job_status_addresses_active_job() {
    let (url, server) = stub_server(vec![(200, r#"{"id": 9, "name": "j", "status": 3}"#)]).await;
    let coordinator = client(&url);
    coordinator.set_active_job(Some(JobId(9))).await;

    let job = coordinator.job_status().await.unwrap();

    assert_eq!(job.status, CaptureStatus::STARTED);
    assert_eq!(server.await.unwrap()[0].line, "GET /api/jobs/9/ HTTP/1.1");
}

#[tokio::test]
async fn error_status_is_reported() {
    let (url, _server) = stub_server(vec![(500, "{}")]).await;
    let err = client(&url).active_jobs().await.unwrap_err();
    assert_eq!(err, CoordinatorError::Status(500));
}

#[tokio::test]
async fn update_status_puts_modified_snapshot() {
    let (url, server) = stub_server(vec![
        (200, r#"{"id": 9, "name": "j", "status": 4, "owner": "ops"}"#),
        (200, "{}"),
    ])
    .await;
    let coordinator = client(&url);
    coordinator.set_active_job(Some(JobId(9))).await;

    coordinator.update_status(CaptureStatus::STOPPED).await.unwrap();

    let seen = server.await.unwrap();
    assert_eq!(seen[1].line, "PUT /api/jobs/9/ HTTP/1.1");
    let body: serde_json::Value = serde_json::from_str(&seen[1].body).unwrap();
    assert_eq!(body["status"], 5);
    assert_eq!(body["owner"], "ops");
}

#[tokio::test]
async fn update_status_skips_put_when_already_set() {
    let (url, server) = stub_server(vec![(200, r#"{"id": 9, "name": "j", "status": 5}"#)]).await;
    let coordinator = client(&url);
    coordinator.set_active_job(Some(JobId(9))).await;

    coordinator.update_status(CaptureStatus::STOPPED).await.unwrap();

    assert_eq!(server.await.unwrap().len(), 1);
}

#[tokio::test]
async fn put_update_posts_sample() {
    let (url, server) = stub_server(vec![(201, "{}")]).await;
    let coordinator = client(&url);
    coordinator.set_active_job(Some(JobId(2))).await;

    coordinator.put_update(Progress { received: 10, total: 110, rate: 1.98765 }).await.unwrap();

    let seen = server.await.unwrap();
    assert_eq!(seen[0].line, "POST /api/update/ HTTP/1.1");
    let body: serde_json::Value = serde_json::from_str(&seen[0].body).unwrap();
    assert_eq!(body, serde_json::json!({ "count": 10, "total_count": 110, "rate": 1.987, "job": 2 }));
}
