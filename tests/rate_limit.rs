//! Admission control over HTTP.

use serde_json::{json, Value};

mod common;

#[tokio::test]
async fn test_burst_then_too_many_requests() {
    let mut config = common::test_config();
    config.rate_limit.requests_per_second = 1;
    config.rate_limit.burst_size = 20;
    let server = common::start_server(config).await;
    let client = common::client();

    let mut statuses = Vec::new();
    let mut rejected = None;
    for _ in 0..25 {
        let res = client.get(server.url("/healthz")).send().await.unwrap();
        statuses.push(res.status().as_u16());
        if res.status() == 429 && rejected.is_none() {
            rejected = Some(res);
        }
    }

    assert!(statuses[..20].iter().all(|s| *s == 200), "{:?}", statuses);
    assert!(statuses[20..].iter().all(|s| *s == 429), "{:?}", statuses);

    let rejected = rejected.unwrap();
    let retry_after: u64 = rejected.headers()["retry-after"].to_str().unwrap().parse().unwrap();
    assert!(retry_after >= 1);
    assert!(rejected.headers().get("x-request-id").is_some());
    let body: Value = rejected.json().await.unwrap();
    assert_eq!(body, json!({"error": "too many requests", "message": "rate limit exceeded"}));

    server.stop().await;
}

#[tokio::test]
async fn test_default_limits_admit_burst_of_twenty() {
    let mut config = common::test_config();
    config.rate_limit.requests_per_second = 10;
    config.rate_limit.burst_size = 20;
    let server = common::start_server(config).await;
    let client = common::client();

    let mut statuses = Vec::new();
    let mut retry_after = Vec::new();
    for _ in 0..25 {
        let res = client.get(server.url("/healthz")).send().await.unwrap();
        statuses.push(res.status().as_u16());
        if let Some(value) = res.headers().get("retry-after") {
            retry_after.push(value.to_str().unwrap().parse::<u64>().unwrap());
        }
    }

    assert!(statuses[..20].iter().all(|s| *s == 200), "{:?}", statuses);
    assert!(statuses[20..].iter().filter(|s| **s == 429).count() >= 4, "{:?}", statuses);
    assert!(!retry_after.is_empty());
    assert!(retry_after.iter().all(|secs| *secs >= 1));

    server.stop().await;
}

#[tokio::test]
async fn test_disabled_rate_limit_admits_everything() {
    let mut config = common::test_config();
    config.rate_limit.enabled = false;
    config.rate_limit.burst_size = 1;
    let server = common::start_server(config).await;
    let client = common::client();

    for _ in 0..10 {
        let res = client.get(server.url("/healthz")).send().await.unwrap();
        assert_eq!(res.status(), 200);
    }

    server.stop().await;
}

#[tokio::test]
async fn test_forwarded_for_ignored_without_trusted_proxy() {
    let mut config = common::test_config();
    config.rate_limit.requests_per_second = 1;
    config.rate_limit.burst_size = 2;
    let server = common::start_server(config).await;
    let client = common::client();

    let mut statuses = Vec::new();
    for ip in ["1.1.1.1", "2.2.2.2", "3.3.3.3"] {
        let res = client
            .get(server.url("/healthz"))
            .header("x-forwarded-for", ip)
            .send()
            .await
            .unwrap();
        statuses.push(res.status().as_u16());
    }
    assert_eq!(statuses, [200, 200, 429]);

    server.stop().await;
}

#[tokio::test]
async fn test_forwarded_for_honored_from_trusted_proxy() {
    let mut config = common::test_config();
    config.rate_limit.requests_per_second = 1;
    config.rate_limit.burst_size = 2;
    config.rate_limit.trusted_proxies = vec!["127.0.0.1".into()];
    let server = common::start_server(config).await;
    let client = common::client();

    let send = |ip: &'static str| {
        client
            .get(server.url("/healthz"))
            .header("x-forwarded-for", ip)
            .send()
    };

    assert_eq!(send("1.1.1.1").await.unwrap().status(), 200);
    assert_eq!(send("1.1.1.1").await.unwrap().status(), 200);
    assert_eq!(send("1.1.1.1").await.unwrap().status(), 429);
    assert_eq!(send("2.2.2.2").await.unwrap().status(), 200);

    server.stop().await;
}
