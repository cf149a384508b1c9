//! End-to-end request handling through a running server.

use std::sync::Arc;

use async_trait::async_trait;
use axum::http::request::Parts;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::StatusCode;
use static_gate::config::AuthConfig;
use static_gate::lifecycle::{DrainOutcome, ShutdownTrigger};
use static_gate::security::{AuthDecision, AuthError, AuthPolicy};

mod common;

fn basic(user: &str, pass: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{}:{}", user, pass)))
}

#[tokio::test]
async fn basic_auth_gates_the_site() {
    let site = common::site();
    let mut config = common::config(&site);
    config.auth = AuthConfig::Basic {
        username: "admin".into(),
        password: "hunter2".into(),
    };
    let server = common::start(config, None).await;
    let client = common::client();

    let res = client
        .get(server.url("/index.html"))
        .header("authorization", basic("admin", "hunter2"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers().contains_key("x-request-id"));
    assert_eq!(res.text().await.unwrap(), common::INDEX_HTML);

    for auth in [None, Some(basic("admin", "wrong")), Some("Bearer hunter2".to_string())] {
        let mut req = client.get(server.url("/index.html"));
        if let Some(auth) = &auth {
            req = req.header("authorization", auth);
        }
        let res = req.send().await.unwrap();
        assert_eq!(res.status(), StatusCode::FORBIDDEN, "auth {:?}", auth);
        let body = res.text().await.unwrap();
        assert!(!body.contains("top secret"), "file content leaked: {}", body);
    }

    let report = server.stop().await;
    assert_eq!(report.drain, DrainOutcome::Clean);
}

#[tokio::test]
async fn bearer_auth_serves_nested_files_and_404s() {
    let site = common::site();
    let mut config = common::config(&site);
    config.auth = AuthConfig::Bearer {
        tokens: vec!["t0ken".into()],
    };
    let server = common::start(config, None).await;
    let client = common::client();

    let res = client
        .get(server.url("/docs/guide.txt"))
        .bearer_auth("t0ken")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), "read me");

    let res = client.get(server.url("/")).bearer_auth("t0ken").send().await.unwrap();
    assert_eq!(res.text().await.unwrap(), common::INDEX_HTML);

    let res = client
        .get(server.url("/missing.html"))
        .bearer_auth("t0ken")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    // Denial does not depend on whether the path exists.
    let res = client.get(server.url("/missing.html")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    server.stop().await;
}

#[tokio::test]
async fn no_auth_mode_serves_everything() {
    let site = common::site();
    let server = common::start(common::config(&site), None).await;

    let res = common::client().get(server.url("/index.html")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), common::INDEX_HTML);

    let report = server.stop().await;
    assert!(matches!(report.trigger, ShutdownTrigger::Signal(_)));
}

struct StoreDown;

#[async_trait]
impl AuthPolicy for StoreDown {
    async fn decide(&self, _request: &Parts) -> Result<AuthDecision, AuthError> {
        Err(AuthError::Unavailable("connection refused".into()))
    }

    fn name(&self) -> &'static str {
        "store-down"
    }
}

#[tokio::test]
async fn failing_policy_fails_closed_and_server_keeps_serving() {
    let site = common::site();
    let server = common::start(common::config(&site), Some(Arc::new(StoreDown))).await;
    let client = common::client();

    for _ in 0..3 {
        let res = client
            .get(server.url("/index.html"))
            .header("authorization", basic("admin", "hunter2"))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
        assert_eq!(res.text().await.unwrap(), "Forbidden");
    }

    let report = server.stop().await;
    assert!(report.into_result().is_ok());
}

#[tokio::test]
async fn slow_policy_is_bounded_by_auth_timeout() {
    let site = common::site();
    let mut config = common::config(&site);
    config.timeouts.auth_secs = 1;
    let policy = common::SlowPolicy::new(std::time::Duration::from_secs(3));
    let server = common::start(config, Some(policy)).await;

    let started = std::time::Instant::now();
    let res = common::client().get(server.url("/index.html")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    assert!(started.elapsed() < std::time::Duration::from_secs(3));

    server.stop().await;
}
