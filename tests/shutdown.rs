//! Lifecycle and graceful shutdown behaviour.

use std::time::{Duration, Instant};

use reqwest::StatusCode;
use static_gate::lifecycle::{DrainOutcome, LifecycleState, ShutdownTrigger, TerminationSignal};
use static_gate::{ServerError, ShutdownCoordinator};

mod common;

#[tokio::test]
async fn in_flight_request_completes_before_clean_stop() {
    let site = common::site();
    let mut config = common::config(&site);
    config.timeouts.shutdown_secs = 10;
    config.timeouts.auth_secs = 30;
    config.timeouts.write_secs = 30;
    let policy = common::SlowPolicy::new(Duration::from_secs(2));
    let mut server = common::start(config, Some(policy.clone())).await;

    let url = server.url("/index.html");
    let in_flight = tokio::spawn(async move { common::client().get(url).send().await });

    // Let the request reach the handler chain, then ask for shutdown.
    while policy.calls() == 0 {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    let started = Instant::now();
    server.signal(TerminationSignal::Terminate);

    let res = in_flight.await.unwrap().expect("in-flight request must complete");
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), common::INDEX_HTML);

    let report = tokio::time::timeout(Duration::from_secs(15), server.handle)
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(report.trigger, ShutdownTrigger::Signal(TerminationSignal::Terminate)));
    assert_eq!(report.drain, DrainOutcome::Clean);
    assert!(started.elapsed() < Duration::from_secs(10));
    assert!(report.into_result().is_ok());
}

#[tokio::test]
async fn new_connections_are_refused_once_shutdown_begins() {
    let site = common::site();
    let mut config = common::config(&site);
    config.timeouts.auth_secs = 30;
    config.timeouts.write_secs = 30;
    let policy = common::SlowPolicy::new(Duration::from_millis(1500));
    let mut server = common::start(config, Some(policy.clone())).await;

    // Keep the server busy so it is still draining when the late request arrives.
    let url = server.url("/index.html");
    let in_flight = tokio::spawn(async move { common::client().get(url).send().await });
    while policy.calls() == 0 {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    server.signal(TerminationSignal::Interrupt);
    tokio::time::sleep(Duration::from_millis(200)).await;

    let late = common::client()
        .get(server.url("/index.html"))
        .timeout(Duration::from_secs(2))
        .send()
        .await;
    assert!(late.is_err(), "request after shutdown must not succeed: {:?}", late.map(|r| r.status()));
    assert_eq!(policy.calls(), 1);

    assert_eq!(in_flight.await.unwrap().unwrap().status(), StatusCode::OK);
    let report = server.handle.await.unwrap();
    assert_eq!(report.drain, DrainOutcome::Clean);
}

#[tokio::test]
async fn stuck_request_is_aborted_after_shutdown_timeout() {
    let site = common::site();
    let mut config = common::config(&site);
    config.timeouts.shutdown_secs = 1;
    config.timeouts.auth_secs = 30;
    config.timeouts.write_secs = 30;
    let policy = common::SlowPolicy::new(Duration::from_secs(20));
    let mut server = common::start(config, Some(policy.clone())).await;

    let url = server.url("/index.html");
    let in_flight = tokio::spawn(async move { common::client().get(url).send().await });
    while policy.calls() == 0 {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let started = Instant::now();
    server.signal(TerminationSignal::Terminate);
    let report = tokio::time::timeout(Duration::from_secs(5), server.handle)
        .await
        .expect("shutdown must be bounded")
        .unwrap();

    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(
        report.drain,
        DrainOutcome::Forced {
            timeout: Duration::from_secs(1),
            in_flight: 1
        }
    );
    assert!(matches!(
        report.into_result(),
        Err(ServerError::ShutdownTimeout { in_flight: 1, .. })
    ));

    // The aborted connection is closed without a response.
    assert!(in_flight.await.unwrap().is_err());
}

#[tokio::test]
async fn occupied_port_stops_without_accepting() {
    let site = common::site();
    let occupied = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let mut config = common::config(&site);
    config.listener.port = occupied.local_addr().unwrap().port();

    let coordinator = ShutdownCoordinator::new(config);
    let mut states = coordinator.subscribe();
    let observed = tokio::spawn(async move {
        let mut seen = vec![*states.borrow_and_update()];
        while states.changed().await.is_ok() {
            seen.push(*states.borrow_and_update());
        }
        seen
    });

    let report = tokio::time::timeout(
        Duration::from_secs(5),
        coordinator.run_until(std::future::pending()),
    )
    .await
    .expect("startup failure must trigger shutdown");

    match &report.trigger {
        ShutdownTrigger::ServerFailed(ServerError::Startup { address, .. }) => {
            assert!(address.starts_with("127.0.0.1:"));
        }
        other => panic!("unexpected trigger: {:?}", other),
    }
    assert_eq!(report.drain, DrainOutcome::Clean);
    assert_eq!(report.into_result().unwrap_err().exit_code(), std::process::ExitCode::from(2));

    let seen = observed.await.unwrap();
    assert!(!seen.iter().any(|s| matches!(s, LifecycleState::Running { .. })));
    assert_eq!(seen.last(), Some(&LifecycleState::Stopped));
}
