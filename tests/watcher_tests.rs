//! # Event Watcher Tests
//!
//! Reconnect behaviour of the restartable watch stream.

mod common;

use std::sync::Arc;
use std::time::Duration;

use certificate_controller::controller::ServerState;
use certificate_controller::prelude::*;
use futures::StreamExt;
use common::{certificate, entries, fakes, test_config};

fn added(name: &str) -> Result<CertificateEvent, ClusterError> {
    Ok(CertificateEvent::new(
        WatchEventType::Added,
        certificate(name, "default", "example.com", None),
    ))
}

fn names(events: &[CertificateEvent]) -> Vec<String> {
    events
        .iter()
        .map(|e| e.object.metadata.name.clone().unwrap_or_default())
        .collect()
}

#[tokio::test]
async fn test_stream_error_reopens_watch() {
    let (journal, cluster, _issuer) = fakes();
    cluster.push_watch(vec![
        added("first"),
        Err(ClusterError::Watch("connection reset".to_string())),
        added("never-delivered"),
    ]);
    cluster.push_watch(vec![added("second")]);

    let watcher = EventWatcher::new(Arc::clone(&cluster) as Arc<dyn ClusterClient>, &test_config());
    let events: Vec<_> = watcher.events().take(2).collect().await;

    assert_eq!(names(&events), vec!["first", "second"]);
    assert_eq!(
        entries(&journal).iter().filter(|e| *e == "watch").count(),
        2
    );
}

#[tokio::test]
async fn test_clean_end_of_stream_reopens_watch() {
    let (_journal, cluster, _issuer) = fakes();
    cluster.push_watch(vec![added("first")]);
    cluster.push_watch(vec![]);
    cluster.push_watch(vec![added("second"), added("third")]);

    let watcher = EventWatcher::new(Arc::clone(&cluster) as Arc<dyn ClusterClient>, &test_config());
    let events: Vec<_> = watcher.events().take(3).collect().await;

    assert_eq!(names(&events), vec!["first", "second", "third"]);
}

#[tokio::test]
async fn test_failure_to_open_is_retried() {
    let (journal, cluster, _issuer) = fakes();
    cluster.push_watch_open_error(ClusterError::Api {
        code: 503,
        reason: "ServiceUnavailable".to_string(),
        message: "apiserver restarting".to_string(),
    });
    cluster.push_watch_open_error(ClusterError::Watch("tls handshake".to_string()));
    cluster.push_watch(vec![added("first")]);

    let watcher = EventWatcher::new(Arc::clone(&cluster) as Arc<dyn ClusterClient>, &test_config());
    let events: Vec<_> = watcher.events().take(1).collect().await;

    assert_eq!(names(&events), vec!["first"]);
    assert_eq!(entries(&journal), vec!["watch", "watch", "watch"]);
}

#[tokio::test(start_paused = true)]
async fn test_reconnects_back_off() {
    let (_journal, cluster, _issuer) = fakes();
    for _ in 0..3 {
        cluster.push_watch_open_error(ClusterError::Watch("refused".to_string()));
    }
    cluster.push_watch(vec![added("first")]);

    let config = ControllerConfig {
        backoff_start_ms: 1000,
        backoff_max_ms: 30_000,
        ..test_config()
    };
    let watcher = EventWatcher::new(Arc::clone(&cluster) as Arc<dyn ClusterClient>, &config);

    let started = tokio::time::Instant::now();
    let events: Vec<_> = watcher.events().take(1).collect().await;

    assert_eq!(names(&events), vec!["first"]);
    // 1s + 1s + 2s of backoff before the fourth open
    assert!(started.elapsed() >= Duration::from_millis(4000));
}

#[tokio::test]
async fn test_controller_processes_events_across_reconnects() {
    let (_journal, cluster, issuer) = fakes();
    cluster.push_watch(vec![
        added("first"),
        Err(ClusterError::Watch("connection reset".to_string())),
    ]);
    // Replay after reconnect: "first" now carries a status and is skipped
    let mut replayed = certificate("first", "default", "example.com", None);
    replayed.status = Some(CertificateStatus::success());
    cluster.push_watch(vec![
        Ok(CertificateEvent::new(WatchEventType::Added, replayed)),
        added("second"),
    ]);

    let controller = Controller::new(
        Arc::clone(&cluster) as Arc<dyn ClusterClient>,
        Arc::clone(&issuer) as Arc<dyn CertificateIssuer>,
        &test_config(),
    );
    let watcher = EventWatcher::new(Arc::clone(&cluster) as Arc<dyn ClusterClient>, &test_config());
    controller.process_events(watcher.events().take(3)).await;

    let issued: Vec<_> = issuer.requests().into_iter().map(|r| r.domain).collect();
    assert_eq!(issued.len(), 2);
    assert!(cluster.secret("first", "default").is_some());
    assert!(cluster.secret("second", "default").is_some());
}

fn controller_for(
    cluster: &Arc<common::FakeClusterClient>,
    issuer: &Arc<common::FakeIssuer>,
    config: &ControllerConfig,
) -> Controller {
    Controller::new(
        Arc::clone(cluster) as Arc<dyn ClusterClient>,
        Arc::clone(issuer) as Arc<dyn CertificateIssuer>,
        config,
    )
}

#[tokio::test(start_paused = true)]
async fn test_not_ready_while_every_watch_open_fails() {
    let (journal, cluster, issuer) = fakes();
    for _ in 0..50 {
        cluster.push_watch_open_error(ClusterError::Watch("refused".to_string()));
    }
    let config = ControllerConfig {
        backoff_start_ms: 1000,
        backoff_max_ms: 30_000,
        ..test_config()
    };
    let controller = controller_for(&cluster, &issuer, &config);
    let state = Arc::new(ServerState::default());

    let result = tokio::time::timeout(Duration::from_secs(10), controller.run(Arc::clone(&state))).await;

    assert!(result.is_err());
    assert!(!state.ready());
    // Several opens were attempted, none succeeded
    assert!(entries(&journal).iter().filter(|e| *e == "watch").count() > 1);
}

#[tokio::test(start_paused = true)]
async fn test_ready_once_watch_opens_after_failures() {
    let (_journal, cluster, issuer) = fakes();
    cluster.push_watch_open_error(ClusterError::Watch("refused".to_string()));
    // Queue exhausted afterwards: the next open succeeds and stays idle
    let config = ControllerConfig {
        backoff_start_ms: 1000,
        backoff_max_ms: 30_000,
        ..test_config()
    };
    let controller = controller_for(&cluster, &issuer, &config);
    let state = Arc::new(ServerState::default());

    assert!(!state.ready());
    let result = tokio::time::timeout(Duration::from_secs(10), controller.run(Arc::clone(&state))).await;

    assert!(result.is_err());
    assert!(state.ready());
}
