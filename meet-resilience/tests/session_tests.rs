//! End-to-end tests: emitter sources → bridge → controller → host.


use std::time::Duration;

use meet_resilience::conn_events::AttachOutcome;
use meet_resilience::prelude::*;
use test_helpers::{wait_for_status, wait_until, CountingTransport, RecordingHost, Sources};

fn start_session(
    config: ReconnectConfig,
    transport: std::sync::Arc<CountingTransport>,
    host: std::sync::Arc<RecordingHost>,
    sources: &Sources,
) -> CallSession {
    CallSession::builder()
        .with_config(config)
        .with_transport(transport)
        .with_host(host)
        .with_signaling_source(sources.signaling_target())
        .with_media_source(sources.media_target())
        .start()
        .expect("session starts")
}

#[tokio::test]
async fn test_builder_requires_transport_and_host() {
    let result = CallSession::builder()
        .with_host(RecordingHost::new())
        .start();
    assert!(matches!(result, Err(SessionError::MissingTransport)));

    let result = CallSession::builder()
        .with_transport(CountingTransport::new())
        .start();
    assert!(matches!(result, Err(SessionError::MissingHost)));

    let result = CallSession::builder()
        .with_transport(CountingTransport::new())
        .with_host(RecordingHost::new())
        .with_config(ReconnectConfig::default().with_max_attempts(0))
        .start();
    assert!(matches!(result, Err(SessionError::Controller(_))));
}

#[tokio::test(start_paused = true)]
async fn test_session_recovers_from_signaling_drop() {
    let sources = Sources::new();
    let transport = CountingTransport::new();
    let host = RecordingHost::new();
    let session = start_session(
        ReconnectConfig::default(),
        transport.clone(),
        host.clone(),
        &sources,
    );

    assert_eq!(sources.signaling.total_listeners(), 3);
    assert_eq!(sources.media.total_listeners(), 3);

    sources
        .signaling
        .emit(SignalingSignal::Disconnected, SignalPayload::Empty);
    let snapshot = wait_for_status(&session, |s| s.phase == RecoveryPhase::Attempting).await;
    assert_eq!(snapshot.attempt_count, 1);
    assert!(session.is_reconnecting());

    wait_until(|| transport.reconnects() == 1).await;
    assert!(host.has(&HostAction::RemoveRemoteTrack(TrackRef::new(
        "remote-video-1"
    ))));
    assert!(host.has(&HostAction::ShowNotification(NotificationId::Reconnecting)));

    sources
        .signaling
        .emit(SignalingSignal::Established, SignalPayload::Empty);
    let snapshot = wait_for_status(&session, |s| s.phase == RecoveryPhase::Idle).await;
    assert_eq!(snapshot.attempt_count, 0);
    assert!(!snapshot.has_pending_task);
    assert!(host.has(&HostAction::HideNotification(NotificationId::Reconnecting)));
    assert!(host.has(&HostAction::HideLoader(LoaderId::AutoReconnect)));

    session.end().await.unwrap();
    assert_eq!(sources.signaling.total_listeners(), 0);
    assert_eq!(sources.media.total_listeners(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_credential_expiry_from_signaling_failure() {
    let sources = Sources::new();
    let transport = CountingTransport::new();
    let host = RecordingHost::new();
    let session = start_session(
        ReconnectConfig::default(),
        transport.clone(),
        host.clone(),
        &sources,
    );

    sources.signaling.emit(
        SignalingSignal::Failed,
        SignalPayload::Failure {
            reason: "connection.passwordRequired".to_string(),
            message: Some("token expired".to_string()),
        },
    );

    wait_until(|| transport.reconnects() == 1).await;
    assert!(host.has(&HostAction::ClearAuthToken));
    assert_eq!(session.status().attempt_count, 1);

    session.end().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_exhaustion_reloads_once() {
    let sources = Sources::new();
    let transport = CountingTransport::failing();
    let host = RecordingHost::new();
    let session = start_session(
        ReconnectConfig::default().with_max_attempts(2),
        transport.clone(),
        host.clone(),
        &sources,
    );

    sources
        .signaling
        .emit(SignalingSignal::Disconnected, SignalPayload::Empty);
    let snapshot = wait_for_status(&session, |s| s.phase == RecoveryPhase::Exhausted).await;
    assert_eq!(snapshot.attempt_count, 2);

    wait_until(|| host.count(&HostAction::Reload) == 1).await;
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(host.count(&HostAction::Reload), 1);
    assert_eq!(transport.reconnects(), 2);
    assert!(host.has(&HostAction::ShowLoader {
        id: LoaderId::Reload,
        message_key: "connection.reloading",
    }));

    session.end().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_leave_cancels_recovery() {
    let sources = Sources::new();
    let transport = CountingTransport::new();
    let host = RecordingHost::new();
    let session = start_session(
        ReconnectConfig::default(),
        transport.clone(),
        host.clone(),
        &sources,
    );

    sources
        .signaling
        .emit(SignalingSignal::Disconnected, SignalPayload::Empty);
    wait_for_status(&session, |s| s.phase == RecoveryPhase::WaitingToRetry).await;

    session.leave().unwrap();
    let snapshot = wait_for_status(&session, |s| s.phase == RecoveryPhase::Idle).await;
    assert!(snapshot.is_manual_leave);
    assert!(!snapshot.has_pending_task);

    // Further drops while leaving are ignored
    sources
        .signaling
        .emit(SignalingSignal::Disconnected, SignalPayload::Empty);
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(transport.reconnects(), 0);
    assert_eq!(session.status().phase, RecoveryPhase::Idle);

    session.end().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_media_notices_and_source_replacement() {
    let sources = Sources::new();
    let host = RecordingHost::new();
    let mut session = start_session(
        ReconnectConfig::default(),
        CountingTransport::new(),
        host.clone(),
        &sources,
    );

    sources
        .media
        .emit(MediaSignal::Interrupted, SignalPayload::Empty);
    sources.media.emit(MediaSignal::Restored, SignalPayload::Empty);
    wait_until(|| host.has(&HostAction::ShowNotification(NotificationId::MediaRestored))).await;
    assert!(host.has(&HostAction::ShowNotification(
        NotificationId::MediaInterrupted
    )));
    assert!(host.has(&HostAction::HideNotification(
        NotificationId::MediaInterrupted
    )));

    let replacement = Sources::new();
    let outcome = session.replace_media_source(Some(replacement.media_target()));
    assert_eq!(outcome, AttachOutcome::Attached);
    assert_eq!(sources.media.total_listeners(), 0);
    assert_eq!(replacement.media.total_listeners(), 3);

    // The old media path no longer reaches the controller
    sources
        .media
        .emit(MediaSignal::DeviceSuspended, SignalPayload::Empty);
    replacement
        .media
        .emit(MediaSignal::Restored, SignalPayload::Empty);
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(!host.has(&HostAction::ShowNotification(
        NotificationId::DeviceSuspended
    )));
    // A restore on a fresh media path without interruption is silent
    assert_eq!(
        host.count(&HostAction::ShowNotification(NotificationId::MediaRestored)),
        1
    );

    session.end().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_dropping_session_detaches_listeners() {
    let sources = Sources::new();
    let session = start_session(
        ReconnectConfig::default(),
        CountingTransport::new(),
        RecordingHost::new(),
        &sources,
    );
    let handle = session.handle().clone();

    drop(session);
    assert_eq!(sources.signaling.total_listeners(), 0);
    assert_eq!(sources.media.total_listeners(), 0);

    // The controller winds down after the shutdown sent on drop
    wait_until(|| handle.dispatch(ConnectionEvent::SignalingEstablished).is_err()).await;
}
