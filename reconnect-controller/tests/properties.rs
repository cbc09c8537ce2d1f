//! Property tests over random event sequences.


use std::time::Duration;

use conn_events::{ConnectionEvent, ConnectionFailure};
use proptest::prelude::*;
use reconnect_controller::{ReconnectConfig, ReconnectController, RecoveryPhase, RecoverySnapshot};
use test_helpers::{harness, Harness};

const MAX_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone)]
enum Action {
    Disconnect,
    Established,
    Failure,
    CredentialExpired,
    ManualLeave,
    ConferenceWillLeave,
    ConferenceJoined,
    MediaInterrupted,
    /// Let virtual time run for this many milliseconds
    Advance(u64),
}

fn action() -> impl Strategy<Value = Action> {
    prop_oneof![
        3 => Just(Action::Disconnect),
        2 => Just(Action::Established),
        1 => Just(Action::Failure),
        1 => Just(Action::CredentialExpired),
        1 => Just(Action::ManualLeave),
        1 => Just(Action::ConferenceWillLeave),
        1 => Just(Action::ConferenceJoined),
        1 => Just(Action::MediaInterrupted),
        4 => (1u64..20_000).prop_map(Action::Advance),
    ]
}

/// Counts entries into `Exhausted`; each may trigger one reload
#[derive(Debug)]
struct Exhaustions {
    last: RecoveryPhase,
    count: usize,
}

impl Exhaustions {
    fn observe(&mut self, snapshot: &RecoverySnapshot) {
        if snapshot.phase == RecoveryPhase::Exhausted && self.last != RecoveryPhase::Exhausted {
            self.count += 1;
        }
        self.last = snapshot.phase;
    }
}

fn check_invariants(snapshot: &RecoverySnapshot) {
    assert_eq!(
        snapshot.has_pending_task,
        snapshot.phase.is_recovering(),
        "pending task out of sync with phase: {:?}",
        snapshot
    );
    assert!(snapshot.attempt_count <= MAX_ATTEMPTS, "{:?}", snapshot);
    if snapshot.phase == RecoveryPhase::Idle {
        assert_eq!(snapshot.attempt_count, 0, "{:?}", snapshot);
    }
    if snapshot.phase == RecoveryPhase::Exhausted {
        assert_eq!(snapshot.attempt_count, MAX_ATTEMPTS, "{:?}", snapshot);
    }
}

fn event_for(action: &Action) -> Option<ConnectionEvent> {
    let event = match action {
        Action::Disconnect => ConnectionEvent::SignalingDisconnected { message: None },
        Action::Established => ConnectionEvent::SignalingEstablished,
        Action::Failure => {
            ConnectionEvent::SignalingFailed(ConnectionFailure::new("connection.otherError"))
        }
        Action::CredentialExpired => {
            ConnectionEvent::SignalingFailed(ConnectionFailure::credential_expired())
        }
        Action::MediaInterrupted => ConnectionEvent::MediaInterrupted,
        _ => return None,
    };
    Some(event)
}

/// Process every input that is already queued, checking after each one
async fn drain(controller: &mut ReconnectController, exhaustions: &mut Exhaustions) {
    while let Ok(running) = tokio::time::timeout(Duration::ZERO, controller.step()).await {
        assert!(running);
        let snapshot = controller.snapshot();
        check_invariants(&snapshot);
        exhaustions.observe(&snapshot);
    }
}

fn run_sequence(actions: Vec<Action>, transport_fails: bool) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .start_paused(true)
        .build()
        .unwrap();

    runtime.block_on(async move {
        let config = ReconnectConfig::default().with_max_attempts(MAX_ATTEMPTS);
        let Harness {
            mut controller,
            handle,
            transport,
            host,
            ..
        } = harness(config);
        transport.set_fail_by_default(transport_fails);
        transport.set_reconnect_delay(Duration::from_millis(250));
        let mut exhaustions = Exhaustions {
            last: RecoveryPhase::Idle,
            count: 0,
        };

        for action in &actions {
            match action {
                Action::Advance(ms) => {
                    let _ = tokio::time::timeout(Duration::from_millis(*ms), async {
                        while controller.step().await {
                            let snapshot = controller.snapshot();
                            check_invariants(&snapshot);
                            exhaustions.observe(&snapshot);
                        }
                    })
                    .await;
                }
                Action::ManualLeave => handle.manual_leave().unwrap(),
                Action::ConferenceWillLeave => handle.conference_will_leave().unwrap(),
                Action::ConferenceJoined => handle.conference_joined().unwrap(),
                other => {
                    if let Some(event) = event_for(other) {
                        handle.dispatch(event).unwrap();
                    }
                }
            }

            drain(&mut controller, &mut exhaustions).await;

            if matches!(action, Action::ManualLeave) {
                let snapshot = controller.snapshot();
                assert_eq!(snapshot.phase, RecoveryPhase::Idle);
                assert!(!snapshot.has_pending_task);
                assert!(snapshot.is_manual_leave);
            }
        }

        assert!(transport.max_in_flight() <= 1);
        assert!(host.reload_count() <= exhaustions.count);
    });
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_invariants_hold_with_failing_transport(
        actions in prop::collection::vec(action(), 1..40)
    ) {
        run_sequence(actions, true);
    }

    #[test]
    fn prop_invariants_hold_with_working_transport(
        actions in prop::collection::vec(action(), 1..40)
    ) {
        run_sequence(actions, false);
    }
}
