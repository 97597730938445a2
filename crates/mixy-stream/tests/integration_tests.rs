//! Integration tests for the Mixy streaming engine
//!
//! These tests verify end-to-end behavior of the streaming actor including:
//! - Session start snapshot on subscribe and on legacy first-read
//! - Change detection thresholds and the unconnected-pot exclusion
//! - Dual-speed period selection
//! - Remote configuration writes and the dirty-latch handoff
//! - Non-fatal hardware and transport failures

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use mixy_stream::{
    controller_for_pot, normalize, run_stream_actor, HardwareError, ParamStore, PotReader,
    SendError, StreamCommand, StreamEvent, StreamParams, TransportSink, POT_COUNT,
};
use tokio::sync::mpsc;

// ============================================================================
// Helper Functions
// ============================================================================

mod helpers {
    use super::*;

    /// Scriptable pot reader shared between the test and the actor
    #[derive(Clone)]
    pub struct ScriptedPots {
        values: Arc<Mutex<[u16; POT_COUNT]>>,
        failing: Arc<AtomicBool>,
    }

    impl ScriptedPots {
        pub fn new(initial: [u16; POT_COUNT]) -> Self {
            Self {
                values: Arc::new(Mutex::new(initial)),
                failing: Arc::new(AtomicBool::new(false)),
            }
        }

        pub fn set(&self, pot: usize, raw: u16) {
            self.values.lock().unwrap()[pot] = raw;
        }

        pub fn set_failing(&self, failing: bool) {
            self.failing.store(failing, Ordering::SeqCst);
        }
    }

    impl PotReader for ScriptedPots {
        fn read_all(&mut self) -> Result<[u16; POT_COUNT], HardwareError> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(HardwareError::ConversionFailed("injected".into()));
            }
            Ok(*self.values.lock().unwrap())
        }
    }

    /// Transport that captures sent packets and can refuse sends
    #[derive(Clone)]
    pub struct CapturingTransport {
        sent: Arc<Mutex<Vec<Vec<u8>>>>,
        ready: Arc<AtomicBool>,
    }

    impl CapturingTransport {
        pub fn new() -> Self {
            Self {
                sent: Arc::new(Mutex::new(Vec::new())),
                ready: Arc::new(AtomicBool::new(true)),
            }
        }

        pub fn set_ready(&self, ready: bool) {
            self.ready.store(ready, Ordering::SeqCst);
        }

        pub fn sent(&self) -> Vec<Vec<u8>> {
            self.sent.lock().unwrap().clone()
        }
    }

    impl TransportSink for CapturingTransport {
        fn send(&mut self, packet: &[u8]) -> Result<(), SendError> {
            if !self.ready.load(Ordering::SeqCst) {
                return Err(SendError::NotSubscribed);
            }
            self.sent.lock().unwrap().push(packet.to_vec());
            Ok(())
        }
    }

    /// Everything a test needs to drive the actor
    pub struct Harness {
        pub pots: ScriptedPots,
        pub transport: CapturingTransport,
        pub params: Arc<ParamStore>,
        pub cmd_tx: mpsc::Sender<StreamCommand>,
        pub event_rx: mpsc::Receiver<StreamEvent>,
    }

    pub fn spawn_actor(initial: [u16; POT_COUNT]) -> Harness {
        let pots = ScriptedPots::new(initial);
        let transport = CapturingTransport::new();
        let params = Arc::new(ParamStore::new());
        let (cmd_tx, cmd_rx) = mpsc::channel(64);
        let (event_tx, event_rx) = mpsc::channel(256);

        tokio::spawn(run_stream_actor(
            pots.clone(),
            transport.clone(),
            params.clone(),
            cmd_rx,
            event_tx,
        ));

        Harness {
            pots,
            transport,
            params,
            cmd_tx,
            event_rx,
        }
    }

    /// Receive the next event, failing the test on a stalled stream
    pub async fn next_event(rx: &mut mpsc::Receiver<StreamEvent>) -> StreamEvent {
        tokio::time::timeout(Duration::from_secs(30), rx.recv())
            .await
            .expect("timed out waiting for event")
            .expect("event channel closed")
    }

    /// Skip events until one matches the predicate
    pub async fn wait_for(
        rx: &mut mpsc::Receiver<StreamEvent>,
        mut pred: impl FnMut(&StreamEvent) -> bool,
    ) -> StreamEvent {
        loop {
            let event = next_event(rx).await;
            if pred(&event) {
                return event;
            }
        }
    }

    /// Assert that no event matching the predicate arrives within the window
    pub async fn assert_no_event(
        rx: &mut mpsc::Receiver<StreamEvent>,
        window: Duration,
        pred: impl Fn(&StreamEvent) -> bool,
    ) {
        let outcome = tokio::time::timeout(window, async {
            loop {
                match rx.recv().await {
                    Some(event) if pred(&event) => return event,
                    Some(_) => continue,
                    None => std::future::pending().await,
                }
            }
        })
        .await;
        assert!(outcome.is_err(), "unexpected event: {:?}", outcome);
    }
}

use helpers::{assert_no_event, next_event, spawn_actor, wait_for};

// ============================================================================
// Session Lifecycle
// ============================================================================

#[tokio::test(start_paused = true)]
async fn subscribe_sends_session_start_and_snapshot() {
    let mut h = spawn_actor([100, 200, 300, 400, 500, 600]);

    h.cmd_tx
        .send(StreamCommand::NotificationsEnabled)
        .await
        .unwrap();

    assert_eq!(next_event(&mut h.event_rx).await, StreamEvent::SessionStarted);
    let snapshot = next_event(&mut h.event_rx).await;
    assert_eq!(
        snapshot,
        StreamEvent::SnapshotSent {
            pots: POT_COUNT - 1,
            bytes: 1 + 4 * (POT_COUNT - 1),
        }
    );

    // The captured packet holds every connected pot's normalized value
    let sent = h.transport.sent();
    assert_eq!(sent.len(), 1);
    let packet = &sent[0];
    assert_eq!(packet.len(), 1 + 4 * (POT_COUNT - 1));
    assert!(packet[0] & 0x80 != 0);

    let controllers: Vec<u8> = packet[1..].chunks(4).map(|g| g[2]).collect();
    assert_eq!(controllers, vec![4, 2, 0, 3, 1]);
    let values: Vec<u8> = packet[1..].chunks(4).map(|g| g[3]).collect();
    assert_eq!(
        values,
        vec![
            normalize(100),
            normalize(200),
            normalize(300),
            normalize(500),
            normalize(600),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn first_read_starts_session_exactly_once() {
    let mut h = spawn_actor([0; POT_COUNT]);

    h.cmd_tx
        .send(StreamCommand::CharacteristicRead)
        .await
        .unwrap();
    h.cmd_tx
        .send(StreamCommand::CharacteristicRead)
        .await
        .unwrap();

    assert_eq!(next_event(&mut h.event_rx).await, StreamEvent::SessionStarted);
    wait_for(&mut h.event_rx, |e| {
        matches!(e, StreamEvent::SnapshotSent { .. })
    })
    .await;

    // The second read must not re-trigger the snapshot
    assert_no_event(&mut h.event_rx, Duration::from_secs(2), |e| {
        matches!(
            e,
            StreamEvent::SessionStarted | StreamEvent::SnapshotSent { .. }
        )
    })
    .await;
}

#[tokio::test(start_paused = true)]
async fn unsubscribe_disarms_the_loop() {
    let mut h = spawn_actor([0; POT_COUNT]);

    h.cmd_tx
        .send(StreamCommand::NotificationsEnabled)
        .await
        .unwrap();
    wait_for(&mut h.event_rx, |e| {
        matches!(e, StreamEvent::SnapshotSent { .. })
    })
    .await;

    h.cmd_tx
        .send(StreamCommand::NotificationsDisabled)
        .await
        .unwrap();
    wait_for(&mut h.event_rx, |e| matches!(e, StreamEvent::SessionStopped)).await;

    // A big movement while idle must produce no traffic
    h.pots.set(0, 800);
    assert_no_event(&mut h.event_rx, Duration::from_secs(5), |e| e.is_traffic()).await;
}

#[tokio::test(start_paused = true)]
async fn resubscribe_starts_a_fresh_session() {
    let mut h = spawn_actor([0; POT_COUNT]);

    h.cmd_tx
        .send(StreamCommand::NotificationsEnabled)
        .await
        .unwrap();
    wait_for(&mut h.event_rx, |e| {
        matches!(e, StreamEvent::SnapshotSent { .. })
    })
    .await;

    h.cmd_tx
        .send(StreamCommand::NotificationsDisabled)
        .await
        .unwrap();
    wait_for(&mut h.event_rx, |e| matches!(e, StreamEvent::SessionStopped)).await;

    h.cmd_tx
        .send(StreamCommand::NotificationsEnabled)
        .await
        .unwrap();
    assert_eq!(next_event(&mut h.event_rx).await, StreamEvent::SessionStarted);
    wait_for(&mut h.event_rx, |e| {
        matches!(e, StreamEvent::SnapshotSent { .. })
    })
    .await;
    assert_eq!(h.transport.sent().len(), 2);
}

// ============================================================================
// Change Detection & Transmission
// ============================================================================

#[tokio::test(start_paused = true)]
async fn movement_past_threshold_is_transmitted() {
    let mut h = spawn_actor([0; POT_COUNT]);

    h.cmd_tx
        .send(StreamCommand::NotificationsEnabled)
        .await
        .unwrap();
    wait_for(&mut h.event_rx, |e| {
        matches!(e, StreamEvent::SnapshotSent { .. })
    })
    .await;

    h.pots.set(0, 50);
    let update = wait_for(&mut h.event_rx, |e| {
        matches!(e, StreamEvent::UpdateSent { .. })
    })
    .await;
    assert_eq!(
        update,
        StreamEvent::UpdateSent {
            pot: 0,
            controller: controller_for_pot(0),
            value: normalize(50),
        }
    );
}

#[tokio::test(start_paused = true)]
async fn movement_at_threshold_is_not_transmitted() {
    let mut h = spawn_actor([0; POT_COUNT]);

    h.cmd_tx
        .send(StreamCommand::NotificationsEnabled)
        .await
        .unwrap();
    wait_for(&mut h.event_rx, |e| {
        matches!(e, StreamEvent::SnapshotSent { .. })
    })
    .await;

    // Default minimum_change is 10; a delta of exactly 10 must not trigger
    h.pots.set(1, 10);
    assert_no_event(&mut h.event_rx, Duration::from_secs(5), |e| e.is_traffic()).await;
}

#[tokio::test(start_paused = true)]
async fn unconnected_pot_is_never_transmitted() {
    let mut h = spawn_actor([0; POT_COUNT]);

    h.cmd_tx
        .send(StreamCommand::NotificationsEnabled)
        .await
        .unwrap();
    wait_for(&mut h.event_rx, |e| {
        matches!(e, StreamEvent::SnapshotSent { .. })
    })
    .await;

    h.pots.set(mixy_stream::UNCONNECTED_POT, 900);
    assert_no_event(&mut h.event_rx, Duration::from_secs(5), |e| e.is_traffic()).await;
}

// ============================================================================
// Configuration Writes
// ============================================================================

#[tokio::test(start_paused = true)]
async fn config_write_is_adopted_on_the_next_tick() {
    let mut h = spawn_actor([0; POT_COUNT]);

    h.cmd_tx
        .send(StreamCommand::NotificationsEnabled)
        .await
        .unwrap();
    wait_for(&mut h.event_rx, |e| {
        matches!(e, StreamEvent::SnapshotSent { .. })
    })
    .await;

    let retuned = StreamParams {
        minimum_change: 10,
        slow_period_ms: 80,
        fast_period_ms: 30,
        fast_retention_ms: 500,
    };
    h.cmd_tx
        .send(StreamCommand::ConfigWrite(retuned.to_le_bytes().to_vec()))
        .await
        .unwrap();

    let adopted = wait_for(&mut h.event_rx, |e| {
        matches!(e, StreamEvent::ParamsUpdated { .. })
    })
    .await;
    assert_eq!(adopted, StreamEvent::ParamsUpdated { params: retuned });

    // The latch was consumed; no second adoption without a new write
    assert_no_event(&mut h.event_rx, Duration::from_secs(2), |e| {
        matches!(e, StreamEvent::ParamsUpdated { .. })
    })
    .await;
}

#[tokio::test(start_paused = true)]
async fn short_config_write_changes_nothing() {
    let mut h = spawn_actor([0; POT_COUNT]);

    h.cmd_tx
        .send(StreamCommand::NotificationsEnabled)
        .await
        .unwrap();
    wait_for(&mut h.event_rx, |e| {
        matches!(e, StreamEvent::SnapshotSent { .. })
    })
    .await;

    h.cmd_tx
        .send(StreamCommand::ConfigWrite(vec![10, 0, 80, 0, 30, 0, 244]))
        .await
        .unwrap();

    assert_no_event(&mut h.event_rx, Duration::from_secs(2), |e| {
        matches!(e, StreamEvent::ParamsUpdated { .. })
    })
    .await;
    assert_eq!(h.params.current(), StreamParams::default());
}

#[tokio::test(start_paused = true)]
async fn direct_store_write_is_adopted_too() {
    let mut h = spawn_actor([0; POT_COUNT]);

    h.cmd_tx
        .send(StreamCommand::NotificationsEnabled)
        .await
        .unwrap();
    wait_for(&mut h.event_rx, |e| {
        matches!(e, StreamEvent::SnapshotSent { .. })
    })
    .await;

    // BLE glue writing the shared store from its own context
    let retuned = StreamParams {
        minimum_change: 5,
        ..Default::default()
    };
    h.params.apply_write(&retuned.to_le_bytes());

    let adopted = wait_for(&mut h.event_rx, |e| {
        matches!(e, StreamEvent::ParamsUpdated { .. })
    })
    .await;
    assert_eq!(adopted, StreamEvent::ParamsUpdated { params: retuned });
}

// ============================================================================
// Failure Semantics
// ============================================================================

#[tokio::test(start_paused = true)]
async fn read_failure_does_not_stop_the_loop() {
    let mut h = spawn_actor([0; POT_COUNT]);

    h.cmd_tx
        .send(StreamCommand::NotificationsEnabled)
        .await
        .unwrap();
    wait_for(&mut h.event_rx, |e| {
        matches!(e, StreamEvent::SnapshotSent { .. })
    })
    .await;

    h.pots.set_failing(true);
    wait_for(&mut h.event_rx, |e| {
        matches!(e, StreamEvent::ReadFailed { .. })
    })
    .await;

    // Recover: the loop must still be running and pick up the movement
    h.pots.set_failing(false);
    h.pots.set(0, 500);
    wait_for(&mut h.event_rx, |e| {
        matches!(e, StreamEvent::UpdateSent { pot: 0, .. })
    })
    .await;
}

#[tokio::test(start_paused = true)]
async fn send_failure_drops_the_packet_without_retry() {
    let mut h = spawn_actor([0; POT_COUNT]);

    h.cmd_tx
        .send(StreamCommand::NotificationsEnabled)
        .await
        .unwrap();
    wait_for(&mut h.event_rx, |e| {
        matches!(e, StreamEvent::SnapshotSent { .. })
    })
    .await;

    h.transport.set_ready(false);
    h.pots.set(0, 500);
    wait_for(&mut h.event_rx, |e| {
        matches!(e, StreamEvent::SendFailed { .. })
    })
    .await;

    // The snapshot entry was committed anyway: restoring the transport
    // without moving the pot must not resend the stale value
    h.transport.set_ready(true);
    assert_no_event(&mut h.event_rx, Duration::from_secs(5), |e| e.is_traffic()).await;

    // A fresh movement streams normally again
    h.pots.set(0, 700);
    wait_for(&mut h.event_rx, |e| {
        matches!(e, StreamEvent::UpdateSent { pot: 0, .. })
    })
    .await;
}

// ============================================================================
// Property-Based Tests
// ============================================================================

mod proptest_tests {
    use super::*;
    use mixy_stream::{StreamEngine, UNCONNECTED_POT};
    use proptest::prelude::*;

    fn samples() -> impl Strategy<Value = [u16; POT_COUNT]> {
        prop::array::uniform6(0u16..1024)
    }

    proptest! {
        #[test]
        fn change_emitted_iff_delta_strictly_exceeds_threshold(
            prev in samples(),
            current in samples(),
            threshold in 0u16..512,
        ) {
            let mut engine = StreamEngine::new();
            engine.set_params(StreamParams {
                minimum_change: threshold,
                ..Default::default()
            });
            engine.begin_session(&prev, 0, mixy_midi::MidiTimestamp::new(0));

            let updates = engine.detect_changes(&current, 1);

            for pot in 0..POT_COUNT {
                let expected = pot != UNCONNECTED_POT
                    && current[pot].abs_diff(prev[pot]) > threshold;
                let emitted = updates.iter().any(|u| u.pot == pot);
                prop_assert_eq!(emitted, expected, "pot {}", pot);
            }
        }

        #[test]
        fn unconnected_pot_absent_for_any_input(
            prev in samples(),
            current in samples(),
        ) {
            let mut engine = StreamEngine::new();
            engine.begin_session(&prev, 0, mixy_midi::MidiTimestamp::new(0));

            let updates = engine.detect_changes(&current, 1);
            prop_assert!(updates.iter().all(|u| u.pot != UNCONNECTED_POT));
        }

        #[test]
        fn period_selection_matches_retention_window(
            last_change in 0u64..1_000_000,
            elapsed in 0u64..10_000,
            retention in 1u16..5_000,
        ) {
            let mut engine = StreamEngine::new();
            let params = StreamParams {
                fast_retention_ms: retention,
                ..Default::default()
            };
            engine.set_params(params);

            // Force a change at last_change so the instant is stamped
            engine.detect_changes(&[500, 0, 0, 0, 0, 0], last_change);

            let period = engine.next_period(last_change + elapsed);
            let expected = if elapsed > u64::from(retention) {
                Duration::from_millis(u64::from(params.slow_period_ms))
            } else {
                Duration::from_millis(u64::from(params.fast_period_ms))
            };
            prop_assert_eq!(period, expected);
        }

        #[test]
        fn transmitted_values_always_legal(current in samples()) {
            let mut engine = StreamEngine::new();
            let updates = engine.detect_changes(&current, 0);
            for update in updates {
                prop_assert!(update.value <= 127);
                prop_assert!(update.controller <= 127);
            }
        }
    }
}
