//! Streaming actor
//!
//! A single tokio task runs the sampling loop and processes control
//! signals from the radio stack. Ticks are discrete: each one is scheduled
//! a delay after the previous, so two ticks never overlap, and commands
//! are only handled between ticks. That ordering is what prevents the
//! rearm race: an unsubscribe arriving while a tick is in flight is
//! processed before the deadline check, and the tick that eventually fires
//! sees the idle session and does not re-arm.
//!
//! # Example
//!
//! ```rust,ignore
//! use mixy_stream::{run_stream_actor, ParamStore, StreamCommand};
//! use std::sync::Arc;
//! use tokio::sync::mpsc;
//!
//! let params = Arc::new(ParamStore::new());
//! let (cmd_tx, cmd_rx) = mpsc::channel(64);
//! let (event_tx, event_rx) = mpsc::channel(256);
//!
//! tokio::spawn(run_stream_actor(reader, transport, params, cmd_rx, event_tx));
//! ```

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

use crate::engine::StreamEngine;
use crate::events::StreamEvent;
use crate::hardware::{PotReader, TransportSink};
use crate::params::ParamStore;
use crate::session::LinkSession;

/// Control signals forwarded to the streaming actor
///
/// The BLE glue translates its callbacks into these commands; the channel
/// hop is the race-free handoff from the radio stack's execution context
/// to the actor task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamCommand {
    /// Peer enabled notifications on the MIDI characteristic
    NotificationsEnabled,
    /// Peer disabled notifications
    NotificationsDisabled,
    /// Peer read the MIDI characteristic (legacy session-start path)
    CharacteristicRead,
    /// Peer wrote a configuration payload to the characteristic
    ConfigWrite(Vec<u8>),
    /// Stop the actor
    Shutdown,
}

/// Run the streaming actor until shutdown
///
/// Owns the engine and the link session. The parameter store is shared so
/// the BLE glue may also call [`ParamStore::apply_write`] directly from
/// its own context; `ConfigWrite` exists for glue that prefers to forward
/// the raw payload.
pub async fn run_stream_actor<R, T>(
    mut reader: R,
    mut transport: T,
    params: Arc<ParamStore>,
    mut command_rx: mpsc::Receiver<StreamCommand>,
    event_tx: mpsc::Sender<StreamEvent>,
) where
    R: PotReader,
    T: TransportSink,
{
    let mut engine = StreamEngine::new();
    let mut session = LinkSession::new();
    params.reset();

    let epoch = Instant::now();
    let mut next_tick: Option<Instant> = None;

    info!("stream actor started");

    loop {
        tokio::select! {
            cmd = command_rx.recv() => {
                let Some(cmd) = cmd else {
                    debug!("command channel closed");
                    break;
                };
                match cmd {
                    StreamCommand::NotificationsEnabled => {
                        if session.notifications_enabled() {
                            start_session(
                                &mut reader,
                                &mut transport,
                                &params,
                                &mut engine,
                                &mut session,
                                &event_tx,
                                epoch,
                            )
                            .await;
                            next_tick = Some(Instant::now());
                        }
                    }
                    StreamCommand::CharacteristicRead => {
                        if session.characteristic_read() {
                            start_session(
                                &mut reader,
                                &mut transport,
                                &params,
                                &mut engine,
                                &mut session,
                                &event_tx,
                                epoch,
                            )
                            .await;
                            next_tick = Some(Instant::now());
                        }
                    }
                    StreamCommand::NotificationsDisabled => {
                        session.notifications_disabled();
                        next_tick = None;
                        let _ = event_tx.send(StreamEvent::SessionStopped).await;
                    }
                    StreamCommand::ConfigWrite(payload) => {
                        params.apply_write(&payload);
                    }
                    StreamCommand::Shutdown => {
                        debug!("shutdown requested");
                        break;
                    }
                }
            }
            _ = sleep_until(next_tick.unwrap_or_else(Instant::now)), if next_tick.is_some() => {
                next_tick = run_tick(
                    &mut reader,
                    &mut transport,
                    &params,
                    &mut engine,
                    &mut session,
                    &event_tx,
                    epoch,
                )
                .await;
            }
        }
    }

    info!("stream actor stopped");
}

/// One-shot session initialization: snapshot all pots and send the batch
async fn start_session<R, T>(
    reader: &mut R,
    transport: &mut T,
    params: &ParamStore,
    engine: &mut StreamEngine,
    session: &mut LinkSession,
    event_tx: &mpsc::Sender<StreamEvent>,
    epoch: Instant,
) where
    R: PotReader,
    T: TransportSink,
{
    let _ = event_tx.send(StreamEvent::SessionStarted).await;

    adopt_params(params, engine, event_tx).await;

    let now_ms = epoch.elapsed().as_millis() as u64;
    match reader.read_all() {
        Ok(samples) => {
            let ts = session.next_timestamp();
            let packet = engine.begin_session(&samples, now_ms, ts);
            let pots = (packet.len() - 1) / 4;
            match transport.send(&packet) {
                Ok(()) => {
                    debug!(pots, bytes = packet.len(), "snapshot sent");
                    let _ = event_tx
                        .send(StreamEvent::SnapshotSent {
                            pots,
                            bytes: packet.len(),
                        })
                        .await;
                }
                Err(e) => {
                    warn!(error = %e, "snapshot send failed");
                    let _ = event_tx
                        .send(StreamEvent::SendFailed {
                            message: e.to_string(),
                        })
                        .await;
                }
            }
        }
        Err(e) => {
            // The snapshot is skipped but the session still starts; the
            // first ticks will emit the pots as changes instead
            warn!(error = %e, "pot read failed at session start");
            let _ = event_tx
                .send(StreamEvent::ReadFailed {
                    message: e.to_string(),
                })
                .await;
        }
    }
}

/// One tick: adopt params, sample, detect, transmit, pick the next delay
///
/// Returns the deadline for the next tick, or `None` to disarm when the
/// session went idle.
async fn run_tick<R, T>(
    reader: &mut R,
    transport: &mut T,
    params: &ParamStore,
    engine: &mut StreamEngine,
    session: &mut LinkSession,
    event_tx: &mpsc::Sender<StreamEvent>,
    epoch: Instant,
) -> Option<Instant>
where
    R: PotReader,
    T: TransportSink,
{
    adopt_params(params, engine, event_tx).await;

    let now_ms = epoch.elapsed().as_millis() as u64;

    match reader.read_all() {
        Ok(samples) => {
            for update in engine.detect_changes(&samples, now_ms) {
                let ts = session.next_timestamp();
                let packet = mixy_midi::encode_control_change(ts, update.controller, update.value);
                match transport.send(&packet) {
                    Ok(()) => {
                        let _ = event_tx
                            .send(StreamEvent::UpdateSent {
                                pot: update.pot,
                                controller: update.controller,
                                value: update.value,
                            })
                            .await;
                    }
                    Err(e) => {
                        // Dropped without retry; the snapshot entry stays
                        // committed and the next genuine movement re-offers
                        // the value
                        debug!(pot = update.pot, error = %e, "update send failed");
                        let _ = event_tx
                            .send(StreamEvent::SendFailed {
                                message: e.to_string(),
                            })
                            .await;
                    }
                }
            }
        }
        Err(e) => {
            // Transient hardware fault: this tick is a no-change tick, the
            // loop must keep running on its normal schedule
            warn!(error = %e, "pot read failed");
            let _ = event_tx
                .send(StreamEvent::ReadFailed {
                    message: e.to_string(),
                })
                .await;
        }
    }

    if !session.is_streaming() {
        return None;
    }

    Some(Instant::now() + engine.next_period(now_ms))
}

/// Consume a pending parameter update, if any, exactly once
async fn adopt_params(
    params: &ParamStore,
    engine: &mut StreamEngine,
    event_tx: &mpsc::Sender<StreamEvent>,
) {
    if let Some(p) = params.take_if_dirty() {
        debug!(?p, "adopting parameter update");
        engine.set_params(p);
        let _ = event_tx.send(StreamEvent::ParamsUpdated { params: p }).await;
    }
}
