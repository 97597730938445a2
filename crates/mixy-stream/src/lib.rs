//! Mixy Streaming Engine
//!
//! This crate provides the core streaming logic for the Mixy controller:
//! sampling six potentiometers, detecting which ones moved, and notifying the
//! subscribed peer with BLE-MIDI control-change packets at an adaptive rate.
//!
//! # Architecture
//!
//! The engine is split into a synchronous core and a thin async actor:
//!
//! - [`StreamEngine`] holds the previous-values snapshot and the active
//!   parameters, and decides per tick which pots changed and how long to
//!   wait before the next tick. It is pure over `(samples, now_ms)` and
//!   fully unit-testable.
//! - [`run_stream_actor`] owns the engine and the [`LinkSession`] on a single
//!   tokio task. Subscription signals and configuration writes arrive as
//!   [`StreamCommand`]s over a channel, which serializes the radio stack's
//!   callback context against the sampling loop without shared locks.
//!
//! # Dual-speed scheduling
//!
//! While any pot moved within the last `fast_retention_ms`, the loop runs at
//! `fast_period_ms` for low-latency updates. Once the controls settle it
//! falls back to `slow_period_ms` to save battery; the slow poll still
//! catches changes, just with more latency. All four knobs are remotely
//! tunable through [`ParamStore::apply_write`].
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use mixy_stream::{run_stream_actor, ParamStore, StreamCommand};
//! use tokio::sync::mpsc;
//!
//! # async fn demo(reader: impl mixy_stream::PotReader + 'static,
//! #               transport: impl mixy_stream::TransportSink + 'static) {
//! let params = Arc::new(ParamStore::new());
//! let (cmd_tx, cmd_rx) = mpsc::channel(64);
//! let (event_tx, mut event_rx) = mpsc::channel(256);
//!
//! tokio::spawn(run_stream_actor(reader, transport, params, cmd_rx, event_tx));
//!
//! // The BLE glue forwards subscription signals as commands
//! cmd_tx.send(StreamCommand::NotificationsEnabled).await.unwrap();
//! # }
//! ```

pub mod actor;
pub mod engine;
pub mod error;
pub mod events;
pub mod hardware;
pub mod mapping;
pub mod params;
pub mod session;

pub use actor::{run_stream_actor, StreamCommand};
pub use engine::{PotUpdate, StreamEngine};
pub use error::{HardwareError, SendError};
pub use events::StreamEvent;
pub use hardware::{PotReader, TransportSink};
pub use mapping::{
    controller_for_pot, normalize, pot_is_connected, POT_COUNT, RAW_FULL_SCALE, UNCONNECTED_POT,
};
pub use params::{ParamStore, StreamParams, CONFIG_WRITE_LEN};
pub use session::{LinkSession, LinkState};
