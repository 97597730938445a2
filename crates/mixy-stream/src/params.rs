//! Remotely tunable stream parameters
//!
//! The peer can retune the change threshold and the scheduler periods at
//! runtime by writing an 8-byte payload to the MIDI characteristic. The
//! write path runs on the radio stack's callback context while the
//! scheduler consumes updates from its own task, so the handoff goes
//! through a mutex-guarded dirty latch with a single-consumer contract.

use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Minimum accepted length of a configuration write payload
pub const CONFIG_WRITE_LEN: usize = 8;

/// Tunable thresholds and periods for the streaming loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamParams {
    /// Raw-count delta a pot must exceed (strictly) to be transmitted
    pub minimum_change: u16,
    /// Poll period while the controls have settled (ms)
    pub slow_period_ms: u16,
    /// Poll period while a control moved recently (ms)
    pub fast_period_ms: u16,
    /// How long after the last change the fast period is retained (ms)
    pub fast_retention_ms: u16,
}

impl Default for StreamParams {
    fn default() -> Self {
        Self {
            minimum_change: 10,
            slow_period_ms: 500,
            fast_period_ms: 80,
            fast_retention_ms: 1000,
        }
    }
}

impl StreamParams {
    /// Parse a configuration write payload
    ///
    /// Four little-endian u16 fields in fixed order: minimum change, slow
    /// period, fast period, fast retention. Returns `None` for payloads
    /// shorter than [`CONFIG_WRITE_LEN`]; trailing bytes are ignored.
    pub fn from_le_bytes(payload: &[u8]) -> Option<Self> {
        if payload.len() < CONFIG_WRITE_LEN {
            return None;
        }
        Some(Self {
            minimum_change: u16::from_le_bytes([payload[0], payload[1]]),
            slow_period_ms: u16::from_le_bytes([payload[2], payload[3]]),
            fast_period_ms: u16::from_le_bytes([payload[4], payload[5]]),
            fast_retention_ms: u16::from_le_bytes([payload[6], payload[7]]),
        })
    }

    /// Encode as a configuration write payload
    pub fn to_le_bytes(&self) -> [u8; CONFIG_WRITE_LEN] {
        let mut buf = [0u8; CONFIG_WRITE_LEN];
        buf[0..2].copy_from_slice(&self.minimum_change.to_le_bytes());
        buf[2..4].copy_from_slice(&self.slow_period_ms.to_le_bytes());
        buf[4..6].copy_from_slice(&self.fast_period_ms.to_le_bytes());
        buf[6..8].copy_from_slice(&self.fast_retention_ms.to_le_bytes());
        buf
    }

    /// Whether the fast period exceeds the slow period
    ///
    /// Inverted periods are accepted as written (the peer owns its tuning)
    /// but worth flagging in the log.
    pub fn periods_inverted(&self) -> bool {
        self.fast_period_ms > self.slow_period_ms
    }
}

struct ParamCell {
    params: StreamParams,
    dirty: bool,
}

/// Cross-context holder for the stream parameters
///
/// Writers (the BLE glue) call [`ParamStore::apply_write`] from the radio
/// callback context; the scheduler calls [`ParamStore::take_if_dirty`] once
/// per tick from its own task. The dirty flag is consumed exactly once per
/// change so a parameter update is adopted at the next decision point and
/// never relatched redundantly.
pub struct ParamStore {
    cell: Mutex<ParamCell>,
}

impl ParamStore {
    /// Create a store holding the startup defaults, not dirty
    pub fn new() -> Self {
        Self {
            cell: Mutex::new(ParamCell {
                params: StreamParams::default(),
                dirty: false,
            }),
        }
    }

    /// Apply a configuration write from the peer
    ///
    /// Payloads shorter than [`CONFIG_WRITE_LEN`] are silently ignored, a
    /// deliberate tolerance for partial writes; nothing is surfaced to the
    /// writer either way.
    pub fn apply_write(&self, payload: &[u8]) {
        let Some(params) = StreamParams::from_le_bytes(payload) else {
            debug!(len = payload.len(), "ignoring short config write");
            return;
        };

        if params.periods_inverted() {
            warn!(
                fast_ms = params.fast_period_ms,
                slow_ms = params.slow_period_ms,
                "config write inverts fast/slow periods; applying as written"
            );
        }

        let mut cell = self.lock();
        cell.params = params;
        cell.dirty = true;
        debug!(?params, "config write applied");
    }

    /// Consume the pending update, if any
    ///
    /// Returns the parameters and clears the dirty flag only if a write
    /// landed since the last call; otherwise the caller keeps its cached
    /// copy. At most one consumer is expected.
    pub fn take_if_dirty(&self) -> Option<StreamParams> {
        let mut cell = self.lock();
        if cell.dirty {
            cell.dirty = false;
            Some(cell.params)
        } else {
            None
        }
    }

    /// Current parameters without touching the dirty flag
    pub fn current(&self) -> StreamParams {
        self.lock().params
    }

    /// Restore the startup defaults and clear any pending update
    pub fn reset(&self) {
        let mut cell = self.lock();
        cell.params = StreamParams::default();
        cell.dirty = false;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ParamCell> {
        // A poisoned lock only means a writer panicked mid-copy; the cell
        // contents are plain data and still usable
        self.cell.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for ParamStore {
    fn default() -> Self {
        Self::new()
    }
}
