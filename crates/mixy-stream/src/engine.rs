//! Change-detection engine
//!
//! The synchronous core of the streaming loop. The engine owns the
//! previous-values snapshot and the active parameter set, and is pure over
//! `(samples, now_ms)`: the actor feeds it samples and the current
//! monotonic time, and it answers with the updates to transmit and the
//! delay before the next tick. Keeping the core free of I/O and clocks is
//! what makes the scheduling properties unit-testable.

use std::time::Duration;

use mixy_midi::{BatchEncoder, MidiTimestamp};
use tracing::trace;

use crate::mapping::{controller_for_pot, normalize, pot_is_connected, POT_COUNT};
use crate::params::StreamParams;

/// One pot change ready to be encoded and transmitted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PotUpdate {
    /// Physical pot index
    pub pot: usize,
    /// MIDI controller number
    pub controller: u8,
    /// Normalized 7-bit value
    pub value: u8,
}

/// Sampling and change-detection state
///
/// Owns the previous-values snapshot and the last-change instant; neither
/// is shared outside the engine.
#[derive(Debug)]
pub struct StreamEngine {
    params: StreamParams,
    prev_values: [u16; POT_COUNT],
    last_change_ms: u64,
}

impl StreamEngine {
    /// Create an engine with the startup default parameters
    pub fn new() -> Self {
        Self {
            params: StreamParams::default(),
            prev_values: [0; POT_COUNT],
            last_change_ms: 0,
        }
    }

    /// Parameters currently in effect
    pub fn params(&self) -> StreamParams {
        self.params
    }

    /// Adopt a parameter update taken from the store
    pub fn set_params(&mut self, params: StreamParams) {
        self.params = params;
    }

    /// Initialize a session and build the batch snapshot packet
    ///
    /// Seeds the previous-values snapshot with the samples just read and
    /// resets the last-change instant, then encodes every connected pot
    /// into one batch packet so the peer gets a full picture of the
    /// controls the moment it subscribes.
    pub fn begin_session(
        &mut self,
        samples: &[u16; POT_COUNT],
        now_ms: u64,
        ts: MidiTimestamp,
    ) -> Vec<u8> {
        self.prev_values = *samples;
        self.last_change_ms = now_ms;

        let mut batch = BatchEncoder::with_capacity(ts, POT_COUNT - 1);
        for pot in 0..POT_COUNT {
            if !pot_is_connected(pot) {
                continue;
            }
            batch.push(controller_for_pot(pot), normalize(samples[pot]));
        }
        batch.finish()
    }

    /// Run change detection over one tick's samples
    ///
    /// A pot is emitted iff its raw delta strictly exceeds
    /// `minimum_change`; a delta exactly at the threshold does not
    /// trigger. Emitted pots have their snapshot entry committed in the
    /// same pass, and any emission stamps the last-change instant.
    pub fn detect_changes(&mut self, samples: &[u16; POT_COUNT], now_ms: u64) -> Vec<PotUpdate> {
        let mut updates = Vec::new();

        for pot in 0..POT_COUNT {
            if !pot_is_connected(pot) {
                continue;
            }
            let current = samples[pot];
            if current.abs_diff(self.prev_values[pot]) > self.params.minimum_change {
                self.prev_values[pot] = current;
                updates.push(PotUpdate {
                    pot,
                    controller: controller_for_pot(pot),
                    value: normalize(current),
                });
            }
        }

        if !updates.is_empty() {
            self.last_change_ms = now_ms;
            trace!(changed = updates.len(), "pot changes detected");
        }

        updates
    }

    /// Delay before the next tick
    ///
    /// Fast period while a change happened within the retention window,
    /// slow period once the elapsed time strictly exceeds it. Elapsed time
    /// exactly equal to the retention still selects the fast period.
    pub fn next_period(&self, now_ms: u64) -> Duration {
        let elapsed = now_ms.saturating_sub(self.last_change_ms);
        if elapsed > u64::from(self.params.fast_retention_ms) {
            Duration::from_millis(u64::from(self.params.slow_period_ms))
        } else {
            Duration::from_millis(u64::from(self.params.fast_period_ms))
        }
    }

    /// The previous-values snapshot (test observability)
    pub fn previous_values(&self) -> &[u16; POT_COUNT] {
        &self.prev_values
    }

    /// Monotonic instant of the most recent detected change
    pub fn last_change_ms(&self) -> u64 {
        self.last_change_ms
    }
}

impl Default for StreamEngine {
    fn default() -> Self {
        Self::new()
    }
}
