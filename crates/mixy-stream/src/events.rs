//! Unified event stream for the streaming actor
//!
//! Everything the actor does (session lifecycle, transmitted updates,
//! non-fatal failures) is emitted through a single event channel, so one
//! observer sees all activity in order.

use crate::params::StreamParams;

/// Events emitted by the streaming actor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// A peer session started (subscription or first read)
    SessionStarted,

    /// The peer unsubscribed; the scheduler is disarmed
    SessionStopped,

    /// The post-subscription batch snapshot was sent
    SnapshotSent {
        /// Number of pots encoded in the batch
        pots: usize,
        /// Packet size in bytes
        bytes: usize,
    },

    /// A single-update packet was sent for one pot
    UpdateSent {
        /// Physical pot index
        pot: usize,
        /// MIDI controller number it was reported as
        controller: u8,
        /// Normalized 7-bit value
        value: u8,
    },

    /// A pending configuration write was adopted by the scheduler
    ParamsUpdated {
        /// The parameters now in effect
        params: StreamParams,
    },

    /// A pot read failed; the tick was treated as no-change
    ReadFailed {
        /// Error description
        message: String,
    },

    /// A packet could not be notified; it is dropped without retry
    SendFailed {
        /// Error description
        message: String,
    },
}

impl StreamEvent {
    /// Check if this event represents transmitted traffic
    pub fn is_traffic(&self) -> bool {
        matches!(
            self,
            StreamEvent::SnapshotSent { .. } | StreamEvent::UpdateSent { .. }
        )
    }

    /// Check if this event represents a non-fatal failure
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            StreamEvent::ReadFailed { .. } | StreamEvent::SendFailed { .. }
        )
    }

    /// Get the pot index if this event is tied to a specific pot
    pub fn pot(&self) -> Option<usize> {
        match self {
            StreamEvent::UpdateSent { pot, .. } => Some(*pot),
            _ => None,
        }
    }
}
