//! Link session state machine
//!
//! Tracks whether the peer is subscribed to streaming and gates all
//! outbound traffic. The session also owns the outbound BLE-MIDI timestamp
//! counter, stamping every packet sent during the session.
//!
//! A session starts either when the peer enables notifications or, for
//! legacy peers that trigger the characteristic's read accessor without
//! formally subscribing first, on the first inbound read. Whichever signal
//! arrives first wins; a `session_started` latch makes the start signal
//! one-shot per session.

use mixy_midi::MidiTimestamp;
use tracing::debug;

/// Whether the peer is subscribed to streaming notifications
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkState {
    /// No active subscription; the scheduler is disarmed
    #[default]
    Idle,
    /// Peer subscribed; the scheduler runs
    Streaming,
}

/// Session state for one peer link
///
/// Transitions are driven only by subscription and read signals from the
/// transport, never by the scheduler.
#[derive(Debug, Default)]
pub struct LinkSession {
    state: LinkState,
    session_started: bool,
    timestamp: u16,
}

impl LinkSession {
    /// Create a session in the idle state
    pub fn new() -> Self {
        Self::default()
    }

    /// Current link state
    pub fn state(&self) -> LinkState {
        self.state
    }

    /// Whether the peer is currently subscribed
    pub fn is_streaming(&self) -> bool {
        self.state == LinkState::Streaming
    }

    /// Peer enabled notifications
    ///
    /// Returns `true` if this signal started the session (at most once per
    /// session); the caller must then send the snapshot and arm the
    /// scheduler.
    pub fn notifications_enabled(&mut self) -> bool {
        debug!("MIDI notifications enabled");
        self.mark_started()
    }

    /// Peer disabled notifications; the session ends and the start latch
    /// resets so a resubscription starts a fresh session
    pub fn notifications_disabled(&mut self) {
        debug!("MIDI notifications disabled");
        self.state = LinkState::Idle;
        self.session_started = false;
    }

    /// Peer read the MIDI characteristic
    ///
    /// Legacy compatibility path: some peers read the characteristic
    /// without subscribing first, and expect streaming to start anyway.
    /// Returns `true` if this read started the session.
    pub fn characteristic_read(&mut self) -> bool {
        self.mark_started()
    }

    /// Take the next outbound timestamp, advancing the counter
    ///
    /// The counter increments once per packet and wraps inside
    /// [`MidiTimestamp`]'s 13-bit domain.
    pub fn next_timestamp(&mut self) -> MidiTimestamp {
        let ts = MidiTimestamp::new(self.timestamp);
        self.timestamp = self.timestamp.wrapping_add(1);
        ts
    }

    fn mark_started(&mut self) -> bool {
        self.state = LinkState::Streaming;
        if self.session_started {
            false
        } else {
            self.session_started = true;
            debug!("MIDI session started");
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_idle() {
        let session = LinkSession::new();
        assert_eq!(session.state(), LinkState::Idle);
        assert!(!session.is_streaming());
    }

    #[test]
    fn test_enable_starts_session_once() {
        let mut session = LinkSession::new();
        assert!(session.notifications_enabled());
        assert!(session.is_streaming());

        // Second enable is not a new session
        assert!(!session.notifications_enabled());
    }

    #[test]
    fn test_first_read_starts_session() {
        let mut session = LinkSession::new();
        assert!(session.characteristic_read());
        assert!(session.is_streaming());
        assert!(!session.characteristic_read());
    }

    #[test]
    fn test_read_after_enable_does_not_restart() {
        let mut session = LinkSession::new();
        assert!(session.notifications_enabled());
        assert!(!session.characteristic_read());
    }

    #[test]
    fn test_disable_resets_start_latch() {
        let mut session = LinkSession::new();
        assert!(session.notifications_enabled());

        session.notifications_disabled();
        assert!(!session.is_streaming());

        // Resubscription is a fresh session
        assert!(session.notifications_enabled());
    }

    #[test]
    fn test_timestamps_increase_and_wrap() {
        let mut session = LinkSession::new();
        let first = session.next_timestamp();
        let second = session.next_timestamp();
        assert_eq!(first.value(), 0);
        assert_eq!(second.value(), 1);

        for _ in 0..(1 << 13) - 2 {
            session.next_timestamp();
        }
        assert_eq!(session.next_timestamp().value(), 0);
    }
}
