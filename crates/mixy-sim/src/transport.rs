//! Simulated notification transport
//!
//! Captures every packet the engine hands off and models the peer's
//! subscription state: sends fail fast with `NotSubscribed` while the
//! simulated peer is not listening, matching the real notification
//! primitive's behavior.

use std::sync::{Arc, Mutex, MutexGuard};

use mixy_stream::{SendError, TransportSink};
use tracing::trace;

struct SimTransportState {
    subscribed: bool,
    sent: Vec<Vec<u8>>,
}

/// A transport sink that records sent packets
///
/// Clones share state; the actor sends through one handle while the test
/// inspects and drains through another.
#[derive(Clone)]
pub struct SimTransport {
    state: Arc<Mutex<SimTransportState>>,
}

impl SimTransport {
    /// Create a transport with no subscriber
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(SimTransportState {
                subscribed: false,
                sent: Vec::new(),
            })),
        }
    }

    /// Set whether the simulated peer is subscribed
    pub fn set_subscribed(&self, subscribed: bool) {
        self.lock().subscribed = subscribed;
    }

    /// Whether the simulated peer is subscribed
    pub fn is_subscribed(&self) -> bool {
        self.lock().subscribed
    }

    /// Number of packets captured so far
    pub fn sent_count(&self) -> usize {
        self.lock().sent.len()
    }

    /// Drain and return the captured packets
    pub fn take_sent(&self) -> Vec<Vec<u8>> {
        std::mem::take(&mut self.lock().sent)
    }

    fn lock(&self) -> MutexGuard<'_, SimTransportState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for SimTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl TransportSink for SimTransport {
    fn send(&mut self, packet: &[u8]) -> Result<(), SendError> {
        let mut state = self.lock();
        if !state.subscribed {
            return Err(SendError::NotSubscribed);
        }
        trace!(bytes = packet.len(), "sim transport captured packet");
        state.sent.push(packet.to_vec());
        Ok(())
    }
}
