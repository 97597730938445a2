//! Collaborator traits for the hardware and transport seams
//!
//! The engine never touches the ADC or the radio stack directly; both sit
//! behind traits so the loop runs identically against real peripherals, the
//! simulation layer, and test fakes.

use crate::error::{HardwareError, SendError};
use crate::mapping::POT_COUNT;

/// Analog front-end: reads one sample per pot through the mux
///
/// A read may block the calling task for the duration of a hardware
/// conversion (bounded, small, deterministic); this is the only blocking
/// point in the streaming loop, and no locks are held across it.
pub trait PotReader: Send {
    /// Read all pot channels in physical index order
    fn read_all(&mut self) -> Result<[u16; POT_COUNT], HardwareError>;
}

/// Radio notification primitive
///
/// Fire-and-forget: a packet is not retained after handoff and no
/// acknowledgment is tracked. `send` fails fast when the peer is not
/// subscribed and never blocks indefinitely.
pub trait TransportSink: Send {
    /// Notify one encoded packet to the peer
    fn send(&mut self, packet: &[u8]) -> Result<(), SendError>;
}
