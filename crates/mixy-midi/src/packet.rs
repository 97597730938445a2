//! BLE-MIDI packet construction
//!
//! Packet building is a pure transform with statically bounded output: a
//! single update is always [`SINGLE_PACKET_LEN`] bytes, a batch is
//! `1 + 4 * entries` bytes. There is no failure path; out-of-range data
//! bytes are clamped to the 7-bit MIDI domain.

/// MIDI control-change status byte on channel 0
pub const CONTROL_CHANGE_STATUS: u8 = 0xB0;

/// Maximum value of a MIDI data byte (controller number or value)
pub const DATA_MAX: u8 = 0x7F;

/// Length of a standalone single-update packet
pub const SINGLE_PACKET_LEN: usize = 5;

/// The BLE-MIDI timestamp wraps within 13 bits
const TIMESTAMP_MODULUS: u16 = 1 << 13;

/// Framing marker carried by every header and timestamp byte
const FRAMING_BIT: u8 = 0x80;

/// A 13-bit BLE-MIDI timestamp
///
/// The value is a running counter, not wall-clock time; receivers only use
/// it for relative ordering within a connection. Construction masks the raw
/// value into the 13-bit domain, so callers can hand in a free-running
/// counter without wrapping it themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MidiTimestamp(u16);

impl MidiTimestamp {
    /// Create a timestamp, wrapping the raw value into the 13-bit domain
    pub fn new(raw: u16) -> Self {
        Self(raw % TIMESTAMP_MODULUS)
    }

    /// Get the wrapped timestamp value
    pub fn value(&self) -> u16 {
        self.0
    }

    /// Packet header byte: framing bit plus the high 6 bits
    pub fn header_byte(&self) -> u8 {
        FRAMING_BIT | ((self.0 >> 7) as u8 & 0x3F)
    }

    /// Per-message timestamp byte: framing bit plus the low 7 bits
    pub fn low_byte(&self) -> u8 {
        FRAMING_BIT | (self.0 as u8 & DATA_MAX)
    }
}

/// Encode a standalone control-change packet with its own header
pub fn encode_control_change(ts: MidiTimestamp, controller: u8, value: u8) -> [u8; SINGLE_PACKET_LEN] {
    [
        ts.header_byte(),
        ts.low_byte(),
        CONTROL_CHANGE_STATUS,
        controller.min(DATA_MAX),
        value.min(DATA_MAX),
    ]
}

/// Compute the size of a batch packet before building it
pub fn batch_packet_len(entries: usize) -> usize {
    1 + 4 * entries
}

/// Builder for a batch packet carrying multiple control-change messages
///
/// The header timestamp split is encoded once; each pushed message repeats
/// only the low timestamp byte. This amortizes header overhead when many
/// controls change in the same tick (the post-subscription snapshot).
#[derive(Debug)]
pub struct BatchEncoder {
    ts: MidiTimestamp,
    buf: Vec<u8>,
}

impl BatchEncoder {
    /// Start a batch packet stamped with the given timestamp
    pub fn new(ts: MidiTimestamp) -> Self {
        Self::with_capacity(ts, 0)
    }

    /// Start a batch packet, pre-allocating for an expected entry count
    pub fn with_capacity(ts: MidiTimestamp, entries: usize) -> Self {
        let mut buf = Vec::with_capacity(batch_packet_len(entries));
        buf.push(ts.header_byte());
        Self { ts, buf }
    }

    /// Append one control-change message to the batch
    pub fn push(&mut self, controller: u8, value: u8) {
        self.buf.push(self.ts.low_byte());
        self.buf.push(CONTROL_CHANGE_STATUS);
        self.buf.push(controller.min(DATA_MAX));
        self.buf.push(value.min(DATA_MAX));
    }

    /// Number of messages pushed so far
    pub fn entries(&self) -> usize {
        (self.buf.len() - 1) / 4
    }

    /// Whether no messages have been pushed yet
    pub fn is_empty(&self) -> bool {
        self.entries() == 0
    }

    /// Finish the batch and take the packet bytes
    pub fn finish(self) -> Vec<u8> {
        self.buf
    }
}
