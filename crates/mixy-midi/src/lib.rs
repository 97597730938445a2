//! BLE-MIDI Packet Encoding
//!
//! This crate builds the BLE-MIDI packets the Mixy controller notifies to its
//! peer. Only the subset of the BLE-MIDI framing the device emits is covered:
//! control-change messages on MIDI channel 0, in two shapes:
//!
//! - **Single update**: one 5-byte packet per changed control
//! - **Batch**: one packet carrying every control, used for the snapshot sent
//!   when a peer first subscribes
//!
//! # Wire layout
//!
//! All header and timestamp bytes carry the high bit set as a framing marker.
//! The running 13-bit timestamp is split across the packet header (high 6
//! bits) and a per-message timestamp byte (low 7 bits):
//!
//! ```text
//! header     0x80 | (ts >> 7 & 0x3F)      once per packet
//! ts_low     0x80 | (ts & 0x7F)           once per message
//! status     0xB0                         control change, channel 0
//! data1      controller number (0-127)
//! data2      controller value  (0-127)
//! ```
//!
//! # Example
//!
//! ```rust
//! use mixy_midi::{encode_control_change, MidiTimestamp};
//!
//! let ts = MidiTimestamp::new(0x1234);
//! let packet = encode_control_change(ts, 4, 100);
//! assert_eq!(packet.len(), 5);
//! assert_eq!(packet[2], 0xB0);
//! ```

pub mod packet;

pub use packet::{
    batch_packet_len, encode_control_change, BatchEncoder, MidiTimestamp, CONTROL_CHANGE_STATUS,
    DATA_MAX, SINGLE_PACKET_LEN,
};
