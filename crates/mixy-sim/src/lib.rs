//! Mixy Simulation Library
//!
//! This crate provides a simulation layer for exercising the streaming
//! engine without physical hardware. It includes:
//!
//! - **SimPots**: a scriptable analog front-end with failure injection
//! - **SimTransport**: a notification sink that captures packets and
//!   models the peer's subscription state
//!
//! Both are cheaply cloneable handles over shared state, so a test or demo
//! can keep a handle while the actor owns another.
//!
//! # Example
//!
//! ```rust
//! use mixy_sim::{SimPots, SimTransport};
//! use mixy_stream::{PotReader, TransportSink};
//!
//! let mut pots = SimPots::new();
//! pots.set(0, 465);
//!
//! let samples = pots.read_all().unwrap();
//! assert_eq!(samples[0], 465);
//!
//! let mut transport = SimTransport::new();
//! transport.set_subscribed(true);
//! transport.send(&[0x80, 0x80, 0xB0, 4, 63]).unwrap();
//! assert_eq!(transport.take_sent().len(), 1);
//! ```

pub mod pots;
pub mod transport;

pub use pots::{SimPots, SimPotsConfig};
pub use transport::SimTransport;
