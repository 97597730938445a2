//! Error types for the streaming engine
//!
//! Nothing in this crate is fatal: a failed pot conversion skips one tick's
//! change detection, and a failed send drops one packet. Both are surfaced
//! as events so observers can count them, and the loop keeps running.

use thiserror::Error;

/// Errors from the analog front-end collaborator
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HardwareError {
    /// The ADC conversion failed
    #[error("pot conversion failed: {0}")]
    ConversionFailed(String),

    /// The pot hardware is not ready
    #[error("pot hardware not ready")]
    NotReady,
}

/// Errors from the transport sink collaborator
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SendError {
    /// The peer is not subscribed to notifications
    #[error("peer not subscribed")]
    NotSubscribed,

    /// The link is saturated and the notification was refused
    #[error("transport busy")]
    Busy,
}
