//! Simulated pot front-end
//!
//! Models the muxed ADC as shared state a test or demo can poke while the
//! actor reads it. Reads are instantaneous; the real hardware's brief
//! conversion blocking is not modeled.

use std::sync::{Arc, Mutex, MutexGuard};

use mixy_stream::{HardwareError, PotReader, POT_COUNT};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Configuration for creating simulated pots
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimPotsConfig {
    /// Initial raw values, one per channel
    pub initial_values: [u16; POT_COUNT],
}

impl Default for SimPotsConfig {
    fn default() -> Self {
        Self {
            initial_values: [0; POT_COUNT],
        }
    }
}

struct SimPotsState {
    values: [u16; POT_COUNT],
    pending_failures: usize,
}

/// A scriptable pot front-end
///
/// Clones share the same underlying values, so one handle goes to the
/// actor as its [`PotReader`] while the test keeps another to move pots.
#[derive(Clone)]
pub struct SimPots {
    state: Arc<Mutex<SimPotsState>>,
}

impl SimPots {
    /// Create simulated pots resting at zero
    pub fn new() -> Self {
        Self::from_config(SimPotsConfig::default())
    }

    /// Create simulated pots from configuration
    pub fn from_config(config: SimPotsConfig) -> Self {
        Self {
            state: Arc::new(Mutex::new(SimPotsState {
                values: config.initial_values,
                pending_failures: 0,
            })),
        }
    }

    /// Set one pot's raw value
    pub fn set(&self, pot: usize, raw: u16) {
        debug_assert!(pot < POT_COUNT);
        self.lock().values[pot] = raw;
    }

    /// Set all pot values at once
    pub fn set_all(&self, values: [u16; POT_COUNT]) {
        self.lock().values = values;
    }

    /// Current raw values
    pub fn values(&self) -> [u16; POT_COUNT] {
        self.lock().values
    }

    /// Make the next `count` reads fail, then recover
    pub fn inject_failures(&self, count: usize) {
        debug!(count, "injecting pot read failures");
        self.lock().pending_failures = count;
    }

    fn lock(&self) -> MutexGuard<'_, SimPotsState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for SimPots {
    fn default() -> Self {
        Self::new()
    }
}

impl PotReader for SimPots {
    fn read_all(&mut self) -> Result<[u16; POT_COUNT], HardwareError> {
        let mut state = self.lock();
        if state.pending_failures > 0 {
            state.pending_failures -= 1;
            return Err(HardwareError::ConversionFailed("simulated fault".into()));
        }
        Ok(state.values)
    }
}
