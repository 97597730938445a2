//! Pot channel mapping and value normalization
//!
//! The six pots are wired to the ADC through a mux in board layout order,
//! which is not the order a receiver wants to see them in. A fixed table
//! maps physical pot index to the MIDI controller number it reports as.

use mixy_midi::DATA_MAX;

/// Number of physical pot channels behind the mux
pub const POT_COUNT: usize = 6;

/// Pot 3's pad is not connected on current boards; it never participates in
/// change detection or transmission
pub const UNCONNECTED_POT: usize = 3;

/// Physical pot index -> MIDI controller number
const POT_CC_MAP: [u8; POT_COUNT] = [4, 2, 0, 5, 3, 1];

/// Raw ADC count at full pot deflection
///
/// With gain 1/6 against the 0.6 V internal reference, a 10-bit conversion
/// of the 3.333 V pot rail reads ~947 counts at the stop. 930 is the value
/// real boards reach; revisit per hardware revision.
pub const RAW_FULL_SCALE: u16 = 930;

/// Map a physical pot index to its MIDI controller number
///
/// Caller contract: `pot < POT_COUNT`. Indices never come from external
/// input, so an out-of-range value is a programming error.
pub fn controller_for_pot(pot: usize) -> u8 {
    debug_assert!(pot < POT_COUNT);
    POT_CC_MAP[pot]
}

/// Whether a pot participates in change detection and transmission
pub fn pot_is_connected(pot: usize) -> bool {
    pot != UNCONNECTED_POT
}

/// Scale a raw ADC sample into the 7-bit MIDI value domain
///
/// Fixed-point `(127 * raw) / RAW_FULL_SCALE`, saturating at 127 so samples
/// past the nominal full scale still encode legally.
pub fn normalize(raw: u16) -> u8 {
    let scaled = (u32::from(DATA_MAX) * u32::from(raw)) / u32::from(RAW_FULL_SCALE);
    scaled.min(u32::from(DATA_MAX)) as u8
}
