//! Radio layer for the LoRa simulator
//!
//! This module groups the physical-layer building blocks: spreading factor
//! and coding-rate parameter types, the propagation channel model with the
//! LoRa air-time formula, the frequency-plan selector, and the per-state
//! energy profile of an end-device radio.

pub mod channel;
pub mod energy;
pub mod multichannel;
pub mod params;

pub use channel::Channel;
pub use energy::{EnergyProfile, RadioState};
pub use multichannel::{ChannelDistribution, MultiChannel};
pub use params::{
    dr_to_sf, sf_to_dr, tx_power_index_to_dbm, tx_power_to_index, CodingRate, SpreadingFactor,
    MAX_TX_POWER_INDEX,
};
