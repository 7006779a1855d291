//! # lorasim-rs - A Rust Crate for Discrete-Event LoRa/LoRaWAN Simulation
//!
//! The lorasim-rs crate provides a discrete-event simulator for LoRa and
//! LoRaWAN wireless networks: a population of battery-powered end-devices
//! sends radio frames to one or more gateways that forward them to a network
//! server, with downlinks flowing back through per-device receive windows.
//!
//! ## Features
//!
//! - Log-distance propagation with shadowing, per-SF sensitivity and the
//!   LoRa air-time formula
//! - Gateway-side concurrent-reception arbitration with the capture effect
//! - LoRaWAN class A/B/C frame exchange, MAC commands and frame counters
//! - Adaptive Data Rate on the server (margin algorithm) and on the device
//!   (ADR_ACK back-off plus a link-history fallback)
//! - Regulatory duty-cycle enforcement and smooth Bezier-path mobility
//! - Per-packet event log and aggregate metrics with CSV/JSON export
//! - Deterministic replay from a fixed RNG seed
//!
//! ## Usage
//!
//! ```rust
//! use lorasim_rs::{SimConfig, Simulator, TransmissionMode};
//!
//! let mut config = SimConfig::default();
//! config.num_nodes = 5;
//! config.transmission_mode = TransmissionMode::Periodic;
//! config.packets_to_send = 25;
//! config.mobility = false;
//! config.seed = Some(42);
//!
//! let mut sim = Simulator::new(config).expect("valid configuration");
//! sim.run();
//! let metrics = sim.get_metrics();
//! assert!(metrics.pdr >= 0.0 && metrics.pdr <= 1.0);
//! ```

pub mod error;
pub mod logging;
pub mod lorawan;
pub mod radio;
pub mod sim;

pub use crate::error::SimError;
pub use crate::logging::init_logger;

// Radio layer
pub use radio::channel::Channel;
pub use radio::energy::{EnergyProfile, RadioState};
pub use radio::multichannel::{ChannelDistribution, MultiChannel};
pub use radio::params::{
    dr_to_sf, sf_to_dr, tx_power_index_to_dbm, tx_power_to_index, CodingRate, SpreadingFactor,
};

// LoRaWAN MAC layer
pub use lorawan::duty_cycle::DutyCycleManager;
pub use lorawan::frame::{FCtrl, LoRaWanFrame};
pub use lorawan::gateway::{Delivery, Gateway, ReceptionRecord};
pub use lorawan::mac_commands::MacCommand;
pub use lorawan::node::{Battery, DeviceClass, LinkSample, Node};
pub use lorawan::server::NetworkServer;

// Simulation engine
pub use sim::config::{SimConfig, TransmissionMode};
pub use sim::event::{Event, EventKind, EventQueue};
pub use sim::metrics::{EventExportRow, EventLogEntry, Metrics, TxResult};
pub use sim::mobility::{BezierPath, SmoothMobility};
pub use sim::simulator::Simulator;
