//! LoRaWAN MAC layer for the simulator
//!
//! In-memory frame representation, MAC command codec, end-device state and
//! class-A behavior, gateway-side reception arbitration, the network server
//! with its ADR control loop, and regulatory duty-cycle enforcement.
//!
//! Frames are never serialized to a radio byte stream; integrity codes and
//! join procedures are outside the simulated scope.

pub mod duty_cycle;
pub mod frame;
pub mod gateway;
pub mod mac_commands;
pub mod node;
pub mod server;

pub use duty_cycle::DutyCycleManager;
pub use frame::{FCtrl, LoRaWanFrame};
pub use gateway::{Delivery, Gateway, ReceptionRecord};
pub use mac_commands::MacCommand;
pub use node::{Battery, DeviceClass, LinkSample, Node};
pub use server::NetworkServer;
