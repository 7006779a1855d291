//! Discrete-event simulation engine
//!
//! The event queue with its total ordering, the smooth mobility model,
//! construction parameters with validation, aggregate metrics with the
//! tabular event-log export, and the `Simulator` that orchestrates all of
//! it.

pub mod config;
pub mod event;
pub mod metrics;
pub mod mobility;
pub mod simulator;

pub use config::{SimConfig, TransmissionMode};
pub use event::{Event, EventKind, EventQueue};
pub use metrics::{EventExportRow, EventLogEntry, Metrics, TxResult};
pub use mobility::{BezierPath, SmoothMobility};
pub use simulator::Simulator;
