//! # Simulator Error Handling
//!
//! This module defines the SimError enum, which represents the different error
//! types that can occur in the lorasim-rs crate.
//!
//! Only construction-time problems are errors. Runtime packet outcomes
//! (collision, no coverage, battery depletion) are ordinary data recorded in
//! the event log and the metrics, never surfaced through this type.

use thiserror::Error;

/// Represents the different error types that can occur in the simulator crate.
#[derive(Debug, Error)]
pub enum SimError {
    /// Indicates invalid construction parameters.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Indicates a failure while exporting the event log or metrics.
    #[error("Export error: {0}")]
    Export(#[from] std::io::Error),
}
