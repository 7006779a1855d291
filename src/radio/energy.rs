//! Energy consumption model of an end-device radio.

use serde::{Deserialize, Serialize};

/// Operating state of the device radio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RadioState {
    Sleep,
    Tx,
    Rx,
    Processing,
}

/// Per-state current draw of a LoRa end-device.
///
/// Defaults follow the FLoRa (OMNeT++) energy model. Transmit energy is not
/// derived from a current here; the dispatcher charges it from the radiated
/// power directly.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EnergyProfile {
    pub voltage_v: f64,
    pub sleep_current_a: f64,
    pub rx_current_a: f64,
    pub process_current_a: f64,
    /// Time the receiver stays open for one RX window, in seconds.
    pub rx_window_duration_s: f64,
}

impl Default for EnergyProfile {
    fn default() -> Self {
        Self {
            voltage_v: 3.3,
            sleep_current_a: 1e-6,
            rx_current_a: 11e-3,
            process_current_a: 5e-3,
            rx_window_duration_s: 0.1,
        }
    }
}

impl EnergyProfile {
    /// Current draw (A) in the given radio state.
    pub fn current_a(&self, state: RadioState) -> f64 {
        match state {
            RadioState::Sleep => self.sleep_current_a,
            RadioState::Rx => self.rx_current_a,
            RadioState::Processing => self.process_current_a,
            // Transmit draw is charged from the radiated power instead.
            RadioState::Tx => 0.0,
        }
    }

    /// Energy (J) spent holding `state` for `duration_s` seconds.
    pub fn state_energy_j(&self, state: RadioState, duration_s: f64) -> f64 {
        self.voltage_v * self.current_a(state) * duration_s
    }

    /// Energy (J) spent keeping the receiver open for one RX window.
    pub fn rx_window_energy_j(&self) -> f64 {
        self.state_energy_j(RadioState::Rx, self.rx_window_duration_s)
    }
}
