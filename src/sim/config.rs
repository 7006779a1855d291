//! Simulation construction parameters and their validation.

use serde::{Deserialize, Serialize};

use crate::error::SimError;
use crate::lorawan::node::DeviceClass;
use crate::radio::channel::Channel;
use crate::radio::energy::EnergyProfile;
use crate::radio::multichannel::ChannelDistribution;

/// Uplink traffic pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransmissionMode {
    /// Poisson arrivals: exponential inter-transmission times.
    Random,
    /// Fixed period with a uniformly random initial phase.
    Periodic,
}

/// Everything needed to build a [`Simulator`](crate::sim::Simulator).
///
/// The defaults describe a 10-node, single-gateway network on one EU868
/// channel with 1 % duty cycle and mobile nodes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimConfig {
    pub num_nodes: usize,
    pub num_gateways: usize,
    /// Side of the square deployment area, in meters.
    pub area_size_m: f64,
    pub transmission_mode: TransmissionMode,
    /// Mean (Random) or fixed (Periodic) interval between uplinks, seconds.
    pub packet_interval_s: f64,
    /// Total uplinks across all nodes before the run winds down; 0 means
    /// unbounded.
    pub packets_to_send: u64,
    /// Device-side ADR bookkeeping and fallback.
    pub adr_node: bool,
    /// Server-side ADR margin algorithm.
    pub adr_server: bool,
    /// Permitted air-time fraction, e.g. 0.01 for 1 %; None disables
    /// duty-cycle enforcement.
    pub duty_cycle: Option<f64>,
    pub mobility: bool,
    /// Node speed range (min, max) in m/s when mobility is enabled.
    pub mobility_speed_mps: (f64, f64),
    /// Channel plan; must not be empty.
    pub channels: Vec<Channel>,
    pub channel_distribution: ChannelDistribution,
    /// Start every node at this SF instead of a random one.
    pub fixed_sf: Option<u8>,
    /// Start every node at this output power instead of 14 dBm.
    pub fixed_tx_power_dbm: Option<f64>,
    /// Application payload length per uplink, bytes.
    pub payload_size: usize,
    pub device_class: DeviceClass,
    /// Battery capacity per node in joules; None models an unlimited supply.
    pub battery_capacity_j: Option<f64>,
    pub energy_profile: EnergyProfile,
    /// RNG seed for deterministic replay; None seeds from the OS.
    pub seed: Option<u64>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            num_nodes: 10,
            num_gateways: 1,
            area_size_m: 1000.0,
            transmission_mode: TransmissionMode::Random,
            packet_interval_s: 60.0,
            packets_to_send: 0,
            adr_node: false,
            adr_server: false,
            duty_cycle: Some(0.01),
            mobility: true,
            mobility_speed_mps: (2.0, 10.0),
            channels: vec![Channel::default()],
            channel_distribution: ChannelDistribution::RoundRobin,
            fixed_sf: None,
            fixed_tx_power_dbm: None,
            payload_size: 20,
            device_class: DeviceClass::ClassA,
            battery_capacity_j: None,
            energy_profile: EnergyProfile::default(),
            seed: None,
        }
    }
}

impl SimConfig {
    pub fn validate(&self) -> Result<(), SimError> {
        if self.num_nodes < 1 {
            return Err(SimError::InvalidConfig(
                "num_nodes must be at least 1".into(),
            ));
        }
        if self.num_gateways < 1 {
            return Err(SimError::InvalidConfig(
                "num_gateways must be at least 1".into(),
            ));
        }
        if !(self.area_size_m > 0.0) {
            return Err(SimError::InvalidConfig(
                "area_size_m must be positive".into(),
            ));
        }
        if !(self.packet_interval_s > 0.0) {
            return Err(SimError::InvalidConfig(
                "packet_interval_s must be positive".into(),
            ));
        }
        if self.channels.is_empty() {
            return Err(SimError::InvalidConfig(
                "channel list must not be empty".into(),
            ));
        }
        if self.payload_size == 0 {
            return Err(SimError::InvalidConfig(
                "payload_size must be at least 1 byte".into(),
            ));
        }
        if let Some(sf) = self.fixed_sf {
            if !(7..=12).contains(&sf) {
                return Err(SimError::InvalidConfig(format!(
                    "fixed_sf must be within 7..=12, got {sf}"
                )));
            }
        }
        if let Some(power) = self.fixed_tx_power_dbm {
            if !(power > 0.0 && power <= 20.0) {
                return Err(SimError::InvalidConfig(format!(
                    "fixed_tx_power_dbm must be within (0, 20], got {power}"
                )));
            }
        }
        if let Some(duty) = self.duty_cycle {
            if !(duty > 0.0 && duty <= 1.0) {
                return Err(SimError::InvalidConfig(format!(
                    "duty_cycle must be within (0, 1], got {duty}"
                )));
            }
        }
        let (min_speed, max_speed) = self.mobility_speed_mps;
        if min_speed > max_speed || min_speed < 0.0 {
            return Err(SimError::InvalidConfig(
                "mobility_speed_mps must satisfy 0 <= min <= max".into(),
            ));
        }
        if self.mobility && min_speed <= 0.0 {
            return Err(SimError::InvalidConfig(
                "mobility requires a positive minimum speed".into(),
            ));
        }
        if let Some(capacity) = self.battery_capacity_j {
            if !(capacity > 0.0) {
                return Err(SimError::InvalidConfig(
                    "battery_capacity_j must be positive".into(),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(SimConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_parameters() {
        let mut config = SimConfig::default();
        config.num_nodes = 0;
        assert!(config.validate().is_err());

        let mut config = SimConfig::default();
        config.channels.clear();
        assert!(config.validate().is_err());

        let mut config = SimConfig::default();
        config.area_size_m = -1.0;
        assert!(config.validate().is_err());

        let mut config = SimConfig::default();
        config.fixed_sf = Some(6);
        assert!(config.validate().is_err());

        let mut config = SimConfig::default();
        config.duty_cycle = Some(1.5);
        assert!(config.validate().is_err());

        let mut config = SimConfig::default();
        config.mobility_speed_mps = (5.0, 2.0);
        assert!(config.validate().is_err());
    }
}
