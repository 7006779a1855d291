//! LoRa PHY parameter types and the LoRaWAN rate/power tables.

use serde::{Deserialize, Serialize};

/// Spreading Factor (SF) for LoRa uplinks.
///
/// Ordered so that a higher SF compares greater; higher SF means longer
/// range and air-time at a lower data rate.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum SpreadingFactor {
    SF7 = 7,
    SF8 = 8,
    SF9 = 9,
    SF10 = 10,
    SF11 = 11,
    SF12 = 12,
}

impl SpreadingFactor {
    /// All supported spreading factors, fastest first.
    pub const ALL: [SpreadingFactor; 6] = [
        SpreadingFactor::SF7,
        SpreadingFactor::SF8,
        SpreadingFactor::SF9,
        SpreadingFactor::SF10,
        SpreadingFactor::SF11,
        SpreadingFactor::SF12,
    ];

    pub fn from_u8(value: u8) -> Option<SpreadingFactor> {
        match value {
            7 => Some(SpreadingFactor::SF7),
            8 => Some(SpreadingFactor::SF8),
            9 => Some(SpreadingFactor::SF9),
            10 => Some(SpreadingFactor::SF10),
            11 => Some(SpreadingFactor::SF11),
            12 => Some(SpreadingFactor::SF12),
            _ => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// One step towards longer range (higher SF), saturating at SF12.
    pub fn slower(self) -> SpreadingFactor {
        match self {
            SpreadingFactor::SF7 => SpreadingFactor::SF8,
            SpreadingFactor::SF8 => SpreadingFactor::SF9,
            SpreadingFactor::SF9 => SpreadingFactor::SF10,
            SpreadingFactor::SF10 => SpreadingFactor::SF11,
            SpreadingFactor::SF11 => SpreadingFactor::SF12,
            SpreadingFactor::SF12 => SpreadingFactor::SF12,
        }
    }

    /// One step towards a higher data rate (lower SF), saturating at SF7.
    pub fn faster(self) -> SpreadingFactor {
        match self {
            SpreadingFactor::SF7 => SpreadingFactor::SF7,
            SpreadingFactor::SF8 => SpreadingFactor::SF7,
            SpreadingFactor::SF9 => SpreadingFactor::SF8,
            SpreadingFactor::SF10 => SpreadingFactor::SF9,
            SpreadingFactor::SF11 => SpreadingFactor::SF10,
            SpreadingFactor::SF12 => SpreadingFactor::SF11,
        }
    }

    /// Minimum SNR (dB) the demodulator needs at this SF, per the LoRaWAN
    /// ADR reference tables.
    pub fn required_snr_db(self) -> f64 {
        match self {
            SpreadingFactor::SF7 => -7.5,
            SpreadingFactor::SF8 => -10.0,
            SpreadingFactor::SF9 => -12.5,
            SpreadingFactor::SF10 => -15.0,
            SpreadingFactor::SF11 => -17.5,
            SpreadingFactor::SF12 => -20.0,
        }
    }
}

/// Coding Rate (CR) for LoRa. The discriminant is the CR index used by the
/// air-time formula (CR + 4 coded bits per 4 data bits).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum CodingRate {
    CR4_5 = 1,
    CR4_6 = 2,
    CR4_7 = 3,
    CR4_8 = 4,
}

impl CodingRate {
    pub fn index(self) -> u32 {
        self as u32
    }
}

/// Highest valid LinkADRReq TX-power index (lowest output power).
pub const MAX_TX_POWER_INDEX: u8 = 6;

/// LoRaWAN EU868 data-rate index to spreading factor.
pub fn dr_to_sf(dr: u8) -> Option<SpreadingFactor> {
    match dr {
        0 => Some(SpreadingFactor::SF12),
        1 => Some(SpreadingFactor::SF11),
        2 => Some(SpreadingFactor::SF10),
        3 => Some(SpreadingFactor::SF9),
        4 => Some(SpreadingFactor::SF8),
        5 => Some(SpreadingFactor::SF7),
        _ => None,
    }
}

/// Spreading factor to LoRaWAN EU868 data-rate index.
pub fn sf_to_dr(sf: SpreadingFactor) -> u8 {
    match sf {
        SpreadingFactor::SF12 => 0,
        SpreadingFactor::SF11 => 1,
        SpreadingFactor::SF10 => 2,
        SpreadingFactor::SF9 => 3,
        SpreadingFactor::SF8 => 4,
        SpreadingFactor::SF7 => 5,
    }
}

/// LinkADRReq TX-power index to conducted output power in dBm.
pub fn tx_power_index_to_dbm(index: u8) -> Option<f64> {
    match index {
        0 => Some(20.0),
        1 => Some(17.0),
        2 => Some(14.0),
        3 => Some(11.0),
        4 => Some(8.0),
        5 => Some(5.0),
        6 => Some(2.0),
        _ => None,
    }
}

/// Nearest LinkADRReq TX-power index for a dBm value. Values outside the
/// table fall back to index 0 (full power), mirroring the server encoding.
pub fn tx_power_to_index(dbm: f64) -> u8 {
    match dbm.round() as i32 {
        20 => 0,
        17 => 1,
        14 => 2,
        11 => 3,
        8 => 4,
        5 => 5,
        2 => 6,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sf_stepping_saturates() {
        assert_eq!(SpreadingFactor::SF12.slower(), SpreadingFactor::SF12);
        assert_eq!(SpreadingFactor::SF7.faster(), SpreadingFactor::SF7);
        assert_eq!(SpreadingFactor::SF9.slower(), SpreadingFactor::SF10);
        assert_eq!(SpreadingFactor::SF9.faster(), SpreadingFactor::SF8);
    }

    #[test]
    fn test_dr_sf_table_round_trips() {
        for sf in SpreadingFactor::ALL {
            assert_eq!(dr_to_sf(sf_to_dr(sf)), Some(sf));
        }
        assert_eq!(dr_to_sf(6), None);
    }

    #[test]
    fn test_tx_power_table() {
        assert_eq!(tx_power_index_to_dbm(0), Some(20.0));
        assert_eq!(tx_power_index_to_dbm(6), Some(2.0));
        assert_eq!(tx_power_index_to_dbm(7), None);
        assert_eq!(tx_power_to_index(14.0), 2);
        assert_eq!(tx_power_to_index(2.0), 6);
        // off-table values encode as full power
        assert_eq!(tx_power_to_index(13.0), 0);
    }

    #[test]
    fn test_sf_ordering() {
        assert!(SpreadingFactor::SF7 < SpreadingFactor::SF12);
        assert!(SpreadingFactor::SF10 > SpreadingFactor::SF9);
    }
}
