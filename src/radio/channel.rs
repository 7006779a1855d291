//! Radio propagation channel for LoRa links.
//!
//! Log-distance path loss anchored on free space at 1 m, optional log-normal
//! shadowing, fast fading and TX-power jitter, a thermal noise floor with
//! receiver noise figure and interference margin, per-SF receiver
//! sensitivity, and the LoRa modem air-time formula.

use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

use crate::radio::params::{CodingRate, SpreadingFactor};

/// Immutable propagation and modem configuration for one frequency.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Channel {
    /// Carrier frequency in Hz.
    pub frequency_hz: f64,
    /// Log-distance path-loss exponent.
    pub path_loss_exp: f64,
    /// Shadowing standard deviation in dB; 0 disables shadowing.
    pub shadowing_std: f64,
    /// Fast-fading standard deviation in dB; 0 disables fading.
    pub fast_fading_std: f64,
    /// Fixed cable and connector losses in dB.
    pub cable_loss_db: f64,
    /// Thermal noise reference in dBm/Hz.
    pub noise_floor_ref_dbm: f64,
    /// Receiver noise figure in dB.
    pub noise_figure_db: f64,
    /// Noise-floor variation standard deviation in dB; 0 for a stable floor.
    pub noise_std: f64,
    /// Receiver bandwidth in Hz.
    pub bandwidth_hz: f64,
    pub coding_rate: CodingRate,
    /// Programmed preamble length in symbols.
    pub preamble_symbols: f64,
    /// SF at or above which Low Data Rate Optimization is enabled.
    pub low_data_rate_threshold: u8,
    /// RSSI difference in dB for the stronger of two overlapping signals to
    /// capture the receiver.
    pub capture_threshold_db: f64,
    /// Receiver sensitivity in dBm, indexed SF7..SF12.
    pub sensitivity_dbm: [f64; 6],
    /// Transmit-power jitter standard deviation in dB.
    pub tx_power_std: f64,
    /// Wideband interference margin added to the noise floor, in dB.
    pub interference_db: f64,
}

impl Default for Channel {
    fn default() -> Self {
        Self {
            frequency_hz: 868e6,
            path_loss_exp: 2.7,
            shadowing_std: 6.0,
            fast_fading_std: 0.0,
            cable_loss_db: 0.0,
            noise_floor_ref_dbm: -174.0,
            noise_figure_db: 6.0,
            noise_std: 0.0,
            bandwidth_hz: 125e3,
            coding_rate: CodingRate::CR4_5,
            preamble_symbols: 8.0,
            low_data_rate_threshold: 11,
            capture_threshold_db: 6.0,
            // Approximate SX127x sensitivity for BW 125 kHz, CR 4/5
            sensitivity_dbm: [-123.0, -126.0, -129.0, -132.0, -134.5, -137.0],
            tx_power_std: 0.0,
            interference_db: 0.0,
        }
    }
}

impl Channel {
    /// Default channel retuned to another carrier frequency.
    pub fn with_frequency(frequency_hz: f64) -> Self {
        Self {
            frequency_hz,
            ..Self::default()
        }
    }

    /// Receiver sensitivity (dBm) for the given spreading factor.
    pub fn sensitivity_dbm(&self, sf: SpreadingFactor) -> f64 {
        self.sensitivity_dbm[(sf.as_u8() - 7) as usize]
    }

    /// Noise floor (dBm) over the configured bandwidth, including the noise
    /// figure, the interference margin and, when configured, a Gaussian
    /// variation term.
    pub fn noise_floor_dbm<R: Rng>(&self, rng: &mut R) -> f64 {
        let thermal = self.noise_floor_ref_dbm + 10.0 * self.bandwidth_hz.log10();
        let mut floor = thermal + self.noise_figure_db + self.interference_db;
        if self.noise_std > 0.0 {
            floor += gaussian(rng, self.noise_std);
        }
        floor
    }

    /// Path loss in dB at `distance_m` meters.
    ///
    /// Log-distance model with the 1 m free-space loss as anchor; distances
    /// under one meter are clamped to the anchor.
    pub fn path_loss(&self, distance_m: f64) -> f64 {
        let freq_mhz = self.frequency_hz / 1e6;
        // FSPL at d0 = 1 m: 32.45 + 20*log10(f_MHz) + 20*log10(0.001 km)
        let pl_d0 = 32.45 + 20.0 * freq_mhz.log10() - 60.0;
        pl_d0 + 10.0 * self.path_loss_exp * distance_m.max(1.0).log10()
    }

    /// RSSI, SNR and the noise floor they were computed against (dBm, dB,
    /// dBm) for a transmission received over `distance_m`.
    ///
    /// Shadowing, TX-power jitter and fast fading are sampled as independent
    /// zero-mean Gaussians; each term is omitted when its sigma is zero. The
    /// noise floor is sampled once, so any threshold the caller derives from
    /// the returned value is consistent with the returned SNR.
    pub fn compute_link<R: Rng>(
        &self,
        tx_power_dbm: f64,
        distance_m: f64,
        rng: &mut R,
    ) -> (f64, f64, f64) {
        let mut loss = self.path_loss(distance_m);
        if self.shadowing_std > 0.0 {
            loss += gaussian(rng, self.shadowing_std);
        }
        let mut rssi = tx_power_dbm - loss - self.cable_loss_db;
        if self.tx_power_std > 0.0 {
            rssi += gaussian(rng, self.tx_power_std);
        }
        if self.fast_fading_std > 0.0 {
            rssi += gaussian(rng, self.fast_fading_std);
        }
        let noise_floor = self.noise_floor_dbm(rng);
        (rssi, rssi - noise_floor, noise_floor)
    }

    /// RSSI and SNR (dBm, dB) of a transmission received over `distance_m`.
    pub fn compute_rssi<R: Rng>(
        &self,
        tx_power_dbm: f64,
        distance_m: f64,
        rng: &mut R,
    ) -> (f64, f64) {
        let (rssi, snr, _) = self.compute_link(tx_power_dbm, distance_m, rng);
        (rssi, snr)
    }

    /// Time on air in seconds for a payload of `payload_len` bytes.
    ///
    /// Standard LoRa modem formula, explicit header and 16-bit CRC assumed.
    pub fn airtime(&self, sf: SpreadingFactor, payload_len: usize) -> f64 {
        let sf_n = sf.as_u8() as f64;
        let symbol_time = 2f64.powi(sf.as_u8() as i32) / self.bandwidth_hz;
        let de = if sf.as_u8() >= self.low_data_rate_threshold {
            1.0
        } else {
            0.0
        };
        let cr_denom = self.coding_rate.index() as f64 + 4.0;
        let numerator = 8.0 * payload_len as f64 - 4.0 * sf_n + 28.0 + 16.0;
        let denominator = 4.0 * (sf_n - 2.0 * de);
        let n_payload = (numerator / denominator).ceil().max(0.0) * cr_denom + 8.0;
        let t_preamble = (self.preamble_symbols + 4.25) * symbol_time;
        t_preamble + n_payload * symbol_time
    }
}

fn gaussian<R: Rng>(rng: &mut R, std_dev: f64) -> f64 {
    match Normal::new(0.0, std_dev) {
        Ok(dist) => dist.sample(rng),
        Err(_) => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn quiet_channel() -> Channel {
        Channel {
            shadowing_std: 0.0,
            ..Channel::default()
        }
    }

    #[test]
    fn test_airtime_sf7_reference() {
        // SF7, 20 B payload, BW 125 kHz, CR 4/5
        let ch = quiet_channel();
        let at = ch.airtime(SpreadingFactor::SF7, 20);
        assert!((at - 0.056576).abs() < 1e-9, "airtime was {at}");
    }

    #[test]
    fn test_airtime_grows_with_sf() {
        let ch = quiet_channel();
        let mut last = 0.0;
        for sf in SpreadingFactor::ALL {
            let at = ch.airtime(sf, 20);
            assert!(at > last, "airtime should grow with SF, got {at} at {sf:?}");
            last = at;
        }
    }

    #[test]
    fn test_rssi_without_shadowing_is_deterministic() {
        let ch = quiet_channel();
        let mut rng = StdRng::seed_from_u64(1);
        let (rssi, snr) = ch.compute_rssi(14.0, 100.0, &mut rng);
        let expected_rssi = 14.0 - ch.path_loss(100.0) - ch.cable_loss_db;
        assert!((rssi - expected_rssi).abs() < 1e-9);
        let expected_snr = expected_rssi - ch.noise_floor_dbm(&mut rng);
        assert!((snr - expected_snr).abs() < 1e-9);
    }

    #[test]
    fn test_rssi_monotonic_in_distance() {
        let ch = quiet_channel();
        let mut rng = StdRng::seed_from_u64(2);
        let mut previous = f64::INFINITY;
        for distance in [1.0, 10.0, 50.0, 200.0, 1_000.0, 5_000.0] {
            let (rssi, _) = ch.compute_rssi(14.0, distance, &mut rng);
            assert!(rssi <= previous, "rssi should not increase with distance");
            previous = rssi;
        }
    }

    #[test]
    fn test_compute_link_shares_one_noise_sample() {
        let ch = Channel {
            shadowing_std: 3.0,
            noise_std: 2.0,
            ..Channel::default()
        };
        let mut rng = StdRng::seed_from_u64(4);
        for _ in 0..32 {
            let (rssi, snr, noise_floor) = ch.compute_link(14.0, 250.0, &mut rng);
            assert!(
                (snr - (rssi - noise_floor)).abs() < 1e-12,
                "snr must match the returned noise floor"
            );
        }
    }

    #[test]
    fn test_compute_rssi_matches_compute_link() {
        let ch = Channel::default();
        let mut rng_a = StdRng::seed_from_u64(8);
        let mut rng_b = StdRng::seed_from_u64(8);
        let (rssi_a, snr_a) = ch.compute_rssi(14.0, 100.0, &mut rng_a);
        let (rssi_b, snr_b, _) = ch.compute_link(14.0, 100.0, &mut rng_b);
        assert_eq!(rssi_a, rssi_b);
        assert_eq!(snr_a, snr_b);
    }

    #[test]
    fn test_sub_meter_distance_clamped() {
        let ch = quiet_channel();
        assert_eq!(ch.path_loss(0.0), ch.path_loss(1.0));
        assert_eq!(ch.path_loss(0.5), ch.path_loss(1.0));
    }

    #[test]
    fn test_noise_floor_reference_value() {
        let ch = quiet_channel();
        let mut rng = StdRng::seed_from_u64(3);
        // -174 + 10*log10(125e3) + 6 = -117.03...
        let floor = ch.noise_floor_dbm(&mut rng);
        assert!((floor - (-117.030899869919)).abs() < 1e-6, "floor was {floor}");
    }
}
