//! LoRa end-device state and class-A MAC behavior.
//!
//! A [`Node`] owns everything the simulator needs to know about one device:
//! radio parameters with their initial values, LoRaWAN counters and pending
//! MAC answers, the rolling link history used by ADR, battery state, and the
//! current mobility path. Channels and gateways are referenced by index into
//! the simulator-owned arenas, never by ownership.

use std::collections::VecDeque;

use log::debug;

use crate::lorawan::frame::{FCtrl, LoRaWanFrame, MHDR_CONFIRMED_UP, MHDR_UNCONFIRMED_UP};
use crate::lorawan::mac_commands::{MacCommand, LINK_ADR_ANS_OK};
use crate::radio::energy::{EnergyProfile, RadioState};
use crate::radio::params::{dr_to_sf, tx_power_index_to_dbm, tx_power_to_index, SpreadingFactor};
use crate::sim::mobility::BezierPath;
use serde::{Deserialize, Serialize};

/// Unacknowledged uplinks after which the device requests an ADR ack.
pub const ADR_ACK_LIMIT: u32 = 64;
/// Further uplinks granted before each ADR back-off step.
pub const ADR_ACK_DELAY: u32 = 32;
/// Number of uplink outcomes kept in the rolling link history.
pub const LINK_HISTORY_LEN: usize = 20;
/// RX1 opens one second after the uplink ends.
pub const RX1_DELAY_S: f64 = 1.0;
/// RX2 opens two seconds after the uplink ends.
pub const RX2_DELAY_S: f64 = 2.0;

/// LoRaWAN device class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceClass {
    /// Bi-directional with RX windows after each uplink.
    ClassA,
    /// Scheduled periodic receive slots.
    ClassB,
    /// Continuous receive, polled while downlinks are queued.
    ClassC,
}

/// Outcome of one uplink as remembered by the device.
#[derive(Debug, Clone, Copy)]
pub struct LinkSample {
    /// Best SNR observed across gateways, if the uplink was heard.
    pub snr_db: Option<f64>,
    pub delivered: bool,
}

/// Battery with monotonic drain. An unlimited supply is modeled as an
/// infinite capacity.
#[derive(Debug, Clone, Copy)]
pub struct Battery {
    capacity_j: f64,
    remaining_j: f64,
}

impl Battery {
    pub fn new(capacity_j: Option<f64>) -> Self {
        let capacity = capacity_j.unwrap_or(f64::INFINITY);
        Self {
            capacity_j: capacity,
            remaining_j: capacity,
        }
    }

    /// Drain up to `energy_j`, clamping at empty. Returns what was actually
    /// drained.
    pub fn drain(&mut self, energy_j: f64) -> f64 {
        let drained = energy_j.min(self.remaining_j);
        self.remaining_j -= drained;
        drained
    }

    pub fn capacity_j(&self) -> f64 {
        self.capacity_j
    }

    pub fn remaining_j(&self) -> f64 {
        self.remaining_j
    }

    pub fn is_empty(&self) -> bool {
        self.remaining_j <= 0.0
    }
}

/// One simulated LoRa end-device.
#[derive(Debug, Clone)]
pub struct Node {
    pub id: usize,
    pub x: f64,
    pub y: f64,
    pub initial_x: f64,
    pub initial_y: f64,
    pub sf: SpreadingFactor,
    pub initial_sf: SpreadingFactor,
    pub tx_power_dbm: f64,
    pub initial_tx_power_dbm: f64,
    /// Index of the assigned channel in the simulator's plan.
    pub channel: usize,
    pub class: DeviceClass,
    pub devaddr: u32,

    // LoRaWAN counters and MAC state
    pub fcnt_up: u32,
    pub fcnt_down: u32,
    pub pending_mac_answer: Option<MacCommand>,
    pub adr_enabled: bool,
    pub nb_trans: u8,
    pub ch_mask: u16,
    pub adr_ack_cnt: u32,
    pub adr_ack_limit: u32,
    pub adr_ack_delay: u32,
    pub awaiting_ack: bool,
    pub need_downlink_ack: bool,
    pub downlink_pending: u32,
    pub acks_received: u32,

    /// Rolling history of the last uplink outcomes.
    pub history: VecDeque<LinkSample>,

    // Energy
    pub battery: Battery,
    pub energy_consumed_j: f64,
    pub profile: EnergyProfile,
    pub radio_state: RadioState,
    pub radio_state_since: f64,

    // Packet counters
    pub packets_sent: u64,
    pub packets_success: u64,
    pub packets_collision: u64,

    // Transient link state maintained by the dispatcher
    pub in_transmission: bool,
    pub current_end_time: Option<f64>,
    pub last_rssi_dbm: Option<f64>,
    pub last_snr_db: Option<f64>,

    // Mobility
    pub speed_mps: f64,
    pub path: Option<BezierPath>,
    pub path_progress: f64,
    pub path_duration_s: f64,
    pub last_move_time: f64,
}

impl Node {
    pub fn new(
        id: usize,
        x: f64,
        y: f64,
        sf: SpreadingFactor,
        tx_power_dbm: f64,
        channel: usize,
    ) -> Self {
        Self {
            id,
            x,
            y,
            initial_x: x,
            initial_y: y,
            sf,
            initial_sf: sf,
            tx_power_dbm,
            initial_tx_power_dbm: tx_power_dbm,
            channel,
            class: DeviceClass::ClassA,
            devaddr: id as u32,
            fcnt_up: 0,
            fcnt_down: 0,
            pending_mac_answer: None,
            adr_enabled: false,
            nb_trans: 1,
            ch_mask: 0x0007,
            adr_ack_cnt: 0,
            adr_ack_limit: ADR_ACK_LIMIT,
            adr_ack_delay: ADR_ACK_DELAY,
            awaiting_ack: false,
            need_downlink_ack: false,
            downlink_pending: 0,
            acks_received: 0,
            history: VecDeque::with_capacity(LINK_HISTORY_LEN),
            battery: Battery::new(None),
            energy_consumed_j: 0.0,
            profile: EnergyProfile::default(),
            radio_state: RadioState::Sleep,
            radio_state_since: 0.0,
            packets_sent: 0,
            packets_success: 0,
            packets_collision: 0,
            in_transmission: false,
            current_end_time: None,
            last_rssi_dbm: None,
            last_snr_db: None,
            speed_mps: 0.0,
            path: None,
            path_progress: 0.0,
            path_duration_s: 0.0,
            last_move_time: 0.0,
        }
    }

    /// Euclidean distance (m) to a point, typically a gateway position.
    pub fn distance_to(&self, x: f64, y: f64) -> f64 {
        (self.x - x).hypot(self.y - y)
    }

    /// A node stays alive while its battery holds any charge.
    pub fn alive(&self) -> bool {
        !self.battery.is_empty()
    }

    /// Lifetime packet delivery ratio of this node.
    pub fn pdr(&self) -> f64 {
        if self.packets_sent == 0 {
            0.0
        } else {
            self.packets_success as f64 / self.packets_sent as f64
        }
    }

    /// Delivery ratio over the rolling link history.
    pub fn recent_pdr(&self) -> f64 {
        if self.history.is_empty() {
            return 0.0;
        }
        let delivered = self.history.iter().filter(|s| s.delivered).count();
        delivered as f64 / self.history.len() as f64
    }

    /// Account spent energy and drain the battery accordingly.
    pub fn charge(&mut self, energy_j: f64) {
        self.energy_consumed_j += energy_j;
        self.battery.drain(energy_j);
    }

    /// Move the radio to `state` at time `now`, accounting the ambient draw
    /// of the state being left.
    pub fn set_radio_state(&mut self, state: RadioState, now: f64) {
        let elapsed = now - self.radio_state_since;
        if elapsed > 0.0 {
            let ambient = self.profile.state_energy_j(self.radio_state, elapsed);
            if ambient > 0.0 {
                self.charge(ambient);
            }
        }
        self.radio_state = state;
        self.radio_state_since = now;
    }

    /// Append one uplink outcome, keeping the window bounded.
    pub fn push_history(&mut self, sample: LinkSample) {
        self.history.push_back(sample);
        while self.history.len() > LINK_HISTORY_LEN {
            self.history.pop_front();
        }
    }

    /// Build the next uplink frame.
    ///
    /// Any pending MAC answer is prepended to the payload, the FCtrl bits are
    /// derived from the current MAC state, and the uplink counter advances.
    /// With ADR enabled this also drives the ADR_ACK back-off.
    pub fn prepare_uplink(&mut self, payload: &[u8], confirmed: bool) -> LoRaWanFrame {
        let mut data = Vec::with_capacity(payload.len() + 5);
        if let Some(answer) = self.pending_mac_answer.take() {
            data.extend_from_slice(&answer.encode());
        }
        data.extend_from_slice(payload);

        let mhdr = if confirmed {
            MHDR_CONFIRMED_UP
        } else {
            MHDR_UNCONFIRMED_UP
        };
        let mut fctrl = FCtrl::empty();
        if self.need_downlink_ack {
            fctrl |= FCtrl::ACK;
        }
        if self.adr_enabled {
            fctrl |= FCtrl::ADR;
            if self.adr_ack_cnt >= self.adr_ack_limit {
                fctrl |= FCtrl::ADR_ACK_REQ;
            }
        }

        let frame = LoRaWanFrame {
            mhdr,
            fctrl,
            fcnt: (self.fcnt_up & 0xFFFF) as u16,
            payload: data,
            confirmed,
        };
        self.fcnt_up += 1;
        if confirmed {
            self.awaiting_ack = true;
        }
        self.need_downlink_ack = false;

        if self.adr_enabled {
            self.adr_ack_cnt += 1;
            if self.adr_ack_cnt > self.adr_ack_limit + self.adr_ack_delay {
                self.adr_backoff();
            }
        }
        frame
    }

    /// ADR back-off: without any downlink for limit+delay uplinks, trade data
    /// rate for range; at SF12 raise output power one index instead.
    fn adr_backoff(&mut self) {
        if self.sf < SpreadingFactor::SF12 {
            self.sf = self.sf.slower();
            debug!("node {}: ADR back-off to SF{}", self.id, self.sf.as_u8());
        } else {
            let index = tx_power_to_index(self.tx_power_dbm);
            if index > 0 {
                if let Some(power) = tx_power_index_to_dbm(index - 1) {
                    self.tx_power_dbm = power;
                    debug!("node {}: ADR back-off to {} dBm", self.id, power);
                }
            }
        }
        // retry after another adr_ack_delay unacknowledged uplinks
        self.adr_ack_cnt = self.adr_ack_limit;
    }

    /// Process a received downlink frame.
    pub fn handle_downlink(&mut self, frame: &LoRaWanFrame) {
        self.fcnt_down = frame.fcnt as u32 + 1;
        if self.adr_enabled {
            self.adr_ack_cnt = 0;
        }
        if frame.fctrl.contains(FCtrl::ACK) {
            self.awaiting_ack = false;
            self.acks_received += 1;
        }
        if frame.confirmed {
            self.need_downlink_ack = true;
        }
        self.downlink_pending = self.downlink_pending.saturating_sub(1);

        match MacCommand::decode(&frame.payload) {
            Some(MacCommand::LinkAdrReq {
                data_rate,
                tx_power,
                ch_mask,
                redundancy,
            }) => {
                if let Some(sf) = dr_to_sf(data_rate) {
                    self.sf = sf;
                }
                if let Some(power) = tx_power_index_to_dbm(tx_power) {
                    self.tx_power_dbm = power;
                }
                let nb_trans = redundancy & 0x0F;
                self.nb_trans = if nb_trans == 0 { 1 } else { nb_trans };
                self.ch_mask = ch_mask;
                self.pending_mac_answer = Some(MacCommand::LinkAdrAns {
                    status: LINK_ADR_ANS_OK,
                });
                debug!(
                    "node {}: LinkADRReq applied, SF{} at {} dBm",
                    self.id,
                    self.sf.as_u8(),
                    self.tx_power_dbm
                );
            }
            Some(MacCommand::LinkCheckReq) => {
                self.pending_mac_answer = Some(MacCommand::LinkCheckAns {
                    margin: 255,
                    gw_cnt: 1,
                });
            }
            Some(MacCommand::DeviceTimeReq) => {
                self.pending_mac_answer = Some(MacCommand::DeviceTimeAns {
                    seconds: self.fcnt_up,
                    fractional: 0,
                });
            }
            _ => {}
        }
    }

    /// RX1 and RX2 opening times for an uplink that ended at `end_time`.
    pub fn schedule_receive_windows(&self, end_time: f64) -> (f64, f64) {
        (end_time + RX1_DELAY_S, end_time + RX2_DELAY_S)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_node() -> Node {
        Node::new(1, 0.0, 0.0, SpreadingFactor::SF7, 14.0, 0)
    }

    #[test]
    fn test_prepare_uplink_counts_and_ack_flag() {
        let mut node = test_node();
        let frame = node.prepare_uplink(b"ping", true);
        assert_eq!(frame.mhdr, MHDR_CONFIRMED_UP);
        assert!(frame.confirmed);
        assert_eq!(frame.fcnt, 0);
        assert_eq!(node.fcnt_up, 1);
        assert!(node.awaiting_ack);
    }

    #[test]
    fn test_pending_answer_is_prepended_once() {
        let mut node = test_node();
        node.pending_mac_answer = Some(MacCommand::LinkAdrAns {
            status: LINK_ADR_ANS_OK,
        });
        let frame = node.prepare_uplink(b"data", false);
        assert!(frame.payload.starts_with(&[0x03, LINK_ADR_ANS_OK]));
        assert!(node.pending_mac_answer.is_none());
        let next = node.prepare_uplink(b"data", false);
        assert_eq!(next.payload, b"data");
    }

    #[test]
    fn test_adr_backoff_raises_sf_then_power() {
        let mut node = test_node();
        node.adr_enabled = true;
        node.adr_ack_limit = 2;
        node.adr_ack_delay = 1;
        // uplinks 1..3 keep SF7; the 4th exceeds limit+delay
        for _ in 0..3 {
            node.prepare_uplink(b"x", false);
        }
        assert_eq!(node.sf, SpreadingFactor::SF7);
        node.prepare_uplink(b"x", false);
        assert_eq!(node.sf, SpreadingFactor::SF8);
        // at SF12 the next step raises output power instead
        node.sf = SpreadingFactor::SF12;
        node.tx_power_dbm = 14.0;
        node.adr_ack_cnt = node.adr_ack_limit + node.adr_ack_delay;
        node.prepare_uplink(b"x", false);
        assert_eq!(node.tx_power_dbm, 17.0);
    }

    #[test]
    fn test_adr_ack_req_bit() {
        let mut node = test_node();
        node.adr_enabled = true;
        node.adr_ack_limit = 1;
        let first = node.prepare_uplink(b"x", false);
        assert!(first.fctrl.contains(FCtrl::ADR));
        assert!(!first.fctrl.contains(FCtrl::ADR_ACK_REQ));
        let second = node.prepare_uplink(b"x", false);
        assert!(second.fctrl.contains(FCtrl::ADR_ACK_REQ));
    }

    #[test]
    fn test_handle_downlink_link_adr_req() {
        let mut node = test_node();
        let frame = LoRaWanFrame {
            mhdr: 0x60,
            fctrl: FCtrl::ACK,
            fcnt: 4,
            payload: MacCommand::LinkAdrReq {
                data_rate: 3,
                tx_power: 5,
                ch_mask: 0x0007,
                redundancy: 2,
            }
            .encode(),
            confirmed: true,
        };
        node.awaiting_ack = true;
        node.downlink_pending = 1;
        node.handle_downlink(&frame);
        assert_eq!(node.sf, SpreadingFactor::SF9);
        assert_eq!(node.tx_power_dbm, 5.0);
        assert_eq!(node.nb_trans, 2);
        assert_eq!(node.fcnt_down, 5);
        assert!(!node.awaiting_ack);
        assert_eq!(node.acks_received, 1);
        assert!(node.need_downlink_ack);
        assert_eq!(node.downlink_pending, 0);
        assert_eq!(
            node.pending_mac_answer,
            Some(MacCommand::LinkAdrAns {
                status: LINK_ADR_ANS_OK
            })
        );
    }

    #[test]
    fn test_distance_to() {
        let node = Node::new(0, 3.0, 0.0, SpreadingFactor::SF7, 14.0, 0);
        assert!((node.distance_to(0.0, 4.0) - 5.0).abs() < 1e-12);
        assert_eq!(node.distance_to(3.0, 0.0), 0.0);
    }

    #[test]
    fn test_battery_drain_clamps() {
        let mut battery = Battery::new(Some(1.0));
        assert_eq!(battery.drain(0.4), 0.4);
        assert_eq!(battery.drain(2.0), 0.6);
        assert!(battery.is_empty());
        assert_eq!(battery.remaining_j(), 0.0);
    }

    #[test]
    fn test_receive_window_times() {
        let node = test_node();
        assert_eq!(node.schedule_receive_windows(10.0), (11.0, 12.0));
    }

    #[test]
    fn test_recent_pdr_window() {
        let mut node = test_node();
        for i in 0..30 {
            node.push_history(LinkSample {
                snr_db: Some(0.0),
                delivered: i % 2 == 0,
            });
        }
        assert_eq!(node.history.len(), LINK_HISTORY_LEN);
        assert!((node.recent_pdr() - 0.5).abs() < 1e-9);
    }
}
