//! Network-server side of the simulated LoRaWAN backend.
//!
//! The server deduplicates uplinks arriving through several gateways, keeps
//! delivery provenance, and when enabled runs the standard ADR margin
//! algorithm over a per-device SNR history, answering with LinkADRReq
//! downlinks through the first gateway.

use std::collections::{HashMap, HashSet, VecDeque};

use log::{debug, info};
use rand::Rng;

use crate::lorawan::frame::{FCtrl, LoRaWanFrame, MHDR_UNCONFIRMED_DOWN};
use crate::lorawan::gateway::{Delivery, Gateway};
use crate::lorawan::mac_commands::MacCommand;
use crate::lorawan::node::Node;
use crate::radio::channel::Channel;
use crate::radio::params::{
    sf_to_dr, tx_power_index_to_dbm, tx_power_to_index, SpreadingFactor, MAX_TX_POWER_INDEX,
};

/// Installation margin subtracted from the measured link margin.
pub const ADR_INSTALLATION_MARGIN_DB: f64 = 10.0;
/// SNR samples collected before each ADR evaluation.
pub const ADR_SNR_WINDOW: usize = 20;

/// Collects uplinks and drives the server-side ADR loop.
#[derive(Debug, Default)]
pub struct NetworkServer {
    pub adr_enabled: bool,
    received_events: HashSet<u64>,
    event_gateway: HashMap<u64, usize>,
    pub packets_received: u64,
    snr_history: HashMap<usize, VecDeque<f64>>,
}

impl NetworkServer {
    pub fn new(adr_enabled: bool) -> Self {
        Self {
            adr_enabled,
            ..Self::default()
        }
    }

    /// Whether the uplink identified by `event_id` reached the server.
    pub fn was_delivered(&self, event_id: u64) -> bool {
        self.received_events.contains(&event_id)
    }

    /// Gateway that first delivered `event_id`, if any.
    pub fn gateway_for(&self, event_id: u64) -> Option<usize> {
        self.event_gateway.get(&event_id).copied()
    }

    /// Delivered-uplink counts per gateway.
    pub fn deliveries_by_gateway(&self) -> HashMap<usize, u64> {
        let mut counts: HashMap<usize, u64> = HashMap::new();
        for gateway_id in self.event_gateway.values() {
            *counts.entry(*gateway_id).or_insert(0) += 1;
        }
        counts
    }

    /// Ingest one arbitrated uplink.
    ///
    /// Duplicates arriving through further gateways are ignored. With ADR
    /// enabled the measured SNR is appended to the device history and the
    /// margin algorithm runs once the history window is full.
    pub fn receive<R: Rng>(
        &mut self,
        delivery: Delivery,
        nodes: &mut [Node],
        gateways: &mut [Gateway],
        channel: &Channel,
        rng: &mut R,
    ) {
        if !self.received_events.insert(delivery.event_id) {
            debug!(
                "server: duplicate uplink event {} from node {} ignored",
                delivery.event_id, delivery.node_id
            );
            return;
        }
        self.event_gateway
            .insert(delivery.event_id, delivery.gateway_id);
        self.packets_received += 1;
        debug!(
            "server: uplink event {} from node {} via gateway {}",
            delivery.event_id, delivery.node_id, delivery.gateway_id
        );

        if !self.adr_enabled {
            return;
        }
        let snr_db = delivery.rssi_dbm - channel.noise_floor_dbm(rng);
        let history = self.snr_history.entry(delivery.node_id).or_default();
        history.push_back(snr_db);
        while history.len() > ADR_SNR_WINDOW {
            history.pop_front();
        }
        if history.len() < ADR_SNR_WINDOW {
            return;
        }
        let snr_max = history.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        self.run_adr(delivery.node_id, snr_max, nodes, gateways);
    }

    /// Standard ADR margin algorithm over the collected history.
    fn run_adr(
        &mut self,
        node_id: usize,
        snr_max: f64,
        nodes: &mut [Node],
        gateways: &mut [Gateway],
    ) {
        let (current_sf, current_power) = {
            let node = &nodes[node_id];
            (node.sf, node.tx_power_dbm)
        };
        let margin = snr_max - current_sf.required_snr_db() - ADR_INSTALLATION_MARGIN_DB;
        let mut nstep = (margin / 3.0).round() as i64;

        let mut sf = current_sf;
        let mut power_index = tx_power_to_index(current_power);
        while nstep > 0 {
            if sf > SpreadingFactor::SF7 {
                sf = sf.faster();
            } else if power_index < MAX_TX_POWER_INDEX {
                power_index += 1;
            }
            nstep -= 1;
        }
        while nstep < 0 {
            if power_index > 0 {
                power_index -= 1;
            } else {
                sf = sf.slower();
            }
            nstep += 1;
        }

        let changed = sf != current_sf || power_index != tx_power_to_index(current_power);
        if !changed {
            // the warm window keeps evaluating on every further uplink
            return;
        }
        // adjustment issued: collect a fresh window before the next one
        if let Some(history) = self.snr_history.get_mut(&node_id) {
            history.clear();
        }
        let power = tx_power_index_to_dbm(power_index).unwrap_or(current_power);
        info!(
            "server: ADR for node {} SF{} -> SF{}, {} -> {} dBm (margin {:.1} dB)",
            node_id,
            current_sf.as_u8(),
            sf.as_u8(),
            current_power,
            power,
            margin
        );
        self.send_downlink(
            &mut nodes[node_id],
            gateways,
            &[],
            false,
            Some((sf, power)),
            false,
        );
    }

    /// Queue a downlink frame for a node via the first gateway.
    ///
    /// When `adr_command` carries a rate/power pair the payload is replaced
    /// by the corresponding LinkADRReq.
    pub fn send_downlink(
        &mut self,
        node: &mut Node,
        gateways: &mut [Gateway],
        payload: &[u8],
        confirmed: bool,
        adr_command: Option<(SpreadingFactor, f64)>,
        request_ack: bool,
    ) {
        let Some(gateway) = gateways.first_mut() else {
            return;
        };
        let mut fctrl = FCtrl::empty();
        if request_ack {
            fctrl |= FCtrl::ACK;
        }
        let mut frame = LoRaWanFrame {
            mhdr: MHDR_UNCONFIRMED_DOWN,
            fctrl,
            fcnt: (node.fcnt_down & 0xFFFF) as u16,
            payload: payload.to_vec(),
            confirmed,
        };
        if let Some((sf, power)) = adr_command {
            frame.payload = MacCommand::LinkAdrReq {
                data_rate: sf_to_dr(sf),
                tx_power: tx_power_to_index(power),
                ch_mask: node.ch_mask,
                redundancy: node.nb_trans,
            }
            .encode();
        }
        node.fcnt_down += 1;
        node.downlink_pending += 1;
        gateway.buffer_downlink(node.id, frame);
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

    fn delivery(event_id: u64, rssi: f64) -> Delivery {
        Delivery {
            event_id,
            node_id: 0,
            gateway_id: 0,
            rssi_dbm: rssi,
        }
    }

    #[test]
    fn test_duplicates_are_suppressed() {
        let mut server = NetworkServer::new(false);
        let mut nodes = vec![Node::new(0, 0.0, 0.0, SpreadingFactor::SF7, 14.0, 0)];
        let mut gateways = vec![Gateway::new(0, 0.0, 0.0)];
        let ch = quiet_channel();
        let mut rng = StdRng::seed_from_u64(0);
        server.receive(delivery(1, -60.0), &mut nodes, &mut gateways, &ch, &mut rng);
        server.receive(
            Delivery {
                gateway_id: 1,
                ..delivery(1, -58.0)
            },
            &mut nodes,
            &mut gateways,
            &ch,
            &mut rng,
        );
        assert_eq!(server.packets_received, 1);
        assert_eq!(server.gateway_for(1), Some(0));
    }

    #[test]
    fn test_adr_runs_after_full_window() {
        let mut server = NetworkServer::new(true);
        let mut nodes = vec![Node::new(0, 0.0, 0.0, SpreadingFactor::SF12, 14.0, 0)];
        let mut gateways = vec![Gateway::new(0, 0.0, 0.0)];
        let ch = quiet_channel();
        let mut rng = StdRng::seed_from_u64(0);
        // strong link: SNR around 57 dB at -60 dBm
        for event in 0..ADR_SNR_WINDOW as u64 {
            server.receive(
                delivery(event, -60.0),
                &mut nodes,
                &mut gateways,
                &ch,
                &mut rng,
            );
        }
        assert_eq!(nodes[0].downlink_pending, 1);
        let frame = gateways[0].pop_downlink(0).expect("ADR downlink queued");
        let command = MacCommand::decode(&frame.payload).unwrap();
        match command {
            MacCommand::LinkAdrReq { data_rate, .. } => {
                // a wide margin converges all the way to SF7
                assert_eq!(data_rate, 5);
            }
            other => panic!("expected LinkAdrReq, got {other:?}"),
        }
    }

    #[test]
    fn test_warm_window_reevaluates_without_refill() {
        let mut server = NetworkServer::new(true);
        // already at the fastest rate and lowest power: nothing to adjust
        let mut nodes = vec![Node::new(0, 0.0, 0.0, SpreadingFactor::SF7, 2.0, 0)];
        let mut gateways = vec![Gateway::new(0, 0.0, 0.0)];
        let ch = quiet_channel();
        let mut rng = StdRng::seed_from_u64(0);
        for event in 0..ADR_SNR_WINDOW as u64 {
            server.receive(
                delivery(event, -60.0),
                &mut nodes,
                &mut gateways,
                &ch,
                &mut rng,
            );
        }
        assert!(gateways[0].pop_downlink(0).is_none());

        // the unchanged decision leaves the window warm, so a degraded
        // device triggers ADR on the very next uplink
        nodes[0].sf = SpreadingFactor::SF12;
        nodes[0].tx_power_dbm = 14.0;
        server.receive(
            delivery(100, -60.0),
            &mut nodes,
            &mut gateways,
            &ch,
            &mut rng,
        );
        assert!(gateways[0].pop_downlink(0).is_some());
    }

    #[test]
    fn test_no_adr_without_flag() {
        let mut server = NetworkServer::new(false);
        let mut nodes = vec![Node::new(0, 0.0, 0.0, SpreadingFactor::SF12, 14.0, 0)];
        let mut gateways = vec![Gateway::new(0, 0.0, 0.0)];
        let ch = quiet_channel();
        let mut rng = StdRng::seed_from_u64(0);
        for event in 0..(ADR_SNR_WINDOW as u64 * 2) {
            server.receive(
                delivery(event, -60.0),
                &mut nodes,
                &mut gateways,
                &ch,
                &mut rng,
            );
        }
        assert!(gateways[0].pop_downlink(0).is_none());
        assert_eq!(nodes[0].sf, SpreadingFactor::SF12);
    }
}
