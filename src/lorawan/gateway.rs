//! Gateway-side concurrent reception arbitration and downlink buffering.
//!
//! A gateway tracks every uplink it is currently demodulating. New signals
//! are checked pairwise against the active set on the same frequency: the
//! stronger one captures the receiver when it exceeds the weaker by the
//! capture threshold, otherwise both are lost. Signals on different
//! frequencies never interact.

use std::collections::{HashMap, VecDeque};

use log::debug;

use crate::lorawan::frame::LoRaWanFrame;
use crate::radio::channel::Channel;
use crate::radio::params::SpreadingFactor;

/// Bookkeeping for one in-flight uplink as seen by a gateway.
#[derive(Debug, Clone)]
pub struct ReceptionRecord {
    pub event_id: u64,
    pub node_id: usize,
    pub sf: SpreadingFactor,
    pub frequency_hz: f64,
    pub rssi_dbm: f64,
    pub end_time: f64,
    pub collided: bool,
}

/// A successfully arbitrated uplink handed to the network server.
#[derive(Debug, Clone, Copy)]
pub struct Delivery {
    pub event_id: u64,
    pub node_id: usize,
    pub gateway_id: usize,
    pub rssi_dbm: f64,
}

/// One simulated gateway.
#[derive(Debug, Clone, Default)]
pub struct Gateway {
    pub id: usize,
    pub x: f64,
    pub y: f64,
    active: HashMap<u64, ReceptionRecord>,
    downlinks: HashMap<usize, VecDeque<LoRaWanFrame>>,
}

impl Gateway {
    pub fn new(id: usize, x: f64, y: f64) -> Self {
        Self {
            id,
            x,
            y,
            ..Self::default()
        }
    }

    /// Open a reception record for an uplink that just started.
    ///
    /// Every already-active record on the same frequency is arbitrated
    /// pairwise against the new signal under the capture rule.
    #[allow(clippy::too_many_arguments)]
    pub fn start_reception(
        &mut self,
        event_id: u64,
        node_id: usize,
        sf: SpreadingFactor,
        rssi_dbm: f64,
        end_time: f64,
        capture_threshold_db: f64,
        frequency_hz: f64,
    ) {
        let mut record = ReceptionRecord {
            event_id,
            node_id,
            sf,
            frequency_hz,
            rssi_dbm,
            end_time,
            collided: false,
        };
        for other in self.active.values_mut() {
            if other.frequency_hz != frequency_hz {
                continue;
            }
            let difference = record.rssi_dbm - other.rssi_dbm;
            if difference >= capture_threshold_db {
                // new signal captures the receiver
                other.collided = true;
            } else if -difference >= capture_threshold_db {
                // an active signal captures, the newcomer is lost
                record.collided = true;
            } else {
                other.collided = true;
                record.collided = true;
            }
        }
        if record.collided {
            debug!(
                "gateway {}: event {} from node {} collides on {:.1} MHz",
                self.id,
                event_id,
                node_id,
                frequency_hz / 1e6
            );
        }
        self.active.insert(event_id, record);
    }

    /// Close the reception record for `event_id`.
    ///
    /// Returns the delivery to forward to the network server when the signal
    /// survived arbitration and meets the SF sensitivity on `channel`.
    pub fn end_reception(&mut self, event_id: u64, channel: &Channel) -> Option<Delivery> {
        let record = self.active.remove(&event_id)?;
        if record.collided {
            return None;
        }
        if record.rssi_dbm < channel.sensitivity_dbm(record.sf) {
            debug!(
                "gateway {}: event {} under SF{} sensitivity, dropped",
                self.id,
                event_id,
                record.sf.as_u8()
            );
            return None;
        }
        Some(Delivery {
            event_id,
            node_id: record.node_id,
            gateway_id: self.id,
            rssi_dbm: record.rssi_dbm,
        })
    }

    /// Number of receptions currently being demodulated.
    pub fn active_receptions(&self) -> usize {
        self.active.len()
    }

    /// Queue a downlink frame for a node.
    pub fn buffer_downlink(&mut self, node_id: usize, frame: LoRaWanFrame) {
        self.downlinks.entry(node_id).or_default().push_back(frame);
    }

    /// Take the oldest queued downlink for a node, if any.
    pub fn pop_downlink(&mut self, node_id: usize) -> Option<LoRaWanFrame> {
        self.downlinks.get_mut(&node_id)?.pop_front()
    }

    /// Whether any downlink is still queued for a node.
    pub fn has_downlink(&self, node_id: usize) -> bool {
        self.downlinks.get(&node_id).is_some_and(|q| !q.is_empty())
    }
}
