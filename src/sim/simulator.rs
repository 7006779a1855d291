//! Discrete-event simulation engine for LoRa networks.
//!
//! The `Simulator` owns every entity of a run: nodes, gateways, the channel
//! plan, the network server, the duty-cycle manager, the mobility model and
//! the event queue. All cross-references between entities are indices into
//! these arenas, so the dispatcher can mutate any of them without shared
//! ownership.
//!
//! The engine is single-threaded and cooperative: simulation time advances
//! only when [`Simulator::step`] pops the next event, and ties are resolved
//! by the `(time, priority, seq)` order of the queue. With a fixed seed a
//! run is exactly reproducible, event by event.

use std::collections::HashMap;
use std::path::Path;

use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Exp};

use crate::error::SimError;
use crate::lorawan::duty_cycle::DutyCycleManager;
use crate::lorawan::gateway::{Delivery, Gateway};
use crate::lorawan::node::{DeviceClass, LinkSample, Node};
use crate::lorawan::server::NetworkServer;
use crate::radio::energy::RadioState;
use crate::radio::multichannel::MultiChannel;
use crate::radio::params::SpreadingFactor;
use crate::sim::config::{SimConfig, TransmissionMode};
use crate::sim::event::{Event, EventKind, EventQueue};
use crate::sim::metrics::{rows_to_csv, EventExportRow, EventLogEntry, Metrics, TxResult};
use crate::sim::mobility::SmoothMobility;

/// Packet error rate over the link history that triggers the device-side
/// fallback ADR.
const PER_THRESHOLD: f64 = 0.1;
/// Installation margin used by the fallback ADR, matching the server side.
const MARGIN_DB: f64 = 10.0;
/// Class-B downlink poll period. Kept at 30 s for compatibility with the
/// historical behavior; the standard beacon period is 128 s.
const CLASS_B_POLL_S: f64 = 30.0;
/// Class-C re-poll delay while downlinks remain queued.
const CLASS_C_POLL_S: f64 = 1.0;
/// Output power floor for the fallback ADR.
const MIN_TX_POWER_DBM: f64 = 2.0;
/// Output power ceiling for the fallback ADR.
const MAX_TX_POWER_DBM: f64 = 20.0;
/// Initial output power when none is fixed by the configuration.
const DEFAULT_TX_POWER_DBM: f64 = 14.0;

/// The discrete-event simulation engine.
pub struct Simulator {
    config: SimConfig,
    multichannel: MultiChannel,
    nodes: Vec<Node>,
    gateways: Vec<Gateway>,
    server: NetworkServer,
    duty_cycle: Option<DutyCycleManager>,
    mobility: SmoothMobility,
    queue: EventQueue,
    rng: StdRng,
    uplink_exp: Exp<f64>,
    next_event_id: u64,
    current_time: f64,
    running: bool,

    packets_sent: u64,
    packets_delivered: u64,
    packets_lost_collision: u64,
    packets_lost_no_signal: u64,
    total_energy_j: f64,
    total_delay_s: f64,
    delivered_count: u64,

    events_log: Vec<EventLogEntry>,
    log_index: HashMap<u64, usize>,
}

impl Simulator {
    /// Build a simulator and schedule the initial events.
    ///
    /// Gateways go to the area center when there is a single one, otherwise
    /// to uniformly random positions; nodes always start at random
    /// positions. Each node gets a channel from the plan, its starting SF
    /// and power, and a first uplink offset drawn from the traffic model.
    pub fn new(config: SimConfig) -> Result<Self, SimError> {
        config.validate()?;
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let uplink_exp = Exp::new(1.0 / config.packet_interval_s)
            .map_err(|_| SimError::InvalidConfig("packet_interval_s must be positive".into()))?;
        let mut multichannel =
            MultiChannel::new(config.channels.clone(), config.channel_distribution)?;

        let mut gateways = Vec::with_capacity(config.num_gateways);
        for id in 0..config.num_gateways {
            let (x, y) = if config.num_gateways == 1 {
                (config.area_size_m / 2.0, config.area_size_m / 2.0)
            } else {
                (
                    rng.gen::<f64>() * config.area_size_m,
                    rng.gen::<f64>() * config.area_size_m,
                )
            };
            gateways.push(Gateway::new(id, x, y));
        }

        let mobility = SmoothMobility::new(
            config.area_size_m,
            config.mobility_speed_mps.0,
            config.mobility_speed_mps.1,
        );

        let mut nodes = Vec::with_capacity(config.num_nodes);
        for id in 0..config.num_nodes {
            let x = rng.gen::<f64>() * config.area_size_m;
            let y = rng.gen::<f64>() * config.area_size_m;
            let sf = match config.fixed_sf {
                Some(value) => SpreadingFactor::from_u8(value).ok_or_else(|| {
                    SimError::InvalidConfig(format!("fixed_sf must be within 7..=12, got {value}"))
                })?,
                None => {
                    let value = rng.gen_range(7..=12);
                    SpreadingFactor::from_u8(value)
                        .unwrap_or(SpreadingFactor::SF7)
                }
            };
            let tx_power = config.fixed_tx_power_dbm.unwrap_or(DEFAULT_TX_POWER_DBM);
            let channel = multichannel.select(&mut rng);
            let mut node = Node::new(id, x, y, sf, tx_power, channel);
            node.class = config.device_class;
            node.adr_enabled = config.adr_node;
            node.battery = crate::lorawan::node::Battery::new(config.battery_capacity_j);
            node.profile = config.energy_profile;
            if config.mobility {
                mobility.assign(&mut node, &mut rng);
            }
            nodes.push(node);
        }

        let mut simulator = Self {
            server: NetworkServer::new(config.adr_server),
            duty_cycle: config.duty_cycle.map(DutyCycleManager::new),
            multichannel,
            nodes,
            gateways,
            mobility,
            queue: EventQueue::new(),
            rng,
            uplink_exp,
            next_event_id: 0,
            current_time: 0.0,
            running: true,
            packets_sent: 0,
            packets_delivered: 0,
            packets_lost_collision: 0,
            packets_lost_no_signal: 0,
            total_energy_j: 0.0,
            total_delay_s: 0.0,
            delivered_count: 0,
            events_log: Vec::new(),
            log_index: HashMap::new(),
            config,
        };

        for node_idx in 0..simulator.nodes.len() {
            let offset = match simulator.config.transmission_mode {
                TransmissionMode::Random => simulator.uplink_exp.sample(&mut simulator.rng),
                TransmissionMode::Periodic => {
                    simulator.rng.gen::<f64>() * simulator.config.packet_interval_s
                }
            };
            simulator.schedule_transmission(node_idx, offset);
            if simulator.config.mobility {
                simulator.schedule_mobility(node_idx, simulator.mobility.step_s);
            }
            if matches!(
                simulator.nodes[node_idx].class,
                DeviceClass::ClassB | DeviceClass::ClassC
            ) {
                simulator.schedule_receive_window(node_idx, 0.0);
            }
        }

        info!(
            "simulation initialized: {} nodes, {} gateways, {} channels, area {} m",
            simulator.nodes.len(),
            simulator.gateways.len(),
            simulator.multichannel.len(),
            simulator.config.area_size_m
        );
        Ok(simulator)
    }

    fn next_id(&mut self) -> u64 {
        let id = self.next_event_id;
        self.next_event_id += 1;
        id
    }

    /// Schedule an uplink start for a node at the given time.
    pub fn schedule_transmission(&mut self, node_idx: usize, time: f64) {
        let event_id = self.next_id();
        self.queue.push(time, EventKind::TxStart, event_id, node_idx);
        debug!("scheduled transmission {event_id} for node {node_idx} at t={time:.2}s");
    }

    fn schedule_mobility(&mut self, node_idx: usize, time: f64) {
        let event_id = self.next_id();
        self.queue.push(time, EventKind::Mobility, event_id, node_idx);
    }

    fn schedule_receive_window(&mut self, node_idx: usize, time: f64) {
        let event_id = self.next_id();
        self.queue
            .push(time, EventKind::ReceiveWindow, event_id, node_idx);
    }

    /// Dispatch the next event. Returns false when stopped or drained.
    pub fn step(&mut self) -> bool {
        if !self.running {
            return false;
        }
        let Some(event) = self.queue.pop() else {
            return false;
        };
        self.current_time = event.time;
        match event.kind {
            EventKind::TxStart => self.on_tx_start(event),
            EventKind::TxEnd => self.on_tx_end(event),
            EventKind::ReceiveWindow => self.on_receive_window(event),
            EventKind::Mobility => self.on_mobility(event),
        }
        true
    }

    /// Process events until the queue drains or `stop` is called.
    pub fn run(&mut self) {
        while self.running && !self.queue.is_empty() {
            self.step();
        }
    }

    /// Like [`Simulator::run`] but bounded to `max_steps` dispatches.
    pub fn run_for(&mut self, max_steps: usize) {
        let mut steps = 0;
        while self.running && !self.queue.is_empty() && steps < max_steps {
            self.step();
            steps += 1;
        }
    }

    /// Make `run` exit before dispatching the next event. Pending events are
    /// discarded on drop; already-applied state is untouched.
    pub fn stop(&mut self) {
        self.running = false;
    }

    fn on_tx_start(&mut self, event: Event) {
        let node_idx = event.node;
        if !self.nodes[node_idx].alive() {
            debug!(
                "node {node_idx}: battery exhausted, transmission {} dropped",
                event.event_id
            );
            return;
        }
        if let Some(manager) = &self.duty_cycle {
            let allowed = manager.enforce(node_idx, event.time);
            if allowed > event.time {
                debug!(
                    "node {node_idx}: duty cycle defers transmission {} to t={allowed:.2}s",
                    event.event_id
                );
                self.queue
                    .push(allowed, EventKind::TxStart, event.event_id, node_idx);
                return;
            }
        }

        let payload = vec![0u8; self.config.payload_size];
        let (sf, tx_power, frame_len, node_x, node_y, channel_idx) = {
            let node = &mut self.nodes[node_idx];
            let frame = node.prepare_uplink(&payload, false);
            (
                node.sf,
                node.tx_power_dbm,
                frame.payload.len(),
                node.x,
                node.y,
                node.channel,
            )
        };

        let mut heard = false;
        let mut best_rssi: Option<f64> = None;
        let mut best_snr: Option<f64> = None;
        let (duration, end_time, energy_j) = {
            let channel = &self.multichannel.channels[channel_idx];
            let duration = channel.airtime(sf, frame_len);
            let end_time = event.time + duration;
            let energy_j = 10f64.powf(tx_power / 10.0) / 1000.0 * duration;

            for gateway in &mut self.gateways {
                let distance = (node_x - gateway.x).hypot(node_y - gateway.y);
                let (rssi, snr, noise_floor) =
                    channel.compute_link(tx_power, distance, &mut self.rng);
                let threshold = channel.sensitivity_dbm(sf) - noise_floor;
                if snr < threshold {
                    continue;
                }
                heard = true;
                if best_rssi.map_or(true, |best| rssi > best) {
                    best_rssi = Some(rssi);
                }
                if best_snr.map_or(true, |best| snr > best) {
                    best_snr = Some(snr);
                }
                gateway.start_reception(
                    event.event_id,
                    node_idx,
                    sf,
                    rssi,
                    end_time,
                    channel.capture_threshold_db,
                    channel.frequency_hz,
                );
            }
            (duration, end_time, energy_j)
        };

        if let Some(manager) = &mut self.duty_cycle {
            manager.update_after_tx(node_idx, event.time, duration);
        }
        self.packets_sent += 1;
        self.total_energy_j += energy_j;
        {
            let node = &mut self.nodes[node_idx];
            node.packets_sent += 1;
            node.set_radio_state(RadioState::Tx, event.time);
            node.charge(energy_j);
            node.in_transmission = true;
            node.current_end_time = Some(end_time);
            node.last_rssi_dbm = best_rssi;
            node.last_snr_db = best_snr;
        }

        self.queue
            .push(end_time, EventKind::TxEnd, event.event_id, node_idx);
        let (rx1, rx2) = self.nodes[node_idx].schedule_receive_windows(end_time);
        self.schedule_receive_window(node_idx, rx1);
        self.schedule_receive_window(node_idx, rx2);

        if self.config.packets_to_send == 0 || self.packets_sent < self.config.packets_to_send {
            let interval = match self.config.transmission_mode {
                TransmissionMode::Random => self.uplink_exp.sample(&mut self.rng),
                TransmissionMode::Periodic => self.config.packet_interval_s,
            };
            self.schedule_transmission(node_idx, end_time + interval);
        } else {
            // budget reached: in-flight transmissions complete, nothing new starts
            self.queue.retain_tx_end();
            debug!("packet limit reached, pending transmissions flushed");
        }

        self.log_index.insert(event.event_id, self.events_log.len());
        self.events_log.push(EventLogEntry {
            event_id: event.event_id,
            node_id: node_idx,
            sf: sf.as_u8(),
            start_time: event.time,
            end_time,
            energy_j,
            heard,
            rssi_dbm: best_rssi,
            snr_db: best_snr,
            result: None,
            gateway_id: None,
        });
    }

    fn on_tx_end(&mut self, event: Event) {
        let node_idx = event.node;
        let channel_idx = self.nodes[node_idx].channel;
        {
            let node = &mut self.nodes[node_idx];
            node.in_transmission = false;
            node.current_end_time = None;
            node.set_radio_state(RadioState::Sleep, event.time);
        }

        {
            let channel = &self.multichannel.channels[channel_idx];
            let mut deliveries: Vec<Delivery> = Vec::new();
            for gateway in &mut self.gateways {
                if let Some(delivery) = gateway.end_reception(event.event_id, channel) {
                    deliveries.push(delivery);
                }
            }
            for delivery in deliveries {
                self.server.receive(
                    delivery,
                    &mut self.nodes,
                    &mut self.gateways,
                    channel,
                    &mut self.rng,
                );
            }
        }

        let delivered = self.server.was_delivered(event.event_id);
        let log_pos = self.log_index.get(&event.event_id).copied();
        let heard = log_pos.map_or(false, |pos| self.events_log[pos].heard);

        if delivered {
            self.packets_delivered += 1;
            self.nodes[node_idx].packets_success += 1;
            if let Some(pos) = log_pos {
                let delay = self.current_time - self.events_log[pos].start_time;
                self.total_delay_s += delay;
                self.delivered_count += 1;
            }
        } else if heard {
            self.packets_lost_collision += 1;
            self.nodes[node_idx].packets_collision += 1;
        } else {
            self.packets_lost_no_signal += 1;
        }

        if let Some(pos) = log_pos {
            let entry = &mut self.events_log[pos];
            entry.result = Some(if delivered {
                TxResult::Success
            } else if heard {
                TxResult::CollisionLoss
            } else {
                TxResult::NoCoverage
            });
            entry.gateway_id = if delivered {
                self.server.gateway_for(event.event_id)
            } else {
                None
            };
        }

        if self.config.adr_node {
            let snr_db = if delivered {
                self.nodes[node_idx].last_snr_db
            } else {
                None
            };
            self.nodes[node_idx].push_history(LinkSample { snr_db, delivered });
            if self.config.adr_server {
                self.node_fallback_adr(node_idx);
            }
        }
    }

    /// Device-side fallback ADR, evaluated over the rolling link history
    /// after every uplink: a lossy link gains range, a link with spare
    /// margin sheds SF and power.
    fn node_fallback_adr(&mut self, node_idx: usize) {
        let node = &mut self.nodes[node_idx];
        let total = node.history.len();
        if total == 0 {
            return;
        }
        let delivered = node.history.iter().filter(|s| s.delivered).count();
        let per = (total - delivered) as f64 / total as f64;
        let snr_max = node
            .history
            .iter()
            .filter_map(|s| s.snr_db)
            .fold(f64::NEG_INFINITY, f64::max);
        let margin = if snr_max.is_finite() {
            Some(snr_max - node.sf.required_snr_db() - MARGIN_DB)
        } else {
            None
        };

        if per > PER_THRESHOLD {
            if node.sf < SpreadingFactor::SF12 {
                node.sf = node.sf.slower();
            } else if node.tx_power_dbm < MAX_TX_POWER_DBM {
                node.tx_power_dbm = (node.tx_power_dbm + 3.0).min(MAX_TX_POWER_DBM);
            }
            node.history.clear();
            debug!(
                "node {node_idx}: fallback ADR raised range, SF{} at {} dBm",
                node.sf.as_u8(),
                node.tx_power_dbm
            );
        } else if let Some(margin) = margin.filter(|&m| m > 0.0) {
            let mut steps = (margin / 3.0).floor() as i64;
            while steps > 0 {
                if node.sf > SpreadingFactor::SF7 {
                    node.sf = node.sf.faster();
                    if node.tx_power_dbm > MIN_TX_POWER_DBM {
                        node.tx_power_dbm = (node.tx_power_dbm - 3.0).max(MIN_TX_POWER_DBM);
                    }
                    steps -= 1;
                } else if node.tx_power_dbm > MIN_TX_POWER_DBM {
                    node.tx_power_dbm = (node.tx_power_dbm - 3.0).max(MIN_TX_POWER_DBM);
                    steps -= 1;
                } else {
                    break;
                }
            }
            node.history.clear();
            debug!(
                "node {node_idx}: fallback ADR shed margin, SF{} at {} dBm",
                node.sf.as_u8(),
                node.tx_power_dbm
            );
        }
    }

    fn on_receive_window(&mut self, event: Event) {
        let node_idx = event.node;
        {
            // open the receiver for one window
            let node = &mut self.nodes[node_idx];
            node.set_radio_state(RadioState::Rx, event.time);
            let window_energy = node.profile.rx_window_energy_j();
            node.charge(window_energy);
            node.set_radio_state(RadioState::Sleep, event.time);
        }

        let (sf, tx_power, node_x, node_y, channel_idx) = {
            let node = &self.nodes[node_idx];
            (node.sf, node.tx_power_dbm, node.x, node.y, node.channel)
        };

        let mut selected_gateway: Option<usize> = None;
        {
            let channel = &self.multichannel.channels[channel_idx];
            for (gateway_idx, gateway) in self.gateways.iter_mut().enumerate() {
                let Some(frame) = gateway.pop_downlink(node_idx) else {
                    continue;
                };
                let distance = (node_x - gateway.x).hypot(node_y - gateway.y);
                let (_rssi, snr, noise_floor) =
                    channel.compute_link(tx_power, distance, &mut self.rng);
                let threshold = channel.sensitivity_dbm(sf) - noise_floor;
                if snr >= threshold {
                    self.nodes[node_idx].handle_downlink(&frame);
                } else {
                    debug!(
                        "node {node_idx}: downlink from gateway {gateway_idx} under sensitivity, dropped"
                    );
                }
                selected_gateway = Some(gateway_idx);
                break;
            }
        }

        match self.nodes[node_idx].class {
            DeviceClass::ClassB => {
                self.schedule_receive_window(node_idx, event.time + CLASS_B_POLL_S);
            }
            DeviceClass::ClassC => {
                if let Some(gateway_idx) = selected_gateway {
                    if self.gateways[gateway_idx].has_downlink(node_idx) {
                        self.schedule_receive_window(node_idx, event.time + CLASS_C_POLL_S);
                    }
                }
            }
            DeviceClass::ClassA => {}
        }
    }

    fn on_mobility(&mut self, event: Event) {
        if !self.config.mobility {
            return;
        }
        let node_idx = event.node;
        if self.nodes[node_idx].in_transmission {
            // keep the link geometry stable for the transmission in flight
            let resume = self.nodes[node_idx]
                .current_end_time
                .unwrap_or(self.current_time);
            self.schedule_mobility(node_idx, resume);
            return;
        }
        self.mobility
            .advance(&mut self.nodes[node_idx], self.current_time, &mut self.rng);

        let sf = self.nodes[node_idx].sf;
        self.log_index.insert(event.event_id, self.events_log.len());
        self.events_log.push(EventLogEntry {
            event_id: event.event_id,
            node_id: node_idx,
            sf: sf.as_u8(),
            start_time: event.time,
            end_time: event.time,
            energy_j: 0.0,
            heard: false,
            rssi_dbm: None,
            snr_db: None,
            result: Some(TxResult::Mobility),
            gateway_id: None,
        });

        if self.config.packets_to_send == 0 || self.packets_sent < self.config.packets_to_send {
            self.schedule_mobility(node_idx, event.time + self.mobility.step_s);
        }
    }

    // ------------------------------------------------------------------
    // Introspection and export
    // ------------------------------------------------------------------

    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn nodes_mut(&mut self) -> &mut [Node] {
        &mut self.nodes
    }

    pub fn gateways(&self) -> &[Gateway] {
        &self.gateways
    }

    pub fn gateways_mut(&mut self) -> &mut [Gateway] {
        &mut self.gateways
    }

    pub fn server(&self) -> &NetworkServer {
        &self.server
    }

    pub fn events_log(&self) -> &[EventLogEntry] {
        &self.events_log
    }

    pub fn pending_events(&self) -> usize {
        self.queue.len()
    }

    /// Discard every scheduled event. Meant for tests and embedders that
    /// rebuild a custom schedule.
    pub fn clear_pending_events(&mut self) {
        self.queue.clear();
    }

    pub fn packets_sent(&self) -> u64 {
        self.packets_sent
    }

    pub fn packets_delivered(&self) -> u64 {
        self.packets_delivered
    }

    pub fn packets_lost_collision(&self) -> u64 {
        self.packets_lost_collision
    }

    pub fn packets_lost_no_signal(&self) -> u64 {
        self.packets_lost_no_signal
    }

    pub fn total_energy_j(&self) -> f64 {
        self.total_energy_j
    }

    /// Aggregate statistics of the run so far.
    pub fn get_metrics(&self) -> Metrics {
        let pdr = if self.packets_sent > 0 {
            self.packets_delivered as f64 / self.packets_sent as f64
        } else {
            0.0
        };
        let avg_delay_s = if self.delivered_count > 0 {
            self.total_delay_s / self.delivered_count as f64
        } else {
            0.0
        };

        let mut sf_distribution = std::collections::BTreeMap::new();
        let mut pdr_by_sf = std::collections::BTreeMap::new();
        for sf in SpreadingFactor::ALL {
            let on_sf: Vec<&Node> = self.nodes.iter().filter(|n| n.sf == sf).collect();
            sf_distribution.insert(sf.as_u8(), on_sf.len());
            let sent: u64 = on_sf.iter().map(|n| n.packets_sent).sum();
            let success: u64 = on_sf.iter().map(|n| n.packets_success).sum();
            let ratio = if sent > 0 {
                success as f64 / sent as f64
            } else {
                0.0
            };
            pdr_by_sf.insert(sf.as_u8(), ratio);
        }

        let pdr_by_node = self.nodes.iter().map(|n| (n.id, n.pdr())).collect();
        let recent_pdr_by_node = self.nodes.iter().map(|n| (n.id, n.recent_pdr())).collect();

        let delivery_counts = self.server.deliveries_by_gateway();
        let pdr_by_gateway = self
            .gateways
            .iter()
            .map(|gateway| {
                let count = delivery_counts.get(&gateway.id).copied().unwrap_or(0);
                let ratio = if self.packets_sent > 0 {
                    count as f64 / self.packets_sent as f64
                } else {
                    0.0
                };
                (gateway.id, ratio)
            })
            .collect();

        Metrics {
            pdr,
            collisions: self.packets_lost_collision,
            energy_j: self.total_energy_j,
            avg_delay_s,
            sf_distribution,
            pdr_by_node,
            recent_pdr_by_node,
            pdr_by_sf,
            pdr_by_gateway,
            retransmissions: self.packets_lost_collision,
        }
    }

    /// The event log joined with each node's initial and final state.
    pub fn export_events(&self) -> Vec<EventExportRow> {
        self.events_log
            .iter()
            .map(|entry| {
                let node = &self.nodes[entry.node_id];
                EventExportRow {
                    event_id: entry.event_id,
                    node_id: entry.node_id,
                    initial_x: node.initial_x,
                    initial_y: node.initial_y,
                    final_x: node.x,
                    final_y: node.y,
                    initial_sf: node.initial_sf.as_u8(),
                    final_sf: node.sf.as_u8(),
                    initial_tx_power: node.initial_tx_power_dbm,
                    final_tx_power: node.tx_power_dbm,
                    packets_sent: node.packets_sent,
                    packets_success: node.packets_success,
                    packets_collision: node.packets_collision,
                    energy_consumed_j_node: node.energy_consumed_j,
                    battery_capacity_j: node.battery.capacity_j(),
                    battery_remaining_j: node.battery.remaining_j(),
                    downlink_pending: node.downlink_pending,
                    acks_received: node.acks_received,
                    start_time: entry.start_time,
                    end_time: entry.end_time,
                    energy_j: entry.energy_j,
                    rssi_dbm: entry.rssi_dbm,
                    snr_db: entry.snr_db,
                    result: entry.result,
                    gateway_id: entry.gateway_id,
                }
            })
            .collect()
    }

    /// Render the event export as CSV, header included.
    pub fn export_events_csv(&self) -> String {
        rows_to_csv(&self.export_events())
    }

    /// Write the event export to a CSV file.
    pub fn write_events_csv<P: AsRef<Path>>(&self, path: P) -> Result<(), SimError> {
        std::fs::write(path, self.export_events_csv())?;
        Ok(())
    }
}
