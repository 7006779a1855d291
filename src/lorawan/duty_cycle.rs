//! Regulatory duty-cycle enforcement.
//!
//! Tracks a per-device next-allowed-transmission time under a configured
//! duty-cycle fraction. After an air-time of `t` at duty cycle `d`, the
//! device owes an off-time that puts its next transmission at
//! `start + t / d`.

use std::collections::HashMap;

use log::debug;

/// Per-device duty-cycle bookkeeping.
#[derive(Debug, Clone)]
pub struct DutyCycleManager {
    duty_cycle: f64,
    next_allowed: HashMap<usize, f64>,
}

impl DutyCycleManager {
    /// `duty_cycle` is the permitted fraction of air-time, e.g. 0.01 for 1 %.
    pub fn new(duty_cycle: f64) -> Self {
        Self {
            duty_cycle,
            next_allowed: HashMap::new(),
        }
    }

    pub fn duty_cycle(&self) -> f64 {
        self.duty_cycle
    }

    /// Earliest time at or after `time` the node may start transmitting.
    pub fn enforce(&self, node_id: usize, time: f64) -> f64 {
        match self.next_allowed.get(&node_id) {
            Some(&allowed) => allowed.max(time),
            None => time,
        }
    }

    /// Register a transmission and advance the node's off-time.
    pub fn update_after_tx(&mut self, node_id: usize, start_time: f64, airtime_s: f64) {
        let next = start_time + airtime_s / self.duty_cycle;
        self.next_allowed.insert(node_id, next);
        debug!("duty cycle: node {node_id} may transmit again at t={next:.2}s");
    }
}
