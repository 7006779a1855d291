//! Aggregate metrics and the tabular event-log export.

use std::collections::BTreeMap;

use serde::Serialize;

/// Outcome of one logged event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TxResult {
    /// Delivered to the network server through at least one gateway.
    Success,
    /// Heard by a gateway but lost to a same-frequency collision.
    CollisionLoss,
    /// No gateway received enough signal to open a reception.
    NoCoverage,
    /// Position update of a mobile node, not a transmission.
    Mobility,
}

impl TxResult {
    pub fn as_str(self) -> &'static str {
        match self {
            TxResult::Success => "Success",
            TxResult::CollisionLoss => "CollisionLoss",
            TxResult::NoCoverage => "NoCoverage",
            TxResult::Mobility => "Mobility",
        }
    }
}

/// One append-only entry of the simulation event log.
///
/// Transmission entries are appended at tx-start with an open result that
/// tx-end fills in; mobility entries are complete on creation.
#[derive(Debug, Clone, Serialize)]
pub struct EventLogEntry {
    pub event_id: u64,
    pub node_id: usize,
    pub sf: u8,
    pub start_time: f64,
    pub end_time: f64,
    pub energy_j: f64,
    /// Whether any gateway opened a reception for this uplink.
    pub heard: bool,
    pub rssi_dbm: Option<f64>,
    pub snr_db: Option<f64>,
    pub result: Option<TxResult>,
    pub gateway_id: Option<usize>,
}

/// Aggregate statistics over a run.
#[derive(Debug, Clone, Serialize)]
pub struct Metrics {
    #[serde(rename = "PDR")]
    pub pdr: f64,
    pub collisions: u64,
    #[serde(rename = "energy_J")]
    pub energy_j: f64,
    pub avg_delay_s: f64,
    pub sf_distribution: BTreeMap<u8, usize>,
    pub pdr_by_node: BTreeMap<usize, f64>,
    pub recent_pdr_by_node: BTreeMap<usize, f64>,
    pub pdr_by_sf: BTreeMap<u8, f64>,
    pub pdr_by_gateway: BTreeMap<usize, f64>,
    pub retransmissions: u64,
}

impl Metrics {
    /// Serialize to a pretty-printed JSON object for external consumers
    /// such as dashboards or analysis scripts.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// One row of the tabular export: a log entry joined with the final state
/// of the node that produced it.
#[derive(Debug, Clone, Serialize)]
pub struct EventExportRow {
    pub event_id: u64,
    pub node_id: usize,
    pub initial_x: f64,
    pub initial_y: f64,
    pub final_x: f64,
    pub final_y: f64,
    pub initial_sf: u8,
    pub final_sf: u8,
    pub initial_tx_power: f64,
    pub final_tx_power: f64,
    pub packets_sent: u64,
    pub packets_success: u64,
    pub packets_collision: u64,
    #[serde(rename = "energy_consumed_J_node")]
    pub energy_consumed_j_node: f64,
    #[serde(rename = "battery_capacity_J")]
    pub battery_capacity_j: f64,
    #[serde(rename = "battery_remaining_J")]
    pub battery_remaining_j: f64,
    pub downlink_pending: u32,
    pub acks_received: u32,
    pub start_time: f64,
    pub end_time: f64,
    #[serde(rename = "energy_J")]
    pub energy_j: f64,
    #[serde(rename = "rssi_dBm")]
    pub rssi_dbm: Option<f64>,
    #[serde(rename = "snr_dB")]
    pub snr_db: Option<f64>,
    pub result: Option<TxResult>,
    pub gateway_id: Option<usize>,
}

/// Column order of the CSV export.
pub const EXPORT_COLUMNS: [&str; 25] = [
    "event_id",
    "node_id",
    "initial_x",
    "initial_y",
    "final_x",
    "final_y",
    "initial_sf",
    "final_sf",
    "initial_tx_power",
    "final_tx_power",
    "packets_sent",
    "packets_success",
    "packets_collision",
    "energy_consumed_J_node",
    "battery_capacity_J",
    "battery_remaining_J",
    "downlink_pending",
    "acks_received",
    "start_time",
    "end_time",
    "energy_J",
    "rssi_dBm",
    "snr_dB",
    "result",
    "gateway_id",
];

fn push_opt_f64(fields: &mut Vec<String>, value: Option<f64>) {
    match value {
        Some(v) => fields.push(format!("{v}")),
        None => fields.push(String::new()),
    }
}

/// Render export rows as CSV, header included.
pub fn rows_to_csv(rows: &[EventExportRow]) -> String {
    let mut csv = EXPORT_COLUMNS.join(",");
    csv.push('\n');
    for row in rows {
        let mut fields: Vec<String> = vec![
            row.event_id.to_string(),
            row.node_id.to_string(),
            format!("{}", row.initial_x),
            format!("{}", row.initial_y),
            format!("{}", row.final_x),
            format!("{}", row.final_y),
            row.initial_sf.to_string(),
            row.final_sf.to_string(),
            format!("{}", row.initial_tx_power),
            format!("{}", row.final_tx_power),
            row.packets_sent.to_string(),
            row.packets_success.to_string(),
            row.packets_collision.to_string(),
            format!("{}", row.energy_consumed_j_node),
            format!("{}", row.battery_capacity_j),
            format!("{}", row.battery_remaining_j),
            row.downlink_pending.to_string(),
            row.acks_received.to_string(),
            format!("{}", row.start_time),
            format!("{}", row.end_time),
            format!("{}", row.energy_j),
        ];
        push_opt_f64(&mut fields, row.rssi_dbm);
        push_opt_f64(&mut fields, row.snr_db);
        fields.push(row.result.map(|r| r.as_str().to_string()).unwrap_or_default());
        fields.push(
            row.gateway_id
                .map(|g| g.to_string())
                .unwrap_or_default(),
        );
        csv.push_str(&fields.join(","));
        csv.push('\n');
    }
    csv
}
