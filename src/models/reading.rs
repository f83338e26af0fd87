use serde::{Deserialize, Serialize};

/// Width of the rendered bar graph. Matches the 41-column session log lines
/// the tuning tools expect.
pub const GRAPH_WIDTH: usize = 41;

/// One calibrated sample recorded during a detection session.
///
/// Immutable once recorded; owned by the session buffer it was pushed into.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reading {
    /// Channel 1 voltage (downstairs button), volts.
    pub voltage1: f32,
    /// Channel 2 voltage (door button), volts.
    pub voltage2: f32,
    /// Milliseconds since the session opened. Non-decreasing within a session.
    pub elapsed_ms: u64,
    /// Fixed-width visualization of both channels against the supply rail.
    pub graph: String,
}

impl Reading {
    pub fn new(
        voltage1: f32,
        voltage2: f32,
        elapsed_ms: u64,
        supply_voltage: f32,
        threshold: f32,
    ) -> Self {
        Self {
            voltage1,
            voltage2,
            elapsed_ms,
            graph: render_graph(voltage1, voltage2, supply_voltage, threshold),
        }
    }
}

/// Render both channels onto a fixed-width bar: `1` marks channel 1, `2`
/// marks channel 2, `*` where they coincide, `|` the detection threshold.
pub fn render_graph(v1: f32, v2: f32, supply_voltage: f32, threshold: f32) -> String {
    let mut cells = vec!['.'; GRAPH_WIDTH];

    let column = |volts: f32| -> usize {
        if supply_voltage <= 0.0 {
            return 0;
        }
        let normalized = (volts / supply_voltage).clamp(0.0, 1.0);
        (normalized * (GRAPH_WIDTH - 1) as f32).round() as usize
    };

    cells[column(threshold)] = '|';

    let c1 = column(v1);
    let c2 = column(v2);
    if c1 == c2 {
        cells[c1] = '*';
    } else {
        cells[c1] = '1';
        cells[c2] = '2';
    }

    cells.into_iter().collect()
}
