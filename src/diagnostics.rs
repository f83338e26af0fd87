use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::models::{Button, CloseReason, EndedSession, Reading};
use crate::publish::{publish_json, EventPublisher, DEBUG_TOPIC};

const MAX_RECENT_REPORTS: usize = 20;

/// Per-session diagnostic record, used for tuning the detector constants.
/// Observability only; never an input to control decisions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionReport {
    pub id: String,
    pub recorded_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub max_voltage: f32,
    pub num_readings: usize,
    pub close_reason: CloseReason,
    pub button: Option<Button>,
    pub readings: Vec<Reading>,
}

impl SessionReport {
    pub fn from_session(ended: EndedSession) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            recorded_at: Utc::now(),
            duration_ms: ended.duration_ms(),
            max_voltage: ended.max_voltage,
            num_readings: ended.readings.len(),
            close_reason: ended.reason,
            button: ended.button,
            readings: ended.readings,
        }
    }
}

/// Session lifecycle marker on the debug topic; the host-side session logger
/// keys on `status` to open and close its capture files.
#[derive(Debug, Serialize)]
struct SessionMarker<'a> {
    status: &'a str,
}

/// One sample line on the debug topic, in the layout the session logger
/// ingests (`delta`, `adc1_v`, `adc2_v`).
#[derive(Debug, Serialize)]
struct SampleLine {
    delta: u64,
    adc1_v: f32,
    adc2_v: f32,
}

/// Summary line published after the `ended` marker.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionSummaryLine<'a> {
    duration_ms: u64,
    max_voltage: f32,
    num_readings: usize,
    close_reason: CloseReason,
    button: Option<&'a str>,
}

/// Keeps the most recent session reports in memory and mirrors each one to
/// the debug topic.
pub struct DiagnosticsRecorder {
    publisher: Arc<dyn EventPublisher>,
    recent: Vec<SessionReport>,
}

impl DiagnosticsRecorder {
    pub fn new(publisher: Arc<dyn EventPublisher>) -> Self {
        Self {
            publisher,
            recent: Vec::with_capacity(MAX_RECENT_REPORTS),
        }
    }

    pub fn record(&mut self, report: SessionReport) {
        self.emit_debug_lines(&report);

        self.recent.push(report);
        if self.recent.len() > MAX_RECENT_REPORTS {
            self.recent.remove(0);
        }
    }

    pub fn recent(&self) -> &[SessionReport] {
        &self.recent
    }

    fn emit_debug_lines(&self, report: &SessionReport) {
        let publisher = self.publisher.as_ref();
        publish_json(
            publisher,
            DEBUG_TOPIC,
            &SessionMarker { status: "started" },
            false,
        );
        for reading in &report.readings {
            publish_json(
                publisher,
                DEBUG_TOPIC,
                &SampleLine {
                    delta: reading.elapsed_ms,
                    adc1_v: reading.voltage1,
                    adc2_v: reading.voltage2,
                },
                false,
            );
        }
        publish_json(
            publisher,
            DEBUG_TOPIC,
            &SessionMarker { status: "ended" },
            false,
        );
        publish_json(
            publisher,
            DEBUG_TOPIC,
            &SessionSummaryLine {
                duration_ms: report.duration_ms,
                max_voltage: report.max_voltage,
                num_readings: report.num_readings,
                close_reason: report.close_reason,
                button: report.button.map(|b| b.as_str()),
            },
            false,
        );
    }
}
