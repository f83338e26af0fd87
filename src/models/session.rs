use serde::{Deserialize, Serialize};

use super::reading::Reading;

/// Physical button a session was attributed to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Button {
    Downstairs,
    Door,
}

impl Button {
    pub fn as_str(&self) -> &'static str {
        match self {
            Button::Downstairs => "downstairs",
            Button::Door => "door",
        }
    }
}

/// Why a session left the active state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum CloseReason {
    /// Both channels stayed below the release level past the dropout tolerance.
    Dropout,
    /// The session reached the configured duration and closed on time.
    DurationCap,
    /// The reading buffer filled before any close condition triggered.
    BufferFull,
}

/// Discrete press event handed to the action sink. Exactly one per valid
/// session, never for a discarded one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonPress {
    pub button: Button,
}

/// A closed session as handed from the detector to the analyzer: close
/// metadata plus the drained reading sequence, consumed exactly once.
#[derive(Debug)]
pub struct EndedSession {
    pub started_ms: u64,
    pub ended_ms: u64,
    pub max_voltage: f32,
    pub button: Option<Button>,
    pub reason: CloseReason,
    pub readings: Vec<Reading>,
}

impl EndedSession {
    pub fn duration_ms(&self) -> u64 {
        self.ended_ms.saturating_sub(self.started_ms)
    }
}
