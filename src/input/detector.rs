use log::{debug, warn};

use crate::config::DetectorConfig;
use crate::models::{Button, CloseReason, EndedSession, Reading};

use super::buffer::SessionBuffer;
use super::sampler::VoltagePair;

/// Detector state. Closing is not a resting state: a close is processed and
/// the machine re-enters `Idle` within the same tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DetectorState {
    Idle,
    Active,
}

/// Converts continuously sampled dual-channel voltages into discrete,
/// debounced session closures.
///
/// One instance owns one session at a time. `tick` is called once per sample
/// interval; everything the session accumulated comes back in the returned
/// `EndedSession` and the detector is immediately ready for the next one.
pub struct AnalogDetector {
    cfg: DetectorConfig,
    supply_voltage: f32,
    state: DetectorState,
    buffer: SessionBuffer,
    started_ms: u64,
    last_valid_ms: u64,
    max_voltage: f32,
    button: Option<Button>,
}

impl AnalogDetector {
    pub fn new(cfg: DetectorConfig, supply_voltage: f32) -> Self {
        let buffer = SessionBuffer::with_capacity(cfg.max_session_samples);
        Self {
            cfg,
            supply_voltage,
            state: DetectorState::Idle,
            buffer,
            started_ms: 0,
            last_valid_ms: 0,
            max_voltage: 0.0,
            button: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.state == DetectorState::Active
    }

    /// Advance the state machine by one sample tick.
    ///
    /// `sink_busy` gates session opening: chime playback induces electrical
    /// noise on the input channels, so no session may open while the playback
    /// sink is busy. An already-open session is unaffected.
    pub fn tick(
        &mut self,
        now_ms: u64,
        sample: VoltagePair,
        sink_busy: bool,
    ) -> Option<EndedSession> {
        match self.state {
            DetectorState::Idle => {
                self.try_open(now_ms, sample, sink_busy);
                None
            }
            DetectorState::Active => self.advance(now_ms, sample),
        }
    }

    fn try_open(&mut self, now_ms: u64, sample: VoltagePair, sink_busy: bool) {
        if sink_busy {
            return;
        }

        // Channel 2 wins simultaneous crossings: DOOR over DOWNSTAIRS.
        let button = if sample.v2 >= self.cfg.threshold_volts {
            Button::Door
        } else if sample.v1 >= self.cfg.threshold_volts {
            Button::Downstairs
        } else {
            return;
        };

        self.state = DetectorState::Active;
        self.started_ms = now_ms;
        self.last_valid_ms = now_ms;
        self.max_voltage = sample.v1.max(sample.v2);
        self.button = Some(button);
        self.buffer.clear();

        debug!(
            "session opened at {}ms: button={} v1={:.2} v2={:.2}",
            now_ms,
            button.as_str(),
            sample.v1,
            sample.v2
        );
    }

    fn advance(&mut self, now_ms: u64, sample: VoltagePair) -> Option<EndedSession> {
        self.max_voltage = self.max_voltage.max(sample.v1).max(sample.v2);

        let reading = Reading::new(
            sample.v1,
            sample.v2,
            now_ms.saturating_sub(self.started_ms),
            self.supply_voltage,
            self.cfg.threshold_volts,
        );
        if !self.buffer.try_push(reading) {
            warn!(
                "session buffer full at {} samples; aborting session without analysis",
                self.buffer.len()
            );
            return Some(self.close(now_ms, CloseReason::BufferFull));
        }

        // The dropout window measures from the last good sample, never from
        // session start.
        if sample.v1 >= self.cfg.threshold_volts || sample.v2 >= self.cfg.threshold_volts {
            self.last_valid_ms = now_ms;
        }

        let release = self.cfg.release_volts();
        if sample.v1 < release && sample.v2 < release {
            let gap_ms = now_ms.saturating_sub(self.last_valid_ms);
            if gap_ms > self.cfg.dropout_tolerance_ms {
                return Some(self.close(now_ms, CloseReason::Dropout));
            }
        }

        if now_ms.saturating_sub(self.started_ms) >= self.cfg.min_session_duration_ms {
            return Some(self.close(now_ms, CloseReason::DurationCap));
        }

        None
    }

    /// Terminal step: hand everything over and reset so the next session is
    /// independent of this one.
    fn close(&mut self, now_ms: u64, reason: CloseReason) -> EndedSession {
        let ended = EndedSession {
            started_ms: self.started_ms,
            ended_ms: now_ms,
            max_voltage: self.max_voltage,
            button: self.button.take(),
            reason,
            readings: self.buffer.take_all(),
        };

        self.state = DetectorState::Idle;
        self.started_ms = 0;
        self.last_valid_ms = 0;
        self.max_voltage = 0.0;

        debug!(
            "session closed at {}ms: reason={:?} duration={}ms readings={}",
            now_ms,
            reason,
            ended.duration_ms(),
            ended.readings.len()
        );

        ended
    }
}
