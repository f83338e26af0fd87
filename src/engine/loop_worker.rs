use log::info;
use tokio::time::{interval, Duration, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::actions::DoorbellActions;
use crate::diagnostics::DiagnosticsRecorder;
use crate::input::{analyze, AnalogDetector, Debouncer, LevelSource, Sampler, VoltageSource};
use crate::models::{Button, ButtonPress, CloseReason};

/// Input strategy chosen at configuration time. Both variants feed the same
/// action sink with the same discrete press events.
pub enum InputBackend {
    Analog {
        sampler: Sampler<Box<dyn VoltageSource>>,
        detector: AnalogDetector,
    },
    Digital {
        source: Box<dyn LevelSource>,
        downstairs: Debouncer,
        door: Debouncer,
    },
}

/// One task owns the whole per-sample pipeline: source read, state machine
/// advance, analysis, and synchronous dispatch to the action sink. There is
/// exactly one logical owner of the in-flight session, so no locks guard it.
pub struct InputEngine {
    backend: InputBackend,
    actions: DoorbellActions,
    diagnostics: DiagnosticsRecorder,
    min_session_duration_ms: u64,
}

impl InputEngine {
    pub fn new(
        backend: InputBackend,
        actions: DoorbellActions,
        diagnostics: DiagnosticsRecorder,
        min_session_duration_ms: u64,
    ) -> Self {
        Self {
            backend,
            actions,
            diagnostics,
            min_session_duration_ms,
        }
    }

    /// Process one sample tick at `now_ms` (monotonic, loop-relative).
    pub fn tick(&mut self, now_ms: u64) {
        match &mut self.backend {
            InputBackend::Analog { sampler, detector } => {
                let pair = sampler.sample();
                let busy = self.actions.playback_busy(now_ms);
                if let Some(ended) = detector.tick(now_ms, pair, busy) {
                    if ended.reason == CloseReason::BufferFull {
                        // Closed without analysis: no event, no report.
                        return;
                    }

                    let verdict = analyze(ended, self.min_session_duration_ms);
                    // The press dispatches first; diagnostics can neither
                    // block nor fail it.
                    if let Some(press) = verdict.press {
                        self.actions.handle_press(press, now_ms);
                    }
                    if let Some(report) = verdict.report {
                        self.diagnostics.record(report);
                    }
                }
            }
            InputBackend::Digital {
                source,
                downstairs,
                door,
            } => {
                let (downstairs_high, door_high) = source.read_levels();
                if downstairs.update(downstairs_high, now_ms) {
                    self.actions.handle_press(
                        ButtonPress {
                            button: Button::Downstairs,
                        },
                        now_ms,
                    );
                }
                if door.update(door_high, now_ms) {
                    self.actions.handle_press(
                        ButtonPress {
                            button: Button::Door,
                        },
                        now_ms,
                    );
                }
            }
        }
    }
}

/// Sample at a fixed cadence until cancelled. Late ticks are skipped, never
/// replayed: sampling is lossy by design and there is no backlog to drain.
pub async fn input_loop(
    mut engine: InputEngine,
    sample_interval_ms: u64,
    cancel_token: CancellationToken,
) {
    let mut ticker = interval(Duration::from_millis(sample_interval_ms.max(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let started = Instant::now();
    info!("input loop started ({}ms cadence)", sample_interval_ms);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let now_ms = started.elapsed().as_millis() as u64;
                engine.tick(now_ms);
            }
            _ = cancel_token.cancelled() => {
                info!("input loop shutting down");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::test_support::RecordingPlayer;
    use crate::config::{DetectorConfig, SettingsStore};
    use crate::emergency::EmergencyController;
    use crate::input::{Calibration, RawSample};
    use crate::publish::test_support::RecordingPublisher;
    use crate::publish::{DEBUG_TOPIC, EVENT_TOPIC};
    use std::sync::Arc;
    use uuid::Uuid;

    /// Replays a scripted raw-sample sequence, then stays quiet.
    struct ScriptedSource {
        script: Vec<(u64, RawSample)>,
        now_ms: Arc<std::sync::atomic::AtomicU64>,
    }

    impl VoltageSource for ScriptedSource {
        fn read_raw(&mut self) -> RawSample {
            let now = self.now_ms.load(std::sync::atomic::Ordering::SeqCst);
            self.script
                .iter()
                .rev()
                .find(|(at, _)| *at <= now)
                .map(|(_, sample)| *sample)
                .unwrap_or(RawSample { ch1: 0, ch2: 0 })
        }
    }

    struct ScriptedLevels {
        high_until_ms: u64,
        now_ms: Arc<std::sync::atomic::AtomicU64>,
    }

    impl LevelSource for ScriptedLevels {
        fn read_levels(&mut self) -> (bool, bool) {
            let now = self.now_ms.load(std::sync::atomic::Ordering::SeqCst);
            (now < self.high_until_ms, false)
        }
    }

    struct Fixture {
        engine: InputEngine,
        publisher: Arc<RecordingPublisher>,
        player: Arc<RecordingPlayer>,
        now_ms: Arc<std::sync::atomic::AtomicU64>,
    }

    fn fixture(backend_for: impl FnOnce(Arc<std::sync::atomic::AtomicU64>) -> InputBackend) -> Fixture {
        let path = std::env::temp_dir().join(format!("chimebox-engine-{}.json", Uuid::new_v4()));
        let settings = Arc::new(SettingsStore::new(path).unwrap());
        let player = Arc::new(RecordingPlayer::default());
        let publisher = Arc::new(RecordingPublisher::default());
        let emergency =
            EmergencyController::new(settings.clone(), player.clone(), publisher.clone());
        let actions = DoorbellActions::new(
            settings.clone(),
            player.clone(),
            publisher.clone(),
            emergency,
        );
        let diagnostics = DiagnosticsRecorder::new(publisher.clone());
        let now_ms = Arc::new(std::sync::atomic::AtomicU64::new(0));

        let engine = InputEngine::new(
            backend_for(now_ms.clone()),
            actions,
            diagnostics,
            settings.detector().min_session_duration_ms,
        );
        Fixture {
            engine,
            publisher,
            player,
            now_ms,
        }
    }

    fn analog_backend(
        script: Vec<(u64, RawSample)>,
        now_ms: Arc<std::sync::atomic::AtomicU64>,
    ) -> InputBackend {
        let source: Box<dyn VoltageSource> = Box::new(ScriptedSource { script, now_ms });
        InputBackend::Analog {
            sampler: Sampler::new(
                source,
                Calibration::new(crate::config::SamplerConfig::default()),
            ),
            detector: AnalogDetector::new(DetectorConfig::default(), 3.3),
        }
    }

    fn run_until(fx: &mut Fixture, to_ms: u64) {
        let mut now = 0;
        while now <= to_ms {
            fx.now_ms.store(now, std::sync::atomic::Ordering::SeqCst);
            fx.engine.tick(now);
            now += 5;
        }
    }

    // 3.5V on a 3.3V/4095 scale saturates; use the full-scale raw value for
    // "pressed" and zero for "released".
    const PRESSED: RawSample = RawSample { ch1: 4095, ch2: 0 };
    const RELEASED: RawSample = RawSample { ch1: 0, ch2: 0 };

    #[tokio::test]
    async fn analog_press_flows_through_to_chime_event_and_diagnostics() {
        let mut fx = fixture(|now| analog_backend(vec![(0, PRESSED), (300, RELEASED)], now));
        run_until(&mut fx, 600);

        assert_eq!(fx.publisher.frames_for(EVENT_TOPIC), vec!["downstairs"]);
        assert_eq!(fx.player.commands(), vec!["play track=1 volume=50"]);

        // Session diagnostics went out on the debug topic.
        let debug_lines = fx.publisher.frames_for(DEBUG_TOPIC);
        assert!(debug_lines.contains(&r#"{"status":"started"}"#.to_string()));
        assert!(debug_lines.contains(&r#"{"status":"ended"}"#.to_string()));
    }

    #[tokio::test]
    async fn quiet_input_produces_nothing() {
        let mut fx = fixture(|now| analog_backend(vec![(0, RELEASED)], now));
        run_until(&mut fx, 1000);

        assert!(fx.publisher.frames_for(EVENT_TOPIC).is_empty());
        assert!(fx.player.commands().is_empty());
    }

    #[tokio::test]
    async fn held_press_emits_exactly_once_within_the_cooldown() {
        // Signal held high for 10 seconds; the cooldown busy-gate keeps the
        // detector from reopening after the first emitted session.
        let mut fx = fixture(|now| analog_backend(vec![(0, PRESSED)], now));
        run_until(&mut fx, 10_000);

        assert_eq!(fx.publisher.frames_for(EVENT_TOPIC).len(), 1);
        assert_eq!(fx.player.commands().len(), 1);
    }

    #[tokio::test]
    async fn digital_backend_debounces_and_dispatches() {
        let mut fx = fixture(|now| InputBackend::Digital {
            source: Box::new(ScriptedLevels {
                high_until_ms: 1000,
                now_ms: now,
            }),
            downstairs: Debouncer::new(800),
            door: Debouncer::new(800),
        });
        run_until(&mut fx, 2000);

        assert_eq!(fx.publisher.frames_for(EVENT_TOPIC), vec!["downstairs"]);
    }

    #[tokio::test]
    async fn digital_bounce_below_the_press_duration_stays_silent() {
        let mut fx = fixture(|now| InputBackend::Digital {
            source: Box::new(ScriptedLevels {
                high_until_ms: 400,
                now_ms: now,
            }),
            downstairs: Debouncer::new(800),
            door: Debouncer::new(800),
        });
        run_until(&mut fx, 2000);

        assert!(fx.publisher.frames_for(EVENT_TOPIC).is_empty());
    }
}
