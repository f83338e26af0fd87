use std::sync::Arc;

use log::{debug, info};

use crate::audio::ChimePlayer;
use crate::config::SettingsStore;
use crate::emergency::{EmergencyController, EmergencyTrigger, PanicDetector};
use crate::models::{Button, ButtonPress};
use crate::publish::{publish_best_effort, EventPublisher, EVENT_TOPIC};

/// Consumes discrete button-press events: chimes the configured track,
/// publishes the event, counts door presses toward panic, and enforces the
/// cooldown and volume-reset windows.
///
/// Invoked synchronously from the input loop; never re-enters the detector.
pub struct DoorbellActions {
    settings: Arc<SettingsStore>,
    player: Arc<dyn ChimePlayer>,
    publisher: Arc<dyn EventPublisher>,
    emergency: Arc<EmergencyController>,
    panic: PanicDetector,
    is_playing: bool,
    last_play_ms: u64,
}

impl DoorbellActions {
    pub fn new(
        settings: Arc<SettingsStore>,
        player: Arc<dyn ChimePlayer>,
        publisher: Arc<dyn EventPublisher>,
        emergency: Arc<EmergencyController>,
    ) -> Self {
        Self {
            settings,
            player,
            publisher,
            emergency,
            panic: PanicDetector::new(),
            is_playing: false,
            last_play_ms: 0,
        }
    }

    /// Busy signal consumed by the detector's open gate: chime playback
    /// induces electrical noise on the analog inputs, so no session may open
    /// during the cooldown window of a play.
    pub fn playback_busy(&self, now_ms: u64) -> bool {
        self.is_playing
            && now_ms.saturating_sub(self.last_play_ms) < self.settings.device().button_cooldown_ms
    }

    pub fn handle_press(&mut self, press: ButtonPress, now_ms: u64) {
        if self.emergency.is_active() {
            debug!("press ignored while emergency mode is active");
            return;
        }

        let device = self.settings.device();

        // Idle long enough: drive the volume back down before anything else.
        if self.is_playing && now_ms.saturating_sub(self.last_play_ms) >= device.volume_reset_ms {
            self.player.set_volume(0);
            self.is_playing = false;
        }

        // Panic counting happens before the cooldown so rapid presses are
        // never lost to it. Only the door button participates.
        if press.button == Button::Door {
            let window_ms = device.panic_window_secs as u64 * 1000;
            if self
                .panic
                .record_press(now_ms, device.panic_press_threshold, window_ms)
            {
                self.emergency.activate(EmergencyTrigger::PanicButton {
                    presses: device.panic_press_threshold,
                    window_ms,
                });
                return;
            }
        }

        if self.is_playing && now_ms.saturating_sub(self.last_play_ms) < device.button_cooldown_ms {
            debug!("press ignored: chime cooldown active");
            return;
        }

        let (track, volume) = match press.button {
            Button::Downstairs => (device.downstairs_track, device.downstairs_volume),
            Button::Door => (device.door_track, device.door_volume),
        };

        info!("button press: {}", press.button.as_str());
        self.player.play_track(track, volume);
        publish_best_effort(
            self.publisher.as_ref(),
            EVENT_TOPIC,
            press.button.as_str().as_bytes(),
            false,
        );

        self.last_play_ms = now_ms;
        self.is_playing = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::test_support::RecordingPlayer;
    use crate::publish::test_support::RecordingPublisher;
    use uuid::Uuid;

    struct Fixture {
        actions: DoorbellActions,
        player: Arc<RecordingPlayer>,
        publisher: Arc<RecordingPublisher>,
        emergency: Arc<EmergencyController>,
    }

    fn fixture() -> Fixture {
        let path = std::env::temp_dir().join(format!("chimebox-actions-{}.json", Uuid::new_v4()));
        let settings = Arc::new(SettingsStore::new(path).unwrap());
        let player = Arc::new(RecordingPlayer::default());
        let publisher = Arc::new(RecordingPublisher::default());
        let emergency =
            EmergencyController::new(settings.clone(), player.clone(), publisher.clone());
        let actions = DoorbellActions::new(
            settings,
            player.clone(),
            publisher.clone(),
            emergency.clone(),
        );
        Fixture {
            actions,
            player,
            publisher,
            emergency,
        }
    }

    fn press(button: Button) -> ButtonPress {
        ButtonPress { button }
    }

    #[test]
    fn downstairs_press_chimes_and_publishes() {
        let mut fx = fixture();
        fx.actions.handle_press(press(Button::Downstairs), 1000);

        assert_eq!(fx.player.commands(), vec!["play track=1 volume=50"]);
        assert_eq!(fx.publisher.frames_for(EVENT_TOPIC), vec!["downstairs"]);
        assert!(fx.actions.playback_busy(1001));
    }

    #[test]
    fn door_press_uses_the_door_track() {
        let mut fx = fixture();
        fx.actions.handle_press(press(Button::Door), 1000);
        assert_eq!(fx.player.commands(), vec!["play track=2 volume=50"]);
        assert_eq!(fx.publisher.frames_for(EVENT_TOPIC), vec!["door"]);
    }

    #[test]
    fn cooldown_drops_the_second_press() {
        let mut fx = fixture();
        fx.actions.handle_press(press(Button::Downstairs), 1000);
        fx.actions.handle_press(press(Button::Downstairs), 5000);

        assert_eq!(fx.player.commands().len(), 1);
        assert_eq!(fx.publisher.frames_for(EVENT_TOPIC).len(), 1);
    }

    #[test]
    fn press_after_the_cooldown_chimes_again() {
        let mut fx = fixture();
        fx.actions.handle_press(press(Button::Downstairs), 1000);
        fx.actions.handle_press(press(Button::Downstairs), 17_000);

        assert_eq!(fx.publisher.frames_for(EVENT_TOPIC).len(), 2);
        assert!(!fx.actions.playback_busy(40_000));
    }

    #[test]
    fn volume_resets_after_the_idle_window() {
        let mut fx = fixture();
        fx.actions.handle_press(press(Button::Downstairs), 0);
        // Past volume_reset_ms: the stale gain is zeroed before the new play.
        fx.actions.handle_press(press(Button::Downstairs), 61_000);

        assert_eq!(
            fx.player.commands(),
            vec!["play track=1 volume=50", "volume 0", "play track=1 volume=50"]
        );
    }

    #[tokio::test]
    async fn rapid_door_presses_trigger_panic_instead_of_a_chime() {
        let mut fx = fixture();
        // Five presses inside the 20s window. Cooldown silences the chime
        // after the first, but the panic counter still sees every press.
        for t in [0u64, 1000, 2000, 3000, 4000] {
            fx.actions.handle_press(press(Button::Door), t);
        }

        assert!(fx.emergency.is_active());
        let commands = fx.player.commands();
        assert_eq!(commands[0], "play track=2 volume=50");
        assert!(commands.contains(&"loop track=99 volume=100".to_string()));
        // Exactly one chime and one alarm loop; the gated presses played nothing.
        assert_eq!(commands.len(), 2);
    }

    #[tokio::test]
    async fn downstairs_presses_never_count_toward_panic() {
        let mut fx = fixture();
        for t in [0u64, 100, 200, 300, 400, 500, 600] {
            fx.actions.handle_press(press(Button::Downstairs), t);
        }
        assert!(!fx.emergency.is_active());
    }

    #[tokio::test]
    async fn presses_are_ignored_during_emergency_mode() {
        let mut fx = fixture();
        fx.emergency.activate(EmergencyTrigger::Remote);
        let alarm_commands = fx.player.commands().len();

        fx.actions.handle_press(press(Button::Downstairs), 1000);

        assert_eq!(fx.player.commands().len(), alarm_commands);
        assert!(fx.publisher.frames_for(EVENT_TOPIC).is_empty());
    }
}
