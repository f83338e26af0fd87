use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};

use log::info;
use serde::Serialize;
use tokio::{
    task::JoinHandle,
    time::{sleep, Duration},
};

use crate::audio::ChimePlayer;
use crate::config::SettingsStore;
use crate::publish::{publish_json, EventPublisher, STATUS_TOPIC};

/// What switched emergency mode on; recorded in the status payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmergencyTrigger {
    PanicButton { presses: u32, window_ms: u64 },
    Remote,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisableReason {
    Remote,
    Timeout,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EmergencyStatus<'a> {
    emergency: bool,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    trigger: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    presses: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    window_ms: Option<u64>,
}

/// Emergency ("panic") mode: loops the alarm track until disabled, either
/// remotely or by the one-shot auto-disable timer.
pub struct EmergencyController {
    active: AtomicBool,
    settings: Arc<SettingsStore>,
    player: Arc<dyn ChimePlayer>,
    publisher: Arc<dyn EventPublisher>,
    auto_disable: Mutex<Option<JoinHandle<()>>>,
}

impl EmergencyController {
    pub fn new(
        settings: Arc<SettingsStore>,
        player: Arc<dyn ChimePlayer>,
        publisher: Arc<dyn EventPublisher>,
    ) -> Arc<Self> {
        Arc::new(Self {
            active: AtomicBool::new(false),
            settings,
            player,
            publisher,
            auto_disable: Mutex::new(None),
        })
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Switch emergency mode on. Idempotent: a second trigger while active is
    /// ignored. Arms the auto-disable timer when a duration is configured.
    pub fn activate(self: &Arc<Self>, trigger: EmergencyTrigger) {
        if self.active.swap(true, Ordering::SeqCst) {
            return;
        }

        let device = self.settings.device();
        self.player
            .loop_track(device.emergency_track, device.emergency_volume);

        let (trigger_name, presses, window_ms) = match trigger {
            EmergencyTrigger::PanicButton { presses, window_ms } => {
                ("panic_button", Some(presses), Some(window_ms))
            }
            EmergencyTrigger::Remote => ("remote", None, None),
        };
        info!("emergency mode activated (trigger={})", trigger_name);
        publish_json(
            self.publisher.as_ref(),
            STATUS_TOPIC,
            &EmergencyStatus {
                emergency: true,
                message: "Emergency mode activated",
                trigger: Some(trigger_name),
                presses,
                window_ms,
            },
            false,
        );

        if device.emergency_duration_secs > 0 {
            let controller = Arc::clone(self);
            let duration = Duration::from_secs(device.emergency_duration_secs as u64);
            let handle = tokio::spawn(async move {
                sleep(duration).await;
                controller.deactivate(DisableReason::Timeout);
            });
            if let Some(old) = self.auto_disable.lock().unwrap().replace(handle) {
                old.abort();
            }
        }
    }

    /// Switch emergency mode off and restore the normal door volume.
    /// Idempotent.
    pub fn deactivate(&self, reason: DisableReason) {
        if !self.active.swap(false, Ordering::SeqCst) {
            return;
        }

        // The timeout path runs inside the armed task itself; only a remote
        // disable needs to cancel it.
        if let Some(handle) = self.auto_disable.lock().unwrap().take() {
            if reason == DisableReason::Remote {
                handle.abort();
            }
        }

        let device = self.settings.device();
        self.player.stop();
        self.player.set_volume(device.door_volume);

        let message = match reason {
            DisableReason::Remote => "Emergency mode deactivated",
            DisableReason::Timeout => "Emergency mode auto-disabled after timeout",
        };
        info!("emergency mode deactivated ({message})");
        publish_json(
            self.publisher.as_ref(),
            STATUS_TOPIC,
            &EmergencyStatus {
                emergency: false,
                message,
                trigger: None,
                presses: None,
                window_ms: None,
            },
            false,
        );
    }
}

/// Counts door-button presses inside a rolling window; fires when the
/// configured press count is reached.
#[derive(Debug, Default)]
pub struct PanicDetector {
    first_press_ms: u64,
    count: u32,
}

impl PanicDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one press. Returns true when the press completes the panic
    /// sequence; the counter resets so the next sequence starts fresh.
    pub fn record_press(&mut self, now_ms: u64, threshold: u32, window_ms: u64) -> bool {
        if self.count == 0 || now_ms.saturating_sub(self.first_press_ms) > window_ms {
            self.first_press_ms = now_ms;
            self.count = 1;
        } else {
            self.count += 1;
        }

        if self.count >= threshold {
            self.reset();
            return true;
        }
        false
    }

    pub fn reset(&mut self) {
        self.first_press_ms = 0;
        self.count = 0;
    }
}
