use anyhow::Result;
use log::{info, warn};
use serde::Serialize;
use sysinfo::{Pid, ProcessesToUpdate, System};

use crate::config::SettingsStore;

/// Topics under the doorbell namespace.
pub const EVENT_TOPIC: &str = "doorbell/event";
pub const STATUS_TOPIC: &str = "doorbell/status";
pub const DEBUG_TOPIC: &str = "doorbell/debug";

/// Minimal publish seam so the controller stays decoupled from any broker
/// client. The real client and its reconnect loop live outside this crate.
pub trait EventPublisher: Send + Sync {
    fn publish(&self, topic: &str, payload: &[u8], retain: bool) -> Result<()>;
}

/// Log-only publisher used in development and when no broker is wired up.
pub struct LogPublisher;

impl EventPublisher for LogPublisher {
    fn publish(&self, topic: &str, payload: &[u8], retain: bool) -> Result<()> {
        info!(
            "publish topic='{}' retain={} payload={}",
            topic,
            retain,
            String::from_utf8_lossy(payload)
        );
        Ok(())
    }
}

/// Publishing is fire-and-forget from the caller's perspective: failures are
/// logged and swallowed, never propagated into the press path.
pub fn publish_best_effort(
    publisher: &dyn EventPublisher,
    topic: &str,
    payload: &[u8],
    retain: bool,
) {
    if let Err(err) = publisher.publish(topic, payload, retain) {
        warn!("publish to '{}' failed: {err:?}", topic);
    }
}

/// Serialize-and-publish helper for JSON payloads.
pub fn publish_json<T: Serialize>(
    publisher: &dyn EventPublisher,
    topic: &str,
    payload: &T,
    retain: bool,
) {
    match serde_json::to_vec(payload) {
        Ok(bytes) => publish_best_effort(publisher, topic, &bytes, retain),
        Err(err) => warn!("failed to serialize payload for '{}': {err}", topic),
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ButtonConfigSummary {
    downstairs_track: u8,
    door_track: u8,
    downstairs_volume: u8,
    door_volume: u8,
}

/// Retained device status published at startup and on demand.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DeviceStatus {
    status: &'static str,
    hostname: String,
    emergency: bool,
    memory_mb: f64,
    config: ButtonConfigSummary,
}

fn process_memory_mb() -> f64 {
    let mut system = System::new();
    let pid = Pid::from_u32(std::process::id());
    system.refresh_processes(ProcessesToUpdate::Some(&[pid]));
    system
        .process(pid)
        .map(|process| process.memory() as f64 / 1024.0 / 1024.0)
        .unwrap_or(0.0)
}

/// Publish the retained "online" status with the current button config.
pub fn publish_device_status(
    publisher: &dyn EventPublisher,
    settings: &SettingsStore,
    emergency: bool,
) {
    let device = settings.device();
    let status = DeviceStatus {
        status: "online",
        hostname: System::host_name().unwrap_or_else(|| "doorbell".to_string()),
        emergency,
        memory_mb: process_memory_mb(),
        config: ButtonConfigSummary {
            downstairs_track: device.downstairs_track,
            door_track: device.door_track,
            downstairs_volume: device.downstairs_volume,
            door_volume: device.door_volume,
        },
    };
    publish_json(publisher, STATUS_TOPIC, &status, true);
}


#[cfg(test)]
mod tests {
    use super::test_support::RecordingPublisher;
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn best_effort_swallows_publisher_errors() {
        struct FailingPublisher;
        impl EventPublisher for FailingPublisher {
            fn publish(&self, _topic: &str, _payload: &[u8], _retain: bool) -> Result<()> {
                Err(anyhow!("broker unreachable"))
            }
        }

        // Must not panic or propagate.
        publish_best_effort(&FailingPublisher, EVENT_TOPIC, b"door", false);
    }

    #[test]
    fn device_status_is_retained_and_carries_the_button_config() {
        let publisher = RecordingPublisher::default();
        let store = SettingsStore::new(
            std::env::temp_dir().join(format!("chimebox-status-{}.json", uuid::Uuid::new_v4())),
        )
        .unwrap();

        publish_device_status(&publisher, &store, false);

        let frames = publisher.frames.lock().unwrap();
        assert_eq!(frames.len(), 1);
        let (topic, payload, retain) = &frames[0];
        assert_eq!(topic, STATUS_TOPIC);
        assert!(*retain);

        let parsed: serde_json::Value = serde_json::from_str(payload).unwrap();
        assert_eq!(parsed["status"], "online");
        assert_eq!(parsed["emergency"], false);
        assert_eq!(parsed["config"]["downstairsTrack"], 1);
        assert_eq!(parsed["config"]["doorTrack"], 2);
    }
}
