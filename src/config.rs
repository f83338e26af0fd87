use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, sync::RwLock};

/// Input strategy, selected at configuration time rather than compiled in.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum InputMode {
    Analog,
    Digital,
}

/// Tunable thresholds for the analog session detector.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DetectorConfig {
    /// Voltage at/above which a channel counts as active.
    pub threshold_volts: f32,

    /// Margin below the threshold required before a channel counts as
    /// inactive, preventing toggling near the threshold.
    pub hysteresis_volts: f32,

    /// Sampling cadence of the input loop.
    pub sample_interval_ms: u64,

    /// Hard cap on readings stored per session; exceeding it aborts the
    /// session without analysis.
    pub max_session_samples: usize,

    /// Maximum gap during which below-release readings are ignored rather
    /// than ending the session.
    pub dropout_tolerance_ms: u64,

    /// Sessions shorter than this never emit a press; a session reaching it
    /// closes on time and emits.
    pub min_session_duration_ms: u64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            threshold_volts: 3.0,
            hysteresis_volts: 0.3,
            sample_interval_ms: 5,
            max_session_samples: 1000,
            dropout_tolerance_ms: 15,
            min_session_duration_ms: 200,
        }
    }
}

impl DetectorConfig {
    /// Level below which a channel counts as released.
    pub fn release_volts(&self) -> f32 {
        self.threshold_volts - self.hysteresis_volts
    }
}

/// ADC geometry for mapping raw readings onto volts.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SamplerConfig {
    pub adc_max: u16,
    pub supply_voltage: f32,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            adc_max: 4095,
            supply_voltage: 3.3,
        }
    }
}

/// Doorbell behavior: tracks, volumes, emergency and timing windows.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeviceConfig {
    pub input_mode: InputMode,

    /// Continuous-high duration required by the digital debouncer.
    pub press_duration_ms: u64,

    pub downstairs_track: u8,
    pub door_track: u8,
    /// Volumes in percent (0-100).
    pub downstairs_volume: u8,
    pub door_volume: u8,

    pub emergency_track: u8,
    pub emergency_volume: u8,
    /// Seconds before emergency mode auto-disables; 0 means indefinite.
    pub emergency_duration_secs: u16,
    /// Door presses inside the window that trigger panic.
    pub panic_press_threshold: u32,
    pub panic_window_secs: u16,

    /// Minimum spacing between chimes.
    pub button_cooldown_ms: u64,
    /// Idle time after which the playback volume is driven back to zero.
    pub volume_reset_ms: u64,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            input_mode: InputMode::Analog,
            press_duration_ms: 800,
            downstairs_track: 1,
            door_track: 2,
            downstairs_volume: 50,
            door_volume: 50,
            emergency_track: 99,
            emergency_volume: 100,
            emergency_duration_secs: 60,
            panic_press_threshold: 5,
            panic_window_secs: 20,
            button_cooldown_ms: 15_000,
            volume_reset_ms: 60_000,
        }
    }
}

/// Everything the controller needs at startup, persisted as one document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub device: DeviceConfig,
    pub detector: DetectorConfig,
    pub sampler: SamplerConfig,
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<Settings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_default()
        } else {
            Settings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn snapshot(&self) -> Settings {
        self.data.read().unwrap().clone()
    }

    pub fn device(&self) -> DeviceConfig {
        self.data.read().unwrap().device.clone()
    }

    pub fn detector(&self) -> DetectorConfig {
        self.data.read().unwrap().detector
    }

    pub fn sampler(&self) -> SamplerConfig {
        self.data.read().unwrap().sampler
    }

    pub fn update_device(&self, device: DeviceConfig) -> Result<()> {
        {
            let mut guard = self.data.write().unwrap();
            guard.device = device;
            self.persist(&guard)?;
        }
        Ok(())
    }

    pub fn update_detector(&self, detector: DetectorConfig) -> Result<()> {
        {
            let mut guard = self.data.write().unwrap();
            guard.detector = detector;
            self.persist(&guard)?;
        }
        Ok(())
    }

    fn persist(&self, data: &Settings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}
