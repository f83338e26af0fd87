use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use log::info;

use chimebox::actions::DoorbellActions;
use chimebox::audio::{AudioEngineHandle, ChimePlayer};
use chimebox::config::{InputMode, SettingsStore};
use chimebox::diagnostics::DiagnosticsRecorder;
use chimebox::emergency::EmergencyController;
use chimebox::engine::{InputBackend, InputController, InputEngine};
use chimebox::input::{
    AnalogDetector, Calibration, Debouncer, FloatingSource, LevelSource, Sampler, VoltageSource,
};
use chimebox::publish::{publish_device_status, EventPublisher, LogPublisher};

fn settings_path() -> PathBuf {
    std::env::var("CHIMEBOX_SETTINGS")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("chimebox-settings.json"))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    info!("chimebox starting up...");

    let settings = Arc::new(SettingsStore::new(settings_path())?);
    let snapshot = settings.snapshot();

    let player: Arc<dyn ChimePlayer> = Arc::new(AudioEngineHandle::new());
    let publisher: Arc<dyn EventPublisher> = Arc::new(LogPublisher);

    let emergency = EmergencyController::new(settings.clone(), player.clone(), publisher.clone());
    let actions = DoorbellActions::new(
        settings.clone(),
        player.clone(),
        publisher.clone(),
        emergency.clone(),
    );
    let diagnostics = DiagnosticsRecorder::new(publisher.clone());

    // The floating source reads quiet on both interfaces; deployments swap in
    // their ADC/GPIO driver behind the same traits.
    let backend = match snapshot.device.input_mode {
        InputMode::Analog => {
            let source: Box<dyn VoltageSource> = Box::new(FloatingSource);
            InputBackend::Analog {
                sampler: Sampler::new(source, Calibration::new(snapshot.sampler)),
                detector: AnalogDetector::new(snapshot.detector, snapshot.sampler.supply_voltage),
            }
        }
        InputMode::Digital => {
            let source: Box<dyn LevelSource> = Box::new(FloatingSource);
            InputBackend::Digital {
                source,
                downstairs: Debouncer::new(snapshot.device.press_duration_ms),
                door: Debouncer::new(snapshot.device.press_duration_ms),
            }
        }
    };

    let engine = InputEngine::new(
        backend,
        actions,
        diagnostics,
        snapshot.detector.min_session_duration_ms,
    );

    let mut controller = InputController::new();
    controller.start(engine, snapshot.detector.sample_interval_ms)?;

    publish_device_status(publisher.as_ref(), &settings, emergency.is_active());
    info!(
        "doorbell controller running (input mode: {:?})",
        snapshot.device.input_mode
    );

    tokio::signal::ctrl_c().await?;
    info!("shutdown requested");
    controller.stop().await?;

    Ok(())
}
