pub mod chime;

use chime::ChimeTone;

use log::warn;
use rodio::{OutputStream, Sink, Source};
use std::sync::{
    mpsc::{self, Sender},
    Arc, Mutex,
};
use std::thread;

/// Seam over the chime playback device so the action sink and the detector's
/// busy gate can be exercised without an audio device.
pub trait ChimePlayer: Send + Sync {
    fn play_track(&self, track: u8, volume_percent: u8);
    fn loop_track(&self, track: u8, volume_percent: u8);
    fn set_volume(&self, volume_percent: u8);
    fn stop(&self);
}

enum AudioCommand {
    PlayTrack { track: u8, volume_percent: u8 },
    LoopTrack { track: u8, volume_percent: u8 },
    SetVolume(u8),
    Stop,
}

/// Convert a percentage volume to the sink's 0.0-1.0 gain.
fn percent_to_gain(percent: u8) -> f32 {
    percent.min(100) as f32 / 100.0
}

pub struct AudioEngineHandle {
    tx: Arc<Mutex<Option<Sender<AudioCommand>>>>,
}

impl AudioEngineHandle {
    pub fn new() -> Self {
        Self {
            tx: Arc::new(Mutex::new(None)),
        }
    }

    fn ensure_thread(&self) -> Result<Sender<AudioCommand>, String> {
        if let Some(tx) = self.tx.lock().map_err(|e| e.to_string())?.as_ref() {
            return Ok(tx.clone());
        }

        let (tx, rx) = mpsc::channel::<AudioCommand>();

        // Dedicated audio thread holding the non-Send output objects.
        thread::Builder::new()
            .name("audio-engine".to_string())
            .spawn(move || {
                let mut _stream: Option<OutputStream> = None;
                let mut sink: Option<Sink> = None;

                fn ensure_sink(
                    stream: &mut Option<OutputStream>,
                    sink: &mut Option<Sink>,
                ) -> Result<(), String> {
                    if sink.is_none() {
                        let (s, handle) = OutputStream::try_default()
                            .map_err(|e| format!("Failed to create audio output stream: {}", e))?;
                        let new_sink = Sink::try_new(&handle)
                            .map_err(|e| format!("Failed to create audio sink: {}", e))?;
                        *stream = Some(s);
                        *sink = Some(new_sink);
                    }
                    Ok(())
                }

                while let Ok(cmd) = rx.recv() {
                    match cmd {
                        AudioCommand::PlayTrack {
                            track,
                            volume_percent,
                        } => {
                            if let Some(s_old) = sink.take() {
                                s_old.stop();
                            }
                            _stream = None;
                            if ensure_sink(&mut _stream, &mut sink).is_ok() {
                                if let Some(ref s) = sink {
                                    s.set_volume(percent_to_gain(volume_percent));
                                    s.append(ChimeTone::for_track(track));
                                    s.play();
                                }
                            }
                        }
                        AudioCommand::LoopTrack {
                            track,
                            volume_percent,
                        } => {
                            if let Some(s_old) = sink.take() {
                                s_old.stop();
                            }
                            _stream = None;
                            if ensure_sink(&mut _stream, &mut sink).is_ok() {
                                if let Some(ref s) = sink {
                                    s.set_volume(percent_to_gain(volume_percent));
                                    s.append(ChimeTone::for_track(track).repeat_infinite());
                                    s.play();
                                }
                            }
                        }
                        AudioCommand::SetVolume(percent) => {
                            if let Some(ref s) = sink {
                                s.set_volume(percent_to_gain(percent));
                            }
                        }
                        AudioCommand::Stop => {
                            if let Some(s_old) = sink.take() {
                                s_old.stop();
                            }
                            _stream = None;
                        }
                    }
                }
            })
            .map_err(|e| e.to_string())?;

        let tx_clone = tx.clone();
        *self.tx.lock().map_err(|e| e.to_string())? = Some(tx);
        Ok(tx_clone)
    }

    fn send(&self, cmd: AudioCommand) {
        match self.ensure_thread() {
            Ok(tx) => {
                if tx.send(cmd).is_err() {
                    warn!("audio engine thread is gone; command dropped");
                }
            }
            Err(err) => warn!("audio engine unavailable: {err}"),
        }
    }
}

impl Default for AudioEngineHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl ChimePlayer for AudioEngineHandle {
    fn play_track(&self, track: u8, volume_percent: u8) {
        self.send(AudioCommand::PlayTrack {
            track,
            volume_percent,
        });
    }

    fn loop_track(&self, track: u8, volume_percent: u8) {
        self.send(AudioCommand::LoopTrack {
            track,
            volume_percent,
        });
    }

    fn set_volume(&self, volume_percent: u8) {
        self.send(AudioCommand::SetVolume(volume_percent));
    }

    fn stop(&self) {
        self.send(AudioCommand::Stop);
    }
}
