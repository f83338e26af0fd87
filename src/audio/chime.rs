use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rodio::Source;
use std::f32::consts::PI;
use std::time::Duration;

const SAMPLE_RATE: u32 = 44100;
const CHIME_SECS: f32 = 2.0;

/// Synthesized doorbell chime: a struck two-partial tone with an exponential
/// decay and a short noise transient at the strike. The track number picks
/// the pitch, so each configured track is audibly distinct.
pub struct ChimeTone {
    base_freq: f32,
    num_sample: usize,
    total_samples: usize,
    rng: StdRng,
}

impl ChimeTone {
    pub fn for_track(track: u8) -> Self {
        // Walk up a pentatonic-ish ladder from C5 so neighboring tracks
        // don't sound like detuned copies of each other.
        const STEPS: [f32; 5] = [1.0, 1.125, 1.25, 1.5, 1.6667];
        let octave = (track as usize / STEPS.len()) % 2;
        let base_freq = 523.25 * STEPS[track as usize % STEPS.len()] * (1 + octave) as f32;

        Self {
            base_freq,
            num_sample: 0,
            total_samples: (SAMPLE_RATE as f32 * CHIME_SECS) as usize,
            rng: StdRng::from_entropy(),
        }
    }
}

impl Iterator for ChimeTone {
    type Item = f32;

    fn next(&mut self) -> Option<Self::Item> {
        if self.num_sample >= self.total_samples {
            return None;
        }

        let t = self.num_sample as f32 / SAMPLE_RATE as f32;
        self.num_sample += 1;

        let envelope = (-3.0 * t).exp();
        let fundamental = (2.0 * PI * self.base_freq * t).sin();
        let partial = (2.0 * PI * self.base_freq * 2.4 * t).sin() * 0.35;

        // Strike transient: a few milliseconds of decaying noise.
        let strike = if t < 0.02 {
            self.rng.gen_range(-1.0..1.0) * (-200.0 * t).exp() * 0.2
        } else {
            0.0
        };

        Some((fundamental + partial + strike) * envelope * 0.3)
    }
}

impl Source for ChimeTone {
    fn current_frame_len(&self) -> Option<usize> {
        None
    }

    fn channels(&self) -> u16 {
        1
    }

    fn sample_rate(&self) -> u32 {
        SAMPLE_RATE
    }

    fn total_duration(&self) -> Option<Duration> {
        Some(Duration::from_secs_f32(CHIME_SECS))
    }
}
