use crate::fx::common::{active_region, unit};
use crate::fx::smoothing::{FAST, Smoothed};
use crate::fx::{Effect, MAX_CHANNELS};

const MIN_GRAIN_SECONDS: f32 = 0.01;
const GRAIN_RANGE_SECONDS: f32 = 0.49;
const MIN_GRAIN_SAMPLES: usize = 100;
/// Mix level above which the stutter engages.
pub const ACTIVATION_THRESHOLD: f32 = 0.05;

/// Granular stutter.
///
/// Audio is recorded into a one second ring while the stutter is disengaged.
/// Once the mix rises past [`ACTIVATION_THRESHOLD`] recording pauses and the
/// last `grain` samples are looped, crossfaded against the live input by the
/// mix. Dropping the mix back below the threshold releases the loop and
/// recording resumes.
///
/// The grain length is re-read only when a loop cycle begins, so every
/// repetition replays the same block.
pub struct Glitch {
    sample_rate: f32,
    ring: Vec<f32>,
    ring_frames: usize,
    write_pos: usize,
    read_pos: usize,
    loop_start: usize,
    grain_frames: usize,
    grain_counter: usize,
    active: bool,
    grain_seconds: Smoothed,
    mix: Smoothed,
}

impl Glitch {
    pub fn new(sample_rate: f32) -> Self {
        let ring_frames = (sample_rate as usize).max(MIN_GRAIN_SAMPLES * 2);
        Self {
            sample_rate,
            ring: vec![0.0; ring_frames * MAX_CHANNELS],
            ring_frames,
            write_pos: 0,
            read_pos: 0,
            loop_start: 0,
            grain_frames: MIN_GRAIN_SAMPLES,
            grain_counter: 0,
            active: false,
            grain_seconds: Smoothed::new(0.1, FAST),
            mix: Smoothed::new(0.0, FAST),
        }
    }

    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// Grain length in frames for the current smoothed grain time.
    fn current_grain_frames(&self) -> usize {
        let frames = (self.grain_seconds.value() * self.sample_rate) as usize;
        frames.clamp(MIN_GRAIN_SAMPLES, self.ring_frames - 1)
    }

    fn wrap_back(&self, pos: usize, by: usize) -> usize {
        (pos + self.ring_frames - by % self.ring_frames) % self.ring_frames
    }

    fn start_loop(&mut self) {
        self.grain_frames = self.current_grain_frames();
        self.loop_start = self.wrap_back(self.write_pos, self.grain_frames);
        self.read_pos = self.loop_start;
        self.grain_counter = 0;
    }
}

impl Effect for Glitch {
    fn set_parameters(&mut self, x: f32, y: f32) {
        self.grain_seconds
            .set_target(GRAIN_RANGE_SECONDS.mul_add(unit(x), MIN_GRAIN_SECONDS));
        self.mix.set_target(unit(y));
    }

    fn process(&mut self, buffer: &mut [f32], frames: usize, channels: usize) {
        let Some(region) = active_region(buffer, frames, channels) else {
            return;
        };

        for frame in region.chunks_exact_mut(channels) {
            self.grain_seconds.next();
            let mix = self.mix.next();

            // The frozen window must survive however long the loop is held.
            let recording = !self.active || mix <= ACTIVATION_THRESHOLD;
            if recording {
                let base = self.write_pos * MAX_CHANNELS;
                for (c, sample) in frame.iter().take(MAX_CHANNELS).enumerate() {
                    self.ring[base + c] = *sample;
                }
            }

            if mix > ACTIVATION_THRESHOLD {
                if !self.active {
                    self.active = true;
                    self.start_loop();
                }

                let read = self.read_pos * MAX_CHANNELS;
                for (c, sample) in frame.iter_mut().take(MAX_CHANNELS).enumerate() {
                    let wet = self.ring[read + c];
                    *sample = sample.mul_add(1.0 - mix, wet * mix);
                }

                self.read_pos = (self.read_pos + 1) % self.ring_frames;
                self.grain_counter += 1;
                if self.grain_counter >= self.grain_frames {
                    let start = self.loop_start;
                    self.grain_frames = self.current_grain_frames();
                    self.read_pos = start;
                    self.grain_counter = 0;
                }
            } else {
                self.active = false;
            }

            if recording {
                self.write_pos = (self.write_pos + 1) % self.ring_frames;
            }
        }
    }

    fn reset(&mut self) {
        self.ring.fill(0.0);
        self.write_pos = 0;
        self.read_pos = 0;
        self.loop_start = 0;
        self.grain_counter = 0;
        self.grain_frames = MIN_GRAIN_SAMPLES;
        self.active = false;
        self.grain_seconds.reset();
        self.mix.reset();
    }
}
