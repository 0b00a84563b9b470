use crate::fx::common::{Lfo, active_region, unit};
use crate::fx::smoothing::{SLOW, Smoothed};
use crate::fx::{Effect, MAX_CHANNELS};

const MAX_DELAY_MS: f32 = 50.0;
const BASE_DELAY_MS: f32 = 12.0;
const MOD_DEPTH_MS: f32 = 8.0;
const MIN_RATE_HZ: f32 = 0.5;
const MAX_RATE_HZ: f32 = 5.0;
/// The right voice's LFO leads the left by a quarter cycle.
const STEREO_OFFSET: f32 = 0.25;
const MAX_WET: f32 = 0.5;

/// Ring buffer read with linear interpolation at fractional delays.
struct DelayLine {
    buffer: Vec<f32>,
    write_pos: usize,
}

impl DelayLine {
    fn new(len: usize) -> Self {
        Self {
            buffer: vec![0.0; len.max(2)],
            write_pos: 0,
        }
    }

    #[inline]
    fn tick(&mut self, input: f32, delay_samples: f32) -> f32 {
        let buf_len = self.buffer.len();
        self.buffer[self.write_pos] = input;

        let read_pos = self.write_pos as f32 - delay_samples + buf_len as f32;
        let read_idx = read_pos as usize % buf_len;
        let frac = read_pos.fract();
        let next_idx = (read_idx + 1) % buf_len;
        let delayed = (1.0 - frac).mul_add(self.buffer[read_idx], frac * self.buffer[next_idx]);

        self.write_pos = (self.write_pos + 1) % buf_len;
        delayed
    }

    fn clear(&mut self) {
        self.buffer.fill(0.0);
        self.write_pos = 0;
    }
}

/// Stereo chorus built from one modulated delay per channel.
///
/// X sets the LFO rate (0.5-5 Hz). Y sets depth, which widens the delay
/// sweep and raises the wet level together.
pub struct Chorus {
    sample_rate: f32,
    lines: [DelayLine; MAX_CHANNELS],
    lfo: Lfo,
    rate: Smoothed,
    depth: Smoothed,
}

impl Chorus {
    pub fn new(sample_rate: f32) -> Self {
        let len = (MAX_DELAY_MS * 0.001 * sample_rate) as usize + 2;
        Self {
            sample_rate,
            lines: [DelayLine::new(len), DelayLine::new(len)],
            lfo: Lfo::new(sample_rate),
            rate: Smoothed::new(1.0, SLOW),
            depth: Smoothed::new(0.5, SLOW),
        }
    }
}

impl Effect for Chorus {
    fn set_parameters(&mut self, x: f32, y: f32) {
        self.rate
            .set_target((MAX_RATE_HZ - MIN_RATE_HZ).mul_add(unit(x), MIN_RATE_HZ));
        self.depth.set_target(unit(y));
    }

    fn process(&mut self, buffer: &mut [f32], frames: usize, channels: usize) {
        let Some(region) = active_region(buffer, frames, channels) else {
            return;
        };
        let ms_to_samples = self.sample_rate * 0.001;

        for frame in region.chunks_exact_mut(channels) {
            let rate = self.rate.next();
            let depth = self.depth.next();
            let wet_gain = depth * MAX_WET;

            self.lfo.advance(rate);

            for (c, sample) in frame.iter_mut().take(MAX_CHANNELS).enumerate() {
                let sweep = self.lfo.sine(c as f32 * STEREO_OFFSET);
                let delay_ms = (MOD_DEPTH_MS * depth).mul_add(sweep, BASE_DELAY_MS);
                let dry = *sample;
                let wet = self.lines[c].tick(dry, delay_ms * ms_to_samples);
                *sample = dry.mul_add(1.0 - wet_gain, wet * wet_gain);
            }
        }
    }

    fn reset(&mut self) {
        for line in &mut self.lines {
            line.clear();
        }
        self.lfo.reset();
        self.rate.reset();
        self.depth.reset();
    }
}
