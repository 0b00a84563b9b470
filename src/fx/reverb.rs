use crate::fx::common::{active_region, unit};
use crate::fx::smoothing::{SLOW, Smoothed};
use crate::fx::Effect;

/// Comb lengths in seconds. Close to mutually prime at common rates so the
/// echoes do not pile up on the same sample.
const LINE_SECONDS: [f32; 4] = [0.0297, 0.0371, 0.0411, 0.0437];
const MIN_FEEDBACK: f32 = 0.70;
const FEEDBACK_RANGE: f32 = 0.28;
const MAX_MIX: f32 = 0.6;
const WET_SCALE: f32 = 0.25;

struct CombLine {
    buffer: Vec<f32>,
    pos: usize,
}

impl CombLine {
    fn new(len: usize) -> Self {
        Self {
            buffer: vec![0.0; len.max(1)],
            pos: 0,
        }
    }

    /// Read the oldest sample and replace it with `input + delayed * feedback`.
    #[inline]
    fn tick(&mut self, input: f32, feedback: f32) -> f32 {
        let delayed = self.buffer[self.pos];
        self.buffer[self.pos] = delayed.mul_add(feedback, input);
        self.pos += 1;
        if self.pos >= self.buffer.len() {
            self.pos = 0;
        }
        delayed
    }

    fn clear(&mut self) {
        self.buffer.fill(0.0);
        self.pos = 0;
    }
}

/// Four parallel recirculating delay lines fed from a mono downmix.
///
/// X sets the decay (feedback 0.70-0.98), Y the wet level (up to 60%). The
/// wet signal is added to every channel identically.
pub struct Reverb {
    lines: [CombLine; 4],
    feedback: Smoothed,
    mix: Smoothed,
}

impl Reverb {
    pub fn new(sample_rate: f32) -> Self {
        let lines = LINE_SECONDS.map(|seconds| CombLine::new((sample_rate * seconds) as usize));
        Self {
            lines,
            feedback: Smoothed::new(0.8, SLOW),
            mix: Smoothed::new(0.3, SLOW),
        }
    }

    /// Delay of each comb line in samples.
    pub fn line_lengths(&self) -> [usize; 4] {
        [
            self.lines[0].buffer.len(),
            self.lines[1].buffer.len(),
            self.lines[2].buffer.len(),
            self.lines[3].buffer.len(),
        ]
    }
}

impl Effect for Reverb {
    fn set_parameters(&mut self, x: f32, y: f32) {
        self.feedback
            .set_target(FEEDBACK_RANGE.mul_add(unit(x), MIN_FEEDBACK));
        self.mix.set_target(unit(y) * MAX_MIX);
    }

    fn process(&mut self, buffer: &mut [f32], frames: usize, channels: usize) {
        let Some(region) = active_region(buffer, frames, channels) else {
            return;
        };

        for frame in region.chunks_exact_mut(channels) {
            let feedback = self.feedback.next();
            let mix = self.mix.next();

            let input = frame.iter().sum::<f32>() / channels as f32;

            let wet = self
                .lines
                .iter_mut()
                .map(|line| line.tick(input, feedback))
                .sum::<f32>()
                * WET_SCALE;

            for sample in frame.iter_mut() {
                *sample = wet.mul_add(mix, *sample);
            }
        }
    }

    fn reset(&mut self) {
        for line in &mut self.lines {
            line.clear();
        }
        self.feedback.reset();
        self.mix.reset();
    }
}
