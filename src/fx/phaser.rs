use crate::fx::common::{Lfo, active_region, unit};
use crate::fx::smoothing::{SLOW, Smoothed};
use crate::fx::{Effect, MAX_CHANNELS};

const STAGES: usize = 6;
const MIN_RATE_HZ: f32 = 0.1;
const MAX_RATE_HZ: f32 = 5.0;
const FEEDBACK_SCALE: f32 = 0.7;
const COEFF_LIMIT: f32 = 0.98;

/// First-order allpass: `y = -a*x + x[n-1] + a*y[n-1]`.
#[derive(Clone, Copy, Default)]
struct AllpassStage {
    old_input: f32,
    old_output: f32,
}

impl AllpassStage {
    #[inline]
    fn process(&mut self, input: f32, coeff: f32) -> f32 {
        let output = coeff.mul_add(self.old_output, (-coeff).mul_add(input, self.old_input));
        self.old_input = input;
        self.old_output = output;
        output
    }
}

/// Six-stage phaser with an LFO-swept allpass coefficient.
///
/// X sets the sweep rate (0.1-5 Hz), Y sets depth, which also drives the
/// feedback tap at 0.7x depth.
pub struct Phaser {
    stages: [[AllpassStage; STAGES]; MAX_CHANNELS],
    last_output: [f32; MAX_CHANNELS],
    lfo: Lfo,
    rate: Smoothed,
    depth: Smoothed,
}

impl Phaser {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            stages: [[AllpassStage::default(); STAGES]; MAX_CHANNELS],
            last_output: [0.0; MAX_CHANNELS],
            lfo: Lfo::new(sample_rate),
            rate: Smoothed::new(0.5, SLOW),
            depth: Smoothed::new(0.5, SLOW),
        }
    }

    /// Allpass coefficient for an LFO value in `[0, 1]` at the given depth.
    #[inline]
    fn sweep_coefficient(lfo: f32, depth: f32) -> f32 {
        (1.8 * lfo * depth - 0.9).clamp(-COEFF_LIMIT, COEFF_LIMIT)
    }
}

impl Effect for Phaser {
    fn set_parameters(&mut self, x: f32, y: f32) {
        self.rate
            .set_target(MIN_RATE_HZ + (MAX_RATE_HZ - MIN_RATE_HZ) * unit(x));
        self.depth.set_target(unit(y));
    }

    fn process(&mut self, buffer: &mut [f32], frames: usize, channels: usize) {
        let Some(region) = active_region(buffer, frames, channels) else {
            return;
        };

        for frame in region.chunks_exact_mut(channels) {
            let rate = self.rate.next();
            let depth = self.depth.next();
            let feedback = depth * FEEDBACK_SCALE;

            self.lfo.advance(rate);
            let sweep = 0.5f32.mul_add(self.lfo.sine(0.0), 0.5);
            let coeff = Self::sweep_coefficient(sweep, depth);

            for (c, sample) in frame.iter_mut().take(MAX_CHANNELS).enumerate() {
                let input = *sample;
                let mut signal = self.last_output[c].mul_add(feedback, input);

                for stage in &mut self.stages[c] {
                    signal = stage.process(signal, coeff);
                }

                self.last_output[c] = signal;
                *sample = signal.mul_add(depth, input);
            }
        }
    }

    fn reset(&mut self) {
        self.stages = [[AllpassStage::default(); STAGES]; MAX_CHANNELS];
        self.last_output = [0.0; MAX_CHANNELS];
        self.lfo.reset();
        self.rate.reset();
        self.depth.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE: f32 = 44_100.0;

    #[test]
    fn allpass_keeps_dc_gain() {
        let mut stage = AllpassStage::default();
        let mut out = 0.0;
        for _ in 0..10_000 {
            out = stage.process(1.0, 0.5);
        }
        assert!((out - 1.0).abs() < 1e-3, "allpass DC gain drifted: {out}");
    }

    #[test]
    fn zero_depth_is_transparent() {
        let mut phaser = Phaser::new(SAMPLE_RATE);
        phaser.set_parameters(0.5, 0.0);
        phaser.depth.snap(0.0);

        let input: Vec<f32> = (0..512).map(|i| (i as f32 * 0.05).sin()).collect();
        let mut buffer = input.clone();
        phaser.process(&mut buffer, 256, 2);

        for (a, b) in input.iter().zip(&buffer) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn sweep_coefficient_is_bounded() {
        for lfo in [0.0, 0.25, 0.5, 1.0] {
            for depth in [0.0, 0.5, 1.0] {
                let coeff = Phaser::sweep_coefficient(lfo, depth);
                assert!(coeff.abs() <= COEFF_LIMIT);
            }
        }
    }

    #[test]
    fn full_depth_stays_finite() {
        let mut phaser = Phaser::new(SAMPLE_RATE);
        phaser.set_parameters(1.0, 1.0);
        let mut buffer = vec![0.0f32; 2 * 4096];
        for (i, s) in buffer.iter_mut().enumerate() {
            *s = if (i / 64) % 2 == 0 { 10.0 } else { -10.0 };
        }
        for _ in 0..20 {
            let mut block = buffer.clone();
            phaser.process(&mut block, 4096, 2);
            assert!(block.iter().all(|s| s.is_finite()));
        }
    }

    #[test]
    fn reset_clears_history() {
        let mut phaser = Phaser::new(SAMPLE_RATE);
        phaser.set_parameters(1.0, 1.0);
        let mut buffer = vec![0.7f32; 256];
        phaser.process(&mut buffer, 128, 2);
        phaser.reset();

        assert_eq!(phaser.last_output, [0.0; MAX_CHANNELS]);
        assert_eq!(phaser.lfo.phase(), 0.0);
        assert_eq!(phaser.depth.value(), 0.5);
    }

    #[test]
    fn extra_channels_pass_through() {
        let mut phaser = Phaser::new(SAMPLE_RATE);
        phaser.set_parameters(0.3, 1.0);
        let mut buffer = vec![0.25f32; 3 * 64];
        phaser.process(&mut buffer, 64, 3);
        for frame in buffer.chunks_exact(3) {
            assert_eq!(frame[2], 0.25);
        }
    }
}
