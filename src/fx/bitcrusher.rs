use crate::fx::common::{active_region, unit};
use crate::fx::smoothing::{FAST, Smoothed};
use crate::fx::{Effect, MAX_CHANNELS};

const MAX_BITS: f32 = 16.0;
const BITS_RANGE: f32 = 14.0;
const MAX_DIVISOR: f32 = 32.0;

/// Sample-rate and bit-depth reduction.
///
/// X lowers the resolution from 16 bits down to 2, Y holds every sample for
/// 1 to 32 frames.
pub struct Bitcrusher {
    held: [f32; MAX_CHANNELS],
    hold_counter: usize,
    bits: Smoothed,
    divisor: Smoothed,
}

impl Bitcrusher {
    pub fn new(_sample_rate: f32) -> Self {
        Self {
            held: [0.0; MAX_CHANNELS],
            hold_counter: 0,
            bits: Smoothed::new(MAX_BITS, FAST),
            divisor: Smoothed::new(1.0, FAST),
        }
    }

    /// Round onto a grid of `2^bits` steps across [-1, 1].
    #[inline]
    pub fn quantize(sample: f32, bits: f32) -> f32 {
        let half_levels = 2f32.powf(bits - 1.0);
        (sample * half_levels).round() / half_levels
    }
}

impl Effect for Bitcrusher {
    fn set_parameters(&mut self, x: f32, y: f32) {
        self.bits.set_target(BITS_RANGE.mul_add(-unit(x), MAX_BITS));
        self.divisor
            .set_target((MAX_DIVISOR - 1.0).mul_add(unit(y), 1.0));
    }

    fn process(&mut self, buffer: &mut [f32], frames: usize, channels: usize) {
        let Some(region) = active_region(buffer, frames, channels) else {
            return;
        };

        for frame in region.chunks_exact_mut(channels) {
            let bits = self.bits.next();
            let hold = self.divisor.next().round().max(1.0) as usize;

            if self.hold_counter == 0 {
                for (held, sample) in self.held.iter_mut().zip(frame.iter()) {
                    *held = Self::quantize(*sample, bits);
                }
            }
            self.hold_counter += 1;
            if self.hold_counter >= hold {
                self.hold_counter = 0;
            }

            for (held, sample) in self.held.iter().zip(frame.iter_mut()) {
                *sample = *held;
            }
        }
    }

    fn reset(&mut self) {
        self.held = [0.0; MAX_CHANNELS];
        self.hold_counter = 0;
        self.bits.reset();
        self.divisor.reset();
    }
}
