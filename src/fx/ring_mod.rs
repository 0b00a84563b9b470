use crate::fx::common::{Lfo, active_region, unit};
use crate::fx::smoothing::{SLOW, Smoothed};
use crate::fx::Effect;

const MIN_CARRIER_HZ: f32 = 50.0;
/// Carrier span: 50 Hz * 80 = 4 kHz at the top of the pad.
const CARRIER_SPAN: f32 = 80.0;

/// Ring modulator: the input multiplied by a sine carrier.
///
/// X sweeps the carrier logarithmically (`50 * 80^x` Hz), Y blends the
/// modulated signal against the dry input.
pub struct RingMod {
    carrier: Lfo,
    frequency: Smoothed,
    mix: Smoothed,
}

impl RingMod {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            carrier: Lfo::new(sample_rate),
            frequency: Smoothed::new(440.0, SLOW),
            mix: Smoothed::new(0.0, SLOW),
        }
    }

    pub fn carrier_frequency(x: f32) -> f32 {
        MIN_CARRIER_HZ * CARRIER_SPAN.powf(unit(x))
    }
}

impl Effect for RingMod {
    fn set_parameters(&mut self, x: f32, y: f32) {
        self.frequency.set_target(Self::carrier_frequency(x));
        self.mix.set_target(unit(y));
    }

    fn process(&mut self, buffer: &mut [f32], frames: usize, channels: usize) {
        let Some(region) = active_region(buffer, frames, channels) else {
            return;
        };

        for frame in region.chunks_exact_mut(channels) {
            let frequency = self.frequency.next();
            let mix = self.mix.next();

            self.carrier.advance(frequency);
            let carrier = self.carrier.sine(0.0);

            for sample in frame.iter_mut() {
                let input = *sample;
                let wet = input * carrier;
                *sample = input.mul_add(1.0 - mix, wet * mix);
            }
        }
    }

    fn reset(&mut self) {
        self.carrier.reset();
        self.frequency.reset();
        self.mix.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE: f32 = 44_100.0;

    fn locked_carrier(phase: f32) -> RingMod {
        let mut ring = RingMod::new(SAMPLE_RATE);
        ring.frequency.snap(0.0);
        ring.mix.snap(1.0);
        ring.carrier.set_phase(phase);
        ring
    }

    fn ramp(frames: usize) -> Vec<f32> {
        (0..frames * 2).map(|i| i as f32 / 100.0 - 3.0).collect()
    }

    #[test]
    fn frequency_mapping_is_logarithmic() {
        assert!((RingMod::carrier_frequency(0.0) - 50.0).abs() < 1e-3);
        assert!((RingMod::carrier_frequency(0.5) - 447.2136).abs() < 0.01);
        assert!((RingMod::carrier_frequency(1.0) - 4000.0).abs() < 0.5);
    }

    #[test]
    fn stopped_carrier_at_peak_passes_input_unscaled() {
        let mut ring = locked_carrier(0.25);
        let input = ramp(256);
        let mut buffer = input.clone();
        ring.process(&mut buffer, 256, 2);
        assert_eq!(buffer, input);
    }

    #[test]
    fn stopped_carrier_at_trough_only_flips_sign() {
        let mut ring = locked_carrier(0.75);
        let input = ramp(256);
        let mut buffer = input.clone();
        ring.process(&mut buffer, 256, 2);
        for (out, inp) in buffer.iter().zip(&input) {
            assert!((out + inp).abs() < 1e-5, "expected {} got {}", -inp, out);
        }
    }

    #[test]
    fn stopped_carrier_at_zero_phase_silences() {
        let mut ring = locked_carrier(0.0);
        let mut buffer = ramp(128);
        ring.process(&mut buffer, 128, 2);
        assert!(buffer.iter().all(|s| s.abs() < 1e-6));
    }

    #[test]
    fn zero_mix_is_dry() {
        let mut ring = RingMod::new(SAMPLE_RATE);
        ring.set_parameters(0.7, 0.0);
        let input = ramp(512);
        let mut buffer = input.clone();
        ring.process(&mut buffer, 512, 2);
        assert_eq!(buffer, input);
    }

    #[test]
    fn output_bounded_by_input() {
        let mut ring = RingMod::new(SAMPLE_RATE);
        ring.set_parameters(0.4, 1.0);
        let mut buffer = vec![1.0f32; 2 * 8192];
        ring.process(&mut buffer, 8192, 2);
        assert!(buffer.iter().all(|s| s.abs() <= 1.0 + 1e-6));
    }
}
