use std::f32::consts::PI;

use crate::fx::common::{active_region, unit};
use crate::fx::smoothing::{SLOW, Smoothed};
use crate::fx::{Effect, MAX_CHANNELS};

const MIN_CUTOFF_HZ: f32 = 20.0;
/// Cutoff span: 20 Hz * 1000 = 20 kHz at the top of the pad.
const CUTOFF_SPAN: f32 = 1000.0;
const MAX_RESONANCE: f32 = 0.95;
const MIN_Q: f32 = 0.5;
const MAX_Q: f32 = 10.0;

/// Zero-delay-feedback state variable lowpass (Simper's TPT form).
#[derive(Clone, Copy, Default)]
struct SvfState {
    ic1eq: f32,
    ic2eq: f32,
}

impl SvfState {
    #[inline]
    fn lowpass(&mut self, input: f32, g: f32, r: f32) -> f32 {
        let h = 1.0 / g.mul_add(g + r, 1.0);
        let v1 = g.mul_add(input - self.ic2eq, self.ic1eq) * h;
        let v2 = g.mul_add(v1, self.ic2eq);
        self.ic1eq = 2.0f32.mul_add(v1, -self.ic1eq);
        self.ic2eq = 2.0f32.mul_add(v2, -self.ic2eq);
        v2
    }
}

/// Resonant lowpass sweep.
///
/// X moves the cutoff logarithmically from 20 Hz to 20 kHz, Y adds
/// resonance up to 0.95 (Q 0.5 to 10).
pub struct Filter {
    sample_rate: f32,
    states: [SvfState; MAX_CHANNELS],
    cutoff: Smoothed,
    resonance: Smoothed,
}

impl Filter {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            sample_rate,
            states: [SvfState::default(); MAX_CHANNELS],
            cutoff: Smoothed::new(Self::cutoff_frequency(0.5), SLOW),
            resonance: Smoothed::new(0.5 * MAX_RESONANCE, SLOW),
        }
    }

    pub fn cutoff_frequency(x: f32) -> f32 {
        MIN_CUTOFF_HZ * CUTOFF_SPAN.powf(unit(x))
    }

    fn q_for(resonance: f32) -> f32 {
        (MAX_Q - MIN_Q).mul_add(resonance / MAX_RESONANCE, MIN_Q)
    }
}

impl Effect for Filter {
    fn set_parameters(&mut self, x: f32, y: f32) {
        self.cutoff.set_target(Self::cutoff_frequency(x));
        self.resonance.set_target(unit(y) * MAX_RESONANCE);
    }

    fn process(&mut self, buffer: &mut [f32], frames: usize, channels: usize) {
        let Some(region) = active_region(buffer, frames, channels) else {
            return;
        };
        let nyquist_guard = self.sample_rate * 0.45;

        for frame in region.chunks_exact_mut(channels) {
            let cutoff = self.cutoff.next().clamp(MIN_CUTOFF_HZ, nyquist_guard);
            let resonance = self.resonance.next();

            let g = (PI * cutoff / self.sample_rate).tan();
            let r = 1.0 / Self::q_for(resonance);

            for (state, sample) in self.states.iter_mut().zip(frame.iter_mut()) {
                *sample = state.lowpass(*sample, g, r);
            }
        }
    }

    fn reset(&mut self) {
        self.states = [SvfState::default(); MAX_CHANNELS];
        self.cutoff.reset();
        self.resonance.reset();
    }
}
