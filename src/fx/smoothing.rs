//! One-pole parameter smoothing.
//!
//! Every effect keeps a [`Smoothed`] shadow for each value the pad sets. The
//! control thread only ever moves the target; the audio thread walks the
//! current value towards it once per sample, so jumps on the pad never reach
//! the signal as a step.

/// Coefficient for continuous effects (filter sweeps, modulation, reverb).
pub const SLOW: f32 = 0.002;

/// Coefficient for effects that are meant to react immediately.
pub const FAST: f32 = 0.1;

/// Distance below which the current value snaps onto the target.
const SETTLE_EPSILON: f32 = 1e-6;

#[derive(Clone, Debug)]
pub struct Smoothed {
    current: f32,
    target: f32,
    coeff: f32,
    initial: f32,
}

impl Smoothed {
    pub const fn new(initial: f32, coeff: f32) -> Self {
        Self {
            current: initial,
            target: initial,
            coeff,
            initial,
        }
    }

    pub const fn set_target(&mut self, target: f32) {
        self.target = target;
    }

    /// Jump straight to `value` without smoothing.
    pub const fn snap(&mut self, value: f32) {
        self.current = value;
        self.target = value;
    }

    /// Advance one sample and return the new current value.
    #[inline]
    pub fn next(&mut self) -> f32 {
        let distance = self.target - self.current;
        let stepped = distance.mul_add(self.coeff, self.current);

        // Small coefficients stall a few ulps short of large targets.
        if distance.abs() < SETTLE_EPSILON || stepped == self.current {
            self.current = self.target;
        } else {
            self.current = stepped;
        }
        self.current
    }

    #[inline]
    pub const fn value(&self) -> f32 {
        self.current
    }

    pub const fn target(&self) -> f32 {
        self.target
    }

    pub fn is_settled(&self) -> bool {
        self.current == self.target
    }

    /// Back to the construction value, current and target alike.
    pub const fn reset(&mut self) {
        self.snap(self.initial);
    }
}

/// Samples needed for a one-pole smoother to close all but `fraction` of a
/// step.
pub fn samples_to_settle(coeff: f32, fraction: f32) -> usize {
    (fraction.ln() / (1.0 - coeff).ln()).ceil() as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    fn converges_within_bound(coeff: f32) {
        let mut value = Smoothed::new(0.0, coeff);
        value.set_target(1.0);

        // A little headroom over the analytic bound for f32 rounding
        let bound = samples_to_settle(coeff, 0.01) + 8;
        let mut previous = value.value();
        for _ in 0..bound {
            let current = value.next();
            assert!(current >= previous, "smoothing must be monotonic");
            assert!(current <= 1.0, "smoothing must not overshoot");
            previous = current;
        }

        assert!(
            (value.value() - 1.0).abs() <= 0.01,
            "expected within 1% after {bound} samples, got {}",
            value.value()
        );
    }

    #[test]
    fn slow_coefficient_converges() {
        converges_within_bound(SLOW);
        assert!(samples_to_settle(SLOW, 0.01) < 2_500);
    }

    #[test]
    fn fast_coefficient_converges() {
        converges_within_bound(FAST);
        assert!(samples_to_settle(FAST, 0.01) < 50);
    }

    #[test]
    fn held_target_settles_exactly() {
        let mut value = Smoothed::new(0.3, FAST);
        value.set_target(0.8);
        for _ in 0..1_000 {
            value.next();
        }
        assert!(value.is_settled());
        assert_eq!(value.value(), 0.8);
    }

    #[test]
    fn downward_steps_are_monotonic() {
        let mut value = Smoothed::new(1.0, SLOW);
        value.set_target(-1.0);
        let mut previous = value.value();
        for _ in 0..5_000 {
            let current = value.next();
            assert!(current <= previous);
            previous = current;
        }
    }

    #[test]
    fn reset_restores_initial() {
        let mut value = Smoothed::new(0.5, SLOW);
        value.set_target(0.9);
        value.next();
        value.reset();
        assert_eq!(value.value(), 0.5);
        assert_eq!(value.target(), 0.5);
    }
}
