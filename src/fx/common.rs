use std::f32::consts::TAU;

/// Map a pad axis value onto `[0, 1]`. NaN reads as zero.
#[inline]
pub fn unit(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// The interleaved region an effect is allowed to touch, or `None` when
/// there is nothing to process.
#[inline]
pub fn active_region(buffer: &mut [f32], frames: usize, channels: usize) -> Option<&mut [f32]> {
    if channels == 0 || frames == 0 {
        return None;
    }
    let len = (frames * channels).min(buffer.len() - buffer.len() % channels);
    if len == 0 {
        return None;
    }
    Some(&mut buffer[..len])
}

/// Sine low-frequency oscillator with its phase kept in cycles `[0, 1)`.
#[derive(Clone)]
pub struct Lfo {
    phase: f32,
    sample_rate: f32,
}

impl Lfo {
    pub const fn new(sample_rate: f32) -> Self {
        Self {
            phase: 0.0,
            sample_rate,
        }
    }

    pub const fn phase(&self) -> f32 {
        self.phase
    }

    pub const fn set_phase(&mut self, phase: f32) {
        self.phase = phase;
    }

    /// Advance by one sample at `rate_hz` and return the new phase.
    #[inline]
    pub fn advance(&mut self, rate_hz: f32) -> f32 {
        self.phase += rate_hz / self.sample_rate;
        if self.phase >= 1.0 {
            self.phase -= self.phase.floor();
        }
        self.phase
    }

    /// Sine of the current phase, offset by `offset` cycles.
    #[inline]
    pub fn sine(&self, offset: f32) -> f32 {
        (TAU * (self.phase + offset)).sin()
    }

    pub const fn reset(&mut self) {
        self.phase = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_clamps_and_rejects_nan() {
        assert_eq!(unit(-3.0), 0.0);
        assert_eq!(unit(0.25), 0.25);
        assert_eq!(unit(7.0), 1.0);
        assert_eq!(unit(f32::NAN), 0.0);
    }

    #[test]
    fn active_region_respects_frames_and_buffer() {
        let mut buffer = [0.0f32; 10];
        assert_eq!(active_region(&mut buffer, 3, 2).map(|r| r.len()), Some(6));
        assert_eq!(active_region(&mut buffer, 8, 2).map(|r| r.len()), Some(10));
        assert!(active_region(&mut buffer, 0, 2).is_none());
        assert!(active_region(&mut buffer, 4, 0).is_none());
    }

    #[test]
    fn lfo_wraps_phase() {
        let mut lfo = Lfo::new(100.0);
        for _ in 0..250 {
            let phase = lfo.advance(1.0);
            assert!((0.0..1.0).contains(&phase));
        }
        assert!((lfo.phase() - 0.5).abs() < 1e-3);
    }
}
