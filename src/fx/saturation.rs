/// Soft limiter applied to the final mix.
///
/// `tanh` is close to unity gain near zero and bends smoothly towards +-1,
/// so feedback build-ups from the reverb or phaser never reach the converter
/// as hard clipping. It has no state; one instance serves the whole stream.
#[derive(Clone, Copy, Debug, Default)]
pub struct Saturator;

impl Saturator {
    pub const fn new() -> Self {
        Self
    }

    #[inline]
    pub fn process(&self, input: f32) -> f32 {
        input.tanh()
    }

    pub fn process_block(&self, block: &mut [f32]) {
        for sample in block.iter_mut() {
            *sample = self.process(*sample);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounded_for_extreme_input() {
        let sat = Saturator::new();
        for input in [-1e9, -10.0, -1.5, 1.5, 10.0, 1e9] {
            let out = sat.process(input);
            assert!(out.abs() <= 1.0, "{input} -> {out}");
        }
    }

    #[test]
    fn linear_at_low_level() {
        let sat = Saturator::new();
        for input in [-0.01, 0.0, 0.005, 0.01] {
            assert!((sat.process(input) - input).abs() < 1e-6);
        }
    }

    #[test]
    fn odd_symmetry_and_monotonic() {
        let sat = Saturator::new();
        let mut previous = -1.0;
        for i in -300..=300 {
            let x = i as f32 / 100.0;
            let y = sat.process(x);
            assert_eq!(y, -sat.process(-x));
            assert!(y >= previous);
            previous = y;
        }
    }

    #[test]
    fn block_matches_per_sample() {
        let sat = Saturator::new();
        let mut block = [0.2f32, -3.0, 0.9, 12.0];
        let expected: Vec<f32> = block.iter().map(|&s| sat.process(s)).collect();
        sat.process_block(&mut block);
        assert_eq!(block.as_slice(), expected.as_slice());
    }
}
