use crate::fx::bitcrusher::Bitcrusher;
use crate::fx::chorus::Chorus;
use crate::fx::filter::Filter;
use crate::fx::glitch::Glitch;
use crate::fx::phaser::Phaser;
use crate::fx::reverb::Reverb;
use crate::fx::ring_mod::RingMod;
use crate::fx::{Effect, EffectMode};

/// One long-lived instance of every effect, selected per callback.
///
/// All instances are built up front so switching modes never allocates and
/// each effect keeps its tail across mode changes.
pub struct EffectRouter {
    filter: Filter,
    chorus: Chorus,
    reverb: Reverb,
    phaser: Phaser,
    bitcrusher: Bitcrusher,
    ring_mod: RingMod,
    glitch: Glitch,
}

impl EffectRouter {
    pub fn new(sample_rate: f32) -> Self {
        let mut router = Self {
            filter: Filter::new(sample_rate),
            chorus: Chorus::new(sample_rate),
            reverb: Reverb::new(sample_rate),
            phaser: Phaser::new(sample_rate),
            bitcrusher: Bitcrusher::new(sample_rate),
            ring_mod: RingMod::new(sample_rate),
            glitch: Glitch::new(sample_rate),
        };
        router.reset();
        router
    }

    pub fn effect_mut(&mut self, mode: EffectMode) -> &mut dyn Effect {
        match mode {
            EffectMode::Filter => &mut self.filter,
            EffectMode::Chorus => &mut self.chorus,
            EffectMode::Reverb => &mut self.reverb,
            EffectMode::Phaser => &mut self.phaser,
            EffectMode::Bitcrusher => &mut self.bitcrusher,
            EffectMode::RingMod => &mut self.ring_mod,
            EffectMode::Glitch => &mut self.glitch,
        }
    }

    /// Feed the pad position to the selected effect and run it over the
    /// first `frames` frames. `None` leaves the buffer untouched.
    pub fn process(
        &mut self,
        mode: Option<EffectMode>,
        x: f32,
        y: f32,
        buffer: &mut [f32],
        frames: usize,
        channels: usize,
    ) {
        let Some(mode) = mode else {
            return;
        };

        let effect = self.effect_mut(mode);
        effect.set_parameters(x, y);
        effect.process(buffer, frames, channels);
    }

    pub fn reset(&mut self) {
        for mode in EffectMode::ALL {
            self.effect_mut(mode).reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE: f32 = 44_100.0;

    fn noise(frames: usize, amplitude: f32) -> Vec<f32> {
        let mut state = 0x1234_5678u32;
        (0..frames * 2)
            .map(|_| {
                state ^= state << 13;
                state ^= state >> 17;
                state ^= state << 5;
                (state as f32 / u32::MAX as f32 * 2.0 - 1.0) * amplitude
            })
            .collect()
    }

    #[test]
    fn unknown_mode_is_passthrough() {
        let mut router = EffectRouter::new(SAMPLE_RATE);
        let input = noise(256, 0.5);
        let mut buffer = input.clone();
        router.process(EffectMode::from_tag(42), 1.0, 1.0, &mut buffer, 256, 2);
        assert_eq!(buffer, input);
    }

    #[test]
    fn only_valid_frames_are_processed() {
        let mut router = EffectRouter::new(SAMPLE_RATE);
        let mut buffer = vec![0.25f32; 2 * 256];
        router.process(Some(EffectMode::Bitcrusher), 1.0, 1.0, &mut buffer, 100, 2);
        assert!(buffer[200..].iter().all(|&s| s == 0.25));
    }

    #[test]
    fn every_mode_survives_pathological_input() {
        let mut router = EffectRouter::new(SAMPLE_RATE);
        let frames = 2048;
        let positions = [(0.0, 0.0), (1.0, 1.0), (0.5, 0.9), (-2.0, 5.0), (f32::NAN, 0.3)];

        for mode in EffectMode::ALL {
            for &(x, y) in &positions {
                for amplitude in [1.0, 10.0] {
                    let mut buffer = noise(frames, amplitude);
                    router.process(Some(mode), x, y, &mut buffer, frames, 2);
                    assert!(
                        buffer.iter().all(|s| s.is_finite()),
                        "{mode} produced non-finite output at ({x}, {y})"
                    );
                }
            }
        }
    }

    #[test]
    fn effects_keep_state_across_mode_switches() {
        let mut router = EffectRouter::new(SAMPLE_RATE);
        let mut impulse = vec![0.0f32; 2 * 64];
        impulse[0] = 1.0;
        impulse[1] = 1.0;
        router.process(Some(EffectMode::Reverb), 0.5, 1.0, &mut impulse, 64, 2);

        let mut other = vec![0.0f32; 2 * 64];
        router.process(Some(EffectMode::Filter), 0.5, 0.5, &mut other, 64, 2);

        let mut tail = vec![0.0f32; 2 * 4096];
        router.process(Some(EffectMode::Reverb), 0.5, 1.0, &mut tail, 4096, 2);
        assert!(tail.iter().any(|&s| s != 0.0), "reverb tail was lost");
    }
}
