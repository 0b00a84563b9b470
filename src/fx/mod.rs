pub mod bitcrusher;
pub mod chorus;
pub mod common;
pub mod filter;
pub mod glitch;
pub mod mode;
pub mod phaser;
pub mod reverb;
pub mod ring_mod;
pub mod router;
pub mod saturation;
pub mod smoothing;

pub use mode::EffectMode;
pub use router::EffectRouter;
pub use saturation::Saturator;

/// Highest channel count any effect keeps state for. Channels beyond this
/// pass through untouched.
pub const MAX_CHANNELS: usize = 2;

// The contract every XY-pad effect implements
pub trait Effect: Send + 'static {
    // Store new target values from the pad. Both axes are in [0, 1]; anything
    // else is reinterpreted, never rejected.
    fn set_parameters(&mut self, x: f32, y: f32);

    // Process `frames` interleaved frames of `channels` samples in place
    fn process(&mut self, buffer: &mut [f32], frames: usize, channels: usize);

    // Clear filter/delay state and snap parameters back to their defaults
    fn reset(&mut self);
}
