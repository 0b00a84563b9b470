/// What the platform should do after a block has been rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackResult {
    Continue,
    Stop,
}

/// Produces interleaved output blocks on the audio thread.
///
/// This is the only seam between the engine and the audio backend: the
/// backend hands over a buffer of `frames * channels` samples, the callback
/// fills every sample of it. Implementations must not block.
pub trait AudioCallback: Send + 'static {
    fn render(&mut self, output: &mut [f32]) -> CallbackResult;
}
