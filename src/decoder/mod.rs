//! Pull-based sample sources the engine plays from.
//!
//! A source is always a byte range inside an already-open file, so an audio
//! file embedded in a larger container (an app bundle, an archive) plays
//! without being copied out first.

use anyhow::{Context, Result, bail};
use std::fs::File;
use std::path::Path;

pub mod wav;
pub mod window;

pub use wav::WavDecoderFactory;
pub use window::SourceWindow;

/// Interleaved stereo `f32` producer bound to one source.
///
/// Owned exclusively by the engine; only ever touched under its decoder lock.
pub trait Decoder: Send {
    /// Fill `buffer` with up to `buffer.len()` interleaved samples and return
    /// how many were written. Fewer than requested means either the end of the
    /// stream or a stall; `is_end_of_stream` tells them apart.
    fn read(&mut self, buffer: &mut [f32]) -> usize;

    fn seek_to(&mut self, position_ms: u64);

    fn duration_ms(&self) -> u64;

    fn position_ms(&self) -> u64;

    fn is_end_of_stream(&self) -> bool;
}

/// Builds a decoder for a byte range. Kept behind a trait so formats the
/// crate does not decode itself can be plugged into the engine.
pub trait DecoderFactory: Send + Sync {
    fn open(&self, source: SourceRange) -> Result<Box<dyn Decoder>>;
}

/// An open file plus the `offset`/`size` byte range holding the audio data.
#[derive(Debug)]
pub struct SourceRange {
    pub file: File,
    pub offset: u64,
    pub size: u64,
}

impl SourceRange {
    pub const fn new(file: File, offset: u64, size: u64) -> Self {
        Self { file, offset, size }
    }

    /// Open `path` and select `size` bytes starting at `offset`. Without a
    /// size the range runs to the end of the file.
    pub fn open(path: &Path, offset: u64, size: Option<u64>) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("failed to open source file {}", path.display()))?;
        let file_len = file
            .metadata()
            .with_context(|| format!("failed to stat source file {}", path.display()))?
            .len();

        if offset > file_len {
            bail!("offset {offset} is past the end of {} ({file_len} bytes)", path.display());
        }

        let available = file_len - offset;
        let size = match size {
            Some(size) if size > available => bail!(
                "range {offset}+{size} exceeds {} ({file_len} bytes)",
                path.display()
            ),
            Some(size) => size,
            None => available,
        };

        Ok(Self::new(file, offset, size))
    }

    pub fn whole(path: &Path) -> Result<Self> {
        Self::open(path, 0, None)
    }
}
