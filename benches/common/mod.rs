#![allow(dead_code)]

use anyhow::Result;
use kaosspad::decoder::{Decoder, DecoderFactory, SourceRange};
use std::path::Path;

/// A sine that never ends, so the engine always has a full block to read.
pub struct SineDecoder {
    phase: f32,
}

impl Decoder for SineDecoder {
    fn read(&mut self, buffer: &mut [f32]) -> usize {
        for frame in buffer.chunks_exact_mut(2) {
            let s = self.phase.sin() * 0.7;
            frame[0] = s;
            frame[1] = s;
            self.phase = (self.phase + 0.0627) % std::f32::consts::TAU;
        }
        buffer.len()
    }

    fn seek_to(&mut self, _: u64) {}

    fn duration_ms(&self) -> u64 {
        0
    }

    fn position_ms(&self) -> u64 {
        0
    }

    fn is_end_of_stream(&self) -> bool {
        false
    }
}

pub struct SineFactory;

impl DecoderFactory for SineFactory {
    fn open(&self, _: SourceRange) -> Result<Box<dyn Decoder>> {
        Ok(Box::new(SineDecoder { phase: 0.0 }))
    }
}

/// The sine factory ignores its source, but loading still needs a real file.
pub fn placeholder_source(dir: &Path) -> SourceRange {
    let path = dir.join("placeholder");
    std::fs::write(&path, [0u8; 4]).unwrap();
    SourceRange::whole(&path).unwrap()
}

pub fn test_signal(frames: usize) -> Vec<f32> {
    (0..frames)
        .flat_map(|n| {
            let s = (n as f32 * 0.0627).sin() * 0.7;
            [s, s]
        })
        .collect()
}
