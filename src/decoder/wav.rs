use anyhow::{Context, Result, bail};
use hound::{SampleFormat, WavReader, WavSpec};
use log::{debug, error, warn};
use std::io::BufReader;

use crate::decoder::{Decoder, DecoderFactory, SourceRange, SourceWindow};

const OUTPUT_CHANNELS: usize = 2;

type Reader = WavReader<BufReader<SourceWindow>>;

/// Opens RIFF/WAVE data found inside a source range.
pub struct WavDecoderFactory {
    expected_sample_rate: u32,
}

impl WavDecoderFactory {
    pub const fn new(expected_sample_rate: u32) -> Self {
        Self {
            expected_sample_rate,
        }
    }
}

impl Default for WavDecoderFactory {
    fn default() -> Self {
        Self::new(crate::audio::engine::SAMPLE_RATE)
    }
}

impl DecoderFactory for WavDecoderFactory {
    fn open(&self, source: SourceRange) -> Result<Box<dyn Decoder>> {
        let window = SourceWindow::new(source).context("failed to open source window")?;
        let reader = WavReader::new(BufReader::new(window)).context("failed to parse WAV header")?;
        let spec = reader.spec();

        if spec.channels == 0 {
            bail!("WAV data declares zero channels");
        }
        if spec.sample_rate != self.expected_sample_rate {
            warn!(
                "WAV sample rate is {} Hz, playing at {} Hz without resampling",
                spec.sample_rate, self.expected_sample_rate
            );
        }

        debug!(
            "Opened WAV: {} ch, {} Hz, {} bit {:?}, {} frames",
            spec.channels,
            spec.sample_rate,
            spec.bits_per_sample,
            spec.sample_format,
            reader.duration()
        );

        Ok(Box::new(WavDecoder::new(reader)))
    }
}

/// Streams frames out of a `hound` reader as interleaved stereo.
///
/// Mono sources are duplicated to both sides; channels past the second are
/// skipped.
pub struct WavDecoder {
    reader: Reader,
    spec: WavSpec,
    int_scale: f32,
    total_frames: u64,
    position: u64,
    end_of_stream: bool,
    read_failed: bool,
}

impl WavDecoder {
    fn new(reader: Reader) -> Self {
        let spec = reader.spec();
        let int_scale = 1.0 / (1u64 << (spec.bits_per_sample.clamp(1, 32) - 1)) as f32;
        let total_frames = u64::from(reader.duration());

        Self {
            reader,
            spec,
            int_scale,
            total_frames,
            position: 0,
            end_of_stream: total_frames == 0,
            read_failed: false,
        }
    }

    fn next_sample(&mut self) -> Option<hound::Result<f32>> {
        match self.spec.sample_format {
            SampleFormat::Float => self.reader.samples::<f32>().next(),
            SampleFormat::Int => {
                let scale = self.int_scale;
                self.reader
                    .samples::<i32>()
                    .next()
                    .map(|s| s.map(|v| v as f32 * scale))
            }
        }
    }

    fn next_frame(&mut self) -> hound::Result<Option<[f32; OUTPUT_CHANNELS]>> {
        let mut frame = [0.0; OUTPUT_CHANNELS];

        for channel in 0..usize::from(self.spec.channels) {
            let Some(sample) = self.next_sample().transpose()? else {
                return Ok(None);
            };
            if channel < OUTPUT_CHANNELS {
                frame[channel] = sample;
            }
        }

        if self.spec.channels == 1 {
            frame[1] = frame[0];
        }

        Ok(Some(frame))
    }

    fn frames_to_ms(&self, frames: u64) -> u64 {
        frames * 1000 / u64::from(self.spec.sample_rate.max(1))
    }
}

impl Decoder for WavDecoder {
    fn read(&mut self, buffer: &mut [f32]) -> usize {
        if self.end_of_stream {
            return 0;
        }

        let mut written = 0;
        for out in buffer.chunks_exact_mut(OUTPUT_CHANNELS) {
            match self.next_frame() {
                Ok(Some(frame)) => {
                    out.copy_from_slice(&frame);
                    written += OUTPUT_CHANNELS;
                    self.position += 1;
                }
                Ok(None) => {
                    self.end_of_stream = true;
                    break;
                }
                Err(e) => {
                    if !self.read_failed {
                        error!("WAV read failed at frame {}: {e}", self.position);
                        self.read_failed = true;
                    }
                    self.end_of_stream = true;
                    break;
                }
            }
        }

        if self.position >= self.total_frames {
            self.end_of_stream = true;
        }

        written
    }

    fn seek_to(&mut self, position_ms: u64) {
        let target = (position_ms.saturating_mul(u64::from(self.spec.sample_rate)) / 1000)
            .min(self.total_frames);

        // `total_frames` came from a u32, so the clamped target fits.
        let frame = u32::try_from(target).unwrap_or(u32::MAX);
        if let Err(e) = self.reader.seek(frame) {
            error!("WAV seek to {position_ms} ms failed: {e}");
            return;
        }

        self.position = target;
        self.end_of_stream = target >= self.total_frames;
    }

    fn duration_ms(&self) -> u64 {
        self.frames_to_ms(self.total_frames)
    }

    fn position_ms(&self) -> u64 {
        self.frames_to_ms(self.position)
    }

    fn is_end_of_stream(&self) -> bool {
        self.end_of_stream
    }
}
