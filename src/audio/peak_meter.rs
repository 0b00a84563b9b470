use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

const CLIP_THRESHOLD: f32 = 0.95;
const HOLD_SECONDS: usize = 2;

/// Output level meter. Runs on the audio thread and publishes the held peak
/// as raw `f32` bits in an atomic, so neither side allocates or waits.
pub struct PeakMeter {
    current_peak: f32,
    published_peak: f32,
    samples_since_peak: usize,
    peak_hold_samples: usize,
    peak_bits: Arc<AtomicU32>,
}

#[derive(Clone)]
pub struct PeakMeterHandle {
    peak_bits: Arc<AtomicU32>,
}

#[derive(Debug, Clone, Default)]
pub struct PeakMeterInfo {
    pub peak_db: f32,
    pub peak_linear: f32,
    pub is_clipping: bool,
}

impl PeakMeterInfo {
    fn from_peak(peak_linear: f32) -> Self {
        let peak_db = if peak_linear > 1e-10 {
            20.0 * peak_linear.log10()
        } else {
            -100.0
        };

        Self {
            peak_db,
            peak_linear,
            is_clipping: peak_linear >= CLIP_THRESHOLD,
        }
    }
}

impl PeakMeter {
    /// `samples` passed to `process` are interleaved over `channels`.
    pub fn new(sample_rate: usize, channels: usize) -> (Self, PeakMeterHandle) {
        let peak_bits = Arc::new(AtomicU32::new(0.0f32.to_bits()));

        (
            Self::publishing_to(Arc::clone(&peak_bits), sample_rate, channels),
            PeakMeterHandle { peak_bits },
        )
    }

    fn publishing_to(peak_bits: Arc<AtomicU32>, sample_rate: usize, channels: usize) -> Self {
        Self {
            current_peak: 0.0,
            published_peak: f32::from_bits(peak_bits.load(Ordering::Relaxed)),
            samples_since_peak: 0,
            peak_hold_samples: sample_rate * channels.max(1) * HOLD_SECONDS,
            peak_bits,
        }
    }

    pub fn process(&mut self, samples: &[f32]) {
        let block_peak = samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max);

        if block_peak > self.current_peak {
            self.current_peak = block_peak;
            self.samples_since_peak = 0;
        } else {
            self.samples_since_peak += samples.len();

            if self.samples_since_peak > self.peak_hold_samples {
                self.current_peak = block_peak;
                self.samples_since_peak = 0;
            }
        }

        if self.current_peak.to_bits() != self.published_peak.to_bits() {
            self.publish(self.current_peak);
        }
    }

    pub fn reset(&mut self) {
        self.current_peak = 0.0;
        self.samples_since_peak = 0;
        self.publish(0.0);
    }

    fn publish(&mut self, peak: f32) {
        self.published_peak = peak;
        self.peak_bits.store(peak.to_bits(), Ordering::Relaxed);
    }
}

impl PeakMeterHandle {
    pub fn get_info(&self) -> PeakMeterInfo {
        PeakMeterInfo::from_peak(f32::from_bits(self.peak_bits.load(Ordering::Relaxed)))
    }

    /// A new meter publishing into this handle.
    pub(crate) fn meter(&self, sample_rate: usize, channels: usize) -> PeakMeter {
        PeakMeter::publishing_to(Arc::clone(&self.peak_bits), sample_rate, channels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    const TEST_SAMPLE_RATE: usize = 44_100;

    #[test]
    fn test_peak_meter_detects_peaks() {
        let (mut meter, handle) = PeakMeter::new(TEST_SAMPLE_RATE, 2);

        meter.process(&[0.0f32; 128]);
        let info = handle.get_info();
        assert!(info.peak_linear < 0.01);
        assert_eq!(info.peak_db, -100.0);
        assert!(!info.is_clipping);

        meter.process(&[0.8f32; 128]);
        let info = handle.get_info();
        assert!((info.peak_linear - 0.8).abs() < 0.01);
        assert!(!info.is_clipping);

        meter.process(&[-0.99f32; 128]);
        let info = handle.get_info();
        assert!(info.is_clipping);
        assert!(info.peak_linear > 0.95);
    }

    #[test]
    fn test_peak_meter_holds_then_releases() {
        let (mut meter, handle) = PeakMeter::new(TEST_SAMPLE_RATE, 2);

        meter.process(&[0.8f32; 128]);
        meter.process(&[0.2f32; 128]);
        assert!(handle.get_info().peak_linear > 0.7);

        let quiet = vec![0.2f32; TEST_SAMPLE_RATE * 2 * HOLD_SECONDS + 1];
        meter.process(&quiet);
        assert!((handle.get_info().peak_linear - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_reset_and_attached_meter() {
        let (mut meter, handle) = PeakMeter::new(TEST_SAMPLE_RATE, 2);
        meter.process(&[0.5f32; 16]);
        meter.reset();
        assert_eq!(handle.get_info().peak_linear, 0.0);

        let mut second = handle.meter(TEST_SAMPLE_RATE, 2);
        second.process(&[0.4f32; 16]);
        assert!((handle.get_info().peak_linear - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_steady_level_is_published_once() {
        let (mut meter, handle) = PeakMeter::new(TEST_SAMPLE_RATE, 2);
        meter.process(&[0.5f32; 256]);
        assert_eq!(handle.get_info().peak_linear, 0.5);

        // Overwrite the cell behind the meter's back; an unchanged held peak
        // must leave it alone.
        let marker = 0.123f32;
        handle.peak_bits.store(marker.to_bits(), Ordering::Relaxed);
        for _ in 0..100 {
            meter.process(&[0.5f32; 256]);
        }
        assert_eq!(handle.get_info().peak_linear, marker);

        meter.process(&[0.7f32; 256]);
        assert_eq!(handle.get_info().peak_linear, 0.7);
    }

    #[test]
    fn test_info_from_peak() {
        let info = PeakMeterInfo::from_peak(1.0);
        assert_eq!(info.peak_db, 0.0);
        assert!(info.is_clipping);
        assert_eq!(PeakMeterInfo::from_peak(0.0).peak_db, -100.0);
    }
}
