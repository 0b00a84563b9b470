use crossbeam::channel::{Receiver, Sender, bounded};
use log::{error, info, warn};
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError};

use crate::audio::callback::{AudioCallback, CallbackResult};
use crate::audio::peak_meter::{PeakMeter, PeakMeterHandle, PeakMeterInfo};
use crate::decoder::{Decoder, DecoderFactory, SourceRange};
use crate::fx::{EffectMode, EffectRouter, Saturator};

pub const SAMPLE_RATE: u32 = 44_100;
pub const CHANNELS: usize = 2;

/// Starved callbacks in a row between two diagnostics.
const STARVATION_REPORT_INTERVAL: u64 = 100;
const EVENT_QUEUE_CAPACITY: usize = 64;

/// Notifications pushed from the audio thread. Dropped when nobody drains
/// the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineEvent {
    PlaybackFinished,
    Starved { total: u64 },
}

/// `f32` stored as raw bits so it can live in an atomic.
struct AtomicF32(AtomicU32);

impl AtomicF32 {
    fn new(value: f32) -> Self {
        Self(AtomicU32::new(value.to_bits()))
    }

    fn load(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }

    fn store(&self, value: f32) {
        self.0.store(value.to_bits(), Ordering::Relaxed);
    }
}

/// Everything the control thread and the audio thread both touch.
///
/// Pad position, mode and transport are independent lock-free cells. The
/// decoder sits behind a mutex that the audio thread only ever `try_lock`s.
struct SharedState {
    playing: AtomicBool,
    mode: AtomicI32,
    x: AtomicF32,
    y: AtomicF32,
    starved_callbacks: AtomicU64,
    decoder: Mutex<Option<Box<dyn Decoder>>>,
}

impl SharedState {
    fn new() -> Self {
        Self {
            playing: AtomicBool::new(false),
            mode: AtomicI32::new(EffectMode::Filter.tag()),
            x: AtomicF32::new(0.5),
            y: AtomicF32::new(0.5),
            starved_callbacks: AtomicU64::new(0),
            decoder: Mutex::new(None),
        }
    }

    fn lock_decoder(&self) -> MutexGuard<'_, Option<Box<dyn Decoder>>> {
        self.decoder.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Counts starved callbacks and decides when one is worth reporting.
#[derive(Default)]
struct StarvationMonitor {
    consecutive: u64,
}

impl StarvationMonitor {
    /// Returns the new total when this starved callback should be reported:
    /// the first of a run, then every `STARVATION_REPORT_INTERVAL` after it.
    fn record(&mut self, total: &AtomicU64) -> Option<u64> {
        let total = total.fetch_add(1, Ordering::Relaxed) + 1;
        self.consecutive += 1;

        (self.consecutive % STARVATION_REPORT_INTERVAL == 1).then_some(total)
    }

    const fn clear(&mut self) {
        self.consecutive = 0;
    }
}

/// Real-time half of the player. Lives on the audio thread.
pub struct Engine {
    shared: Arc<SharedState>,
    router: EffectRouter,
    saturator: Saturator,
    peak_meter: PeakMeter,
    starvation: StarvationMonitor,
    events: Sender<EngineEvent>,
}

/// Control half of the player. Cheap to clone; every method is safe to call
/// from any thread while the engine is rendering.
#[derive(Clone)]
pub struct EngineHandle {
    shared: Arc<SharedState>,
    factory: Arc<dyn DecoderFactory>,
    events_tx: Sender<EngineEvent>,
    events_rx: Receiver<EngineEvent>,
    peak_meter: PeakMeterHandle,
}

impl Engine {
    pub fn new(factory: Arc<dyn DecoderFactory>) -> (Self, EngineHandle) {
        let (events_tx, events_rx) = bounded(EVENT_QUEUE_CAPACITY);
        let (peak_meter, peak_meter_handle) = PeakMeter::new(SAMPLE_RATE as usize, CHANNELS);
        let shared = Arc::new(SharedState::new());

        let handle = EngineHandle {
            shared: Arc::clone(&shared),
            factory,
            events_tx: events_tx.clone(),
            events_rx,
            peak_meter: peak_meter_handle,
        };

        (Self::with_parts(shared, peak_meter, events_tx), handle)
    }

    /// Build a fresh real-time half for an existing handle, used when the
    /// previous one was lost with a failed stream activation.
    pub(crate) fn attach(handle: &EngineHandle) -> Self {
        Self::with_parts(
            Arc::clone(&handle.shared),
            handle.peak_meter.meter(SAMPLE_RATE as usize, CHANNELS),
            handle.events_tx.clone(),
        )
    }

    fn with_parts(
        shared: Arc<SharedState>,
        peak_meter: PeakMeter,
        events: Sender<EngineEvent>,
    ) -> Self {
        Self {
            shared,
            router: EffectRouter::new(SAMPLE_RATE as f32),
            saturator: Saturator::new(),
            peak_meter,
            starvation: StarvationMonitor::default(),
            events,
        }
    }

    fn notify(&self, event: EngineEvent) {
        // A full queue only loses a notification.
        let _ = self.events.try_send(event);
    }

    fn play_block(&mut self, output: &mut [f32]) {
        if !self.shared.playing.load(Ordering::Acquire) {
            return;
        }

        let mut guard = match self.shared.decoder.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => return,
        };
        let Some(decoder) = guard.as_mut() else {
            return;
        };

        let requested = output.len() - output.len() % CHANNELS;
        let samples_read = decoder.read(&mut output[..requested]).min(requested);
        let end_of_stream = decoder.is_end_of_stream();
        drop(guard);

        if samples_read < requested && end_of_stream {
            self.shared.playing.store(false, Ordering::Release);
            self.starvation.clear();
            info!("Playback finished (end of stream)");
            self.notify(EngineEvent::PlaybackFinished);
        } else if samples_read < requested {
            if let Some(total) = self.starvation.record(&self.shared.starved_callbacks) {
                warn!("Decoder starved: read {samples_read} of {requested} samples ({total} starved callbacks)");
                self.notify(EngineEvent::Starved { total });
            }
        } else {
            self.starvation.clear();
        }

        let mode = EffectMode::from_tag(self.shared.mode.load(Ordering::Relaxed));
        let x = self.shared.x.load();
        let y = self.shared.y.load();

        self.router
            .process(mode, x, y, output, samples_read / CHANNELS, CHANNELS);
    }
}

impl AudioCallback for Engine {
    fn render(&mut self, output: &mut [f32]) -> CallbackResult {
        output.fill(0.0);

        self.play_block(output);
        self.saturator.process_block(output);
        self.peak_meter.process(output);

        CallbackResult::Continue
    }
}

impl EngineHandle {
    /// Replace the bound decoder with one opened on `source`.
    ///
    /// Playback is paused first and stays paused. On failure the previous
    /// decoder stays bound.
    pub fn load_source(&self, source: SourceRange) -> bool {
        self.shared.playing.store(false, Ordering::Release);

        let mut decoder = self.shared.lock_decoder();
        let loaded = match self.factory.open(source) {
            Ok(new_decoder) => {
                info!("Source loaded, duration {} ms", new_decoder.duration_ms());
                *decoder = Some(new_decoder);
                true
            }
            Err(e) => {
                error!("Failed to load source: {e:#}");
                false
            }
        };

        // A play() issued while the factory was opening doesn't carry over.
        self.shared.playing.store(false, Ordering::Release);
        loaded
    }

    pub fn play(&self) {
        self.shared.playing.store(true, Ordering::Release);
        info!("Play requested");
    }

    pub fn pause(&self) {
        self.shared.playing.store(false, Ordering::Release);
        info!("Pause requested");
    }

    /// Pause and rewind to the start.
    pub fn stop(&self) {
        self.shared.playing.store(false, Ordering::Release);
        self.seek_to(0);
        info!("Stop requested");
    }

    pub fn seek_to(&self, position_ms: u64) {
        if let Some(decoder) = self.shared.lock_decoder().as_mut() {
            decoder.seek_to(position_ms);
        }
    }

    pub fn duration_ms(&self) -> u64 {
        self.shared
            .lock_decoder()
            .as_ref()
            .map_or(0, |decoder| decoder.duration_ms())
    }

    pub fn position_ms(&self) -> u64 {
        self.shared
            .lock_decoder()
            .as_ref()
            .map_or(0, |decoder| decoder.position_ms())
    }

    pub fn is_playing(&self) -> bool {
        self.shared.playing.load(Ordering::Acquire)
    }

    pub fn set_xy(&self, x: f32, y: f32) {
        self.shared.x.store(x);
        self.shared.y.store(y);
    }

    pub fn xy(&self) -> (f32, f32) {
        (self.shared.x.load(), self.shared.y.load())
    }

    /// Store a raw mode tag. Tags without an effect play dry.
    pub fn set_effect_mode(&self, tag: i32) {
        self.shared.mode.store(tag, Ordering::Relaxed);
    }

    pub fn effect_mode(&self) -> Option<EffectMode> {
        EffectMode::from_tag(self.shared.mode.load(Ordering::Relaxed))
    }

    pub fn starvation_count(&self) -> u64 {
        self.shared.starved_callbacks.load(Ordering::Relaxed)
    }

    pub fn try_next_event(&self) -> Option<EngineEvent> {
        self.events_rx.try_recv().ok()
    }

    pub const fn events(&self) -> &Receiver<EngineEvent> {
        &self.events_rx
    }

    pub fn peak(&self) -> PeakMeterInfo {
        self.peak_meter.get_info()
    }
}
