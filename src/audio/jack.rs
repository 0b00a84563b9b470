use jack::Client;
use log::{debug, warn};

use crate::audio::callback::{AudioCallback, CallbackResult};
use crate::audio::engine::{CHANNELS, SAMPLE_RATE};
use crate::audio::ports::Ports;

pub struct NotificationHandler;

/// Drives an `AudioCallback` from the JACK process thread.
pub struct ProcessHandler<C: AudioCallback> {
    ports: Ports,
    callback: C,
    buffer: Vec<f32>,
}

impl jack::NotificationHandler for NotificationHandler {
    fn sample_rate(&mut self, _: &Client, sample_rate: jack::Frames) -> jack::Control {
        debug!(">> JACK sample_rate changed to {sample_rate}");

        if sample_rate != SAMPLE_RATE {
            warn!("JACK now runs at {sample_rate} Hz, audio is rendered for {SAMPLE_RATE} Hz");
        }

        jack::Control::Continue
    }

    fn xrun(&mut self, _: &Client) -> jack::Control {
        warn!(">> JACK xrun");

        jack::Control::Continue
    }
}

impl<C: AudioCallback> ProcessHandler<C> {
    pub fn new(ports: Ports, callback: C, buffer_size: usize) -> Self {
        Self {
            ports,
            callback,
            buffer: vec![0.0; buffer_size * CHANNELS],
        }
    }

    pub fn into_callback(self) -> C {
        self.callback
    }
}

impl<C: AudioCallback> jack::ProcessHandler for ProcessHandler<C> {
    fn process(&mut self, _client: &jack::Client, ps: &jack::ProcessScope) -> jack::Control {
        let samples = ps.n_frames() as usize * CHANNELS;

        // The buffer is resized in `buffer_size`; never allocate here.
        let Some(block) = self.buffer.get_mut(..samples) else {
            self.ports.silence_output(ps);
            return jack::Control::Continue;
        };

        match self.callback.render(block) {
            CallbackResult::Continue => {
                self.ports.write_output(ps, block);
                jack::Control::Continue
            }
            CallbackResult::Stop => {
                self.ports.silence_output(ps);
                jack::Control::Quit
            }
        }
    }

    fn buffer_size(&mut self, _client: &jack::Client, frames: jack::Frames) -> jack::Control {
        debug!(">> JACK buffer_size changed to {frames} frames");

        self.buffer.resize(frames as usize * CHANNELS, 0.0);

        jack::Control::Continue
    }
}
