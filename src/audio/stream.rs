use anyhow::{Context, Result, bail};
use jack::{AsyncClient, Client, ClientOptions};
use log::{debug, error, info, warn};
use std::sync::Arc;

use crate::audio::engine::{Engine, EngineHandle, SAMPLE_RATE};
use crate::audio::jack::{NotificationHandler, ProcessHandler};
use crate::audio::peak_meter::PeakMeterInfo;
use crate::audio::ports::{LEFT_PORT, Ports, RIGHT_PORT};
use crate::decoder::DecoderFactory;
use crate::settings::AudioSettings;

type ActiveClient = AsyncClient<NotificationHandler, ProcessHandler<Engine>>;

/// Owns the JACK connection and the engine it drives.
///
/// The engine survives `stop()`, so a later `start()` resumes with the same
/// effect state and the same bound source.
pub struct StreamManager {
    settings: AudioSettings,
    engine_handle: EngineHandle,
    idle_engine: Option<Engine>,
    active_client: Option<ActiveClient>,
}

impl StreamManager {
    pub fn new(settings: AudioSettings, factory: Arc<dyn DecoderFactory>) -> Self {
        let (engine, engine_handle) = Engine::new(factory);

        Self {
            settings,
            engine_handle,
            idle_engine: Some(engine),
            active_client: None,
        }
    }

    /// Connect to a running JACK server and start rendering. Failures are
    /// logged and leave the manager stopped; nothing is retried.
    pub fn start(&mut self) -> Result<()> {
        if self.active_client.is_some() {
            debug!("Audio stream already running");
            return Ok(());
        }

        match self.open_stream() {
            Ok(active_client) => {
                self.active_client = Some(active_client);
                info!("Audio stream started");
                Ok(())
            }
            Err(e) => {
                error!("Failed to start audio stream: {e:#}");
                Err(e)
            }
        }
    }

    fn open_stream(&mut self) -> Result<ActiveClient> {
        let (client, status) =
            Client::new(&self.settings.client_name, ClientOptions::NO_START_SERVER)
                .context("failed to create JACK client")?;
        debug!("JACK client status: {status:?}");

        let sample_rate = client.sample_rate();
        if sample_rate != SAMPLE_RATE {
            bail!("JACK runs at {sample_rate} Hz, {SAMPLE_RATE} Hz is required");
        }

        let ports = Ports::new(&client).context("failed to create audio ports")?;
        let buffer_size = client.buffer_size() as usize;

        // A failed activation consumes the previous engine; build a new one
        // on the same shared state.
        let engine = self
            .idle_engine
            .take()
            .unwrap_or_else(|| Engine::attach(&self.engine_handle));
        let handler = ProcessHandler::new(ports, engine, buffer_size);

        let active_client = client
            .activate_async(NotificationHandler, handler)
            .context("failed to activate async client")?;

        if self.settings.auto_connect {
            connect_ports(&active_client, &self.settings);
        }

        Ok(active_client)
    }

    /// Deactivate the JACK client. Safe to call when not running.
    pub fn stop(&mut self) {
        let Some(active_client) = self.active_client.take() else {
            return;
        };

        match active_client.deactivate() {
            Ok((_client, _notifications, handler)) => {
                self.idle_engine = Some(handler.into_callback());
                info!("Audio stream stopped");
            }
            Err(e) => error!("Failed to deactivate JACK client: {e}"),
        }
    }

    pub const fn is_running(&self) -> bool {
        self.active_client.is_some()
    }

    pub const fn engine(&self) -> &EngineHandle {
        &self.engine_handle
    }

    pub fn peak(&self) -> PeakMeterInfo {
        self.engine_handle.peak()
    }

    pub const fn settings(&self) -> &AudioSettings {
        &self.settings
    }
}

impl Drop for StreamManager {
    fn drop(&mut self) {
        self.stop();
    }
}

fn connect_ports(active_client: &ActiveClient, settings: &AudioSettings) {
    let client = active_client.as_client();
    let name = client.name();

    for (port, destination) in [
        (LEFT_PORT, &settings.output_left_port),
        (RIGHT_PORT, &settings.output_right_port),
    ] {
        let source = format!("{name}:{port}");
        if let Err(e) = client.connect_ports_by_name(&source, destination) {
            warn!("Failed to connect output port '{destination}': {e}");
        } else {
            info!("Connected output: {source} -> {destination}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::WavDecoderFactory;

    fn manager() -> StreamManager {
        StreamManager::new(
            AudioSettings::default(),
            Arc::new(WavDecoderFactory::default()),
        )
    }

    #[test]
    fn new_manager_is_idle() {
        let stream = manager();
        assert!(!stream.is_running());
        assert_eq!(stream.settings().client_name, "kaosspad");
        assert_eq!(stream.peak().peak_linear, 0.0);
        assert!(!stream.engine().is_playing());
    }

    #[test]
    fn stop_without_start_keeps_engine() {
        let mut stream = manager();
        stream.stop();
        stream.stop();
        assert!(!stream.is_running());
        assert!(stream.idle_engine.is_some());
    }
}
