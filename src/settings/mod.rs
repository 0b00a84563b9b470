use anyhow::{Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::audio::engine::SAMPLE_RATE;
use crate::fx::EffectMode;

const APP_DIR: &str = "kaosspad";
const SETTINGS_FILENAME: &str = "settings.json";

impl std::fmt::Display for AudioSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Client Name: {}", self.client_name)?;
        writeln!(f, "Output Left Port: {}", self.output_left_port)?;
        writeln!(f, "Output Right Port: {}", self.output_right_port)?;
        writeln!(f, "Auto Connect: {}", self.auto_connect)?;
        writeln!(f, "Buffer Size: {}", self.buffer_size)?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioSettings {
    pub client_name: String,
    pub output_left_port: String,
    pub output_right_port: String,
    pub auto_connect: bool,
    pub buffer_size: u32,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            client_name: APP_DIR.to_string(),
            output_left_port: "system:playback_1".to_string(),
            output_right_port: "system:playback_2".to_string(),
            auto_connect: true,
            buffer_size: 256,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub audio: AudioSettings,
    /// Effect selected at startup.
    pub effect_mode: EffectMode,
}

impl std::fmt::Display for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "------------------------------")?;

        writeln!(f, "Audio Settings:")?;
        writeln!(f, "{}", self.audio)?;

        writeln!(f, "Effect Mode: {}", self.effect_mode)?;
        Ok(())
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            audio: AudioSettings::default(),
            effect_mode: EffectMode::Filter,
        }
    }
}

impl Settings {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::get_settings_path())
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_settings_path())
    }

    /// Read settings from `path`, writing defaults there if it doesn't exist.
    pub fn load_from(settings_path: &Path) -> Result<Self> {
        if settings_path.exists() {
            let contents =
                fs::read_to_string(settings_path).context("Failed to read settings file")?;
            let settings: Self =
                serde_json::from_str(&contents).context("Failed to parse settings")?;
            debug!("Loaded settings from {settings_path:?}");
            Ok(settings)
        } else {
            info!("No settings file found, using defaults");
            let settings = Self::default();
            // Try to save defaults, but don't fail if we can't
            let _ = settings.save_to(settings_path);
            Ok(settings)
        }
    }

    pub fn save_to(&self, settings_path: &Path) -> Result<()> {
        if let Some(parent) = settings_path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let json = serde_json::to_string_pretty(self).context("Failed to serialize settings")?;

        fs::write(settings_path, json).context("Failed to write settings file")?;

        debug!("Saved settings to {settings_path:?}");
        Ok(())
    }

    fn get_settings_path() -> PathBuf {
        if let Ok(config_dir) = std::env::var("XDG_CONFIG_HOME") {
            PathBuf::from(config_dir)
                .join(APP_DIR)
                .join(SETTINGS_FILENAME)
        } else if let Ok(home) = std::env::var("HOME") {
            PathBuf::from(home)
                .join(".config")
                .join(APP_DIR)
                .join(SETTINGS_FILENAME)
        } else {
            PathBuf::from(".").join(SETTINGS_FILENAME)
        }
    }

    /// PipeWire's JACK shim picks its quantum from the environment, so this
    /// must run before the first client is created.
    pub fn apply_to_environment(&self) {
        unsafe {
            std::env::set_var("PIPEWIRE_LATENCY", self.pipewire_latency());
            if std::env::var("JACK_PROMISCUOUS_SERVER").is_err() {
                std::env::set_var("JACK_PROMISCUOUS_SERVER", "pipewire");
            }
        }
    }

    fn pipewire_latency(&self) -> String {
        format!("{}/{}", self.audio.buffer_size, SAMPLE_RATE)
    }
}
