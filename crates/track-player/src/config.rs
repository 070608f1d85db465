//! Optional TOML config, merged with command-line overrides.

use std::path::Path;

use anyhow::{Context, Result};
use audio_player::PlaybackConfig;
use serde::Deserialize;

/// File layout: optional `[player]` and `[controls]` tables.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub player: Option<PlayerSection>,
    pub controls: Option<ControlsSection>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlayerSection {
    /// Output device name substring.
    pub device: Option<String>,
    pub buffer_seconds: Option<f32>,
    pub chunk_frames: Option<usize>,
    pub refill_max_frames: Option<usize>,
    pub time_update_interval_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ControlsSection {
    pub skip_seconds: Option<f64>,
    pub volume_step: Option<f64>,
    pub initial_volume: Option<f64>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("parse config {}", path.display()))
    }
}

/// Keyboard step sizes and the starting volume.
#[derive(Clone, Debug, PartialEq)]
pub struct ControlSettings {
    pub skip_seconds: f64,
    pub volume_step: f64,
    pub initial_volume: f64,
}

impl Default for ControlSettings {
    fn default() -> Self {
        Self {
            skip_seconds: 10.0,
            volume_step: 0.1,
            initial_volume: 1.0,
        }
    }
}

/// Values given on the command line; `Some` wins over the file.
#[derive(Debug, Default)]
pub struct Overrides {
    pub device: Option<String>,
    pub volume: Option<f64>,
}

#[derive(Debug)]
pub struct Settings {
    pub playback: PlaybackConfig,
    pub controls: ControlSettings,
}

impl Settings {
    pub fn resolve(file: FileConfig, overrides: Overrides) -> Self {
        let mut playback = PlaybackConfig::default();
        if let Some(p) = file.player {
            playback.device = p.device;
            if let Some(v) = p.buffer_seconds {
                playback.buffer_seconds = v;
            }
            if let Some(v) = p.chunk_frames {
                playback.chunk_frames = v;
            }
            if let Some(v) = p.refill_max_frames {
                playback.refill_max_frames = v;
            }
            if let Some(v) = p.time_update_interval_ms {
                playback.time_update_interval_ms = v;
            }
        }

        let mut controls = ControlSettings::default();
        if let Some(c) = file.controls {
            controls.skip_seconds = c.skip_seconds.unwrap_or(controls.skip_seconds);
            controls.volume_step = c.volume_step.unwrap_or(controls.volume_step);
            controls.initial_volume = c.initial_volume.unwrap_or(controls.initial_volume);
        }

        if overrides.device.is_some() {
            playback.device = overrides.device;
        }
        if let Some(v) = overrides.volume {
            controls.initial_volume = v;
        }
        controls.initial_volume = controls.initial_volume.clamp(0.0, 1.0);
        Self { playback, controls }
    }
}
