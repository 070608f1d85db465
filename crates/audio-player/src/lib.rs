//! Local file playback through cpal, exposed as a [`playback_types::PlaybackHandle`].

pub mod config;
pub mod decode;
pub mod device;
pub mod output;
pub mod queue;
pub mod resample;

mod player;
mod session;

pub use config::PlaybackConfig;
pub use player::LocalPlayer;
