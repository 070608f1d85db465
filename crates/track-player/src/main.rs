//! `track-player`: play one audio file with a terminal control surface.
//!
//! Space plays/pauses, ←/→ skip, m mutes, +/- change volume, 0-9 jump to tenths,
//! a click on the seek bar seeks, l shows logs, q quits.

mod config;
mod logging;
mod ui;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use playback_view::TrackProps;

use crate::config::{FileConfig, Overrides, Settings};

const VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("GIT_SHA"),
    ", ",
    env!("BUILD_DATE"),
    ")"
);

#[derive(Parser, Debug)]
#[command(name = "track-player", version = VERSION)]
struct Args {
    /// Audio file to play.
    #[arg(required_unless_present = "list_devices")]
    path: Option<PathBuf>,

    /// Title shown in the header (defaults to the file name).
    #[arg(long)]
    title: Option<String>,

    /// Artist shown under the title.
    #[arg(long)]
    author: Option<String>,

    /// Output device name substring.
    #[arg(long)]
    device: Option<String>,

    /// TOML config with [player] and [controls] tables.
    #[arg(long)]
    config: Option<PathBuf>,

    /// List output devices and exit.
    #[arg(long)]
    list_devices: bool,

    /// Start playing as soon as the UI is up.
    #[arg(long)]
    autoplay: bool,

    /// Initial volume, 0.0 to 1.0.
    #[arg(long)]
    volume: Option<f64>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    if args.list_devices {
        for (i, name) in audio_player::device::list_output_devices()?.iter().enumerate() {
            println!("#{i}: {name}");
        }
        return Ok(());
    }

    let log_rx = logging::init();

    let file = match args.config.as_deref() {
        Some(path) => FileConfig::load(path)?,
        None => FileConfig::default(),
    };
    let settings = Settings::resolve(
        file,
        Overrides {
            device: args.device.clone(),
            volume: args.volume,
        },
    );

    let path = args.path.context("missing audio file path")?;
    let props = track_props(&path, args.title, args.author);
    tracing::info!(path = %path.display(), title = %props.title, "starting");

    ui::run_tui(ui::Launch {
        path,
        props,
        settings,
        autoplay: args.autoplay,
        log_rx,
    })
}

fn track_props(path: &std::path::Path, title: Option<String>, author: Option<String>) -> TrackProps {
    let title = title.unwrap_or_else(|| {
        path.file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string())
    });
    TrackProps {
        source_url: path.display().to_string(),
        title,
        author: author.unwrap_or_else(|| "Unknown artist".to_string()),
    }
}
