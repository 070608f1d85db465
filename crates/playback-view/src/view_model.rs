//! Render-ready strings for the control surface.
//!
//! Converts a [`PlaybackControlView`] into labels so `render.rs` stays layout-focused.

use crate::view::PlaybackControlView;

const VOLUME_STEPS: usize = 10;

pub struct ControlsView {
    pub title: String,
    pub author: String,
    pub play_label: &'static str,
    /// Seek bar fill, 0..1.
    pub seek_ratio: f64,
    pub elapsed: String,
    pub total: String,
    pub skip_back: String,
    pub skip_forward: String,
    pub mute_label: &'static str,
    pub volume_meter: String,
    pub status: String,
    pub has_error: bool,
}

impl ControlsView {
    /// `skip_seconds` is the amount the host's skip controls move the playhead.
    pub fn from_view(view: &PlaybackControlView, skip_seconds: f64) -> Self {
        let state = view.state();
        let props = view.props();
        let play_label = if view.is_play_pending() {
            "…"
        } else if view.is_playing() {
            "⏸"
        } else {
            "▶"
        };
        let seek_ratio = if state.progress_percent.is_finite() {
            (state.progress_percent / 100.0).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let (status, has_error) = match view.last_error() {
            Some(err) => (format!("error: {err}"), true),
            None => (props.source_url.clone(), false),
        };
        Self {
            title: fallback(&props.title, "Untitled"),
            author: fallback(&props.author, "-"),
            play_label,
            seek_ratio,
            elapsed: state.elapsed_label(),
            total: state.duration_label(),
            skip_back: skip_label('-', skip_seconds),
            skip_forward: skip_label('+', skip_seconds),
            mute_label: if state.is_muted { "🔇" } else { "🔊" },
            volume_meter: volume_meter(state.volume),
            status,
            has_error,
        }
    }
}

fn fallback(value: &str, default: &str) -> String {
    if value.trim().is_empty() {
        default.to_string()
    } else {
        value.to_string()
    }
}

fn skip_label(sign: char, seconds: f64) -> String {
    let seconds = if seconds.is_finite() { seconds.abs() } else { 0.0 };
    if seconds.fract() == 0.0 {
        format!("{sign}{seconds:.0}s")
    } else {
        format!("{sign}{seconds}s")
    }
}

pub(crate) fn volume_meter(volume: f64) -> String {
    let filled = if volume.is_finite() {
        (volume.clamp(0.0, 1.0) * VOLUME_STEPS as f64).round() as usize
    } else {
        0
    };
    format!(
        "[{}{}]",
        "#".repeat(filled),
        "-".repeat(VOLUME_STEPS - filled)
    )
}
