use crate::format::format_elapsed;

/// Transient UI state of a mounted control view.
///
/// `volume` is the last user-chosen volume. Muting does not overwrite it, so
/// unmuting restores it exactly; `is_muted` is therefore not derived from it.
#[derive(Clone, Debug, PartialEq)]
pub struct PlaybackViewState {
    /// Elapsed share of the track, 0..100. Zero while the duration is unknown.
    pub progress_percent: f64,
    pub current_time_seconds: f64,
    /// `NaN` until the handle reports metadata.
    pub duration_seconds: f64,
    pub volume: f64,
    pub is_muted: bool,
}

impl Default for PlaybackViewState {
    fn default() -> Self {
        Self {
            progress_percent: 0.0,
            current_time_seconds: 0.0,
            duration_seconds: f64::NAN,
            volume: 1.0,
            is_muted: false,
        }
    }
}

impl PlaybackViewState {
    pub fn duration_known(&self) -> bool {
        self.duration_seconds.is_finite()
    }

    pub fn elapsed_label(&self) -> String {
        format_elapsed(self.current_time_seconds)
    }

    pub fn duration_label(&self) -> String {
        format_elapsed(self.duration_seconds)
    }

    /// Handle position for a click at `fraction` of the seek bar.
    pub fn seek_target(&self, fraction: f64) -> Option<f64> {
        if fraction.is_nan() || !self.duration_known() {
            return None;
        }
        Some(fraction.clamp(0.0, 1.0) * self.duration_seconds)
    }

    pub(crate) fn apply_time(&mut self, current_time: f64) {
        if !current_time.is_finite() {
            return;
        }
        self.current_time_seconds = current_time;
        self.recompute_progress();
    }

    pub(crate) fn apply_duration(&mut self, duration: f64) {
        self.duration_seconds = duration;
        self.recompute_progress();
    }

    pub(crate) fn mark_ended(&mut self) {
        self.progress_percent = 0.0;
    }

    fn recompute_progress(&mut self) {
        let d = self.duration_seconds;
        self.progress_percent = if d.is_finite() && d > 0.0 {
            self.current_time_seconds / d * 100.0
        } else {
            0.0
        };
    }
}
