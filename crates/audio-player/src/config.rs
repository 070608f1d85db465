/// Tuning for the local playback pipeline and its event cadence.
#[derive(Clone, Debug)]
pub struct PlaybackConfig {
    /// Decoder/resampler chunk size in frames.
    pub chunk_frames: usize,
    /// Max frames pulled per output callback refill.
    pub refill_max_frames: usize,
    /// Target buffer duration for queue sizing.
    pub buffer_seconds: f32,
    /// Spacing of `TimeUpdate` notifications while playing.
    pub time_update_interval_ms: u64,
    /// Output device substring; `None` uses the host default.
    pub device: Option<String>,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            chunk_frames: 1024,
            refill_max_frames: 4096,
            buffer_seconds: 2.0,
            time_update_interval_ms: 250,
            device: None,
        }
    }
}

impl PlaybackConfig {
    pub(crate) fn time_update_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.time_update_interval_ms.max(10))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_has_a_floor() {
        let cfg = PlaybackConfig {
            time_update_interval_ms: 0,
            ..PlaybackConfig::default()
        };
        assert_eq!(cfg.time_update_interval().as_millis(), 10);
        assert_eq!(PlaybackConfig::default().time_update_interval().as_millis(), 250);
    }
}
