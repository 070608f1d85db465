use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// The `isPlaying` flag owned by the parent of a control view.
///
/// Clones share one flag: the parent keeps one clone and hands another to the view.
#[derive(Clone, Debug, Default)]
pub struct PlaybackIntent {
    flag: Arc<AtomicBool>,
}

impl PlaybackIntent {
    pub fn new(is_playing: bool) -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(is_playing)),
        }
    }

    pub fn is_playing(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    pub fn set_is_playing(&self, is_playing: bool) {
        self.flag.store(is_playing, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_flag() {
        let parent = PlaybackIntent::new(false);
        let child = parent.clone();
        child.set_is_playing(true);
        assert!(parent.is_playing());
    }
}
