//! In-memory playback handle for tests.

use std::sync::{Arc, Mutex};

use crossbeam_channel::Receiver;
use playback_types::{
    Listeners, PendingPlay, PlayCompleter, PlaybackError, PlaybackEvent, PlaybackEventKind,
    PlaybackHandle, SubscriptionId,
};

#[derive(Clone, Debug)]
pub(crate) enum PlayScript {
    Succeed,
    Reject(String),
    /// Keep the request open until the test completes it.
    Hold,
}

pub(crate) struct FakeState {
    pub(crate) current_time: f64,
    pub(crate) duration: f64,
    pub(crate) volume: f64,
    pub(crate) play_calls: usize,
    pub(crate) pause_calls: usize,
    pub(crate) script: PlayScript,
    pub(crate) held: Vec<PlayCompleter>,
    pub(crate) writes: Vec<f64>,
}

pub(crate) struct FakeHandle {
    pub(crate) listeners: Listeners,
    pub(crate) state: Mutex<FakeState>,
}

impl FakeHandle {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            listeners: Listeners::new(),
            state: Mutex::new(FakeState {
                current_time: 0.0,
                duration: f64::NAN,
                volume: 1.0,
                play_calls: 0,
                pause_calls: 0,
                script: PlayScript::Succeed,
                held: Vec::new(),
                writes: Vec::new(),
            }),
        })
    }

    pub(crate) fn with_duration(duration: f64) -> Arc<Self> {
        let fake = Self::new();
        fake.state.lock().unwrap().duration = duration;
        fake
    }

    pub(crate) fn script(&self, script: PlayScript) {
        self.state.lock().unwrap().script = script;
    }

    pub(crate) fn release_held(&self, result: Result<(), PlaybackError>) {
        let held: Vec<_> = self.state.lock().unwrap().held.drain(..).collect();
        for completer in held {
            completer.complete(result.clone());
        }
    }

    pub(crate) fn emit(&self, event: PlaybackEvent) {
        self.listeners.emit(&event);
    }
}

impl PlaybackHandle for FakeHandle {
    fn play(&self) -> PendingPlay {
        let mut st = self.state.lock().unwrap();
        st.play_calls += 1;
        match st.script.clone() {
            PlayScript::Succeed => PendingPlay::resolved(Ok(())),
            PlayScript::Reject(msg) => PendingPlay::resolved(Err(PlaybackError::StartRejected(msg))),
            PlayScript::Hold => {
                let (completer, pending) = PendingPlay::channel();
                st.held.push(completer);
                pending
            }
        }
    }

    fn pause(&self) {
        self.state.lock().unwrap().pause_calls += 1;
    }

    fn current_time(&self) -> f64 {
        self.state.lock().unwrap().current_time
    }

    fn set_current_time(&self, seconds: f64) {
        let mut st = self.state.lock().unwrap();
        let upper = if st.duration.is_finite() { st.duration } else { f64::MAX };
        let clamped = seconds.clamp(0.0, upper);
        st.current_time = clamped;
        st.writes.push(clamped);
        drop(st);
        self.listeners.emit(&PlaybackEvent::TimeUpdate {
            current_time: clamped,
        });
    }

    fn duration(&self) -> f64 {
        self.state.lock().unwrap().duration
    }

    fn volume(&self) -> f64 {
        self.state.lock().unwrap().volume
    }

    fn set_volume(&self, volume: f64) {
        self.state.lock().unwrap().volume = volume.clamp(0.0, 1.0);
    }

    fn subscribe(&self, kind: PlaybackEventKind) -> (SubscriptionId, Receiver<PlaybackEvent>) {
        self.listeners.subscribe(kind)
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.listeners.unsubscribe(id);
    }
}
