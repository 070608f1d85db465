//! Contract between a playback control surface and the media primitive it drives.
//!
//! The primitive (a [`PlaybackHandle`]) owns decoding and output. Control surfaces
//! only command it and listen to the notifications it emits.

mod listeners;
mod pending;

use crossbeam_channel::Receiver;

pub use listeners::Listeners;
pub use pending::{PendingPlay, PlayCompleter, PlayResult};

/// Notification categories a handle can emit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PlaybackEventKind {
    /// Playback position moved (periodic while playing, and after seeks).
    TimeUpdate,
    /// Track duration became known.
    LoadedMetadata,
    /// Playback reached the end of the track.
    Ended,
    /// Media runtime error (decode, device, stream).
    Error,
}

impl PlaybackEventKind {
    pub const ALL: [PlaybackEventKind; 4] = [
        PlaybackEventKind::LoadedMetadata,
        PlaybackEventKind::TimeUpdate,
        PlaybackEventKind::Ended,
        PlaybackEventKind::Error,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PlaybackEventKind::TimeUpdate => "timeupdate",
            PlaybackEventKind::LoadedMetadata => "loadedmetadata",
            PlaybackEventKind::Ended => "ended",
            PlaybackEventKind::Error => "error",
        }
    }
}

/// Notification payload delivered to subscribers.
#[derive(Clone, Debug, PartialEq)]
pub enum PlaybackEvent {
    TimeUpdate { current_time: f64 },
    LoadedMetadata { duration: f64 },
    Ended,
    Error { message: String },
}

impl PlaybackEvent {
    pub fn kind(&self) -> PlaybackEventKind {
        match self {
            PlaybackEvent::TimeUpdate { .. } => PlaybackEventKind::TimeUpdate,
            PlaybackEvent::LoadedMetadata { .. } => PlaybackEventKind::LoadedMetadata,
            PlaybackEvent::Ended => PlaybackEventKind::Ended,
            PlaybackEvent::Error { .. } => PlaybackEventKind::Error,
        }
    }
}

/// Identifier returned by [`PlaybackHandle::subscribe`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// Errors surfaced to playback control surfaces.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum PlaybackError {
    #[error("playback handle is not available")]
    HandleAbsent,
    #[error("playback start rejected: {0}")]
    StartRejected(String),
    #[error("media error: {0}")]
    Media(String),
    #[error("play request abandoned before completion")]
    Abandoned,
}

/// A media-element-like playback primitive.
///
/// Times are seconds. `duration()` is `NaN` until metadata has loaded.
/// Implementations clamp `set_current_time` into `[0, duration]` and
/// `set_volume` into `[0, 1]`.
pub trait PlaybackHandle: Send + Sync {
    /// Start or resume playback. Completes asynchronously.
    fn play(&self) -> PendingPlay;
    fn pause(&self);
    fn current_time(&self) -> f64;
    fn set_current_time(&self, seconds: f64);
    fn duration(&self) -> f64;
    fn volume(&self) -> f64;
    fn set_volume(&self, volume: f64);
    /// Register a listener for one notification kind.
    fn subscribe(&self, kind: PlaybackEventKind) -> (SubscriptionId, Receiver<PlaybackEvent>);
    fn unsubscribe(&self, id: SubscriptionId);
}
