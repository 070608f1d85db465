//! Playback control surface for a single track.
//!
//! [`PlaybackControlView`] keeps a small UI state in sync with an external
//! [`PlaybackHandle`](playback_types::PlaybackHandle) and forwards user intents to it.
//! [`render`] draws the surface with ratatui.

mod format;
mod intent;
mod state;
mod subscription;
mod view;

pub mod render;
pub mod view_model;

#[cfg(test)]
pub(crate) mod fake;

pub use format::format_elapsed;
pub use intent::PlaybackIntent;
pub use state::PlaybackViewState;
pub use subscription::{Subscription, SubscriptionSet};
pub use view::{PlaybackControlView, TrackProps};
