use std::sync::{Arc, Weak};

use playback_types::{PendingPlay, PlaybackError, PlaybackEvent, PlaybackHandle};

use crate::intent::PlaybackIntent;
use crate::state::PlaybackViewState;
use crate::subscription::SubscriptionSet;

/// Display props for the track being controlled.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TrackProps {
    pub source_url: String,
    pub title: String,
    pub author: String,
}

/// Control surface state for one track, bound to an external playback handle.
///
/// The view never owns the handle. Every command goes through the handle's
/// trait methods and every state change comes from [`poll`](Self::poll) or one
/// of the `on_*` intent methods, all called from the host's UI thread.
///
/// `isPlaying` lives in a [`PlaybackIntent`] shared with the parent. The view
/// only writes it once the handle has confirmed the transition: a play request
/// sets it after the [`PendingPlay`] resolves successfully and reverts it if the
/// request is rejected.
pub struct PlaybackControlView {
    props: TrackProps,
    handle: Weak<dyn PlaybackHandle>,
    intent: PlaybackIntent,
    state: PlaybackViewState,
    subscriptions: SubscriptionSet,
    pending_play: Option<PendingPlay>,
    /// The pending play was started by a parent intent change rather than a toggle.
    play_from_intent: bool,
    /// Set by `Ended`; time updates are stale until a confirmed play or a user seek.
    ended: bool,
    /// Last intent value the view acted on; a mismatch means the parent changed it.
    acknowledged: bool,
    last_error: Option<String>,
}

impl PlaybackControlView {
    /// Subscribe to the handle and start tracking its state.
    pub fn mount(props: TrackProps, handle: Weak<dyn PlaybackHandle>, intent: PlaybackIntent) -> Self {
        let mut state = PlaybackViewState::default();
        let subscriptions = match handle.upgrade() {
            Some(h) => {
                let subs = SubscriptionSet::acquire_all(&h);
                let duration = h.duration();
                if !duration.is_nan() {
                    state.apply_duration(duration);
                    state.apply_time(h.current_time());
                }
                subs
            }
            None => {
                tracing::error!(source = %props.source_url, "playback handle is not available");
                SubscriptionSet::default()
            }
        };
        tracing::debug!(
            title = %props.title,
            source = %props.source_url,
            subscriptions = subscriptions.len(),
            "control view mounted"
        );
        Self {
            props,
            handle,
            intent,
            state,
            subscriptions,
            pending_play: None,
            play_from_intent: false,
            ended: false,
            acknowledged: false,
            last_error: None,
        }
    }

    /// Release every subscription. The handle itself is left untouched.
    pub fn unmount(mut self) {
        self.subscriptions.release();
        tracing::debug!(title = %self.props.title, "control view unmounted");
    }

    /// Apply queued notifications, settle a pending play, and follow parent intent changes.
    pub fn poll(&mut self) {
        for event in self.subscriptions.drain() {
            self.apply_event(event);
        }
        self.settle_pending_play();
        self.reconcile_intent();
    }

    pub fn on_play_pause_requested(&mut self) {
        if self.pending_play.is_some() {
            tracing::debug!("play request still pending; toggle ignored");
            return;
        }
        let Some(handle) = self.handle() else {
            return;
        };
        if self.intent.is_playing() {
            handle.pause();
            self.write_intent(false);
        } else {
            self.start_play(&handle, false);
        }
    }

    /// Seek to `fraction` (0..1) of the track. Ignored until the duration is known.
    pub fn on_seek_requested(&mut self, fraction: f64) {
        let Some(target) = self.state.seek_target(fraction) else {
            tracing::debug!(fraction, "seek ignored; duration unknown");
            return;
        };
        let Some(handle) = self.handle() else {
            return;
        };
        self.ended = false;
        handle.set_current_time(target);
    }

    /// Move the playhead by `delta_seconds`. The handle clamps the result.
    pub fn on_skip_requested(&mut self, delta_seconds: f64) {
        if !delta_seconds.is_finite() {
            return;
        }
        let Some(handle) = self.handle() else {
            return;
        };
        self.ended = false;
        handle.set_current_time(handle.current_time() + delta_seconds);
    }

    pub fn on_mute_toggle(&mut self) {
        let Some(handle) = self.handle() else {
            return;
        };
        if self.state.is_muted {
            handle.set_volume(self.state.volume);
            self.state.is_muted = false;
        } else {
            handle.set_volume(0.0);
            self.state.is_muted = true;
        }
    }

    pub fn on_volume_changed(&mut self, new_volume: f64) {
        if new_volume.is_nan() {
            return;
        }
        let Some(handle) = self.handle() else {
            return;
        };
        let volume = new_volume.clamp(0.0, 1.0);
        handle.set_volume(volume);
        self.state.volume = volume;
        self.state.is_muted = volume == 0.0;
    }

    pub fn props(&self) -> &TrackProps {
        &self.props
    }

    pub fn state(&self) -> &PlaybackViewState {
        &self.state
    }

    pub fn is_playing(&self) -> bool {
        self.intent.is_playing()
    }

    pub fn is_play_pending(&self) -> bool {
        self.pending_play.is_some()
    }

    /// Most recent non-fatal error, cleared by the next successful play.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }

    fn handle(&self) -> Option<Arc<dyn PlaybackHandle>> {
        let handle = self.handle.upgrade();
        if handle.is_none() {
            tracing::warn!("{}", PlaybackError::HandleAbsent);
        }
        handle
    }

    fn apply_event(&mut self, event: PlaybackEvent) {
        match event {
            PlaybackEvent::TimeUpdate { current_time } => {
                if self.ended {
                    tracing::trace!(current_time, "time update after end dropped");
                    return;
                }
                self.state.apply_time(current_time);
            }
            PlaybackEvent::LoadedMetadata { duration } => {
                tracing::debug!(duration, "metadata loaded");
                self.state.apply_duration(duration);
            }
            PlaybackEvent::Ended => {
                tracing::info!(title = %self.props.title, "playback ended");
                self.ended = true;
                self.state.mark_ended();
                self.write_intent(false);
            }
            PlaybackEvent::Error { message } => {
                let err = PlaybackError::Media(message);
                tracing::warn!(source = %self.props.source_url, "audio error: {err}");
                self.last_error = Some(err.to_string());
            }
        }
    }

    fn start_play(&mut self, handle: &Arc<dyn PlaybackHandle>, from_intent: bool) {
        self.play_from_intent = from_intent;
        self.pending_play = Some(handle.play());
        self.settle_pending_play();
    }

    fn settle_pending_play(&mut self) {
        let Some(outcome) = self.pending_play.as_ref().and_then(PendingPlay::try_outcome) else {
            return;
        };
        self.pending_play = None;
        match outcome {
            Ok(()) => {
                self.last_error = None;
                self.ended = false;
                if self.play_from_intent && !self.intent.is_playing() {
                    tracing::debug!("intent cleared while play was pending; pausing");
                    if let Some(handle) = self.handle() {
                        handle.pause();
                    }
                    self.write_intent(false);
                    return;
                }
                tracing::info!(title = %self.props.title, "playback started");
                self.write_intent(true);
            }
            Err(err) => {
                tracing::warn!("audio playback error: {err}");
                self.last_error = Some(err.to_string());
                self.write_intent(false);
            }
        }
    }

    fn reconcile_intent(&mut self) {
        if self.pending_play.is_some() {
            return;
        }
        let wanted = self.intent.is_playing();
        if wanted == self.acknowledged {
            return;
        }
        let Some(handle) = self.handle() else {
            self.write_intent(false);
            return;
        };
        if wanted {
            self.start_play(&handle, true);
        } else {
            handle.pause();
            self.acknowledged = false;
        }
    }

    fn write_intent(&mut self, is_playing: bool) {
        self.intent.set_is_playing(is_playing);
        self.acknowledged = is_playing;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::{FakeHandle, PlayScript};

    fn props() -> TrackProps {
        TrackProps {
            source_url: "/music/song.flac".to_string(),
            title: "Song".to_string(),
            author: "Band".to_string(),
        }
    }

    fn mount(fake: &Arc<FakeHandle>) -> (PlaybackControlView, PlaybackIntent) {
        let handle: Arc<dyn PlaybackHandle> = fake.clone();
        let parent = PlaybackIntent::new(false);
        let view = PlaybackControlView::mount(props(), Arc::downgrade(&handle), parent.clone());
        (view, parent)
    }

    #[test]
    fn mount_subscribes_once_per_notification() {
        let fake = FakeHandle::new();
        let (view, _) = mount(&fake);
        assert_eq!(view.subscription_count(), 4);
        assert_eq!(fake.listeners.len(), 4);
    }

    #[test]
    fn unmount_releases_subscriptions() {
        let fake = FakeHandle::new();
        let (view, _) = mount(&fake);
        view.unmount();
        assert!(fake.listeners.is_empty());
    }

    #[test]
    fn dropping_the_view_releases_subscriptions() {
        let fake = FakeHandle::new();
        let (view, _) = mount(&fake);
        fake.emit(PlaybackEvent::TimeUpdate { current_time: 3.0 });
        drop(view);
        assert!(fake.listeners.is_empty());
    }

    #[test]
    fn time_updates_drive_progress() {
        let fake = FakeHandle::new();
        let (mut view, _) = mount(&fake);
        fake.emit(PlaybackEvent::LoadedMetadata { duration: 200.0 });
        fake.emit(PlaybackEvent::TimeUpdate { current_time: 50.0 });
        view.poll();
        assert_eq!(view.state().duration_seconds, 200.0);
        assert_eq!(view.state().current_time_seconds, 50.0);
        assert_eq!(view.state().progress_percent, 25.0);
    }

    #[test]
    fn mount_picks_up_already_loaded_metadata() {
        let fake = FakeHandle::with_duration(120.0);
        fake.state.lock().unwrap().current_time = 30.0;
        let (view, _) = mount(&fake);
        assert_eq!(view.state().duration_seconds, 120.0);
        assert_eq!(view.state().progress_percent, 25.0);
    }

    #[test]
    fn play_success_sets_flag_after_confirmation() {
        let fake = FakeHandle::new();
        let (mut view, parent) = mount(&fake);
        view.on_play_pause_requested();
        assert!(parent.is_playing());
        assert_eq!(fake.state.lock().unwrap().play_calls, 1);
    }

    #[test]
    fn pending_play_does_not_flip_flag() {
        let fake = FakeHandle::new();
        fake.script(PlayScript::Hold);
        let (mut view, parent) = mount(&fake);

        view.on_play_pause_requested();
        assert!(view.is_play_pending());
        assert!(!parent.is_playing());

        view.on_play_pause_requested();
        assert_eq!(fake.state.lock().unwrap().play_calls, 1);

        fake.release_held(Ok(()));
        view.poll();
        assert!(!view.is_play_pending());
        assert!(parent.is_playing());
    }

    #[test]
    fn rejected_play_leaves_flag_false() {
        let fake = FakeHandle::new();
        fake.script(PlayScript::Reject("no output device".into()));
        let (mut view, parent) = mount(&fake);

        view.on_play_pause_requested();

        assert!(!parent.is_playing());
        assert!(!view.is_play_pending());
        assert_eq!(
            view.last_error(),
            Some("playback start rejected: no output device")
        );
    }

    #[test]
    fn late_rejection_reverts_flag() {
        let fake = FakeHandle::new();
        fake.script(PlayScript::Hold);
        let (mut view, parent) = mount(&fake);
        view.on_play_pause_requested();
        fake.release_held(Err(PlaybackError::StartRejected("codec".into())));
        view.poll();
        assert!(!parent.is_playing());
        assert!(view.last_error().is_some());
    }

    #[test]
    fn abandoned_play_is_a_rejection() {
        let fake = FakeHandle::new();
        fake.script(PlayScript::Hold);
        let (mut view, parent) = mount(&fake);
        view.on_play_pause_requested();
        fake.state.lock().unwrap().held.clear();
        view.poll();
        assert!(!parent.is_playing());
        assert_eq!(
            view.last_error(),
            Some("play request abandoned before completion")
        );
    }

    #[test]
    fn toggle_while_playing_pauses() {
        let fake = FakeHandle::new();
        let (mut view, parent) = mount(&fake);
        view.on_play_pause_requested();
        view.on_play_pause_requested();
        assert!(!parent.is_playing());
        assert_eq!(fake.state.lock().unwrap().pause_calls, 1);
    }

    #[test]
    fn ended_clears_flag_and_progress() {
        let fake = FakeHandle::new();
        let (mut view, parent) = mount(&fake);
        view.on_play_pause_requested();
        fake.emit(PlaybackEvent::LoadedMetadata { duration: 10.0 });
        fake.emit(PlaybackEvent::TimeUpdate { current_time: 10.0 });
        fake.emit(PlaybackEvent::Ended);
        view.poll();
        assert!(!parent.is_playing());
        assert_eq!(view.state().progress_percent, 0.0);
        assert_eq!(fake.state.lock().unwrap().pause_calls, 0);
    }

    #[test]
    fn time_update_queued_behind_ended_is_dropped() {
        let fake = FakeHandle::with_duration(10.0);
        let (mut view, _) = mount(&fake);
        view.on_play_pause_requested();
        fake.emit(PlaybackEvent::Ended);
        view.poll();
        fake.emit(PlaybackEvent::TimeUpdate { current_time: 10.0 });
        view.poll();
        assert_eq!(view.state().progress_percent, 0.0);

        view.on_play_pause_requested();
        fake.emit(PlaybackEvent::TimeUpdate { current_time: 2.0 });
        view.poll();
        assert_eq!(view.state().current_time_seconds, 2.0);
        assert_eq!(view.state().progress_percent, 20.0);
    }

    #[test]
    fn seek_after_end_moves_progress() {
        let fake = FakeHandle::with_duration(10.0);
        let (mut view, _) = mount(&fake);
        fake.emit(PlaybackEvent::Ended);
        view.poll();
        view.on_seek_requested(0.5);
        view.poll();
        assert_eq!(view.state().progress_percent, 50.0);

        fake.emit(PlaybackEvent::Ended);
        view.poll();
        view.on_skip_requested(-1.0);
        view.poll();
        assert_eq!(view.state().current_time_seconds, 4.0);
    }

    #[test]
    fn media_error_is_surfaced_without_state_change() {
        let fake = FakeHandle::with_duration(10.0);
        let (mut view, parent) = mount(&fake);
        view.on_play_pause_requested();
        let before = view.state().clone();
        fake.emit(PlaybackEvent::Error {
            message: "decode failed".into(),
        });
        view.poll();
        assert!(parent.is_playing());
        assert_eq!(view.state(), &before);
        assert_eq!(view.last_error(), Some("media error: decode failed"));
    }

    #[test]
    fn seek_writes_fraction_of_duration() {
        let fake = FakeHandle::with_duration(200.0);
        let (mut view, _) = mount(&fake);
        view.on_seek_requested(0.5);
        assert_eq!(fake.state.lock().unwrap().writes, vec![100.0]);
    }

    #[test]
    fn seek_without_duration_is_noop() {
        let fake = FakeHandle::new();
        let (mut view, _) = mount(&fake);
        view.on_seek_requested(0.5);
        assert!(fake.state.lock().unwrap().writes.is_empty());
    }

    #[test]
    fn skip_back_never_goes_negative() {
        let fake = FakeHandle::with_duration(100.0);
        fake.state.lock().unwrap().current_time = 5.0;
        let (mut view, _) = mount(&fake);
        view.on_skip_requested(-10.0);
        view.poll();
        assert_eq!(fake.current_time(), 0.0);
        assert!(view.state().current_time_seconds >= 0.0);
    }

    #[test]
    fn skip_forward_adds_delta() {
        let fake = FakeHandle::with_duration(100.0);
        fake.state.lock().unwrap().current_time = 20.0;
        let (mut view, _) = mount(&fake);
        view.on_skip_requested(10.0);
        assert_eq!(fake.current_time(), 30.0);
    }

    #[test]
    fn mute_twice_restores_exact_volume() {
        let fake = FakeHandle::new();
        let (mut view, _) = mount(&fake);
        view.on_volume_changed(0.37);

        view.on_mute_toggle();
        assert!(view.state().is_muted);
        assert_eq!(fake.volume(), 0.0);
        assert_eq!(view.state().volume, 0.37);

        view.on_mute_toggle();
        assert!(!view.state().is_muted);
        assert_eq!(fake.volume(), 0.37);
    }

    #[test]
    fn volume_change_sets_mute_flag_at_zero() {
        let fake = FakeHandle::new();
        let (mut view, _) = mount(&fake);
        view.on_volume_changed(0.0);
        assert!(view.state().is_muted);
        view.on_volume_changed(1.7);
        assert!(!view.state().is_muted);
        assert_eq!(view.state().volume, 1.0);
        assert_eq!(fake.volume(), 1.0);
    }

    #[test]
    fn parent_intent_starts_and_stops_playback() {
        let fake = FakeHandle::new();
        let (mut view, parent) = mount(&fake);

        parent.set_is_playing(true);
        view.poll();
        assert_eq!(fake.state.lock().unwrap().play_calls, 1);
        assert!(parent.is_playing());

        parent.set_is_playing(false);
        view.poll();
        assert_eq!(fake.state.lock().unwrap().pause_calls, 1);

        view.poll();
        assert_eq!(fake.state.lock().unwrap().pause_calls, 1);
    }

    #[test]
    fn parent_clearing_intent_during_pending_play_pauses() {
        let fake = FakeHandle::new();
        fake.script(PlayScript::Hold);
        let (mut view, parent) = mount(&fake);

        parent.set_is_playing(true);
        view.poll();
        parent.set_is_playing(false);
        view.poll();
        assert!(view.is_play_pending());

        fake.release_held(Ok(()));
        view.poll();
        view.poll();
        assert!(!parent.is_playing());
        let state = fake.state.lock().unwrap();
        assert_eq!(state.play_calls, 1);
        assert_eq!(state.pause_calls, 1);
    }

    #[test]
    fn parent_intent_rejected_reverts_flag() {
        let fake = FakeHandle::new();
        fake.script(PlayScript::Reject("busy".into()));
        let (mut view, parent) = mount(&fake);
        parent.set_is_playing(true);
        view.poll();
        assert!(!parent.is_playing());
        view.poll();
        assert_eq!(fake.state.lock().unwrap().play_calls, 1);
    }

    #[test]
    fn absent_handle_makes_intents_noops() {
        let fake = FakeHandle::with_duration(10.0);
        let (mut view, parent) = mount(&fake);
        drop(fake);

        view.on_play_pause_requested();
        view.on_seek_requested(0.5);
        view.on_skip_requested(5.0);
        view.on_mute_toggle();
        view.on_volume_changed(0.2);
        view.poll();

        assert!(!parent.is_playing());
        assert!(!view.state().is_muted);
        assert_eq!(view.state().volume, 1.0);
    }

    #[test]
    fn mount_without_handle_has_no_subscriptions() {
        let handle: Weak<dyn PlaybackHandle> = {
            let fake: Arc<dyn PlaybackHandle> = FakeHandle::new();
            Arc::downgrade(&fake)
        };
        let view = PlaybackControlView::mount(props(), handle, PlaybackIntent::default());
        assert_eq!(view.subscription_count(), 0);
    }
}
