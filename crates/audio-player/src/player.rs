//! `LocalPlayer`: a [`PlaybackHandle`] backed by the local output device.
//!
//! Callers talk to a worker thread over a command channel. Position, duration and
//! volume live in atomics so getters never wait on the worker.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use playback_types::{
    Listeners, PendingPlay, PlayCompleter, PlaybackError, PlaybackEvent, PlaybackEventKind,
    PlaybackHandle, SubscriptionId,
};

use crate::config::PlaybackConfig;
use crate::decode;
use crate::session::{Session, SessionEnd};

const WORKER_TICK: Duration = Duration::from_millis(50);

enum PlayerCommand {
    Load(PathBuf),
    Play(PlayCompleter),
    Pause,
    Seek(f64),
    Shutdown,
}

/// `f64` stored as bits in an atomic.
struct AtomicF64(AtomicU64);

impl AtomicF64 {
    fn new(value: f64) -> Self {
        Self(AtomicU64::new(value.to_bits()))
    }

    fn load(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Relaxed))
    }

    fn store(&self, value: f64) {
        self.0.store(value.to_bits(), Ordering::Relaxed);
    }
}

/// State visible to both the caller side and the worker.
struct Shared {
    listeners: Listeners,
    current_time: AtomicF64,
    duration: AtomicF64,
    /// Output gain as `f64` bits, read directly by the audio callback.
    volume: Arc<AtomicU64>,
}

impl Shared {
    fn emit(&self, event: PlaybackEvent) {
        self.listeners.emit(&event);
    }

    fn clamp_to_duration(&self, seconds: f64) -> f64 {
        let duration = self.duration.load();
        let upper = if duration.is_finite() { duration } else { f64::MAX };
        seconds.clamp(0.0, upper)
    }
}

pub struct LocalPlayer {
    shared: Arc<Shared>,
    cmd_tx: Sender<PlayerCommand>,
    join: Mutex<Option<JoinHandle<()>>>,
}

impl LocalPlayer {
    /// Spawn an idle player. Nothing plays until [`LocalPlayer::load`] names a file.
    pub fn new(config: PlaybackConfig) -> Result<Arc<Self>> {
        let shared = Arc::new(Shared {
            listeners: Listeners::new(),
            current_time: AtomicF64::new(0.0),
            duration: AtomicF64::new(f64::NAN),
            volume: Arc::new(AtomicU64::new(1.0f64.to_bits())),
        });
        let (cmd_tx, cmd_rx) = crossbeam_channel::unbounded();
        let worker = Worker::new(shared.clone(), config);
        let join = std::thread::Builder::new()
            .name("player".into())
            .spawn(move || worker.run(cmd_rx))
            .context("spawn player thread")?;
        Ok(Arc::new(Self {
            shared,
            cmd_tx,
            join: Mutex::new(Some(join)),
        }))
    }

    /// [`LocalPlayer::new`] followed by [`LocalPlayer::load`].
    pub fn open(path: impl AsRef<Path>, config: PlaybackConfig) -> Result<Arc<Self>> {
        let player = Self::new(config)?;
        player.load(path);
        Ok(player)
    }

    /// Probe `path` on the worker; emits `LoadedMetadata`, or `Error` when probing fails.
    pub fn load(&self, path: impl AsRef<Path>) {
        self.send(PlayerCommand::Load(path.as_ref().to_path_buf()));
    }

    fn send(&self, cmd: PlayerCommand) {
        if self.cmd_tx.send(cmd).is_err() {
            tracing::warn!("player worker is gone");
        }
    }
}

impl PlaybackHandle for LocalPlayer {
    fn play(&self) -> PendingPlay {
        let (completer, pending) = PendingPlay::channel();
        if let Err(err) = self.cmd_tx.send(PlayerCommand::Play(completer)) {
            if let PlayerCommand::Play(completer) = err.into_inner() {
                completer.complete(Err(PlaybackError::StartRejected(
                    "player worker is gone".into(),
                )));
            }
        }
        pending
    }

    fn pause(&self) {
        self.send(PlayerCommand::Pause);
    }

    fn current_time(&self) -> f64 {
        self.shared.current_time.load()
    }

    fn set_current_time(&self, seconds: f64) {
        if seconds.is_nan() {
            return;
        }
        let target = self.shared.clamp_to_duration(seconds);
        self.shared.current_time.store(target);
        self.send(PlayerCommand::Seek(target));
        self.shared.emit(PlaybackEvent::TimeUpdate {
            current_time: target,
        });
    }

    fn duration(&self) -> f64 {
        self.shared.duration.load()
    }

    fn volume(&self) -> f64 {
        f64::from_bits(self.shared.volume.load(Ordering::Relaxed))
    }

    fn set_volume(&self, volume: f64) {
        if volume.is_nan() {
            return;
        }
        self.shared
            .volume
            .store(volume.clamp(0.0, 1.0).to_bits(), Ordering::Relaxed);
    }

    fn subscribe(&self, kind: PlaybackEventKind) -> (SubscriptionId, Receiver<PlaybackEvent>) {
        self.shared.listeners.subscribe(kind)
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.shared.listeners.unsubscribe(id);
    }
}

impl Drop for LocalPlayer {
    fn drop(&mut self) {
        let _ = self.cmd_tx.send(PlayerCommand::Shutdown);
        let join = self.join.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(join) = join {
            if join.join().is_err() {
                tracing::error!("player thread panicked");
            }
        }
    }
}

struct Worker {
    shared: Arc<Shared>,
    config: PlaybackConfig,
    path: Option<PathBuf>,
    session: Option<Session>,
    /// Set after a natural end so the next play starts over.
    ended: bool,
    last_update: Instant,
}

impl Worker {
    fn new(shared: Arc<Shared>, config: PlaybackConfig) -> Self {
        Self {
            shared,
            config,
            path: None,
            session: None,
            ended: false,
            last_update: Instant::now(),
        }
    }

    fn run(mut self, cmd_rx: Receiver<PlayerCommand>) {
        loop {
            match cmd_rx.recv_timeout(WORKER_TICK) {
                Ok(PlayerCommand::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
                Ok(cmd) => self.handle(cmd),
                Err(RecvTimeoutError::Timeout) => {}
            }
            self.tick();
        }
        if let Some(session) = self.session.take() {
            session.stop();
        }
        tracing::debug!("player worker stopped");
    }

    fn handle(&mut self, cmd: PlayerCommand) {
        match cmd {
            PlayerCommand::Load(path) => self.load(path),
            PlayerCommand::Play(completer) => {
                let result = self.play();
                if let Err(err) = &result {
                    tracing::warn!("play rejected: {err}");
                }
                completer.complete(result);
            }
            PlayerCommand::Pause => {
                if let Some(session) = &self.session {
                    session.set_paused(true);
                    self.shared.current_time.store(self.position(session));
                    tracing::debug!("paused");
                }
            }
            PlayerCommand::Seek(target) => self.seek(target),
            PlayerCommand::Shutdown => {}
        }
    }

    fn load(&mut self, path: PathBuf) {
        if let Some(session) = self.session.take() {
            session.stop();
        }
        self.ended = false;
        self.shared.current_time.store(0.0);
        match decode::probe_track(&path) {
            Ok(info) => {
                let duration = info.duration_seconds.unwrap_or(f64::NAN);
                tracing::info!(
                    path = %path.display(),
                    duration,
                    codec = info.codec.as_deref().unwrap_or("unknown"),
                    rate_hz = info.sample_rate,
                    channels = info.channels,
                    "track loaded"
                );
                self.shared.duration.store(duration);
                self.path = Some(path);
                self.shared
                    .emit(PlaybackEvent::LoadedMetadata { duration });
            }
            Err(e) => {
                tracing::error!(path = %path.display(), "probe failed: {e:#}");
                self.shared.duration.store(f64::NAN);
                self.path = None;
                self.shared.emit(PlaybackEvent::Error {
                    message: format!("{e:#}"),
                });
            }
        }
    }

    fn play(&mut self) -> Result<(), PlaybackError> {
        if let Some(session) = &self.session {
            session.set_paused(false);
            self.last_update = Instant::now();
            return Ok(());
        }
        let Some(path) = self.path.clone() else {
            return Err(PlaybackError::StartRejected("no track loaded".into()));
        };
        let offset = if self.ended {
            0.0
        } else {
            self.shared.current_time.load()
        };
        let session = Session::start(&path, offset, false, &self.config, self.shared.volume.clone())
            .map_err(|e| PlaybackError::StartRejected(format!("{e:#}")))?;
        self.ended = false;
        self.session = Some(session);
        self.last_update = Instant::now();
        if offset == 0.0 {
            self.shared.current_time.store(0.0);
            self.shared
                .emit(PlaybackEvent::TimeUpdate { current_time: 0.0 });
        }
        Ok(())
    }

    fn seek(&mut self, target: f64) {
        self.ended = false;
        let Some(session) = self.session.take() else {
            return;
        };
        let paused = session.is_paused();
        session.stop();
        let Some(path) = self.path.clone() else {
            return;
        };
        match Session::start(&path, target, paused, &self.config, self.shared.volume.clone()) {
            Ok(session) => {
                tracing::debug!(target, paused, "session restarted at offset");
                self.session = Some(session);
            }
            Err(e) => {
                tracing::error!(target, "restart after seek failed: {e:#}");
                self.shared.emit(PlaybackEvent::Error {
                    message: format!("{e:#}"),
                });
            }
        }
    }

    fn tick(&mut self) {
        let Some(session) = &self.session else {
            return;
        };
        match session.try_end() {
            None => {}
            Some(SessionEnd::Drained) => {
                let duration = self.shared.duration.load();
                let end_time = if duration.is_finite() {
                    duration
                } else {
                    self.position(session)
                };
                self.session = None;
                self.ended = true;
                self.shared.current_time.store(end_time);
                self.shared.emit(PlaybackEvent::TimeUpdate {
                    current_time: end_time,
                });
                self.shared.emit(PlaybackEvent::Ended);
                tracing::info!("track ended");
                return;
            }
            Some(SessionEnd::Failed(message)) => {
                self.shared.current_time.store(self.position(session));
                self.session = None;
                self.shared.emit(PlaybackEvent::Error { message });
                return;
            }
            Some(SessionEnd::Cancelled) => {
                self.session = None;
                return;
            }
        }

        if session.is_paused() {
            return;
        }
        let position = self.position(session);
        self.shared.current_time.store(position);
        if self.last_update.elapsed() >= self.config.time_update_interval() {
            self.last_update = Instant::now();
            self.shared.emit(PlaybackEvent::TimeUpdate {
                current_time: position,
            });
        }
    }

    fn position(&self, session: &Session) -> f64 {
        self.shared.clamp_to_duration(session.position())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player() -> Arc<LocalPlayer> {
        LocalPlayer::new(PlaybackConfig::default()).unwrap()
    }

    #[test]
    fn starts_with_unknown_duration_and_full_volume() {
        let p = player();
        assert!(p.duration().is_nan());
        assert_eq!(p.current_time(), 0.0);
        assert_eq!(p.volume(), 1.0);
    }

    #[test]
    fn volume_is_clamped() {
        let p = player();
        p.set_volume(1.7);
        assert_eq!(p.volume(), 1.0);
        p.set_volume(-0.2);
        assert_eq!(p.volume(), 0.0);
        p.set_volume(f64::NAN);
        assert_eq!(p.volume(), 0.0);
        p.set_volume(0.37);
        assert_eq!(p.volume(), 0.37);
    }

    #[test]
    fn seek_without_duration_only_clamps_below_zero() {
        let p = player();
        let (_, rx) = p.subscribe(PlaybackEventKind::TimeUpdate);
        p.set_current_time(-4.0);
        p.set_current_time(42.0);
        assert_eq!(p.current_time(), 42.0);
        let times: Vec<_> = rx.try_iter().collect();
        assert_eq!(
            times,
            vec![
                PlaybackEvent::TimeUpdate { current_time: 0.0 },
                PlaybackEvent::TimeUpdate { current_time: 42.0 },
            ]
        );
    }

    #[test]
    fn seek_clamps_to_known_duration() {
        let p = player();
        p.shared.duration.store(30.0);
        p.set_current_time(99.0);
        assert_eq!(p.current_time(), 30.0);
    }

    #[test]
    fn play_without_track_is_rejected() {
        let p = player();
        let outcome = p.play().wait(Duration::from_secs(2));
        assert!(matches!(outcome, Some(Err(PlaybackError::StartRejected(_)))));
    }

    #[test]
    fn loading_a_missing_file_emits_error() {
        let p = player();
        let (_, rx) = p.subscribe(PlaybackEventKind::Error);
        p.load("/missing/track.flac");
        match rx.recv_timeout(Duration::from_secs(2)) {
            Ok(PlaybackEvent::Error { message }) => assert!(message.contains("/missing/track.flac")),
            other => panic!("unexpected: {other:?}"),
        }
        assert!(p.duration().is_nan());
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let p = player();
        let (id, rx) = p.subscribe(PlaybackEventKind::TimeUpdate);
        p.unsubscribe(id);
        p.set_current_time(1.0);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn drop_joins_worker() {
        let p = player();
        let (_, rx) = p.subscribe(PlaybackEventKind::Ended);
        drop(p);
        assert!(rx.recv_timeout(Duration::from_millis(500)).is_err());
    }
}
