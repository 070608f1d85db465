use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError, bounded};

use crate::PlaybackError;

/// Outcome of a play request.
pub type PlayResult = Result<(), PlaybackError>;

/// Completion side of a play request, held by the handle implementation.
pub struct PlayCompleter {
    tx: Sender<PlayResult>,
}

impl PlayCompleter {
    /// Resolve the request. A caller that already gave up is ignored.
    pub fn complete(self, result: PlayResult) {
        let _ = self.tx.send(result);
    }
}

/// A play request that has not been confirmed yet.
///
/// Dropping the [`PlayCompleter`] without completing resolves the request as
/// [`PlaybackError::Abandoned`].
#[derive(Debug)]
pub struct PendingPlay {
    rx: Receiver<PlayResult>,
}

impl PendingPlay {
    pub fn channel() -> (PlayCompleter, PendingPlay) {
        let (tx, rx) = bounded(1);
        (PlayCompleter { tx }, PendingPlay { rx })
    }

    /// A request whose outcome is already known.
    pub fn resolved(result: PlayResult) -> Self {
        let (completer, pending) = Self::channel();
        completer.complete(result);
        pending
    }

    /// Non-blocking check. `None` while the handle is still working on it.
    pub fn try_outcome(&self) -> Option<PlayResult> {
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(PlaybackError::Abandoned)),
        }
    }

    /// Block up to `timeout` for the outcome.
    pub fn wait(&self, timeout: Duration) -> Option<PlayResult> {
        match self.rx.recv_timeout(timeout) {
            Ok(result) => Some(result),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => Some(Err(PlaybackError::Abandoned)),
        }
    }
}
