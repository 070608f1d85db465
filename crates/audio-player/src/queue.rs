//! Bounded queue of interleaved `f32` samples shared between pipeline stages.
//!
//! Decode and resample threads push with back-pressure; the output callback
//! drains without blocking. `close()` ends the stream for every waiter.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::Duration;

pub struct SampleQueue {
    channels: usize,
    capacity_samples: usize,
    inner: Mutex<QueueInner>,
    changed: Condvar,
}

struct QueueInner {
    samples: VecDeque<f32>,
    closed: bool,
}

/// How a consumer takes frames off the queue.
#[derive(Clone, Copy, Debug)]
pub enum PopStrategy {
    /// Wait for exactly `frames`; `None` if the queue closes first.
    BlockingExact { frames: usize },
    /// Wait for at least one frame, take up to `max_frames`.
    BlockingUpTo { max_frames: usize },
    /// Take up to `max_frames` of what is buffered right now.
    NonBlocking { max_frames: usize },
}

/// Queue capacity in samples for `seconds` of audio; bad durations fall back to 2s.
pub fn capacity_for(rate_hz: u32, channels: usize, seconds: f32) -> usize {
    let secs = if seconds.is_finite() && seconds > 0.0 {
        seconds
    } else {
        2.0
    };
    let frames = (rate_hz as f32 * secs).ceil() as usize;
    frames.saturating_mul(channels).max(channels)
}

impl SampleQueue {
    pub fn new(channels: usize, capacity_samples: usize) -> Self {
        let channels = channels.max(1);
        Self {
            channels,
            capacity_samples: capacity_samples.max(channels),
            inner: Mutex::new(QueueInner {
                samples: VecDeque::new(),
                closed: false,
            }),
            changed: Condvar::new(),
        }
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn buffered_frames(&self) -> usize {
        self.lock().samples.len() / self.channels
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Mark end of stream. Idempotent.
    pub fn close(&self) {
        self.lock().closed = true;
        self.changed.notify_all();
    }

    /// Push samples, waiting for room. Remaining samples are dropped if the queue closes.
    pub fn push_blocking(&self, samples: &[f32]) {
        let mut rest = samples;
        while !rest.is_empty() {
            let mut g = self.lock();
            while g.samples.len() >= self.capacity_samples && !g.closed {
                g = self.wait(g);
            }
            if g.closed {
                return;
            }
            let room = self.capacity_samples - g.samples.len();
            let (now, later) = rest.split_at(room.min(rest.len()));
            g.samples.extend(now.iter().copied());
            rest = later;
            drop(g);
            self.changed.notify_all();
        }
    }

    /// Pop whole frames. `None` means nothing could be returned under `strategy`.
    pub fn pop(&self, strategy: PopStrategy) -> Option<Vec<f32>> {
        let mut g = self.lock();
        let take_frames = match strategy {
            PopStrategy::BlockingExact { frames } => {
                let want = frames * self.channels;
                while g.samples.len() < want && !g.closed {
                    g = self.wait(g);
                }
                if g.samples.len() < want {
                    return None;
                }
                frames
            }
            PopStrategy::BlockingUpTo { max_frames } => {
                while g.samples.len() < self.channels && !g.closed {
                    g = self.wait(g);
                }
                (g.samples.len() / self.channels).min(max_frames)
            }
            PopStrategy::NonBlocking { max_frames } => {
                (g.samples.len() / self.channels).min(max_frames)
            }
        };
        if take_frames == 0 {
            return None;
        }
        let out: Vec<f32> = g.samples.drain(..take_frames * self.channels).collect();
        drop(g);
        self.changed.notify_all();
        Some(out)
    }

    /// Block until the queue is closed and drained (`true`) or `cancel` is raised (`false`).
    pub fn wait_drained_or_cancel(&self, cancel: &AtomicBool) -> bool {
        let mut g = self.lock();
        loop {
            if cancel.load(Ordering::Relaxed) {
                return false;
            }
            if g.closed && g.samples.is_empty() {
                return true;
            }
            g = self
                .changed
                .wait_timeout(g, Duration::from_millis(50))
                .unwrap()
                .0;
        }
    }

    fn lock(&self) -> MutexGuard<'_, QueueInner> {
        self.inner.lock().unwrap()
    }

    fn wait<'a>(&self, g: MutexGuard<'a, QueueInner>) -> MutexGuard<'a, QueueInner> {
        self.changed.wait(g).unwrap()
    }
}
