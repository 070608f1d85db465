//! One playback run of a file from a start offset.
//!
//! The session thread owns the cpal stream (not `Send` on every host), wires
//! decode, optional resample and output, then waits for drain or cancel.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use cpal::traits::StreamTrait;
use crossbeam_channel::{Receiver, Sender, TryRecvError};

use crate::config::PlaybackConfig;
use crate::output::{self, OutputControls};
use crate::queue::SampleQueue;
use crate::{decode, device, resample};

/// How a session thread finished.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum SessionEnd {
    /// All audio reached the device.
    Drained,
    Cancelled,
    Failed(String),
}

pub(crate) struct Session {
    start_offset: f64,
    out_rate: Arc<AtomicU64>,
    paused: Arc<AtomicBool>,
    cancel: Arc<AtomicBool>,
    played_frames: Arc<AtomicU64>,
    end_rx: Receiver<SessionEnd>,
    join: Option<JoinHandle<()>>,
}

impl Session {
    /// Start playing `path` at `offset` seconds; returns once audio is flowing or setup failed.
    pub(crate) fn start(
        path: &Path,
        offset: f64,
        paused: bool,
        config: &PlaybackConfig,
        gain: Arc<AtomicU64>,
    ) -> Result<Self> {
        let paused = Arc::new(AtomicBool::new(paused));
        let cancel = Arc::new(AtomicBool::new(false));
        let played_frames = Arc::new(AtomicU64::new(0));
        let out_rate = Arc::new(AtomicU64::new(0));
        let (ready_tx, ready_rx) = crossbeam_channel::bounded::<Result<()>>(1);
        let (end_tx, end_rx) = crossbeam_channel::bounded(1);

        let run = SessionRun {
            path: path.to_path_buf(),
            offset,
            config: config.clone(),
            controls: OutputControls {
                refill_max_frames: config.refill_max_frames,
                paused: paused.clone(),
                played_frames: played_frames.clone(),
                gain,
            },
            cancel: cancel.clone(),
            out_rate: out_rate.clone(),
        };
        let join = thread::Builder::new()
            .name("session".into())
            .spawn(move || run.execute(ready_tx, end_tx))
            .context("spawn session thread")?;

        let mut session = Self {
            start_offset: offset,
            out_rate,
            paused,
            cancel,
            played_frames,
            end_rx,
            join: Some(join),
        };
        match ready_rx.recv() {
            Ok(Ok(())) => Ok(session),
            Ok(Err(e)) => {
                session.join_thread();
                Err(e)
            }
            Err(_) => {
                session.join_thread();
                Err(anyhow!("session thread exited during setup"))
            }
        }
    }

    /// Seconds into the track, from the start offset plus frames the device consumed.
    pub(crate) fn position(&self) -> f64 {
        position_seconds(
            self.start_offset,
            self.played_frames.load(Ordering::Relaxed),
            self.out_rate.load(Ordering::Relaxed),
        )
    }

    pub(crate) fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Relaxed)
    }

    pub(crate) fn set_paused(&self, paused: bool) {
        self.paused.store(paused, Ordering::Relaxed);
    }

    /// Non-blocking check for the session thread's outcome.
    pub(crate) fn try_end(&self) -> Option<SessionEnd> {
        match self.end_rx.try_recv() {
            Ok(end) => Some(end),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(SessionEnd::Cancelled),
        }
    }

    /// Cancel and join.
    pub(crate) fn stop(mut self) {
        self.cancel.store(true, Ordering::Relaxed);
        self.join_thread();
    }

    fn join_thread(&mut self) {
        if let Some(join) = self.join.take() {
            if join.join().is_err() {
                tracing::error!("session thread panicked");
            }
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.cancel.store(true, Ordering::Relaxed);
        self.join_thread();
    }
}

/// Live pipeline pieces owned by the session thread.
struct Wired {
    _stream: cpal::Stream,
    srcq: Arc<SampleQueue>,
    dstq: Arc<SampleQueue>,
    failure: Arc<Mutex<Option<String>>>,
}

struct SessionRun {
    path: PathBuf,
    offset: f64,
    config: PlaybackConfig,
    controls: OutputControls,
    cancel: Arc<AtomicBool>,
    out_rate: Arc<AtomicU64>,
}

impl SessionRun {
    fn execute(self, ready_tx: Sender<Result<()>>, end_tx: Sender<SessionEnd>) {
        let wired = match self.open() {
            Ok(wired) => wired,
            Err(e) => {
                let _ = ready_tx.send(Err(e));
                return;
            }
        };
        let _ = ready_tx.send(Ok(()));

        let end = if wired.dstq.wait_drained_or_cancel(&self.cancel) {
            // let the device play out its last buffer
            thread::sleep(Duration::from_millis(100));
            match wired.failure.lock().unwrap().take() {
                Some(msg) => SessionEnd::Failed(msg),
                None => SessionEnd::Drained,
            }
        } else {
            self.controls.paused.store(true, Ordering::Relaxed);
            wired.srcq.close();
            wired.dstq.close();
            SessionEnd::Cancelled
        };
        drop(wired);
        tracing::debug!(?end, "session finished");
        let _ = end_tx.send(end);
    }

    fn open(&self) -> Result<Wired> {
        let decoded = decode::start_decode_at(&self.path, self.config.buffer_seconds, self.offset)?;
        match self.open_output(&decoded) {
            Ok((stream, dstq)) => Ok(Wired {
                _stream: stream,
                srcq: decoded.queue,
                dstq,
                failure: decoded.failure,
            }),
            Err(e) => {
                decoded.queue.close();
                Err(e)
            }
        }
    }

    fn open_output(
        &self,
        decoded: &decode::DecodeStream,
    ) -> Result<(cpal::Stream, Arc<SampleQueue>)> {
        let host = cpal::default_host();
        let device = device::pick_device(&host, self.config.device.as_deref())?;
        let supported = device::pick_output_config(&device, Some(decoded.spec.rate))?;
        let mut stream_config: cpal::StreamConfig = supported.config();
        if let Some(size) = device::pick_buffer_size(&supported) {
            stream_config.buffer_size = size;
        }
        let dst_rate = stream_config.sample_rate;
        self.out_rate.store(u64::from(dst_rate), Ordering::Relaxed);

        let dstq = if decoded.spec.rate == dst_rate {
            tracing::info!(rate_hz = dst_rate, "resample skipped");
            decoded.queue.clone()
        } else {
            resample::start_resampler(
                decoded.queue.clone(),
                decoded.spec.rate,
                dst_rate,
                self.config.chunk_frames,
                self.config.buffer_seconds,
            )?
        };

        let stream = output::build_output_stream(
            &device,
            &stream_config,
            supported.sample_format(),
            &dstq,
            self.controls.clone(),
        )?;
        stream.play().context("start output stream")?;
        tracing::info!(
            offset = self.offset,
            channels = stream_config.channels,
            rate_hz = dst_rate,
            "session started"
        );
        Ok((stream, dstq))
    }
}

fn position_seconds(start_offset: f64, played_frames: u64, out_rate: u64) -> f64 {
    if out_rate == 0 {
        return start_offset;
    }
    start_offset + played_frames as f64 / out_rate as f64
}
