//! cpal output stream fed from a [`SampleQueue`].
//!
//! The callback never blocks: it refills a local frame buffer with a non-blocking pop,
//! maps channels, applies gain and converts to the device sample format. Underruns and
//! pause both produce silence; pause leaves the queue untouched.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use anyhow::{Result, anyhow};
use cpal::traits::DeviceTrait;

use crate::queue::{PopStrategy, SampleQueue};

/// Shared state the callback reads or updates.
#[derive(Clone)]
pub struct OutputControls {
    pub refill_max_frames: usize,
    pub paused: Arc<AtomicBool>,
    /// Incremented by the number of source frames written to the device.
    pub played_frames: Arc<AtomicU64>,
    /// Linear gain stored as `f64` bits.
    pub gain: Arc<AtomicU64>,
}

pub fn build_output_stream(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    sample_format: cpal::SampleFormat,
    queue: &Arc<SampleQueue>,
    controls: OutputControls,
) -> Result<cpal::Stream> {
    match sample_format {
        cpal::SampleFormat::F32 => build_stream::<f32>(device, config, queue, controls),
        cpal::SampleFormat::I16 => build_stream::<i16>(device, config, queue, controls),
        cpal::SampleFormat::I32 => build_stream::<i32>(device, config, queue, controls),
        cpal::SampleFormat::U16 => build_stream::<u16>(device, config, queue, controls),
        other => Err(anyhow!("unsupported sample format: {other:?}")),
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    queue: &Arc<SampleQueue>,
    controls: OutputControls,
) -> Result<cpal::Stream>
where
    T: cpal::Sample + cpal::SizedSample + cpal::FromSample<f32> + Send + 'static,
{
    let dst_channels = usize::from(config.channels).max(1);
    let refill = controls.refill_max_frames.max(1);
    let queue = queue.clone();
    let mut cursor = FrameCursor::new(queue.channels());
    let silence = <T as cpal::Sample>::from_sample::<f32>(0.0);

    let stream = device.build_output_stream(
        config,
        move |data: &mut [T], _| {
            if controls.paused.load(Ordering::Relaxed) {
                data.fill(silence);
                return;
            }
            let gain = f64::from_bits(controls.gain.load(Ordering::Relaxed)) as f32;
            let mut written = 0u64;

            for frame in data.chunks_mut(dst_channels) {
                if cursor.is_empty() {
                    match queue.pop(PopStrategy::NonBlocking { max_frames: refill }) {
                        Some(samples) => cursor.refill(samples),
                        None => {
                            frame.fill(silence);
                            continue;
                        }
                    }
                }
                for (ch, out) in frame.iter_mut().enumerate() {
                    *out = <T as cpal::Sample>::from_sample::<f32>(
                        cursor.sample_for(dst_channels, ch) * gain,
                    );
                }
                cursor.advance();
                written += 1;
            }

            if written > 0 {
                controls.played_frames.fetch_add(written, Ordering::Relaxed);
            }
        },
        |err| tracing::warn!("output stream error: {err}"),
        None,
    )?;

    Ok(stream)
}

/// Read position into a buffer of interleaved source frames.
struct FrameCursor {
    src_channels: usize,
    samples: Vec<f32>,
    pos: usize,
}

impl FrameCursor {
    fn new(src_channels: usize) -> Self {
        Self {
            src_channels: src_channels.max(1),
            samples: Vec::new(),
            pos: 0,
        }
    }

    fn is_empty(&self) -> bool {
        self.pos + self.src_channels > self.samples.len()
    }

    fn refill(&mut self, samples: Vec<f32>) {
        self.samples = samples;
        self.pos = 0;
    }

    fn advance(&mut self) {
        self.pos += self.src_channels;
    }

    /// Current frame's sample for output channel `dst_ch`.
    ///
    /// Mono is duplicated, stereo folds to mono by averaging, and other layouts map
    /// channel-for-channel with the last source channel repeated.
    fn sample_for(&self, dst_channels: usize, dst_ch: usize) -> f32 {
        let frame = &self.samples[self.pos..self.pos + self.src_channels];
        match (self.src_channels, dst_channels) {
            (2, 1) => 0.5 * (frame[0] + frame[1]),
            (src, _) => frame[dst_ch.min(src - 1)],
        }
    }
}
