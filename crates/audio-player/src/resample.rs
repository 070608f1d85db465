//! Sample-rate conversion stage between decode and output.

use std::sync::Arc;
use std::thread;

use anyhow::{Context, Result, anyhow};
use audioadapter_buffers::direct::InterleavedSlice;
use rubato::{
    Async, FixedAsync, Indexing, Resampler, SincInterpolationParameters, SincInterpolationType,
    WindowFunction, calculate_cutoff,
};

use crate::queue::{PopStrategy, SampleQueue, capacity_for};

/// Sinc resampler with a reusable interleaved output buffer.
struct ChunkResampler {
    inner: Async<f32>,
    channels: usize,
    out: Vec<f32>,
    indexing: Indexing,
}

impl ChunkResampler {
    fn new(ratio: f64, chunk_frames: usize, channels: usize) -> Result<Self> {
        let sinc_len = 128;
        let window = WindowFunction::BlackmanHarris2;
        let params = SincInterpolationParameters {
            sinc_len,
            f_cutoff: calculate_cutoff(sinc_len, window),
            interpolation: SincInterpolationType::Cubic,
            oversampling_factor: 256,
            window,
        };
        let inner = Async::<f32>::new_sinc(
            ratio,
            1.1,
            &params,
            chunk_frames,
            channels,
            FixedAsync::Input,
        )
        .map_err(|e| anyhow!("resampler init: {e}"))?;
        let out_frames = inner.output_frames_max();
        Ok(Self {
            inner,
            channels,
            out: vec![0.0; out_frames * channels],
            indexing: Indexing {
                input_offset: 0,
                output_offset: 0,
                active_channels_mask: None,
                partial_len: None,
            },
        })
    }

    /// Resample one chunk. `partial` marks a short final chunk.
    fn process(&mut self, input: &[f32], partial: Option<usize>) -> Result<&[f32]> {
        let in_frames = input.len() / self.channels;
        let input = InterleavedSlice::new(input, self.channels, in_frames)
            .map_err(|e| anyhow!("input adapter: {e}"))?;
        let out_frames = self.out.len() / self.channels;
        let mut output = InterleavedSlice::new_mut(&mut self.out, self.channels, out_frames)
            .map_err(|e| anyhow!("output adapter: {e}"))?;

        self.indexing.partial_len = partial;
        let (_, produced) = self
            .inner
            .process_into_buffer(&input, &mut output, Some(&self.indexing))
            .map_err(|e| anyhow!("resample: {e}"))?;
        Ok(&self.out[..produced * self.channels])
    }
}

/// Spawn a thread converting `src` from `src_rate` to `dst_rate`.
///
/// The returned queue closes once `src` is closed and its tail has been flushed.
pub fn start_resampler(
    src: Arc<SampleQueue>,
    src_rate: u32,
    dst_rate: u32,
    chunk_frames: usize,
    buffer_seconds: f32,
) -> Result<Arc<SampleQueue>> {
    let channels = src.channels();
    let chunk_frames = chunk_frames.max(1);
    let dst = Arc::new(SampleQueue::new(
        channels,
        capacity_for(dst_rate, channels, buffer_seconds),
    ));
    let mut resampler = ChunkResampler::new(
        f64::from(dst_rate) / f64::from(src_rate),
        chunk_frames,
        channels,
    )?;

    let out = dst.clone();
    thread::Builder::new()
        .name("resample".into())
        .spawn(move || {
            if let Err(e) = run(&mut resampler, &src, &out, chunk_frames) {
                tracing::error!("resampler stopped: {e:#}");
                src.close();
            }
            out.close();
        })
        .context("spawn resample thread")?;

    tracing::info!(src_rate, dst_rate, "resampling");
    Ok(dst)
}

fn run(
    resampler: &mut ChunkResampler,
    src: &SampleQueue,
    dst: &SampleQueue,
    chunk_frames: usize,
) -> Result<()> {
    while let Some(chunk) = src.pop(PopStrategy::BlockingExact {
        frames: chunk_frames,
    }) {
        dst.push_blocking(resampler.process(&chunk, None)?);
    }
    while let Some(tail) = src.pop(PopStrategy::BlockingUpTo {
        max_frames: chunk_frames,
    }) {
        let frames = tail.len() / src.channels();
        let mut padded = tail;
        padded.resize(chunk_frames * src.channels(), 0.0);
        dst.push_blocking(resampler.process(&padded, Some(frames))?);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doubling_rate_roughly_doubles_frames() {
        let src = Arc::new(SampleQueue::new(2, 1 << 16));
        src.push_blocking(&vec![0.25; 2 * 4096]);
        src.close();

        let dst = start_resampler(src, 22_050, 44_100, 1024, 1.0).unwrap();
        let mut frames = 0;
        while let Some(chunk) = dst.pop(PopStrategy::BlockingUpTo { max_frames: 4096 }) {
            frames += chunk.len() / 2;
        }
        assert!(frames > 7000 && frames < 9000, "got {frames} frames");
    }
}
