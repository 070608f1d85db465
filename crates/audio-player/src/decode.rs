//! File probing and background decoding via Symphonia.

use std::fs::File;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::thread;

use anyhow::{Context, Result, anyhow};
use symphonia::core::audio::{SampleBuffer, SignalSpec};
use symphonia::core::codecs::{CodecParameters, Decoder, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader, SeekMode, SeekTo};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::units::Time;

use crate::queue::{SampleQueue, capacity_for};

/// What probing a file tells us before any audio is decoded.
#[derive(Clone, Debug)]
pub struct TrackInfo {
    /// Seconds, when the container reports a frame count.
    pub duration_seconds: Option<f64>,
    pub codec: Option<String>,
    pub sample_rate: u32,
    pub channels: usize,
}

/// A running decode: samples at `spec.rate` arrive in `queue` until it closes.
pub struct DecodeStream {
    pub spec: SignalSpec,
    pub queue: Arc<SampleQueue>,
    /// Set when decoding stopped on an error rather than end of stream.
    pub failure: Arc<Mutex<Option<String>>>,
}

struct OpenedTrack {
    format: Box<dyn FormatReader>,
    track_id: u32,
    params: CodecParameters,
}

pub fn probe_track(path: &Path) -> Result<TrackInfo> {
    let opened = open_track(path)?;
    let params = &opened.params;
    Ok(TrackInfo {
        duration_seconds: duration_seconds(params),
        codec: codec_name(params).map(str::to_string),
        sample_rate: params.sample_rate.ok_or_else(|| anyhow!("unknown sample rate"))?,
        channels: params
            .channels
            .ok_or_else(|| anyhow!("unknown channel layout"))?
            .count(),
    })
}

/// Start a decoder thread reading `path` from `offset_seconds`.
///
/// The decoder is created before the thread starts, so unsupported codecs fail here.
pub fn start_decode_at(path: &Path, buffer_seconds: f32, offset_seconds: f64) -> Result<DecodeStream> {
    let mut opened = open_track(path)?;

    if let Some(time) = seek_time(offset_seconds) {
        if let Err(e) = opened.format.seek(
            SeekMode::Accurate,
            SeekTo::Time {
                time,
                track_id: Some(opened.track_id),
            },
        ) {
            tracing::warn!(offset_seconds, "seek failed, decoding from start: {e}");
        }
    }

    let rate = opened
        .params
        .sample_rate
        .ok_or_else(|| anyhow!("unknown sample rate"))?;
    let layout = opened
        .params
        .channels
        .ok_or_else(|| anyhow!("unknown channel layout"))?;
    let spec = SignalSpec::new(rate, layout);

    let decoder = symphonia::default::get_codecs()
        .make(&opened.params, &DecoderOptions::default())
        .context("create decoder")?;

    let queue = Arc::new(SampleQueue::new(
        layout.count(),
        capacity_for(rate, layout.count(), buffer_seconds),
    ));
    let failure = Arc::new(Mutex::new(None));

    let thread_queue = queue.clone();
    let thread_failure = failure.clone();
    thread::Builder::new()
        .name("decode".into())
        .spawn(move || {
            if let Err(e) = decode_loop(opened, decoder, &thread_queue) {
                tracing::error!("decoder stopped: {e:#}");
                *thread_failure.lock().unwrap() = Some(format!("{e:#}"));
            }
            thread_queue.close();
        })
        .context("spawn decode thread")?;

    Ok(DecodeStream {
        spec,
        queue,
        failure,
    })
}

fn open_track(path: &Path) -> Result<OpenedTrack> {
    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            MediaSourceStream::new(Box::new(file), Default::default()),
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .with_context(|| format!("probe {}", path.display()))?;

    let format = probed.format;
    let track = format
        .default_track()
        .ok_or_else(|| anyhow!("no default audio track"))?;
    let track_id = track.id;
    let params = track.codec_params.clone();
    Ok(OpenedTrack {
        format,
        track_id,
        params,
    })
}

fn decode_loop(
    mut opened: OpenedTrack,
    mut decoder: Box<dyn Decoder>,
    queue: &SampleQueue,
) -> Result<()> {
    loop {
        if queue.is_closed() {
            return Ok(());
        }
        let packet = match opened.format.next_packet() {
            Ok(p) => p,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                return Ok(());
            }
            Err(e) => return Err(e).context("read packet"),
        };
        if packet.track_id() != opened.track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(SymphoniaError::DecodeError(msg)) => {
                tracing::debug!("skipping undecodable packet: {msg}");
                continue;
            }
            Err(e) => return Err(e).context("decode packet"),
        };

        let mut samples = SampleBuffer::<f32>::new(decoded.capacity() as u64, *decoded.spec());
        samples.copy_interleaved_ref(decoded);
        queue.push_blocking(samples.samples());
    }
}

/// Symphonia seek target; `None` for non-positive or non-finite offsets.
fn seek_time(offset_seconds: f64) -> Option<Time> {
    if !offset_seconds.is_finite() || offset_seconds <= 0.0 {
        return None;
    }
    let whole = offset_seconds.trunc();
    Some(Time::new(whole as u64, offset_seconds - whole))
}

fn duration_seconds(params: &CodecParameters) -> Option<f64> {
    let frames = params.n_frames?;
    let rate = params.sample_rate?;
    (rate > 0).then(|| frames as f64 / f64::from(rate))
}

fn codec_name(params: &CodecParameters) -> Option<&'static str> {
    use symphonia::core::codecs::*;
    Some(match params.codec {
        CODEC_TYPE_FLAC => "FLAC",
        CODEC_TYPE_MP3 => "MP3",
        CODEC_TYPE_AAC => "AAC",
        CODEC_TYPE_ALAC => "ALAC",
        CODEC_TYPE_VORBIS => "VORBIS",
        CODEC_TYPE_PCM_S16LE | CODEC_TYPE_PCM_S16BE => "PCM_S16",
        CODEC_TYPE_PCM_S24LE | CODEC_TYPE_PCM_S24BE => "PCM_S24",
        CODEC_TYPE_PCM_S32LE | CODEC_TYPE_PCM_S32BE => "PCM_S32",
        CODEC_TYPE_PCM_F32LE | CODEC_TYPE_PCM_F32BE => "PCM_F32",
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use symphonia::core::codecs::{CODEC_TYPE_FLAC, CODEC_TYPE_PCM_S16LE};

    #[test]
    fn seek_time_splits_whole_and_fraction() {
        let t = seek_time(61.25).unwrap();
        assert_eq!(t.seconds, 61);
        assert!((t.frac - 0.25).abs() < 1e-9);
    }

    #[test]
    fn seek_time_skips_start_and_garbage() {
        assert!(seek_time(0.0).is_none());
        assert!(seek_time(-3.0).is_none());
        assert!(seek_time(f64::NAN).is_none());
    }

    #[test]
    fn duration_from_frames_and_rate() {
        let mut params = CodecParameters::new();
        params.sample_rate = Some(48_000);
        params.n_frames = Some(72_000);
        assert_eq!(duration_seconds(&params), Some(1.5));
    }

    #[test]
    fn duration_unknown_without_rate() {
        let mut params = CodecParameters::new();
        params.n_frames = Some(100);
        assert_eq!(duration_seconds(&params), None);
        params.sample_rate = Some(0);
        assert_eq!(duration_seconds(&params), None);
    }

    #[test]
    fn codec_names() {
        let mut params = CodecParameters::new();
        assert_eq!(codec_name(&params), None);
        params.codec = CODEC_TYPE_FLAC;
        assert_eq!(codec_name(&params), Some("FLAC"));
        params.codec = CODEC_TYPE_PCM_S16LE;
        assert_eq!(codec_name(&params), Some("PCM_S16"));
    }

    #[test]
    fn probing_a_missing_file_fails_with_path() {
        let err = probe_track(Path::new("/definitely/not/here.flac")).unwrap_err();
        assert!(format!("{err:#}").contains("/definitely/not/here.flac"));
    }
}
