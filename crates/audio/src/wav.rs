//! WAV decoding into normalized interleaved f32 samples.

use crate::PlaybackError;
use hound::{SampleFormat, WavReader};
use std::path::Path;

/// A whole track held in memory.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedTrack {
    /// Interleaved samples in [-1.0, 1.0].
    pub samples: Vec<f32>,
    pub channels: u16,
    pub sample_rate: u32,
}

impl DecodedTrack {
    pub fn frames(&self) -> usize {
        self.samples.len() / usize::from(self.channels.max(1))
    }

    pub fn duration_secs(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f32 / self.sample_rate as f32
    }
}

fn map_hound_error(path: &Path, err: hound::Error) -> PlaybackError {
    match err {
        hound::Error::IoError(source) => PlaybackError::Io {
            path: path.to_path_buf(),
            source,
        },
        other => PlaybackError::UnsupportedFormat(format!("{}: {}", path.display(), other)),
    }
}

/// Decode a WAV file. Integer PCM up to 32 bits and 32-bit float are supported.
pub fn decode_wav(path: &Path) -> crate::Result<DecodedTrack> {
    let reader = WavReader::open(path).map_err(|e| map_hound_error(path, e))?;
    let spec = reader.spec();

    if spec.channels == 0 || spec.sample_rate == 0 {
        return Err(PlaybackError::UnsupportedFormat(format!(
            "{}: {} channels at {} Hz",
            path.display(),
            spec.channels,
            spec.sample_rate
        )));
    }

    let samples = match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Float, 32) => reader
            .into_samples::<f32>()
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| map_hound_error(path, e))?,
        (SampleFormat::Int, bits @ 1..=32) => {
            let scale = (1u64 << (bits - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| map_hound_error(path, e))?
        }
        (format, bits) => {
            return Err(PlaybackError::UnsupportedFormat(format!(
                "{}: {:?} samples of {} bits",
                path.display(),
                format,
                bits
            )));
        }
    };

    tracing::debug!(
        path = %path.display(),
        channels = spec.channels,
        sample_rate = spec.sample_rate,
        samples = samples.len(),
        "Decoded track"
    );

    Ok(DecodedTrack {
        samples,
        channels: spec.channels,
        sample_rate: spec.sample_rate,
    })
}
