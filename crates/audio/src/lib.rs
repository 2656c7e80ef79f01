//! Audio playback for SenseMusic players.
//!
//! The player agent only sees the [`AudioOutput`] trait; [`WavPlayer`] is
//! the implementation that decodes WAV files and plays them on a local
//! output device.

mod device;
mod player;
mod wav;

pub use device::{default_output_device, find_output_device, list_output_devices, OutputDevice};
pub use player::WavPlayer;
pub use wav::{decode_wav, DecodedTrack};

use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum PlaybackError {
    #[error("unsupported audio format: {0}")]
    UnsupportedFormat(String),
    #[error("output device unavailable: {0}")]
    DeviceUnavailable(String),
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, PlaybackError>;

/// Something that can play a track file.
pub trait AudioOutput: Send + Sync {
    /// Start playing `path`, replacing whatever is playing now.
    ///
    /// Returns once playback has started, not when it ends.
    fn play_track(&self, path: &Path) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = PlaybackError::Io {
            path: PathBuf::from("music/3.wav"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };
        assert_eq!(err.to_string(), "failed to read music/3.wav: gone");
        assert_eq!(
            PlaybackError::DeviceUnavailable("no default output device".into()).to_string(),
            "output device unavailable: no default output device"
        );
    }

    #[test]
    fn test_list_output_devices() {
        // Headless machines may have no audio host at all.
        if let Ok(devices) = list_output_devices() {
            assert!(devices.iter().filter(|d| d.is_default).count() <= 1);
        }
    }
}
