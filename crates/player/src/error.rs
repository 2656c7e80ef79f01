use sensemusic_audio::PlaybackError;
use sensemusic_events::QueryError;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AgentError>;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("invalid subscription query: {0}")]
    Query(#[from] QueryError),

    #[error("track pool is empty")]
    EmptyTrackPool,

    #[error("track index {index} is out of range for a pool of {len}")]
    InvalidTrackIndex { index: usize, len: usize },

    #[error("failed to play {}: {source}", track.display())]
    Playback {
        track: PathBuf,
        #[source]
        source: PlaybackError,
    },
}
