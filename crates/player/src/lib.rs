//! Player side of SenseMusic.
//!
//! A [`PlayerAgent`] runs on one device (laptop, PC or phone), subscribes
//! to the context events addressed to that device and plays a track from
//! its [`TrackPool`] when one arrives.

mod agent;
mod config;
mod error;
mod tracks;

pub use agent::{role_query, role_query_text, PlayerAgent};
pub use config::{PlayerConfig, DEFAULT_TRACK_COUNT, DEFAULT_TRACK_DIR, DEFAULT_TRACK_EXTENSION};
pub use error::{AgentError, Result};
pub use tracks::{FixedTrackSelector, RandomTrackSelector, TrackPool, TrackSelector};
