use crate::tracks::TrackPool;
use sensemusic_events::DeviceRole;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_TRACK_DIR: &str = "music";
pub const DEFAULT_TRACK_COUNT: usize = 19;
pub const DEFAULT_TRACK_EXTENSION: &str = "wav";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Device this player runs on.
    pub role: DeviceRole,
    pub track_dir: PathBuf,
    pub track_count: usize,
    pub track_extension: String,
    /// Output device name; the host default when unset.
    pub output_device: Option<String>,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            role: DeviceRole::Laptop,
            track_dir: PathBuf::from(DEFAULT_TRACK_DIR),
            track_count: DEFAULT_TRACK_COUNT,
            track_extension: DEFAULT_TRACK_EXTENSION.to_string(),
            output_device: None,
        }
    }
}

impl PlayerConfig {
    pub fn track_pool(&self) -> TrackPool {
        TrackPool::new(&self.track_dir, self.track_count, &self.track_extension)
    }
}
