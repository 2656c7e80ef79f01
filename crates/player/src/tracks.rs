//! Track pool and selection strategies.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::{Path, PathBuf};

/// Fixed set of numbered track files: `<dir>/<i>.<extension>` for
/// `0 <= i < count`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackPool {
    dir: PathBuf,
    count: usize,
    extension: String,
}

impl TrackPool {
    pub fn new(dir: impl Into<PathBuf>, count: usize, extension: impl Into<String>) -> Self {
        let extension = extension.into();
        Self {
            dir: dir.into(),
            count,
            extension: extension.trim_start_matches('.').to_string(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Path of track `index`, or `None` past the end of the pool.
    pub fn path(&self, index: usize) -> Option<PathBuf> {
        (index < self.count).then(|| self.dir.join(format!("{}.{}", index, self.extension)))
    }

    pub fn paths(&self) -> impl Iterator<Item = PathBuf> + '_ {
        (0..self.count).filter_map(|i| self.path(i))
    }

    /// Tracks that do not exist on disk.
    pub fn missing(&self) -> Vec<PathBuf> {
        self.paths().filter(|p| !p.is_file()).collect()
    }
}

/// Strategy choosing which track of a pool to play next.
pub trait TrackSelector: Send {
    /// Index in `0..pool_len`, or `None` for an empty pool.
    fn select(&mut self, pool_len: usize) -> Option<usize>;
}

/// Uniformly random choice.
pub struct RandomTrackSelector {
    rng: StdRng,
}

impl RandomTrackSelector {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Reproducible sequence of choices.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomTrackSelector {
    fn default() -> Self {
        Self::new()
    }
}

impl TrackSelector for RandomTrackSelector {
    fn select(&mut self, pool_len: usize) -> Option<usize> {
        (pool_len > 0).then(|| self.rng.gen_range(0..pool_len))
    }
}

/// Replays a fixed list of indices in a loop.
#[derive(Debug, Clone)]
pub struct FixedTrackSelector {
    indices: Vec<usize>,
    next: usize,
}

impl FixedTrackSelector {
    pub fn new(index: usize) -> Self {
        Self::cycle(vec![index])
    }

    pub fn cycle(indices: Vec<usize>) -> Self {
        Self { indices, next: 0 }
    }
}

impl TrackSelector for FixedTrackSelector {
    fn select(&mut self, pool_len: usize) -> Option<usize> {
        if pool_len == 0 || self.indices.is_empty() {
            return None;
        }
        let index = self.indices[self.next % self.indices.len()];
        self.next += 1;
        Some(index % pool_len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_paths() {
        let pool = TrackPool::new("music", 19, "wav");
        assert_eq!(pool.len(), 19);
        assert_eq!(pool.path(0), Some(PathBuf::from("music/0.wav")));
        assert_eq!(pool.path(18), Some(PathBuf::from("music/18.wav")));
        assert_eq!(pool.path(19), None);
        assert_eq!(pool.paths().count(), 19);
    }

    #[test]
    fn test_extension_dot_is_optional() {
        let pool = TrackPool::new("/srv/tracks", 2, ".flac");
        assert_eq!(pool.path(1), Some(PathBuf::from("/srv/tracks/1.flac")));
    }

    #[test]
    fn test_missing_tracks() {
        let pool = TrackPool::new("/definitely/not/here", 3, "wav");
        assert_eq!(pool.missing().len(), 3);
        assert!(TrackPool::new("music", 0, "wav").missing().is_empty());
    }

    #[test]
    fn test_random_stays_in_range() {
        let mut selector = RandomTrackSelector::new();
        for _ in 0..500 {
            let index = selector.select(19).unwrap();
            assert!(index < 19);
        }
        assert_eq!(selector.select(0), None);
        assert_eq!(selector.select(1), Some(0));
    }

    #[test]
    fn test_seeded_random_is_reproducible() {
        let mut a = RandomTrackSelector::with_seed(7);
        let mut b = RandomTrackSelector::with_seed(7);
        let first: Vec<_> = (0..10).map(|_| a.select(19)).collect();
        let second: Vec<_> = (0..10).map(|_| b.select(19)).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_fixed_cycles() {
        let mut selector = FixedTrackSelector::cycle(vec![3, 20, 5]);
        assert_eq!(selector.select(19), Some(3));
        assert_eq!(selector.select(19), Some(1));
        assert_eq!(selector.select(19), Some(5));
        assert_eq!(selector.select(19), Some(3));
        assert_eq!(selector.select(0), None);
        assert_eq!(FixedTrackSelector::cycle(Vec::new()).select(19), None);
    }
}
