//! Configuration of segment buffers.
use crate::error::SegmentBufferError;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    default::Default,
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Configuration shared by [`EpisodeStore`](super::EpisodeStore),
/// [`SegmentSampler`](crate::SegmentSampler) and
/// [`KeyedBufferRouter`](crate::KeyedBufferRouter).
///
/// All values are fixed at construction.
///
/// ```rust
/// use segment_buffer::SegmentBufferConfig;
///
/// let config = SegmentBufferConfig::default()
///     .capacity(100)
///     .segment_length(20)
///     .max_episode_length(1000)
///     .seed(42);
/// ```
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct SegmentBufferConfig {
    /// Maximum number of episodes kept by a store. When full, a new episode
    /// replaces a uniformly chosen stored one.
    pub capacity: usize,

    /// Length of sampled segments.
    pub segment_length: usize,

    /// Episodes longer than this are truncated to their first
    /// `max_episode_length` steps when inserted.
    pub max_episode_length: usize,

    /// Random seed for eviction and sampling.
    pub seed: u64,
}

impl Default for SegmentBufferConfig {
    fn default() -> Self {
        Self {
            capacity: 20,
            segment_length: 20,
            max_episode_length: 1000,
            seed: 42,
        }
    }
}

impl SegmentBufferConfig {
    /// Sets the maximum number of stored episodes.
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Sets the length of sampled segments.
    pub fn segment_length(mut self, segment_length: usize) -> Self {
        self.segment_length = segment_length;
        self
    }

    /// Sets the truncation threshold of episodes.
    pub fn max_episode_length(mut self, max_episode_length: usize) -> Self {
        self.max_episode_length = max_episode_length;
        self
    }

    /// Sets the random seed.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Checks the configuration before a buffer is built.
    ///
    /// A `segment_length` longer than `max_episode_length` only produces
    /// segments with a padded prefix, so it is reported as a warning.
    pub fn check(&self) -> Result<()> {
        self.check_values()?;

        if self.segment_length > self.max_episode_length {
            log::warn!(
                "segment_length ({}) is longer than max_episode_length ({}); \
                 every sampled segment will be front-padded",
                self.segment_length,
                self.max_episode_length
            );
        }

        Ok(())
    }

    /// Like [`check`](Self::check) but without logging.
    pub(crate) fn check_values(&self) -> Result<()> {
        let nonzero = [
            ("capacity", self.capacity),
            ("segment_length", self.segment_length),
            ("max_episode_length", self.max_episode_length),
        ];
        for (name, value) in nonzero.iter() {
            if *value == 0 {
                return Err(SegmentBufferError::InvalidConfig(format!(
                    "{} must be positive",
                    name
                ))
                .into());
            }
        }
        Ok(())
    }

    /// Constructs [`SegmentBufferConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`SegmentBufferConfig`] as YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempdir::TempDir;

    #[test]
    fn test_serde_segment_buffer_config() -> Result<()> {
        let config = SegmentBufferConfig::default()
            .capacity(5)
            .segment_length(3)
            .max_episode_length(10)
            .seed(7);

        let dir = TempDir::new("segment_buffer_config")?;
        let path = dir.path().join("segment_buffer_config.yaml");
        config.save(&path)?;
        let config_ = SegmentBufferConfig::load(&path)?;
        assert_eq!(config, config_);
        Ok(())
    }

    #[test]
    fn test_check() {
        assert!(SegmentBufferConfig::default().check().is_ok());

        // Degenerate but allowed
        let config = SegmentBufferConfig::default()
            .segment_length(50)
            .max_episode_length(10);
        assert!(config.check().is_ok());

        let err = SegmentBufferConfig::default().capacity(0).check().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SegmentBufferError>(),
            Some(SegmentBufferError::InvalidConfig(_))
        ));
    }
}
