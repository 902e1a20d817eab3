//! Episode store with uniform random eviction.
use super::SegmentBufferConfig;
use crate::{error::SegmentBufferError, Episode};
use anyhow::Result;
use log::{info, trace, warn};
use rand::{rngs::StdRng, Rng, SeedableRng};

/// A collection of at most `capacity` whole episodes.
///
/// While the store is not full, inserted episodes are appended. Once it is
/// full, every insertion overwrites a slot chosen uniformly at random, so the
/// size never exceeds `capacity`. Episodes longer than `max_episode_length`
/// are truncated before they are stored; this happens for example when a
/// shuffled offline dataset concatenates the same episode twice.
///
/// The store owns its episodes and only hands out shared references.
/// It is not synchronized; wrap whole calls in a lock to share it across threads.
pub struct EpisodeStore<R = StdRng> {
    capacity: usize,
    max_episode_length: usize,
    episodes: Vec<Episode>,

    /// Random number generator for choosing the slot to evict.
    rng: R,

    n_inserted: usize,
    n_evicted: usize,
    n_truncated: usize,
}

impl EpisodeStore<StdRng> {
    /// Builds an empty store; the eviction RNG is seeded with `config.seed`.
    pub fn build(config: &SegmentBufferConfig) -> Result<Self> {
        Self::with_rng(config, StdRng::seed_from_u64(config.seed))
    }
}

impl<R: Rng> EpisodeStore<R> {
    /// Builds an empty store with the given eviction RNG.
    pub fn with_rng(config: &SegmentBufferConfig, rng: R) -> Result<Self> {
        config.check_values()?;
        info!(
            "Construct episode store with capacity = {}, max_episode_length = {}",
            config.capacity, config.max_episode_length
        );

        Ok(Self {
            capacity: config.capacity,
            max_episode_length: config.max_episode_length,
            episodes: Vec::with_capacity(config.capacity),
            rng,
            n_inserted: 0,
            n_evicted: 0,
            n_truncated: 0,
        })
    }

    /// Inserts an episode and returns the slot it was written to.
    pub fn insert(&mut self, mut episode: Episode) -> usize {
        if episode.len() > self.max_episode_length {
            warn!(
                "The maximum episode length is {} but an episode of {} steps was inserted; \
                 it is truncated. This may indicate broken upstream data or a duplicated \
                 episode after shuffling.",
                self.max_episode_length,
                episode.len()
            );
            episode.truncate(self.max_episode_length);
            self.n_truncated += 1;
        }
        self.n_inserted += 1;

        if self.episodes.len() < self.capacity {
            self.episodes.push(episode);
            self.episodes.len() - 1
        } else {
            let ix = self.rng.gen_range(0..self.capacity);
            trace!("EpisodeStore::insert(): replace slot {}", ix);
            self.episodes[ix] = episode;
            self.n_evicted += 1;
            ix
        }
    }

    /// Draws a uniformly random slot index from the stored episodes.
    ///
    /// The generator is supplied by the caller so that read-only users, e.g.,
    /// [`SegmentSampler`](crate::SegmentSampler), keep their own randomness.
    pub fn sample_index<G: Rng>(&self, rng: &mut G) -> Result<usize> {
        if self.episodes.is_empty() {
            return Err(SegmentBufferError::EmptyBuffer.into());
        }
        Ok(rng.gen_range(0..self.episodes.len()))
    }

    /// Returns the episode stored at `ix`.
    pub fn get(&self, ix: usize) -> Option<&Episode> {
        self.episodes.get(ix)
    }

    /// Iterates over the stored episodes in slot order.
    pub fn iter(&self) -> std::slice::Iter<'_, Episode> {
        self.episodes.iter()
    }

    /// Returns the number of stored episodes.
    pub fn len(&self) -> usize {
        self.episodes.len()
    }

    /// Returns `true` if no episode is stored.
    pub fn is_empty(&self) -> bool {
        self.episodes.is_empty()
    }

    /// Returns the maximum number of stored episodes.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the truncation threshold.
    pub fn max_episode_length(&self) -> usize {
        self.max_episode_length
    }

    /// Returns the number of stored steps over all episodes.
    pub fn num_steps(&self) -> usize {
        self.episodes.iter().map(|ep| ep.len()).sum()
    }

    /// Returns the number of episodes inserted so far.
    pub fn num_inserted(&self) -> usize {
        self.n_inserted
    }

    /// Returns the number of episodes evicted so far.
    pub fn num_evicted(&self) -> usize {
        self.n_evicted
    }

    /// Returns the number of inserted episodes that were truncated.
    pub fn num_truncated(&self) -> usize {
        self.n_truncated
    }
}
