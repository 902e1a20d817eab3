//! Single-agent segment buffer.
use crate::{
    record::{Record, RecordValue},
    Episode, EpisodeBatch, EpisodeStore, ExperienceBufferBase, ReplayBufferBase, SegmentBatch,
    SegmentBufferConfig, SegmentSampler,
};
use anyhow::Result;
use rand::{rngs::StdRng, Rng, SeedableRng};

#[cfg_attr(doc, aquamarine::aquamarine)]
/// An [`EpisodeStore`] paired with a [`SegmentSampler`].
///
/// Episodes flow from the producer to the training step as follows:
///
/// ```mermaid
/// graph LR
///     Producer -- EpisodeBatch --> Split[split_by_episode]
///     Split -- Episode --> EpisodeStore
///     EpisodeStore -- read --> SegmentSampler
///     SegmentSampler -- SegmentBatch --> Trainer
/// ```
///
/// ```rust
/// # use anyhow::Result;
/// use ndarray::{Array1, ArrayD, IxDyn};
/// use segment_buffer::{
///     Episode, EpisodeBatch, ExperienceBufferBase, ReplayBufferBase, SegmentBuffer,
///     SegmentBufferConfig,
/// };
///
/// # fn main() -> Result<()> {
/// let config = SegmentBufferConfig::default().capacity(10).segment_length(4);
/// let mut buffer = SegmentBuffer::build(&config)?;
///
/// let episode = Episode::from_rewards(
///     ArrayD::zeros(IxDyn(&[8, 3])),
///     ArrayD::zeros(IxDyn(&[8, 2])),
///     Array1::ones(8),
///     1.0,
/// )?;
/// buffer.push(EpisodeBatch::from_episodes(&[episode])?)?;
///
/// let batch = buffer.batch(16)?;
/// assert_eq!(batch.obs.shape(), &[16, 4, 3]);
/// assert_eq!(batch.returns_to_go.shape(), &[16, 5]);
/// # Ok(())
/// # }
/// ```
pub struct SegmentBuffer<R = StdRng> {
    store: EpisodeStore<R>,
    sampler: SegmentSampler<R>,
}

impl SegmentBuffer<StdRng> {
    /// Builds a buffer seeded with `config.seed`, assuming the configuration
    /// has already been checked.
    pub(crate) fn build_seeded(config: &SegmentBufferConfig) -> Result<Self> {
        // Separate streams for eviction and sampling
        let mut seeder = StdRng::seed_from_u64(config.seed);
        let store_rng = StdRng::seed_from_u64(seeder.gen());
        let sampler_rng = StdRng::seed_from_u64(seeder.gen());
        Self::from_rngs(config, store_rng, sampler_rng)
    }
}

impl<R: Rng> SegmentBuffer<R> {
    /// Builds a buffer with the given generators for eviction and sampling.
    pub fn with_rng(config: &SegmentBufferConfig, store_rng: R, sampler_rng: R) -> Result<Self> {
        config.check()?;
        Self::from_rngs(config, store_rng, sampler_rng)
    }

    fn from_rngs(config: &SegmentBufferConfig, store_rng: R, sampler_rng: R) -> Result<Self> {
        Ok(Self {
            store: EpisodeStore::with_rng(config, store_rng)?,
            sampler: SegmentSampler::with_rng(config, sampler_rng)?,
        })
    }

    /// Inserts a single episode and returns the slot it was written to.
    pub fn insert(&mut self, episode: Episode) -> usize {
        self.store.insert(episode)
    }

    /// Samples `batch_size` segments.
    pub fn sample(&mut self, batch_size: usize) -> Result<SegmentBatch> {
        self.sampler.sample(&self.store, batch_size)
    }

    /// Returns the underlying episode store.
    pub fn store(&self) -> &EpisodeStore<R> {
        &self.store
    }

    /// Returns the length of sampled segments.
    pub fn segment_length(&self) -> usize {
        self.sampler.segment_length()
    }

    /// Summarizes the content of the buffer.
    pub fn stats(&self) -> Record {
        let lengths = self
            .store
            .iter()
            .map(|ep| ep.len() as f32)
            .collect::<Vec<_>>();
        let mean_length = if lengths.is_empty() {
            0.0
        } else {
            lengths.iter().sum::<f32>() / lengths.len() as f32
        };

        Record::from_slice(&[
            ("num_episodes", RecordValue::Scalar(self.store.len() as f32)),
            ("num_steps", RecordValue::Scalar(self.store.num_steps() as f32)),
            (
                "num_inserted",
                RecordValue::Scalar(self.store.num_inserted() as f32),
            ),
            (
                "num_evicted",
                RecordValue::Scalar(self.store.num_evicted() as f32),
            ),
            (
                "num_truncated",
                RecordValue::Scalar(self.store.num_truncated() as f32),
            ),
            ("mean_episode_length", RecordValue::Scalar(mean_length)),
            ("episode_lengths", RecordValue::Array1(lengths)),
        ])
    }
}

impl<R: Rng> ExperienceBufferBase for SegmentBuffer<R> {
    type Item = EpisodeBatch;

    /// Splits the batch into episodes and inserts them in order.
    fn push(&mut self, tr: Self::Item) -> Result<()> {
        for episode in tr.split_by_episode()? {
            self.store.insert(episode);
        }
        Ok(())
    }

    fn len(&self) -> usize {
        self.store.len()
    }
}

impl ReplayBufferBase for SegmentBuffer<StdRng> {
    type Config = SegmentBufferConfig;
    type Batch = SegmentBatch;

    fn build(config: &Self::Config) -> Result<Self> {
        config.check()?;
        Self::build_seeded(config)
    }

    fn batch(&mut self, size: usize) -> Result<Self::Batch> {
        self.sample(size)
    }
}
