//! Random segment sampling.
use super::{Segment, SegmentBatch};
use crate::{error::SegmentBufferError, EpisodeStore, SegmentBufferConfig};
use anyhow::Result;
use rand::{rngs::StdRng, Rng, SeedableRng};

/// Draws fixed-length segments from an [`EpisodeStore`].
///
/// Each segment is produced independently:
///
/// 1. Pick an episode uniformly at random, with `ep_len` steps.
/// 2. With `L = min(segment_length, ep_len)`, draw a start index `si`
///    uniformly from `[-(L - 1), ep_len - L]`. Negative start indices are
///    what lets windows anchored at the very beginning of an episode be
///    sampled.
/// 3. Cut the window with [`Segment::cut`], which front-pads the part before
///    the first step and back-pads the trailing return-to-go with `0` at the
///    end of the episode.
///
/// The sampler only reads the store. It owns its random number generator, so
/// a fixed seed makes sampling reproducible.
pub struct SegmentSampler<R = StdRng> {
    segment_length: usize,
    rng: R,
}

impl SegmentSampler<StdRng> {
    /// Builds a sampler seeded with `config.seed`.
    pub fn build(config: &SegmentBufferConfig) -> Result<Self> {
        Self::with_rng(config, StdRng::seed_from_u64(config.seed))
    }
}

impl<R: Rng> SegmentSampler<R> {
    /// Builds a sampler with the given random number generator.
    pub fn with_rng(config: &SegmentBufferConfig, rng: R) -> Result<Self> {
        config.check_values()?;
        Ok(Self {
            segment_length: config.segment_length,
            rng,
        })
    }

    /// Returns the length of sampled segments.
    pub fn segment_length(&self) -> usize {
        self.segment_length
    }

    /// Samples one segment and returns it with the slot it was cut from.
    pub fn sample_single<S: Rng>(
        &mut self,
        store: &EpisodeStore<S>,
    ) -> Result<(usize, Segment)> {
        let ix = store.sample_index(&mut self.rng)?;
        let episode = store.get(ix).ok_or(SegmentBufferError::EmptyBuffer)?;
        let ep_len = episode.len() as i64;
        let offset = (self.segment_length as i64).min(ep_len);
        let si = self.rng.gen_range(-(offset - 1)..=ep_len - offset);

        Ok((ix, Segment::cut(episode, self.segment_length, si)?))
    }

    /// Samples `batch_size` independent segments and stacks them.
    pub fn sample<S: Rng>(
        &mut self,
        store: &EpisodeStore<S>,
        batch_size: usize,
    ) -> Result<SegmentBatch> {
        if batch_size == 0 {
            return Err(SegmentBufferError::ZeroBatchSize.into());
        }
        let (ixs, segments): (Vec<_>, Vec<_>) = (0..batch_size)
            .map(|_| self.sample_single(store))
            .collect::<Result<Vec<_>>>()?
            .into_iter()
            .unzip();

        SegmentBatch::stack(&segments, ixs)
    }
}
