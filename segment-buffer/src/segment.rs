//! Fixed-length segments and their sampling.
//!
//! A [`Segment`] is the training window the sequence model sees. Its shapes do
//! not depend on where in the episode the window landed:
//!
//! | field           | shape                              |
//! |-----------------|------------------------------------|
//! | `obs`           | `[segment_length, *obs_shape]`     |
//! | `act`           | `[segment_length, *act_shape]`     |
//! | `returns_to_go` | `[segment_length + 1]`             |
//! | `timesteps`     | `[segment_length]`                 |
//! | `mask`          | `[segment_length]`                 |
//!
//! [`SegmentSampler`] draws segments from an
//! [`EpisodeStore`](crate::EpisodeStore) and stacks them into a
//! [`SegmentBatch`].
mod base;
mod batch;
mod sampler;
pub use base::Segment;
pub use batch::{ActionTargets, MultiAgentSegmentBatch, SegmentBatch};
pub use sampler::SegmentSampler;
