#![warn(missing_docs)]
//! Episodic replay buffer with fixed-length segment sampling.
//!
//! Sequence models such as the decision transformer are trained on windows of
//! a fixed length cut from trajectories of varying length. This crate stores
//! whole episodes in a bounded buffer and samples such windows, padded to a
//! uniform shape with an attention mask and aligned returns-to-go targets.
//!
//! * [`EpisodeStore`] keeps at most `capacity` episodes and evicts a uniformly
//!   chosen one once full.
//! * [`SegmentSampler`] cuts random fixed-length [`Segment`]s out of the stored
//!   episodes and stacks them into a [`SegmentBatch`].
//! * [`SegmentBuffer`] pairs the two and implements the producer and consumer
//!   interfaces, [`ExperienceBufferBase`] and [`ReplayBufferBase`].
//! * [`KeyedBufferRouter`] keeps one [`SegmentBuffer`] per agent or policy key.
//!
//! All buffers are single-threaded: `push` and `batch` are synchronous and the
//! buffers are not synchronized internally.
pub mod error;
pub mod record;

mod base;
pub use base::{ExperienceBufferBase, ReplayBufferBase};

mod buffer;
pub use buffer::SegmentBuffer;

mod episode;
pub use episode::{returns_to_go, Episode, EpisodeBatch, MultiAgentEpisodeBatch};

mod router;
pub use router::KeyedBufferRouter;

mod segment;
pub use segment::{
    ActionTargets, MultiAgentSegmentBatch, Segment, SegmentBatch, SegmentSampler,
};

mod space;
pub use space::ActionSpace;

mod store;
pub use store::{EpisodeStore, SegmentBufferConfig};
