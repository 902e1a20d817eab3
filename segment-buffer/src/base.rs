//! Buffer interfaces.
//!
//! Producers and consumers of the buffers only see these two traits:
//! producers push batches of complete episodes through
//! [`ExperienceBufferBase`], the training step draws segment batches through
//! [`ReplayBufferBase`].
use anyhow::Result;

/// Interface for buffers that store experiences.
pub trait ExperienceBufferBase {
    /// The type of items pushed into the buffer, e.g., a batch of complete episodes.
    type Item;

    /// Pushes a new item into the buffer.
    fn push(&mut self, tr: Self::Item) -> Result<()>;

    /// Returns the number of stored episodes.
    fn len(&self) -> usize;

    /// Returns `true` if the buffer holds no episode.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Interface for replay buffers that generate batches for training.
pub trait ReplayBufferBase {
    /// Configuration of the buffer.
    type Config: Clone;

    /// Batch generated by the buffer.
    type Batch;

    /// Builds a buffer from the configuration.
    fn build(config: &Self::Config) -> Result<Self>
    where
        Self: Sized;

    /// Samples a batch of `size` segments.
    fn batch(&mut self, size: usize) -> Result<Self::Batch>;
}
