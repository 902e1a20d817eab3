//! Errors in the library.
use thiserror::Error;

/// Errors raised by episode stores, segment samplers and the keyed router.
///
/// The buffers return [`anyhow::Result`]; match on a variant with
/// `err.downcast_ref::<SegmentBufferError>()`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SegmentBufferError {
    /// Sampling was requested while the store holds no episodes.
    #[error("Cannot sample from an empty buffer")]
    EmptyBuffer,

    /// Sampling was requested for a key that has never been inserted.
    #[error("Unknown key: {0}")]
    UnknownKey(String),

    /// A sampled segment does not have the shapes the training loss expects.
    ///
    /// This indicates a bug in segment construction and is never recoverable.
    #[error("Segment shape invariant violated: {0}")]
    ShapeInvariantViolation(String),

    /// The per-step fields of an episode do not share the same length.
    #[error("Episode shape mismatch: {0}")]
    EpisodeShapeMismatch(String),

    /// An episode without any step.
    #[error("Episode has no steps")]
    EmptyEpisode,

    /// Invalid buffer configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A batch of zero segments was requested.
    #[error("Batch size must be positive")]
    ZeroBatchSize,

    /// Stored actions do not agree with the given action space.
    #[error("Action space mismatch: {0}")]
    ActionSpaceMismatch(String),

    /// Record key error.
    #[error("Record key error: {0}")]
    RecordKeyError(String),

    /// Record value type error.
    #[error("Record value type error: {0}")]
    RecordValueTypeError(String),
}
