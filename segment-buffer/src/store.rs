//! Fixed-capacity storage of whole episodes.
mod base;
mod config;
pub use base::EpisodeStore;
pub use config::SegmentBufferConfig;
