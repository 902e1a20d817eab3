//! Episodes handed to the buffer by producers.
//!
//! An [`Episode`] is one complete trajectory with its returns-to-go already
//! computed. Producers usually deliver several episodes concatenated in an
//! [`EpisodeBatch`] tagged with per-step episode ids; the buffer splits it with
//! [`EpisodeBatch::split_by_episode`] before storing. [`MultiAgentEpisodeBatch`]
//! groups such batches by agent or policy key for the
//! [`KeyedBufferRouter`](crate::KeyedBufferRouter).
mod base;
mod batch;
mod returns;
pub use base::Episode;
pub use batch::{EpisodeBatch, MultiAgentEpisodeBatch};
pub use returns::returns_to_go;
