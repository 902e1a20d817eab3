//! Multi-agent routing of episodes to per-key segment buffers.
use crate::{
    error::SegmentBufferError, record::Record, Episode, EpisodeBatch, ExperienceBufferBase,
    MultiAgentEpisodeBatch, MultiAgentSegmentBatch, ReplayBufferBase, SegmentBatch, SegmentBuffer,
    SegmentBufferConfig,
};
use anyhow::Result;
use log::debug;
use std::{
    collections::{hash_map::Entry, HashMap},
    fmt::Debug,
    hash::{Hash, Hasher},
};
use xxhash_rust::xxh3::Xxh3;

/// Maps agent or policy keys to independent [`SegmentBuffer`]s.
///
/// A buffer is created the first time a key is inserted, using the shared
/// configuration, and is kept for the lifetime of the router. Only episodes
/// inside a key's buffer are ever evicted, never keys.
///
/// The random seed of each buffer is derived from `config.seed` and the key,
/// so sampling is reproducible regardless of the order in which keys appear.
/// [`build`](ReplayBufferBase::build) hashes both with XXH3;
/// [`with_seeder`](Self::with_seeder) replaces the derivation.
pub struct KeyedBufferRouter<K> {
    config: SegmentBufferConfig,
    seeder: fn(u64, &K) -> u64,
    buffers: HashMap<K, SegmentBuffer>,
}

impl<K> KeyedBufferRouter<K>
where
    K: Eq + Hash + Clone + Debug,
{
    /// Builds an empty router whose buffer for a key is seeded with
    /// `seeder(config.seed, key)`.
    pub fn with_seeder(config: &SegmentBufferConfig, seeder: fn(u64, &K) -> u64) -> Result<Self> {
        config.check()?;
        Ok(Self {
            config: config.clone(),
            seeder,
            buffers: HashMap::new(),
        })
    }

    fn buffer_mut(&mut self, key: K) -> Result<&mut SegmentBuffer> {
        match self.buffers.entry(key) {
            Entry::Occupied(e) => Ok(e.into_mut()),
            Entry::Vacant(e) => {
                debug!("Create segment buffer for key {:?}", e.key());
                let seed = (self.seeder)(self.config.seed, e.key());
                let buffer = SegmentBuffer::build_seeded(&self.config.clone().seed(seed))?;
                Ok(e.insert(buffer))
            }
        }
    }

    /// Inserts an episode into the buffer of `key`, creating it if needed.
    pub fn insert(&mut self, key: K, episode: Episode) -> Result<usize> {
        Ok(self.buffer_mut(key)?.insert(episode))
    }

    /// Pushes a batch of complete episodes into the buffer of `key`.
    ///
    /// A batch without any step does not register `key`.
    pub fn push_episodes(&mut self, key: K, batch: EpisodeBatch) -> Result<()> {
        let episodes = batch.split_by_episode()?;
        if episodes.is_empty() {
            return Ok(());
        }
        let buffer = self.buffer_mut(key)?;
        for episode in episodes {
            buffer.insert(episode);
        }
        Ok(())
    }

    /// Samples `batch_size` segments from the buffer of `key`.
    pub fn sample(&mut self, key: &K, batch_size: usize) -> Result<SegmentBatch> {
        match self.buffers.get_mut(key) {
            Some(buffer) => buffer.sample(batch_size),
            None => Err(SegmentBufferError::UnknownKey(format!("{:?}", key)).into()),
        }
    }

    /// Samples `batch_size` segments from the buffer of every registered key.
    pub fn sample_all(&mut self, batch_size: usize) -> Result<MultiAgentSegmentBatch<K>> {
        let policy_batches = self
            .buffers
            .iter_mut()
            .map(|(key, buffer)| Ok((key.clone(), buffer.sample(batch_size)?)))
            .collect::<Result<HashMap<_, _>>>()?;

        Ok(MultiAgentSegmentBatch {
            policy_batches,
            batch_size,
        })
    }

    /// Returns the buffer of `key`.
    pub fn get(&self, key: &K) -> Option<&SegmentBuffer> {
        self.buffers.get(key)
    }

    /// Iterates over the registered keys.
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.buffers.keys()
    }

    /// Returns the number of registered keys.
    pub fn num_keys(&self) -> usize {
        self.buffers.len()
    }

    /// Returns the shared configuration.
    pub fn config(&self) -> &SegmentBufferConfig {
        &self.config
    }

    /// Summarizes every buffer; keys of the record are prefixed with the agent key.
    pub fn stats(&self) -> Record {
        let mut record = Record::from_scalar("num_keys", self.buffers.len() as f32);
        for (key, buffer) in self.buffers.iter() {
            record.merge_with_prefix(&format!("{:?}", key), buffer.stats());
        }
        record
    }
}

impl<K> ExperienceBufferBase for KeyedBufferRouter<K>
where
    K: Eq + Hash + Clone + Debug,
{
    type Item = MultiAgentEpisodeBatch<K>;

    fn push(&mut self, tr: Self::Item) -> Result<()> {
        for (key, batch) in tr.policy_batches {
            self.push_episodes(key, batch)?;
        }
        Ok(())
    }

    /// Returns the number of stored episodes over all keys.
    fn len(&self) -> usize {
        self.buffers.values().map(|b| b.len()).sum()
    }
}

impl<K> ReplayBufferBase for KeyedBufferRouter<K>
where
    K: Eq + Hash + Clone + Debug,
{
    type Config = SegmentBufferConfig;
    type Batch = MultiAgentSegmentBatch<K>;

    fn build(config: &Self::Config) -> Result<Self> {
        Self::with_seeder(config, key_seed::<K>)
    }

    fn batch(&mut self, size: usize) -> Result<Self::Batch> {
        self.sample_all(size)
    }
}

fn key_seed<K: Hash>(seed: u64, key: &K) -> u64 {
    let mut hasher = Xxh3::new();
    seed.hash(&mut hasher);
    key.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array1, ArrayD, IxDyn};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn episode(len: usize, value: f32) -> Episode {
        Episode::from_rewards(
            ArrayD::from_elem(IxDyn(&[len, 3]), value),
            ArrayD::from_elem(IxDyn(&[len, 5]), value),
            Array1::ones(len),
            1.0,
        )
        .unwrap()
    }

    fn router() -> KeyedBufferRouter<String> {
        let config = SegmentBufferConfig::default()
            .capacity(10)
            .segment_length(5)
            .max_episode_length(20);
        KeyedBufferRouter::build(&config).unwrap()
    }

    #[test]
    fn test_lazy_creation() -> Result<()> {
        let mut router = router();
        assert_eq!(router.num_keys(), 0);

        router.insert("a".to_string(), episode(8, 1.0))?;
        router.insert("a".to_string(), episode(8, 1.0))?;
        router.insert("b".to_string(), episode(8, 2.0))?;
        assert_eq!(router.num_keys(), 2);
        assert_eq!(router.get(&"a".to_string()).map(|b| b.len()), Some(2));
        assert_eq!(router.get(&"b".to_string()).map(|b| b.len()), Some(1));
        assert_eq!(router.len(), 3);
        Ok(())
    }

    #[test]
    fn test_unknown_key() {
        let mut router = router();
        let err = router.sample(&"missing".to_string(), 4).unwrap_err();
        assert_eq!(
            err.downcast_ref::<SegmentBufferError>(),
            Some(&SegmentBufferError::UnknownKey("\"missing\"".to_string()))
        );
    }

    #[test]
    fn test_sample_routes_by_key() -> Result<()> {
        let mut router = router();
        router.insert("a".to_string(), episode(8, 1.0))?;
        router.insert("b".to_string(), episode(3, 2.0))?;

        let batch = router.sample(&"b".to_string(), 6)?;
        assert_eq!(batch.obs.shape(), &[6, 5, 3]);
        for (o, m) in batch.obs.outer_iter().zip(batch.masks.outer_iter()) {
            // Episode of key b is shorter than the segment
            assert!(m[0] == 0.0 && m[1] == 0.0);
            assert!(o.iter().all(|&v| v == 0.0 || v == 2.0));
        }
        Ok(())
    }

    #[test]
    fn test_sample_all() -> Result<()> {
        let mut router = router();
        let mut batch = MultiAgentEpisodeBatch::default();
        batch.insert(
            "a".to_string(),
            EpisodeBatch::from_episodes(&[episode(8, 1.0), episode(9, 1.0)])?,
        );
        batch.insert("b".to_string(), EpisodeBatch::from_episodes(&[episode(4, 2.0)])?);
        router.push(batch)?;

        let samples = router.batch(7)?;
        assert_eq!(samples.batch_size, 7);
        assert_eq!(samples.policy_batches.len(), 2);
        for batch in samples.policy_batches.values() {
            assert_eq!(batch.len(), 7);
            assert_eq!(batch.act.shape(), &[7, 5, 5]);
        }
        Ok(())
    }

    #[test]
    fn test_stats_prefixed_by_key() -> Result<()> {
        let mut router = router();
        router.insert("a".to_string(), episode(8, 1.0))?;
        let stats = router.stats();
        assert_eq!(stats.get_scalar("num_keys")?, 1.0);
        assert_eq!(stats.get_scalar("\"a\"/num_episodes")?, 1.0);
        Ok(())
    }

    #[test]
    fn test_keys_get_independent_streams() -> Result<()> {
        let config = SegmentBufferConfig::default().segment_length(4);
        let mut r1 = KeyedBufferRouter::build(&config)?;
        let mut r2 = KeyedBufferRouter::build(&config)?;

        // Insertion order differs, results per key do not
        r1.insert(1u32, episode(30, 1.0))?;
        r1.insert(2u32, episode(30, 1.0))?;
        r2.insert(2u32, episode(30, 1.0))?;
        r2.insert(1u32, episode(30, 1.0))?;
        assert_eq!(r1.sample(&1, 16)?, r2.sample(&1, 16)?);
        assert_eq!(r1.sample(&2, 16)?, r2.sample(&2, 16)?);
        Ok(())
    }

    #[test]
    fn test_empty_push_does_not_register_key() -> Result<()> {
        let mut router = router();
        router.insert("a".to_string(), episode(8, 1.0))?;

        let empty = EpisodeBatch::new(
            ArrayD::zeros(IxDyn(&[0, 3])),
            ArrayD::zeros(IxDyn(&[0, 5])),
            Array1::zeros(0),
            Array1::zeros(0),
            vec![],
        )?;
        router.push(MultiAgentEpisodeBatch::single("b".to_string(), empty))?;
        assert_eq!(router.num_keys(), 1);
        assert!(router.get(&"b".to_string()).is_none());

        let samples = router.batch(4)?;
        assert_eq!(samples.policy_batches.len(), 1);
        assert_eq!(samples.policy_batches["a"].len(), 4);
        Ok(())
    }

    #[test]
    fn test_key_seed() {
        assert_eq!(key_seed(42, &"a"), key_seed(42, &"a"));
        assert_ne!(key_seed(42, &"a"), key_seed(42, &"b"));
        assert_ne!(key_seed(42, &"a"), key_seed(43, &"a"));
    }

    #[test]
    fn test_with_seeder() -> Result<()> {
        let config = SegmentBufferConfig::default().segment_length(4);
        let mut router = KeyedBufferRouter::with_seeder(&config, |seed, _: &u32| seed)?;
        router.insert(1, episode(30, 1.0))?;
        router.insert(2, episode(30, 1.0))?;

        // Same seed and same content for both keys
        assert_eq!(router.sample(&1, 32)?, router.sample(&2, 32)?);
        Ok(())
    }

    static N_SEGMENT_LENGTH_WARNINGS: AtomicUsize = AtomicUsize::new(0);

    struct WarningCounter;

    impl log::Log for WarningCounter {
        fn enabled(&self, metadata: &log::Metadata) -> bool {
            metadata.level() <= log::Level::Warn
        }

        fn log(&self, record: &log::Record) {
            let msg = format!("{}", record.args());
            if record.level() == log::Level::Warn && msg.starts_with("segment_length (77)") {
                N_SEGMENT_LENGTH_WARNINGS.fetch_add(1, Ordering::SeqCst);
            }
        }

        fn flush(&self) {}
    }

    static WARNING_COUNTER: WarningCounter = WarningCounter;

    #[test]
    fn test_config_warning_logged_once() -> Result<()> {
        if log::set_logger(&WARNING_COUNTER).is_ok() {
            log::set_max_level(log::LevelFilter::Warn);
        }
        let config = SegmentBufferConfig::default()
            .segment_length(77)
            .max_episode_length(11);

        let mut router = KeyedBufferRouter::build(&config)?;
        router.insert("a".to_string(), episode(8, 1.0))?;
        router.insert("b".to_string(), episode(8, 1.0))?;
        assert_eq!(N_SEGMENT_LENGTH_WARNINGS.load(Ordering::SeqCst), 1);

        SegmentBuffer::build(&config)?;
        assert_eq!(N_SEGMENT_LENGTH_WARNINGS.load(Ordering::SeqCst), 2);
        Ok(())
    }
}
