//! Batches of concatenated episodes.
use super::Episode;
use crate::error::SegmentBufferError;
use anyhow::Result;
use ndarray::{concatenate, s, Array1, ArrayD, ArrayView1, ArrayViewD, Axis, Slice};
use std::{collections::HashMap, hash::Hash};

/// Complete episodes concatenated along the time axis.
///
/// `eps_id[t]` identifies the episode step `t` belongs to. Steps of one episode
/// must be contiguous; a change of `eps_id` between two consecutive steps marks
/// an episode boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct EpisodeBatch {
    /// Observations, `[n_steps, *obs_shape]`.
    pub obs: ArrayD<f32>,

    /// Actions, `[n_steps, *act_shape]`.
    pub act: ArrayD<f32>,

    /// Rewards, `[n_steps]`.
    pub reward: Array1<f32>,

    /// Returns-to-go, `[n_steps]`.
    pub returns_to_go: Array1<f32>,

    /// Episode ids, `[n_steps]`.
    pub eps_id: Vec<i64>,
}

impl EpisodeBatch {
    /// Creates a batch, checking that all fields have the same number of steps.
    pub fn new(
        obs: ArrayD<f32>,
        act: ArrayD<f32>,
        reward: Array1<f32>,
        returns_to_go: Array1<f32>,
        eps_id: Vec<i64>,
    ) -> Result<Self> {
        let n = eps_id.len();
        let lens = [
            ("obs", obs.shape().first().copied().unwrap_or(0)),
            ("act", act.shape().first().copied().unwrap_or(0)),
            ("reward", reward.len()),
            ("returns_to_go", returns_to_go.len()),
        ];
        for (name, len) in lens.iter() {
            if *len != n {
                return Err(SegmentBufferError::EpisodeShapeMismatch(format!(
                    "{} has {} steps but eps_id has {}",
                    name, len, n
                ))
                .into());
            }
        }

        Ok(Self {
            obs,
            act,
            reward,
            returns_to_go,
            eps_id,
        })
    }

    /// Concatenates episodes into a batch. The `i`-th episode gets id `i`.
    ///
    /// Fails if `episodes` is empty or their observation or action shapes differ.
    pub fn from_episodes(episodes: &[Episode]) -> Result<Self> {
        let obs = episodes.iter().map(|ep| ep.obs().view()).collect::<Vec<_>>();
        let act = episodes.iter().map(|ep| ep.act().view()).collect::<Vec<_>>();
        let reward = episodes
            .iter()
            .map(|ep| ep.reward().view())
            .collect::<Vec<_>>();
        let rtg = episodes
            .iter()
            .map(|ep| ep.returns_to_go().view())
            .collect::<Vec<_>>();
        let eps_id = episodes
            .iter()
            .enumerate()
            .flat_map(|(i, ep)| std::iter::repeat(i as i64).take(ep.len()))
            .collect();

        Self::new(
            concat_d(&obs)?,
            concat_d(&act)?,
            concat_1(&reward)?,
            concat_1(&rtg)?,
            eps_id,
        )
    }

    /// Returns the total number of steps.
    pub fn len(&self) -> usize {
        self.eps_id.len()
    }

    /// Returns `true` if the batch has no step.
    pub fn is_empty(&self) -> bool {
        self.eps_id.is_empty()
    }

    /// Splits the batch into single episodes at every change of episode id.
    pub fn split_by_episode(&self) -> Result<Vec<Episode>> {
        let mut episodes = vec![];
        let mut start = 0;
        for end in 1..=self.len() {
            if end == self.len() || self.eps_id[end] != self.eps_id[start] {
                episodes.push(self.episode(start, end)?);
                start = end;
            }
        }
        Ok(episodes)
    }

    fn episode(&self, start: usize, end: usize) -> Result<Episode> {
        let slice = Slice::from(start..end);
        Episode::new(
            self.obs.slice_axis(Axis(0), slice).to_owned(),
            self.act.slice_axis(Axis(0), slice).to_owned(),
            self.reward.slice(s![start..end]).to_owned(),
            self.returns_to_go.slice(s![start..end]).to_owned(),
        )
    }
}

fn concat_d(xs: &[ArrayViewD<f32>]) -> Result<ArrayD<f32>> {
    Ok(concatenate(Axis(0), xs)?)
}

fn concat_1(xs: &[ArrayView1<f32>]) -> Result<Array1<f32>> {
    Ok(concatenate(Axis(0), xs)?)
}

/// Episode batches grouped by agent or policy key.
#[derive(Debug, Clone)]
pub struct MultiAgentEpisodeBatch<K> {
    /// Batch of each key.
    pub policy_batches: HashMap<K, EpisodeBatch>,
}

impl<K: Eq + Hash> Default for MultiAgentEpisodeBatch<K> {
    fn default() -> Self {
        Self {
            policy_batches: HashMap::new(),
        }
    }
}

impl<K: Eq + Hash> MultiAgentEpisodeBatch<K> {
    /// Wraps a single-agent batch.
    pub fn single(key: K, batch: EpisodeBatch) -> Self {
        Self {
            policy_batches: HashMap::from([(key, batch)]),
        }
    }

    /// Sets the batch of `key`, replacing any previous one.
    pub fn insert(&mut self, key: K, batch: EpisodeBatch) {
        self.policy_batches.insert(key, batch);
    }

    /// Returns the total number of steps over all keys.
    pub fn env_steps(&self) -> usize {
        self.policy_batches.values().map(|b| b.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::IxDyn;

    fn batch(eps_id: Vec<i64>) -> EpisodeBatch {
        let n = eps_id.len();
        let obs = ArrayD::from_shape_fn(IxDyn(&[n, 3]), |ix| ix[0] as f32);
        let act = ArrayD::from_shape_fn(IxDyn(&[n, 2]), |ix| (100 + ix[0]) as f32);
        let reward = Array1::ones(n);
        let rtg = Array1::from_shape_fn(n, |t| (200 + t) as f32);
        EpisodeBatch::new(obs, act, reward, rtg, eps_id).unwrap()
    }

    #[test]
    fn test_split_by_episode() {
        let episodes = batch(vec![7, 7, 7, 3, 3, 7]).split_by_episode().unwrap();
        assert_eq!(episodes.len(), 3);
        assert_eq!(
            episodes.iter().map(|ep| ep.len()).collect::<Vec<_>>(),
            vec![3, 2, 1]
        );
        assert_eq!(episodes[1].obs()[[0, 0]], 3.0);
        assert_eq!(episodes[1].act()[[1, 1]], 104.0);
        assert_eq!(episodes[2].returns_to_go()[0], 205.0);
    }

    #[test]
    fn test_split_empty_batch() {
        let episodes = batch(vec![]).split_by_episode().unwrap();
        assert!(episodes.is_empty());
    }

    #[test]
    fn test_new_rejects_mismatched_lengths() {
        let err = EpisodeBatch::new(
            ArrayD::zeros(IxDyn(&[3, 1])),
            ArrayD::zeros(IxDyn(&[3, 1])),
            Array1::zeros(2),
            Array1::zeros(3),
            vec![0, 0, 0],
        )
        .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SegmentBufferError>(),
            Some(SegmentBufferError::EpisodeShapeMismatch(_))
        ));
    }

    #[test]
    fn test_from_episodes_roundtrip() {
        let episodes = batch(vec![0, 0, 1, 1, 1]).split_by_episode().unwrap();
        let merged = EpisodeBatch::from_episodes(&episodes).unwrap();
        assert_eq!(merged.eps_id, vec![0, 0, 1, 1, 1]);
        assert_eq!(merged.obs, batch(vec![0, 0, 1, 1, 1]).obs);
    }

    #[test]
    fn test_multi_agent_env_steps() {
        let mut ma = MultiAgentEpisodeBatch::single("a", batch(vec![0, 0]));
        ma.insert("b", batch(vec![0, 1, 1]));
        assert_eq!(ma.env_steps(), 5);
    }
}
