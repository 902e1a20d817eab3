//! A single episode.
use super::returns_to_go;
use crate::error::SegmentBufferError;
use anyhow::Result;
use ndarray::{Array1, ArrayD, Axis, Slice};

/// One complete trajectory from reset to termination or truncation.
///
/// Observations and actions are stored with the time axis first, i.e.,
/// `obs` has shape `[len, *obs_shape]` and `act` has shape `[len, *act_shape]`.
/// `reward` and `returns_to_go` hold one value per step. All fields share the
/// same length, which is checked on construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Episode {
    obs: ArrayD<f32>,
    act: ArrayD<f32>,
    reward: Array1<f32>,
    returns_to_go: Array1<f32>,
}

impl Episode {
    /// Creates an episode with precomputed returns-to-go.
    ///
    /// # Errors
    ///
    /// * [`SegmentBufferError::EmptyEpisode`] if the episode has no step.
    /// * [`SegmentBufferError::EpisodeShapeMismatch`] if the fields have different lengths.
    pub fn new(
        obs: ArrayD<f32>,
        act: ArrayD<f32>,
        reward: Array1<f32>,
        returns_to_go: Array1<f32>,
    ) -> Result<Self> {
        let len = reward.len();
        check_len("obs", obs.shape().first().copied(), len)?;
        check_len("act", act.shape().first().copied(), len)?;
        check_len("returns_to_go", Some(returns_to_go.len()), len)?;
        if len == 0 {
            return Err(SegmentBufferError::EmptyEpisode.into());
        }

        Ok(Self {
            obs,
            act,
            reward,
            returns_to_go,
        })
    }

    /// Creates an episode, computing its returns-to-go with discount factor `gamma`.
    pub fn from_rewards(
        obs: ArrayD<f32>,
        act: ArrayD<f32>,
        reward: Array1<f32>,
        gamma: f32,
    ) -> Result<Self> {
        let returns_to_go = returns_to_go(&reward, gamma);
        Self::new(obs, act, reward, returns_to_go)
    }

    /// Returns the number of steps.
    pub fn len(&self) -> usize {
        self.reward.len()
    }

    /// Always `false`; episodes have at least one step.
    pub fn is_empty(&self) -> bool {
        self.reward.is_empty()
    }

    /// Observations, `[len, *obs_shape]`.
    pub fn obs(&self) -> &ArrayD<f32> {
        &self.obs
    }

    /// Actions, `[len, *act_shape]`.
    pub fn act(&self) -> &ArrayD<f32> {
        &self.act
    }

    /// Rewards, `[len]`.
    pub fn reward(&self) -> &Array1<f32> {
        &self.reward
    }

    /// Returns-to-go, `[len]`.
    pub fn returns_to_go(&self) -> &Array1<f32> {
        &self.returns_to_go
    }

    /// Shape of a single observation.
    pub fn obs_shape(&self) -> &[usize] {
        &self.obs.shape()[1..]
    }

    /// Shape of a single action.
    pub fn act_shape(&self) -> &[usize] {
        &self.act.shape()[1..]
    }

    /// Keeps the first `len` steps. Does nothing if the episode is not longer than `len`.
    pub fn truncate(&mut self, len: usize) {
        if len >= self.len() {
            return;
        }
        let slice = Slice::from(..len);
        self.obs.slice_axis_inplace(Axis(0), slice);
        self.act.slice_axis_inplace(Axis(0), slice);
        self.reward.slice_axis_inplace(Axis(0), slice);
        self.returns_to_go.slice_axis_inplace(Axis(0), slice);
    }
}

fn check_len(name: &str, actual: Option<usize>, expected: usize) -> Result<()> {
    match actual {
        Some(n) if n == expected => Ok(()),
        Some(n) => Err(SegmentBufferError::EpisodeShapeMismatch(format!(
            "{} has {} steps but reward has {}",
            name, n, expected
        ))
        .into()),
        None => Err(SegmentBufferError::EpisodeShapeMismatch(format!(
            "{} has no time axis",
            name
        ))
        .into()),
    }
}
