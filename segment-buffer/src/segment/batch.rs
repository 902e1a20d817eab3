//! Batches of segments.
use super::Segment;
use crate::{error::SegmentBufferError, ActionSpace};
use anyhow::Result;
use ndarray::{stack, Array2, ArrayD, Axis};
use std::collections::HashMap;

/// Segments stacked along a new leading batch axis.
///
/// This is what the training step consumes. Positions with `masks == 0` are
/// padding and must be excluded from the loss.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentBatch {
    /// Observations, `[batch_size, segment_length, *obs_shape]`.
    pub obs: ArrayD<f32>,

    /// Actions, `[batch_size, segment_length, *act_shape]`.
    pub act: ArrayD<f32>,

    /// Returns-to-go, `[batch_size, segment_length + 1]`.
    pub returns_to_go: Array2<f32>,

    /// Step indices, `[batch_size, segment_length]`.
    pub timesteps: Array2<i64>,

    /// Attention masks, `[batch_size, segment_length]`.
    pub masks: Array2<f32>,

    /// Store slots the segments were cut from.
    pub ix_sample: Vec<usize>,
}

/// Action targets of a [`SegmentBatch`] for the loss of the action head.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionTargets {
    /// Class indices, `[batch_size, segment_length]`.
    Discrete(Array2<i64>),

    /// Action vectors, `[batch_size, segment_length, dim]`.
    Continuous(ArrayD<f32>),
}

impl SegmentBatch {
    /// Stacks segments; `ix_sample[i]` is the slot `segments[i]` was cut from.
    pub fn stack(segments: &[Segment], ix_sample: Vec<usize>) -> Result<Self> {
        if segments.is_empty() {
            return Err(SegmentBufferError::ZeroBatchSize.into());
        }
        let obs = segments.iter().map(|s| s.obs.view()).collect::<Vec<_>>();
        let act = segments.iter().map(|s| s.act.view()).collect::<Vec<_>>();
        let rtg = segments
            .iter()
            .map(|s| s.returns_to_go.view())
            .collect::<Vec<_>>();
        let timesteps = segments
            .iter()
            .map(|s| s.timesteps.view())
            .collect::<Vec<_>>();
        let masks = segments.iter().map(|s| s.mask.view()).collect::<Vec<_>>();

        Ok(Self {
            obs: stack(Axis(0), &obs)?,
            act: stack(Axis(0), &act)?,
            returns_to_go: stack(Axis(0), &rtg)?,
            timesteps: stack(Axis(0), &timesteps)?,
            masks: stack(Axis(0), &masks)?,
            ix_sample,
        })
    }

    /// Returns the number of segments.
    pub fn len(&self) -> usize {
        self.masks.nrows()
    }

    /// Returns `true` if the batch has no segment.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the segment length.
    pub fn segment_length(&self) -> usize {
        self.masks.ncols()
    }

    /// Returns a copy of the `ix`-th segment.
    pub fn get(&self, ix: usize) -> Option<Segment> {
        if ix >= self.len() {
            return None;
        }
        Some(Segment {
            obs: self.obs.index_axis(Axis(0), ix).to_owned(),
            act: self.act.index_axis(Axis(0), ix).to_owned(),
            returns_to_go: self.returns_to_go.row(ix).to_owned(),
            timesteps: self.timesteps.row(ix).to_owned(),
            mask: self.masks.row(ix).to_owned(),
        })
    }

    /// Converts actions into targets for the given action space.
    ///
    /// Discrete actions are stored as class indices, one per step. Padded
    /// positions map to class `0`; they are masked out by the loss.
    pub fn action_targets(&self, space: &ActionSpace) -> Result<ActionTargets> {
        let shape = self.act.shape();
        let expected = [&shape[..2], space.shape().as_slice()].concat();
        if shape != expected.as_slice() {
            return Err(SegmentBufferError::ActionSpaceMismatch(format!(
                "actions have shape {:?} but {:?} expects {:?}",
                shape, space, expected
            ))
            .into());
        }

        match space {
            ActionSpace::Discrete(n) => {
                let mut targets = Array2::<i64>::zeros((shape[0], shape[1]));
                for (t, a) in targets.iter_mut().zip(self.act.iter()) {
                    let ix = a.round() as i64;
                    if !a.is_finite() || ix < 0 || ix >= *n as i64 {
                        return Err(SegmentBufferError::ActionSpaceMismatch(format!(
                            "action {} is out of [0, {})",
                            a, n
                        ))
                        .into());
                    }
                    *t = ix;
                }
                Ok(ActionTargets::Discrete(targets))
            }
            ActionSpace::Continuous(_) => Ok(ActionTargets::Continuous(self.act.clone())),
        }
    }
}

/// Segment batches grouped by agent or policy key.
#[derive(Debug, Clone)]
pub struct MultiAgentSegmentBatch<K> {
    /// Batch of each key.
    pub policy_batches: HashMap<K, SegmentBatch>,

    /// Number of segments sampled for each key.
    pub batch_size: usize,
}
