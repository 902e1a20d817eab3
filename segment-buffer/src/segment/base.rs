//! A single fixed-length segment.
use crate::{error::SegmentBufferError, Episode};
use anyhow::Result;
use ndarray::{concatenate, s, Array1, ArrayD, ArrayViewD, Axis, IxDyn, Slice};
use std::iter::repeat;

/// A fixed-length training window cut from one episode.
///
/// Windows that start before the first step of the episode are front-padded
/// with zeros, with `mask == 0` at the padded positions. `returns_to_go` has
/// one more entry than the other fields: the target of the last action in the
/// window, which is `0` when the window reaches the end of the episode.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    /// Observations, `[segment_length, *obs_shape]`.
    pub obs: ArrayD<f32>,

    /// Actions, `[segment_length, *act_shape]`.
    pub act: ArrayD<f32>,

    /// Returns-to-go, `[segment_length + 1]`.
    pub returns_to_go: Array1<f32>,

    /// Step indices in the episode, `[segment_length]`; `0` at padded positions.
    pub timesteps: Array1<i64>,

    /// Attention mask, `[segment_length]`; `1` for real data, `0` for padding.
    pub mask: Array1<f32>,
}

impl Segment {
    /// Cuts the window starting at `si` out of `episode`.
    ///
    /// With `L = min(segment_length, episode.len())`, `si` must lie in
    /// `[-(L - 1), episode.len() - L]`. A negative `si` yields a window whose
    /// real data starts partway through, e.g., `[pad, pad, s0, s1, s2]`.
    pub fn cut(episode: &Episode, segment_length: usize, si: i64) -> Result<Self> {
        let ep_len = episode.len() as i64;
        let offset = (segment_length as i64).min(ep_len);
        if si < -(offset - 1) || si > ep_len - offset {
            return Err(SegmentBufferError::ShapeInvariantViolation(format!(
                "start index {} is out of [{}, {}]",
                si,
                -(offset - 1),
                ep_len - offset
            ))
            .into());
        }
        let ei = (si + offset) as usize;

        // Padding compensates for the clamped prefix
        let rs = si.max(0) as usize;
        let length = ei - rs;

        let obs = episode.obs().slice_axis(Axis(0), Slice::from(rs..ei));
        let act = episode.act().slice_axis(Axis(0), Slice::from(rs..ei));

        // One extra element as the target of the last action
        let rtg_end = (ei + 1).min(episode.len());
        let mut rtg = episode.returns_to_go().slice(s![rs..rtg_end]).to_vec();
        if rtg.len() == length {
            rtg.push(0.0);
        }

        let pad = segment_length.saturating_sub(length);
        let segment = Self {
            obs: front_pad(obs, pad)?,
            act: front_pad(act, pad)?,
            returns_to_go: repeat(0.0).take(pad).chain(rtg).collect(),
            timesteps: repeat(0)
                .take(pad)
                .chain((rs..rs + length).map(|t| t as i64))
                .collect(),
            mask: repeat(0.0)
                .take(pad)
                .chain(repeat(1.0).take(length))
                .collect(),
        };
        segment.validate(segment_length)?;

        Ok(segment)
    }

    /// Returns the number of padded positions at the front of the segment.
    pub fn pad_length(&self) -> usize {
        self.mask.iter().take_while(|&&m| m == 0.0).count()
    }

    /// Checks the shapes the training loss depends on.
    ///
    /// A failure means the segment was built incorrectly and is not recoverable.
    pub fn validate(&self, segment_length: usize) -> Result<()> {
        let lens = [
            ("obs", self.obs.shape().first().copied(), segment_length),
            ("act", self.act.shape().first().copied(), segment_length),
            ("timesteps", Some(self.timesteps.len()), segment_length),
            ("mask", Some(self.mask.len()), segment_length),
            (
                "returns_to_go",
                Some(self.returns_to_go.len()),
                segment_length + 1,
            ),
        ];
        for (name, len, expected) in lens.iter() {
            if *len != Some(*expected) {
                return Err(SegmentBufferError::ShapeInvariantViolation(format!(
                    "{} has {:?} rows, expected {}",
                    name, len, expected
                ))
                .into());
            }
        }
        Ok(())
    }
}

fn front_pad(x: ArrayViewD<f32>, pad: usize) -> Result<ArrayD<f32>> {
    if pad == 0 {
        return Ok(x.to_owned());
    }
    let mut shape = x.shape().to_vec();
    shape[0] = pad;
    let zeros = ArrayD::<f32>::zeros(IxDyn(&shape));
    Ok(concatenate(Axis(0), &[zeros.view(), x.view()])?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, ArrayD, IxDyn};

    /// Observation and action values encode the step, returns-to-go is `100 + t`.
    fn episode(len: usize) -> Episode {
        Episode::new(
            ArrayD::from_shape_fn(IxDyn(&[len, 2]), |ix| (ix[0] + 1) as f32),
            ArrayD::from_shape_fn(IxDyn(&[len]), |ix| (ix[0] + 1) as f32 * 10.0),
            Array1::ones(len),
            Array1::from_shape_fn(len, |t| (100 + t) as f32),
        )
        .unwrap()
    }

    #[test]
    fn test_cut_inside_episode() -> Result<()> {
        let segment = Segment::cut(&episode(10), 3, 2)?;
        assert_eq!(segment.timesteps, array![2i64, 3, 4]);
        assert_eq!(segment.mask, array![1.0f32, 1.0, 1.0]);
        assert_eq!(segment.returns_to_go, array![102.0f32, 103.0, 104.0, 105.0]);
        assert_eq!(segment.obs.shape(), &[3, 2]);
        assert_eq!(segment.obs[[0, 1]], 3.0);
        assert_eq!(segment.act.shape(), &[3]);
        assert_eq!(segment.pad_length(), 0);
        Ok(())
    }

    #[test]
    fn test_cut_front_padding() -> Result<()> {
        let segment = Segment::cut(&episode(10), 4, -2)?;
        assert_eq!(segment.timesteps, array![0i64, 0, 0, 1]);
        assert_eq!(segment.mask, array![0.0f32, 0.0, 1.0, 1.0]);
        assert_eq!(segment.returns_to_go, array![0.0f32, 0.0, 100.0, 101.0, 102.0]);
        assert_eq!(segment.act, array![0.0f32, 0.0, 10.0, 20.0].into_dyn());
        assert_eq!(segment.obs.index_axis(Axis(0), 1).sum(), 0.0);
        assert_eq!(segment.obs[[2, 0]], 1.0);
        assert_eq!(segment.obs[[3, 1]], 2.0);
        assert_eq!(segment.pad_length(), 2);
        Ok(())
    }

    #[test]
    fn test_cut_back_padding_of_returns_to_go() -> Result<()> {
        let segment = Segment::cut(&episode(5), 3, 2)?;
        assert_eq!(segment.timesteps, array![2i64, 3, 4]);
        assert_eq!(segment.returns_to_go, array![102.0f32, 103.0, 104.0, 0.0]);
        Ok(())
    }

    #[test]
    fn test_cut_short_episode() -> Result<()> {
        // L = 3, si in [-2, 0]
        let ep = episode(3);
        let pads = (-2..=0)
            .map(|si| Segment::cut(&ep, 5, si).map(|s| s.pad_length()))
            .collect::<Result<Vec<_>>>()?;
        assert_eq!(pads, vec![4, 3, 2]);

        let segment = Segment::cut(&ep, 5, 0)?;
        assert_eq!(segment.mask, array![0.0f32, 0.0, 1.0, 1.0, 1.0]);
        assert_eq!(segment.timesteps, array![0i64, 0, 0, 1, 2]);
        assert_eq!(
            segment.returns_to_go,
            array![0.0f32, 0.0, 100.0, 101.0, 102.0, 0.0]
        );
        Ok(())
    }

    #[test]
    fn test_cut_out_of_range() {
        let ep = episode(5);
        assert!(Segment::cut(&ep, 3, -3).is_err());
        assert!(Segment::cut(&ep, 3, 3).is_err());
        assert!(Segment::cut(&ep, 3, -2).is_ok());
        assert!(Segment::cut(&ep, 3, 2).is_ok());
    }

    #[test]
    fn test_validate() -> Result<()> {
        let mut segment = Segment::cut(&episode(5), 3, 0)?;
        segment.returns_to_go = array![1.0f32, 2.0, 3.0];
        let err = segment.validate(3).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SegmentBufferError>(),
            Some(SegmentBufferError::ShapeInvariantViolation(_))
        ));
        Ok(())
    }
}
