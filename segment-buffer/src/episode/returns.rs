//! Returns-to-go.
use ndarray::Array1;

/// Computes the return-to-go of every step of an episode.
///
/// `rtg[t] = reward[t] + gamma * rtg[t + 1]` with `rtg[len] = 0`.
/// `gamma = 1.0` gives the undiscounted sum of future rewards.
pub fn returns_to_go(reward: &Array1<f32>, gamma: f32) -> Array1<f32> {
    let mut acc = 0f32;
    let mut rtg = reward
        .iter()
        .rev()
        .map(|r| {
            acc = r + gamma * acc;
            acc
        })
        .collect::<Vec<_>>();
    rtg.reverse();
    Array1::from(rtg)
}
