//! Batched distribution interface.

use rand::RngCore;
use sbi_core::{Device, Result, Tensor};

/// A distribution with a batch shape and an event shape, evaluated on tensors.
///
/// Values passed to [`log_prob`](Self::log_prob) have shape
/// `sample_shape ++ batch_shape ++ event_shape`; the result drops the event dims.
pub trait BatchedDistribution: Send + Sync {
    /// Shape of independent, separately evaluated instances.
    fn batch_shape(&self) -> Vec<usize>;

    /// Shape of a single jointly evaluated draw.
    fn event_shape(&self) -> Vec<usize>;

    /// Device that samples are placed on and values must live on.
    fn device(&self) -> Device;

    /// Draw `sample_shape` independent samples.
    fn sample(&self, sample_shape: &[usize], rng: &mut dyn RngCore) -> Result<Tensor>;

    /// Log-density of `value`.
    fn log_prob(&self, value: &Tensor) -> Result<Tensor>;

    /// Mean, shape `batch_shape ++ event_shape`.
    fn mean(&self) -> Result<Tensor>;

    /// Variance, shape `batch_shape ++ event_shape`.
    fn variance(&self) -> Result<Tensor>;

    /// Differential entropy, shape `batch_shape`.
    fn entropy(&self) -> Result<Tensor>;
}
