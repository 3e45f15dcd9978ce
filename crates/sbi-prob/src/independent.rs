//! Reinterpret trailing batch dimensions of a distribution as event dimensions.

use rand::RngCore;
use sbi_core::tensor::numel;
use sbi_core::{Device, Error, Result, Tensor};

use crate::distribution::BatchedDistribution;

/// Wraps `base` so that its last `reinterpreted_batch_ndims` batch dims become
/// event dims: `log_prob` sums over them and returns one value per joint draw.
#[derive(Debug, Clone, PartialEq)]
pub struct Independent<D> {
    base: D,
    reinterpreted_batch_ndims: usize,
}

impl<D: BatchedDistribution> Independent<D> {
    /// Fails with [`Error::Shape`] if `base` has fewer batch dims than requested.
    pub fn new(base: D, reinterpreted_batch_ndims: usize) -> Result<Self> {
        let batch_rank = base.batch_shape().len();
        if reinterpreted_batch_ndims > batch_rank {
            return Err(Error::Shape(format!(
                "reinterpreted_batch_ndims ({reinterpreted_batch_ndims}) exceeds the base \
                 batch rank ({batch_rank})"
            )));
        }
        Ok(Self { base, reinterpreted_batch_ndims })
    }

    /// The wrapped distribution.
    pub fn base(&self) -> &D {
        &self.base
    }

    /// Number of batch dims folded into the event.
    pub fn reinterpreted_batch_ndims(&self) -> usize {
        self.reinterpreted_batch_ndims
    }
}

/// Sum the last `n` dims of `t`.
fn sum_rightmost(t: Tensor, n: usize) -> Result<Tensor> {
    if n == 0 {
        return Ok(t);
    }
    let keep = t.ndim() - n;
    let out_shape = t.shape()[..keep].to_vec();
    let block = numel(&t.shape()[keep..]);
    let sums: Vec<f64> = if block == 0 {
        vec![0.0; numel(&out_shape)]
    } else {
        t.data().chunks_exact(block).map(|c| c.iter().sum()).collect()
    };
    Ok(Tensor::new(sums, out_shape)?.with_device(t.device()))
}

impl<D: BatchedDistribution> BatchedDistribution for Independent<D> {
    fn batch_shape(&self) -> Vec<usize> {
        let batch = self.base.batch_shape();
        batch[..batch.len() - self.reinterpreted_batch_ndims].to_vec()
    }

    fn event_shape(&self) -> Vec<usize> {
        let batch = self.base.batch_shape();
        let mut event = batch[batch.len() - self.reinterpreted_batch_ndims..].to_vec();
        event.extend(self.base.event_shape());
        event
    }

    fn device(&self) -> Device {
        self.base.device()
    }

    fn sample(&self, sample_shape: &[usize], rng: &mut dyn RngCore) -> Result<Tensor> {
        self.base.sample(sample_shape, rng)
    }

    fn log_prob(&self, value: &Tensor) -> Result<Tensor> {
        sum_rightmost(self.base.log_prob(value)?, self.reinterpreted_batch_ndims)
    }

    fn mean(&self) -> Result<Tensor> {
        self.base.mean()
    }

    fn variance(&self) -> Result<Tensor> {
        self.base.variance()
    }

    fn entropy(&self) -> Result<Tensor> {
        sum_rightmost(self.base.entropy()?, self.reinterpreted_batch_ndims)
    }
}
