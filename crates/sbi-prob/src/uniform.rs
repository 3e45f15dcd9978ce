//! Elementwise uniform distribution over `[low, high)`.

use rand::{Rng, RngCore};
use sbi_core::tensor::numel;
use sbi_core::{Device, Error, Result, Tensor};

use crate::distribution::BatchedDistribution;

/// Batch of independent scalar uniforms, one per element of `low` / `high`.
///
/// Bounds are not validated: `low <= high` is expected but not checked.
#[derive(Debug, Clone, PartialEq)]
pub struct Uniform {
    low: Tensor,
    high: Tensor,
}

impl Uniform {
    /// Bounds must share shape and device.
    pub fn new(low: Tensor, high: Tensor) -> Result<Self> {
        low.ensure_same_device(&high)?;
        if low.shape() != high.shape() {
            return Err(Error::Shape(format!(
                "low and high must have the same shape, got {:?} and {:?}",
                low.shape(),
                high.shape()
            )));
        }
        Ok(Self { low, high })
    }

    /// Inclusive lower bounds.
    pub fn low(&self) -> &Tensor {
        &self.low
    }

    /// Exclusive upper bounds.
    pub fn high(&self) -> &Tensor {
        &self.high
    }

    fn widths(&self) -> impl Iterator<Item = f64> + '_ {
        self.low.data().iter().zip(self.high.data()).map(|(lo, hi)| hi - lo)
    }
}

/// One draw from `[lo, hi)`.
///
/// `lo + u * (hi - lo)` can round up to `hi` when the interval is narrow next to
/// `|lo|`; such draws are rejected. A degenerate interval (`lo >= hi`) yields `lo`.
fn draw_half_open(lo: f64, hi: f64, rng: &mut dyn RngCore) -> f64 {
    let width = hi - lo;
    loop {
        let u: f64 = rng.random();
        let v = lo + u * width;
        if v < hi || lo >= hi {
            return v;
        }
    }
}

/// Fail unless `value` lives on `device` and ends with `trailing`.
pub(crate) fn check_value(value: &Tensor, device: Device, trailing: &[usize]) -> Result<()> {
    if value.device() != device {
        return Err(Error::DeviceMismatch { expected: device, actual: value.device() });
    }
    let shape = value.shape();
    if shape.len() < trailing.len() || &shape[shape.len() - trailing.len()..] != trailing {
        return Err(Error::Shape(format!(
            "value of shape {shape:?} does not end with the distribution shape {trailing:?}"
        )));
    }
    Ok(())
}

impl BatchedDistribution for Uniform {
    fn batch_shape(&self) -> Vec<usize> {
        self.low.shape().to_vec()
    }

    fn event_shape(&self) -> Vec<usize> {
        Vec::new()
    }

    fn device(&self) -> Device {
        self.low.device()
    }

    fn sample(&self, sample_shape: &[usize], rng: &mut dyn RngCore) -> Result<Tensor> {
        let n = numel(sample_shape);
        let mut data = Vec::with_capacity(n * self.low.numel());
        for _ in 0..n {
            for (&lo, &hi) in self.low.data().iter().zip(self.high.data()) {
                data.push(draw_half_open(lo, hi, rng));
            }
        }
        let shape: Vec<usize> = sample_shape.iter().chain(self.low.shape()).copied().collect();
        Ok(Tensor::new(data, shape)?.with_device(self.device()))
    }

    fn log_prob(&self, value: &Tensor) -> Result<Tensor> {
        check_value(value, self.device(), self.low.shape())?;
        let k = self.low.numel();
        let neg_log_width: Vec<f64> = self.widths().map(|w| -w.ln()).collect();
        let mut out = Vec::with_capacity(value.numel());
        if k > 0 {
            for chunk in value.data().chunks_exact(k) {
                for (i, &x) in chunk.iter().enumerate() {
                    let inside = self.low.data()[i] <= x && x < self.high.data()[i];
                    out.push(if inside { neg_log_width[i] } else { f64::NEG_INFINITY });
                }
            }
        }
        Ok(Tensor::new(out, value.shape().to_vec())?.with_device(value.device()))
    }

    fn mean(&self) -> Result<Tensor> {
        self.low.zip_map(&self.high, |lo, hi| 0.5 * (lo + hi))
    }

    fn variance(&self) -> Result<Tensor> {
        self.low.zip_map(&self.high, |lo, hi| (hi - lo) * (hi - lo) / 12.0)
    }

    fn entropy(&self) -> Result<Tensor> {
        self.low.zip_map(&self.high, |lo, hi| (hi - lo).ln())
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use statrs::distribution::Continuous;

    use super::*;

    fn unit_pair() -> Uniform {
        Uniform::new(Tensor::from_vec(vec![0.0, -1.0]), Tensor::from_vec(vec![2.0, 1.0])).unwrap()
    }

    #[test]
    fn test_log_prob_matches_statrs() {
        let u = unit_pair();
        let lp = u.log_prob(&Tensor::from_vec(vec![0.5, 0.0])).unwrap();
        let reference = statrs::distribution::Uniform::new(0.0, 2.0).unwrap();
        assert_relative_eq!(lp.data()[0], reference.ln_pdf(0.5), epsilon = 1e-12);
        assert_relative_eq!(lp.data()[1], -(2.0f64.ln()), epsilon = 1e-12);
    }

    #[test]
    fn test_log_prob_outside_support_is_neg_inf() {
        let u = unit_pair();
        let lp = u.log_prob(&Tensor::from_vec(vec![2.0, -1.0])).unwrap();
        // high is exclusive, low is inclusive
        assert_eq!(lp.data()[0], f64::NEG_INFINITY);
        assert_relative_eq!(lp.data()[1], -(2.0f64.ln()), epsilon = 1e-12);
    }

    #[test]
    fn test_sample_shape_and_range() {
        let u = unit_pair();
        let mut rng = StdRng::seed_from_u64(11);
        let s = u.sample(&[100], &mut rng).unwrap();
        assert_eq!(s.shape(), &[100, 2]);
        for row in s.data().chunks_exact(2) {
            assert!((0.0..2.0).contains(&row[0]));
            assert!((-1.0..1.0).contains(&row[1]));
        }
    }

    #[test]
    fn test_narrow_interval_far_from_zero_stays_below_high() {
        // Width is a few ulps of 1e6, so naive scaling often rounds up to `high`.
        let u = Uniform::new(Tensor::from_vec(vec![1e6]), Tensor::from_vec(vec![1e6 + 1e-9]))
            .unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        let s = u.sample(&[10_000], &mut rng).unwrap();
        let hi = u.high().data()[0];
        assert!(s.data().iter().all(|&v| v >= 1e6 && v < hi));
        let lp = u.log_prob(&s).unwrap();
        assert!(lp.data().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_moments() {
        let u = unit_pair();
        assert_eq!(u.mean().unwrap().data(), &[1.0, 0.0]);
        assert_relative_eq!(u.variance().unwrap().data()[0], 4.0 / 12.0, epsilon = 1e-12);
        assert_relative_eq!(u.entropy().unwrap().data()[1], 2.0f64.ln(), epsilon = 1e-12);
    }

    #[test]
    fn test_shape_and_device_checks() {
        assert!(Uniform::new(Tensor::zeros(&[2]), Tensor::zeros(&[3])).is_err());
        let gpu = Tensor::zeros(&[2]).with_device(Device::Cuda(0));
        assert!(matches!(
            Uniform::new(Tensor::zeros(&[2]), gpu),
            Err(Error::DeviceMismatch { .. })
        ));
        assert!(unit_pair().log_prob(&Tensor::zeros(&[3])).is_err());
    }
}
