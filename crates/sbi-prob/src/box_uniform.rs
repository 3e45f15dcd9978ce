//! Uniform prior over an axis-aligned box.
//!
//! A plain [`Uniform`] built from length-3 bounds has batch shape `(3)` and
//! returns three log-densities per point. [`BoxUniform`] folds those dims into
//! the event, so `log_prob` returns one value per point: `-ln(prod(high - low))`
//! inside the box, `-inf` outside.
//!
//! Unlike most distributions, a `BoxUniform` can be moved to another device in
//! place with [`BoxUniform::relocate`] (or its alias [`BoxUniform::to`]).

use std::fmt;
use std::sync::Arc;

use rand::RngCore;
use sbi_core::tensor::numel;
use sbi_core::{Device, DeviceInventory, DeviceResolver, Error, Result, Tensor};
use serde::{Deserialize, Serialize};

use crate::distribution::BatchedDistribution;
use crate::independent::Independent;
use crate::uniform::{Uniform, check_value};

/// Construction options for [`BoxUniform`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoxUniformOptions {
    /// Number of trailing bound dims folded into the event (default 1).
    pub reinterpreted_batch_ndims: usize,
    /// Device token (`"cpu"`, `"gpu"`, `"cuda:1"`, ...). `None` keeps the device of `low`.
    pub device: Option<String>,
}

impl Default for BoxUniformOptions {
    fn default() -> Self {
        Self { reinterpreted_batch_ndims: 1, device: None }
    }
}

/// Independent uniforms over `[low_i, high_i)`, evaluated jointly.
///
/// `low <= high` is expected but not checked, and log-densities are computed
/// without argument validation.
#[derive(Clone)]
pub struct BoxUniform {
    low: Tensor,
    high: Tensor,
    device: Device,
    reinterpreted_batch_ndims: usize,
    dist: Independent<Uniform>,
    resolver: Arc<dyn DeviceResolver>,
}

impl BoxUniform {
    /// Box with default options, resolving devices against [`DeviceInventory::from_env`].
    pub fn new(low: Tensor, high: Tensor) -> Result<Self> {
        Self::with_options(
            low,
            high,
            BoxUniformOptions::default(),
            Arc::new(DeviceInventory::from_env()),
        )
    }

    /// Box with explicit options and device resolver.
    ///
    /// `low` and `high` must be on the same device and have the same shape. The
    /// effective device is `options.device` if given, else the device of `low`;
    /// it is resolved through `resolver` and both bounds are moved there.
    pub fn with_options(
        low: Tensor,
        high: Tensor,
        options: BoxUniformOptions,
        resolver: Arc<dyn DeviceResolver>,
    ) -> Result<Self> {
        low.ensure_same_device(&high)?;
        if low.shape() != high.shape() {
            return Err(Error::Shape(format!(
                "low and high must have the same shape, got {:?} and {:?}",
                low.shape(),
                high.shape()
            )));
        }
        let r = options.reinterpreted_batch_ndims;
        if r > low.ndim() {
            return Err(Error::Shape(format!(
                "reinterpreted_batch_ndims ({r}) exceeds the rank of the bounds ({})",
                low.ndim()
            )));
        }

        let token = options.device.unwrap_or_else(|| low.device().to_string());
        let device = resolver.resolve_device(&token)?;
        let low = low.to_device(device);
        let high = high.to_device(device);
        let dist = Independent::new(Uniform::new(low.clone(), high.clone())?, r)?;

        tracing::debug!(
            %device,
            shape = ?low.shape(),
            reinterpreted_batch_ndims = r,
            "BoxUniform created"
        );
        Ok(Self { low, high, device, reinterpreted_batch_ndims: r, dist, resolver })
    }

    /// Inclusive lower corner of the box.
    pub fn low(&self) -> &Tensor {
        &self.low
    }

    /// Exclusive upper corner of the box.
    pub fn high(&self) -> &Tensor {
        &self.high
    }

    /// Number of trailing bound dims folded into the event.
    pub fn reinterpreted_batch_ndims(&self) -> usize {
        self.reinterpreted_batch_ndims
    }

    /// Move the prior to `device` in place.
    ///
    /// Resolves the token, moves `low`/`high` and rebuilds the internal uniform
    /// composition. Every holder of this object sees the new placement. On error
    /// the prior is left untouched.
    pub fn relocate(&mut self, device: &str) -> Result<()> {
        let target = self.resolver.resolve_device(device)?;
        let low = self.low.to_device(target);
        let high = self.high.to_device(target);
        let uniform = Uniform::new(low.clone(), high.clone())?;
        let dist = Independent::new(uniform, self.reinterpreted_batch_ndims)?;

        let previous = self.device;
        self.device = target;
        self.low = low;
        self.high = high;
        self.dist = dist;
        tracing::info!(from = %previous, to = %target, "BoxUniform relocated");
        Ok(())
    }

    /// Alias for [`relocate`](Self::relocate).
    pub fn to(&mut self, device: &str) -> Result<()> {
        self.relocate(device)
    }

    /// Whether each joint draw in `value` lies inside the box.
    ///
    /// One entry per element of `value.shape[..ndim - event_rank]`, row-major.
    pub fn support_contains(&self, value: &Tensor) -> Result<Vec<bool>> {
        check_value(value, self.device, self.low.shape())?;
        let event_shape = self.event_shape();
        let draws = numel(&value.shape()[..value.ndim() - event_shape.len()]);
        let k = self.low.numel();
        if k == 0 {
            return Ok(vec![true; draws]);
        }
        let event = numel(&event_shape);
        let inside: Vec<bool> = value
            .data()
            .chunks_exact(k)
            .flat_map(|row| {
                row.iter()
                    .zip(self.low.data().iter().zip(self.high.data()))
                    .map(|(&x, (&lo, &hi))| lo <= x && x < hi)
            })
            .collect();
        Ok(inside.chunks_exact(event).map(|c| c.iter().all(|&b| b)).collect())
    }
}

impl fmt::Debug for BoxUniform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoxUniform")
            .field("low", &self.low.data())
            .field("high", &self.high.data())
            .field("shape", &self.low.shape())
            .field("device", &self.device)
            .field("reinterpreted_batch_ndims", &self.reinterpreted_batch_ndims)
            .finish_non_exhaustive()
    }
}

impl BatchedDistribution for BoxUniform {
    fn batch_shape(&self) -> Vec<usize> {
        self.dist.batch_shape()
    }

    fn event_shape(&self) -> Vec<usize> {
        self.dist.event_shape()
    }

    fn device(&self) -> Device {
        self.device
    }

    fn sample(&self, sample_shape: &[usize], rng: &mut dyn RngCore) -> Result<Tensor> {
        self.dist.sample(sample_shape, rng)
    }

    fn log_prob(&self, value: &Tensor) -> Result<Tensor> {
        self.dist.log_prob(value)
    }

    fn mean(&self) -> Result<Tensor> {
        self.dist.mean()
    }

    fn variance(&self) -> Result<Tensor> {
        self.dist.variance()
    }

    fn entropy(&self) -> Result<Tensor> {
        self.dist.entropy()
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    fn cpu_only() -> Arc<dyn DeviceResolver> {
        Arc::new(DeviceInventory::cpu_only())
    }

    fn with_cuda() -> Arc<dyn DeviceResolver> {
        Arc::new(DeviceInventory { cuda: vec![0, 1], current_cuda: 0, mps: false })
    }

    fn unit_square(resolver: Arc<dyn DeviceResolver>) -> BoxUniform {
        BoxUniform::with_options(
            Tensor::zeros(&[2]),
            Tensor::full(&[2], 1.0),
            BoxUniformOptions::default(),
            resolver,
        )
        .unwrap()
    }

    #[test]
    fn test_shapes_default_reinterpretation() {
        let prior = unit_square(cpu_only());
        assert!(prior.batch_shape().is_empty());
        assert_eq!(prior.event_shape(), vec![2]);
        assert_eq!(prior.device(), Device::Cpu);
    }

    #[test]
    fn test_log_prob_interior_is_zero_on_unit_box() {
        let prior = unit_square(cpu_only());
        let lp = prior.log_prob(&Tensor::from_vec(vec![0.3, 0.7])).unwrap();
        assert_eq!(lp.ndim(), 0);
        assert_relative_eq!(lp.data()[0], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_log_prob_scales_with_volume() {
        let prior = BoxUniform::with_options(
            Tensor::from_vec(vec![0.0, -1.0, 10.0]),
            Tensor::from_vec(vec![2.0, 1.0, 14.0]),
            BoxUniformOptions::default(),
            cpu_only(),
        )
        .unwrap();
        let lp = prior.log_prob(&Tensor::from_vec(vec![1.0, 0.0, 12.0])).unwrap();
        assert_relative_eq!(lp.data()[0], -(16.0f64.ln()), epsilon = 1e-12);
    }

    #[test]
    fn test_mismatched_bound_devices_fail() {
        let err = BoxUniform::with_options(
            Tensor::zeros(&[2]),
            Tensor::full(&[2], 1.0).with_device(Device::Cuda(0)),
            BoxUniformOptions::default(),
            with_cuda(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            Error::DeviceMismatch { expected: Device::Cpu, actual: Device::Cuda(0) }
        ));
    }

    #[test]
    fn test_device_inferred_from_low() {
        let prior = BoxUniform::with_options(
            Tensor::zeros(&[2]).with_device(Device::Cuda(1)),
            Tensor::full(&[2], 1.0).with_device(Device::Cuda(1)),
            BoxUniformOptions::default(),
            with_cuda(),
        )
        .unwrap();
        assert_eq!(prior.device(), Device::Cuda(1));
        assert_eq!(prior.low().device(), Device::Cuda(1));
    }

    #[test]
    fn test_explicit_device_wins_and_moves_bounds() {
        let options = BoxUniformOptions { device: Some("gpu".into()), ..Default::default() };
        let prior = BoxUniform::with_options(
            Tensor::zeros(&[2]),
            Tensor::full(&[2], 1.0),
            options,
            with_cuda(),
        )
        .unwrap();
        assert_eq!(prior.device(), Device::Cuda(0));
        assert_eq!(prior.high().device(), Device::Cuda(0));
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(prior.sample(&[3], &mut rng).unwrap().device(), Device::Cuda(0));
    }

    #[test]
    fn test_gpu_request_without_accelerator_propagates() {
        let options = BoxUniformOptions { device: Some("gpu".into()), ..Default::default() };
        let err = BoxUniform::with_options(
            Tensor::zeros(&[2]),
            Tensor::full(&[2], 1.0),
            options,
            cpu_only(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::DeviceUnavailable(_)));
    }

    #[test]
    fn test_shape_preconditions() {
        assert!(matches!(
            BoxUniform::with_options(
                Tensor::zeros(&[2]),
                Tensor::zeros(&[3]),
                BoxUniformOptions::default(),
                cpu_only()
            ),
            Err(Error::Shape(_))
        ));
        let options = BoxUniformOptions { reinterpreted_batch_ndims: 2, ..Default::default() };
        assert!(matches!(
            BoxUniform::with_options(Tensor::zeros(&[2]), Tensor::zeros(&[2]), options, cpu_only()),
            Err(Error::Shape(_))
        ));
    }

    #[test]
    fn test_log_prob_rejects_value_on_other_device() {
        let prior = unit_square(cpu_only());
        let x = Tensor::from_vec(vec![0.5, 0.5]).with_device(Device::Cuda(0));
        assert!(matches!(prior.log_prob(&x), Err(Error::DeviceMismatch { .. })));
    }

    #[test]
    fn test_relocate_updates_state_in_place() {
        let mut prior = unit_square(with_cuda());
        prior.relocate("cuda:1").unwrap();
        assert_eq!(prior.device(), Device::Cuda(1));
        assert_eq!(prior.low().device(), Device::Cuda(1));
        assert_eq!(prior.high().device(), Device::Cuda(1));

        let x = Tensor::from_vec(vec![0.5, 0.5]).with_device(Device::Cuda(1));
        assert_relative_eq!(prior.log_prob(&x).unwrap().data()[0], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_failed_relocation_leaves_prior_untouched() {
        let mut prior = unit_square(cpu_only());
        assert!(prior.to("gpu").is_err());
        assert_eq!(prior.device(), Device::Cpu);
        assert_eq!(prior.low().device(), Device::Cpu);
    }

    #[test]
    fn test_support_contains() {
        let prior = unit_square(cpu_only());
        let x = Tensor::from_rows(&[vec![0.5, 0.5], vec![1.0, 0.5], vec![0.0, 0.0]]).unwrap();
        assert_eq!(prior.support_contains(&x).unwrap(), vec![true, false, true]);
    }

    #[test]
    fn test_support_contains_empty_box_has_one_flag_per_draw() {
        let prior = BoxUniform::with_options(
            Tensor::zeros(&[0]),
            Tensor::zeros(&[0]),
            BoxUniformOptions::default(),
            cpu_only(),
        )
        .unwrap();
        let x = Tensor::zeros(&[5, 0]);
        assert_eq!(prior.log_prob(&x).unwrap().shape(), &[5]);
        assert_eq!(prior.support_contains(&x).unwrap(), vec![true; 5]);
    }

    #[test]
    fn test_samples_of_narrow_distant_box_have_finite_log_prob() {
        let prior = BoxUniform::with_options(
            Tensor::from_vec(vec![1e6, -3.0]),
            Tensor::from_vec(vec![1e6 + 1e-9, 3.0]),
            BoxUniformOptions::default(),
            cpu_only(),
        )
        .unwrap();
        let theta = prior.sample(&[10_000], &mut StdRng::seed_from_u64(0)).unwrap();
        assert!(prior.support_contains(&theta).unwrap().iter().all(|&inside| inside));
        let lp = prior.log_prob(&theta).unwrap();
        assert!(lp.data().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_options_from_json() {
        let options: BoxUniformOptions = serde_json::from_str(r#"{"device": "cpu"}"#).unwrap();
        assert_eq!(options.reinterpreted_batch_ndims, 1);
        assert_eq!(options.device.as_deref(), Some("cpu"));
    }
}
