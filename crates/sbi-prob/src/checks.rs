//! Prior placement checks run before training.

use rand::RngCore;
use sbi_core::{Device, Error, Result};

use crate::distribution::BatchedDistribution;

/// Fail if samples drawn from `prior` do not land on `training_device`.
///
/// Draws a single sample and compares its device tag. A missing prior passes.
pub fn check_prior_on_device(
    training_device: Device,
    prior: Option<&dyn BatchedDistribution>,
    rng: &mut dyn RngCore,
) -> Result<()> {
    let Some(prior) = prior else {
        return Ok(());
    };
    let probe = prior.sample(&[1], rng)?;
    if probe.device() != training_device {
        tracing::warn!(
            prior = %probe.device(),
            training = %training_device,
            "prior is on the wrong device"
        );
        return Err(Error::DeviceMismatch { expected: training_device, actual: probe.device() });
    }
    Ok(())
}
