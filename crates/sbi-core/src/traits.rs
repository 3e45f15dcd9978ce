//! Core traits for sbi
//!
//! Device resolution is a seam: code that places tensors or priors depends on
//! [`DeviceResolver`], not on a concrete backend probe.

use crate::Result;
use crate::device::Device;

/// Maps user-facing device tokens onto concrete, usable devices.
pub trait DeviceResolver: Send + Sync {
    /// Map `"cpu"`, `"gpu"`, `"cuda"`, `"cuda:N"`, `"mps"`, ... to a validated device.
    ///
    /// Fails with [`crate::Error::DeviceUnavailable`] if an accelerator class was
    /// requested that is not present.
    fn resolve_device(&self, token: &str) -> Result<Device>;

    /// Check that `device` can actually be used.
    fn validate_device(&self, device: Device) -> Result<()>;

    /// Whether any accelerator is present.
    fn gpu_available(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct OnlyCpu;

    impl DeviceResolver for OnlyCpu {
        fn resolve_device(&self, token: &str) -> Result<Device> {
            let device: Device = token.parse()?;
            self.validate_device(device)?;
            Ok(device)
        }

        fn validate_device(&self, device: Device) -> Result<()> {
            if device.is_accelerator() {
                return Err(crate::Error::DeviceUnavailable(device.to_string()));
            }
            Ok(())
        }

        fn gpu_available(&self) -> bool {
            false
        }
    }

    #[test]
    fn test_resolver_is_object_safe() {
        let resolver: &dyn DeviceResolver = &OnlyCpu;
        assert_eq!(resolver.resolve_device("cpu").unwrap(), Device::Cpu);
        assert!(resolver.resolve_device("cuda:0").is_err());
        assert!(!resolver.gpu_available());
    }
}
