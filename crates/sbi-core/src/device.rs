//! Device tags, the device inventory, and token resolution.
//!
//! Tensors in this workspace always keep their data in host memory; a
//! [`Device`] is a placement tag that operations check for co-location. Which
//! accelerators exist is described by a [`DeviceInventory`], which is also the
//! default [`DeviceResolver`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::traits::DeviceResolver;
use crate::{Error, Result};

/// Environment variable with a comma-separated list of CUDA ordinals.
pub const ENV_CUDA_DEVICES: &str = "SBI_CUDA_DEVICES";
/// Environment variable selecting the current CUDA ordinal.
pub const ENV_CUDA_CURRENT: &str = "SBI_CUDA_CURRENT";
/// Environment variable enabling the MPS backend (`1` / `true`).
pub const ENV_MPS: &str = "SBI_MPS";

/// Backend-qualified device identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Device {
    /// Host memory.
    #[default]
    Cpu,
    /// CUDA device with the given ordinal.
    Cuda(u32),
    /// Apple Metal Performance Shaders device with the given ordinal.
    Mps(u32),
}

impl Device {
    /// `true` for any non-host device.
    pub fn is_accelerator(&self) -> bool {
        !matches!(self, Self::Cpu)
    }

    /// Backend name without the ordinal (`"cpu"`, `"cuda"`, `"mps"`).
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Cpu => "cpu",
            Self::Cuda(_) => "cuda",
            Self::Mps(_) => "mps",
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cpu => write!(f, "cpu"),
            Self::Cuda(idx) => write!(f, "cuda:{idx}"),
            Self::Mps(idx) => write!(f, "mps:{idx}"),
        }
    }
}

impl FromStr for Device {
    type Err = Error;

    /// Parses `cpu`, `cuda`, `cuda:N`, `mps`, `mps:N`. Bare backend names map to ordinal 0.
    fn from_str(s: &str) -> Result<Self> {
        let token = s.trim();
        let (kind, ordinal) = match token.split_once(':') {
            Some((kind, idx)) => {
                let idx: u32 = idx.parse().map_err(|_| {
                    Error::invalid_argument(
                        "device",
                        token,
                        "ordinal must be a non-negative integer",
                    )
                })?;
                (kind, Some(idx))
            }
            None => (token, None),
        };
        match (kind, ordinal) {
            ("cpu", None) => Ok(Self::Cpu),
            ("cuda", idx) => Ok(Self::Cuda(idx.unwrap_or(0))),
            ("mps", idx) => Ok(Self::Mps(idx.unwrap_or(0))),
            _ => Err(Error::invalid_argument(
                "device",
                token,
                "expected 'cpu', 'gpu', 'cuda[:N]' or 'mps[:N]'",
            )),
        }
    }
}

/// Accelerators visible to the process.
///
/// The default inventory is CPU only.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceInventory {
    /// CUDA ordinals that can be used.
    pub cuda: Vec<u32>,
    /// Ordinal that `gpu` and bare `cuda` resolve to.
    pub current_cuda: u32,
    /// Whether an MPS device is present.
    pub mps: bool,
}

impl DeviceInventory {
    /// Inventory with no accelerators.
    pub fn cpu_only() -> Self {
        Self::default()
    }

    /// Read the inventory from `SBI_CUDA_DEVICES`, `SBI_CUDA_CURRENT` and `SBI_MPS`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the inventory from an arbitrary key lookup (environment-shaped).
    ///
    /// Unparseable entries are skipped with a warning rather than failing the process.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut inv = Self::default();

        if let Some(raw) = lookup(ENV_CUDA_DEVICES) {
            for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
                match part.parse::<u32>() {
                    Ok(idx) => inv.cuda.push(idx),
                    Err(_) => tracing::warn!(
                        var = ENV_CUDA_DEVICES,
                        entry = part,
                        "ignoring invalid CUDA ordinal"
                    ),
                }
            }
        }
        let first_cuda = inv.cuda.first().copied().unwrap_or(0);
        inv.current_cuda = match lookup(ENV_CUDA_CURRENT) {
            Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
                tracing::warn!(
                    var = ENV_CUDA_CURRENT,
                    value = %raw,
                    "ignoring invalid CUDA ordinal"
                );
                first_cuda
            }),
            None => first_cuda,
        };
        inv.mps = lookup(ENV_MPS)
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        inv
    }

    /// Parse an inventory from JSON, e.g. `{"cuda": [0, 1], "mps": false}`.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    fn has_cuda(&self, idx: u32) -> bool {
        self.cuda.contains(&idx)
    }
}

impl DeviceResolver for DeviceInventory {
    fn resolve_device(&self, token: &str) -> Result<Device> {
        let token = token.trim();
        let device = match token {
            "cpu" => return Ok(Device::Cpu),
            "gpu" => {
                if !self.cuda.is_empty() {
                    Device::Cuda(self.current_cuda)
                } else if self.mps {
                    Device::Mps(0)
                } else {
                    return Err(Error::DeviceUnavailable(
                        "Neither CUDA nor MPS is available. Make sure the process can see a CUDA \
                         or MPS device before requesting 'gpu'."
                            .to_string(),
                    ));
                }
            }
            "cuda" => Device::Cuda(self.current_cuda),
            other => other.parse()?,
        };
        self.validate_device(device)?;
        tracing::debug!(token, %device, "resolved device");
        Ok(device)
    }

    fn validate_device(&self, device: Device) -> Result<()> {
        let ok = match device {
            Device::Cpu => true,
            Device::Cuda(idx) => self.has_cuda(idx),
            Device::Mps(idx) => self.mps && idx == 0,
        };
        if ok {
            Ok(())
        } else {
            Err(Error::DeviceUnavailable(format!(
                "Could not allocate on device {device}. Make sure the device is set up properly \
                 and that you are passing the corresponding device string. It should be \
                 something like 'cuda', 'cuda:0', or 'mps'."
            )))
        }
    }

    fn gpu_available(&self) -> bool {
        !self.cuda.is_empty() || self.mps
    }
}

/// Resolve a device token against the inventory described by the environment.
pub fn resolve_device(token: &str) -> Result<Device> {
    DeviceInventory::from_env().resolve_device(token)
}

/// Validate a device against the inventory described by the environment.
pub fn validate_device(device: Device) -> Result<()> {
    DeviceInventory::from_env().validate_device(device)
}

/// Whether the environment exposes any CUDA or MPS device.
pub fn gpu_available() -> bool {
    DeviceInventory::from_env().gpu_available()
}
