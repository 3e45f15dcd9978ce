//! Core types for the sbi numerical plumbing.
//!
//! - [`Tensor`]: dense row-major `f64` data with a shape and a device tag
//! - [`Device`], [`DeviceInventory`] and the [`DeviceResolver`] seam
//! - the crate-wide [`Error`] / [`Result`]

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod device;
pub mod error;
pub mod tensor;
pub mod traits;

pub use device::{Device, DeviceInventory};
pub use error::{Error, Result};
pub use tensor::{IntoTensor, Tensor};
pub use traits::DeviceResolver;

/// Workspace version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
