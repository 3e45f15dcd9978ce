//! Error types for sbi

use thiserror::Error;

use crate::device::Device;

/// sbi error type
#[derive(Error, Debug)]
pub enum Error {
    /// Argument has the wrong kind of value (non-positive count, unknown token).
    #[error("Invalid argument `{name}`: {reason} (got {value})")]
    InvalidArgument {
        /// Name of the offending argument.
        name: &'static str,
        /// Rendered value that was passed.
        value: String,
        /// What the argument must satisfy.
        reason: &'static str,
    },

    /// Shapes cannot be reshaped, broadcast or indexed as requested.
    #[error("Shape error: {0}")]
    Shape(String),

    /// Operands live on different devices.
    #[error(
        "Expected all tensors to be on the same device, but found at least two devices, {expected} and {actual}"
    )]
    DeviceMismatch {
        /// Device the operation expected.
        expected: Device,
        /// Device that was found instead.
        actual: Device,
    },

    /// A requested device is not present or cannot be used.
    #[error("Device unavailable: {0}")]
    DeviceUnavailable(String),

    /// NaN or Inf found by an explicit finiteness assertion.
    #[error("Non-finite values: {0}")]
    NonFinite(String),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),
}

impl Error {
    /// Shorthand for [`Error::InvalidArgument`].
    pub fn invalid_argument(
        name: &'static str,
        value: impl std::fmt::Display,
        reason: &'static str,
    ) -> Self {
        Self::InvalidArgument { name, value: value.to_string(), reason }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
