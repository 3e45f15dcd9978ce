//! Opt-in finiteness assertions for pipeline checkpoints.
//!
//! Nothing else in the workspace checks for NaN/Inf on its own.

use sbi_core::{Error, Result, Tensor};

/// Fail if `quantity` contains any NaN or +/-Inf.
pub fn assert_all_finite(quantity: &Tensor, description: &str) -> Result<()> {
    if quantity.data().iter().all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(Error::NonFinite(format!("NaN/Inf present in {description}.")))
    }
}

/// Fail if `quantity` contains any NaN or +Inf. `-Inf` is allowed (e.g. log-densities).
pub fn assert_not_nan_or_plus_inf(quantity: &Tensor, description: &str) -> Result<()> {
    let bad = quantity.data().iter().any(|&v| v.is_nan() || v == f64::INFINITY);
    if bad {
        Err(Error::NonFinite(format!("NaN/ +Inf present in {description}.")))
    } else {
        Ok(())
    }
}
