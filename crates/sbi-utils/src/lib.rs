//! Numerical plumbing around sbi density estimators.
//!
//! - [`shape`]: batch-first canonicalization of parameters and observations
//! - [`masks`]: binary masks for coupling layers
//! - [`search`]: bin lookup for spline transforms
//! - [`checks`]: opt-in NaN/Inf assertions
//! - [`numeric`]: small numeric helpers (KDE log-eval, log|det|, ...)

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod checks;
pub mod masks;
pub mod numeric;
pub mod search;
pub mod shape;

pub use checks::{assert_all_finite, assert_not_nan_or_plus_inf};
pub use masks::{
    BinaryMask, MaskStrategy, create_alternating_binary_mask, create_mid_split_binary_mask,
    create_random_binary_mask,
};
pub use search::{BinIndices, DEFAULT_SEARCH_EPS, searchsorted, searchsorted_in_place};
pub use shape::{
    at_least_2d, batched_first_of_batch, ensure_batched, ensure_observation_batched,
    maybe_add_batch_dim_to_size, merge_leading_dims, normalize_many, normalize_one, repeat_rows,
    split_leading_dim, tile,
};
