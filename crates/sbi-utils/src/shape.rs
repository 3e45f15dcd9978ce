//! Batch-first shape canonicalization.
//!
//! Parameters (`theta`) and observations (`x`) reach density estimators in a
//! batch-first layout: dimension 0 is always the batch, even when it has size 1.
//! Everything here is pure; count arguments are validated before any data is
//! touched.

use sbi_core::tensor::numel;
use sbi_core::{Error, IntoTensor, Result, Tensor};

fn require_positive(name: &'static str, value: usize) -> Result<()> {
    if value == 0 {
        return Err(Error::invalid_argument(name, value, "must be a positive integer"));
    }
    Ok(())
}

/// Give a single parameter vector a batch dimension: `(n) -> (1, n)`.
///
/// Tensors with any other rank are returned unchanged, so the call is idempotent.
pub fn ensure_batched(theta: Tensor) -> Tensor {
    if theta.ndim() == 1 { theta.with_batch_dim() } else { theta }
}

/// Give a simulation output a batch dimension.
///
/// A batch dimension is prepended when the input is 1-D, or when its leading
/// dimension is larger than 1. In the latter case the leading axis is taken to be
/// part of a single observation (e.g. the rows of an image), not a batch. An input
/// whose leading dimension is exactly 1 is considered batched already.
pub fn ensure_observation_batched(x: Tensor) -> Tensor {
    match x.shape().first() {
        None => x,
        Some(&lead) if lead > 1 || x.ndim() == 1 => {
            if x.ndim() > 1 {
                tracing::debug!(
                    shape = ?x.shape(),
                    "treating leading dim as part of a single observation"
                );
            }
            x.with_batch_dim()
        }
        Some(_) => x,
    }
}

/// Return `t` unchanged if it has at least 2 dimensions, else reshape to `(1, numel)`.
pub fn at_least_2d(t: Tensor) -> Tensor {
    if t.ndim() >= 2 { t } else { t.into_row() }
}

/// Convert one tensor or raw array and apply [`at_least_2d`].
pub fn normalize_one<T: IntoTensor>(item: T) -> Result<Tensor> {
    Ok(at_least_2d(item.into_tensor()?))
}

/// Convert every item and apply [`at_least_2d`], preserving order.
pub fn normalize_many<I, T>(items: I) -> Result<Vec<Tensor>>
where
    I: IntoIterator<Item = T>,
    T: IntoTensor,
{
    items.into_iter().map(normalize_one).collect()
}

/// Prepend a batch dimension of 1 to a size with fewer than two components.
///
/// `(N) -> (1, N)`, `(1, N) -> (1, N)`, `(N, M) -> (N, M)`, `(1, N, M) -> (1, N, M)`.
pub fn maybe_add_batch_dim_to_size(shape: &[usize]) -> Vec<usize> {
    if shape.len() >= 2 {
        shape.to_vec()
    } else {
        std::iter::once(1).chain(shape.iter().copied()).collect()
    }
}

/// Reshape the leading dimension of `x` into `shape`, keeping the trailing dimensions.
pub fn split_leading_dim(x: &Tensor, shape: &[usize]) -> Result<Tensor> {
    if x.ndim() == 0 {
        return Err(Error::Shape("cannot split the leading dim of a 0-dim tensor".into()));
    }
    let new_shape: Vec<usize> = shape.iter().chain(&x.shape()[1..]).copied().collect();
    x.reshape(&new_shape)
}

/// Merge the first `num_dims` dimensions of `x` into one.
pub fn merge_leading_dims(x: &Tensor, num_dims: usize) -> Result<Tensor> {
    require_positive("num_dims", num_dims)?;
    if num_dims > x.ndim() {
        return Err(Error::Shape(format!(
            "number of leading dims ({num_dims}) can't be greater than total number of dims ({})",
            x.ndim()
        )));
    }
    let merged = numel(&x.shape()[..num_dims]);
    let new_shape: Vec<usize> =
        std::iter::once(merged).chain(x.shape()[num_dims..].iter().copied()).collect();
    x.reshape(&new_shape)
}

/// Repeat each row of `x` `num_reps` times along the leading dimension.
///
/// Row `i * num_reps + j` of the result equals row `i` of `x`.
pub fn repeat_rows(x: &Tensor, num_reps: usize) -> Result<Tensor> {
    require_positive("num_reps", num_reps)?;
    let Some((&rows, rest)) = x.shape().split_first() else {
        return Err(Error::Shape("cannot repeat rows of a 0-dim tensor".into()));
    };
    let row_len = numel(rest);

    // Expand (R, ...) to (R, num_reps, ...), then merge the first two dims.
    let mut data = Vec::with_capacity(x.numel() * num_reps);
    if row_len > 0 {
        for row in x.data().chunks_exact(row_len) {
            for _ in 0..num_reps {
                data.extend_from_slice(row);
            }
        }
    }
    let expanded_shape: Vec<usize> =
        [rows, num_reps].into_iter().chain(rest.iter().copied()).collect();
    let expanded = Tensor::new(data, expanded_shape)?.with_device(x.device());
    merge_leading_dims(&expanded, 2)
}

/// Flatten `x` and repeat every element `n` times contiguously.
///
/// The flattened vector is repeated `n` times, viewed as `(n, numel)`, transposed
/// and flattened again, so the `n` copies of element `i` end up adjacent.
pub fn tile(x: &Tensor, n: usize) -> Result<Tensor> {
    require_positive("n", n)?;
    let len = x.numel();
    let repeated = x.data().repeat(n);
    // (n, len) -> (len, n)
    let mut interleaved = vec![0.0; repeated.len()];
    for r in 0..n {
        for c in 0..len {
            interleaved[c * n + r] = repeated[r * len + c];
        }
    }
    Ok(Tensor::from_vec(interleaved).with_device(x.device()))
}

/// First row of a batch, keeping the batch dimension: `(N, M) -> (1, M)`.
///
/// An empty batch yields an empty slice.
pub fn batched_first_of_batch(t: &Tensor) -> Result<Tensor> {
    let rows = t
        .shape()
        .first()
        .copied()
        .ok_or_else(|| Error::Shape("a 0-dim tensor has no batch dimension".into()))?;
    t.narrow_leading(0, rows.min(1))
}
