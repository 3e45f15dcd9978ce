//! Small numeric helpers used around density estimators.

use nalgebra::DMatrix;
use rand::Rng;
use rand_distr::StandardNormal;
use sbi_core::tensor::numel;
use sbi_core::{Error, Result, Tensor};

/// Default sigmoid saturation target for [`temperature_for_max`].
pub const DEFAULT_TEMPERATURE_BOUND: f64 = 1.0 - 1e-3;

/// `ln(2π)`
const LN_2PI: f64 = 1.837_877_066_409_345_5;

/// Sum over every dimension except the first `num_batch_dims`.
///
/// With `num_batch_dims == x.ndim()` there is nothing to reduce and `x` is returned as is.
pub fn sum_except_batch(x: &Tensor, num_batch_dims: usize) -> Result<Tensor> {
    if num_batch_dims > x.ndim() {
        return Err(Error::Shape(format!(
            "number of batch dims ({num_batch_dims}) exceeds tensor rank ({})",
            x.ndim()
        )));
    }
    let batch_shape = x.shape()[..num_batch_dims].to_vec();
    let block = numel(&x.shape()[num_batch_dims..]);
    let sums: Vec<f64> = if block == 0 {
        vec![0.0; numel(&batch_shape)]
    } else {
        x.data().chunks_exact(block).map(|c| c.iter().sum()).collect()
    };
    Ok(Tensor::new(sums, batch_shape)?.with_device(x.device()))
}

/// Elementwise real cube root (negative inputs give negative roots).
pub fn cbrt(x: &Tensor) -> Tensor {
    x.map(f64::cbrt)
}

/// `ln|det(x)|` of a square matrix. Singular matrices give `-inf`.
pub fn logabsdet(x: &Tensor) -> Result<f64> {
    let (n, m) = match x.shape() {
        &[n, m] => (n, m),
        other => {
            return Err(Error::Validation(format!("logabsdet needs a 2-D matrix, got {other:?}")));
        }
    };
    if n != m {
        return Err(Error::Validation(format!("logabsdet needs a square matrix, got {n}x{m}")));
    }
    let lu = DMatrix::from_row_slice(n, n, x.data()).lu();
    Ok(lu.u().diagonal().iter().map(|d| d.abs().ln()).sum())
}

/// Random `size x size` orthogonal matrix: Q factor of a standard-normal matrix.
pub fn random_orthogonal<R: Rng + ?Sized>(size: usize, rng: &mut R) -> Result<Tensor> {
    let g = DMatrix::<f64>::from_fn(size, size, |_, _| rng.sample(StandardNormal));
    let q = g.qr().q();
    // nalgebra is column-major; tensors are row-major.
    let q = &q;
    let data: Vec<f64> = (0..size).flat_map(|i| (0..size).map(move |j| q[(i, j)])).collect();
    Tensor::new(data, vec![size, size])
}

/// Temperature `t` with `sigmoid(t * max_value) = bound`, capped at 1.
pub fn temperature_for_max(max_value: f64, bound: f64) -> Result<f64> {
    if !max_value.is_finite() || max_value <= 0.0 {
        return Err(Error::Validation(format!(
            "max_value must be finite and > 0, got {max_value}"
        )));
    }
    if !(bound > 0.0 && bound < 1.0) {
        return Err(Error::Validation(format!("bound must lie in (0, 1), got {bound}")));
    }
    let t = -(1.0 / max_value) * ((-bound).ln_1p() - bound.ln());
    Ok(t.min(1.0))
}

/// Log-density of a Gaussian KDE built on `samples` (shape `(N, D)`), evaluated at `query`.
///
/// The bandwidth follows Scott's rule, `N^(-1/(D+4))`, with an isotropic kernel.
/// A query of shape `(D,)` gives a 0-dim result; `(M, D)` gives one value per row.
///
/// Rows of an `(M, D)` query are independent evaluation points. They are not
/// paired elementwise with `samples` and pooled into a single log-sum-exp, so an
/// `(N, D)` query does not collapse to one scalar.
pub fn gaussian_kde_log_eval(samples: &Tensor, query: &Tensor) -> Result<Tensor> {
    let (n, d) = match samples.shape() {
        &[n, d] if n > 0 => (n, d),
        other => {
            return Err(Error::Validation(format!(
                "KDE samples must have shape (N > 0, D), got {other:?}"
            )));
        }
    };
    samples.ensure_same_device(query)?;
    let (out_shape, n_queries) = match query.shape() {
        &[qd] if qd == d => (Vec::new(), 1),
        &[m, qd] if qd == d => (vec![m], m),
        other => {
            return Err(Error::Shape(format!(
                "query shape {other:?} does not match sample dimension {d}"
            )));
        }
    };

    let n_f = n as f64;
    let d_f = d as f64;
    let std = n_f.powf(-1.0 / (d_f + 4.0));
    let precision = 1.0 / (std * std);
    let norm = -n_f.ln() - 0.5 * d_f * LN_2PI - d_f * std.ln();

    let mut out = Vec::with_capacity(n_queries);
    let mut terms = vec![0.0; n];
    for q in query.data().chunks_exact(d.max(1)).take(n_queries) {
        for (term, s) in terms.iter_mut().zip(samples.data().chunks_exact(d.max(1))) {
            let sq: f64 = q.iter().zip(s).map(|(a, b)| (a - b) * (a - b)).sum();
            *term = -0.5 * precision * sq + norm;
        }
        out.push(log_sum_exp(&terms));
    }
    Ok(Tensor::new(out, out_shape)?.with_device(query.device()))
}

fn log_sum_exp(xs: &[f64]) -> f64 {
    let max = xs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() {
        return max;
    }
    max + xs.iter().map(|&x| (x - max).exp()).sum::<f64>().ln()
}

/// Total number of scalar parameters held by `params`.
pub fn num_parameters<'a, I>(params: I) -> usize
where
    I: IntoIterator<Item = &'a Tensor>,
{
    params.into_iter().map(Tensor::numel).sum()
}
