//! Bin lookup for monotonic (spline) transforms.
//!
//! Bin edges live on the last axis of a tensor. The last edge of every row is
//! nudged outward by `eps` before searching, so a query sitting exactly on the
//! upper boundary still lands in the top bin.

use sbi_core::tensor::{broadcast_shapes, broadcast_strides, contiguous_strides, numel};
use sbi_core::{Error, Result, Tensor};

/// Default outward nudge applied to the last bin edge.
pub const DEFAULT_SEARCH_EPS: f64 = 1e-6;

/// Zero-based bin index per query.
///
/// A query strictly below the first edge gets `-1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinIndices {
    shape: Vec<usize>,
    indices: Vec<i64>,
}

impl BinIndices {
    /// Shape of the query grid.
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Row-major indices.
    pub fn as_slice(&self) -> &[i64] {
        &self.indices
    }

    /// Consume into the row-major indices.
    pub fn into_vec(self) -> Vec<i64> {
        self.indices
    }
}

/// Locate the bin of every query in `inputs`.
///
/// `bin_locations` has shape `(*batch, n_edges)` with non-decreasing rows; its
/// batch dims broadcast against `inputs.shape`. The result has the broadcast
/// shape, which is `inputs.shape` in the usual case. The index is the number of
/// edges `<=` the query minus one, so a query equal to an edge belongs to the
/// bin starting there. `bin_locations` is not modified; see
/// [`searchsorted_in_place`] for the mutating variant.
pub fn searchsorted(bin_locations: &Tensor, inputs: &Tensor, eps: f64) -> Result<BinIndices> {
    let mut edges = bin_locations.clone();
    nudge_last_edge(&mut edges, eps)?;
    count_bins(&edges, inputs)
}

/// Like [`searchsorted`], but adds `eps` to the last edge of every row of
/// `bin_locations` in place before searching.
///
/// Calling this twice on the same edges nudges them twice.
pub fn searchsorted_in_place(
    bin_locations: &mut Tensor,
    inputs: &Tensor,
    eps: f64,
) -> Result<BinIndices> {
    nudge_last_edge(bin_locations, eps)?;
    count_bins(bin_locations, inputs)
}

fn edge_count(edges: &Tensor) -> Result<usize> {
    match edges.shape().last() {
        Some(&n) if n > 0 => Ok(n),
        _ => Err(Error::Shape(format!(
            "bin locations need a non-empty last axis, got shape {:?}",
            edges.shape()
        ))),
    }
}

fn nudge_last_edge(edges: &mut Tensor, eps: f64) -> Result<()> {
    let n = edge_count(edges)?;
    for row in edges.data_mut().chunks_exact_mut(n) {
        row[n - 1] += eps;
    }
    Ok(())
}

fn count_bins(edges: &Tensor, inputs: &Tensor) -> Result<BinIndices> {
    edges.ensure_same_device(inputs)?;
    let n_edges = edge_count(edges)?;
    let edge_batch = &edges.shape()[..edges.ndim() - 1];
    let out_shape = broadcast_shapes(inputs.shape(), edge_batch)?;

    let in_strides = broadcast_strides(inputs.shape(), &out_shape);
    let edge_strides: Vec<usize> =
        broadcast_strides(edge_batch, &out_shape).into_iter().map(|s| s * n_edges).collect();
    let out_strides = contiguous_strides(&out_shape);

    let total = numel(&out_shape);
    let mut indices = Vec::with_capacity(total);
    for linear in 0..total {
        let mut in_off = 0usize;
        let mut edge_off = 0usize;
        let mut rem = linear;
        for d in 0..out_shape.len() {
            let idx = rem / out_strides[d];
            rem %= out_strides[d];
            in_off += idx * in_strides[d];
            edge_off += idx * edge_strides[d];
        }
        let x = inputs.data()[in_off];
        let row = &edges.data()[edge_off..edge_off + n_edges];
        let below = row.iter().filter(|&&edge| x >= edge).count();
        indices.push(below as i64 - 1);
    }

    Ok(BinIndices { shape: out_shape, indices })
}
