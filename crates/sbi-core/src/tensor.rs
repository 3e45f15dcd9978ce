//! Dense row-major tensor with a device tag.

use crate::device::Device;
use crate::{Error, Result};

/// Row-major strides for a contiguous tensor of the given shape.
pub fn contiguous_strides(shape: &[usize]) -> Vec<usize> {
    let mut strides = vec![1usize; shape.len()];
    for i in (0..shape.len().saturating_sub(1)).rev() {
        strides[i] = strides[i + 1] * shape[i + 1];
    }
    strides
}

/// Number of elements described by `shape` (1 for a 0-dim shape).
pub fn numel(shape: &[usize]) -> usize {
    shape.iter().product()
}

/// NumPy-style broadcast of two shapes (right-aligned).
pub fn broadcast_shapes(lhs: &[usize], rhs: &[usize]) -> Result<Vec<usize>> {
    let rank = lhs.len().max(rhs.len());
    let mut out = vec![0usize; rank];
    for i in 0..rank {
        let a = if i < rank - lhs.len() { 1 } else { lhs[i - (rank - lhs.len())] };
        let b = if i < rank - rhs.len() { 1 } else { rhs[i - (rank - rhs.len())] };
        out[i] = match (a, b) {
            (a, b) if a == b => a,
            (1, b) => b,
            (a, 1) => a,
            _ => {
                return Err(Error::Shape(format!(
                    "shapes {lhs:?} and {rhs:?} are not broadcastable"
                )));
            }
        };
    }
    Ok(out)
}

/// Strides that read a tensor of `shape` as if it had `out_shape`.
///
/// Broadcast (size-1 or missing) dimensions get stride 0. `shape` must
/// broadcast into `out_shape`; see [`broadcast_shapes`].
pub fn broadcast_strides(shape: &[usize], out_shape: &[usize]) -> Vec<usize> {
    let own = contiguous_strides(shape);
    let offset = out_shape.len() - shape.len();
    (0..out_shape.len())
        .map(|i| {
            if i < offset || shape[i - offset] == 1 { 0 } else { own[i - offset] }
        })
        .collect()
}

/// Contiguous `f64` tensor.
///
/// Data always lives in host memory; `device` records where the tensor is
/// placed so operations can enforce co-location.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    data: Vec<f64>,
    shape: Vec<usize>,
    device: Device,
}

impl Tensor {
    /// Create a CPU tensor, checking that `data` fills `shape`.
    pub fn new(data: Vec<f64>, shape: Vec<usize>) -> Result<Self> {
        let expected = numel(&shape);
        if data.len() != expected {
            return Err(Error::Validation(format!(
                "data has {} elements but shape {:?} requires {}",
                data.len(),
                shape,
                expected
            )));
        }
        Ok(Self { data, shape, device: Device::Cpu })
    }

    /// 1-D CPU tensor.
    pub fn from_vec(data: Vec<f64>) -> Self {
        let shape = vec![data.len()];
        Self { data, shape, device: Device::Cpu }
    }

    /// 0-dim CPU tensor.
    pub fn scalar(value: f64) -> Self {
        Self { data: vec![value], shape: Vec::new(), device: Device::Cpu }
    }

    /// 2-D CPU tensor from equally long rows.
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self> {
        let ncols = rows.first().map_or(0, Vec::len);
        if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != ncols) {
            return Err(Error::Validation(format!(
                "row {i} has {} columns, expected {ncols}",
                row.len()
            )));
        }
        let data = rows.iter().flatten().copied().collect();
        Ok(Self { data, shape: vec![rows.len(), ncols], device: Device::Cpu })
    }

    /// Tensor filled with `value`.
    pub fn full(shape: &[usize], value: f64) -> Self {
        Self { data: vec![value; numel(shape)], shape: shape.to_vec(), device: Device::Cpu }
    }

    /// Tensor filled with zeros.
    pub fn zeros(shape: &[usize]) -> Self {
        Self::full(shape, 0.0)
    }

    /// Re-tag this tensor with `device`, consuming it.
    #[must_use]
    pub fn with_device(mut self, device: Device) -> Self {
        self.device = device;
        self
    }

    /// Copy of this tensor placed on `device`.
    pub fn to_device(&self, device: Device) -> Self {
        Self { data: self.data.clone(), shape: self.shape.clone(), device }
    }

    /// Dimension sizes, outermost first.
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Number of dimensions (0 for a scalar).
    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    /// Total number of elements.
    pub fn numel(&self) -> usize {
        self.data.len()
    }

    /// Placement tag.
    pub fn device(&self) -> Device {
        self.device
    }

    /// Row-major values.
    pub fn data(&self) -> &[f64] {
        &self.data
    }

    /// Mutable row-major values. The shape cannot change through this.
    pub fn data_mut(&mut self) -> &mut [f64] {
        &mut self.data
    }

    /// Copy the values out to a host vector.
    pub fn to_vec(&self) -> Vec<f64> {
        self.data.clone()
    }

    /// Consume the tensor, returning its values.
    pub fn into_data(self) -> Vec<f64> {
        self.data
    }

    /// Apply `f` to every element, keeping shape and device.
    #[must_use]
    pub fn map<F: Fn(f64) -> f64>(&self, f: F) -> Self {
        let data = self.data.iter().map(|&v| f(v)).collect();
        Self { data, shape: self.shape.clone(), device: self.device }
    }

    /// Combine two same-shaped, co-located tensors elementwise.
    pub fn zip_map<F: Fn(f64, f64) -> f64>(&self, other: &Tensor, f: F) -> Result<Self> {
        self.ensure_same_device(other)?;
        if self.shape != other.shape {
            return Err(Error::Shape(format!(
                "elementwise op needs equal shapes, got {:?} and {:?}",
                self.shape, other.shape
            )));
        }
        let data = self.data.iter().zip(&other.data).map(|(&a, &b)| f(a, b)).collect();
        Ok(Self { data, shape: self.shape.clone(), device: self.device })
    }

    /// Same data viewed with a new shape. Element counts must match.
    pub fn reshape(&self, shape: &[usize]) -> Result<Self> {
        if numel(shape) != self.numel() {
            return Err(Error::Shape(format!(
                "cannot reshape tensor of shape {:?} ({} elements) into {:?}",
                self.shape,
                self.numel(),
                shape
            )));
        }
        Ok(Self { data: self.data.clone(), shape: shape.to_vec(), device: self.device })
    }

    /// Prepend a size-1 batch dimension.
    #[must_use]
    pub fn with_batch_dim(mut self) -> Self {
        self.shape.insert(0, 1);
        self
    }

    /// View as a 1-D tensor.
    #[must_use]
    pub fn flatten(mut self) -> Self {
        self.shape = vec![self.data.len()];
        self
    }

    /// View as a single row of shape `(1, numel)`.
    #[must_use]
    pub fn into_row(mut self) -> Self {
        self.shape = vec![1, self.data.len()];
        self
    }

    /// Insert a size-1 dimension at `dim`.
    pub fn unsqueeze(&self, dim: usize) -> Result<Self> {
        if dim > self.ndim() {
            return Err(Error::Shape(format!(
                "cannot unsqueeze dim {dim} of a {}-dim tensor",
                self.ndim()
            )));
        }
        let mut shape = self.shape.clone();
        shape.insert(dim, 1);
        Ok(Self { data: self.data.clone(), shape, device: self.device })
    }

    /// Rows `start..start + len` along dimension 0.
    pub fn narrow_leading(&self, start: usize, len: usize) -> Result<Self> {
        let Some(&rows) = self.shape.first() else {
            return Err(Error::Shape("cannot slice a 0-dim tensor".into()));
        };
        if start + len > rows {
            return Err(Error::Shape(format!(
                "slice {start}..{} out of range for leading dim {rows}",
                start + len
            )));
        }
        let row = numel(&self.shape[1..]);
        let mut shape = self.shape.clone();
        shape[0] = len;
        let data = self.data[start * row..(start + len) * row].to_vec();
        Ok(Self { data, shape, device: self.device })
    }

    /// Element at a multi-index.
    pub fn get(&self, index: &[usize]) -> Result<f64> {
        if index.len() != self.ndim() {
            return Err(Error::Shape(format!(
                "index rank {} does not match tensor rank {}",
                index.len(),
                self.ndim()
            )));
        }
        let strides = contiguous_strides(&self.shape);
        let mut linear = 0usize;
        for (dim, ((&idx, &size), &stride)) in
            index.iter().zip(&self.shape).zip(&strides).enumerate()
        {
            if idx >= size {
                return Err(Error::Shape(format!(
                    "index {idx} out of bounds at dim {dim} with size {size}"
                )));
            }
            linear += idx * stride;
        }
        Ok(self.data[linear])
    }

    /// Fail unless `other` lives on the same device as `self`.
    pub fn ensure_same_device(&self, other: &Tensor) -> Result<Device> {
        if self.device != other.device {
            return Err(Error::DeviceMismatch { expected: self.device, actual: other.device });
        }
        Ok(self.device)
    }
}

/// Conversion of raw numeric data into a [`Tensor`].
pub trait IntoTensor {
    /// Perform the conversion, failing if the data does not fit its shape.
    fn into_tensor(self) -> Result<Tensor>;
}

impl IntoTensor for Tensor {
    fn into_tensor(self) -> Result<Tensor> {
        Ok(self)
    }
}

impl IntoTensor for &Tensor {
    fn into_tensor(self) -> Result<Tensor> {
        Ok(self.clone())
    }
}

impl IntoTensor for f64 {
    fn into_tensor(self) -> Result<Tensor> {
        Ok(Tensor::scalar(self))
    }
}

impl IntoTensor for Vec<f64> {
    fn into_tensor(self) -> Result<Tensor> {
        Ok(Tensor::from_vec(self))
    }
}

impl IntoTensor for &[f64] {
    fn into_tensor(self) -> Result<Tensor> {
        Ok(Tensor::from_vec(self.to_vec()))
    }
}

/// Flat data plus shape, e.g. an array exported from another library.
impl IntoTensor for (Vec<f64>, Vec<usize>) {
    fn into_tensor(self) -> Result<Tensor> {
        Tensor::new(self.0, self.1)
    }
}

impl From<Vec<f64>> for Tensor {
    fn from(data: Vec<f64>) -> Self {
        Self::from_vec(data)
    }
}
