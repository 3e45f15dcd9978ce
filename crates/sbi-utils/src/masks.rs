//! Binary masks for coupling layers.
//!
//! A mask partitions `features` indices into the set a coupling transform
//! conditions on (ones) and the set it transforms (zeros).

use rand::Rng;
use rand::seq::index;
use sbi_core::{Device, Tensor};

/// A length-`features` vector of 0/1 entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BinaryMask {
    bits: Vec<u8>,
}

impl BinaryMask {
    fn zeros(features: usize) -> Self {
        Self { bits: vec![0; features] }
    }

    /// Number of features.
    pub fn len(&self) -> usize {
        self.bits.len()
    }

    /// `true` for a zero-feature mask.
    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// The raw 0/1 entries.
    pub fn as_slice(&self) -> &[u8] {
        &self.bits
    }

    /// Whether index `i` is set. Out-of-range indices are unset.
    pub fn is_set(&self, i: usize) -> bool {
        self.bits.get(i).is_some_and(|&b| b == 1)
    }

    /// Number of entries set to 1.
    pub fn count_ones(&self) -> usize {
        self.bits.iter().filter(|&&b| b == 1).count()
    }

    /// Number of entries set to 0.
    pub fn count_zeros(&self) -> usize {
        self.len() - self.count_ones()
    }

    /// Indices set to 1, ascending.
    pub fn ones(&self) -> Vec<usize> {
        self.bits.iter().enumerate().filter(|&(_, &b)| b == 1).map(|(i, _)| i).collect()
    }

    /// Indices set to 0, ascending.
    pub fn zeros_indices(&self) -> Vec<usize> {
        self.bits.iter().enumerate().filter(|&(_, &b)| b == 0).map(|(i, _)| i).collect()
    }

    /// The mask as a 1-D `f64` tensor on `device`.
    pub fn to_tensor(&self, device: Device) -> Tensor {
        Tensor::from_vec(self.bits.iter().map(|&b| f64::from(b)).collect()).with_device(device)
    }
}

/// `ceil(features / 2)`.
#[inline]
fn upper_half(features: usize) -> usize {
    features.div_ceil(2)
}

/// Ones at every other index, starting at 0 if `even` and at 1 otherwise.
pub fn create_alternating_binary_mask(features: usize, even: bool) -> BinaryMask {
    let mut mask = BinaryMask::zeros(features);
    let start = if even { 0 } else { 1 };
    for bit in mask.bits.iter_mut().skip(start).step_by(2) {
        *bit = 1;
    }
    mask
}

/// Ones on `[0, ceil(features / 2))`, zeros after.
pub fn create_mid_split_binary_mask(features: usize) -> BinaryMask {
    let mut mask = BinaryMask::zeros(features);
    mask.bits[..upper_half(features)].fill(1);
    mask
}

/// `ceil(features / 2)` ones at indices drawn uniformly without replacement.
pub fn create_random_binary_mask<R: Rng + ?Sized>(features: usize, rng: &mut R) -> BinaryMask {
    let mut mask = BinaryMask::zeros(features);
    for i in index::sample(rng, features, upper_half(features)) {
        mask.bits[i] = 1;
    }
    mask
}

/// Mask construction strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaskStrategy {
    /// [`create_alternating_binary_mask`].
    Alternating {
        /// Start at index 0 (`true`) or 1 (`false`).
        even: bool,
    },
    /// [`create_mid_split_binary_mask`].
    MidSplit,
    /// [`create_random_binary_mask`].
    Random,
}

impl MaskStrategy {
    /// Build a mask of length `features`. Only [`MaskStrategy::Random`] draws from `rng`.
    pub fn build<R: Rng + ?Sized>(self, features: usize, rng: &mut R) -> BinaryMask {
        match self {
            Self::Alternating { even } => create_alternating_binary_mask(features, even),
            Self::MidSplit => create_mid_split_binary_mask(features),
            Self::Random => create_random_binary_mask(features, rng),
        }
    }
}
