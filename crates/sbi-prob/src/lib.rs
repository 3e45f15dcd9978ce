//! Batched distributions used as simulation-based-inference priors.
//!
//! The main type is [`BoxUniform`], a uniform prior over a box that can be
//! relocated between devices in place. It is composed from [`Uniform`] and
//! [`Independent`], both usable on their own through [`BatchedDistribution`].

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod box_uniform;
pub mod checks;
pub mod distribution;
pub mod independent;
pub mod uniform;

pub use box_uniform::{BoxUniform, BoxUniformOptions};
pub use checks::check_prior_on_device;
pub use distribution::BatchedDistribution;
pub use independent::Independent;
pub use uniform::Uniform;
