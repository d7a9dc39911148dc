//! Modified Helmholtz kernels in 2D
//!
//! Direct and accelerated evaluation of charge and dipole layer potentials for the operator
//! `Δ - k²` in the plane, together with dense kernel matrix formation.
pub mod apply;
pub mod bessel;
pub mod c_abi;
pub mod error;
pub mod far_field;
mod helpers;
pub mod modified_helmholtz_2d;
pub mod traits;
pub mod types;
