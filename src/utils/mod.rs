//! Shared numeric utilities.

pub mod linalg;

pub use linalg::{dot, solve_pseudo_inverse, solve_symmetric, symmetric_eigen};
