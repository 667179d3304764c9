//! # localfit
//!
//! Non-parametric smoothing and regression toolkit built from three
//! pieces that share one hard problem — fitting smooth functions from
//! scalar or vector data via weighted least squares or kernel linear
//! systems:
//!
//! - a locally-weighted regression (LOESS) primitive,
//! - a seasonal-trend decomposition (STL) driven by that primitive, and
//! - a Gaussian kernel ridge regression estimator.
//!
//! All components operate on plain in-memory arrays. Dataset loading,
//! train/test splitting, and metric reporting live with the caller.

// Allow some clippy warnings for cleaner code in specific cases
#![allow(clippy::upper_case_acronyms)]
#![allow(clippy::needless_range_loop)]

pub mod error;
pub mod models;
pub mod seasonality;
pub mod smoothing;
pub mod utils;

pub use error::{FitError, Result};

pub mod prelude {
    pub use crate::error::{FitError, Result};
    pub use crate::models::{Estimator, KernelRidgeRegressor};
    pub use crate::seasonality::{Decomposition, STL};
    pub use crate::smoothing::loess;
}
