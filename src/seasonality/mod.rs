//! Seasonal-trend decomposition.
//!
//! This module separates an equally spaced series into seasonal, trend,
//! and residual components using repeated LOESS smoothing passes.

mod stl;

pub use stl::{Decomposition, STL};
