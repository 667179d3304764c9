//! Scatterplot smoothing primitives.
//!
//! The LOESS routine here is the smoothing engine behind the
//! seasonal-trend decomposition in [`crate::seasonality`], and is
//! usable on its own for trend extraction from scattered data.

mod loess;

pub use loess::loess;
