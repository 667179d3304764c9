//! Locally-weighted linear regression (LOESS).
//!
//! At each query point a tricube-weighted window of the nearest
//! observations is selected and a weighted linear model `y = a + b·x`
//! is fitted by solving the normal equations in closed form. Degenerate
//! windows fall back to weighted (then unweighted) means rather than
//! failing.

use crate::error::{FitError, Result};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Window distances below this are treated as zero when normalizing,
/// in which case every window point gets uniform weight.
const DEGENERATE_DISTANCE: f64 = 1e-9;

/// Relative determinant below which the 2x2 normal equations are
/// treated as singular.
const SINGULAR_DETERMINANT: f64 = 1e-12;

/// Smooth scattered observations at a set of query points.
///
/// `fraction` is the share of all observations included in each local
/// window, in `(0, 1]`; the window is clipped to at least 2 and at most
/// `n` points. Observations need not be sorted by `x` — they are sorted
/// internally. Each query point is evaluated independently.
///
/// # Arguments
/// * `y` - Observed values
/// * `x` - Observation coordinates, same length as `y`
/// * `queries` - Points at which to evaluate the local fit
/// * `fraction` - Bandwidth as a fraction of all observations
///
/// # Returns
/// One estimate per query point. With zero observations the estimates
/// are all zero.
///
/// # Example
/// ```
/// use localfit::smoothing::loess;
///
/// let x = vec![0.0, 1.0, 2.0, 3.0, 4.0];
/// let y = vec![1.0, 3.0, 5.0, 7.0, 9.0];
///
/// // Collinear data is reproduced exactly for any bandwidth.
/// let smoothed = loess(&y, &x, &x, 1.0).unwrap();
/// assert!((smoothed[2] - 5.0).abs() < 1e-8);
/// ```
pub fn loess(y: &[f64], x: &[f64], queries: &[f64], fraction: f64) -> Result<Vec<f64>> {
    if x.len() != y.len() {
        return Err(FitError::DimensionMismatch {
            expected: y.len(),
            got: x.len(),
        });
    }
    if !(fraction > 0.0 && fraction <= 1.0) {
        return Err(FitError::InvalidParameter(format!(
            "bandwidth fraction must be in (0, 1], got {fraction}"
        )));
    }

    let n = x.len();
    if n == 0 {
        return Ok(vec![0.0; queries.len()]);
    }

    // Sort observations by coordinate once up front.
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&i, &j| x[i].partial_cmp(&x[j]).unwrap_or(std::cmp::Ordering::Equal));
    let xs: Vec<f64> = order.iter().map(|&i| x[i]).collect();
    let ys: Vec<f64> = order.iter().map(|&i| y[i]).collect();

    let window = ((fraction * n as f64).ceil() as usize).min(n).max(2);

    #[cfg(feature = "parallel")]
    let estimates = queries
        .par_iter()
        .map(|&p| fit_at(&xs, &ys, window, p))
        .collect();

    #[cfg(not(feature = "parallel"))]
    let estimates = queries
        .iter()
        .map(|&p| fit_at(&xs, &ys, window, p))
        .collect();

    Ok(estimates)
}

/// Evaluate the local fit at a single query point.
fn fit_at(x: &[f64], y: &[f64], window: usize, p: f64) -> f64 {
    let n = x.len();

    // The `window` observations closest to p by absolute distance.
    // The sort is stable, so ties keep their coordinate order.
    let mut selected: Vec<usize> = (0..n).collect();
    selected.sort_by(|&i, &j| {
        let di = (x[i] - p).abs();
        let dj = (x[j] - p).abs();
        di.partial_cmp(&dj).unwrap_or(std::cmp::Ordering::Equal)
    });
    selected.truncate(window);

    let max_distance = selected
        .iter()
        .map(|&i| (x[i] - p).abs())
        .fold(0.0_f64, f64::max);

    // Tricube weights over normalized distances; uniform when the whole
    // window sits on top of the query point.
    let weights: Vec<f64> = if max_distance < DEGENERATE_DISTANCE {
        vec![1.0; selected.len()]
    } else {
        selected
            .iter()
            .map(|&i| {
                let d = (x[i] - p).abs() / max_distance;
                (1.0 - d.powi(3)).powi(3)
            })
            .collect()
    };

    // Weighted normal equations (X'WX)[a,b]' = X'Wy for y = a + b·x.
    let mut s_w = 0.0;
    let mut s_x = 0.0;
    let mut s_y = 0.0;
    let mut s_xx = 0.0;
    let mut s_xy = 0.0;
    for (w, &i) in weights.iter().zip(selected.iter()) {
        s_w += w;
        s_x += w * x[i];
        s_y += w * y[i];
        s_xx += w * x[i] * x[i];
        s_xy += w * x[i] * y[i];
    }

    // Cauchy-Schwarz keeps the determinant non-negative up to rounding;
    // relative to s_w·s_xx it measures the coordinate spread in the
    // window, so the comparison is scale-free.
    let det = s_w * s_xx - s_x * s_x;
    if det > SINGULAR_DETERMINANT * s_w * s_xx {
        let a = (s_xx * s_y - s_x * s_xy) / det;
        let b = (s_w * s_xy - s_x * s_y) / det;
        return a + b * p;
    }

    // Degenerate design (e.g. all window coordinates identical): fall
    // back to the weighted mean, or the plain mean if the weights
    // themselves have vanished.
    if s_w > DEGENERATE_DISTANCE {
        s_y / s_w
    } else {
        let sum: f64 = selected.iter().map(|&i| y[i]).sum();
        sum / selected.len() as f64
    }
}
