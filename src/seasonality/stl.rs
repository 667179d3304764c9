//! STL (Seasonal-Trend decomposition using LOESS).
//!
//! The series is decomposed additively: each inner pass smooths the
//! cycle-subseries of the detrended data to estimate the seasonal
//! component, removes the trend leakage that the periodic smoothing
//! picked up, and re-estimates the trend from the deseasonalized
//! series. Outer passes repeat the inner loop without re-weighting;
//! robustness weighting is intentionally not part of this decomposition
//! and every observation always carries weight 1.

use crate::error::{FitError, Result};
use crate::smoothing::loess;

/// Components of an additive decomposition.
///
/// `series[t] = seasonal[t] + trend[t] + residual[t]` for every index,
/// up to floating-point rounding.
#[derive(Debug, Clone)]
pub struct Decomposition {
    /// Seasonal component.
    pub seasonal: Vec<f64>,
    /// Trend component.
    pub trend: Vec<f64>,
    /// Residual component.
    pub residual: Vec<f64>,
}

impl Decomposition {
    /// Get the seasonal strength (0 to 1).
    /// Values close to 1 indicate strong seasonality.
    pub fn seasonal_strength(&self) -> f64 {
        let var_residual = variance(&self.residual);
        let seasonal_plus_residual: Vec<f64> = self
            .seasonal
            .iter()
            .zip(self.residual.iter())
            .map(|(s, r)| s + r)
            .collect();
        let var_sr = variance(&seasonal_plus_residual);

        if var_sr < 1e-10 {
            return 0.0;
        }

        (1.0 - var_residual / var_sr).max(0.0)
    }

    /// Get the trend strength (0 to 1).
    /// Values close to 1 indicate strong trend.
    pub fn trend_strength(&self) -> f64 {
        let var_residual = variance(&self.residual);
        let trend_plus_residual: Vec<f64> = self
            .trend
            .iter()
            .zip(self.residual.iter())
            .map(|(t, r)| t + r)
            .collect();
        let var_tr = variance(&trend_plus_residual);

        if var_tr < 1e-10 {
            return 0.0;
        }

        (1.0 - var_residual / var_tr).max(0.0)
    }
}

/// STL decomposition configuration and state.
///
/// Configuration is fixed at construction (with builder overrides);
/// `fit` populates the result, which persists until the next `fit`.
///
/// # Example
/// ```
/// use localfit::seasonality::STL;
///
/// let series: Vec<f64> = (0..48)
///     .map(|i| 0.2 * i as f64 + (2.0 * std::f64::consts::PI * i as f64 / 12.0).sin())
///     .collect();
///
/// let mut stl = STL::new(12);
/// let decomposition = stl.fit(&series).unwrap();
/// assert_eq!(decomposition.seasonal.len(), series.len());
/// ```
#[derive(Debug, Clone)]
pub struct STL {
    /// Seasonal period.
    seasonal_period: usize,
    /// Bandwidth fraction for cycle-subseries smoothing.
    seasonal_span: Option<f64>,
    /// Bandwidth fraction for trend smoothing.
    trend_span: Option<f64>,
    /// Bandwidth fraction reserved for the low-pass step.
    low_pass_span: Option<f64>,
    /// Refinement passes per outer iteration.
    inner_iterations: usize,
    /// Extra outer passes beyond the first.
    outer_iterations: usize,
    /// Result of the most recent fit.
    result: Option<Decomposition>,
}

impl STL {
    /// Create a new decomposer with the given seasonal period.
    ///
    /// Bandwidths default at fit time from the period and the series
    /// length; see the `with_*` builders for overrides.
    pub fn new(seasonal_period: usize) -> Self {
        Self {
            seasonal_period,
            seasonal_span: None,
            trend_span: None,
            low_pass_span: None,
            inner_iterations: 2,
            outer_iterations: 0,
            result: None,
        }
    }

    /// Set the cycle-subseries smoothing bandwidth, as a fraction of
    /// all points in `(0, 1]`. Defaults to `7/n`.
    pub fn with_seasonal_span(mut self, span: f64) -> Self {
        self.seasonal_span = Some(span);
        self
    }

    /// Set the trend smoothing bandwidth, as a fraction in `(0, 1]`.
    /// Defaults to the nearest odd window length at or above
    /// `1.5 × seasonal_period` (minimum 3), divided by `n`.
    pub fn with_trend_span(mut self, span: f64) -> Self {
        self.trend_span = Some(span);
        self
    }

    /// Set the low-pass bandwidth fraction. Defaults to the nearest odd
    /// window length at or above `seasonal_period` (minimum 3), divided
    /// by `n`. The value is reserved: the low-pass smoothing pass
    /// currently runs with the trend span instead, matching the
    /// behavior this decomposition is specified against.
    pub fn with_low_pass_span(mut self, span: f64) -> Self {
        self.low_pass_span = Some(span);
        self
    }

    /// Set the number of inner refinement passes (default 2).
    pub fn with_inner_iterations(mut self, n: usize) -> Self {
        self.inner_iterations = n;
        self
    }

    /// Set the number of extra outer passes (default 0). Without
    /// robustness weighting each extra pass repeats the inner loop on
    /// the already-refined components.
    pub fn with_outer_iterations(mut self, n: usize) -> Self {
        self.outer_iterations = n;
        self
    }

    /// Get the seasonal period.
    pub fn seasonal_period(&self) -> usize {
        self.seasonal_period
    }

    /// Get the result of the most recent fit.
    pub fn result(&self) -> Option<&Decomposition> {
        self.result.as_ref()
    }

    /// Decompose the series, replacing any previous result.
    pub fn fit(&mut self, series: &[f64]) -> Result<&Decomposition> {
        if self.seasonal_period == 0 {
            return Err(FitError::InvalidParameter(
                "seasonal period must be positive".to_string(),
            ));
        }
        let n = series.len();
        if n == 0 {
            return Err(FitError::EmptyData);
        }

        let seasonal_span = match self.seasonal_span {
            Some(span) => validated_span(span, "seasonal span")?,
            None => (7.0 / n as f64).min(1.0),
        };
        let trend_span = match self.trend_span {
            Some(span) => validated_span(span, "trend span")?,
            None => {
                let window = odd_window_at_least(1.5 * self.seasonal_period as f64);
                (window as f64 / n as f64).min(1.0)
            }
        };
        // The low-pass fraction mirrors the trend fraction's role but
        // the smoothing pass below runs with the trend span; see
        // `with_low_pass_span`.
        let _low_pass_span = match self.low_pass_span {
            Some(span) => validated_span(span, "low-pass span")?,
            None => {
                let window = odd_window_at_least(self.seasonal_period as f64);
                (window as f64 / n as f64).min(1.0)
            }
        };

        let index: Vec<f64> = (0..n).map(|i| i as f64).collect();
        let mut seasonal = vec![0.0; n];
        let mut trend = vec![0.0; n];
        // With zero-valued starting components the residual is the
        // series itself, keeping the additive identity even when no
        // passes run.
        let mut residual = series.to_vec();

        for _outer in 0..=self.outer_iterations {
            for _inner in 0..self.inner_iterations {
                // Step 1: Detrend
                let detrended: Vec<f64> = series
                    .iter()
                    .zip(trend.iter())
                    .map(|(y, t)| y - t)
                    .collect();

                // Step 2: Cycle-subseries smoothing
                let smoothed = self.smooth_cycle_subseries(&detrended, seasonal_span)?;

                // Step 3: Low-pass smoothing of the smoothed seasonal
                // signal, run with the trend span.
                let seasonal_trend = loess(&smoothed, &index, &index, trend_span)?;

                // Step 4: Remove trend leakage from the seasonal estimate
                for i in 0..n {
                    seasonal[i] = smoothed[i] - seasonal_trend[i];
                }

                // Step 5: Deseasonalize
                let deseasonalized: Vec<f64> = series
                    .iter()
                    .zip(seasonal.iter())
                    .map(|(y, s)| y - s)
                    .collect();

                // Step 6: Trend update
                trend = loess(&deseasonalized, &index, &index, trend_span)?;

                // Step 7: Residual
                for i in 0..n {
                    residual[i] = series[i] - seasonal[i] - trend[i];
                }
            }
        }

        Ok(self.result.insert(Decomposition {
            seasonal,
            trend,
            residual,
        }))
    }

    /// Smooth each cycle-subseries of the detrended data and scatter
    /// the results back to their original positions.
    fn smooth_cycle_subseries(&self, detrended: &[f64], span: f64) -> Result<Vec<f64>> {
        let n = detrended.len();
        let period = self.seasonal_period;
        let mut result = vec![0.0; n];

        for phase in 0..period {
            let positions: Vec<usize> = (phase..n).step_by(period).collect();
            if positions.is_empty() {
                continue;
            }

            let values: Vec<f64> = positions.iter().map(|&i| detrended[i]).collect();
            let coordinates: Vec<f64> = (0..positions.len()).map(|k| k as f64).collect();

            let smoothed = loess(&values, &coordinates, &coordinates, span)?;
            for (&position, &value) in positions.iter().zip(smoothed.iter()) {
                result[position] = value;
            }
        }

        Ok(result)
    }
}

impl Default for STL {
    fn default() -> Self {
        Self::new(12) // Monthly seasonality default
    }
}

/// Nearest odd integer at or above `len`, with a floor of 3.
fn odd_window_at_least(len: f64) -> usize {
    let mut window = len.ceil() as usize;
    if window % 2 == 0 {
        window += 1;
    }
    window.max(3)
}

/// Check that a bandwidth override is a usable fraction.
fn validated_span(span: f64, name: &str) -> Result<f64> {
    if span > 0.0 && span <= 1.0 {
        Ok(span)
    } else {
        Err(FitError::InvalidParameter(format!(
            "{name} must be in (0, 1], got {span}"
        )))
    }
}

/// Compute sample variance.
fn variance(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let mean: f64 = values.iter().sum::<f64>() / n as f64;
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64
}
