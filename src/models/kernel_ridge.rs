//! Gaussian-kernel ridge regression.
//!
//! Training data is stored verbatim at fit time; every prediction
//! rebuilds the kernel values against it and solves the regularized
//! kernel system for the dual coefficients.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{FitError, Result};
use crate::models::Estimator;
use crate::utils::linalg::{dot, solve_pseudo_inverse, solve_symmetric};

/// Kernel ridge regression with a Gaussian radial basis function.
///
/// The kernel is `k(u, v) = exp(-γ‖u − v‖²)` with `γ = 1/(2σ²)`. With
/// `lambda = 0` (the default) the model performs plain kernel
/// regression and interpolates distinct training points exactly.
///
/// # Example
/// ```
/// use localfit::models::{Estimator, KernelRidgeRegressor};
///
/// let x = vec![vec![0.0], vec![1.0], vec![2.0]];
/// let y = vec![0.0, 1.0, 4.0];
///
/// let mut model = KernelRidgeRegressor::new(1.0);
/// model.fit(&x, &y).unwrap();
///
/// let predictions = model.predict(&x).unwrap();
/// assert!((predictions[1] - 1.0).abs() < 1e-6);
/// ```
#[derive(Debug)]
pub struct KernelRidgeRegressor {
    /// RBF bandwidth (σ > 0).
    sigma: f64,
    /// L2 regularization strength (λ ≥ 0).
    lambda: f64,
    /// Training features, retained for prediction.
    x_train: Option<Vec<Vec<f64>>>,
    /// Training targets.
    y_train: Option<Vec<f64>>,
    /// Whether the last predict had to fall back to the pseudo-inverse.
    ill_conditioned: AtomicBool,
}

impl KernelRidgeRegressor {
    /// Create a new model with the given RBF bandwidth and no
    /// regularization.
    pub fn new(sigma: f64) -> Self {
        Self {
            sigma,
            lambda: 0.0,
            x_train: None,
            y_train: None,
            ill_conditioned: AtomicBool::new(false),
        }
    }

    /// Set the L2 regularization strength (λ ≥ 0).
    pub fn with_lambda(mut self, lambda: f64) -> Self {
        self.lambda = lambda;
        self
    }

    /// Get the RBF bandwidth.
    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    /// Get the regularization strength.
    pub fn lambda(&self) -> f64 {
        self.lambda
    }

    /// Whether the most recent `predict` found the kernel system
    /// singular and recovered via the pseudo-inverse.
    pub fn ill_conditioned(&self) -> bool {
        self.ill_conditioned.load(Ordering::Relaxed)
    }

    fn gamma(&self) -> f64 {
        1.0 / (2.0 * self.sigma * self.sigma)
    }

    /// Kernel value for a single pair of feature vectors.
    pub fn kernel(&self, u: &[f64], v: &[f64]) -> Result<f64> {
        if u.len() != v.len() {
            return Err(FitError::DimensionMismatch {
                expected: u.len(),
                got: v.len(),
            });
        }
        let squared: f64 = u
            .iter()
            .zip(v.iter())
            .map(|(a, b)| (a - b) * (a - b))
            .sum();
        Ok((-self.gamma() * squared).exp())
    }

    /// Full pairwise kernel matrix between two row sets.
    ///
    /// Squared distances are expanded as
    /// `‖x_i − x_j‖² = ‖x_i‖² + ‖x_j‖² − 2·x_i·x_j`, with negative
    /// rounding artifacts clamped to zero before exponentiation.
    pub fn kernel_matrix(&self, a: &[Vec<f64>], b: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
        let width_a = Self::validated_width(a)?;
        let width_b = Self::validated_width(b)?;
        if !a.is_empty() && !b.is_empty() && width_a != width_b {
            return Err(FitError::DimensionMismatch {
                expected: width_a,
                got: width_b,
            });
        }

        let gamma = self.gamma();
        let a_norms: Vec<f64> = a.iter().map(|row| dot(row, row)).collect();
        let b_norms: Vec<f64> = b.iter().map(|row| dot(row, row)).collect();

        let mut kernel = vec![vec![0.0; b.len()]; a.len()];
        for (i, row_a) in a.iter().enumerate() {
            for (j, row_b) in b.iter().enumerate() {
                let squared = (a_norms[i] + b_norms[j] - 2.0 * dot(row_a, row_b)).max(0.0);
                kernel[i][j] = (-gamma * squared).exp();
            }
        }

        Ok(kernel)
    }

    /// Check that every row of a matrix has the same width.
    fn validated_width(x: &[Vec<f64>]) -> Result<usize> {
        let width = x.first().map_or(0, Vec::len);
        for row in x {
            if row.len() != width {
                return Err(FitError::DimensionMismatch {
                    expected: width,
                    got: row.len(),
                });
            }
        }
        Ok(width)
    }
}

impl Clone for KernelRidgeRegressor {
    fn clone(&self) -> Self {
        Self {
            sigma: self.sigma,
            lambda: self.lambda,
            x_train: self.x_train.clone(),
            y_train: self.y_train.clone(),
            ill_conditioned: AtomicBool::new(self.ill_conditioned.load(Ordering::Relaxed)),
        }
    }
}

impl Estimator for KernelRidgeRegressor {
    fn fit(&mut self, x: &[Vec<f64>], y: &[f64]) -> Result<()> {
        if self.sigma <= 0.0 || !self.sigma.is_finite() {
            return Err(FitError::InvalidParameter(format!(
                "sigma must be positive, got {}",
                self.sigma
            )));
        }
        if self.lambda < 0.0 || !self.lambda.is_finite() {
            return Err(FitError::InvalidParameter(format!(
                "lambda must be non-negative, got {}",
                self.lambda
            )));
        }
        if x.len() != y.len() {
            return Err(FitError::DimensionMismatch {
                expected: x.len(),
                got: y.len(),
            });
        }
        Self::validated_width(x)?;

        self.x_train = Some(x.to_vec());
        self.y_train = Some(y.to_vec());
        self.ill_conditioned.store(false, Ordering::Relaxed);
        Ok(())
    }

    fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<f64>> {
        let x_train = self.x_train.as_ref().ok_or(FitError::FitRequired)?;
        let y_train = self.y_train.as_ref().ok_or(FitError::FitRequired)?;

        let test_width = Self::validated_width(x)?;
        if x_train.is_empty() {
            return Ok(vec![0.0; x.len()]);
        }
        if !x.is_empty() && test_width != x_train[0].len() {
            return Err(FitError::DimensionMismatch {
                expected: x_train[0].len(),
                got: test_width,
            });
        }

        let kernel_test = self.kernel_matrix(x, x_train)?;
        let mut kernel_train = self.kernel_matrix(x_train, x_train)?;
        for (i, row) in kernel_train.iter_mut().enumerate() {
            row[i] += self.lambda;
        }

        let alpha = match solve_symmetric(&kernel_train, y_train) {
            Some(alpha) => {
                self.ill_conditioned.store(false, Ordering::Relaxed);
                alpha
            }
            None => {
                // Singular kernel system: recover with the
                // pseudo-inverse and leave a queryable flag.
                self.ill_conditioned.store(true, Ordering::Relaxed);
                solve_pseudo_inverse(&kernel_train, y_train)
            }
        };

        Ok(kernel_test.iter().map(|row| dot(row, &alpha)).collect())
    }

    fn is_fitted(&self) -> bool {
        self.x_train.is_some()
    }

    fn name(&self) -> &str {
        "KernelRidgeRegressor"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn training_grid() -> (Vec<Vec<f64>>, Vec<f64>) {
        let x: Vec<Vec<f64>> = (0..8)
            .map(|i| vec![i as f64, (i % 3) as f64])
            .collect();
        let y: Vec<f64> = x.iter().map(|row| row[0] * 2.0 - row[1]).collect();
        (x, y)
    }

    #[test]
    fn interpolates_training_points_without_regularization() {
        let (x, y) = training_grid();

        let mut model = KernelRidgeRegressor::new(1.5);
        model.fit(&x, &y).unwrap();

        let predictions = model.predict(&x).unwrap();
        for (prediction, target) in predictions.iter().zip(y.iter()) {
            assert_relative_eq!(*prediction, *target, epsilon = 1e-6);
        }
        assert!(!model.ill_conditioned());
    }

    #[test]
    fn regularization_shrinks_toward_smoothness() {
        let (x, y) = training_grid();

        let mut exact = KernelRidgeRegressor::new(1.5);
        exact.fit(&x, &y).unwrap();
        let mut ridged = KernelRidgeRegressor::new(1.5).with_lambda(10.0);
        ridged.fit(&x, &y).unwrap();

        let exact_error: f64 = exact
            .predict(&x)
            .unwrap()
            .iter()
            .zip(y.iter())
            .map(|(p, t)| (p - t).powi(2))
            .sum();
        let ridged_error: f64 = ridged
            .predict(&x)
            .unwrap()
            .iter()
            .zip(y.iter())
            .map(|(p, t)| (p - t).powi(2))
            .sum();

        assert!(exact_error < 1e-8);
        assert!(ridged_error > exact_error);
    }

    #[test]
    fn duplicate_training_points_trigger_pseudo_inverse() {
        let x = vec![vec![0.0], vec![1.0], vec![1.0], vec![3.0]];
        let y = vec![0.0, 2.0, 2.0, 6.0];

        let mut model = KernelRidgeRegressor::new(1.0);
        model.fit(&x, &y).unwrap();

        let predictions = model.predict(&x).unwrap();
        assert!(model.ill_conditioned());

        // The duplicated rows are consistent, so the least-squares
        // solution still reproduces their target.
        assert_relative_eq!(predictions[1], 2.0, epsilon = 1e-6);
        assert_relative_eq!(predictions[2], 2.0, epsilon = 1e-6);
    }

    #[test]
    fn kernel_matrix_is_symmetric_with_unit_diagonal() {
        let (x, _) = training_grid();
        let model = KernelRidgeRegressor::new(2.0);

        let kernel = model.kernel_matrix(&x, &x).unwrap();
        for i in 0..x.len() {
            assert_relative_eq!(kernel[i][i], 1.0, epsilon = 1e-12);
            for j in 0..x.len() {
                assert_relative_eq!(kernel[i][j], kernel[j][i], epsilon = 1e-12);
                assert!(kernel[i][j] > 0.0 && kernel[i][j] <= 1.0);
            }
        }
    }

    #[test]
    fn kernel_value_matches_matrix_entry() {
        let model = KernelRidgeRegressor::new(0.8);
        let u = vec![1.0, 2.0];
        let v = vec![-0.5, 0.25];

        let value = model.kernel(&u, &v).unwrap();
        let matrix = model
            .kernel_matrix(&[u.clone()], &[v.clone()])
            .unwrap();
        assert_relative_eq!(value, matrix[0][0], epsilon = 1e-12);
    }

    #[test]
    fn kernel_rejects_mismatched_vectors() {
        let model = KernelRidgeRegressor::new(1.0);
        assert!(model.kernel(&[1.0, 2.0], &[1.0]).is_err());
    }

    #[test]
    fn predict_before_fit_is_an_error() {
        let model = KernelRidgeRegressor::new(1.0);
        assert!(matches!(
            model.predict(&[vec![1.0]]),
            Err(FitError::FitRequired)
        ));
    }

    #[test]
    fn empty_training_set_predicts_zero() {
        let mut model = KernelRidgeRegressor::new(1.0);
        model.fit(&[], &[]).unwrap();

        let predictions = model.predict(&[vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
        assert_eq!(predictions, vec![0.0, 0.0]);
    }

    #[test]
    fn row_count_mismatch_is_rejected() {
        let mut model = KernelRidgeRegressor::new(1.0);
        let x = vec![vec![1.0], vec![2.0]];
        let y = vec![1.0];
        assert!(matches!(
            model.fit(&x, &y),
            Err(FitError::DimensionMismatch { expected: 2, got: 1 })
        ));
    }

    #[test]
    fn ragged_training_matrix_is_rejected() {
        let mut model = KernelRidgeRegressor::new(1.0);
        let x = vec![vec![1.0, 2.0], vec![3.0]];
        let y = vec![1.0, 2.0];
        assert!(model.fit(&x, &y).is_err());
    }

    #[test]
    fn test_width_mismatch_is_rejected() {
        let mut model = KernelRidgeRegressor::new(1.0);
        let x = vec![vec![1.0, 2.0], vec![3.0, 4.0]];
        let y = vec![1.0, 2.0];
        model.fit(&x, &y).unwrap();

        assert!(model.predict(&[vec![1.0]]).is_err());
    }

    #[test]
    fn invalid_hyperparameters_are_rejected() {
        let x = vec![vec![1.0]];
        let y = vec![1.0];

        let mut zero_sigma = KernelRidgeRegressor::new(0.0);
        assert!(zero_sigma.fit(&x, &y).is_err());

        let mut negative_lambda = KernelRidgeRegressor::new(1.0).with_lambda(-0.5);
        assert!(negative_lambda.fit(&x, &y).is_err());
    }

    #[test]
    fn accessors_report_hyperparameters() {
        let model = KernelRidgeRegressor::new(2.5).with_lambda(0.1);
        assert_relative_eq!(model.sigma(), 2.5);
        assert_relative_eq!(model.lambda(), 0.1);
        assert_eq!(model.name(), "KernelRidgeRegressor");
    }

    #[test]
    fn clone_preserves_trained_state() {
        let (x, y) = training_grid();
        let mut model = KernelRidgeRegressor::new(1.5);
        model.fit(&x, &y).unwrap();

        let cloned = model.clone();
        let original = model.predict(&x).unwrap();
        let from_clone = cloned.predict(&x).unwrap();
        for (a, b) in original.iter().zip(from_clone.iter()) {
            assert_relative_eq!(*a, *b, epsilon = 1e-12);
        }
    }
}
