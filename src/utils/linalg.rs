//! Small dense linear-algebra routines shared by the estimators.
//!
//! Matrices are row-major `Vec<Vec<f64>>`. Every system solved in this
//! crate is symmetric, so a Cholesky factorization covers the
//! well-conditioned case and a Jacobi eigendecomposition provides the
//! pseudo-inverse fallback for singular systems.

/// Dot product of two equal-length slices.
#[inline]
pub fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Pivots below this fraction of the largest diagonal entry are treated
/// as zero, marking the factorization singular.
const PIVOT_TOLERANCE: f64 = 1e-12;

/// Solve the symmetric system `A @ x = b` via Cholesky decomposition.
///
/// Returns `None` when `A` is not positive definite to working
/// precision (a near-zero or negative pivot), signalling the caller to
/// take its singular-system fallback.
pub fn solve_symmetric(a: &[Vec<f64>], b: &[f64]) -> Option<Vec<f64>> {
    let n = b.len();
    if n == 0 || a.len() != n {
        return None;
    }

    let max_diag = (0..n).map(|i| a[i][i].abs()).fold(0.0_f64, f64::max);
    let pivot_floor = PIVOT_TOLERANCE * max_diag.max(1.0);

    // A = L @ L'
    let mut l = vec![vec![0.0; n]; n];
    for i in 0..n {
        for j in 0..=i {
            let mut sum = a[i][j];
            for k in 0..j {
                sum -= l[i][k] * l[j][k];
            }

            if i == j {
                if sum <= pivot_floor {
                    return None;
                }
                l[i][j] = sum.sqrt();
            } else {
                l[i][j] = sum / l[j][j];
            }
        }
    }

    // Forward substitution: L @ y = b
    let mut y = vec![0.0; n];
    for i in 0..n {
        let mut sum = b[i];
        for j in 0..i {
            sum -= l[i][j] * y[j];
        }
        y[i] = sum / l[i][i];
    }

    // Backward substitution: L' @ x = y
    let mut x = vec![0.0; n];
    for i in (0..n).rev() {
        let mut sum = y[i];
        for j in (i + 1)..n {
            sum -= l[j][i] * x[j];
        }
        x[i] = sum / l[i][i];
    }

    Some(x)
}

/// Eigendecomposition of a symmetric matrix by cyclic Jacobi rotations.
///
/// Returns `(eigenvalues, eigenvectors)` with eigenvectors stored as
/// columns: `a ≈ V @ diag(λ) @ V'`. Eigenvalues are not sorted.
pub fn symmetric_eigen(a: &[Vec<f64>]) -> (Vec<f64>, Vec<Vec<f64>>) {
    let n = a.len();
    let mut m: Vec<Vec<f64>> = a.to_vec();
    let mut v = vec![vec![0.0; n]; n];
    for (i, row) in v.iter_mut().enumerate() {
        row[i] = 1.0;
    }
    if n < 2 {
        return ((0..n).map(|i| m[i][i]).collect(), v);
    }

    let frobenius: f64 = m
        .iter()
        .flat_map(|row| row.iter())
        .map(|x| x * x)
        .sum::<f64>()
        .sqrt();
    let target = 1e-14 * frobenius.max(1.0);

    for _sweep in 0..50 {
        let mut off = 0.0;
        for i in 0..n {
            for j in (i + 1)..n {
                off += m[i][j] * m[i][j];
            }
        }
        if off.sqrt() <= target {
            break;
        }

        for p in 0..(n - 1) {
            for q in (p + 1)..n {
                let apq = m[p][q];
                if apq.abs() <= target / n as f64 {
                    continue;
                }

                // Rotation angle annihilating m[p][q].
                let theta = (m[q][q] - m[p][p]) / (2.0 * apq);
                let t = theta.signum() / (theta.abs() + (theta * theta + 1.0).sqrt());
                let c = 1.0 / (t * t + 1.0).sqrt();
                let s = t * c;

                // A <- A @ J
                for k in 0..n {
                    let mkp = m[k][p];
                    let mkq = m[k][q];
                    m[k][p] = c * mkp - s * mkq;
                    m[k][q] = s * mkp + c * mkq;
                }
                // A <- J' @ A
                for k in 0..n {
                    let mpk = m[p][k];
                    let mqk = m[q][k];
                    m[p][k] = c * mpk - s * mqk;
                    m[q][k] = s * mpk + c * mqk;
                }
                // V <- V @ J
                for k in 0..n {
                    let vkp = v[k][p];
                    let vkq = v[k][q];
                    v[k][p] = c * vkp - s * vkq;
                    v[k][q] = s * vkp + c * vkq;
                }
            }
        }
    }

    ((0..n).map(|i| m[i][i]).collect(), v)
}

/// Eigenvalues below this fraction of the largest magnitude are
/// treated as zero when inverting. Callers reach this routine only
/// after the Cholesky factorization has declared the system singular,
/// so anything near that scale is noise.
const EIGENVALUE_CUTOFF: f64 = 1e-10;

/// Solve `A @ x = b` for symmetric `A` via the Moore–Penrose
/// pseudo-inverse.
///
/// Near-zero eigenvalues are dropped, so a rank-deficient system yields
/// the minimum-norm least-squares solution instead of failing.
pub fn solve_pseudo_inverse(a: &[Vec<f64>], b: &[f64]) -> Vec<f64> {
    let n = b.len();
    let (eigenvalues, eigenvectors) = symmetric_eigen(a);

    let max_abs = eigenvalues.iter().fold(0.0_f64, |m, &e| m.max(e.abs()));
    let cutoff = max_abs * EIGENVALUE_CUTOFF;

    let mut x = vec![0.0; n];
    for (j, &lambda) in eigenvalues.iter().enumerate() {
        if lambda.abs() <= cutoff {
            continue;
        }
        // Projection of b onto the j-th eigenvector, scaled by 1/λ.
        let mut proj = 0.0;
        for k in 0..n {
            proj += eigenvectors[k][j] * b[k];
        }
        proj /= lambda;
        for k in 0..n {
            x[k] += proj * eigenvectors[k][j];
        }
    }

    x
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn dot_product() {
        assert_relative_eq!(dot(&[1.0, 2.0, 3.0], &[4.0, 5.0, 6.0]), 32.0);
        assert_relative_eq!(dot(&[], &[]), 0.0);
    }

    #[test]
    fn cholesky_solves_spd_system() {
        // A = [[4, 2], [2, 3]], b = [10, 9] -> x = [1.5, 2]
        let a = vec![vec![4.0, 2.0], vec![2.0, 3.0]];
        let b = vec![10.0, 9.0];

        let x = solve_symmetric(&a, &b).unwrap();
        assert_relative_eq!(x[0], 1.5, epsilon = 1e-10);
        assert_relative_eq!(x[1], 2.0, epsilon = 1e-10);
    }

    #[test]
    fn cholesky_rejects_singular_matrix() {
        // Rank-one matrix: second pivot collapses to zero.
        let a = vec![vec![1.0, 1.0], vec![1.0, 1.0]];
        let b = vec![2.0, 2.0];
        assert!(solve_symmetric(&a, &b).is_none());
    }

    #[test]
    fn cholesky_rejects_indefinite_matrix() {
        let a = vec![vec![-1.0, 0.0], vec![0.0, 1.0]];
        let b = vec![1.0, 1.0];
        assert!(solve_symmetric(&a, &b).is_none());
    }

    #[test]
    fn eigen_of_diagonal_matrix() {
        let a = vec![vec![3.0, 0.0], vec![0.0, 7.0]];
        let (mut eigenvalues, _) = symmetric_eigen(&a);
        eigenvalues.sort_by(|x, y| x.partial_cmp(y).unwrap());
        assert_relative_eq!(eigenvalues[0], 3.0, epsilon = 1e-10);
        assert_relative_eq!(eigenvalues[1], 7.0, epsilon = 1e-10);
    }

    #[test]
    fn eigen_reconstructs_matrix() {
        let a = vec![
            vec![2.0, 1.0, 0.0],
            vec![1.0, 3.0, 1.0],
            vec![0.0, 1.0, 2.0],
        ];
        let (eigenvalues, v) = symmetric_eigen(&a);

        // a[i][j] == sum_k λ_k v[i][k] v[j][k]
        for i in 0..3 {
            for j in 0..3 {
                let mut rebuilt = 0.0;
                for k in 0..3 {
                    rebuilt += eigenvalues[k] * v[i][k] * v[j][k];
                }
                assert_relative_eq!(rebuilt, a[i][j], epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn pseudo_inverse_matches_exact_solve_when_nonsingular() {
        let a = vec![vec![4.0, 2.0], vec![2.0, 3.0]];
        let b = vec![10.0, 9.0];

        let exact = solve_symmetric(&a, &b).unwrap();
        let pinv = solve_pseudo_inverse(&a, &b);
        assert_relative_eq!(pinv[0], exact[0], epsilon = 1e-9);
        assert_relative_eq!(pinv[1], exact[1], epsilon = 1e-9);
    }

    #[test]
    fn pseudo_inverse_solves_consistent_singular_system() {
        // Rank-one system with b in the column space: A @ x = b has
        // infinitely many solutions; the pseudo-inverse picks the
        // minimum-norm one, which still reproduces b.
        let a = vec![vec![1.0, 1.0], vec![1.0, 1.0]];
        let b = vec![2.0, 2.0];

        let x = solve_pseudo_inverse(&a, &b);
        let b0 = a[0][0] * x[0] + a[0][1] * x[1];
        let b1 = a[1][0] * x[0] + a[1][1] * x[1];
        assert_relative_eq!(b0, 2.0, epsilon = 1e-9);
        assert_relative_eq!(b1, 2.0, epsilon = 1e-9);
    }

    #[test]
    fn pseudo_inverse_of_zero_matrix_is_zero() {
        let a = vec![vec![0.0, 0.0], vec![0.0, 0.0]];
        let b = vec![1.0, -1.0];
        let x = solve_pseudo_inverse(&a, &b);
        assert_relative_eq!(x[0], 0.0);
        assert_relative_eq!(x[1], 0.0);
    }
}
