//! Logistic regression

use super::config::Solver;
use crate::error::{ChurnError, Result};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Solve symmetric positive-definite system Ax = b using Cholesky decomposition.
/// Retries once with a small ridge on the diagonal if the matrix is near-singular.
fn cholesky_solve(a: &Array2<f64>, b: &Array1<f64>) -> Option<Array1<f64>> {
    let n = a.nrows();
    if n != a.ncols() || n != b.len() {
        return None;
    }

    cholesky_solve_inner(a, b).or_else(|| {
        let mut a_reg = a.clone();
        let ridge = 1e-8 * a.diag().iter().map(|v| v.abs()).sum::<f64>() / n as f64 + 1e-12;
        for k in 0..n {
            a_reg[[k, k]] += ridge;
        }
        cholesky_solve_inner(&a_reg, b)
    })
}

fn cholesky_solve_inner(a: &Array2<f64>, b: &Array1<f64>) -> Option<Array1<f64>> {
    let n = a.nrows();
    // A = L * L^T
    let mut l = Array2::<f64>::zeros((n, n));

    for i in 0..n {
        for j in 0..=i {
            let mut sum = 0.0;
            for k in 0..j {
                sum += l[[i, k]] * l[[j, k]];
            }
            if i == j {
                let diag = a[[i, i]] - sum;
                if diag <= 0.0 || !diag.is_finite() {
                    return None;
                }
                l[[i, j]] = diag.sqrt();
            } else {
                l[[i, j]] = (a[[i, j]] - sum) / l[[j, j]];
            }
        }
    }

    // Forward substitution: L * y = b
    let mut y = Array1::<f64>::zeros(n);
    for i in 0..n {
        let mut sum = 0.0;
        for j in 0..i {
            sum += l[[i, j]] * y[j];
        }
        y[i] = (b[i] - sum) / l[[i, i]];
    }

    // Backward substitution: L^T * x = y
    let mut x = Array1::<f64>::zeros(n);
    for i in (0..n).rev() {
        let mut sum = 0.0;
        for j in (i + 1)..n {
            sum += l[[j, i]] * x[j];
        }
        x[i] = (y[i] - sum) / l[[i, i]];
    }

    Some(x)
}

fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

/// log(1 + exp(z)) without overflow
fn softplus(z: f64) -> f64 {
    if z > 0.0 {
        z + (-z).exp().ln_1p()
    } else {
        z.exp().ln_1p()
    }
}

/// L2-regularized logistic regression for binary classification.
///
/// Minimizes `C * sum(logloss) + ||w||^2 / 2` with an unpenalized intercept.
/// Internally the objective is divided by the sample count, so `tol` applies
/// to the largest per-sample gradient component. The second-order solvers
/// share a damped Newton iteration; `sag` and `saga` run full-batch gradient
/// descent with a fixed `1/L` step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticRegression {
    /// Fitted coefficients
    pub coefficients: Option<Array1<f64>>,
    /// Fitted intercept
    pub intercept: Option<f64>,
    /// Inverse regularization strength
    pub c: f64,
    pub solver: Solver,
    /// Maximum iterations
    pub max_iter: usize,
    /// Convergence tolerance
    pub tol: f64,
    /// Iterations run by the last fit
    pub n_iter: usize,
    /// Whether the last fit met `tol`
    pub converged: bool,
    /// Whether model is fitted
    pub is_fitted: bool,
}

impl Default for LogisticRegression {
    fn default() -> Self {
        Self::new()
    }
}

impl LogisticRegression {
    /// Create a new logistic regression model
    pub fn new() -> Self {
        Self {
            coefficients: None,
            intercept: None,
            c: 1.0,
            solver: Solver::Lbfgs,
            max_iter: 1000,
            tol: 1e-4,
            n_iter: 0,
            converged: false,
            is_fitted: false,
        }
    }

    /// Set inverse regularization strength
    pub fn with_c(mut self, c: f64) -> Self {
        self.c = c;
        self
    }

    pub fn with_solver(mut self, solver: Solver) -> Self {
        self.solver = solver;
        self
    }

    /// Set maximum iterations
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    /// Fit on features `x` and 0/1 labels `y`
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        let n_samples = x.nrows();
        if n_samples != y.len() {
            return Err(ChurnError::ShapeError {
                expected: format!("y length = {}", n_samples),
                actual: format!("y length = {}", y.len()),
            });
        }
        if n_samples == 0 {
            return Err(ChurnError::TrainingError("Cannot fit on zero samples".to_string()));
        }
        if y.iter().any(|v| *v != 0.0 && *v != 1.0) {
            return Err(ChurnError::TrainingError("Labels must be 0 or 1".to_string()));
        }
        if !(self.c > 0.0) {
            return Err(ChurnError::InvalidParameter {
                name: "C".to_string(),
                value: self.c.to_string(),
                reason: "must be positive".to_string(),
            });
        }

        let problem = Objective::new(x, y, self.c);
        let mut theta = Array1::<f64>::zeros(x.ncols() + 1);

        let (n_iter, converged) = if self.solver.is_second_order() {
            self.newton(&problem, &mut theta)
        } else {
            self.gradient_descent(&problem, &mut theta)
        };

        if !converged {
            warn!(
                solver = %self.solver,
                max_iter = self.max_iter,
                "Logistic regression did not converge; increase max_iter or scale the data"
            );
        }
        debug!(n_iter, converged, loss = problem.loss(&theta), "Logistic regression fitted");

        let p = x.ncols();
        self.intercept = Some(theta[p]);
        self.coefficients = Some(theta.slice_move(ndarray::s![..p]));
        self.n_iter = n_iter;
        self.converged = converged;
        self.is_fitted = true;

        Ok(self)
    }

    fn newton(&self, problem: &Objective, theta: &mut Array1<f64>) -> (usize, bool) {
        for iter in 0..self.max_iter {
            let (grad, proba) = problem.gradient(theta);
            if max_abs(&grad) <= self.tol {
                return (iter, true);
            }

            let hessian = problem.hessian(&proba);
            let direction = match cholesky_solve(&hessian, &grad) {
                Some(d) => d,
                None => grad.clone(),
            };

            // Backtracking on the objective
            let current = problem.loss(theta);
            let slope = grad.dot(&direction);
            let mut step = 1.0;
            loop {
                let candidate = &*theta - &(step * &direction);
                if problem.loss(&candidate) <= current - 1e-4 * step * slope || step < 1e-10 {
                    *theta = candidate;
                    break;
                }
                step *= 0.5;
            }
        }
        let (grad, _) = problem.gradient(theta);
        (self.max_iter, max_abs(&grad) <= self.tol)
    }

    fn gradient_descent(&self, problem: &Objective, theta: &mut Array1<f64>) -> (usize, bool) {
        let step = 1.0 / problem.lipschitz();
        for iter in 0..self.max_iter {
            let (grad, _) = problem.gradient(theta);
            if max_abs(&grad) <= self.tol {
                return (iter, true);
            }
            theta.scaled_add(-step, &grad);
        }
        let (grad, _) = problem.gradient(theta);
        (self.max_iter, max_abs(&grad) <= self.tol)
    }

    /// Raw scores `x · w + b`
    pub fn decision_function(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let coefficients = match (&self.coefficients, self.is_fitted) {
            (Some(c), true) => c,
            _ => return Err(ChurnError::ModelNotFitted),
        };
        if x.ncols() != coefficients.len() {
            return Err(ChurnError::ShapeError {
                expected: format!("{} features", coefficients.len()),
                actual: format!("{} features", x.ncols()),
            });
        }
        Ok(x.dot(coefficients) + self.intercept.unwrap_or(0.0))
    }

    /// Probability of the positive class
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        Ok(self.decision_function(x)?.mapv(sigmoid))
    }

    /// Predict class labels (positive when probability >= 0.5)
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let proba = self.predict_proba(x)?;
        Ok(proba.mapv(|p| if p >= 0.5 { 1.0 } else { 0.0 }))
    }

    /// Get accuracy score
    pub fn score(&self, x: &Array2<f64>, y: &Array1<f64>) -> Result<f64> {
        let y_pred = self.predict(x)?;
        let correct = y_pred
            .iter()
            .zip(y.iter())
            .filter(|(pred, actual)| (*pred - *actual).abs() < 0.5)
            .count();
        Ok(correct as f64 / y.len().max(1) as f64)
    }
}

fn max_abs(v: &Array1<f64>) -> f64 {
    v.iter().fold(0.0f64, |m, g| m.max(g.abs()))
}

/// Per-sample regularized log-loss over `[x, 1]`; the last parameter is the intercept
struct Objective<'a> {
    x: &'a Array2<f64>,
    y: &'a Array1<f64>,
    /// `1 / (C * n)`
    l2: f64,
}

impl<'a> Objective<'a> {
    fn new(x: &'a Array2<f64>, y: &'a Array1<f64>, c: f64) -> Self {
        Self {
            x,
            y,
            l2: 1.0 / (c * x.nrows() as f64),
        }
    }

    fn n(&self) -> f64 {
        self.x.nrows() as f64
    }

    fn margins(&self, theta: &Array1<f64>) -> Array1<f64> {
        let p = self.x.ncols();
        self.x.dot(&theta.slice(ndarray::s![..p])) + theta[p]
    }

    fn loss(&self, theta: &Array1<f64>) -> f64 {
        let p = self.x.ncols();
        let z = self.margins(theta);
        let data: f64 = z
            .iter()
            .zip(self.y.iter())
            .map(|(&z, &y)| softplus(z) - y * z)
            .sum();
        let w = theta.slice(ndarray::s![..p]);
        data / self.n() + 0.5 * self.l2 * w.dot(&w)
    }

    fn gradient(&self, theta: &Array1<f64>) -> (Array1<f64>, Array1<f64>) {
        let p = self.x.ncols();
        let proba = self.margins(theta).mapv(sigmoid);
        let residual = &proba - self.y;

        let mut grad = Array1::<f64>::zeros(p + 1);
        grad.slice_mut(ndarray::s![..p])
            .assign(&(self.x.t().dot(&residual) / self.n()));
        grad[p] = residual.sum() / self.n();
        grad.slice_mut(ndarray::s![..p])
            .scaled_add(self.l2, &theta.slice(ndarray::s![..p]));
        (grad, proba)
    }

    fn hessian(&self, proba: &Array1<f64>) -> Array2<f64> {
        let p = self.x.ncols();
        let n = self.x.nrows();
        let weights = proba.mapv(|q| q * (1.0 - q));

        let mut h = Array2::<f64>::zeros((p + 1, p + 1));
        for i in 0..n {
            let w = weights[i];
            if w == 0.0 {
                continue;
            }
            let row = self.x.row(i);
            for a in 0..p {
                let wa = w * row[a];
                for b in 0..=a {
                    h[[a, b]] += wa * row[b];
                }
                h[[p, a]] += wa;
            }
            h[[p, p]] += w;
        }
        h /= self.n();
        for a in 0..=p {
            for b in 0..a {
                h[[b, a]] = h[[a, b]];
            }
        }
        for a in 0..p {
            h[[a, a]] += self.l2;
        }
        h
    }

    /// Upper bound on the gradient's Lipschitz constant
    fn lipschitz(&self) -> f64 {
        let max_sq = self
            .x
            .axis_iter(Axis(0))
            .map(|row| row.dot(&row) + 1.0)
            .fold(0.0f64, f64::max);
        0.25 * max_sq + self.l2
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn separable() -> (Array2<f64>, Array1<f64>) {
        let x = array![
            [-2.0, 0.5],
            [-1.5, -0.3],
            [-1.0, 0.1],
            [-0.5, 0.8],
            [0.5, -0.2],
            [1.0, 0.4],
            [1.5, -0.6],
            [2.0, 0.0]
        ];
        let y = array![0.0, 0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 1.0];
        (x, y)
    }

    #[test]
    fn test_cholesky_solve() {
        let a = array![[4.0, 2.0], [2.0, 3.0]];
        let b = array![2.0, 1.0];
        let x = cholesky_solve(&a, &b).unwrap();
        assert!((x[0] - 0.5).abs() < 1e-12);
        assert!(x[1].abs() < 1e-12);
    }

    #[test]
    fn test_newton_converges() {
        let (x, y) = separable();
        let mut model = LogisticRegression::new();
        model.fit(&x, &y).unwrap();

        assert!(model.converged);
        assert!(model.coefficients.as_ref().unwrap()[0] > 0.0);
        assert!(model.score(&x, &y).unwrap() >= 0.75);
    }

    #[test]
    fn test_solvers_agree() {
        let (x, y) = separable();
        let mut newton = LogisticRegression::new().with_solver(Solver::NewtonCg);
        newton.fit(&x, &y).unwrap();
        let mut sag = LogisticRegression::new()
            .with_solver(Solver::Sag)
            .with_max_iter(20_000)
            .with_tol(1e-6);
        sag.fit(&x, &y).unwrap();

        let a = newton.predict_proba(&x).unwrap();
        let b = sag.predict_proba(&x).unwrap();
        for (pa, pb) in a.iter().zip(b.iter()) {
            assert!((pa - pb).abs() < 1e-3, "{} vs {}", pa, pb);
        }
    }

    #[test]
    fn test_stronger_regularization_shrinks_weights() {
        let (x, y) = separable();
        let mut loose = LogisticRegression::new().with_c(10.0);
        loose.fit(&x, &y).unwrap();
        let mut tight = LogisticRegression::new().with_c(0.01);
        tight.fit(&x, &y).unwrap();

        let norm = |m: &LogisticRegression| {
            let w = m.coefficients.as_ref().unwrap();
            w.dot(w)
        };
        assert!(norm(&tight) < norm(&loose));
    }

    #[test]
    fn test_predict_requires_fit() {
        let model = LogisticRegression::new();
        assert!(matches!(
            model.predict(&array![[1.0, 2.0]]),
            Err(ChurnError::ModelNotFitted)
        ));
    }

    #[test]
    fn test_rejects_non_binary_labels() {
        let x = array![[1.0], [2.0]];
        let y = array![0.0, 2.0];
        assert!(LogisticRegression::new().fit(&x, &y).is_err());
    }

    #[test]
    fn test_max_iter_reached_is_not_an_error() {
        let (x, y) = separable();
        let mut model = LogisticRegression::new().with_solver(Solver::Saga).with_max_iter(1);
        model.fit(&x, &y).unwrap();
        assert!(!model.converged);
        assert_eq!(model.n_iter, 1);
    }
}
