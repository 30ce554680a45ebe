use crate::error::{SizerError, SizerResult};
use nalgebra::{DMatrix, DVector};

/// Full quadratic in `n` normalised variables: `1, xᵢ, xᵢ²` and, when
/// enabled, every `xᵢxⱼ` with `i < j`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuadraticBasis {
    pub dim: usize,
    pub interactions: bool,
}

impl QuadraticBasis {
    pub fn new(dim: usize, interaction_limit: usize) -> Self {
        Self {
            dim,
            interactions: dim <= interaction_limit,
        }
    }

    pub fn term_count(&self) -> usize {
        let n = self.dim;
        let cross = if self.interactions { n * n.saturating_sub(1) / 2 } else { 0 };
        1 + 2 * n + cross
    }

    pub fn features(&self, x: &[f64]) -> Vec<f64> {
        let n = self.dim;
        let mut f = Vec::with_capacity(self.term_count());
        f.push(1.0);
        f.extend_from_slice(&x[..n]);
        f.extend(x[..n].iter().map(|v| v * v));
        if self.interactions {
            for i in 0..n {
                for j in (i + 1)..n {
                    f.push(x[i] * x[j]);
                }
            }
        }
        f
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResponseSurface {
    basis: QuadraticBasis,
    coeffs: DVector<f64>,
}

impl ResponseSurface {
    /// Least-squares fit via SVD. Needs at least as many points as terms.
    pub fn fit(basis: QuadraticBasis, xs: &[Vec<f64>], ys: &[f64]) -> SizerResult<Self> {
        let p = basis.term_count();
        let m = xs.len();
        if m < p || ys.len() != m {
            return Err(SizerError::Numerical(format!(
                "response surface needs {} points, got {}",
                p, m
            )));
        }
        let rows: Vec<Vec<f64>> = xs.iter().map(|x| basis.features(x)).collect();
        let a = DMatrix::from_fn(m, p, |i, j| rows[i][j]);
        let b = DVector::from_column_slice(ys);
        let coeffs = a
            .svd(true, true)
            .solve(&b, 1e-12)
            .map_err(|e| SizerError::Numerical(e.to_string()))?;
        if coeffs.iter().any(|c| !c.is_finite()) {
            return Err(SizerError::Numerical("non-finite surface coefficient".into()));
        }
        Ok(Self { basis, coeffs })
    }

    pub fn basis(&self) -> QuadraticBasis {
        self.basis
    }

    pub fn predict(&self, x: &[f64]) -> f64 {
        self.basis
            .features(x)
            .iter()
            .zip(self.coeffs.iter())
            .map(|(f, c)| f * c)
            .sum()
    }

    pub fn gradient(&self, x: &[f64]) -> Vec<f64> {
        let n = self.basis.dim;
        let c = &self.coeffs;
        let mut g: Vec<f64> = (0..n).map(|i| c[1 + i] + 2.0 * c[1 + n + i] * x[i]).collect();
        if self.basis.interactions {
            let mut k = 1 + 2 * n;
            for i in 0..n {
                for j in (i + 1)..n {
                    g[i] += c[k] * x[j];
                    g[j] += c[k] * x[i];
                    k += 1;
                }
            }
        }
        g
    }
}

/// Trust-region subproblem: minimise predicted weight subject to predicted
/// RF ≥ target inside `[lo, hi]`.
pub struct TrustRegionProblem<'a> {
    pub weight: &'a ResponseSurface,
    pub rf: &'a ResponseSurface,
    pub target_rf: f64,
    pub penalty: f64,
    pub weight_scale: f64,
    pub lo: Vec<f64>,
    pub hi: Vec<f64>,
}

impl TrustRegionProblem<'_> {
    fn merit(&self, x: &[f64]) -> f64 {
        let deficit = (self.target_rf - self.rf.predict(x)).max(0.0);
        self.weight.predict(x) / self.weight_scale + self.penalty * deficit * deficit
    }

    fn merit_gradient(&self, x: &[f64]) -> Vec<f64> {
        let deficit = (self.target_rf - self.rf.predict(x)).max(0.0);
        let gw = self.weight.gradient(x);
        let gr = self.rf.gradient(x);
        gw.iter()
            .zip(&gr)
            .map(|(w, r)| w / self.weight_scale - 2.0 * self.penalty * deficit * r)
            .collect()
    }

    fn project(&self, x: &mut [f64]) {
        for ((v, lo), hi) in x.iter_mut().zip(&self.lo).zip(&self.hi) {
            *v = v.clamp(*lo, *hi);
        }
    }

    /// Projected descent along the normalised gradient with an adaptive step.
    pub fn solve(&self, start: &[f64], max_iter: usize) -> SizerResult<Vec<f64>> {
        let mut x = start.to_vec();
        self.project(&mut x);
        let mut fx = self.merit(&x);
        let mut step = self
            .lo
            .iter()
            .zip(&self.hi)
            .map(|(l, h)| h - l)
            .fold(0.0, f64::max)
            * 0.5;

        for _ in 0..max_iter {
            let g = self.merit_gradient(&x);
            let norm = g.iter().map(|v| v * v).sum::<f64>().sqrt();
            if !norm.is_finite() {
                return Err(SizerError::Numerical("non-finite merit gradient".into()));
            }
            if norm < 1e-12 || step < 1e-9 {
                break;
            }
            let mut cand: Vec<f64> = x.iter().zip(&g).map(|(v, gi)| v - step * gi / norm).collect();
            self.project(&mut cand);
            let fc = self.merit(&cand);
            if fc < fx {
                x = cand;
                fx = fc;
                step *= 1.2;
            } else {
                step *= 0.5;
            }
        }

        if x.iter().all(|v| v.is_finite()) && fx.is_finite() {
            Ok(x)
        } else {
            Err(SizerError::Numerical("trust-region solve diverged".into()))
        }
    }
}
