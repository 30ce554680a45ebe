use crate::config::ResponseSurfaceParams;
use crate::evaluator::EvaluationResult;
use crate::model::DesignVector;
use crate::optimizer::response_surface::{QuadraticBasis, ResponseSurface, TrustRegionProblem};
use crate::optimizer::sampling::{latin_hypercube, latin_hypercube_in_box};
use crate::optimizer::surrogate::penalised_fitness;
use crate::optimizer::{Proposal, Strategy, StrategyContext, TrainingSample};
use crate::util::{euclidean, seeded_rng};
use fastrand::Rng;
use std::collections::VecDeque;
use tracing::{debug, info, warn};

/// Solves without a usable step before falling back to a sample.
const MAX_STEP_ATTEMPTS: usize = 32;

#[derive(Debug, Clone)]
struct PendingCheck {
    x: Vec<f64>,
    rf: f64,
    weight: f64,
}

/// Quadratic response surfaces for RF and weight, optimised inside an
/// adaptive trust region around the best sample.
pub struct TrustRegion {
    params: ResponseSurfaceParams,
    rng: Rng,
    samples: Vec<TrainingSample>,
    queue: VecDeque<Vec<f64>>,
    surfaces: Option<(ResponseSurface, ResponseSurface)>,
    needs_refit: bool,
    radius: f64,
    pending: Option<PendingCheck>,
    started: bool,
    numerical_failures: usize,
}

impl TrustRegion {
    pub fn new(params: ResponseSurfaceParams, seed: Option<u64>) -> Self {
        let radius = params.rsm_trust_radius;
        Self {
            params,
            rng: seeded_rng(seed),
            samples: Vec::new(),
            queue: VecDeque::new(),
            surfaces: None,
            needs_refit: true,
            radius,
            pending: None,
            started: false,
            numerical_failures: 0,
        }
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    fn refit(&mut self, basis: QuadraticBasis) -> bool {
        let xs: Vec<Vec<f64>> = self.samples.iter().map(|s| s.x.clone()).collect();
        let rf: Vec<f64> = self.samples.iter().map(|s| s.min_rf).collect();
        let w: Vec<f64> = self.samples.iter().map(|s| s.weight).collect();
        match (
            ResponseSurface::fit(basis, &xs, &rf),
            ResponseSurface::fit(basis, &xs, &w),
        ) {
            (Ok(rf), Ok(w)) => {
                self.surfaces = Some((rf, w));
                self.needs_refit = false;
                debug!("Response surfaces refitted on {} samples", xs.len());
                true
            }
            (Err(e), _) | (_, Err(e)) => {
                self.numerical_failures += 1;
                warn!("Response surface fit failed: {}", e);
                false
            }
        }
    }

    fn center(&self, target: f64) -> Option<Vec<f64>> {
        self.samples
            .iter()
            .min_by(|a, b| {
                let fa = penalised_fitness(a.weight, a.min_rf, target, self.params.rsm_penalty);
                let fb = penalised_fitness(b.weight, b.min_rf, target, self.params.rsm_penalty);
                fa.total_cmp(&fb)
            })
            .map(|s| s.x.clone())
    }

    fn space_filling(&mut self, center: &[f64], count: usize) {
        let pts = latin_hypercube_in_box(&mut self.rng, count, center, self.radius);
        self.queue.extend(pts);
    }
}

impl Strategy for TrustRegion {
    fn name(&self) -> &'static str {
        "response-surface"
    }

    fn propose(
        &mut self,
        ctx: &StrategyContext<'_>,
        current: &DesignVector,
        _last: Option<&EvaluationResult>,
    ) -> Proposal {
        let dim = ctx.bounds.len();
        let basis = QuadraticBasis::new(dim, self.params.rsm_interaction_limit);

        if !self.started {
            self.started = true;
            let n = match self.params.rsm_doe_samples {
                0 => basis.term_count() + 2,
                n => n,
            };
            self.queue.push_back(ctx.bounds.normalize(current));
            self.queue.extend(latin_hypercube(&mut self.rng, n, dim));
            info!("🎲 Response surface: {} DOE points for {} coefficients", self.queue.len(), basis.term_count());
        }

        let mut attempts = 0;
        while self.queue.is_empty() {
            if self.radius < self.params.rsm_min_radius {
                info!("Trust region collapsed (r = {:.4})", self.radius);
                return Proposal::Converged;
            }
            let Some(center) = self.center(ctx.target_rf) else {
                self.queue.extend(latin_hypercube(&mut self.rng, dim + 1, dim));
                break;
            };
            if attempts == MAX_STEP_ATTEMPTS {
                self.numerical_failures += 1;
                warn!("Trust region stuck at r = {:.4}; sampling instead", self.radius);
                self.space_filling(&center, 1);
                break;
            }
            attempts += 1;
            if self.samples.len() < basis.term_count() {
                self.space_filling(&center, basis.term_count() - self.samples.len());
                break;
            }
            if (self.needs_refit || self.surfaces.is_none()) && !self.refit(basis) {
                self.space_filling(&center, dim + 1);
                break;
            }
            let Some((rf_surface, weight_surface)) = &self.surfaces else { continue };

            let weight_scale = weight_surface.predict(&center).abs().max(f64::MIN_POSITIVE);
            let problem = TrustRegionProblem {
                weight: weight_surface,
                rf: rf_surface,
                target_rf: ctx.target_rf,
                penalty: self.params.rsm_penalty,
                weight_scale,
                lo: center.iter().map(|c| (c - self.radius).max(0.0)).collect(),
                hi: center.iter().map(|c| (c + self.radius).min(1.0)).collect(),
            };
            match problem.solve(&center, self.params.rsm_qp_iterations) {
                Ok(x) if euclidean(&x, &center) < 1e-6 => {
                    // No predicted improvement at this radius.
                    self.radius *= self.params.rsm_shrink;
                }
                Ok(x) => {
                    self.pending = Some(PendingCheck {
                        rf: rf_surface.predict(&x),
                        weight: weight_surface.predict(&x),
                        x: x.clone(),
                    });
                    self.queue.push_back(x);
                }
                Err(e) => {
                    self.numerical_failures += 1;
                    debug!("Trust-region step failed ({}); sampling instead", e);
                    self.space_filling(&center, 1);
                }
            }
        }

        match self.queue.pop_front() {
            Some(x) => Proposal::Next(ctx.bounds.denormalize(&x)),
            None => Proposal::Converged,
        }
    }

    fn observe(&mut self, ctx: &StrategyContext<'_>, design: &DesignVector, result: &EvaluationResult) {
        let x = ctx.bounds.normalize(design);
        let Some(min_rf) = result.min_rf else {
            return;
        };

        if let Some(check) = self.pending.take() {
            if euclidean(&check.x, &x) < 1e-6 {
                let rf_err = (check.rf - min_rf).abs() / min_rf.abs().max(1e-9);
                let w_err = (check.weight - result.total_weight).abs() / result.total_weight.abs().max(1e-12);
                let err = rf_err.max(w_err);
                if err <= self.params.rsm_error_threshold {
                    self.radius = (self.radius * self.params.rsm_grow).min(self.params.rsm_max_radius);
                } else {
                    self.radius *= self.params.rsm_shrink;
                    self.needs_refit = true;
                }
                debug!("Trust region: prediction error {:.3}, r = {:.4}", err, self.radius);
            } else {
                self.pending = Some(check);
            }
        }

        if self.surfaces.is_none() {
            self.needs_refit = true;
        }
        self.samples.push(TrainingSample {
            x,
            design: design.clone(),
            min_rf,
            weight: result.total_weight,
        });
    }

    fn training_samples(&self) -> &[TrainingSample] {
        &self.samples
    }

    fn numerical_failures(&self) -> usize {
        self.numerical_failures
    }
}
