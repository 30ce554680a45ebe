use crate::config::SurrogateParams;
use crate::evaluator::EvaluationResult;
use crate::model::DesignVector;
use crate::optimizer::genetic::{blend_crossover, gaussian_mutation, tournament_select};
use crate::optimizer::sampling::latin_hypercube;
use crate::optimizer::surrogate::{penalised_fitness, KnnSurrogate};
use crate::optimizer::{Proposal, Strategy, StrategyContext, TrainingSample};
use crate::util::{euclidean, seeded_rng};
use fastrand::Rng;
use std::collections::VecDeque;
use tracing::{debug, info};

/// Normalised distance under which a candidate duplicates a known sample.
const DUPLICATE_DISTANCE: f64 = 1e-4;

/// Genetic search on a kNN surrogate, refreshed with small batches of real
/// evaluations.
pub struct SurrogateSearch {
    params: SurrogateParams,
    rng: Rng,
    samples: Vec<TrainingSample>,
    queue: VecDeque<Vec<f64>>,
    started: bool,
    batches: usize,
}

impl SurrogateSearch {
    pub fn new(params: SurrogateParams, seed: Option<u64>) -> Self {
        Self {
            params,
            rng: seeded_rng(seed),
            samples: Vec::new(),
            queue: VecDeque::new(),
            started: false,
            batches: 0,
        }
    }

    fn fitness(&self, weight: f64, rf: f64, target: f64) -> f64 {
        penalised_fitness(weight, rf, target, self.params.surrogate_penalty)
    }

    fn is_known(&self, x: &[f64]) -> bool {
        self.samples.iter().any(|s| euclidean(&s.x, x) < DUPLICATE_DISTANCE)
    }

    /// Evolves a population on the surrogate and returns the next batch of
    /// real evaluations: the most promising candidates, then the most uncertain.
    fn next_batch(&mut self, dim: usize, target: f64) -> Vec<Vec<f64>> {
        let p = &self.params;
        let model = KnnSurrogate::new(p.surrogate_neighbors, p.surrogate_idw_power);
        let pop_size = p.surrogate_population.max(4);

        // Seed with the best known designs, fill with random points.
        let mut ranked: Vec<&TrainingSample> = self.samples.iter().collect();
        ranked.sort_by(|a, b| {
            self.fitness(a.weight, a.min_rf, target)
                .total_cmp(&self.fitness(b.weight, b.min_rf, target))
        });
        let mut population: Vec<Vec<f64>> = ranked.iter().take(pop_size / 2).map(|s| s.x.clone()).collect();
        while population.len() < pop_size {
            population.push((0..dim).map(|_| self.rng.f64()).collect());
        }

        let score = |x: &[f64]| -> (f64, f64) {
            match model.predict(&self.samples, x) {
                Some(pred) => (
                    penalised_fitness(pred.weight, pred.min_rf, target, p.surrogate_penalty),
                    pred.uncertainty,
                ),
                None => (f64::INFINITY, 0.0),
            }
        };

        for _ in 0..p.surrogate_generations {
            let scores: Vec<f64> = population.iter().map(|x| score(x).0).collect();
            let elite = scores
                .iter()
                .enumerate()
                .min_by(|a, b| a.1.total_cmp(b.1))
                .map(|(i, _)| population[i].clone());
            let mut offspring: Vec<Vec<f64>> = elite.into_iter().collect();
            while offspring.len() < pop_size {
                let a = tournament_select(&mut self.rng, &scores, p.surrogate_tournament);
                let b = tournament_select(&mut self.rng, &scores, p.surrogate_tournament);
                let mut child = blend_crossover(&mut self.rng, &population[a], &population[b], p.surrogate_blend_alpha);
                gaussian_mutation(&mut self.rng, &mut child, p.surrogate_mutation_sigma, p.surrogate_mutation_rate);
                offspring.push(child);
            }
            population = offspring;
        }

        let mut scored: Vec<(Vec<f64>, f64, f64)> = population
            .into_iter()
            .filter(|x| !self.is_known(x))
            .map(|x| {
                let (f, u) = score(&x);
                (x, f, u)
            })
            .collect();

        let mut batch: Vec<Vec<f64>> = Vec::new();
        let push_unique = |batch: &mut Vec<Vec<f64>>, x: &Vec<f64>| {
            if batch.iter().all(|b| euclidean(b, x) >= DUPLICATE_DISTANCE) {
                batch.push(x.clone());
                true
            } else {
                false
            }
        };

        scored.sort_by(|a, b| a.1.total_cmp(&b.1));
        let mut taken = 0;
        for (x, _, _) in &scored {
            if taken >= p.surrogate_exploit {
                break;
            }
            if push_unique(&mut batch, x) {
                taken += 1;
            }
        }
        scored.sort_by(|a, b| b.2.total_cmp(&a.2));
        let mut taken = 0;
        for (x, _, _) in &scored {
            if taken >= p.surrogate_explore {
                break;
            }
            if push_unique(&mut batch, x) {
                taken += 1;
            }
        }
        batch
    }
}

impl Strategy for SurrogateSearch {
    fn name(&self) -> &'static str {
        "surrogate"
    }

    fn propose(
        &mut self,
        ctx: &StrategyContext<'_>,
        current: &DesignVector,
        _last: Option<&EvaluationResult>,
    ) -> Proposal {
        let dim = ctx.bounds.len();
        if !self.started {
            self.started = true;
            let n = match self.params.surrogate_initial_samples {
                0 => 2 * dim + 1,
                n => n,
            };
            self.queue.push_back(ctx.bounds.normalize(current));
            self.queue.extend(latin_hypercube(&mut self.rng, n, dim));
            info!("🎲 Surrogate search: {} initial samples queued", self.queue.len());
        }

        if self.queue.is_empty() {
            if self.samples.len() < 2 {
                self.queue.extend(latin_hypercube(&mut self.rng, dim + 1, dim));
            } else {
                let batch = self.next_batch(dim, ctx.target_rf);
                if batch.is_empty() {
                    debug!("Surrogate search: no unexplored candidates left");
                    return Proposal::Converged;
                }
                self.batches += 1;
                debug!("Surrogate batch #{}: {} candidates", self.batches, batch.len());
                self.queue.extend(batch);
            }
        }

        match self.queue.pop_front() {
            Some(x) => Proposal::Next(ctx.bounds.denormalize(&x)),
            None => Proposal::Converged,
        }
    }

    fn observe(&mut self, ctx: &StrategyContext<'_>, design: &DesignVector, result: &EvaluationResult) {
        if let Some(min_rf) = result.min_rf {
            self.samples.push(TrainingSample {
                x: ctx.bounds.normalize(design),
                design: design.clone(),
                min_rf,
                weight: result.total_weight,
            });
        }
    }

    fn training_samples(&self) -> &[TrainingSample] {
        &self.samples
    }
}
