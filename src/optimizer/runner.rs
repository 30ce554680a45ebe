use super::{Proposal, Strategy, StrategyContext, TrainingSample};
use crate::allowable::AllowableModel;
use crate::config::Config;
use crate::evaluator::{DesignEvaluator, EvaluationResult, Simulator};
use crate::model::{DesignBounds, DesignVector, StructuralModel};
use crate::proximity::ProximityMap;
use crate::weight::WeightModel;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct OptimizationOptions {
    pub target_rf: f64,
    pub tolerance: f64,
    pub max_iterations: usize,
    pub patience: usize,
    pub floor_lock: bool,
}

impl From<&Config> for OptimizationOptions {
    fn from(cfg: &Config) -> Self {
        Self {
            target_rf: cfg.run.target_rf,
            tolerance: cfg.run.rf_tolerance,
            max_iterations: cfg.run.max_iterations,
            patience: cfg.run.patience,
            floor_lock: cfg.run.floor_lock,
        }
    }
}

/// After-iteration snapshot handed to progress callbacks.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Progress {
    pub iteration: usize,
    pub min_rf: Option<f64>,
    pub weight: Option<f64>,
    pub best_weight: Option<f64>,
    pub failed_evaluations: usize,
}

/// Observer called once per sizing iteration, failed evaluations included.
/// Returning `false` ends the run as [`StopReason::Cancelled`].
pub trait ProgressCallback: Send + Sync {
    fn on_progress(&self, progress: &Progress) -> bool;
}

pub struct NoProgress;

impl ProgressCallback for NoProgress {
    fn on_progress(&self, _progress: &Progress) -> bool {
        true
    }
}

/// Forwards progress over a channel; a dropped receiver stops the run.
impl ProgressCallback for Sender<Progress> {
    fn on_progress(&self, progress: &Progress) -> bool {
        self.send(progress.clone()).is_ok()
    }
}

/// Cooperative cancellation flag, polled once at the top of each iteration.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IterationRecord {
    pub iteration: usize,
    /// `false` when the simulator failed; the remaining fields are then empty.
    pub evaluated: bool,
    pub min_rf: Option<f64>,
    pub failing: Option<usize>,
    pub weight: Option<f64>,
    pub feasible: bool,
    pub new_best: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BestSolution {
    pub iteration: usize,
    pub design: DesignVector,
    pub result: EvaluationResult,
}

impl BestSolution {
    pub fn weight(&self) -> f64 {
        self.result.total_weight
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
pub enum StopReason {
    Converged,
    MaxIterations,
    Stalled,
    Cancelled,
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub strategy: &'static str,
    /// Lightest feasible design seen; `None` when no evaluation was feasible.
    pub best: Option<BestSolution>,
    pub history: Vec<IterationRecord>,
    pub stop_reason: StopReason,
    pub final_design: DesignVector,
    pub evaluations: usize,
    pub failed_evaluations: usize,
    /// Strategy steps that fell back after a numerical failure.
    pub numerical_failures: usize,
    pub training_samples: Vec<TrainingSample>,
}

/// Handle to a run on its own thread.
pub struct OptimizationJob {
    pub progress: Receiver<Progress>,
    pub cancel: CancelToken,
    pub handle: JoinHandle<RunSummary>,
}

/// Drives one strategy against one evaluator.
pub struct Optimizer<S: Simulator> {
    evaluator: DesignEvaluator<S>,
    model: Arc<StructuralModel>,
    allowables: Arc<AllowableModel>,
    weights: Arc<WeightModel>,
    proximity: Arc<ProximityMap>,
    bounds: DesignBounds,
    options: OptimizationOptions,
}

impl<S: Simulator> Optimizer<S> {
    pub fn new(evaluator: DesignEvaluator<S>, proximity: Arc<ProximityMap>, options: OptimizationOptions) -> Self {
        let (model, allowables, weights) = evaluator.shared();
        let bounds = DesignBounds::from_model(&model, options.floor_lock);
        Self {
            evaluator,
            model,
            allowables,
            weights,
            proximity,
            bounds,
            options,
        }
    }

    pub fn bounds(&self) -> &DesignBounds {
        &self.bounds
    }

    pub fn evaluator(&self) -> &DesignEvaluator<S> {
        &self.evaluator
    }

    pub fn run<CB: ProgressCallback + ?Sized>(
        &mut self,
        strategy: &mut dyn Strategy,
        initial: &DesignVector,
        cancel: &CancelToken,
        callback: &CB,
    ) -> RunSummary {
        let opts = self.options.clone();
        let start_time = Instant::now();
        let mut current = self.bounds.clamp(initial);
        let mut last: Option<EvaluationResult> = None;
        let mut best: Option<BestSolution> = None;
        let mut history = Vec::new();
        let mut stop_reason = StopReason::MaxIterations;
        let mut stall = 0;
        let mut failed = 0;

        info!(
            "🚀 Starting '{}' on {} properties (target RF {}, ±{})",
            strategy.name(),
            self.bounds.len(),
            opts.target_rf,
            opts.tolerance
        );

        for iteration in 1..=opts.max_iterations {
            if cancel.is_cancelled() {
                stop_reason = StopReason::Cancelled;
                break;
            }

            let ctx = StrategyContext {
                model: &self.model,
                bounds: &self.bounds,
                proximity: &self.proximity,
                weights: &self.weights,
                allowables: &self.allowables,
                target_rf: opts.target_rf,
                tolerance: opts.tolerance,
                iteration,
            };

            let candidate = match strategy.propose(&ctx, &current, last.as_ref()) {
                Proposal::Converged => {
                    stop_reason = StopReason::Converged;
                    break;
                }
                Proposal::Next(d) if self.bounds.contains(&d) && d.len() == self.bounds.len() => d,
                Proposal::Next(d) => {
                    warn!("⚠️  '{}' proposed an out-of-bounds design; clamped", strategy.name());
                    self.bounds.clamp(&d)
                }
            };

            let result = match self.evaluator.evaluate(&candidate, opts.target_rf) {
                Ok(r) => r,
                Err(e) => {
                    failed += 1;
                    warn!("❌ Iteration {} skipped: {}", iteration, e);
                    history.push(IterationRecord {
                        iteration,
                        evaluated: false,
                        min_rf: None,
                        failing: None,
                        weight: None,
                        feasible: false,
                        new_best: false,
                    });
                    let progress = Progress {
                        iteration,
                        min_rf: None,
                        weight: None,
                        best_weight: best.as_ref().map(BestSolution::weight),
                        failed_evaluations: failed,
                    };
                    if !callback.on_progress(&progress) {
                        stop_reason = StopReason::Cancelled;
                        break;
                    }
                    continue;
                }
            };

            strategy.observe(&ctx, &candidate, &result);

            let feasible = result.is_feasible(opts.target_rf, opts.tolerance);
            let new_best = feasible
                && best
                    .as_ref()
                    .map_or(true, |b| result.total_weight < b.weight());

            info!(
                "🔁 Iter {:>3} | min RF {} | {:>4} failing | weight {:.4}{}",
                iteration,
                result.min_rf.map_or("n/a".to_string(), |rf| format!("{:.3}", rf)),
                result.failing,
                result.total_weight,
                if new_best { " ✨ new best" } else { "" }
            );

            history.push(IterationRecord {
                iteration,
                evaluated: true,
                min_rf: result.min_rf,
                failing: Some(result.failing),
                weight: Some(result.total_weight),
                feasible,
                new_best,
            });

            if new_best {
                stall = 0;
                best = Some(BestSolution {
                    iteration,
                    design: candidate.clone(),
                    result: result.clone(),
                });
            } else if best.is_some() {
                // Patience only runs once something feasible is on record.
                stall += 1;
            }

            current = candidate;
            let progress = Progress {
                iteration,
                min_rf: result.min_rf,
                weight: Some(result.total_weight),
                best_weight: best.as_ref().map(BestSolution::weight),
                failed_evaluations: failed,
            };
            last = Some(result);

            if !callback.on_progress(&progress) {
                stop_reason = StopReason::Cancelled;
                break;
            }
            if opts.patience > 0 && stall >= opts.patience {
                stop_reason = StopReason::Stalled;
                break;
            }
        }

        match &best {
            Some(b) => info!(
                "🏁 {} after {:.1?}: best weight {:.4} (iteration {})",
                stop_reason,
                start_time.elapsed(),
                b.weight(),
                b.iteration
            ),
            None => warn!(
                "🏁 {} after {:.1?}: no feasible design found",
                stop_reason,
                start_time.elapsed()
            ),
        }
        if failed > 0 {
            warn!("⚠️  {} evaluations failed and were skipped", failed);
        }
        let numerical_failures = strategy.numerical_failures();
        if numerical_failures > 0 {
            warn!("⚠️  {} strategy steps degraded by numerical failures", numerical_failures);
        }

        RunSummary {
            strategy: strategy.name(),
            best,
            history,
            stop_reason,
            final_design: current,
            evaluations: self.evaluator.evaluations(),
            failed_evaluations: failed,
            numerical_failures,
            training_samples: strategy.training_samples().to_vec(),
        }
    }
}

impl<S: Simulator + 'static> Optimizer<S> {
    /// Runs on a dedicated thread; progress arrives on the job's receiver.
    pub fn spawn(mut self, mut strategy: Box<dyn Strategy>, initial: DesignVector) -> OptimizationJob {
        let (tx, rx) = mpsc::channel();
        let cancel = CancelToken::new();
        let token = cancel.clone();
        let handle = thread::spawn(move || self.run(strategy.as_mut(), &initial, &token, &tx));
        OptimizationJob {
            progress: rx,
            cancel,
            handle,
        }
    }
}
