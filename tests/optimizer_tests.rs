mod common;

use common::{seeded_config, PanelFixture};
use rfsizer::evaluator::{EvaluationResult, Simulator, StressField};
use rfsizer::model::DesignVector;
use rfsizer::optimizer::strategies::{FullyStressed, StartBound};
use rfsizer::optimizer::{
    CancelToken, NoProgress, OptimizationOptions, Optimizer, Progress, ProgressCallback, Proposal, StopReason,
    Strategy, StrategyContext, StrategyKind,
};
use rfsizer::{SizerError, SizerResult};
use rstest::rstest;
use std::sync::atomic::{AtomicUsize, Ordering};
use strum::IntoEnumIterator;

fn options(max_iterations: usize, patience: usize) -> OptimizationOptions {
    let mut config = seeded_config(11);
    config.run.max_iterations = max_iterations;
    config.run.patience = patience;
    OptimizationOptions::from(&config)
}

fn optimizer<S: Simulator>(fx: &PanelFixture, sim: S, opts: OptimizationOptions) -> Optimizer<S> {
    Optimizer::new(fx.evaluator(sim), fx.proximity.clone(), opts)
}

/// Proposes the same design forever.
struct Hold;

impl Strategy for Hold {
    fn name(&self) -> &'static str {
        "hold"
    }

    fn propose(&mut self, _ctx: &StrategyContext<'_>, current: &DesignVector, _last: Option<&EvaluationResult>) -> Proposal {
        Proposal::Next(current.clone())
    }
}

/// Proposes something far outside the box.
struct Wild;

impl Strategy for Wild {
    fn name(&self) -> &'static str {
        "wild"
    }

    fn propose(&mut self, ctx: &StrategyContext<'_>, _current: &DesignVector, _last: Option<&EvaluationResult>) -> Proposal {
        Proposal::Next(ctx.bounds.ids().map(|id| (id, 1e6)).collect())
    }
}

/// Holds still and reports every step as degraded.
struct Degraded {
    steps: usize,
}

impl Strategy for Degraded {
    fn name(&self) -> &'static str {
        "degraded"
    }

    fn propose(&mut self, _ctx: &StrategyContext<'_>, current: &DesignVector, _last: Option<&EvaluationResult>) -> Proposal {
        self.steps += 1;
        Proposal::Next(current.clone())
    }

    fn numerical_failures(&self) -> usize {
        self.steps
    }
}

struct StopAfter {
    limit: usize,
    seen: AtomicUsize,
}

impl ProgressCallback for StopAfter {
    fn on_progress(&self, _progress: &Progress) -> bool {
        self.seen.fetch_add(1, Ordering::SeqCst) + 1 < self.limit
    }
}

#[rstest]
#[case(StrategyKind::FsdBottomUp)]
#[case(StrategyKind::FsdTopDown)]
#[case(StrategyKind::WeightEfficient)]
#[case(StrategyKind::Surrogate)]
#[case(StrategyKind::ResponseSurface)]
fn test_best_weight_never_increases(#[case] kind: StrategyKind) {
    let fx = PanelFixture::new();
    let mut opt = optimizer(&fx, fx.simulator(), options(40, 0));
    let mut strategy = kind.build(&seeded_config(3));
    let summary = opt.run(strategy.as_mut(), &fx.model.initial_design(), &CancelToken::new(), &NoProgress);

    let mut best = f64::INFINITY;
    for record in summary.history.iter().filter(|r| r.new_best) {
        let w = record.weight.unwrap();
        assert!(record.feasible);
        assert!(w < best, "{}: best went from {} to {}", kind, best, w);
        best = w;
    }
    // The reported best is the lightest feasible evaluation.
    let lightest = summary
        .history
        .iter()
        .filter(|r| r.feasible)
        .filter_map(|r| r.weight)
        .fold(f64::INFINITY, f64::min);
    match &summary.best {
        Some(b) => assert_eq!(b.weight(), lightest),
        None => assert!(lightest.is_infinite()),
    }
}

#[test]
fn test_top_down_starts_feasible() {
    let fx = PanelFixture::new();
    let mut opt = optimizer(&fx, fx.simulator(), options(5, 0));
    let mut strategy = FullyStressed::new(StartBound::Upper, Default::default());
    let summary = opt.run(&mut strategy, &fx.model.initial_design(), &CancelToken::new(), &NoProgress);
    assert!(summary.history[0].feasible);
    assert_eq!(summary.best.as_ref().map(|b| b.iteration), summary.history.iter().rev().find(|r| r.new_best).map(|r| r.iteration));
}

#[test]
fn test_cancelled_token_stops_before_first_evaluation() {
    let fx = PanelFixture::new();
    let mut opt = optimizer(&fx, fx.simulator(), options(10, 0));
    let token = CancelToken::new();
    token.cancel();
    let summary = opt.run(&mut Hold, &fx.model.initial_design(), &token, &NoProgress);
    assert_eq!(summary.stop_reason, StopReason::Cancelled);
    assert!(summary.history.is_empty());
    assert_eq!(summary.evaluations, 0);
}

#[test]
fn test_callback_can_abort_run() {
    let fx = PanelFixture::new();
    let mut opt = optimizer(&fx, fx.simulator(), options(20, 0));
    let callback = StopAfter {
        limit: 3,
        seen: AtomicUsize::new(0),
    };
    let summary = opt.run(&mut Hold, &fx.model.initial_design(), &CancelToken::new(), &callback);
    assert_eq!(summary.stop_reason, StopReason::Cancelled);
    assert_eq!(summary.history.len(), 3);
}

#[test]
fn test_failed_evaluations_are_skipped() {
    let fx = PanelFixture::new();
    let mut inner = fx.simulator();
    let mut calls = 0;
    let flaky = move |d: &DesignVector| -> SizerResult<StressField> {
        calls += 1;
        if calls % 2 == 0 {
            Err(SizerError::Simulation(format!("solver crash on run {}", calls)))
        } else {
            inner.simulate(d)
        }
    };
    let mut opt = optimizer(&fx, flaky, options(6, 0));
    let mut strategy = FullyStressed::new(StartBound::Lower, Default::default());
    let summary = opt.run(&mut strategy, &fx.model.initial_design(), &CancelToken::new(), &NoProgress);

    assert_eq!(summary.stop_reason, StopReason::MaxIterations);
    assert_eq!(summary.history.len(), 6);
    assert_eq!(summary.failed_evaluations, 3);
    assert_eq!(opt.evaluator().failures(), 3);
    for record in summary.history.iter().filter(|r| !r.evaluated) {
        assert!(record.min_rf.is_none());
        assert!(!record.feasible);
    }
    // Bar 1 only moved on the three successful iterations: 1 → 1.3 → 1.69.
    let t = summary.final_design.get(1).unwrap();
    assert!((t - 1.69).abs() < 1e-9, "bar 1 at {}", t);
}

#[test]
fn test_patience_stalls_once_feasible() {
    let fx = PanelFixture::new();
    let mut opt = optimizer(&fx, fx.simulator(), options(50, 3));
    // Upper bounds are feasible from the start; holding them never improves.
    let initial = opt.bounds().at_upper();
    let summary = opt.run(&mut Hold, &initial, &CancelToken::new(), &NoProgress);
    assert_eq!(summary.stop_reason, StopReason::Stalled);
    assert_eq!(summary.history.len(), 4);
    assert_eq!(summary.best.unwrap().iteration, 1);
}

#[test]
fn test_infeasible_run_does_not_stall() {
    let fx = PanelFixture::new();
    let mut opt = optimizer(&fx, fx.simulator(), options(8, 2));
    let initial = opt.bounds().at_lower();
    let summary = opt.run(&mut Hold, &initial, &CancelToken::new(), &NoProgress);
    assert_eq!(summary.stop_reason, StopReason::MaxIterations);
    assert!(summary.best.is_none());
}

#[test]
fn test_out_of_bounds_proposal_is_clamped() {
    let fx = PanelFixture::new();
    let mut opt = optimizer(&fx, fx.simulator(), options(2, 0));
    let summary = opt.run(&mut Wild, &fx.model.initial_design(), &CancelToken::new(), &NoProgress);
    assert!(opt.bounds().contains(&summary.final_design));
    assert_eq!(summary.final_design, opt.bounds().at_upper());
}

#[test]
fn test_spawned_job_streams_progress() {
    let fx = PanelFixture::new();
    let opt = optimizer(&fx, fx.simulator(), options(12, 0));
    let strategy = StrategyKind::FsdBottomUp.build(&seeded_config(5));
    let job = opt.spawn(strategy, fx.model.initial_design());

    let updates: Vec<Progress> = job.progress.iter().collect();
    let summary = job.handle.join().unwrap();
    assert_eq!(updates.len(), summary.history.len());
    assert_eq!(updates.last().map(|p| p.iteration), summary.history.last().map(|r| r.iteration));
}

#[test]
fn test_seeded_runs_are_reproducible() {
    for kind in StrategyKind::iter() {
        let run = || {
            let fx = PanelFixture::new();
            let mut opt = optimizer(&fx, fx.simulator(), options(30, 0));
            let mut strategy = kind.build(&seeded_config(42));
            opt.run(strategy.as_mut(), &fx.model.initial_design(), &CancelToken::new(), &NoProgress)
        };
        let (a, b) = (run(), run());
        assert_eq!(a.history, b.history, "{} diverged", kind);
        assert_eq!(a.final_design, b.final_design);
    }
}

#[test]
fn test_data_driven_strategies_export_training_samples() {
    let fx = PanelFixture::new();
    for kind in [StrategyKind::Surrogate, StrategyKind::ResponseSurface] {
        let mut opt = optimizer(&fx, fx.simulator(), options(15, 0));
        let mut strategy = kind.build(&seeded_config(9));
        let summary = opt.run(strategy.as_mut(), &fx.model.initial_design(), &CancelToken::new(), &NoProgress);
        let evaluated = summary.history.iter().filter(|r| r.evaluated).count();
        assert_eq!(summary.training_samples.len(), evaluated, "{}", kind);
    }
}

#[test]
fn test_summary_carries_strategy_numerical_failures() {
    let fx = PanelFixture::new();
    let mut opt = optimizer(&fx, fx.simulator(), options(4, 0));
    let mut strategy = Degraded { steps: 0 };
    let summary = opt.run(&mut strategy, &fx.model.initial_design(), &CancelToken::new(), &NoProgress);
    assert_eq!(summary.history.len(), 4);
    assert_eq!(summary.numerical_failures, 4);

    let summary = opt.run(&mut Hold, &fx.model.initial_design(), &CancelToken::new(), &NoProgress);
    assert_eq!(summary.numerical_failures, 0);
}
