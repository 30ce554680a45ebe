pub mod genetic;
pub mod response_surface;
pub mod rf_map;
pub mod runner;
pub mod sampling;
pub mod strategies;
pub mod surrogate;

pub use self::rf_map::{resolve_property_rfs, PropertyRf};
pub use self::runner::{
    BestSolution, CancelToken, IterationRecord, NoProgress, OptimizationJob, OptimizationOptions, Optimizer,
    Progress, ProgressCallback, RunSummary, StopReason,
};

use crate::allowable::AllowableModel;
use crate::config::Config;
use crate::evaluator::EvaluationResult;
use crate::model::{DesignBounds, DesignVector, StructuralModel};
use crate::proximity::ProximityMap;
use crate::weight::WeightModel;
use serde::Serialize;

/// Read-only view of everything a strategy may consult besides its own state.
pub struct StrategyContext<'a> {
    pub model: &'a StructuralModel,
    pub bounds: &'a DesignBounds,
    pub proximity: &'a ProximityMap,
    pub weights: &'a WeightModel,
    pub allowables: &'a AllowableModel,
    pub target_rf: f64,
    pub tolerance: f64,
    pub iteration: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Proposal {
    Next(DesignVector),
    Converged,
}

/// One real evaluation as seen by data-driven strategies. `x` is the design
/// normalised to the unit cube.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrainingSample {
    pub x: Vec<f64>,
    pub design: DesignVector,
    pub min_rf: f64,
    pub weight: f64,
}

/// An iterative sizing rule. `propose` is called once per iteration before
/// the evaluation it asks for; `last` is `None` on the first call and after
/// a failed evaluation carries the most recent successful one.
pub trait Strategy: Send {
    fn name(&self) -> &'static str;

    fn propose(
        &mut self,
        ctx: &StrategyContext<'_>,
        current: &DesignVector,
        last: Option<&EvaluationResult>,
    ) -> Proposal;

    /// Called after every successful evaluation, including the ones of
    /// designs this strategy did not propose.
    fn observe(&mut self, _ctx: &StrategyContext<'_>, _design: &DesignVector, _result: &EvaluationResult) {}

    fn training_samples(&self) -> &[TrainingSample] {
        &[]
    }

    /// Steps degraded by a failed fit, solve or curve inversion.
    fn numerical_failures(&self) -> usize {
        0
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, clap::ValueEnum, strum::Display, strum::EnumIter,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum StrategyKind {
    FsdBottomUp,
    FsdTopDown,
    Decoupled,
    WeightEfficient,
    Surrogate,
    ResponseSurface,
}

impl StrategyKind {
    pub fn build(&self, config: &Config) -> Box<dyn Strategy> {
        use self::strategies::*;
        let seed = config.run.seed;
        match self {
            StrategyKind::FsdBottomUp => Box::new(FullyStressed::new(
                StartBound::Lower,
                config.stress_ratio.clone(),
            )),
            StrategyKind::FsdTopDown => Box::new(FullyStressed::new(
                StartBound::Upper,
                config.stress_ratio.clone(),
            )),
            StrategyKind::Decoupled => Box::new(Decoupled::new(
                config.stress_ratio.clone(),
                config.decoupled.clone(),
            )),
            StrategyKind::WeightEfficient => Box::new(WeightEfficient::new(config.efficiency.clone())),
            StrategyKind::Surrogate => Box::new(SurrogateSearch::new(config.surrogate.clone(), seed)),
            StrategyKind::ResponseSurface => {
                Box::new(TrustRegion::new(config.response_surface.clone(), seed))
            }
        }
    }
}
