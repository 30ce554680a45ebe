use super::{is_settled, stress_ratio_resize};
use crate::config::StressRatioParams;
use crate::evaluator::EvaluationResult;
use crate::model::DesignVector;
use crate::optimizer::{resolve_property_rfs, Proposal, Strategy, StrategyContext};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartBound {
    Lower,
    Upper,
}

/// Fully stressed design by stress ratio, started from one side of the box.
#[derive(Debug, Clone)]
pub struct FullyStressed {
    start: StartBound,
    params: StressRatioParams,
    started: bool,
}

impl FullyStressed {
    pub fn new(start: StartBound, params: StressRatioParams) -> Self {
        Self {
            start,
            params,
            started: false,
        }
    }
}

impl Strategy for FullyStressed {
    fn name(&self) -> &'static str {
        match self.start {
            StartBound::Lower => "fsd-bottom-up",
            StartBound::Upper => "fsd-top-down",
        }
    }

    fn propose(
        &mut self,
        ctx: &StrategyContext<'_>,
        current: &DesignVector,
        last: Option<&EvaluationResult>,
    ) -> Proposal {
        let Some(result) = last.filter(|_| self.started) else {
            self.started = true;
            return Proposal::Next(match self.start {
                StartBound::Lower => ctx.bounds.at_lower(),
                StartBound::Upper => ctx.bounds.at_upper(),
            });
        };

        let rfs = resolve_property_rfs(ctx, result);
        let mut next = current.clone();
        let mut settled = 0;
        for id in ctx.bounds.ids() {
            let value = ctx.bounds.clamp_value(id, current.get(id).unwrap_or(f64::NAN));
            let Some(&rf) = rfs.get(&id) else {
                settled += 1;
                next.set(id, value);
                continue;
            };
            if is_settled(ctx.bounds, id, value, rf.value(), ctx.target_rf, ctx.tolerance) {
                settled += 1;
            }
            let resized = stress_ratio_resize(value, rf, ctx.target_rf, &self.params);
            next.set(id, ctx.bounds.clamp_value(id, resized));
        }

        debug!("FSD: {}/{} properties settled", settled, ctx.bounds.len());
        if settled == ctx.bounds.len() {
            Proposal::Converged
        } else {
            Proposal::Next(next)
        }
    }
}
