use super::{is_settled, stress_ratio_resize};
use crate::config::{DecoupledParams, StressRatioParams};
use crate::evaluator::EvaluationResult;
use crate::model::{DesignVector, PropertyId};
use crate::optimizer::{resolve_property_rfs, PropertyRf, Proposal, Strategy, StrategyContext};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Start,
    Bars,
    Skins,
}

/// Two-phase minimum weight sizing: bars first with skins at their floor,
/// then only the skins whose own RF is short of target.
#[derive(Debug, Clone)]
pub struct Decoupled {
    ratio: StressRatioParams,
    params: DecoupledParams,
    phase: Phase,
}

impl Decoupled {
    pub fn new(ratio: StressRatioParams, params: DecoupledParams) -> Self {
        Self {
            ratio,
            params,
            phase: Phase::Start,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    fn skin_floor(ctx: &StrategyContext<'_>, id: PropertyId) -> f64 {
        let lower = ctx.bounds.lower(id).unwrap_or(0.0);
        let floor = ctx.model.property(id).and_then(|p| p.floor).unwrap_or(lower);
        ctx.bounds.clamp_value(id, floor)
    }
}

impl Strategy for Decoupled {
    fn name(&self) -> &'static str {
        "decoupled"
    }

    fn propose(
        &mut self,
        ctx: &StrategyContext<'_>,
        current: &DesignVector,
        last: Option<&EvaluationResult>,
    ) -> Proposal {
        let mut next = ctx.bounds.clamp(current);

        let result = match (self.phase, last) {
            (Phase::Start, _) | (_, None) => {
                for skin in ctx.model.skin_properties() {
                    if ctx.bounds.get(skin.id).is_some() {
                        next.set(skin.id, Self::skin_floor(ctx, skin.id));
                    }
                }
                if self.phase == Phase::Start {
                    self.phase = Phase::Bars;
                }
                return Proposal::Next(next);
            }
            (_, Some(r)) => r,
        };
        let rfs = resolve_property_rfs(ctx, result);

        if self.phase == Phase::Bars {
            let mut total = 0;
            let mut settled = 0;
            for bar in ctx.model.bar_properties() {
                let Some(value) = next.get(bar.id) else { continue };
                total += 1;
                match rfs.get(&bar.id) {
                    Some(rf) if !is_settled(ctx.bounds, bar.id, value, rf.value(), ctx.target_rf, ctx.tolerance) => {
                        let resized = stress_ratio_resize(value, *rf, ctx.target_rf, &self.ratio);
                        next.set(bar.id, ctx.bounds.clamp_value(bar.id, resized));
                    }
                    _ => settled += 1,
                }
            }
            let fraction = if total == 0 { 1.0 } else { settled as f64 / total as f64 };
            debug!("Decoupled bar phase: {:.0}% converged", fraction * 100.0);
            if fraction < self.params.bar_phase_threshold {
                return Proposal::Next(next);
            }
            info!("🔒 Bars locked ({}/{} converged); sizing skins", settled, total);
            self.phase = Phase::Skins;
            // Bars stay at the last evaluated values.
            next = ctx.bounds.clamp(current);
        }

        let mut changed = 0;
        for skin in ctx.model.skin_properties() {
            let Some(value) = next.get(skin.id) else { continue };
            // Only the skin's own RF; a neighbour's failure never thickens it.
            let Some(rf @ PropertyRf::Direct(own)) = rfs.get(&skin.id).copied() else {
                continue;
            };
            let at_upper = ctx.bounds.upper(skin.id).is_some_and(|hi| value >= hi);
            if own < ctx.target_rf - ctx.tolerance && !at_upper {
                let resized = stress_ratio_resize(value, rf, ctx.target_rf, &self.ratio);
                next.set(skin.id, ctx.bounds.clamp_value(skin.id, resized));
                changed += 1;
            }
        }

        if changed == 0 {
            Proposal::Converged
        } else {
            debug!("Decoupled skin phase: {} skins increased", changed);
            Proposal::Next(next)
        }
    }
}
