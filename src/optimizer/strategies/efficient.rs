use crate::config::EfficiencyParams;
use crate::evaluator::EvaluationResult;
use crate::model::{DesignVector, PropertyId};
use crate::optimizer::{resolve_property_rfs, Proposal, Strategy, StrategyContext};
use crate::util::limited_step;
use std::collections::BTreeMap;
use tracing::debug;

/// Spends weight where it buys the most RF. Per-property RF gains (ΔRF/Δt)
/// are learned from consecutive evaluations by exponential smoothing.
///
/// Growth of a property with its own RF never passes the thickness at which
/// the allowable curve covers the governing element's current stress.
#[derive(Debug, Clone)]
pub struct WeightEfficient {
    params: EfficiencyParams,
    rf_gain: BTreeMap<PropertyId, f64>,
    previous: Option<(DesignVector, BTreeMap<PropertyId, f64>)>,
    started: bool,
    inversion_failures: usize,
}

impl WeightEfficient {
    pub fn new(params: EfficiencyParams) -> Self {
        Self {
            params,
            rf_gain: BTreeMap::new(),
            previous: None,
            started: false,
            inversion_failures: 0,
        }
    }

    pub fn learned_gain(&self, id: PropertyId) -> Option<f64> {
        self.rf_gain.get(&id).copied()
    }

    /// Learned gain, else the `rf / t` slope of an RF proportional to thickness.
    fn gain(&self, id: PropertyId, rf: f64, value: f64) -> f64 {
        self.rf_gain
            .get(&id)
            .copied()
            .unwrap_or_else(|| if value > 0.0 { rf / value } else { 0.0 })
    }
}

/// Thickness the property fit needs to carry its governing element's stress
/// at the target RF, the stress held at its current value.
fn inverted_thickness(ctx: &StrategyContext<'_>, result: &EvaluationResult, id: PropertyId) -> Option<f64> {
    let governing = result
        .elements
        .iter()
        .filter(|e| e.property == id && e.status.is_rated() && e.stress.is_finite())
        .min_by(|a, b| a.rf.total_cmp(&b.rf))?;
    ctx.allowables.required_thickness(id, governing.stress, ctx.target_rf)
}

impl Strategy for WeightEfficient {
    fn name(&self) -> &'static str {
        "weight-efficient"
    }

    fn propose(
        &mut self,
        ctx: &StrategyContext<'_>,
        current: &DesignVector,
        last: Option<&EvaluationResult>,
    ) -> Proposal {
        let current = ctx.bounds.clamp(current);
        let Some(result) = last.filter(|_| self.started) else {
            self.started = true;
            return Proposal::Next(current);
        };
        let rfs = resolve_property_rfs(ctx, result);
        let (target, tol) = (ctx.target_rf, ctx.tolerance);

        // (id, deficit, score)
        let mut under: Vec<(PropertyId, f64, f64)> = Vec::new();
        let mut over: Vec<(PropertyId, f64)> = Vec::new();
        for (&id, rf) in &rfs {
            let Some((lo, hi)) = ctx.bounds.get(id) else { continue };
            let Some(value) = current.get(id) else { continue };
            let rf = rf.value();
            if rf < target - tol && value < hi {
                let deficit = target - rf;
                let gain = self.gain(id, rf, value);
                let sensitivity = ctx.weights.sensitivity(id).unwrap_or(0.0).max(f64::MIN_POSITIVE);
                under.push((id, deficit, deficit * gain / sensitivity));
            } else if rf > target + tol && value > lo && rfs[&id].is_direct() {
                over.push((id, rf));
            }
        }

        if under.is_empty() && over.is_empty() {
            return Proposal::Converged;
        }

        under.sort_by(|a, b| b.2.total_cmp(&a.2));
        let take = ((under.len() as f64 * self.params.efficiency_update_fraction).ceil() as usize)
            .clamp(usize::from(!under.is_empty()), under.len());

        let mut next = current.clone();
        let max_step = self.params.efficiency_max_step;
        for &(id, deficit, _) in under.iter().take(take) {
            let Some(value) = current.get(id) else { continue };
            let rf = target - deficit;
            let gain = self.gain(id, rf, value);
            let wanted = if gain > 0.0 { value + deficit / gain } else { value * (1.0 + max_step) };
            let mut updated = limited_step(value, wanted / value, max_step);
            if rfs[&id].is_direct() {
                match inverted_thickness(ctx, result, id) {
                    Some(t) if t > value => updated = updated.min(t),
                    Some(_) => {}
                    None => {
                        self.inversion_failures += 1;
                        debug!("Property {}: allowable inversion failed, gain step kept", id);
                    }
                }
            }
            next.set(id, ctx.bounds.clamp_value(id, updated));

            if ctx.model.property(id).is_some_and(|p| p.kind.is_bar()) {
                let nudge = 1.0 + self.params.efficiency_coupling * deficit / target;
                for skin in ctx.proximity.skins_near(id) {
                    let Some(s) = next.get(skin) else { continue };
                    let nudged = ctx.bounds.clamp_value(skin, limited_step(s, nudge, max_step));
                    if nudged > s {
                        next.set(skin, nudged);
                    }
                }
            }
        }

        let reduction = self.params.efficiency_reduction_step;
        for &(id, rf) in &over {
            let Some(value) = current.get(id) else { continue };
            if next.get(id) != Some(value) {
                continue;
            }
            let gain = self.gain(id, rf, value);
            let wanted = if gain > 0.0 { value - (rf - target) / gain } else { value * (1.0 - reduction) };
            let updated = limited_step(value, wanted / value, reduction);
            next.set(id, ctx.bounds.clamp_value(id, updated));
        }

        debug!(
            "Weight-efficient: {} of {} under-target updated, {} over-target reduced",
            take,
            under.len(),
            over.len()
        );
        Proposal::Next(next)
    }

    fn observe(&mut self, _ctx: &StrategyContext<'_>, design: &DesignVector, result: &EvaluationResult) {
        if let Some((prev_design, prev_rf)) = &self.previous {
            let lr = self.params.efficiency_learning_rate;
            for (&id, &rf) in &result.property_rf {
                let (Some(&rf0), Some(t0), Some(t1)) = (prev_rf.get(&id), prev_design.get(id), design.get(id)) else {
                    continue;
                };
                let dt = t1 - t0;
                if dt.abs() < 1e-9 {
                    continue;
                }
                let g = (rf - rf0) / dt;
                if !(g.is_finite() && g > 0.0) {
                    continue;
                }
                self.rf_gain
                    .entry(id)
                    .and_modify(|old| *old = (1.0 - lr) * *old + lr * g)
                    .or_insert(g);
            }
        }
        self.previous = Some((design.clone(), result.property_rf.clone()));
    }

    fn numerical_failures(&self) -> usize {
        self.inversion_failures
    }
}
