pub mod combination;
pub mod loader;
pub mod stress;
pub mod types;

pub use self::combination::{governing_load_case, CombinationRow, CombinationTable, GoverningCase};
pub use self::loader::load_combinations;
pub use self::stress::{LoadCaseId, StressField};
pub use self::types::{
    ElementRf, EvaluationDiagnostics, EvaluationResult, RfStatus, RF_NO_ALLOWABLE, RF_NO_STRESS,
};

use crate::allowable::AllowableModel;
use crate::error::SizerResult;
use crate::model::{DesignVector, StructuralModel};
use crate::weight::WeightModel;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// The external structural solver. One call per candidate design; may be
/// slow and may fail.
pub trait Simulator: Send {
    fn simulate(&mut self, design: &DesignVector) -> SizerResult<StressField>;
}

impl<F> Simulator for F
where
    F: FnMut(&DesignVector) -> SizerResult<StressField> + Send,
{
    fn simulate(&mut self, design: &DesignVector) -> SizerResult<StressField> {
        self(design)
    }
}

/// Turns a design into per-element RF and total weight.
pub struct DesignEvaluator<S: Simulator> {
    model: Arc<StructuralModel>,
    allowables: Arc<AllowableModel>,
    weights: Arc<WeightModel>,
    combinations: Option<Arc<CombinationTable>>,
    simulator: S,
    evaluations: usize,
    failures: usize,
}

impl<S: Simulator> DesignEvaluator<S> {
    pub fn new(
        model: Arc<StructuralModel>,
        allowables: Arc<AllowableModel>,
        weights: Arc<WeightModel>,
        simulator: S,
    ) -> Self {
        Self {
            model,
            allowables,
            weights,
            combinations: None,
            simulator,
            evaluations: 0,
            failures: 0,
        }
    }

    pub fn with_combinations(mut self, table: Arc<CombinationTable>) -> Self {
        if !table.is_empty() {
            self.combinations = Some(table);
        }
        self
    }

    pub fn model(&self) -> &StructuralModel {
        &self.model
    }

    pub fn allowables(&self) -> &AllowableModel {
        &self.allowables
    }

    pub fn weights(&self) -> &WeightModel {
        &self.weights
    }

    /// Shared handles to the read-only inputs, for code that runs beside the
    /// evaluator.
    pub fn shared(&self) -> (Arc<StructuralModel>, Arc<AllowableModel>, Arc<WeightModel>) {
        (self.model.clone(), self.allowables.clone(), self.weights.clone())
    }

    pub fn evaluations(&self) -> usize {
        self.evaluations
    }

    pub fn failures(&self) -> usize {
        self.failures
    }

    /// Runs the simulator on `design` and rates the result. A simulator
    /// failure is returned as `Err` and counted; the design is never touched.
    pub fn evaluate(&mut self, design: &DesignVector, target_rf: f64) -> SizerResult<EvaluationResult> {
        self.evaluations += 1;
        let field = match self.simulator.simulate(design) {
            Ok(f) => f,
            Err(e) => {
                self.failures += 1;
                warn!("Evaluation #{} failed: {}", self.evaluations, e);
                return Err(e);
            }
        };
        Ok(self.assess(design, &field, target_rf))
    }

    /// Pure rating step: combination, allowable lookup, RF, aggregation, weight.
    pub fn assess(&self, design: &DesignVector, field: &StressField, target_rf: f64) -> EvaluationResult {
        let mut diagnostics = EvaluationDiagnostics {
            unresolved_density: self.weights.unresolved_density_count(),
            ..Default::default()
        };
        diagnostics.unknown_elements = field
            .elements()
            .filter(|&id| self.model.element(id).is_none())
            .count();

        let mut elements = Vec::with_capacity(self.model.elements().len());
        let mut property_rf: BTreeMap<_, f64> = BTreeMap::new();

        for element in self.model.elements() {
            let Some(cases) = field.cases_of(element.id) else {
                diagnostics.missing_stress += 1;
                continue;
            };

            let combined = self.combinations.as_ref().and_then(|t| t.governing(cases));
            if self.combinations.is_some() && combined.is_none() {
                diagnostics.uncombined += 1;
            }
            let Some((governing, stress)) = combined.or_else(|| governing_load_case(cases)) else {
                diagnostics.missing_stress += 1;
                continue;
            };

            // The model guarantees every element's property exists; a value
            // missing from the design is an unresolvable thickness.
            let thickness = design.get(element.property);
            let resolved = thickness.and_then(|t| {
                self.allowables
                    .resolve(element.id, element.property)
                    .map(|(src, fit)| (t, src, fit.evaluate(t)))
            });

            let record = match resolved {
                Some((t, src, allowable)) if allowable.is_finite() && allowable > 0.0 => {
                    let (rf, status) = if stress == 0.0 {
                        (RF_NO_STRESS, RfStatus::NoStress)
                    } else {
                        let rf = allowable / stress.abs();
                        let status = if rf >= target_rf {
                            RfStatus::Pass
                        } else {
                            RfStatus::Fail
                        };
                        (rf, status)
                    };
                    ElementRf {
                        element: element.id,
                        property: element.property,
                        thickness: t,
                        stress,
                        governing: Some(governing),
                        allowable: Some(allowable),
                        fit_source: Some(src),
                        rf,
                        status,
                    }
                }
                other => {
                    diagnostics.no_allowable += 1;
                    ElementRf {
                        element: element.id,
                        property: element.property,
                        thickness: thickness.unwrap_or(f64::NAN),
                        stress,
                        governing: Some(governing),
                        allowable: None,
                        fit_source: other.map(|(_, src, _)| src),
                        rf: RF_NO_ALLOWABLE,
                        status: RfStatus::NoAllowable,
                    }
                }
            };

            if record.status.is_rated() {
                property_rf
                    .entry(record.property)
                    .and_modify(|rf| *rf = rf.min(record.rf))
                    .or_insert(record.rf);
            }
            elements.push(record);
        }

        let rated = elements.iter().filter(|e| e.status.is_rated());
        let min_rf = rated.clone().map(|e| e.rf).min_by(|a, b| a.total_cmp(b));
        let failing = rated.clone().filter(|e| e.status == RfStatus::Fail).count();
        let passing = rated.count() - failing;

        if diagnostics.no_allowable > 0 || diagnostics.unknown_elements > 0 {
            debug!(
                "Evaluation caveats: {} NO_ALLOW, {} unknown, {} missing stress",
                diagnostics.no_allowable, diagnostics.unknown_elements, diagnostics.missing_stress
            );
        }

        EvaluationResult {
            min_rf,
            failing,
            passing,
            total_weight: self.weights.total_weight(design),
            elements,
            property_rf,
            diagnostics,
        }
    }
}
