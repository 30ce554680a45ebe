use super::combination::GoverningCase;
use crate::allowable::FitSource;
use crate::model::{ElementId, PropertyId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// RF reported when the governing stress is exactly zero.
pub const RF_NO_STRESS: f64 = 999.0;
/// RF reported when no valid allowable could be resolved.
pub const RF_NO_ALLOWABLE: f64 = -1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
pub enum RfStatus {
    #[strum(serialize = "PASS")]
    Pass,
    #[strum(serialize = "FAIL")]
    Fail,
    #[strum(serialize = "NO_STRESS")]
    NoStress,
    #[strum(serialize = "NO_ALLOW")]
    NoAllowable,
}

impl RfStatus {
    /// Whether the RF enters min-RF and failing-count statistics.
    pub fn is_rated(&self) -> bool {
        !matches!(self, RfStatus::NoAllowable)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementRf {
    pub element: ElementId,
    pub property: PropertyId,
    pub thickness: f64,
    pub stress: f64,
    pub governing: Option<GoverningCase>,
    pub allowable: Option<f64>,
    pub fit_source: Option<FitSource>,
    pub rf: f64,
    pub status: RfStatus,
}

/// Data-quality counters surfaced alongside every evaluation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationDiagnostics {
    pub no_allowable: usize,
    /// Stress records for elements the model does not know.
    pub unknown_elements: usize,
    /// Model elements the simulator returned no stress for.
    pub missing_stress: usize,
    /// Elements no combination row applied to; rated on raw load cases.
    pub uncombined: usize,
    pub unresolved_density: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    /// Minimum rated RF, `None` when no element could be rated.
    pub min_rf: Option<f64>,
    pub failing: usize,
    pub passing: usize,
    pub total_weight: f64,
    pub elements: Vec<ElementRf>,
    /// Minimum rated RF per property with at least one rated element.
    pub property_rf: BTreeMap<PropertyId, f64>,
    pub diagnostics: EvaluationDiagnostics,
}

impl EvaluationResult {
    pub fn is_feasible(&self, target_rf: f64, tolerance: f64) -> bool {
        self.min_rf.is_some_and(|rf| rf >= target_rf - tolerance)
    }

    pub fn property_rf(&self, id: PropertyId) -> Option<f64> {
        self.property_rf.get(&id).copied()
    }

    pub fn critical_element(&self) -> Option<&ElementRf> {
        self.elements
            .iter()
            .filter(|e| e.status.is_rated())
            .min_by(|a, b| a.rf.total_cmp(&b.rf))
    }
}
