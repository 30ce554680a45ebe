use crate::model::ElementId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub type LoadCaseId = u32;

/// Per-(load case, element) stress as returned by a simulator run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StressField {
    by_element: BTreeMap<ElementId, BTreeMap<LoadCaseId, f64>>,
}

impl StressField {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, case: LoadCaseId, element: ElementId, stress: f64) {
        self.by_element.entry(element).or_default().insert(case, stress);
    }

    pub fn cases_of(&self, element: ElementId) -> Option<&BTreeMap<LoadCaseId, f64>> {
        self.by_element.get(&element)
    }

    pub fn elements(&self) -> impl Iterator<Item = ElementId> + '_ {
        self.by_element.keys().copied()
    }

    pub fn element_count(&self) -> usize {
        self.by_element.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_element.is_empty()
    }

    pub fn record_count(&self) -> usize {
        self.by_element.values().map(|c| c.len()).sum()
    }
}

impl FromIterator<(LoadCaseId, ElementId, f64)> for StressField {
    fn from_iter<I: IntoIterator<Item = (LoadCaseId, ElementId, f64)>>(iter: I) -> Self {
        let mut field = StressField::new();
        for (case, element, stress) in iter {
            field.insert(case, element, stress);
        }
        field
    }
}
