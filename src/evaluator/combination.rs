use super::stress::LoadCaseId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombinationRow {
    pub id: LoadCaseId,
    pub components: Vec<(LoadCaseId, f64)>,
}

/// Linear combinations of load-case stresses into design stresses.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CombinationTable {
    pub rows: Vec<CombinationRow>,
}

/// The case that produced an element's design stress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GoverningCase {
    LoadCase(LoadCaseId),
    Combined(LoadCaseId),
}

impl std::fmt::Display for GoverningCase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GoverningCase::LoadCase(id) => write!(f, "LC{}", id),
            GoverningCase::Combined(id) => write!(f, "C{}", id),
        }
    }
}

impl CombinationTable {
    pub fn new(rows: Vec<CombinationRow>) -> Self {
        Self { rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Maximum-magnitude combined stress over the rows that apply to this
    /// element. Components the element has no finite stress for are skipped;
    /// a row with no present component does not apply.
    pub fn governing(&self, cases: &BTreeMap<LoadCaseId, f64>) -> Option<(GoverningCase, f64)> {
        let mut best: Option<(GoverningCase, f64)> = None;
        for row in &self.rows {
            let mut total = 0.0;
            let mut present = 0;
            for &(case, multiplier) in &row.components {
                if let Some(&s) = cases.get(&case).filter(|s| s.is_finite()) {
                    total += s * multiplier;
                    present += 1;
                }
            }
            if present == 0 || !total.is_finite() {
                continue;
            }
            if best.map_or(true, |(_, b)| total.abs() > b.abs()) {
                best = Some((GoverningCase::Combined(row.id), total));
            }
        }
        best
    }
}

/// Maximum-magnitude stress across the raw load cases.
pub fn governing_load_case(cases: &BTreeMap<LoadCaseId, f64>) -> Option<(GoverningCase, f64)> {
    cases
        .iter()
        .filter(|(_, s)| s.is_finite())
        .max_by(|a, b| a.1.abs().total_cmp(&b.1.abs()))
        .map(|(&id, &s)| (GoverningCase::LoadCase(id), s))
}
