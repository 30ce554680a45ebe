use crate::error::{SizerError, SizerResult};
use crate::evaluator::{LoadCaseId, Simulator, StressField};
use crate::loader::{open_csv, parse_float, parse_id, required_column, LoadReport};
use crate::model::{DesignVector, ElementId, PropertyKind, StructuralModel};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Replays fixed internal loads against the design being evaluated.
///
/// Bars carry an axial force, `stress = axial / (dim1 × dim2)`. Shells carry a
/// running load, `stress = running_load / thickness`. Loads do not
/// redistribute with stiffness, so this is exact for statically determinate
/// structures and a first-order estimate otherwise.
#[derive(Debug, Clone)]
pub struct InternalLoadSimulator {
    model: Arc<StructuralModel>,
    loads: BTreeMap<(LoadCaseId, ElementId), f64>,
    runs: usize,
}

impl InternalLoadSimulator {
    pub fn new<I>(model: Arc<StructuralModel>, loads: I) -> Self
    where
        I: IntoIterator<Item = (LoadCaseId, ElementId, f64)>,
    {
        let loads = loads
            .into_iter()
            .map(|(case, element, load)| ((case, element), load))
            .collect();
        Self {
            model,
            loads,
            runs: 0,
        }
    }

    pub fn from_file<P: AsRef<Path>>(model: Arc<StructuralModel>, path: P) -> SizerResult<(Self, LoadReport)> {
        let (records, report) = load_internal_loads(path)?;
        Ok((Self::new(model, records), report))
    }

    pub fn load_count(&self) -> usize {
        self.loads.len()
    }

    pub fn runs(&self) -> usize {
        self.runs
    }
}

impl Simulator for InternalLoadSimulator {
    fn simulate(&mut self, design: &DesignVector) -> SizerResult<StressField> {
        self.runs += 1;
        let mut field = StressField::default();
        for (&(case, eid), &load) in &self.loads {
            let Some(element) = self.model.element(eid) else {
                // Passed through so the evaluator can count it as unknown.
                field.insert(case, eid, load);
                continue;
            };
            let property = self.model.property(element.property).ok_or_else(|| {
                SizerError::Simulation(format!("element {} has no property", eid))
            })?;
            let dim1 = design.get(property.id).ok_or_else(|| {
                SizerError::Simulation(format!("design has no value for property {}", property.id))
            })?;
            let section = match property.kind {
                PropertyKind::Bar { dim2 } => dim1 * dim2,
                PropertyKind::Skin => dim1,
            };
            if section.is_nan() || section <= 0.0 {
                return Err(SizerError::Simulation(format!(
                    "property {} has a non-positive section ({})",
                    property.id, section
                )));
            }
            field.insert(case, eid, load / section);
        }
        debug!("Replay run #{}: {} stress records", self.runs, field.record_count());
        Ok(field)
    }
}

/// Reads `subcase,element,load` rows.
pub fn load_internal_loads<P: AsRef<Path>>(
    path: P,
) -> SizerResult<(Vec<(LoadCaseId, ElementId, f64)>, LoadReport)> {
    let path = path.as_ref();
    let mut rdr = open_csv(path)?;
    let headers = rdr.headers()?.clone();
    let case_col = required_column(&headers, "subcase", path)?;
    let elem_col = required_column(&headers, "element", path)?;
    let load_col = required_column(&headers, "load", path)?;

    let mut records = Vec::new();
    let mut report = LoadReport::default();
    for (idx, result) in rdr.records().enumerate() {
        report.rows_read += 1;
        let parsed = result.ok().and_then(|rec| {
            Some((
                parse_id(rec.get(case_col)?)?,
                parse_id(rec.get(elem_col)?)?,
                parse_float(rec.get(load_col)?)?,
            ))
        });
        match parsed {
            Some(r) => records.push(r),
            None => {
                debug!("[Row {}] Unparseable load row skipped", idx + 2);
                report.rows_skipped += 1;
            }
        }
    }

    if report.rows_skipped > 0 {
        warn!(
            "⚠️  Skipped {} of {} load rows in '{}'",
            report.rows_skipped,
            report.rows_read,
            path.display()
        );
    }
    info!("📂 Loaded {} internal load records", records.len());
    Ok((records, report))
}
