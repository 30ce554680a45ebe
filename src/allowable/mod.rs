pub mod fit;
pub mod loader;

pub use self::fit::{fit_power_law, AllowableFit, ExclusionReason, SamplePoint};
pub use self::loader::load_allowables;

use crate::config::FitParams;
use crate::model::{ElementId, PropertyId};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// The unit an allowable sample (and its fitted curve) belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FitTarget {
    Property(PropertyId),
    Element(ElementId),
}

#[derive(Debug, Clone, PartialEq)]
pub struct AllowableSample {
    pub target: FitTarget,
    pub thickness: f64,
    pub allowable: f64,
    pub element_type: Option<String>,
}

/// Which fit answered an allowable lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FitSource {
    Element,
    Property,
    /// Only an excluded (constant) element-level fit was available.
    ElementConstant,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FitSummary {
    pub property_fits: usize,
    pub property_excluded: usize,
    pub element_fits: usize,
    pub element_excluded: usize,
}

#[derive(Debug, Clone, Default)]
pub struct AllowableModel {
    property_fits: BTreeMap<PropertyId, AllowableFit>,
    element_fits: BTreeMap<ElementId, AllowableFit>,
}

impl AllowableModel {
    /// Fits every property and every element that has at least one sample.
    pub fn fit(samples: &[AllowableSample], params: &FitParams) -> Self {
        let mut grouped: BTreeMap<FitTarget, Vec<SamplePoint>> = BTreeMap::new();
        for s in samples {
            grouped.entry(s.target).or_default().push(SamplePoint {
                thickness: s.thickness,
                allowable: s.allowable,
                element_type: s.element_type.clone(),
            });
        }

        let fits: Vec<(FitTarget, AllowableFit)> = grouped
            .into_par_iter()
            .map(|(target, points)| {
                let fit = fit_power_law(&points, params.r2_threshold, params.min_points);
                (target, fit)
            })
            .collect();

        let mut model = Self::default();
        for (target, fit) in fits {
            if let Some(reason) = fit.reason {
                debug!("Allowable fit {:?} excluded ({})", target, reason);
            }
            match target {
                FitTarget::Property(id) => {
                    model.property_fits.insert(id, fit);
                }
                FitTarget::Element(id) => {
                    model.element_fits.insert(id, fit);
                }
            }
        }

        let summary = model.summary();
        info!(
            "Allowables fitted: {} properties ({} excluded), {} elements ({} excluded)",
            summary.property_fits,
            summary.property_excluded,
            summary.element_fits,
            summary.element_excluded
        );
        model
    }

    pub fn insert(&mut self, target: FitTarget, fit: AllowableFit) {
        match target {
            FitTarget::Property(id) => self.property_fits.insert(id, fit),
            FitTarget::Element(id) => self.element_fits.insert(id, fit),
        };
    }

    pub fn property_fit(&self, id: PropertyId) -> Option<&AllowableFit> {
        self.property_fits.get(&id)
    }

    pub fn element_fit(&self, id: ElementId) -> Option<&AllowableFit> {
        self.element_fits.get(&id)
    }

    pub fn property_fits(&self) -> impl Iterator<Item = (PropertyId, &AllowableFit)> {
        self.property_fits.iter().map(|(&k, v)| (k, v))
    }

    pub fn element_fits(&self) -> impl Iterator<Item = (ElementId, &AllowableFit)> {
        self.element_fits.iter().map(|(&k, v)| (k, v))
    }

    /// Evaluates one unit's own fit.
    pub fn query(&self, target: FitTarget, thickness: f64) -> Option<f64> {
        let fit = match target {
            FitTarget::Property(id) => self.property_fits.get(&id),
            FitTarget::Element(id) => self.element_fits.get(&id),
        }?;
        positive(fit.evaluate(thickness))
    }

    /// Fit used for an element: a non-excluded element fit, else the property
    /// fit, else an excluded element fit.
    pub fn resolve(&self, element: ElementId, property: PropertyId) -> Option<(FitSource, &AllowableFit)> {
        match (self.element_fits.get(&element), self.property_fits.get(&property)) {
            (Some(e), _) if !e.excluded => Some((FitSource::Element, e)),
            (_, Some(p)) => Some((FitSource::Property, p)),
            (Some(e), None) => Some((FitSource::ElementConstant, e)),
            (None, None) => None,
        }
    }

    pub fn allowable_for(&self, element: ElementId, property: PropertyId, thickness: f64) -> Option<f64> {
        let (_, fit) = self.resolve(element, property)?;
        positive(fit.evaluate(thickness))
    }

    pub fn required_thickness(&self, property: PropertyId, stress: f64, target_rf: f64) -> Option<f64> {
        self.property_fits
            .get(&property)?
            .required_thickness(stress, target_rf)
    }

    pub fn summary(&self) -> FitSummary {
        FitSummary {
            property_fits: self.property_fits.len(),
            property_excluded: self.property_fits.values().filter(|f| f.excluded).count(),
            element_fits: self.element_fits.len(),
            element_excluded: self.element_fits.values().filter(|f| f.excluded).count(),
        }
    }
}

fn positive(v: f64) -> Option<f64> {
    if v.is_finite() && v > 0.0 {
        Some(v)
    } else {
        None
    }
}
