use super::{PropertyId, StructuralModel};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One value of the optimised dimension per property (bar `dim1`, skin thickness).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DesignVector {
    values: BTreeMap<PropertyId, f64>,
}

impl DesignVector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: PropertyId) -> Option<f64> {
        self.values.get(&id).copied()
    }

    pub fn set(&mut self, id: PropertyId, value: f64) {
        self.values.insert(id, value);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = PropertyId> + '_ {
        self.values.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (PropertyId, f64)> + '_ {
        self.values.iter().map(|(&k, &v)| (k, v))
    }
}

impl FromIterator<(PropertyId, f64)> for DesignVector {
    fn from_iter<I: IntoIterator<Item = (PropertyId, f64)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

/// Effective `[lower, upper]` interval per property, floor locking applied.
#[derive(Debug, Clone, PartialEq)]
pub struct DesignBounds {
    bounds: BTreeMap<PropertyId, (f64, f64)>,
}

impl DesignBounds {
    pub fn from_model(model: &StructuralModel, floor_lock: bool) -> Self {
        let bounds = model
            .properties()
            .iter()
            .map(|p| {
                let mut lower = p.lower_bound;
                if floor_lock {
                    if let Some(floor) = p.floor {
                        lower = lower.max(floor).min(p.upper_bound);
                    }
                }
                (p.id, (lower, p.upper_bound))
            })
            .collect();
        Self { bounds }
    }

    pub fn get(&self, id: PropertyId) -> Option<(f64, f64)> {
        self.bounds.get(&id).copied()
    }

    pub fn lower(&self, id: PropertyId) -> Option<f64> {
        self.get(id).map(|b| b.0)
    }

    pub fn upper(&self, id: PropertyId) -> Option<f64> {
        self.get(id).map(|b| b.1)
    }

    pub fn len(&self) -> usize {
        self.bounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bounds.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = PropertyId> + '_ {
        self.bounds.keys().copied()
    }

    /// Clamp a single value; ids without bounds pass through untouched.
    pub fn clamp_value(&self, id: PropertyId, value: f64) -> f64 {
        match self.get(id) {
            Some((lo, hi)) if value.is_finite() => value.clamp(lo, hi),
            Some((lo, _)) => lo,
            None => value,
        }
    }

    /// Returns a design carrying exactly the bounded properties, every value
    /// clamped. Properties missing from `design` start at their lower bound.
    pub fn clamp(&self, design: &DesignVector) -> DesignVector {
        self.bounds
            .iter()
            .map(|(&id, &(lo, _))| {
                let v = design.get(id).unwrap_or(lo);
                (id, self.clamp_value(id, v))
            })
            .collect()
    }

    pub fn contains(&self, design: &DesignVector) -> bool {
        self.bounds.iter().all(|(&id, &(lo, hi))| match design.get(id) {
            Some(v) => v >= lo && v <= hi,
            None => false,
        })
    }

    pub fn at_lower(&self) -> DesignVector {
        self.bounds.iter().map(|(&id, &(lo, _))| (id, lo)).collect()
    }

    pub fn at_upper(&self) -> DesignVector {
        self.bounds.iter().map(|(&id, &(_, hi))| (id, hi)).collect()
    }

    /// Maps a design into the unit hypercube, property order ascending by id.
    pub fn normalize(&self, design: &DesignVector) -> Vec<f64> {
        self.bounds
            .iter()
            .map(|(&id, &(lo, hi))| {
                let v = design.get(id).unwrap_or(lo);
                let span = hi - lo;
                if span > 0.0 {
                    ((v - lo) / span).clamp(0.0, 1.0)
                } else {
                    0.0
                }
            })
            .collect()
    }

    /// Inverse of [`normalize`](Self::normalize); coordinates are clamped to `[0, 1]`.
    pub fn denormalize(&self, x: &[f64]) -> DesignVector {
        self.bounds
            .iter()
            .zip(x.iter().chain(std::iter::repeat(&0.0)))
            .map(|((&id, &(lo, hi)), &u)| {
                let u = if u.is_finite() { u.clamp(0.0, 1.0) } else { 0.0 };
                (id, (lo + u * (hi - lo)).clamp(lo, hi))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Property, PropertyKind};

    fn model() -> StructuralModel {
        let props = vec![
            Property {
                id: 1,
                kind: PropertyKind::Skin,
                value: 2.0,
                lower_bound: 1.0,
                upper_bound: 5.0,
                floor: Some(1.5),
                material: None,
            },
            Property {
                id: 2,
                kind: PropertyKind::Bar { dim2: 10.0 },
                value: 8.0,
                lower_bound: 2.0,
                upper_bound: 6.0,
                floor: None,
                material: None,
            },
        ];
        StructuralModel::new(props, vec![], vec![]).unwrap()
    }

    #[test]
    fn test_floor_lock_raises_lower_bound() {
        let m = model();
        assert_eq!(DesignBounds::from_model(&m, false).lower(1), Some(1.0));
        assert_eq!(DesignBounds::from_model(&m, true).lower(1), Some(1.5));
    }

    #[test]
    fn test_clamp_pulls_initial_design_inside() {
        let m = model();
        let b = DesignBounds::from_model(&m, false);
        let d = b.clamp(&m.initial_design());
        assert_eq!(d.get(2), Some(6.0));
        assert!(b.contains(&d));
    }

    #[test]
    fn test_normalize_denormalize_identity() {
        let m = model();
        let b = DesignBounds::from_model(&m, false);
        let d: DesignVector = [(1, 3.0), (2, 4.0)].into_iter().collect();
        let x = b.normalize(&d);
        assert!((x[0] - 0.5).abs() < 1e-12);
        assert_eq!(b.denormalize(&x), d);
    }
}
