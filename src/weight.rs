use crate::model::{DesignVector, PropertyId, PropertyKind, StructuralModel};
use std::collections::BTreeMap;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq)]
struct PropertyMass {
    kind: PropertyKind,
    /// Σ element area for skins, Σ element length for bars.
    measure: f64,
    density: f64,
    density_resolved: bool,
}

/// Structural weight and its per-property sensitivity, from geometry and
/// density only.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightModel {
    props: BTreeMap<PropertyId, PropertyMass>,
    default_density: f64,
}

impl WeightModel {
    pub fn new(model: &StructuralModel, default_density: f64) -> Self {
        let mut unresolved = 0;
        let props = model
            .properties()
            .iter()
            .map(|p| {
                let measure: f64 = model.elements_of(p.id).map(|e| e.measure).sum();
                let (density, density_resolved) = match model.density(p.id) {
                    Some(d) if d.is_finite() && d > 0.0 => (d, true),
                    _ => {
                        unresolved += 1;
                        (default_density, false)
                    }
                };
                (
                    p.id,
                    PropertyMass {
                        kind: p.kind,
                        measure,
                        density,
                        density_resolved,
                    },
                )
            })
            .collect();

        if unresolved > 0 {
            warn!(
                "⚠️  {} properties have no resolvable material density; using {:e}",
                unresolved, default_density
            );
        }

        Self {
            props,
            default_density,
        }
    }

    pub fn default_density(&self) -> f64 {
        self.default_density
    }

    pub fn unresolved_density_count(&self) -> usize {
        self.props.values().filter(|m| !m.density_resolved).count()
    }

    pub fn density_resolved(&self, id: PropertyId) -> bool {
        self.props.get(&id).is_some_and(|m| m.density_resolved)
    }

    /// ∂W/∂(optimised dimension): `area × ρ` for skins, `length × dim2 × ρ` for bars.
    pub fn sensitivity(&self, id: PropertyId) -> Option<f64> {
        let m = self.props.get(&id)?;
        Some(match m.kind {
            PropertyKind::Skin => m.measure * m.density,
            PropertyKind::Bar { dim2 } => m.measure * dim2 * m.density,
        })
    }

    pub fn property_weight(&self, id: PropertyId, value: f64) -> Option<f64> {
        self.sensitivity(id).map(|s| s * value)
    }

    /// Properties absent from the design contribute nothing.
    pub fn total_weight(&self, design: &DesignVector) -> f64 {
        design
            .iter()
            .filter_map(|(id, v)| self.property_weight(id, v))
            .sum()
    }
}
