use super::StrategyContext;
use crate::evaluator::EvaluationResult;
use crate::model::PropertyId;
use std::collections::BTreeMap;

/// Where a property's RF came from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PropertyRf {
    /// Minimum RF over the property's own rated elements.
    Direct(f64),
    /// No own RF; controlling RF of the adjacent bars.
    Proximity(f64),
}

impl PropertyRf {
    pub fn value(&self) -> f64 {
        match self {
            PropertyRf::Direct(v) | PropertyRf::Proximity(v) => *v,
        }
    }

    pub fn is_direct(&self) -> bool {
        matches!(self, PropertyRf::Direct(_))
    }
}

/// Property RFs for one evaluation. Properties with neither an own RF nor a
/// rated neighbour are absent.
pub fn resolve_property_rfs(
    ctx: &StrategyContext<'_>,
    result: &EvaluationResult,
) -> BTreeMap<PropertyId, PropertyRf> {
    let mut rfs: BTreeMap<PropertyId, PropertyRf> = result
        .property_rf
        .iter()
        .map(|(&id, &rf)| (id, PropertyRf::Direct(rf)))
        .collect();

    for skin in ctx.model.skin_properties() {
        if rfs.contains_key(&skin.id) {
            continue;
        }
        if let Some(rf) = ctx.proximity.controlling_rf(skin.id, |bar| result.property_rf(bar)) {
            rfs.insert(skin.id, PropertyRf::Proximity(rf));
        }
    }
    rfs
}
