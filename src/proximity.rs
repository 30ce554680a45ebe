use crate::model::{PropertyId, StructuralModel};
use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use tracing::info;

/// Symmetric bar/skin adjacency derived once from element centroids.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProximityMap {
    search_distance: f64,
    bar_to_skins: BTreeMap<PropertyId, BTreeSet<PropertyId>>,
    skin_to_bars: BTreeMap<PropertyId, BTreeSet<PropertyId>>,
}

impl ProximityMap {
    pub fn build(model: &StructuralModel, search_distance: f64) -> Self {
        let bars: Vec<(PropertyId, Vec<[f64; 3]>)> = model
            .bar_properties()
            .map(|p| (p.id, model.elements_of(p.id).map(|e| e.centroid).collect()))
            .collect();
        let skins: Vec<(PropertyId, Vec<[f64; 3]>)> = model
            .skin_properties()
            .map(|p| (p.id, model.elements_of(p.id).map(|e| e.centroid).collect()))
            .collect();
        Self::from_centroids(&bars, &skins, search_distance)
    }

    /// Adjacent iff the closest pair of element centroids is within
    /// `search_distance`. Properties without elements are never adjacent.
    pub fn from_centroids(
        bars: &[(PropertyId, Vec<[f64; 3]>)],
        skins: &[(PropertyId, Vec<[f64; 3]>)],
        search_distance: f64,
    ) -> Self {
        let limit_sq = search_distance * search_distance;

        let bar_to_skins: BTreeMap<PropertyId, BTreeSet<PropertyId>> = bars
            .par_iter()
            .map(|(bar_id, bar_pts)| {
                let near: BTreeSet<PropertyId> = skins
                    .iter()
                    .filter(|(_, skin_pts)| within(bar_pts, skin_pts, limit_sq))
                    .map(|(skin_id, _)| *skin_id)
                    .collect();
                (*bar_id, near)
            })
            .filter(|(_, near)| !near.is_empty())
            .collect();

        let mut skin_to_bars: BTreeMap<PropertyId, BTreeSet<PropertyId>> = BTreeMap::new();
        for (bar, skins) in &bar_to_skins {
            for skin in skins {
                skin_to_bars.entry(*skin).or_default().insert(*bar);
            }
        }

        info!(
            "Proximity map: {} bars coupled to {} skins (d <= {})",
            bar_to_skins.len(),
            skin_to_bars.len(),
            search_distance
        );

        Self {
            search_distance,
            bar_to_skins,
            skin_to_bars,
        }
    }

    pub fn search_distance(&self) -> f64 {
        self.search_distance
    }

    pub fn skins_near(&self, bar: PropertyId) -> impl Iterator<Item = PropertyId> + '_ {
        self.bar_to_skins.get(&bar).into_iter().flatten().copied()
    }

    pub fn bars_near(&self, skin: PropertyId) -> impl Iterator<Item = PropertyId> + '_ {
        self.skin_to_bars.get(&skin).into_iter().flatten().copied()
    }

    pub fn are_adjacent(&self, bar: PropertyId, skin: PropertyId) -> bool {
        self.bar_to_skins
            .get(&bar)
            .is_some_and(|s| s.contains(&skin))
    }

    pub fn pair_count(&self) -> usize {
        self.bar_to_skins.values().map(|s| s.len()).sum()
    }

    /// Minimum RF among the bars adjacent to `skin` that have one.
    pub fn controlling_rf<F>(&self, skin: PropertyId, bar_rf: F) -> Option<f64>
    where
        F: Fn(PropertyId) -> Option<f64>,
    {
        self.bars_near(skin)
            .filter_map(bar_rf)
            .min_by(|a, b| a.total_cmp(b))
    }
}

fn within(a: &[[f64; 3]], b: &[[f64; 3]], limit_sq: f64) -> bool {
    a.iter().any(|p| {
        b.iter().any(|q| {
            let dx = p[0] - q[0];
            let dy = p[1] - q[1];
            let dz = p[2] - q[2];
            dx * dx + dy * dy + dz * dz <= limit_sq
        })
    })
}
