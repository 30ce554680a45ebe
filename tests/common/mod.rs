#![allow(dead_code)]

use rfsizer::allowable::{AllowableModel, AllowableSample, FitTarget};
use rfsizer::config::{Config, FitParams};
use rfsizer::evaluator::{DesignEvaluator, Simulator};
use rfsizer::model::{Element, Property, PropertyId, PropertyKind, StructuralModel};
use rfsizer::proximity::ProximityMap;
use rfsizer::simulator::InternalLoadSimulator;
use rfsizer::weight::WeightModel;
use std::sync::Arc;

/// Builder for Property to clean up tests
pub struct PropertyBuilder {
    prop: Property,
}

impl PropertyBuilder {
    pub fn skin(id: PropertyId) -> Self {
        Self {
            prop: Property {
                id,
                kind: PropertyKind::Skin,
                value: 4.0,
                lower_bound: 1.0,
                upper_bound: 10.0,
                floor: None,
                material: None,
            },
        }
    }

    pub fn bar(id: PropertyId, dim2: f64) -> Self {
        Self {
            prop: Property {
                id,
                kind: PropertyKind::Bar { dim2 },
                value: 5.0,
                lower_bound: 1.0,
                upper_bound: 20.0,
                floor: None,
                material: None,
            },
        }
    }

    pub fn value(mut self, value: f64) -> Self {
        self.prop.value = value;
        self
    }

    pub fn bounds(mut self, lower: f64, upper: f64) -> Self {
        self.prop.lower_bound = lower;
        self.prop.upper_bound = upper;
        self
    }

    pub fn floor(mut self, floor: f64) -> Self {
        self.prop.floor = Some(floor);
        self
    }

    pub fn build(self) -> Property {
        self.prop
    }
}

pub fn element(id: u32, property: PropertyId, measure: f64, centroid: [f64; 3]) -> Element {
    Element {
        id,
        property,
        measure,
        centroid,
    }
}

/// `allowable = 100 × t^0.5` sampled at t = 1..5 for every listed property.
pub fn sqrt_allowables(properties: &[PropertyId]) -> AllowableModel {
    let samples: Vec<AllowableSample> = properties
        .iter()
        .flat_map(|&id| {
            (1..=5).map(move |t| AllowableSample {
                target: FitTarget::Property(id),
                thickness: t as f64,
                allowable: 100.0 * (t as f64).sqrt(),
                element_type: None,
            })
        })
        .collect();
    AllowableModel::fit(&samples, &FitParams::default())
}

/// Two bars (1, 2) and three skins (11, 12, 13). Skin 13 carries no stress
/// and sits 100 units from bar 1.
pub struct PanelFixture {
    pub model: Arc<StructuralModel>,
    pub allowables: Arc<AllowableModel>,
    pub weights: Arc<WeightModel>,
    pub proximity: Arc<ProximityMap>,
    pub loads: Vec<(u32, u32, f64)>,
}

impl PanelFixture {
    pub fn new() -> Self {
        let props = vec![
            PropertyBuilder::bar(1, 10.0).build(),
            PropertyBuilder::bar(2, 10.0).build(),
            PropertyBuilder::skin(11).build(),
            PropertyBuilder::skin(12).build(),
            PropertyBuilder::skin(13).build(),
        ];
        let elements = vec![
            element(101, 1, 100.0, [0.0, 0.0, 0.0]),
            element(102, 2, 100.0, [500.0, 0.0, 0.0]),
            element(111, 11, 1000.0, [50.0, 0.0, 0.0]),
            element(112, 12, 1000.0, [550.0, 0.0, 0.0]),
            element(113, 13, 1000.0, [0.0, 100.0, 0.0]),
        ];
        let model = Arc::new(StructuralModel::new(props, elements, vec![]).unwrap());
        let allowables = Arc::new(sqrt_allowables(&[1, 2, 11, 12, 13]));
        let weights = Arc::new(WeightModel::new(&model, 2.8e-6));
        let proximity = Arc::new(ProximityMap::build(&model, 150.0));
        // Fully stressed at t = 20^(2/3), 5^(2/3), 10^(2/3), 5^(2/3).
        let loads = vec![
            (1, 101, 20_000.0),
            (2, 101, -12_000.0),
            (1, 102, 5_000.0),
            (1, 111, 1_000.0),
            (1, 112, 500.0),
        ];
        Self {
            model,
            allowables,
            weights,
            proximity,
            loads,
        }
    }

    pub fn simulator(&self) -> InternalLoadSimulator {
        InternalLoadSimulator::new(self.model.clone(), self.loads.clone())
    }

    pub fn evaluator<S: Simulator>(&self, simulator: S) -> DesignEvaluator<S> {
        DesignEvaluator::new(
            self.model.clone(),
            self.allowables.clone(),
            self.weights.clone(),
            simulator,
        )
    }
}

pub fn seeded_config(seed: u64) -> Config {
    let mut config = Config::default();
    config.run.seed = Some(seed);
    config
}
