use criterion::{criterion_group, criterion_main, Criterion};
use rfsizer::allowable::{AllowableModel, AllowableSample, FitTarget};
use rfsizer::config::FitParams;
use rfsizer::evaluator::{DesignEvaluator, StressField};
use rfsizer::model::{DesignVector, Element, Property, PropertyKind, StructuralModel};
use rfsizer::proximity::ProximityMap;
use rfsizer::weight::WeightModel;
use rfsizer::SizerResult;
use std::hint::black_box;
use std::sync::Arc;

const GRID: u32 = 40;

/// Stiffened panel: one bar per grid line, one skin bay per cell, 4 elements each.
fn setup_model() -> StructuralModel {
    let mut properties = Vec::new();
    let mut elements = Vec::new();
    let mut eid = 1;
    for i in 0..GRID {
        for j in 0..GRID {
            let pid = i * GRID + j + 1;
            let kind = if j == 0 {
                PropertyKind::Bar { dim2: 12.0 }
            } else {
                PropertyKind::Skin
            };
            properties.push(Property {
                id: pid,
                kind,
                value: 3.0,
                lower_bound: 1.0,
                upper_bound: 15.0,
                floor: None,
                material: None,
            });
            for k in 0..4 {
                elements.push(Element {
                    id: eid,
                    property: pid,
                    measure: 250.0,
                    centroid: [i as f64 * 200.0 + k as f64 * 50.0, j as f64 * 200.0, 0.0],
                });
                eid += 1;
            }
        }
    }
    StructuralModel::new(properties, elements, vec![]).expect("valid benchmark model")
}

fn setup_allowables(model: &StructuralModel) -> AllowableModel {
    let samples: Vec<AllowableSample> = model
        .properties()
        .iter()
        .flat_map(|p| {
            (1..=6).map(move |t| AllowableSample {
                target: FitTarget::Property(p.id),
                thickness: t as f64,
                allowable: 120.0 * (t as f64).powf(0.7),
                element_type: None,
            })
        })
        .collect();
    AllowableModel::fit(&samples, &FitParams::default())
}

fn setup_field(model: &StructuralModel) -> StressField {
    let mut field = StressField::new();
    for e in model.elements() {
        for case in 1..=3 {
            field.insert(case, e.id, 40.0 * case as f64 + (e.id % 17) as f64);
        }
    }
    field
}

fn criterion_benchmark(c: &mut Criterion) {
    let model = Arc::new(setup_model());
    let allowables = Arc::new(setup_allowables(&model));
    let weights = Arc::new(WeightModel::new(&model, 2.8e-6));
    let field = setup_field(&model);
    let design = model.initial_design();
    let evaluator = DesignEvaluator::new(model.clone(), allowables, weights, |_: &DesignVector| -> SizerResult<StressField> {
        Ok(StressField::new())
    });

    c.bench_function("assess (6.4k elements, 3 cases)", |b| {
        b.iter(|| evaluator.assess(black_box(&design), black_box(&field), 1.0))
    });

    c.bench_function("proximity map (1.6k properties)", |b| {
        b.iter(|| ProximityMap::build(black_box(&model), 150.0))
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
