mod common;

use common::{element, PanelFixture, PropertyBuilder};
use rfsizer::evaluator::{EvaluationDiagnostics, EvaluationResult};
use rfsizer::model::{DesignBounds, StructuralModel};
use rfsizer::optimizer::{resolve_property_rfs, PropertyRf, StrategyContext};
use rfsizer::proximity::ProximityMap;
use rstest::rstest;

fn bar_and_skin(gap: f64) -> StructuralModel {
    StructuralModel::new(
        vec![PropertyBuilder::bar(1, 10.0).build(), PropertyBuilder::skin(2).build()],
        vec![
            element(10, 1, 100.0, [0.0, 0.0, 0.0]),
            element(20, 2, 500.0, [gap, 0.0, 0.0]),
        ],
        vec![],
    )
    .unwrap()
}

#[rstest]
#[case(100.0, true)]
#[case(150.0, true)]
#[case(200.0, false)]
fn test_adjacency_follows_search_distance(#[case] gap: f64, #[case] adjacent: bool) {
    let map = ProximityMap::build(&bar_and_skin(gap), 150.0);
    assert_eq!(map.are_adjacent(1, 2), adjacent);
    assert_eq!(map.bars_near(2).count(), usize::from(adjacent));
    assert_eq!(map.skins_near(1).count(), usize::from(adjacent));
}

#[test]
fn test_closest_element_pair_decides() {
    let model = StructuralModel::new(
        vec![PropertyBuilder::bar(1, 10.0).build(), PropertyBuilder::skin(2).build()],
        vec![
            element(10, 1, 100.0, [0.0, 0.0, 0.0]),
            element(11, 1, 100.0, [1000.0, 0.0, 0.0]),
            element(20, 2, 500.0, [1000.0, 120.0, 0.0]),
        ],
        vec![],
    )
    .unwrap();
    assert!(ProximityMap::build(&model, 150.0).are_adjacent(1, 2));
}

#[test]
fn test_panel_coupling() {
    let fx = PanelFixture::new();
    let map = &fx.proximity;
    assert_eq!(map.search_distance(), 150.0);
    assert_eq!(map.skins_near(1).collect::<Vec<_>>(), vec![11, 13]);
    assert_eq!(map.skins_near(2).collect::<Vec<_>>(), vec![12]);
    assert_eq!(map.pair_count(), 3);
}

#[test]
fn test_unstressed_skin_borrows_controlling_rf() {
    let fx = PanelFixture::new();
    let bounds = DesignBounds::from_model(&fx.model, false);
    let ctx = StrategyContext {
        model: &fx.model,
        bounds: &bounds,
        proximity: &fx.proximity,
        weights: &fx.weights,
        allowables: &fx.allowables,
        target_rf: 1.0,
        tolerance: 0.05,
        iteration: 1,
    };
    let result = EvaluationResult {
        min_rf: Some(0.7),
        failing: 1,
        passing: 3,
        total_weight: 1.0,
        elements: vec![],
        property_rf: [(1, 0.7), (2, 1.4), (11, 1.1), (12, 2.0)].into_iter().collect(),
        diagnostics: EvaluationDiagnostics::default(),
    };

    let rfs = resolve_property_rfs(&ctx, &result);
    assert_eq!(rfs[&11], PropertyRf::Direct(1.1));
    assert_eq!(rfs[&13], PropertyRf::Proximity(0.7));
    assert_eq!(rfs.len(), 5);
}
