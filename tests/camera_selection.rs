use eframe::egui::{pos2, vec2, Vec2};
use sci_git::tree::selection::hit_test;
use sci_git::tree::{
    Camera, ExperimentRecord, GridSpacing, Selection, TreeModel, VersionTree, ZoomDirection,
    MAX_SELECTION, MAX_ZOOM, MIN_ZOOM,
};

fn model() -> TreeModel {
    let mut model = TreeModel::default();
    model.rebuild(
        &[
            ExperimentRecord::new(1, None, "main", "a", None),
            ExperimentRecord::new(2, Some(1), "main", "b", None),
            ExperimentRecord::new(3, Some(2), "main", "c", None),
        ],
        GridSpacing::default(),
    );
    model
}

#[test]
fn zoom_in_fifty_times_stays_clamped() {
    let mut tree = VersionTree::default();
    for _ in 0..50 {
        tree.zoom(ZoomDirection::In);
    }
    assert!(tree.camera().zoom <= MAX_ZOOM);
    assert!((tree.camera().zoom - MAX_ZOOM).abs() < 1e-5);
    for _ in 0..50 {
        tree.zoom(ZoomDirection::Out);
    }
    assert!(tree.camera().zoom >= MIN_ZOOM);
}

#[test]
fn zoom_in_then_out_restores_offset() {
    let mut camera = Camera::default();
    let focal = pos2(400.0, 300.0);
    let before = camera;
    assert!(camera.zoom_by(ZoomDirection::In, 0.1, focal));
    camera.zoom_by(ZoomDirection::Out, 0.1, focal);
    assert!((camera.offset - before.offset).length() < 1e-3);
    assert!((camera.zoom - before.zoom).abs() < 1e-5);
}

#[test]
fn clamped_zoom_leaves_offset_alone() {
    let mut camera = Camera {
        offset: vec2(12.0, 34.0),
        zoom: MAX_ZOOM,
    };
    assert!(!camera.zoom_by(ZoomDirection::In, 0.1, pos2(400.0, 300.0)));
    assert_eq!(camera.offset, vec2(12.0, 34.0));
}

#[test]
fn hit_test_uses_strict_radius_plus_tolerance() {
    let model = model();
    let camera = Camera::default();
    let center = camera.world_to_screen(model.node(1).unwrap().pos);
    assert_eq!(hit_test(model.nodes(), &camera, center + vec2(22.9, 0.0), 18.0, 5.0), Some(1));
    assert_eq!(hit_test(model.nodes(), &camera, center + vec2(23.0, 0.0), 18.0, 5.0), None);
    assert_eq!(hit_test(&[], &camera, center, 18.0, 5.0), None);
}

#[test]
fn hit_radius_scales_with_zoom() {
    let model = model();
    let camera = Camera {
        offset: Vec2::ZERO,
        zoom: 2.0,
    };
    let center = camera.world_to_screen(model.node(2).unwrap().pos);
    assert_eq!(hit_test(model.nodes(), &camera, center + vec2(0.0, 40.0), 18.0, 5.0), Some(2));
}

#[test]
fn selection_never_exceeds_two() {
    let mut selection = Selection::default();
    for id in [1, 2, 3, 4, 2, 5, 1, 1, 6] {
        selection.apply_click(id, true);
        assert!(selection.len() <= MAX_SELECTION);
    }
}

#[test]
fn toggling_out_and_back_in_restores_membership() {
    let mut selection = Selection::default();
    selection.apply_click(1, false);
    selection.apply_click(2, true);
    assert_eq!(selection.ids(), &[1, 2]);
    selection.apply_click(2, true);
    assert_eq!(selection.ids(), &[1]);
    selection.apply_click(2, true);
    assert!(selection.contains(2));
    assert_eq!(selection.primary(), Some(1));
    assert_eq!(selection.comparison(), Some(2));
}

#[test]
fn plain_click_replaces_selection() {
    let mut selection = Selection::default();
    selection.apply_click(1, false);
    selection.apply_click(2, true);
    selection.apply_click(3, false);
    assert_eq!(selection.ids(), &[3]);
}
