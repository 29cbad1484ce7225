use eframe::egui::{self, pos2, vec2, Event, Modifiers, PointerButton, Pos2, RawInput, Rect};
use sci_git::gui::{TreePanel, TreePanelOutput};
use sci_git::state::AppState;
use sci_git::tree::{ExperimentRecord, TreeClick, VersionTree};

fn run_frame(
    ctx: &egui::Context,
    panel: &TreePanel,
    tree: &mut VersionTree,
    state: &mut AppState,
    events: Vec<Event>,
) -> TreePanelOutput {
    let raw = RawInput {
        screen_rect: Some(Rect::from_min_size(Pos2::ZERO, vec2(800.0, 600.0))),
        events,
        ..Default::default()
    };
    let mut output = None;
    let _ = ctx.run(raw, |ctx| {
        egui::CentralPanel::default()
            .frame(egui::Frame::none())
            .show(ctx, |ui| {
                output = Some(panel.show(ui, tree, state));
            });
    });
    output.expect("panel shown")
}

fn button(pos: Pos2, pressed: bool) -> Event {
    Event::PointerButton {
        pos,
        button: PointerButton::Primary,
        pressed,
        modifiers: Modifiers::default(),
    }
}

fn tree() -> VersionTree {
    let mut tree = VersionTree::default();
    tree.apply_snapshot(&[
        ExperimentRecord::new(1, None, "main", "baseline", None),
        ExperimentRecord::new(2, Some(1), "main", "heated", None),
    ]);
    tree
}

#[test]
fn press_selects_and_drag_moves_node() {
    let ctx = egui::Context::default();
    let panel = TreePanel::default();
    let mut tree = tree();
    let mut state = AppState::default();

    let out = run_frame(&ctx, &panel, &mut tree, &mut state, vec![]);
    assert_eq!(out.rect.min, Pos2::ZERO);

    let at = tree.camera().world_to_screen(tree.node(2).unwrap().pos);
    run_frame(&ctx, &panel, &mut tree, &mut state, vec![Event::PointerMoved(at)]);
    let out = run_frame(&ctx, &panel, &mut tree, &mut state, vec![button(at, true)]);
    assert_eq!(out.click, Some(TreeClick::Selected(vec![2])));
    assert_eq!(state.selection.ids(), &[2]);
    assert_eq!(tree.dragged(), Some(2));

    let before = tree.node(2).unwrap().pos;
    let to = at + vec2(20.0, 10.0);
    run_frame(&ctx, &panel, &mut tree, &mut state, vec![Event::PointerMoved(to)]);
    let after = tree.node(2).unwrap().pos;
    assert!((after - (before + vec2(20.0, 10.0))).length() < 1e-3);

    run_frame(&ctx, &panel, &mut tree, &mut state, vec![button(to, false)]);
    assert_eq!(tree.dragged(), None);
}

#[test]
fn pan_mode_drags_the_camera_instead_of_selecting() {
    let ctx = egui::Context::default();
    let panel = TreePanel::default();
    let mut tree = tree();
    let mut state = AppState::default();
    state.pan_mode = true;
    let start = pos2(300.0, 100.0);
    run_frame(&ctx, &panel, &mut tree, &mut state, vec![Event::PointerMoved(start)]);
    let offset = tree.camera().offset;
    let out = run_frame(&ctx, &panel, &mut tree, &mut state, vec![button(start, true)]);
    assert_eq!(out.click, None);

    run_frame(
        &ctx,
        &panel,
        &mut tree,
        &mut state,
        vec![Event::PointerMoved(start + vec2(15.0, -5.0))],
    );
    assert_eq!(tree.camera().offset, offset + vec2(15.0, -5.0));
    assert!(state.selection.is_empty());
}

#[test]
fn active_search_reports_match_in_status() {
    let ctx = egui::Context::default();
    let panel = TreePanel::default();
    let mut tree = tree();
    let mut state = AppState::default();
    tree.set_search_filter("heat");
    run_frame(&ctx, &panel, &mut tree, &mut state, vec![]);
    assert_eq!(state.status_msg, "MATCH FOUND");
}
