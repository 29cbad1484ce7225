use crate::settings::VersionTreeSettings;
use crate::state::AppState;
use crate::tree::{
    ConnectionKind, MinimapFrame, TreeClick, VersionTree, ZoomDirection, MAIN_BRANCH,
};
use eframe::egui::{
    self, pos2, vec2, Align2, Color32, FontId, Pos2, Rect, Sense, Shape, Stroke, Vec2,
};

pub const CURVE_SEGMENTS: usize = 20;
/// Screen margin outside the panel within which edges and nodes still draw.
const CULL_MARGIN: f32 = 50.0;
const ARROW_SIZE: f32 = 8.0;
const LABEL_MAX_CHARS: usize = 15;

const BG: Color32 = Color32::from_rgb(20, 20, 26);
const EDGE: Color32 = Color32::from_rgb(100, 100, 110);
const LINK_EDGE: Color32 = Color32::from_rgb(120, 90, 160);
const PORT: Color32 = Color32::from_rgb(150, 150, 160);
const NODE_FILL: Color32 = Color32::from_rgb(45, 45, 52);
const NODE_MAIN: Color32 = Color32::from_rgb(0, 200, 120);
const NODE_BRANCH: Color32 = Color32::from_rgb(90, 140, 255);
const PRIMARY_RING: Color32 = Color32::from_rgb(255, 140, 0);
const COMPARISON_RING: Color32 = Color32::from_rgb(0, 255, 255);
const SEARCH_RING: Color32 = Color32::from_rgb(255, 255, 0);
const TEXT: Color32 = Color32::from_rgb(230, 230, 230);
const TEXT_DIM: Color32 = Color32::from_rgb(150, 150, 150);

#[derive(Clone, Debug, PartialEq)]
pub struct TreePanelOutput {
    pub rect: Rect,
    pub click: Option<TreeClick>,
}

#[derive(Clone, Copy, Debug, Default)]
struct FrameInput {
    pointer: Option<Pos2>,
    pressed: bool,
    down: bool,
    middle: bool,
    delta: Vec2,
    scroll: f32,
    multi: bool,
}

/// Adapter between egui input/painting and the [`VersionTree`] engine.
#[derive(Clone, Debug)]
pub struct TreePanel {
    label_zoom_threshold: f32,
}

impl Default for TreePanel {
    fn default() -> Self {
        Self::new(&VersionTreeSettings::default())
    }
}

impl TreePanel {
    pub fn new(cfg: &VersionTreeSettings) -> Self {
        Self {
            label_zoom_threshold: cfg.label_zoom_threshold,
        }
    }

    /// Handle this frame's pointer input for the tree and paint it into the
    /// remaining space of `ui`.
    pub fn show(
        &self,
        ui: &mut egui::Ui,
        tree: &mut VersionTree,
        state: &mut AppState,
    ) -> TreePanelOutput {
        let (rect, _response) =
            ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());
        tree.set_viewport(rect.size());

        let input = ui.input(|i| FrameInput {
            pointer: i.pointer.latest_pos(),
            pressed: i.pointer.primary_pressed(),
            down: i.pointer.primary_down(),
            middle: i.pointer.middle_down(),
            delta: i.pointer.delta(),
            scroll: i.raw_scroll_delta.y,
            multi: i.modifiers.command || i.modifiers.ctrl,
        });
        let click = self.handle_input(rect, input, tree, state);
        tree.prepare_frame();

        let painter = ui.painter_at(rect);
        painter.rect_filled(rect, 0.0, BG);
        self.paint_edges(&painter, rect, tree);
        self.paint_nodes(&painter, rect, tree, state);
        if let Some(frame) = tree.minimap_frame() {
            paint_minimap(&painter, rect, &frame, tree);
        }

        if !tree.search_filter().is_empty()
            && tree.search_match_count() > 0
            && state.status_msg != "MATCH FOUND"
        {
            state.set_status("MATCH FOUND");
        }

        TreePanelOutput { rect, click }
    }

    fn handle_input(
        &self,
        rect: Rect,
        input: FrameInput,
        tree: &mut VersionTree,
        state: &mut AppState,
    ) -> Option<TreeClick> {
        let local = input
            .pointer
            .filter(|p| rect.contains(*p))
            .map(|p| pos2(p.x - rect.min.x, p.y - rect.min.y));

        if local.is_some() && input.scroll != 0.0 {
            let direction = if input.scroll > 0.0 {
                ZoomDirection::In
            } else {
                ZoomDirection::Out
            };
            tree.zoom(direction);
        }

        let panning = input.middle || (state.pan_mode && input.down);
        if panning && local.is_some() && input.delta != Vec2::ZERO {
            tree.pan(input.delta);
        }

        let mut click = None;
        if !state.pan_mode && input.pressed {
            if let Some(at) = local {
                click = Some(tree.handle_click(at, input.multi, &mut state.selection));
            }
        } else if input.down && tree.dragged().is_some() && input.delta != Vec2::ZERO {
            if let Some(p) = input.pointer {
                tree.update_drag(pos2(p.x - rect.min.x, p.y - rect.min.y));
            }
        }
        if !input.down && tree.dragged().is_some() {
            tree.end_drag();
        }
        click
    }

    fn paint_edges(&self, painter: &egui::Painter, rect: Rect, tree: &VersionTree) {
        let camera = tree.camera();
        let radius = tree.node_radius() * camera.zoom;
        let size = rect.size();
        let offset = rect.min.to_vec2();
        for conn in tree.connections() {
            let s = camera.world_to_screen(conn.start);
            let e = camera.world_to_screen(conn.end);
            if !edge_visible(s, e, size) {
                continue;
            }
            let port_out = s + vec2(radius, 0.0) + offset;
            let port_in = e - vec2(radius, 0.0) + offset;
            let color = match conn.kind {
                ConnectionKind::Tree => EDGE,
                ConnectionKind::Linkage => LINK_EDGE,
            };
            let (points, direction) = edge_curve(port_out, port_in);
            painter.add(Shape::line(points, Stroke::new(2.0, color)));
            painter.add(Shape::convex_polygon(
                arrow_head(port_in, direction).to_vec(),
                color,
                Stroke::NONE,
            ));
            painter.circle_filled(port_out, 3.0, PORT);
            painter.circle_filled(port_in, 3.0, PORT);
        }
    }

    fn paint_nodes(
        &self,
        painter: &egui::Painter,
        rect: Rect,
        tree: &VersionTree,
        state: &AppState,
    ) {
        let camera = tree.camera();
        let radius = tree.node_radius() * camera.zoom;
        let size = rect.size();
        let show_labels = camera.zoom > self.label_zoom_threshold;
        for node in tree.nodes() {
            let local = camera.world_to_screen(node.pos);
            if !point_visible(local, size) {
                continue;
            }
            let p = local + rect.min.to_vec2();
            let is_match = tree.is_search_match(node);

            if let Some(rank) = state.selection.rank(node.id) {
                let ring = if rank == 0 { PRIMARY_RING } else { COMPARISON_RING };
                painter.circle_stroke(p, radius + 4.0, Stroke::new(3.0, ring));
            }
            if is_match {
                painter.circle_stroke(p, radius + 8.0, Stroke::new(3.0, SEARCH_RING));
            }
            let outline = if node.branch == MAIN_BRANCH {
                NODE_MAIN
            } else {
                NODE_BRANCH
            };
            painter.circle(p, radius, NODE_FILL, Stroke::new(2.0, outline));

            if show_labels {
                let font = FontId::proportional(12.0 * camera.zoom.max(0.8));
                painter.text(p, Align2::CENTER_CENTER, node.id.to_string(), font.clone(), TEXT);
                painter.text(
                    p + vec2(0.0, radius + 5.0),
                    Align2::CENTER_TOP,
                    truncate_label(&node.name),
                    font,
                    if is_match { SEARCH_RING } else { TEXT_DIM },
                );
            }
        }
    }
}

fn paint_minimap(painter: &egui::Painter, rect: Rect, frame: &MinimapFrame, tree: &VersionTree) {
    let offset = rect.min.to_vec2();
    let toggle = frame.toggle.translate(offset);
    painter.rect_filled(toggle, 2.0, NODE_FILL);
    painter.rect_stroke(toggle, 2.0, Stroke::new(1.0, PRIMARY_RING));
    painter.text(
        toggle.center(),
        Align2::CENTER_CENTER,
        if frame.collapsed { "+" } else { "_" },
        FontId::monospace(12.0),
        PRIMARY_RING,
    );
    let Some(body) = &frame.body else {
        return;
    };
    let body_rect = body.rect.translate(offset);
    painter.rect_filled(body_rect, 0.0, Color32::from_rgba_unmultiplied(15, 15, 20, 220));
    painter.rect_stroke(body_rect, 0.0, Stroke::new(1.0, PRIMARY_RING));
    for (id, dot) in &body.dots {
        let color = match tree.node(*id) {
            Some(n) if n.branch != MAIN_BRANCH => NODE_BRANCH,
            _ => NODE_MAIN,
        };
        painter.circle_filled(*dot + offset, 2.0, color);
    }
    if let Some(view) = body.viewport {
        painter.rect_stroke(view.translate(offset), 0.0, Stroke::new(1.0, TEXT));
    }
}

/// Cubic Bézier from `start` to `end` with horizontal control handles of
/// half the x distance (40 when nearly vertical). Returns the polyline and
/// the tangent at `end`.
pub fn edge_curve(start: Pos2, end: Pos2) -> (Vec<Pos2>, Vec2) {
    let mut dist = (end.x - start.x) / 2.0;
    if dist.abs() < 10.0 {
        dist = 40.0;
    }
    let cp1 = start + vec2(dist, 0.0);
    let cp2 = end - vec2(dist, 0.0);

    let mut points = Vec::with_capacity(CURVE_SEGMENTS + 1);
    points.push(start);
    for step in 1..=CURVE_SEGMENTS {
        let t = step as f32 / CURVE_SEGMENTS as f32;
        let u = 1.0 - t;
        let p = start.to_vec2() * (u * u * u)
            + cp1.to_vec2() * (3.0 * u * u * t)
            + cp2.to_vec2() * (3.0 * u * t * t)
            + end.to_vec2() * (t * t * t);
        points.push(p.to_pos2());
    }
    (points, end - cp2)
}

fn arrow_head(tip: Pos2, direction: Vec2) -> [Pos2; 3] {
    let dir = if direction.length_sq() > 0.0 {
        direction.normalized()
    } else {
        Vec2::X
    };
    let normal = vec2(-dir.y, dir.x);
    let back = tip - dir * ARROW_SIZE;
    [
        tip,
        back + normal * (ARROW_SIZE / 2.0),
        back - normal * (ARROW_SIZE / 2.0),
    ]
}

fn edge_visible(s: Pos2, e: Pos2, size: Vec2) -> bool {
    !(s.x.max(e.x) < -CULL_MARGIN
        || s.x.min(e.x) > size.x + CULL_MARGIN
        || s.y.max(e.y) < -CULL_MARGIN
        || s.y.min(e.y) > size.y + CULL_MARGIN)
}

fn point_visible(p: Pos2, size: Vec2) -> bool {
    -CULL_MARGIN < p.x
        && p.x < size.x + CULL_MARGIN
        && -CULL_MARGIN < p.y
        && p.y < size.y + CULL_MARGIN
}

pub fn truncate_label(name: &str) -> String {
    if name.chars().count() > LABEL_MAX_CHARS {
        let head: String = name.chars().take(LABEL_MAX_CHARS).collect();
        format!("{head}..")
    } else {
        name.to_string()
    }
}
