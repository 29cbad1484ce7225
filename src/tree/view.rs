use super::camera::{Camera, ZoomDirection};
use super::drag::{DragBounds, DragState};
use super::minimap::{Minimap, MinimapClick, MinimapConfig, MinimapFrame};
use super::model::{Connection, ExperimentId, ExperimentRecord, GridSpacing, TreeModel, TreeNode};
use super::search::SearchHighlight;
use super::selection::{hit_test, Selection};
use crate::settings::VersionTreeSettings;
use eframe::egui::{vec2, Pos2, Vec2};

/// Outcome of a primary click inside the tree panel.
#[derive(Clone, Debug, PartialEq)]
pub enum TreeClick {
    MinimapToggled { collapsed: bool },
    MinimapNavigated(Pos2),
    /// A node was hit; carries the selection after the click.
    Selected(Vec<ExperimentId>),
    Missed,
}

/// Version tree interaction engine: layout model, camera, drag, search and
/// minimap. Selection lives in [`crate::state::AppState`] and is passed in.
#[derive(Clone, Debug)]
pub struct VersionTree {
    model: TreeModel,
    camera: Camera,
    drag: DragState,
    search: SearchHighlight,
    minimap: Minimap,
    viewport: Vec2,
    spacing: GridSpacing,
    node_radius: f32,
    hit_tolerance: f32,
    zoom_step: f32,
    drag_bounds: DragBounds,
}

impl Default for VersionTree {
    fn default() -> Self {
        Self::new(&VersionTreeSettings::default())
    }
}

impl VersionTree {
    pub fn new(cfg: &VersionTreeSettings) -> Self {
        Self {
            model: TreeModel::default(),
            camera: Camera::default(),
            drag: DragState::default(),
            search: SearchHighlight::default(),
            minimap: Minimap::new(
                MinimapConfig {
                    size: vec2(cfg.minimap_width, cfg.minimap_height),
                    margin: cfg.minimap_margin,
                    world_padding: cfg.minimap_world_padding,
                    ..MinimapConfig::default()
                },
                cfg.minimap_start_collapsed,
            ),
            viewport: vec2(800.0, 600.0),
            spacing: GridSpacing {
                generation: cfg.generation_spacing,
                lane: cfg.lane_spacing,
            },
            node_radius: cfg.node_radius,
            hit_tolerance: cfg.hit_tolerance,
            zoom_step: cfg.zoom_step,
            drag_bounds: DragBounds {
                min: cfg.drag_min,
                max: cfg.drag_max,
            },
        }
    }

    /// Rebuild the layout from a fresh snapshot. A drag whose node vanished
    /// is dropped.
    pub fn apply_snapshot(&mut self, records: &[ExperimentRecord]) {
        self.model.rebuild(records, self.spacing);
        if let Some(id) = self.drag.active() {
            if !self.model.contains(id) {
                tracing::debug!(id, "dragged node vanished after rebuild");
                self.drag.end();
            }
        }
        tracing::debug!(
            nodes = self.model.nodes().len(),
            connections = self.model.connections().len(),
            "version tree rebuilt"
        );
    }

    /// Per-frame bookkeeping before painting.
    pub fn prepare_frame(&mut self) {
        if self.drag.is_active() {
            self.model.refresh_connections();
        }
    }

    /// Resolve a click in panel-local coordinates: minimap first, then nodes.
    pub fn handle_click(
        &mut self,
        local: Pos2,
        multi: bool,
        selection: &mut Selection,
    ) -> TreeClick {
        match self
            .minimap
            .handle_click(local, self.model.nodes(), &mut self.camera, self.viewport)
        {
            MinimapClick::Toggled { collapsed } => return TreeClick::MinimapToggled { collapsed },
            MinimapClick::Navigated(world) => return TreeClick::MinimapNavigated(world),
            MinimapClick::Missed => {}
        }

        let Some(id) = hit_test(
            self.model.nodes(),
            &self.camera,
            local,
            self.node_radius,
            self.hit_tolerance,
        ) else {
            return TreeClick::Missed;
        };
        selection.apply_click(id, multi);
        self.drag.begin(id);
        TreeClick::Selected(selection.to_vec())
    }

    /// Move the dragged node under the pointer (panel-local coordinates).
    pub fn update_drag(&mut self, pointer: Pos2) {
        let Some(id) = self.drag.active() else {
            return;
        };
        let world = DragState::pointer_world(&self.camera, pointer, self.drag_bounds);
        if !self.model.set_node_pos(id, world) {
            self.drag.end();
        }
    }

    pub fn end_drag(&mut self) -> Option<ExperimentId> {
        let ended = self.drag.end();
        if ended.is_some() {
            self.model.refresh_connections();
        }
        ended
    }

    pub fn zoom(&mut self, direction: ZoomDirection) -> bool {
        let focal = self.viewport_center();
        self.camera.zoom_by(direction, self.zoom_step, focal)
    }

    pub fn pan(&mut self, delta: Vec2) {
        self.camera.pan(delta);
    }

    pub fn center_on_node(&mut self, id: ExperimentId) -> bool {
        let Some(pos) = self.model.node(id).map(|n| n.pos) else {
            return false;
        };
        let center = self.viewport_center();
        self.camera.center_on(pos, center);
        true
    }

    /// Update the search filter and jump to the first match, if any.
    pub fn set_search_filter(&mut self, value: &str) -> Option<ExperimentId> {
        self.search.set_filter(value);
        let first = self.search.first_match(self.model.nodes())?;
        self.center_on_node(first);
        Some(first)
    }

    pub fn is_search_match(&self, node: &TreeNode) -> bool {
        self.search.matches(&node.name)
    }

    pub fn search_match_count(&self) -> usize {
        self.search.match_count(self.model.nodes())
    }

    pub fn minimap_frame(&self) -> Option<MinimapFrame> {
        self.minimap.frame(self.model.nodes(), &self.camera, self.viewport)
    }

    pub fn set_viewport(&mut self, size: Vec2) {
        self.viewport = size;
    }

    pub fn viewport_center(&self) -> Pos2 {
        (self.viewport / 2.0).to_pos2()
    }

    pub fn nodes(&self) -> &[TreeNode] {
        self.model.nodes()
    }

    pub fn node(&self, id: ExperimentId) -> Option<&TreeNode> {
        self.model.node(id)
    }

    pub fn connections(&self) -> &[Connection] {
        self.model.connections()
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn dragged(&self) -> Option<ExperimentId> {
        self.drag.active()
    }

    pub fn search_filter(&self) -> &str {
        self.search.filter()
    }

    pub fn node_radius(&self) -> f32 {
        self.node_radius
    }
}
