use super::camera::Camera;
use super::model::{ExperimentId, TreeNode};
use eframe::egui::{pos2, vec2, Pos2, Rect, Vec2};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MinimapConfig {
    pub size: Vec2,
    /// Gap between the minimap and the panel's bottom-right corner.
    pub margin: f32,
    /// World units added around the node bounding box.
    pub world_padding: f32,
    pub toggle_size: f32,
}

impl Default for MinimapConfig {
    fn default() -> Self {
        Self {
            size: vec2(160.0, 120.0),
            margin: 10.0,
            world_padding: 100.0,
            toggle_size: 20.0,
        }
    }
}

/// Uniform world to minimap mapping anchored at the padded bounding box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MinimapProjection {
    pub origin: Pos2,
    pub scale: f32,
    pub rect: Rect,
}

impl MinimapProjection {
    pub fn to_minimap(&self, world: Pos2) -> Pos2 {
        self.rect.min + (world - self.origin) * self.scale
    }

    pub fn to_world(&self, minimap: Pos2) -> Pos2 {
        self.origin + (minimap - self.rect.min) / self.scale
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct MinimapBody {
    pub rect: Rect,
    pub projection: MinimapProjection,
    /// Nodes that land inside `rect`, in panel-local coordinates.
    pub dots: Vec<(ExperimentId, Pos2)>,
    /// Visible part of the main viewport, clipped to `rect`.
    pub viewport: Option<Rect>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MinimapFrame {
    pub toggle: Rect,
    pub collapsed: bool,
    pub body: Option<MinimapBody>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MinimapClick {
    Toggled { collapsed: bool },
    Navigated(Pos2),
    Missed,
}

#[derive(Clone, Debug, Default)]
pub struct Minimap {
    collapsed: bool,
    config: MinimapConfig,
}

impl Minimap {
    pub fn new(config: MinimapConfig, collapsed: bool) -> Self {
        Self { collapsed, config }
    }

    pub fn is_collapsed(&self) -> bool {
        self.collapsed
    }

    pub fn body_rect(&self, panel: Vec2) -> Rect {
        let size = self.config.size;
        Rect::from_min_size(
            pos2(
                panel.x - size.x - self.config.margin,
                panel.y - size.y - self.config.margin,
            ),
            size,
        )
    }

    pub fn toggle_rect(&self, panel: Vec2) -> Rect {
        let t = self.config.toggle_size;
        if self.collapsed {
            let inset = self.config.margin + t;
            Rect::from_min_size(pos2(panel.x - inset, panel.y - inset), vec2(t, t))
        } else {
            let body = self.body_rect(panel);
            Rect::from_min_size(pos2(body.max.x - t, body.min.y - t), vec2(t, t))
        }
    }

    pub fn projection(&self, nodes: &[TreeNode], panel: Vec2) -> Option<MinimapProjection> {
        let first = nodes.first()?;
        let mut bounds = Rect::from_min_max(first.pos, first.pos);
        for node in &nodes[1..] {
            bounds.extend_with(node.pos);
        }
        let bounds = bounds.expand(self.config.world_padding);
        let world_w = bounds.width().max(1.0);
        let world_h = bounds.height().max(1.0);
        let size = self.config.size;
        let scale = (size.x / world_w).min(size.y / world_h);
        Some(MinimapProjection {
            origin: bounds.min,
            scale,
            rect: self.body_rect(panel),
        })
    }

    /// Geometry for one frame. `None` when there is nothing to show.
    pub fn frame(&self, nodes: &[TreeNode], camera: &Camera, panel: Vec2) -> Option<MinimapFrame> {
        let projection = self.projection(nodes, panel)?;
        let toggle = self.toggle_rect(panel);
        if self.collapsed {
            return Some(MinimapFrame {
                toggle,
                collapsed: true,
                body: None,
            });
        }

        let rect = projection.rect;
        let dots = nodes
            .iter()
            .map(|n| (n.id, projection.to_minimap(n.pos)))
            .filter(|(_, p)| rect.contains(*p))
            .collect();

        let view_min = (-camera.offset / camera.zoom).to_pos2();
        let view_size = panel / camera.zoom;
        let view = Rect::from_min_size(
            projection.to_minimap(view_min),
            view_size * projection.scale,
        );
        let clipped = view.intersect(rect);
        let viewport = (clipped.width() > 0.0 && clipped.height() > 0.0).then_some(clipped);

        Some(MinimapFrame {
            toggle,
            collapsed: false,
            body: Some(MinimapBody {
                rect,
                projection,
                dots,
                viewport,
            }),
        })
    }

    /// Resolve a panel-local click. Clicks are ignored while the node list is
    /// empty; the toggle wins over the minimap body.
    pub fn handle_click(
        &mut self,
        local: Pos2,
        nodes: &[TreeNode],
        camera: &mut Camera,
        panel: Vec2,
    ) -> MinimapClick {
        if nodes.is_empty() {
            return MinimapClick::Missed;
        }
        if self.toggle_rect(panel).contains(local) {
            self.collapsed = !self.collapsed;
            return MinimapClick::Toggled {
                collapsed: self.collapsed,
            };
        }
        if self.collapsed {
            return MinimapClick::Missed;
        }
        let Some(projection) = self.projection(nodes, panel) else {
            return MinimapClick::Missed;
        };
        if !projection.rect.contains(local) {
            return MinimapClick::Missed;
        }
        let world = projection.to_world(local);
        camera.center_on(world, (panel / 2.0).to_pos2());
        MinimapClick::Navigated(world)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node_at(id: ExperimentId, x: f32, y: f32) -> TreeNode {
        TreeNode {
            id,
            parent_id: None,
            branch: "main".into(),
            name: String::new(),
            generation: 0,
            lane: 0,
            base_pos: pos2(x, y),
            manual_offset: Vec2::ZERO,
            pos: pos2(x, y),
        }
    }

    #[test]
    fn single_node_bounds_never_collapse_to_zero() {
        let minimap = Minimap::default();
        let p = minimap
            .projection(&[node_at(1, 0.0, 0.0)], vec2(800.0, 600.0))
            .expect("projection");
        assert!(p.scale.is_finite() && p.scale > 0.0);
        assert_eq!(p.origin, pos2(-100.0, -100.0));
    }

    #[test]
    fn scale_preserves_aspect() {
        let minimap = Minimap::default();
        let nodes = [node_at(1, 0.0, 0.0), node_at(2, 1000.0, 0.0)];
        let p = minimap.projection(&nodes, vec2(800.0, 600.0)).expect("projection");
        // 1200 x 200 world units into 160 x 120: width bound.
        assert!((p.scale - 160.0 / 1200.0).abs() < 1e-6);
    }

    #[test]
    fn collapsed_frame_has_only_toggle() {
        let minimap = Minimap::new(MinimapConfig::default(), true);
        let frame = minimap
            .frame(&[node_at(1, 0.0, 0.0)], &Camera::default(), vec2(800.0, 600.0))
            .expect("frame");
        assert!(frame.collapsed);
        assert!(frame.body.is_none());
        assert_eq!(frame.toggle, Rect::from_min_size(pos2(770.0, 570.0), vec2(20.0, 20.0)));
    }

    #[test]
    fn empty_node_list_draws_and_accepts_nothing() {
        let mut minimap = Minimap::default();
        let mut camera = Camera::default();
        let panel = vec2(800.0, 600.0);
        assert!(minimap.frame(&[], &camera, panel).is_none());
        let toggle = minimap.toggle_rect(panel).center();
        assert_eq!(minimap.handle_click(toggle, &[], &mut camera, panel), MinimapClick::Missed);
        assert!(!minimap.is_collapsed());
    }
}
