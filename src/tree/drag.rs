use super::camera::Camera;
use super::model::ExperimentId;
use eframe::egui::Pos2;

/// Per-axis clamp applied to dragged world coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DragBounds {
    pub min: f32,
    pub max: f32,
}

impl Default for DragBounds {
    fn default() -> Self {
        Self {
            min: -2000.0,
            max: 5000.0,
        }
    }
}

impl DragBounds {
    pub fn clamp(&self, p: Pos2) -> Pos2 {
        Pos2::new(p.x.clamp(self.min, self.max), p.y.clamp(self.min, self.max))
    }
}

/// The single node currently following the pointer, if any.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DragState {
    node: Option<ExperimentId>,
}

impl DragState {
    pub fn begin(&mut self, id: ExperimentId) {
        self.node = Some(id);
    }

    pub fn end(&mut self) -> Option<ExperimentId> {
        self.node.take()
    }

    pub fn active(&self) -> Option<ExperimentId> {
        self.node
    }

    pub fn is_active(&self) -> bool {
        self.node.is_some()
    }

    /// World position under `pointer`, clamped to `bounds`.
    pub fn pointer_world(camera: &Camera, pointer: Pos2, bounds: DragBounds) -> Pos2 {
        bounds.clamp(camera.screen_to_world(pointer))
    }
}
