use eframe::egui::{Pos2, Vec2};

pub const MIN_ZOOM: f32 = 0.4;
pub const MAX_ZOOM: f32 = 2.0;
pub const DEFAULT_ZOOM_STEP: f32 = 0.1;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ZoomDirection {
    In,
    Out,
}

/// Maps world coordinates to panel-local screen coordinates:
/// `screen = world * zoom + offset`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
    pub offset: Vec2,
    pub zoom: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            offset: Vec2::new(60.0, 300.0),
            zoom: 1.0,
        }
    }
}

impl Camera {
    pub fn world_to_screen(&self, world: Pos2) -> Pos2 {
        (world.to_vec2() * self.zoom + self.offset).to_pos2()
    }

    pub fn screen_to_world(&self, screen: Pos2) -> Pos2 {
        ((screen.to_vec2() - self.offset) / self.zoom).to_pos2()
    }

    /// Step the zoom level and keep `focal` pinned to the same world point.
    /// Returns `false` when the clamp left the zoom unchanged.
    pub fn zoom_by(&mut self, direction: ZoomDirection, step: f32, focal: Pos2) -> bool {
        let old_zoom = self.zoom;
        self.zoom = match direction {
            ZoomDirection::In => (self.zoom + step).min(MAX_ZOOM),
            ZoomDirection::Out => (self.zoom - step).max(MIN_ZOOM),
        };
        if self.zoom == old_zoom {
            return false;
        }
        let focal = focal.to_vec2();
        self.offset = focal - (focal - self.offset) * (self.zoom / old_zoom);
        true
    }

    pub fn pan(&mut self, delta: Vec2) {
        self.offset += delta;
    }

    /// Move the camera so `world` lands on the screen point `center`.
    pub fn center_on(&mut self, world: Pos2, center: Pos2) {
        self.offset = center.to_vec2() - world.to_vec2() * self.zoom;
    }
}
