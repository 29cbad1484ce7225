use super::camera::Camera;
use super::model::{ExperimentId, TreeNode};
use eframe::egui::Pos2;

pub const MAX_SELECTION: usize = 2;

/// Ordered selection of at most two nodes. The first entry is the primary
/// selection, the second the comparison target.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Selection {
    ids: Vec<ExperimentId>,
}

impl Selection {
    pub fn ids(&self) -> &[ExperimentId] {
        &self.ids
    }

    pub fn to_vec(&self) -> Vec<ExperimentId> {
        self.ids.clone()
    }

    pub fn primary(&self) -> Option<ExperimentId> {
        self.ids.first().copied()
    }

    pub fn comparison(&self) -> Option<ExperimentId> {
        self.ids.get(1).copied()
    }

    pub fn contains(&self, id: ExperimentId) -> bool {
        self.ids.contains(&id)
    }

    /// Position of `id` in the selection: `0` primary, `1` comparison.
    pub fn rank(&self, id: ExperimentId) -> Option<usize> {
        self.ids.iter().position(|&s| s == id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn set_single(&mut self, id: ExperimentId) {
        self.ids.clear();
        self.ids.push(id);
    }

    pub fn retain(&mut self, keep: impl FnMut(&ExperimentId) -> bool) {
        self.ids.retain(keep);
    }

    /// Apply a click on `id`. With the multi-select modifier a selected id is
    /// toggled out, an unselected one appended while there is room, and
    /// otherwise the selection restarts from `id`.
    pub fn apply_click(&mut self, id: ExperimentId, multi: bool) {
        if !multi {
            self.set_single(id);
            return;
        }
        if let Some(idx) = self.rank(id) {
            self.ids.remove(idx);
        } else if self.ids.len() < MAX_SELECTION {
            self.ids.push(id);
        } else {
            self.set_single(id);
        }
    }
}

/// First node in list order whose screen position lies within
/// `radius * zoom + tolerance` of `point`.
pub fn hit_test(
    nodes: &[TreeNode],
    camera: &Camera,
    point: Pos2,
    radius: f32,
    tolerance: f32,
) -> Option<ExperimentId> {
    let reach = radius * camera.zoom + tolerance;
    nodes
        .iter()
        .find(|node| camera.world_to_screen(node.pos).distance(point) < reach)
        .map(|node| node.id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use eframe::egui::Vec2;

    fn node_at(id: ExperimentId, x: f32, y: f32) -> TreeNode {
        TreeNode {
            id,
            parent_id: None,
            branch: "main".into(),
            name: format!("n{id}"),
            generation: 0,
            lane: 0,
            base_pos: Pos2::new(x, y),
            manual_offset: Vec2::ZERO,
            pos: Pos2::new(x, y),
        }
    }

    #[test]
    fn overlapping_nodes_resolve_by_list_order() {
        let camera = Camera {
            offset: Vec2::ZERO,
            zoom: 1.0,
        };
        let nodes = vec![node_at(1, 0.0, 0.0), node_at(2, 4.0, 0.0)];
        assert_eq!(hit_test(&nodes, &camera, Pos2::new(4.0, 0.0), 18.0, 5.0), Some(1));
    }

    #[test]
    fn reach_scales_with_zoom() {
        let camera = Camera {
            offset: Vec2::ZERO,
            zoom: 0.5,
        };
        let nodes = vec![node_at(1, 0.0, 0.0)];
        assert_eq!(hit_test(&nodes, &camera, Pos2::new(13.0, 0.0), 18.0, 5.0), Some(1));
        assert_eq!(hit_test(&nodes, &camera, Pos2::new(14.5, 0.0), 18.0, 5.0), None);
        assert_eq!(hit_test(&[], &camera, Pos2::ZERO, 18.0, 5.0), None);
    }

    #[test]
    fn modifier_click_on_full_selection_restarts_it() {
        let mut sel = Selection::default();
        sel.apply_click(1, true);
        sel.apply_click(2, true);
        sel.apply_click(3, true);
        assert_eq!(sel.ids(), &[3]);
    }

    #[test]
    fn plain_click_replaces_selection() {
        let mut sel = Selection::default();
        sel.apply_click(1, true);
        sel.apply_click(2, true);
        sel.apply_click(2, false);
        assert_eq!(sel.ids(), &[2]);
        assert_eq!(sel.comparison(), None);
    }
}
