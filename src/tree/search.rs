use super::model::{ExperimentId, TreeNode};

/// Live name filter. Matching is case-insensitive substring search and is
/// evaluated on demand so it always sees current node positions.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SearchHighlight {
    filter: String,
    needle: String,
}

impl SearchHighlight {
    pub fn set_filter(&mut self, value: &str) {
        self.filter = value.to_string();
        self.needle = value.to_lowercase();
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    pub fn is_active(&self) -> bool {
        !self.needle.is_empty()
    }

    pub fn matches(&self, name: &str) -> bool {
        self.is_active() && name.to_lowercase().contains(&self.needle)
    }

    pub fn first_match(&self, nodes: &[TreeNode]) -> Option<ExperimentId> {
        nodes.iter().find(|n| self.matches(&n.name)).map(|n| n.id)
    }

    pub fn match_count(&self, nodes: &[TreeNode]) -> usize {
        nodes.iter().filter(|n| self.matches(&n.name)).count()
    }
}
