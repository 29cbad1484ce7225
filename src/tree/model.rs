use eframe::egui::{Pos2, Vec2};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Identifier assigned by the vault. Monotonically increasing, never reused.
pub type ExperimentId = i64;

/// Lane reserved for the default branch before any record is seen.
pub const MAIN_BRANCH: &str = "main";

/// One row of the relational history as read from storage.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExperimentRecord {
    pub id: ExperimentId,
    #[serde(default)]
    pub parent_id: Option<ExperimentId>,
    #[serde(default = "default_branch")]
    pub branch: String,
    #[serde(default)]
    pub name: String,
    /// JSON encoded list of target ids. Kept as raw text so malformed values
    /// survive the trip from storage and can be ignored here.
    #[serde(default)]
    pub linked_nodes: Option<String>,
}

fn default_branch() -> String {
    MAIN_BRANCH.to_string()
}

impl ExperimentRecord {
    pub fn new(
        id: ExperimentId,
        parent_id: Option<ExperimentId>,
        branch: &str,
        name: &str,
        linked_nodes: Option<&str>,
    ) -> Self {
        Self {
            id,
            parent_id,
            branch: branch.to_string(),
            name: name.to_string(),
            linked_nodes: linked_nodes.map(str::to_string),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TreeNode {
    pub id: ExperimentId,
    pub parent_id: Option<ExperimentId>,
    pub branch: String,
    pub name: String,
    pub generation: usize,
    pub lane: usize,
    pub base_pos: Pos2,
    pub manual_offset: Vec2,
    /// Authoritative world position: `base_pos + manual_offset`, or the live
    /// pointer position while the node is being dragged.
    pub pos: Pos2,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionKind {
    Tree,
    Linkage,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Connection {
    pub from: ExperimentId,
    pub to: ExperimentId,
    pub start: Pos2,
    pub end: Pos2,
    pub kind: ConnectionKind,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GridSpacing {
    pub generation: f32,
    pub lane: f32,
}

impl Default for GridSpacing {
    fn default() -> Self {
        Self {
            generation: 160.0,
            lane: 100.0,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct TreeModel {
    nodes: Vec<TreeNode>,
    node_lookup: HashMap<ExperimentId, usize>,
    extra_links: BTreeMap<ExperimentId, Vec<ExperimentId>>,
    connections: Vec<Connection>,
}

impl TreeModel {
    /// Rebuild every node and connection from a snapshot ordered by ascending
    /// id. Manual offsets of ids present in both the previous and the new
    /// snapshot are carried forward; everything else is dropped.
    pub fn rebuild(&mut self, records: &[ExperimentRecord], spacing: GridSpacing) {
        let old_offsets: HashMap<ExperimentId, Vec2> = self
            .nodes
            .iter()
            .map(|n| (n.id, n.manual_offset))
            .collect();

        let mut nodes: Vec<TreeNode> = Vec::with_capacity(records.len());
        let mut node_lookup: HashMap<ExperimentId, usize> = HashMap::with_capacity(records.len());
        let mut extra_links: BTreeMap<ExperimentId, Vec<ExperimentId>> = BTreeMap::new();
        let mut lanes: HashMap<&str, usize> = HashMap::from([(MAIN_BRANCH, 0)]);

        for record in records {
            if let Some(raw) = record.linked_nodes.as_deref() {
                if let Some(targets) = parse_linked_nodes(raw) {
                    extra_links.insert(record.id, targets);
                }
            }

            let parent = record
                .parent_id
                .and_then(|pid| node_lookup.get(&pid).map(|&idx| &nodes[idx]));
            let generation = match (record.parent_id, parent) {
                (_, Some(p)) => p.generation + 1,
                (Some(pid), None) => {
                    tracing::debug!(
                        id = record.id,
                        parent = pid,
                        "dangling parent, treating as root"
                    );
                    0
                }
                (None, None) => 0,
            };

            let next_lane = lanes.len();
            let lane = *lanes.entry(record.branch.as_str()).or_insert(next_lane);

            let base_pos = Pos2::new(
                generation as f32 * spacing.generation,
                lane as f32 * spacing.lane,
            );
            let manual_offset = old_offsets.get(&record.id).copied().unwrap_or(Vec2::ZERO);

            node_lookup.insert(record.id, nodes.len());
            nodes.push(TreeNode {
                id: record.id,
                parent_id: record.parent_id,
                branch: record.branch.clone(),
                name: record.name.clone(),
                generation,
                lane,
                base_pos,
                manual_offset,
                pos: base_pos + manual_offset,
            });
        }

        self.nodes = nodes;
        self.node_lookup = node_lookup;
        self.extra_links = extra_links;
        self.refresh_connections();
    }

    /// Recompute tree and linkage edges from the live node positions.
    pub fn refresh_connections(&mut self) {
        let mut connections = Vec::with_capacity(self.nodes.len());
        for (idx, node) in self.nodes.iter().enumerate() {
            // Only parents seen earlier in the snapshot resolve; later ones
            // were treated as dangling during layout.
            let Some(&pidx) = node.parent_id.and_then(|pid| self.node_lookup.get(&pid)) else {
                continue;
            };
            if pidx >= idx {
                continue;
            }
            let parent = &self.nodes[pidx];
            connections.push(Connection {
                from: parent.id,
                to: node.id,
                start: parent.pos,
                end: node.pos,
                kind: ConnectionKind::Tree,
            });
        }
        for (&source, targets) in &self.extra_links {
            let Some(src) = self.node(source) else {
                continue;
            };
            for &target in targets {
                if let Some(tgt) = self.node(target) {
                    connections.push(Connection {
                        from: source,
                        to: target,
                        start: src.pos,
                        end: tgt.pos,
                        kind: ConnectionKind::Linkage,
                    });
                }
            }
        }
        self.connections = connections;
    }

    /// Place a node at `pos` and record the difference to its grid position
    /// as its manual offset. Returns `false` when the id is unknown.
    pub fn set_node_pos(&mut self, id: ExperimentId, pos: Pos2) -> bool {
        let Some(&idx) = self.node_lookup.get(&id) else {
            return false;
        };
        let node = &mut self.nodes[idx];
        node.pos = pos;
        node.manual_offset = pos - node.base_pos;
        true
    }

    pub fn nodes(&self) -> &[TreeNode] {
        &self.nodes
    }

    pub fn node(&self, id: ExperimentId) -> Option<&TreeNode> {
        self.node_lookup.get(&id).map(|&idx| &self.nodes[idx])
    }

    pub fn contains(&self, id: ExperimentId) -> bool {
        self.node_lookup.contains_key(&id)
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }
}

/// Parse a persisted `linked_nodes` value. Empty or malformed input yields
/// `None`; there is no partial parse.
pub fn parse_linked_nodes(raw: &str) -> Option<Vec<ExperimentId>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    match serde_json::from_str::<Vec<ExperimentId>>(raw) {
        Ok(targets) if !targets.is_empty() => Some(targets),
        Ok(_) => None,
        Err(err) => {
            tracing::debug!(value = raw, %err, "ignoring malformed linked_nodes");
            None
        }
    }
}
