//! Version tree layout and interaction engine.
//!
//! Records from the vault are laid out on a generation × branch-lane grid,
//! user drags are kept as offsets from that grid, and the camera, selection,
//! search and minimap operate on the resulting world positions. Everything
//! here runs on the UI thread and never performs I/O.

pub mod camera;
pub mod drag;
pub mod minimap;
pub mod model;
pub mod search;
pub mod selection;
pub mod view;

pub use camera::{Camera, ZoomDirection, MAX_ZOOM, MIN_ZOOM};
pub use minimap::{MinimapClick, MinimapFrame};
pub use model::{
    parse_linked_nodes, Connection, ConnectionKind, ExperimentId, ExperimentRecord, GridSpacing,
    TreeModel, TreeNode, MAIN_BRANCH,
};
pub use selection::{Selection, MAX_SELECTION};
pub use view::{TreeClick, VersionTree};
