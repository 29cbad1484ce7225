use crate::analysis::{DatasetSummary, ExperimentAnalysis};
use crate::tree::{ExperimentId, Selection, MAIN_BRANCH};

pub const STATUS_READY: &str = "SYSTEM READY";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProcessingMode {
    #[default]
    Idle,
    Local,
    Ai,
}

/// Experiment currently shown in the details panel.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadedExperiment {
    pub id: ExperimentId,
    pub name: String,
    pub file_path: String,
    pub branch: String,
    pub researcher: String,
    pub timestamp: String,
    pub dataset: Option<DatasetSummary>,
}

/// State shared between the UI panels and the result-application step of
/// the task queue. Only the UI thread touches it; the worker communicates
/// exclusively through [`crate::workers::TaskResult`].
#[derive(Debug, Clone)]
pub struct AppState {
    pub selection: Selection,
    pub head_id: Option<ExperimentId>,
    pub active_branch: String,
    pub status_msg: String,
    pub is_processing: bool,
    pub processing_mode: ProcessingMode,
    pub current_analysis: Option<ExperimentAnalysis>,
    pub loaded: Option<LoadedExperiment>,
    /// Text shown for a two-node comparison.
    pub comparison: Option<String>,
    pub branch_summary: Option<String>,
    pub notes_buffer: String,
    /// Armed by the link button; the next selected node becomes the target.
    pub linkage_source: Option<ExperimentId>,
    pub pan_mode: bool,
    pub search_text: String,
    needs_tree_update: bool,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            selection: Selection::default(),
            head_id: None,
            active_branch: MAIN_BRANCH.to_string(),
            status_msg: STATUS_READY.to_string(),
            is_processing: false,
            processing_mode: ProcessingMode::Idle,
            current_analysis: None,
            loaded: None,
            comparison: None,
            branch_summary: None,
            notes_buffer: String::new(),
            linkage_source: None,
            pan_mode: false,
            search_text: String::new(),
            // The first frame always pulls a snapshot.
            needs_tree_update: true,
        }
    }
}

impl AppState {
    pub fn request_tree_refresh(&mut self) {
        self.needs_tree_update = true;
    }

    pub fn tree_refresh_pending(&self) -> bool {
        self.needs_tree_update
    }

    /// Consume the refresh flag. Returns whether a rebuild was requested.
    pub fn take_tree_refresh(&mut self) -> bool {
        std::mem::take(&mut self.needs_tree_update)
    }

    pub fn set_status(&mut self, msg: impl Into<String>) {
        self.status_msg = msg.into();
    }

    pub fn finish_processing(&mut self) {
        self.is_processing = false;
        self.processing_mode = ProcessingMode::Idle;
    }

    /// Arm the linkage workflow from the primary selection.
    pub fn begin_linkage(&mut self) -> bool {
        match self.selection.primary() {
            Some(id) => {
                self.linkage_source = Some(id);
                self.set_status(format!("SELECT TARGET TO LINK FROM NODE {id}"));
                true
            }
            None => {
                self.set_status("SELECT A NODE FIRST TO LINK");
                false
            }
        }
    }

    /// Parent used for the next commit: the primary selection, else the head.
    pub fn commit_parent(&self) -> Option<ExperimentId> {
        self.selection.primary().or(self.head_id)
    }

    pub fn switch_branch(&mut self, name: &str) {
        let name = name.trim();
        if name.is_empty() || name == MAIN_BRANCH {
            self.active_branch = MAIN_BRANCH.to_string();
            self.set_status("RETURNED TO MAIN");
        } else {
            self.active_branch = name.to_string();
            self.set_status(format!("BRANCH: {name}"));
        }
    }
}
