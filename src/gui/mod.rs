pub mod tree_panel;

pub use tree_panel::{TreePanel, TreePanelOutput};

use crate::analysis::Analyzer;
use crate::settings::Settings;
use crate::state::{AppState, ProcessingMode};
use crate::tree::{ExperimentId, TreeClick, VersionTree, ZoomDirection};
use crate::vault::ExperimentStore;
use crate::workers::{Task, TaskQueue};
use eframe::egui;
use egui_toast::{Toast, ToastKind, ToastOptions, Toasts};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

pub struct SciGitApp {
    settings: Settings,
    settings_path: String,
    store: Arc<dyn ExperimentStore>,
    queue: TaskQueue,
    state: AppState,
    tree: VersionTree,
    panel: TreePanel,
    toasts: Toasts,
    commit_path: String,
    branch_input: String,
}

impl SciGitApp {
    pub fn new(
        settings: Settings,
        settings_path: impl Into<String>,
        store: Arc<dyn ExperimentStore>,
        analyzer: Arc<dyn Analyzer>,
    ) -> anyhow::Result<Self> {
        let queue = TaskQueue::spawn(store.clone(), analyzer)?;
        Ok(Self {
            tree: VersionTree::new(&settings.version_tree),
            panel: TreePanel::new(&settings.version_tree),
            settings,
            settings_path: settings_path.into(),
            store,
            queue,
            state: AppState::default(),
            toasts: Toasts::new().anchor(egui::Align2::RIGHT_TOP, [10.0, 10.0]),
            commit_path: String::new(),
            branch_input: String::new(),
        })
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut AppState {
        &mut self.state
    }

    pub fn tree(&self) -> &VersionTree {
        &self.tree
    }

    pub fn pending_tasks(&self) -> usize {
        self.queue.pending()
    }

    /// Start-of-frame bookkeeping: drain worker results, then rebuild the
    /// tree if a result (or the UI) asked for it. Must run before any panel
    /// reads input.
    pub fn begin_frame(&mut self) {
        let drained = self.queue.process_results(&mut self.state);
        for err in drained.errors {
            self.toast(err, ToastKind::Error);
        }
        self.apply_pending_snapshot();
    }

    fn apply_pending_snapshot(&mut self) {
        if !self.state.take_tree_refresh() {
            return;
        }
        match self.store.get_tree_data() {
            Ok(records) => {
                self.tree.apply_snapshot(&records);
                let tree = &self.tree;
                self.state.selection.retain(|id| tree.node(*id).is_some());
                if self.state.head_id.is_none() {
                    self.state.head_id = records.last().map(|r| r.id);
                }
            }
            Err(e) => {
                tracing::error!("failed to read tree data: {e:#}");
                self.state.set_status(format!("ERROR: {e}"));
                self.toast(e.to_string(), ToastKind::Error);
            }
        }
    }

    pub fn submit(&mut self, task: Task) {
        if let Err(e) = self.queue.submit(task, &mut self.state) {
            tracing::error!("failed to submit task: {e:#}");
            self.state.finish_processing();
            self.state.set_status(format!("ERROR: {e}"));
            self.toast(e.to_string(), ToastKind::Error);
        }
    }

    /// React to a click resolved by the tree panel. An armed linkage consumes
    /// the click; otherwise the selection is loaded in the background.
    pub fn handle_tree_click(&mut self, click: TreeClick) {
        let TreeClick::Selected(ids) = click else {
            return;
        };
        let Some(&target) = ids.first() else {
            return;
        };
        if let Some(source) = self.state.linkage_source.take() {
            self.link(source, target);
            return;
        }
        self.submit(Task::LoadExperiment { ids });
    }

    fn link(&mut self, source: ExperimentId, target: ExperimentId) {
        if source == target {
            self.state.set_status("CANNOT LINK A NODE TO ITSELF");
            return;
        }
        match self.store.add_linkage(source, target) {
            Ok(true) => {
                self.state
                    .set_status(format!("LINKED NODE {source} TO NODE {target}"));
                self.state.request_tree_refresh();
            }
            Ok(false) => self
                .state
                .set_status(format!("ERROR: NODE {source} NOT FOUND")),
            Err(e) => {
                tracing::error!("failed to add linkage: {e:#}");
                self.state.set_status(format!("ERROR: {e}"));
                self.toast(e.to_string(), ToastKind::Error);
            }
        }
    }

    /// Commit `path` as a new version on the active branch.
    pub fn commit_file(&mut self, path: impl Into<PathBuf>) {
        let task = Task::ProcessNewFile {
            path: path.into(),
            parent_id: self.state.commit_parent(),
            branch: self.state.active_branch.clone(),
            researcher: self.settings.researcher_name.clone(),
        };
        self.submit(task);
    }

    pub fn save_notes(&mut self) {
        let Some(id) = self.state.loaded.as_ref().map(|l| l.id) else {
            self.state.set_status("SELECT A NODE FIRST");
            return;
        };
        match self.store.update_notes(id, &self.state.notes_buffer) {
            Ok(_) => {
                self.toast("Notes saved".into(), ToastKind::Success);
                self.submit(Task::LoadExperiment { ids: vec![id] });
            }
            Err(e) => {
                tracing::error!("failed to save notes: {e:#}");
                self.state.set_status(format!("ERROR: {e}"));
                self.toast(e.to_string(), ToastKind::Error);
            }
        }
    }

    fn toast(&mut self, text: String, kind: ToastKind) {
        if !self.settings.enable_toasts {
            return;
        }
        self.toasts.add(Toast {
            text: text.into(),
            kind,
            options: ToastOptions::default()
                .duration_in_seconds(self.settings.toast_duration as f64),
        });
    }

    fn toolbar(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.label("Search");
            let search = ui.add(
                egui::TextEdit::singleline(&mut self.state.search_text)
                    .hint_text("node name")
                    .desired_width(140.0),
            );
            if search.changed() {
                self.tree.set_search_filter(&self.state.search_text);
            }
            ui.separator();
            if ui.button("−").on_hover_text("Zoom out").clicked() {
                self.tree.zoom(ZoomDirection::Out);
            }
            if ui.button("+").on_hover_text("Zoom in").clicked() {
                self.tree.zoom(ZoomDirection::In);
            }
            if ui.selectable_label(self.state.pan_mode, "Pan").clicked() {
                self.state.pan_mode = !self.state.pan_mode;
                self.state.set_status(if self.state.pan_mode {
                    "PAN MODE ACTIVE"
                } else {
                    "SELECT MODE ACTIVE"
                });
            }
            if ui.button("Link").clicked() {
                self.state.begin_linkage();
            }
            ui.separator();
            ui.add(
                egui::TextEdit::singleline(&mut self.branch_input)
                    .hint_text("branch")
                    .desired_width(90.0),
            );
            if ui.button("Branch").clicked() {
                let name = std::mem::take(&mut self.branch_input);
                self.state.switch_branch(&name);
            }
            if ui.button("Main").clicked() {
                self.state.switch_branch(crate::tree::MAIN_BRANCH);
            }
            ui.separator();
            ui.add(
                egui::TextEdit::singleline(&mut self.commit_path)
                    .hint_text("path/to/data.csv")
                    .desired_width(180.0),
            );
            let idle = !self.state.is_processing;
            if ui.add_enabled(idle, egui::Button::new("Commit")).clicked() {
                let path = self.commit_path.trim().to_string();
                if path.is_empty() {
                    self.state.set_status("ENTER A FILE PATH TO COMMIT");
                } else {
                    self.commit_file(path);
                }
            }
            if ui.add_enabled(idle, egui::Button::new("Analyze")).clicked() {
                match self.state.selection.to_vec()[..] {
                    [id] => self.submit(Task::AnalyzeSelection { id }),
                    _ => self.state.set_status("SELECT 1 FILE TO ANALYZE"),
                }
            }
            if ui
                .add_enabled(idle, egui::Button::new("Analyze Branch"))
                .clicked()
            {
                let branch = self.state.active_branch.clone();
                self.submit(Task::AnalyzeBranch { branch });
            }
            if self.state.is_processing && ui.button("Stop").clicked() {
                self.queue.abort(&mut self.state);
            }
        });
    }

    fn status_bar(&self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            if self.state.is_processing {
                ui.spinner();
            }
            ui.label(&self.state.status_msg);
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                ui.label(format!("{:.0}%", self.tree.camera().zoom * 100.0));
                ui.label(format!("branch: {}", self.state.active_branch));
                if self.state.processing_mode == ProcessingMode::Ai {
                    ui.label("AI");
                }
            });
        });
    }

    fn details(&mut self, ui: &mut egui::Ui) {
        ui.heading("Details");
        egui::ScrollArea::vertical().show(ui, |ui| {
            match &self.state.loaded {
                Some(loaded) => {
                    ui.label(format!("NODE {}: {}", loaded.id, loaded.name));
                    ui.label(format!("branch: {}", loaded.branch));
                    ui.label(format!("by {} at {}", loaded.researcher, loaded.timestamp));
                    ui.label(&loaded.file_path);
                    if let Some(dataset) = &loaded.dataset {
                        ui.label(dataset.describe());
                    }
                }
                None => {
                    ui.label("Select a node");
                }
            }
            if let Some(comparison) = &self.state.comparison {
                ui.separator();
                ui.label(comparison);
            }
            if let Some(analysis) = &self.state.current_analysis {
                ui.separator();
                ui.strong("Analysis");
                ui.label(&analysis.summary);
                for anomaly in &analysis.anomalies {
                    ui.label(format!("! {anomaly}"));
                }
                if !analysis.next_steps.is_empty() {
                    ui.label(format!("Next: {}", analysis.next_steps));
                }
                ui.label(if analysis.is_reproducible {
                    "reproducible"
                } else {
                    "not reproducible"
                });
            }
            if let Some(summary) = &self.state.branch_summary {
                ui.separator();
                ui.strong("Branch history");
                ui.label(summary);
            }
            if self.state.loaded.is_some() {
                ui.separator();
                ui.label("Notes");
                ui.add(
                    egui::TextEdit::multiline(&mut self.state.notes_buffer).desired_rows(4),
                );
                if ui.button("Save Notes").clicked() {
                    self.save_notes();
                }
            }
            ui.separator();
            ui.horizontal(|ui| {
                ui.label("Researcher");
                ui.text_edit_singleline(&mut self.settings.researcher_name);
            });
        });
    }
}

impl eframe::App for SciGitApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.begin_frame();

        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| self.toolbar(ui));
        egui::TopBottomPanel::bottom("status").show(ctx, |ui| self.status_bar(ui));
        egui::SidePanel::right("details")
            .default_width(260.0)
            .show(ctx, |ui| self.details(ui));
        let output = egui::CentralPanel::default()
            .frame(egui::Frame::none())
            .show(ctx, |ui| self.panel.show(ui, &mut self.tree, &mut self.state))
            .inner;
        if let Some(click) = output.click {
            self.handle_tree_click(click);
        }

        if self.settings.enable_toasts {
            self.toasts.show(ctx);
        }
        if self.state.is_processing || self.tree.dragged().is_some() {
            ctx.request_repaint_after(Duration::from_millis(100));
        }
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        if let Err(e) = self.settings.save(&self.settings_path) {
            tracing::error!("failed to save settings: {e:#}");
        }
    }
}
