use crate::analysis::{Analyzer, DatasetSummary, ExperimentAnalysis};
use crate::state::{AppState, LoadedExperiment, ProcessingMode};
use crate::tree::ExperimentId;
use crate::vault::{Experiment, ExperimentStore, NewExperiment};
use anyhow::{anyhow, bail, ensure};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{Receiver, Sender, TryRecvError};
use std::sync::Arc;
use std::thread::JoinHandle;

/// Number of most recent versions summarised for a branch.
pub const BRANCH_HISTORY_LEN: usize = 5;

/// Work accepted by the background worker.
#[derive(Debug, Clone, PartialEq)]
pub enum Task {
    /// One id loads the experiment, two ids compare them.
    LoadExperiment { ids: Vec<ExperimentId> },
    ProcessNewFile {
        path: PathBuf,
        parent_id: Option<ExperimentId>,
        branch: String,
        researcher: String,
    },
    AnalyzeSelection { id: ExperimentId },
    AnalyzeBranch { branch: String },
}

impl Task {
    pub fn mode(&self) -> ProcessingMode {
        match self {
            Task::LoadExperiment { .. } | Task::ProcessNewFile { .. } => ProcessingMode::Local,
            Task::AnalyzeSelection { .. } | Task::AnalyzeBranch { .. } => ProcessingMode::Ai,
        }
    }

    fn status(&self) -> String {
        match self {
            Task::LoadExperiment { ids } if ids.len() > 1 => "COMPARING...".into(),
            Task::LoadExperiment { .. } => "LOADING...".into(),
            Task::ProcessNewFile { .. } => "SAVING & VERSIONING...".into(),
            Task::AnalyzeSelection { .. } => "ANALYZING FILE...".into(),
            Task::AnalyzeBranch { .. } => "ANALYZING BRANCH...".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Loaded {
    Single {
        experiment: Experiment,
        dataset: Option<DatasetSummary>,
    },
    Comparison {
        ids: [ExperimentId; 2],
        summary: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisOutcome {
    Experiment {
        id: ExperimentId,
        analysis: ExperimentAnalysis,
    },
    Branch { branch: String, summary: String },
}

/// Typed record posted by the worker. Only [`TaskQueue::process_results`]
/// applies these to [`AppState`].
#[derive(Debug, Clone, PartialEq)]
pub enum TaskResult {
    LoadComplete(Loaded),
    NewFileComplete {
        experiment: Experiment,
        dataset: Option<DatasetSummary>,
    },
    AnalysisReady(AnalysisOutcome),
    /// The task finished after an abort; its output was discarded.
    Cancelled,
    Error(String),
}

/// Summary of one drain of the result queue.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Drained {
    pub applied: usize,
    pub errors: Vec<String>,
}

/// Single background worker fed through a task channel and answering on a
/// result channel. Every task carries a submit sequence number; an abort
/// cancels every task submitted up to that point.
pub struct TaskQueue {
    task_tx: Option<Sender<(u64, Task)>>,
    result_rx: Receiver<TaskResult>,
    aborted_through: Arc<AtomicU64>,
    next_seq: u64,
    pending: usize,
    handle: Option<JoinHandle<()>>,
}

impl TaskQueue {
    pub fn spawn(
        store: Arc<dyn ExperimentStore>,
        analyzer: Arc<dyn Analyzer>,
    ) -> anyhow::Result<Self> {
        let (task_tx, task_rx) = std::sync::mpsc::channel::<(u64, Task)>();
        let (result_tx, result_rx) = std::sync::mpsc::channel::<TaskResult>();
        let aborted_through = Arc::new(AtomicU64::new(0));
        let worker = Worker {
            store,
            analyzer,
            aborted_through: aborted_through.clone(),
        };
        let handle = std::thread::Builder::new()
            .name("sci-git-worker".into())
            .spawn(move || worker.run(task_rx, result_tx))?;
        Ok(Self {
            task_tx: Some(task_tx),
            result_rx,
            aborted_through,
            next_seq: 1,
            pending: 0,
            handle: Some(handle),
        })
    }

    /// Queue `task` and mark the state as processing.
    pub fn submit(&mut self, task: Task, state: &mut AppState) -> anyhow::Result<()> {
        let tx = self
            .task_tx
            .as_ref()
            .ok_or_else(|| anyhow!("task queue is shut down"))?;
        let seq = self.next_seq;
        state.is_processing = true;
        state.processing_mode = task.mode();
        state.set_status(task.status());
        tracing::info!(seq, ?task, "submitting task");
        tx.send((seq, task))
            .map_err(|_| anyhow!("worker thread has stopped"))?;
        self.next_seq += 1;
        self.pending += 1;
        Ok(())
    }

    /// Stop waiting for every task submitted so far. Analyses among them that
    /// finish later come back as [`TaskResult::Cancelled`]; tasks submitted
    /// afterwards are unaffected. Results already queued are still applied.
    pub fn abort(&self, state: &mut AppState) {
        let last = self.next_seq - 1;
        self.aborted_through.fetch_max(last, Ordering::SeqCst);
        state.finish_processing();
        state.set_status("AI ABORTED.");
        tracing::info!(through = last, "tasks aborted by user");
    }

    /// Whether the task submitted with sequence number `seq` was aborted.
    pub fn is_aborted(&self, seq: u64) -> bool {
        seq <= self.aborted_through.load(Ordering::SeqCst)
    }

    /// Tasks submitted whose result has not been drained yet.
    pub fn pending(&self) -> usize {
        self.pending
    }

    /// Drain every result currently queued and apply it to `state`.
    pub fn process_results(&mut self, state: &mut AppState) -> Drained {
        let mut drained = Drained::default();
        loop {
            match self.result_rx.try_recv() {
                Ok(result) => {
                    self.pending = self.pending.saturating_sub(1);
                    if let Some(err) = apply_result(result, state) {
                        drained.errors.push(err);
                    }
                    if self.pending == 0 {
                        state.finish_processing();
                    }
                    drained.applied += 1;
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    if self.pending > 0 {
                        tracing::warn!(pending = self.pending, "worker disconnected");
                        self.pending = 0;
                        state.finish_processing();
                    }
                    break;
                }
            }
        }
        drained
    }
}

impl Drop for TaskQueue {
    fn drop(&mut self) {
        self.aborted_through.store(u64::MAX, Ordering::SeqCst);
        self.task_tx.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!("worker thread panicked");
            }
        }
    }
}

/// Apply one result. Returns the error message for `Error` results.
pub fn apply_result(result: TaskResult, state: &mut AppState) -> Option<String> {
    match result {
        TaskResult::LoadComplete(Loaded::Single {
            experiment,
            dataset,
        }) => {
            state.set_status(format!("LOADED: {}", experiment.name));
            show_experiment(state, experiment, dataset);
        }
        TaskResult::LoadComplete(Loaded::Comparison { ids, summary }) => {
            tracing::debug!(?ids, "comparison loaded");
            state.comparison = Some(summary);
            state.set_status("COMPARISON COMPLETE");
        }
        TaskResult::NewFileComplete {
            experiment,
            dataset,
        } => {
            let id = experiment.id;
            state.head_id = Some(id);
            state.selection.set_single(id);
            state.set_status(format!("COMMITTED BY {}", experiment.researcher));
            show_experiment(state, experiment, dataset);
            state.request_tree_refresh();
        }
        TaskResult::AnalysisReady(AnalysisOutcome::Experiment { id, analysis }) => {
            tracing::debug!(id, "analysis ready");
            state.current_analysis = Some(analysis);
            state.set_status("ANALYSIS COMPLETE");
        }
        TaskResult::AnalysisReady(AnalysisOutcome::Branch { branch, summary }) => {
            tracing::debug!(%branch, "branch summary ready");
            state.branch_summary = Some(summary);
            state.set_status("ANALYSIS COMPLETE");
        }
        TaskResult::Cancelled => {}
        TaskResult::Error(msg) => {
            state.set_status(format!("ERROR: {msg}"));
            state.finish_processing();
            return Some(msg);
        }
    }
    None
}

fn show_experiment(state: &mut AppState, experiment: Experiment, dataset: Option<DatasetSummary>) {
    state.comparison = None;
    state.notes_buffer = experiment.notes.clone();
    state.current_analysis = experiment.analysis.clone();
    state.loaded = Some(LoadedExperiment {
        id: experiment.id,
        name: experiment.name,
        file_path: experiment.file_path,
        branch: experiment.branch,
        researcher: experiment.researcher,
        timestamp: experiment.timestamp,
        dataset,
    });
}

struct Worker {
    store: Arc<dyn ExperimentStore>,
    analyzer: Arc<dyn Analyzer>,
    aborted_through: Arc<AtomicU64>,
}

impl Worker {
    fn run(self, tasks: Receiver<(u64, Task)>, results: Sender<TaskResult>) {
        while let Ok((seq, task)) = tasks.recv() {
            let result = match self.execute(seq, task) {
                Ok(result) => result,
                Err(err) => {
                    tracing::warn!("task failed: {err:#}");
                    TaskResult::Error(format!("{err:#}"))
                }
            };
            if results.send(result).is_err() {
                break;
            }
        }
        tracing::debug!("worker loop finished");
    }

    fn execute(&self, seq: u64, task: Task) -> anyhow::Result<TaskResult> {
        match task {
            Task::LoadExperiment { ids } => self.load(&ids),
            Task::ProcessNewFile {
                path,
                parent_id,
                branch,
                researcher,
            } => self.process_new_file(&path, parent_id, branch, researcher),
            Task::AnalyzeSelection { id } => {
                let experiment = self.experiment(id)?;
                let analysis = self.analyzer.analyze_csv(Path::new(&experiment.file_path))?;
                let outcome = AnalysisOutcome::Experiment { id, analysis };
                Ok(self.unless_aborted(seq, TaskResult::AnalysisReady(outcome)))
            }
            Task::AnalyzeBranch { branch } => {
                let history = self.branch_history(&branch)?;
                ensure!(!history.is_empty(), "branch {branch} has no versions");
                let summary = self.analyzer.analyze_branch_history(&history)?;
                let outcome = AnalysisOutcome::Branch { branch, summary };
                Ok(self.unless_aborted(seq, TaskResult::AnalysisReady(outcome)))
            }
        }
    }

    fn unless_aborted(&self, seq: u64, result: TaskResult) -> TaskResult {
        if seq <= self.aborted_through.load(Ordering::SeqCst) {
            tracing::info!(seq, "discarding analysis finished after abort");
            TaskResult::Cancelled
        } else {
            result
        }
    }

    fn experiment(&self, id: ExperimentId) -> anyhow::Result<Experiment> {
        self.store
            .get_experiment(id)?
            .ok_or_else(|| anyhow!("experiment {id} not found"))
    }

    fn load(&self, ids: &[ExperimentId]) -> anyhow::Result<TaskResult> {
        match ids {
            [id] => {
                let experiment = self.experiment(*id)?;
                let dataset = dataset_for(&experiment);
                Ok(TaskResult::LoadComplete(Loaded::Single {
                    experiment,
                    dataset,
                }))
            }
            [a, b] => {
                let left = self.experiment(*a)?;
                let right = self.experiment(*b)?;
                Ok(TaskResult::LoadComplete(Loaded::Comparison {
                    ids: [*a, *b],
                    summary: compare(&left, &right),
                }))
            }
            [] => bail!("no experiment selected"),
            _ => bail!("at most two experiments can be compared"),
        }
    }

    fn process_new_file(
        &self,
        path: &Path,
        parent_id: Option<ExperimentId>,
        branch: String,
        researcher: String,
    ) -> anyhow::Result<TaskResult> {
        ensure!(path.is_file(), "file not found: {}", path.display());
        let file_path = path.to_string_lossy().into_owned();
        if let Some(id) = self.store.id_by_path(&file_path)? {
            tracing::info!(id, "file already tracked, loading instead");
            return self.load(&[id]);
        }
        let analysis = self.analyzer.analyze_csv(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| file_path.clone());
        let id = self.store.add_experiment(NewExperiment {
            name,
            file_path,
            analysis: Some(analysis),
            parent_id,
            branch,
            researcher,
        })?;
        let experiment = self.experiment(id)?;
        let dataset = dataset_for(&experiment);
        Ok(TaskResult::NewFileComplete {
            experiment,
            dataset,
        })
    }

    /// Last versions of `branch`, oldest first, one per line.
    fn branch_history(&self, branch: &str) -> anyhow::Result<String> {
        let rows = self.store.get_tree_data()?;
        let on_branch: Vec<_> = rows.iter().filter(|r| r.branch == branch).collect();
        let start = on_branch.len().saturating_sub(BRANCH_HISTORY_LEN);
        let mut lines = Vec::new();
        for record in &on_branch[start..] {
            let analysis = self
                .store
                .get_experiment(record.id)?
                .and_then(|e| e.analysis)
                .map(|a| a.summary)
                .unwrap_or_default();
            lines.push(format!("- NODE {} {}: {}", record.id, record.name, analysis));
        }
        Ok(lines.join("\n"))
    }
}

fn dataset_for(experiment: &Experiment) -> Option<DatasetSummary> {
    match DatasetSummary::from_path(Path::new(&experiment.file_path)) {
        Ok(summary) => Some(summary),
        Err(err) => {
            tracing::debug!(id = experiment.id, "no dataset summary: {err:#}");
            None
        }
    }
}

fn compare(left: &Experiment, right: &Experiment) -> String {
    let describe = |e: &Experiment| match dataset_for(e) {
        Some(d) => format!("NODE {} {} ({})", e.id, e.name, d.describe()),
        None => format!("NODE {} {} (file unavailable)", e.id, e.name),
    };
    format!("{}\nvs\n{}", describe(left), describe(right))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::PlaceholderAnalyzer;
    use crate::vault::JsonVault;
    use std::sync::Mutex;
    use std::time::{Duration, Instant};
    use tempfile::tempdir;

    fn drain_until_idle(queue: &mut TaskQueue, state: &mut AppState) -> Drained {
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut total = Drained::default();
        while queue.pending() > 0 && Instant::now() < deadline {
            let drained = queue.process_results(state);
            total.applied += drained.applied;
            total.errors.extend(drained.errors);
            std::thread::sleep(Duration::from_millis(5));
        }
        total
    }

    #[test]
    fn new_file_result_selects_and_requests_refresh() {
        let dir = tempdir().unwrap();
        let csv = dir.path().join("run.csv");
        std::fs::write(&csv, "t,v\n0,1\n1,2\n").unwrap();
        let store = Arc::new(JsonVault::open(dir.path().join("vault.json")).unwrap());
        let mut queue = TaskQueue::spawn(store, Arc::new(PlaceholderAnalyzer)).unwrap();
        let mut state = AppState::default();
        state.take_tree_refresh();

        queue
            .submit(
                Task::ProcessNewFile {
                    path: csv,
                    parent_id: None,
                    branch: "main".into(),
                    researcher: "ADA".into(),
                },
                &mut state,
            )
            .unwrap();
        assert!(state.is_processing);
        assert_eq!(state.processing_mode, ProcessingMode::Local);

        let drained = drain_until_idle(&mut queue, &mut state);
        assert!(drained.errors.is_empty());
        assert_eq!(state.head_id, Some(1));
        assert_eq!(state.selection.ids(), &[1]);
        assert_eq!(state.status_msg, "COMMITTED BY ADA");
        assert!(!state.is_processing);
        assert!(state.take_tree_refresh());
        let analysis = state.current_analysis.as_ref().unwrap();
        assert_eq!(
            analysis.summary,
            "File imported successfully. Contains 2 rows and 2 columns."
        );
    }

    #[test]
    fn failing_task_reports_error_status() {
        let dir = tempdir().unwrap();
        let store = Arc::new(JsonVault::open(dir.path().join("vault.json")).unwrap());
        let mut queue = TaskQueue::spawn(store, Arc::new(PlaceholderAnalyzer)).unwrap();
        let mut state = AppState::default();
        queue
            .submit(Task::LoadExperiment { ids: vec![42] }, &mut state)
            .unwrap();
        let drained = drain_until_idle(&mut queue, &mut state);
        assert_eq!(drained.errors, vec!["experiment 42 not found".to_string()]);
        assert_eq!(state.status_msg, "ERROR: experiment 42 not found");
        assert!(!state.is_processing);
    }

    #[test]
    fn abort_covers_only_tasks_submitted_before_it() {
        let dir = tempdir().unwrap();
        let store = Arc::new(JsonVault::open(dir.path().join("vault.json")).unwrap());
        let mut queue = TaskQueue::spawn(store, Arc::new(PlaceholderAnalyzer)).unwrap();
        let mut state = AppState::default();
        queue
            .submit(Task::AnalyzeBranch { branch: "main".into() }, &mut state)
            .unwrap();
        queue.abort(&mut state);
        assert!(queue.is_aborted(1));
        assert!(!state.is_processing);
        assert_eq!(state.status_msg, "AI ABORTED.");
        queue
            .submit(Task::AnalyzeBranch { branch: "main".into() }, &mut state)
            .unwrap();
        assert!(queue.is_aborted(1));
        assert!(!queue.is_aborted(2));
    }

    /// Blocks every analysis until the test opens the gate.
    struct GatedAnalyzer {
        gate: Mutex<Receiver<()>>,
    }

    impl Analyzer for GatedAnalyzer {
        fn analyze_csv(&self, path: &Path) -> anyhow::Result<ExperimentAnalysis> {
            self.gate.lock().unwrap().recv()?;
            PlaceholderAnalyzer.analyze_csv(path)
        }

        fn analyze_branch_history(&self, history: &str) -> anyhow::Result<String> {
            self.gate.lock().unwrap().recv()?;
            PlaceholderAnalyzer.analyze_branch_history(history)
        }
    }

    #[test]
    fn aborted_analysis_stays_cancelled_after_a_new_submit() {
        let dir = tempdir().unwrap();
        let csv = dir.path().join("run.csv");
        std::fs::write(&csv, "t,v\n0,1\n").unwrap();
        let store = Arc::new(JsonVault::open(dir.path().join("vault.json")).unwrap());
        let id = store
            .add_experiment(NewExperiment {
                name: "run.csv".into(),
                file_path: csv.to_string_lossy().into_owned(),
                analysis: None,
                parent_id: None,
                branch: "main".into(),
                researcher: "ADA".into(),
            })
            .unwrap();
        let (open_gate, gate) = std::sync::mpsc::channel();
        let analyzer = Arc::new(GatedAnalyzer {
            gate: Mutex::new(gate),
        });
        let mut queue = TaskQueue::spawn(store, analyzer).unwrap();
        let mut state = AppState::default();

        queue
            .submit(Task::AnalyzeSelection { id }, &mut state)
            .unwrap();
        queue.abort(&mut state);
        queue
            .submit(Task::LoadExperiment { ids: vec![id] }, &mut state)
            .unwrap();
        open_gate.send(()).unwrap();

        let timeout = Duration::from_secs(5);
        assert_eq!(queue.result_rx.recv_timeout(timeout).unwrap(), TaskResult::Cancelled);
        assert!(matches!(
            queue.result_rx.recv_timeout(timeout).unwrap(),
            TaskResult::LoadComplete(Loaded::Single { .. })
        ));
    }

    #[test]
    fn cancelled_result_leaves_state_untouched() {
        let mut state = AppState::default();
        state.set_status("AI ABORTED.");
        assert_eq!(apply_result(TaskResult::Cancelled, &mut state), None);
        assert_eq!(state.status_msg, "AI ABORTED.");
    }
}
