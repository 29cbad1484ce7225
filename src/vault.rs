use crate::analysis::ExperimentAnalysis;
use crate::tree::{parse_linked_nodes, ExperimentId, ExperimentRecord, MAIN_BRANCH};
use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// One versioned experiment as stored in the vault.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Experiment {
    pub id: ExperimentId,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub file_path: String,
    #[serde(default)]
    pub analysis: Option<ExperimentAnalysis>,
    #[serde(default)]
    pub parent_id: Option<ExperimentId>,
    #[serde(default = "default_branch")]
    pub branch: String,
    #[serde(default)]
    pub researcher: String,
    #[serde(default)]
    pub notes: String,
    /// JSON encoded list of linkage targets, as consumed by the tree.
    #[serde(default)]
    pub linked_nodes: Option<String>,
}

fn default_branch() -> String {
    MAIN_BRANCH.to_string()
}

impl Experiment {
    pub fn record(&self) -> ExperimentRecord {
        ExperimentRecord {
            id: self.id,
            parent_id: self.parent_id,
            branch: self.branch.clone(),
            name: self.name.clone(),
            linked_nodes: self.linked_nodes.clone(),
        }
    }
}

/// Fields supplied when committing a new file.
#[derive(Debug, Clone, PartialEq)]
pub struct NewExperiment {
    pub name: String,
    pub file_path: String,
    pub analysis: Option<ExperimentAnalysis>,
    pub parent_id: Option<ExperimentId>,
    pub branch: String,
    pub researcher: String,
}

/// Storage operations the application depends on. Shared with the worker
/// thread, hence `Send + Sync`.
pub trait ExperimentStore: Send + Sync {
    /// Tree rows ascending by id.
    fn get_tree_data(&self) -> anyhow::Result<Vec<ExperimentRecord>>;

    fn get_experiment(&self, id: ExperimentId) -> anyhow::Result<Option<Experiment>>;

    /// Insert a new experiment. A file path that is already tracked returns
    /// the existing id without inserting.
    fn add_experiment(&self, new: NewExperiment) -> anyhow::Result<ExperimentId>;

    fn id_by_path(&self, file_path: &str) -> anyhow::Result<Option<ExperimentId>>;

    /// Record a linkage from `source` to `target`. Returns `false` when the
    /// source is unknown.
    fn add_linkage(&self, source: ExperimentId, target: ExperimentId) -> anyhow::Result<bool>;

    fn update_notes(&self, id: ExperimentId, notes: &str) -> anyhow::Result<bool>;

    /// Drop experiments whose file no longer exists. Returns the number removed.
    fn prune_missing_files(&self) -> anyhow::Result<usize>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct VaultData {
    #[serde(default = "first_id")]
    next_id: ExperimentId,
    #[serde(default)]
    experiments: Vec<Experiment>,
}

fn first_id() -> ExperimentId {
    1
}

/// Experiment store persisted as a single pretty printed JSON file.
pub struct JsonVault {
    path: PathBuf,
    data: Mutex<VaultData>,
}

impl JsonVault {
    /// Open the vault at `path`. A missing or empty file starts an empty vault.
    pub fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => {
                return Err(e).with_context(|| format!("failed to read vault {}", path.display()))
            }
        };
        let mut data: VaultData = if content.trim().is_empty() {
            VaultData::default()
        } else {
            serde_json::from_str(&content)
                .with_context(|| format!("failed to parse vault {}", path.display()))?
        };
        let max_id = data.experiments.iter().map(|e| e.id).max().unwrap_or(0);
        data.next_id = data.next_id.max(max_id + 1).max(1);
        data.experiments.sort_by_key(|e| e.id);
        tracing::info!(
            path = %path.display(),
            experiments = data.experiments.len(),
            "vault opened"
        );
        Ok(Self {
            path,
            data: Mutex::new(data),
        })
    }

    fn lock(&self) -> anyhow::Result<MutexGuard<'_, VaultData>> {
        self.data.lock().map_err(|_| anyhow!("vault lock poisoned"))
    }

    fn save(&self, data: &VaultData) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(data)?;
        std::fs::write(&self.path, json)
            .with_context(|| format!("failed to write vault {}", self.path.display()))?;
        Ok(())
    }
}

impl ExperimentStore for JsonVault {
    fn get_tree_data(&self) -> anyhow::Result<Vec<ExperimentRecord>> {
        let data = self.lock()?;
        Ok(data.experiments.iter().map(Experiment::record).collect())
    }

    fn get_experiment(&self, id: ExperimentId) -> anyhow::Result<Option<Experiment>> {
        let data = self.lock()?;
        Ok(data.experiments.iter().find(|e| e.id == id).cloned())
    }

    fn add_experiment(&self, new: NewExperiment) -> anyhow::Result<ExperimentId> {
        let mut data = self.lock()?;
        if let Some(existing) = data.experiments.iter().find(|e| e.file_path == new.file_path) {
            return Ok(existing.id);
        }
        let id = data.next_id;
        data.next_id += 1;
        data.experiments.push(Experiment {
            id,
            timestamp: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            name: new.name,
            file_path: new.file_path,
            analysis: new.analysis,
            parent_id: new.parent_id,
            branch: new.branch,
            researcher: new.researcher,
            notes: String::new(),
            linked_nodes: None,
        });
        self.save(&data)?;
        tracing::info!(id, "experiment committed");
        Ok(id)
    }

    fn id_by_path(&self, file_path: &str) -> anyhow::Result<Option<ExperimentId>> {
        let data = self.lock()?;
        Ok(data
            .experiments
            .iter()
            .find(|e| e.file_path == file_path)
            .map(|e| e.id))
    }

    fn add_linkage(&self, source: ExperimentId, target: ExperimentId) -> anyhow::Result<bool> {
        let mut data = self.lock()?;
        let Some(exp) = data.experiments.iter_mut().find(|e| e.id == source) else {
            return Ok(false);
        };
        let mut links = match exp.linked_nodes.as_deref() {
            Some(raw) => parse_linked_nodes(raw).unwrap_or_else(|| {
                tracing::debug!(source, "starting a fresh linkage list");
                Vec::new()
            }),
            None => Vec::new(),
        };
        if !links.contains(&target) {
            links.push(target);
        }
        exp.linked_nodes = Some(serde_json::to_string(&links)?);
        self.save(&data)?;
        Ok(true)
    }

    fn update_notes(&self, id: ExperimentId, notes: &str) -> anyhow::Result<bool> {
        let mut data = self.lock()?;
        let Some(exp) = data.experiments.iter_mut().find(|e| e.id == id) else {
            return Ok(false);
        };
        exp.notes = notes.to_string();
        self.save(&data)?;
        Ok(true)
    }

    fn prune_missing_files(&self) -> anyhow::Result<usize> {
        let mut data = self.lock()?;
        let before = data.experiments.len();
        data.experiments
            .retain(|e| e.file_path.is_empty() || Path::new(&e.file_path).exists());
        let removed = before - data.experiments.len();
        if removed > 0 {
            self.save(&data)?;
            tracing::info!(removed, "pruned experiments with missing files");
        }
        Ok(removed)
    }
}
