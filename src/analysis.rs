use anyhow::Context;
use serde::{Deserialize, Deserializer, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Analysis attached to an experiment. This is the shape AI backends are
/// expected to return; the offline analyzer fills it with placeholders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExperimentAnalysis {
    pub summary: String,
    #[serde(default)]
    pub anomalies: Vec<String>,
    #[serde(default, deserialize_with = "string_or_list")]
    pub next_steps: String,
    #[serde(default = "default_true")]
    pub is_reproducible: bool,
    #[serde(default = "default_true")]
    pub ai_generated: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrList {
    Text(String),
    List(Vec<serde_json::Value>),
    Null,
}

fn string_or_list<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match StringOrList::deserialize(deserializer)? {
        StringOrList::Text(text) => text,
        StringOrList::List(items) => items
            .iter()
            .map(|v| match v {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join(" "),
        StringOrList::Null => String::new(),
    })
}

/// Shape of a CSV file: header columns and number of data rows.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DatasetSummary {
    pub columns: Vec<String>,
    pub rows: usize,
}

impl DatasetSummary {
    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let file =
            File::open(path).with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_reader(file).with_context(|| format!("failed to parse {}", path.display()))
    }

    pub fn from_csv(content: &str) -> anyhow::Result<Self> {
        Self::from_reader(content.as_bytes())
    }

    /// Count header columns and data records. Quoted fields may hold commas
    /// and newlines; rows with a differing field count are still counted.
    pub fn from_reader<R: Read>(reader: R) -> anyhow::Result<Self> {
        let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
        let columns = reader
            .byte_headers()?
            .iter()
            .map(|c| String::from_utf8_lossy(c).trim().to_string())
            .collect();
        let mut rows = 0;
        for record in reader.byte_records() {
            record?;
            rows += 1;
        }
        Ok(Self { columns, rows })
    }

    pub fn describe(&self) -> String {
        format!("{} rows x {} columns", self.rows, self.columns.len())
    }
}

/// Backend producing analyses. Implementations run on the worker thread.
pub trait Analyzer: Send + Sync {
    fn analyze_csv(&self, path: &Path) -> anyhow::Result<ExperimentAnalysis>;

    fn analyze_branch_history(&self, history: &str) -> anyhow::Result<String>;
}

/// Offline analyzer used when no AI backend is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlaceholderAnalyzer;

impl Analyzer for PlaceholderAnalyzer {
    fn analyze_csv(&self, path: &Path) -> anyhow::Result<ExperimentAnalysis> {
        let summary = match DatasetSummary::from_path(path) {
            Ok(shape) => format!(
                "File imported successfully. Contains {} rows and {} columns.",
                shape.rows,
                shape.columns.len()
            ),
            Err(err) => {
                tracing::debug!(path = %path.display(), %err, "placeholder analysis without shape");
                "File imported. Pending analysis.".to_string()
            }
        };
        Ok(ExperimentAnalysis {
            summary,
            anomalies: Vec::new(),
            next_steps: "Select this node and run an analysis to generate insights.".into(),
            is_reproducible: true,
            ai_generated: false,
        })
    }

    fn analyze_branch_history(&self, history: &str) -> anyhow::Result<String> {
        let count = history.lines().filter(|l| !l.trim().is_empty()).count();
        Ok(format!("{count} recent versions on record:\n{history}"))
    }
}
