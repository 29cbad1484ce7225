use serde::{Deserialize, Serialize};

/// Layout and interaction constants for the version tree panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VersionTreeSettings {
    /// Horizontal world distance between two generations.
    pub generation_spacing: f32,
    /// Vertical world distance between two branch lanes.
    pub lane_spacing: f32,
    pub node_radius: f32,
    /// Extra screen-space slack added to the node radius when hit-testing.
    pub hit_tolerance: f32,
    pub zoom_step: f32,
    /// Lower clamp for dragged world coordinates, applied on both axes.
    pub drag_min: f32,
    /// Upper clamp for dragged world coordinates, applied on both axes.
    pub drag_max: f32,
    /// Node labels are only drawn above this zoom level.
    pub label_zoom_threshold: f32,
    pub minimap_width: f32,
    pub minimap_height: f32,
    pub minimap_margin: f32,
    pub minimap_world_padding: f32,
    pub minimap_start_collapsed: bool,
}

impl Default for VersionTreeSettings {
    fn default() -> Self {
        Self {
            generation_spacing: 160.0,
            lane_spacing: 100.0,
            node_radius: 18.0,
            hit_tolerance: 5.0,
            zoom_step: 0.1,
            drag_min: -2000.0,
            drag_max: 5000.0,
            label_zoom_threshold: 0.6,
            minimap_width: 160.0,
            minimap_height: 120.0,
            minimap_margin: 10.0,
            minimap_world_padding: 100.0,
            minimap_start_collapsed: false,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Settings {
    /// When enabled the application initialises the logger at debug level.
    /// Defaults to `false` when the field is missing in the settings file.
    #[serde(default)]
    pub debug_logging: bool,
    /// Optional file receiving log output instead of stdout.
    #[serde(default)]
    pub log_file: Option<String>,
    /// Location of the experiment vault.
    #[serde(default = "default_vault_path")]
    pub vault_path: String,
    /// Name recorded on every committed experiment.
    #[serde(default = "default_researcher")]
    pub researcher_name: String,
    /// Enable toast notifications in the UI.
    #[serde(default = "default_toasts")]
    pub enable_toasts: bool,
    /// Duration of toast notifications in seconds.
    #[serde(default = "default_toast_duration")]
    pub toast_duration: f32,
    #[serde(default)]
    pub version_tree: VersionTreeSettings,
}

fn default_vault_path() -> String {
    "project_vault.json".into()
}

fn default_researcher() -> String {
    "ANONYMOUS".into()
}

fn default_toasts() -> bool {
    true
}

fn default_toast_duration() -> f32 {
    3.0
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            debug_logging: false,
            log_file: None,
            vault_path: default_vault_path(),
            researcher_name: default_researcher(),
            enable_toasts: default_toasts(),
            toast_duration: default_toast_duration(),
            version_tree: VersionTreeSettings::default(),
        }
    }
}

impl Settings {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path).unwrap_or_default();
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self, path: &str) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
