use sci_git::analysis::PlaceholderAnalyzer;
use sci_git::gui::SciGitApp;
use sci_git::settings::Settings;
use sci_git::vault::{ExperimentStore, JsonVault};
use sci_git::logging;

use eframe::egui;
use std::path::PathBuf;
use std::sync::Arc;

const SETTINGS_FILE: &str = "settings.json";

fn main() -> anyhow::Result<()> {
    let settings = Settings::load(SETTINGS_FILE)?;
    logging::init(settings.debug_logging, settings.log_file.as_ref().map(PathBuf::from));

    let vault = JsonVault::open(&settings.vault_path)?;
    let pruned = vault.prune_missing_files()?;
    if pruned > 0 {
        tracing::info!(pruned, "removed experiments whose files are gone");
    }
    let store: Arc<dyn ExperimentStore> = Arc::new(vault);
    let app = SciGitApp::new(settings, SETTINGS_FILE, store, Arc::new(PlaceholderAnalyzer))?;

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 720.0])
            .with_min_inner_size([800.0, 480.0]),
        ..Default::default()
    };
    eframe::run_native("SCI-GIT", native_options, Box::new(move |_cc| Box::new(app)))
        .map_err(|e| anyhow::anyhow!("failed to start SCI-GIT: {e}"))?;
    Ok(())
}
