use sci_git::analysis::PlaceholderAnalyzer;
use sci_git::gui::SciGitApp;
use sci_git::settings::Settings;
use sci_git::tree::{ConnectionKind, TreeClick};
use sci_git::vault::{ExperimentStore, JsonVault, NewExperiment};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::{tempdir, TempDir};

fn write_csv(dir: &Path, name: &str, rows: usize) -> String {
    let path = dir.join(name);
    let mut body = String::from("time,temp\n");
    for i in 0..rows {
        body.push_str(&format!("{i},{}\n", 20 + i));
    }
    std::fs::write(&path, body).unwrap();
    path.to_string_lossy().into_owned()
}

fn setup() -> (TempDir, Arc<JsonVault>, SciGitApp) {
    let dir = tempdir().unwrap();
    let vault = Arc::new(JsonVault::open(dir.path().join("vault.json")).unwrap());
    for (name, parent) in [("base.csv", None), ("heated.csv", Some(1))] {
        let file_path = write_csv(dir.path(), name, 3);
        vault
            .add_experiment(NewExperiment {
                name: name.into(),
                file_path,
                analysis: None,
                parent_id: parent,
                branch: "main".into(),
                researcher: "ADA".into(),
            })
            .unwrap();
    }
    let settings = Settings {
        enable_toasts: false,
        ..Settings::default()
    };
    let settings_path = dir.path().join("settings.json");
    let store: Arc<dyn ExperimentStore> = vault.clone();
    let app = SciGitApp::new(
        settings,
        settings_path.to_string_lossy(),
        store,
        Arc::new(PlaceholderAnalyzer),
    )
    .unwrap();
    (dir, vault, app)
}

fn settle(app: &mut SciGitApp) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while app.pending_tasks() > 0 && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(5));
        app.begin_frame();
    }
    assert_eq!(app.pending_tasks(), 0, "worker did not answer in time");
}

#[test]
fn first_frame_pulls_snapshot() {
    let (_dir, _vault, mut app) = setup();
    assert!(app.tree().nodes().is_empty());
    app.begin_frame();
    assert_eq!(app.tree().nodes().len(), 2);
    assert_eq!(app.state().head_id, Some(2));
    assert!(!app.state().tree_refresh_pending());
}

#[test]
fn committed_file_is_in_the_tree_on_the_frame_its_result_lands() {
    let (dir, _vault, mut app) = setup();
    app.begin_frame();
    let path = write_csv(dir.path(), "cooled.csv", 5);
    app.commit_file(&path);
    assert!(app.state().is_processing);

    settle(&mut app);
    let state = app.state();
    assert!(!state.is_processing);
    assert_eq!(state.head_id, Some(3));
    assert_eq!(state.selection.ids(), &[3]);
    let node = app.tree().node(3).expect("new node laid out");
    assert_eq!(node.parent_id, Some(2));
    assert_eq!(node.generation, 2);
    assert_eq!(
        state.current_analysis.as_ref().unwrap().summary,
        "File imported successfully. Contains 5 rows and 2 columns."
    );
}

#[test]
fn committing_a_tracked_file_loads_it_instead() {
    let (dir, vault, mut app) = setup();
    app.begin_frame();
    let path = dir.path().join("base.csv");
    app.commit_file(path);
    settle(&mut app);
    assert_eq!(vault.get_tree_data().unwrap().len(), 2);
    assert_eq!(app.state().loaded.as_ref().map(|l| l.id), Some(1));
    assert_eq!(app.state().status_msg, "LOADED: base.csv");
}

#[test]
fn linkage_workflow_rejects_self_links_then_links() {
    let (_dir, vault, mut app) = setup();
    app.begin_frame();

    app.state_mut().selection.set_single(1);
    assert!(app.state_mut().begin_linkage());
    app.handle_tree_click(TreeClick::Selected(vec![1]));
    assert_eq!(app.state().status_msg, "CANNOT LINK A NODE TO ITSELF");
    assert_eq!(app.pending_tasks(), 0);

    app.state_mut().selection.set_single(1);
    app.state_mut().begin_linkage();
    app.handle_tree_click(TreeClick::Selected(vec![2]));
    assert_eq!(app.state().status_msg, "LINKED NODE 1 TO NODE 2");
    assert_eq!(app.state().linkage_source, None);
    assert_eq!(
        vault.get_experiment(1).unwrap().unwrap().linked_nodes.as_deref(),
        Some("[2]")
    );

    app.begin_frame();
    assert!(app
        .tree()
        .connections()
        .iter()
        .any(|c| c.kind == ConnectionKind::Linkage && c.from == 1 && c.to == 2));
}

#[test]
fn selecting_two_nodes_loads_a_comparison() {
    let (_dir, _vault, mut app) = setup();
    app.begin_frame();
    app.handle_tree_click(TreeClick::Selected(vec![1, 2]));
    settle(&mut app);
    let comparison = app.state().comparison.clone().expect("comparison");
    assert!(comparison.contains("NODE 1 base.csv (3 rows x 2 columns)"));
    assert_eq!(app.state().status_msg, "COMPARISON COMPLETE");
}

#[test]
fn saved_notes_are_reloaded() {
    let (_dir, vault, mut app) = setup();
    app.begin_frame();
    app.handle_tree_click(TreeClick::Selected(vec![2]));
    settle(&mut app);
    assert_eq!(app.state().loaded.as_ref().map(|l| l.id), Some(2));

    app.state_mut().notes_buffer = "ran at 40C".into();
    app.save_notes();
    settle(&mut app);
    assert_eq!(vault.get_experiment(2).unwrap().unwrap().notes, "ran at 40C");
    assert_eq!(app.state().notes_buffer, "ran at 40C");
}

#[test]
fn errors_surface_as_status() {
    let (_dir, _vault, mut app) = setup();
    app.begin_frame();
    app.handle_tree_click(TreeClick::Selected(vec![77]));
    settle(&mut app);
    assert_eq!(app.state().status_msg, "ERROR: experiment 77 not found");
    assert!(!app.state().is_processing);
}
