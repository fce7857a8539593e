// tests/discovery_tests.rs
mod common;

use common::*;
use pipewright::discovery::order_units;
use pipewright::{parse_declared_name, scan_dir, Catalog, Pipeline, PipelineOutcome, StatusCode, WrightError};
use serial_test::serial;
use std::fs;
use std::path::Path;

fn touch(dir: &Path, name: &str) {
  fs::write(dir.join(name), b"").unwrap();
}

#[test]
fn test_parse_declared_name() {
  let def = parse_declared_name("100-load-user.rs").unwrap();
  assert_eq!(def.order, 100);
  assert_eq!(def.label, "load-user");
  assert_eq!(def.name, "100-load-user");
  assert_eq!(def.source, "100-load-user.rs");

  let bare = parse_declared_name("007-bond").unwrap();
  assert_eq!(bare.order, 7);
  assert_eq!(bare.name, "007-bond");

  assert!(parse_declared_name("load-user").is_none());
  assert!(parse_declared_name("100_load").is_none());
  assert!(parse_declared_name("100-").is_none());
  assert!(parse_declared_name("-100-load").is_none());
  assert!(parse_declared_name("99999999999999999999999-huge").is_none());
}

#[test]
fn test_ordering_is_numeric_not_lexicographic() {
  let units: Vec<_> = ["1000-c.rs", "90-a.rs", "100-b.rs"]
    .iter()
    .map(|name| pipewright::DiscoveredFile {
      def: parse_declared_name(name).unwrap(),
      path: Path::new(name).to_path_buf(),
    })
    .collect();

  let ordered = order_units(units).unwrap();
  let names: Vec<&str> = ordered.iter().map(|u| u.def.name.as_str()).collect();
  assert_eq!(names, vec!["90-a", "100-b", "1000-c"]);
}

#[tokio::test]
#[serial]
async fn test_duplicate_order_names_both_units() {
  setup_tracing();
  let mut pipeline = new_pipeline("dupes");
  pipeline.step("100-first", record_step("100-first")).unwrap();

  match pipeline.step("100-second", record_step("100-second")) {
    Err(WrightError::DuplicateOrder { order, first, second }) => {
      assert_eq!(order, 100);
      assert_eq!(first, "100-first");
      assert_eq!(second, "100-second");
    }
    Err(other) => panic!("expected DuplicateOrder, got {:?}", other),
    Ok(_) => panic!("expected DuplicateOrder, got Ok"),
  }
  // Tasks are ordered independently of steps.
  assert!(pipeline.task("100-task", record_task("100-task")).is_ok());
}

#[tokio::test]
#[serial]
async fn test_malformed_declared_name_is_rejected() {
  setup_tracing();
  let mut pipeline = new_pipeline("malformed");
  match pipeline.step("load-user", record_step("load-user")) {
    Err(WrightError::MalformedName { name }) => assert_eq!(name, "load-user"),
    Err(other) => panic!("expected MalformedName, got {:?}", other),
    Ok(_) => panic!("expected MalformedName, got Ok"),
  }
  assert!(pipeline.steps().is_empty());
}

#[test]
fn test_scan_dir_keeps_matching_files_in_order() {
  let dir = tempfile::tempdir().unwrap();
  touch(dir.path(), "1000-render.rs");
  touch(dir.path(), "90-auth.rs");
  touch(dir.path(), "100-load.rs");
  touch(dir.path(), "README.md");
  touch(dir.path(), "helpers.rs");
  touch(dir.path(), "200-no-extension");
  fs::create_dir(dir.path().join("300-a-directory.d")).unwrap();

  let found = scan_dir(dir.path()).unwrap();

  let names: Vec<&str> = found.iter().map(|f| f.def.name.as_str()).collect();
  assert_eq!(names, vec!["90-auth", "100-load", "1000-render"]);
  assert_eq!(found[0].path, dir.path().join("90-auth.rs"));
}

#[test]
fn test_scan_dir_missing_directory_is_empty() {
  let dir = tempfile::tempdir().unwrap();
  let found = scan_dir(&dir.path().join("does-not-exist")).unwrap();
  assert!(found.is_empty());
}

#[test]
fn test_scan_dir_rejects_duplicate_orders() {
  let dir = tempfile::tempdir().unwrap();
  touch(dir.path(), "100-a.rs");
  touch(dir.path(), "100-b.rs");

  match scan_dir(dir.path()) {
    Err(WrightError::DuplicateOrder { order, first, second }) => {
      assert_eq!(order, 100);
      let mut pair = vec![first, second];
      pair.sort();
      assert_eq!(pair, vec!["100-a.rs", "100-b.rs"]);
    }
    other => panic!("expected DuplicateOrder, got {:?}", other),
  }
}

#[tokio::test]
#[serial]
async fn test_from_dirs_resolves_files_through_catalog() {
  setup_tracing();
  let root = tempfile::tempdir().unwrap();
  let steps_dir = root.path().join("steps");
  let tasks_dir = root.path().join("tasks");
  fs::create_dir(&steps_dir).unwrap();
  fs::create_dir(&tasks_dir).unwrap();
  touch(&steps_dir, "200-respond.rs");
  touch(&steps_dir, "100-load.rs");
  touch(&tasks_dir, "100-notify.rs");

  let mut catalog = Catalog::new();
  catalog
    .step("100-load", record_step("100-load"))
    .step("200-respond.rs", respond_step("200-respond", StatusCode::OK))
    .task("100-notify", record_task("100-notify"));

  let pipeline = Pipeline::from_dirs("scanned", &steps_dir, &tasks_dir, &catalog)
    .unwrap()
    .with_settings(test_settings());

  let step_names: Vec<&str> = pipeline.step_defs().iter().map(|d| d.name.as_str()).collect();
  assert_eq!(step_names, vec!["100-load", "200-respond"]);
  assert_eq!(pipeline.task_defs()[0].source, "100-notify.rs");

  let (report, ctx, _res) = run_pipeline(&pipeline).await;
  assert_eq!(report.outcome, PipelineOutcome::Completed);
  report.background.unwrap().wait().await.unwrap();
  assert_eq!(ctx.read().steps_executed, vec!["100-load", "200-respond"]);
  assert_eq!(ctx.read().tasks_executed, vec!["100-notify"]);
}

#[tokio::test]
#[serial]
async fn test_from_dirs_with_missing_dirs_is_empty_pipeline() {
  setup_tracing();
  let root = tempfile::tempdir().unwrap();
  let catalog = Catalog::<TestContext>::new();
  let pipeline = Pipeline::from_dirs("nothing", root.path().join("steps"), root.path().join("tasks"), &catalog).unwrap();
  assert!(pipeline.steps().is_empty());
  assert!(pipeline.tasks().is_empty());
}

#[tokio::test]
#[serial]
async fn test_from_dirs_unresolved_file_is_an_error() {
  setup_tracing();
  let root = tempfile::tempdir().unwrap();
  touch(root.path(), "100-orphan.rs");
  let catalog = Catalog::<TestContext>::new();

  match Pipeline::from_dirs("orphans", root.path(), root.path().join("tasks"), &catalog) {
    Err(WrightError::UnresolvedModule { name, path }) => {
      assert_eq!(name, "100-orphan");
      assert!(path.ends_with("100-orphan.rs"));
    }
    Err(other) => panic!("expected UnresolvedModule, got {:?}", other),
    Ok(_) => panic!("expected UnresolvedModule, got Ok"),
  }
}
