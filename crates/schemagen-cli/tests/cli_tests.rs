//! CLI integration tests for schemagen.
//!
//! Argument parsing, exit codes, and one full run against fragments in a
//! temporary directory.

use std::{fs, path::Path};

use assert_cmd::Command;
use predicates::prelude::*;

fn cmd() -> Command { Command::cargo_bin("schemagen").unwrap() }

fn put(root: &Path, rel: &str, body: &str) {
  let path = root.join(rel);
  fs::create_dir_all(path.parent().unwrap()).unwrap();
  fs::write(path, body).unwrap();
}

/// A mapping tree covering every topic of the `simple` profile.
fn simple_tree(root: &Path) {
  for topic in ["core", "dataset", "datasetType"] {
    fs::create_dir_all(root.join("hbm").join(topic)).unwrap();
  }
  put(root, "hbm/core/table_x.hbm.xml", r#"<hibernate-mapping>
    <class name="X" table="table_x"><id name="id" type="long" column="id"/></class>
  </hibernate-mapping>"#);
  put(root, "hbm/dataset/table_x.hbm.xml", r#"<hibernate-mapping>
    <class name="X" table="table_x"><property name="value" type="string" column="value"/></class>
  </hibernate-mapping>"#);
}

fn in_tree(root: &Path) -> Command {
  let mut cmd = cmd();
  cmd
    .current_dir(root)
    .args(["--mapping-dir", "hbm", "--work-dir", "work", "--output-dir", "out"]);
  cmd
}

// ─── Help ────────────────────────────────────────────────────────────────────

#[test]
fn help_lists_commands() {
  cmd()
    .arg("--help")
    .assert()
    .success()
    .stdout(predicate::str::contains("all"))
    .stdout(predicate::str::contains("run"))
    .stdout(predicate::str::contains("report"))
    .stdout(predicate::str::contains("--mapping-dir"));
}

#[test]
fn run_help_shows_options() {
  cmd()
    .args(["run", "--help"])
    .assert()
    .success()
    .stdout(predicate::str::contains("--dialect"))
    .stdout(predicate::str::contains("--profile"))
    .stdout(predicate::str::contains("--action"))
    .stdout(predicate::str::contains("--format"));
}

// ─── Argument errors ─────────────────────────────────────────────────────────

#[test]
fn unknown_profile_is_rejected() {
  cmd()
    .args(["run", "--dialect", "postgis", "--profile", "everything"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("everything"));
}

#[test]
fn unknown_dialect_is_rejected() {
  cmd()
    .args(["run", "--dialect", "sybase", "--profile", "simple"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("sybase"));
}

#[test]
fn unknown_report_preset_is_rejected() {
  cmd().args(["report", "ereporting"]).assert().failure();
}

// ─── Runs ────────────────────────────────────────────────────────────────────

#[test]
fn run_writes_scripts() {
  let dir = tempfile::tempdir().unwrap();
  simple_tree(dir.path());

  in_tree(dir.path())
    .args(["run", "--dialect", "postgres", "--profile", "simple", "--schema", "public"])
    .assert()
    .success()
    .stdout(predicate::str::contains("postgis_simple_create.sql"));

  let create =
    fs::read_to_string(dir.path().join("out/postgis_simple_create.sql")).unwrap();
  assert!(create.contains(
    "create table public.table_x (id int8 not null, value varchar(255), primary key (id));"
  ));
  assert!(dir.path().join("out/postgis_simple_drop.sql").exists());
}

#[test]
fn run_writes_metadata() {
  let dir = tempfile::tempdir().unwrap();
  simple_tree(dir.path());

  in_tree(dir.path())
    .args(["run", "--dialect", "geodb", "--profile", "simple", "--action", "metadata"])
    .assert()
    .success();

  let report =
    fs::read_to_string(dir.path().join("out/SimpleTableMetadata.md")).unwrap();
  assert!(report.contains("*GeoDBDialect*"));
  let id = report.find("| id |").unwrap();
  let value = report.find("| value |").unwrap();
  assert!(id < value);
}

#[test]
fn missing_topics_exit_with_failure() {
  let dir = tempfile::tempdir().unwrap();
  simple_tree(dir.path());

  in_tree(dir.path())
    .args(["report", "default"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("expandedDataset"));
  assert!(!dir.path().join("out/DefaultTableMetadata.md").exists());
}
