//! Command-line behavior

use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use tempfile::TempDir;

const GRAPH: &str = r#"{
  "chunks": [
    { "id": "main", "name": "main", "entry": true, "source": "boot()", "children": ["lazy"] },
    { "id": "lazy", "name": "lazy", "source": "lazy()" }
  ]
}"#;

const CONFIG: &str = r#"
[manifest]
inline_manifest = true

[output]
dir = "dist"
chunk_filename = "[name].[chunkhash:8].js"
html = true
"#;

fn project() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("chunks.json"), GRAPH).unwrap();
    fs::write(dir.path().join("chunk-manifest.toml"), CONFIG).unwrap();
    dir
}

fn cmd() -> Command {
    Command::cargo_bin("chunk-manifest").unwrap()
}

#[test]
fn build_writes_manifest() {
    let dir = project();

    cmd()
        .current_dir(dir.path())
        .arg("build")
        .assert()
        .success()
        .stderr(predicate::str::contains("chunk(s) in manifest"));

    let dist = dir.path().join("dist");
    let manifest: Value =
        serde_json::from_str(&fs::read_to_string(dist.join("manifest.json")).unwrap()).unwrap();
    assert_eq!(manifest["main"], Value::Null);

    let lazy = manifest["lazy"].as_str().unwrap();
    assert!(dist.join(lazy).exists());

    let html = fs::read_to_string(dist.join("index.html")).unwrap();
    assert!(html.contains("<script>window.webpackManifest={"));
}

#[test]
fn build_with_explicit_config_and_outdir() {
    let dir = project();
    let out = dir.path().join("out");

    cmd()
        .arg("--config")
        .arg(dir.path().join("chunk-manifest.toml"))
        .arg("build")
        .arg(dir.path().join("chunks.json"))
        .arg("--outdir")
        .arg(&out)
        .assert()
        .success();

    assert!(out.join("manifest.json").exists());
}

#[test]
fn build_reports_unknown_chunk() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("chunks.json"),
        r#"{ "chunks": [ { "id": "main", "entry": true, "children": ["missing"] } ] }"#,
    )
    .unwrap();

    cmd()
        .current_dir(dir.path())
        .arg("build")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown chunk 'missing'"));
}

#[test]
fn init_scaffolds_project() {
    let dir = tempfile::tempdir().unwrap();

    cmd().current_dir(dir.path()).arg("init").assert().success();
    assert!(dir.path().join("chunk-manifest.toml").exists());
    assert!(dir.path().join("chunks.json").exists());

    cmd()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    cmd()
        .current_dir(dir.path())
        .args(["init", "--force"])
        .assert()
        .success();

    cmd().current_dir(dir.path()).arg("build").assert().success();
    assert!(dir.path().join("dist").join("manifest.json").exists());
}
