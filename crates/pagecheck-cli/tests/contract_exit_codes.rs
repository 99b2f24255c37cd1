//! Exit code and output contract for the `pagecheck` binary.

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;

fn pagecheck() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_pagecheck"));
    cmd.env_remove("PAGECHECK_MODE").env("RUST_LOG", "warn");
    cmd
}

fn core_fixture(rel: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../pagecheck-core/tests/fixtures")
        .join(rel)
}

fn write_suite(dir: &Path, app_dir: &Path, extra_fixture: &str) -> PathBuf {
    let yaml = format!(
        r##"suite: contract
groups:
  - name: optimizePackageImports - mui
    skip_modes: [turbopack]
    fixture:
      dir: "{}"
{}    cases:
      - name: should support MUI
        route: /
        checks:
          - selector: "#client-mod"
            contains: "client:default"
"##,
        app_dir.display(),
        extra_fixture
    );
    let path = dir.join("suite.yaml");
    std::fs::write(&path, yaml).unwrap();
    path
}

fn write_app(dir: &Path, body: &str) {
    std::fs::write(
        dir.join("index.html"),
        format!("<!DOCTYPE html><html><body>{}</body></html>", body),
    )
    .unwrap();
}

#[test]
fn version_exits_zero() {
    pagecheck()
        .arg("version")
        .assert()
        .code(0)
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn passing_suite_exits_zero() {
    pagecheck()
        .args(["run", "--suite"])
        .arg(core_fixture("suites/optimize-package-imports.yaml"))
        .assert()
        .code(0)
        .stdout(predicate::str::contains("PASS / should support MUI"))
        .stdout(predicate::str::contains("1 passed, 0 failed"));
}

#[test]
fn excluded_mode_reports_not_run() {
    pagecheck()
        .args(["run", "--mode", "turbopack", "--suite"])
        .arg(core_fixture("suites/optimize-package-imports.yaml"))
        .assert()
        .code(0)
        .stdout(predicate::str::contains("[skipped]"))
        .stdout(predicate::str::contains("1 not run"));
}

#[test]
fn wrong_runtime_context_exits_one_with_diagnostic() {
    let tmp = tempfile::tempdir().unwrap();
    let app = tmp.path().join("app");
    std::fs::create_dir(&app).unwrap();
    write_app(&app, r#"<div id="client-mod">server:default</div>"#);
    let suite = write_suite(tmp.path(), &app, "");

    pagecheck()
        .args(["run", "--suite"])
        .arg(&suite)
        .assert()
        .code(1)
        .stdout(predicate::str::contains("FAIL / should support MUI"))
        .stdout(predicate::str::contains("expected to contain: \"client:default\""))
        .stdout(predicate::str::contains("actual: \"server:default\""));
}

#[test]
fn missing_fixture_dir_fails_group() {
    let tmp = tempfile::tempdir().unwrap();
    let suite = write_suite(tmp.path(), &tmp.path().join("not-built"), "");

    pagecheck()
        .args(["run", "--suite"])
        .arg(&suite)
        .assert()
        .code(1)
        .stdout(predicate::str::contains("[fixture failed]"))
        .stdout(predicate::str::contains("fixture directory not found"));
}

#[test]
fn missing_suite_is_config_error() {
    pagecheck()
        .args(["run", "--suite", "does-not-exist.yaml"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Config error"));
}

#[test]
fn json_report_written_to_file() {
    let tmp = tempfile::tempdir().unwrap();
    let out = tmp.path().join("report.json");

    pagecheck()
        .args(["run", "--format", "json", "--suite"])
        .arg(core_fixture("suites/optimize-package-imports.yaml"))
        .arg("--out")
        .arg(&out)
        .assert()
        .code(0);

    let report: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(report["summary"]["passed"], 1);
    assert_eq!(report["groups"][0]["cases"][0]["status"], "passed");
    assert_eq!(report["groups"][0]["cases"][0]["actual"], "client:default");
}

#[test]
fn check_command_passes_and_fails() {
    let mui = core_fixture("optimize-package-imports/mui");

    pagecheck()
        .args(["check", "--selector", "#client-mod", "--contains", "client:default", "--dir"])
        .arg(&mui)
        .assert()
        .code(0);

    let tmp = tempfile::tempdir().unwrap();
    write_app(tmp.path(), r#"<div id="server-mod">server:default</div>"#);
    pagecheck()
        .args(["check", "--selector", "#client-mod", "--contains", "client:default", "--dir"])
        .arg(tmp.path())
        .assert()
        .code(1)
        .stdout(predicate::str::contains("selector not found"));
}

#[test]
fn check_rejects_empty_literal() {
    pagecheck()
        .args(["check", "--selector", "#client-mod", "--contains", "", "--dir", "."])
        .assert()
        .code(2);
}

#[cfg(unix)]
#[test]
fn command_fixture_builds_and_starts() {
    let tmp = tempfile::tempdir().unwrap();
    let app = tmp.path().join("app");
    std::fs::create_dir(&app).unwrap();
    // the build step produces the served output
    let build = format!(
        "build: \"mkdir -p out && printf '%s' '<div id=client-mod>client:default</div>' > out/index.html\"\n      kind: command\n      start: \"{} serve --dir out\"\n      startup_timeout_secs: 30\n",
        env!("CARGO_BIN_EXE_pagecheck")
    );
    let extra = format!("      {}", build);
    let suite = write_suite(tmp.path(), &app, &extra);

    pagecheck()
        .args(["run", "--suite"])
        .arg(&suite)
        .assert()
        .code(0)
        .stdout(predicate::str::contains("PASS / should support MUI"));
}
