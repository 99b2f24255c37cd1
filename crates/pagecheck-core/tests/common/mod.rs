#![allow(dead_code)]

use std::path::{Path, PathBuf};

use pagecheck_core::RunOptions;

pub const CLIENT_MOD: &str = "#client-mod";
pub const CLIENT_MARKER: &str = "client:default";

pub fn manifest_path(rel: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join(rel)
}

/// Built output of the MUI app with package-import optimization applied.
pub fn mui_fixture_dir() -> PathBuf {
    manifest_path("tests/fixtures/optimize-package-imports/mui")
}

/// Write a minimal built app whose root page has `body` inside `<body>`.
pub fn write_app(dir: &Path, body: &str) {
    let html = format!(
        "<!DOCTYPE html><html><head><title>fixture</title></head><body>{}</body></html>",
        body
    );
    std::fs::write(dir.join("index.html"), html).expect("write index.html");
}

pub fn temp_app(body: &str) -> tempfile::TempDir {
    let dir = tempfile::tempdir().expect("tempdir");
    write_app(dir.path(), body);
    dir
}

pub fn options() -> RunOptions {
    RunOptions::default().with_render_timeout(10)
}
