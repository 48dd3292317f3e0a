//! Test infrastructure shared by the sky dome crates.
//!
//! Integration tests locate the workspace root, read fixture snapshots from
//! `skydome/data/`, and keep rendered SVG/PNG frames under
//! `<workspace>/test_output/` so they can be inspected after a run.
//!
//! ```rust
//! use test_helpers::{data_path, output_path};
//!
//! let snapshot = data_path("sample_snapshot.json");
//! assert!(snapshot.exists());
//!
//! let frame = output_path("doc_frame.svg");
//! assert!(frame.parent().unwrap().is_dir());
//! ```

use once_cell::sync::Lazy;
use std::env;
use std::path::{Path, PathBuf};

/// Errors raised while setting up the test environment.
#[derive(thiserror::Error, Debug)]
pub enum TestHelperError {
    /// No `Cargo.toml` with a `[workspace]` table above the current directory.
    #[error("Failed to find project root: {0}")]
    ProjectRootNotFound(String),
}

/// Walk up from the current directory to the workspace `Cargo.toml`.
///
/// Cargo runs each crate's tests from that crate's directory, so the walk is
/// needed for tests in every member to agree on one output location.
pub fn find_project_root() -> Result<PathBuf, TestHelperError> {
    let mut current_dir = env::current_dir().map_err(|e| {
        TestHelperError::ProjectRootNotFound(format!("Failed to get current directory: {}", e))
    })?;

    loop {
        let cargo_toml = current_dir.join("Cargo.toml");
        if cargo_toml.exists() {
            let content = std::fs::read_to_string(&cargo_toml).map_err(|e| {
                TestHelperError::ProjectRootNotFound(format!("Failed to read Cargo.toml: {}", e))
            })?;

            if content.contains("[workspace]") {
                return Ok(current_dir);
            }
        }

        if !current_dir.pop() {
            break;
        }
    }

    Err(TestHelperError::ProjectRootNotFound(
        "Workspace root not found".to_string(),
    ))
}

static PROJECT_ROOT: Lazy<PathBuf> =
    Lazy::new(|| find_project_root().expect("Failed to find project root directory"));

/// `<workspace>/test_output`, created on first use.
pub fn get_output_dir() -> PathBuf {
    let output_dir = PROJECT_ROOT.join("test_output");

    if !output_dir.exists() {
        std::fs::create_dir_all(&output_dir).expect("Failed to create output directory");
    }

    output_dir
}

/// Path inside the test output directory. Parent directories are created.
pub fn output_path<P: AsRef<Path>>(path: P) -> PathBuf {
    let path = get_output_dir().join(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("Failed to create output subdirectory");
    }
    path
}

/// Path to a fixture file shipped in `skydome/data`.
pub fn data_path<P: AsRef<Path>>(name: P) -> PathBuf {
    PROJECT_ROOT.join("skydome").join("data").join(name)
}

/// Route `log` output through the test harness; safe to call from every test.
pub fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
