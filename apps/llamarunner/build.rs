//! Build script for llamarunner.
//!
//! Embeds the git commit in `--version` output.

use std::process::Command;

fn main() {
    let commit = get_git_commit();
    println!("cargo:rustc-env=LLAMARUNNER_GIT_COMMIT={commit}");

    // Path is relative to the repository root.
    if let Some(repo_root) = get_repo_root() {
        println!("cargo:rerun-if-changed={repo_root}/.git/HEAD");
    }
}

fn get_repo_root() -> Option<String> {
    let output = Command::new("git")
        .args(["rev-parse", "--show-toplevel"])
        .output()
        .ok()?;

    if !output.status.success() {
        return None;
    }
    let path = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!path.is_empty()).then_some(path)
}

/// Short commit hash, or `unknown` outside a git checkout.
fn get_git_commit() -> String {
    let output = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output();

    if let Ok(output) = output
        && output.status.success()
    {
        let hash = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if !hash.is_empty() {
            return hash;
        }
    }

    "unknown".to_string()
}
