// SPDX-License-Identifier: GPL-3.0-only

use std::process::Command;

fn main() {
    println!("cargo::rerun-if-changed=.git/HEAD");
    println!("cargo::rerun-if-changed=.git/refs/tags");
    println!("cargo::rerun-if-env-changed=DOCUMENT_CAPTURE_VERSION");

    // Packagers may pin the version explicitly
    let version = std::env::var("DOCUMENT_CAPTURE_VERSION").unwrap_or_else(|_| git_version());

    println!("cargo::rustc-env=GIT_VERSION={}", version);
}

/// `<package version>-<short hash>`, with `-dirty` when HEAD is past the tag
fn git_version() -> String {
    let package_version = std::env::var("CARGO_PKG_VERSION").unwrap_or_default();

    let Some(hash) = git(&["rev-parse", "--short", "HEAD"]) else {
        return package_version;
    };

    // "v0.1.0" at a tag, "v0.1.0-5-gabcdef1" after it
    match git(&["describe", "--tags", "--match", "v*"]) {
        Some(described) if described.contains('-') => {
            let base = described.split('-').next().unwrap_or(&described);
            format!("{}-dirty-{}", base.trim_start_matches('v'), hash)
        }
        Some(described) => format!("{}-{}", described.trim_start_matches('v'), hash),
        None => format!("{}-{}", package_version, hash),
    }
}

fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    output
        .status
        .success()
        .then(|| String::from_utf8_lossy(&output.stdout).trim().to_string())
}
