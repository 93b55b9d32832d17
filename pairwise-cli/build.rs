use std::path::Path;
use std::process::Command;

/// Short commit hash of the workspace, if it is a git checkout.
fn git_short_sha(workspace: &Path) -> Option<String> {
    let out = Command::new("git")
        .arg("-C")
        .arg(workspace)
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()?;
    if !out.status.success() {
        return None;
    }
    let sha = String::from_utf8(out.stdout).ok()?.trim().to_string();
    (!sha.is_empty()).then_some(sha)
}

fn main() {
    println!("cargo:rerun-if-env-changed=PAIRWISE_BUILD_SHA");

    // Packagers building from a tarball can pin the stamp.
    let sha = std::env::var("PAIRWISE_BUILD_SHA").ok().or_else(|| {
        let manifest = std::env::var("CARGO_MANIFEST_DIR").ok()?;
        let workspace = Path::new(&manifest).parent()?.to_path_buf();
        println!("cargo:rerun-if-changed={}", workspace.join(".git/HEAD").display());
        git_short_sha(&workspace)
    });

    println!(
        "cargo:rustc-env=PAIRWISE_BUILD_SHA={}",
        sha.as_deref().unwrap_or("unknown")
    );
}
