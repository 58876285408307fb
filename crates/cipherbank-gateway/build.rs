use std::process::Command;

/// Short commit hash reported by `/health`, or "unknown" outside a git checkout.
fn git_short_sha() -> String {
    Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()
        .filter(|out| out.status.success())
        .and_then(|out| String::from_utf8(out.stdout).ok())
        .map(|sha| sha.trim().to_string())
        .filter(|sha| !sha.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

fn main() {
    println!("cargo:rustc-env=CIPHERBANK_GIT_SHA={}", git_short_sha());

    // New commits move HEAD or a ref; either should refresh the hash.
    for path in ["../../.git/HEAD", "../../.git/refs/"] {
        println!("cargo:rerun-if-changed={path}");
    }
}
