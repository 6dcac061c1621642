//! build script to capture version information at compile time

use std::process::Command;

fn main() {
    println!("cargo:rerun-if-changed=.git/HEAD");

    let sha = Command::new("git")
        .args(["rev-parse", "--short=8", "HEAD"])
        .output()
        .ok()
        .filter(|o| o.status.success())
        .map(|o| String::from_utf8_lossy(&o.stdout).trim().to_string())
        .unwrap_or_else(|| "unknown".to_string());
    println!("cargo:rustc-env=COFFER_GIT_SHA={sha}");

    let timestamp = chrono::Utc::now().format("%Y-%m-%d").to_string();
    println!("cargo:rustc-env=COFFER_BUILD_DATE={timestamp}");
}
