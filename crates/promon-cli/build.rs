use std::process::Command;

fn git(args: &[&str]) -> Option<String> {
    Command::new("git")
        .args(args)
        .output()
        .ok()
        .filter(|o| o.status.success())
        .and_then(|o| String::from_utf8(o.stdout).ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn main() {
    let version = env!("CARGO_PKG_VERSION");
    let full = match git(&["rev-parse", "--short", "HEAD"]) {
        Some(hash) => format!("{version} ({hash})"),
        None => version.to_string(),
    };

    println!("cargo:rustc-env=PROMON_VERSION={}", full);
    println!("cargo:rerun-if-changed=../../.git/HEAD");
}
