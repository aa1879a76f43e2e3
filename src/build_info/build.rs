use std::process::Command;

fn main() {
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs");

    let sha = git(&["rev-parse", "--short", "HEAD"]);
    let tag = git(&["describe", "--tags", "--always", "--dirty"]);
    println!("cargo:rustc-env=MICROBATCH_GIT_SHA={}", sha.as_deref().unwrap_or("unknown"));
    println!("cargo:rustc-env=MICROBATCH_GIT_TAG={}", tag.as_deref().unwrap_or("unknown"));
}

fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!text.is_empty()).then_some(text)
}
