use std::process::Command;

/// Release tags carry this prefix; other tags in the repository are ignored.
const TAG_PREFIX: &str = "infra-v";

fn main() {
    // INFRA_VERSION from the release workflow wins over git describe.
    if let Ok(version) = std::env::var("INFRA_VERSION") {
        println!("cargo:rustc-env=INFRA_VERSION={version}");
    } else if let Some(version) = describe() {
        println!("cargo:rustc-env=INFRA_VERSION={version}");
    }

    // Cargo always sets TARGET for build scripts.
    if let Ok(target) = std::env::var("TARGET") {
        println!("cargo:rustc-env=INFRA_TARGET={target}");
    }

    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/");
    println!("cargo:rerun-if-env-changed=INFRA_VERSION");
}

/// `git describe` against the newest `infra-v*` tag, without the prefix.
fn describe() -> Option<String> {
    let output = Command::new("git")
        .args(["describe", "--tags", "--dirty", "--match"])
        .arg(format!("{TAG_PREFIX}*"))
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let described = String::from_utf8_lossy(&output.stdout);
    described
        .trim()
        .strip_prefix(TAG_PREFIX)
        .map(str::to_string)
}
