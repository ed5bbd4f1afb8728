const BUILD_NAME: &str = "Herald";
const LOG_LEVEL: &str = "debug";

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=.git/HEAD");

    build_info();
}

fn build_info() {
    println!("cargo:rustc-env=BUILD_NAME={}", BUILD_NAME);

    let sha = std::process::Command::new("git")
        .args(["rev-parse", "HEAD"])
        .output()
        .map(|x| String::from_utf8_lossy(&x.stdout).trim().to_string())
        .unwrap_or_default();
    let sha = if sha.is_empty() { "unknown".into() } else { sha };
    println!("cargo:rustc-env=GIT_REV={}", sha);

    let level = std::env::var("HERALD_LOG_LEVEL").unwrap_or_else(|_| LOG_LEVEL.into());
    println!("cargo:rerun-if-env-changed=HERALD_LOG_LEVEL");
    println!("cargo:rustc-env=LOG_LEVEL={}", level);
}
