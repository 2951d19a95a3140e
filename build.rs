//! Embeds `BUILD_INFO_HUMAN`, the `--version` line shared by every ghbulk
//! binary: `<pkg version> (<git describe>) <rustc version>`.
//!
//! Untagged checkouts get a pseudo-version of the form
//! `v<pkg version>-<YYYYMMDDHHMMSS>-<12 char sha>[+dirty]`. Clean trees use
//! the commit time so rebuilding the same commit gives the same string.

use std::process::Command;

use chrono::{DateTime, Utc};

const STAMP: &str = "%Y%m%d%H%M%S";

fn main() {
    for path in ["src", "build.rs", "Cargo.toml", "Cargo.lock"] {
        println!("cargo:rerun-if-changed={path}");
    }

    let info = [
        Some(env!("CARGO_PKG_VERSION").to_string()),
        Some(format!("({})", describe())),
        run("rustc", &["--version"]),
    ]
    .into_iter()
    .flatten()
    .collect::<Vec<_>>()
    .join(" ");

    println!("cargo:rustc-env=BUILD_INFO_HUMAN={info}");
}

fn run(program: &str, args: &[&str]) -> Option<String> {
    let output = Command::new(program).args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8(output.stdout).ok()?;
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

fn git(args: &[&str]) -> Option<String> {
    run("git", args)
}

/// `None` outside a git checkout. `.cargo-ok`, left behind by
/// `cargo install --git`, does not count as a change.
fn dirty() -> Option<bool> {
    git(&["status", "--porcelain"]).map(|status| {
        status
            .lines()
            .filter_map(|line| line.get(3..))
            .any(|path| path != ".cargo-ok")
    })
}

fn describe() -> String {
    match git(&["describe", "--tags", "--always", "--dirty"]) {
        Some(desc) if desc.contains('v') || desc.contains("-g") => desc,
        _ => pseudo_version(),
    }
}

fn pseudo_version() -> String {
    let sha = git(&["rev-parse", "--short=12", "HEAD"]).unwrap_or_else(|| "unknown".into());
    let is_dirty = dirty();

    let committed = git(&["log", "-1", "--format=%ct"])
        .and_then(|secs| secs.parse::<i64>().ok())
        .and_then(|secs| DateTime::from_timestamp(secs, 0));
    let stamp = match (is_dirty, committed) {
        (Some(false), Some(at)) => at.format(STAMP).to_string(),
        _ => Utc::now().format(STAMP).to_string(),
    };

    let suffix = if is_dirty == Some(true) { "+dirty" } else { "" };
    format!("v{}-{stamp}-{sha}{suffix}", env!("CARGO_PKG_VERSION"))
}
