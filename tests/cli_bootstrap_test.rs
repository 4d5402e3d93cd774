//! Integration tests for `psort bootstrap`.
//!
//! Clone tests use a throwaway local repository and are skipped when git is
//! not available.

mod common;

use common::TestEnv;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use std::process::Command;

fn git(dir: &Path, args: &[&str]) -> bool {
    Command::new("git")
        .args(["-c", "user.name=psort", "-c", "user.email=psort@example.com"])
        .args(args)
        .current_dir(dir)
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Create a repository holding `patches/server/<names>`, or `None` without git.
fn upstream_repo(names: &[&str]) -> Option<common::TempDir> {
    let dir = common::TempDir::new().unwrap();
    let patches = dir.path().join("patches").join("server");
    fs::create_dir_all(&patches).unwrap();
    for name in names {
        fs::write(patches.join(name), "").unwrap();
    }
    let ok = git(dir.path(), &["init", "-q"])
        && git(dir.path(), &["add", "."])
        && git(dir.path(), &["commit", "-q", "-m", "patches"]);
    ok.then_some(dir)
}

fn file_url(path: &Path) -> String {
    format!("file://{}", path.display())
}

#[test]
fn test_bootstrap_noop_when_patches_exist() {
    let env = TestEnv::with_patches(&["0001-a.patch", "0002-b.patch"]);
    let json = env.json(&["bootstrap"]);
    assert_eq!(json["cloned"], false);
    assert_eq!(json["patch_count"], 2);
}

#[test]
fn test_bootstrap_clones_missing_patches() {
    let Some(upstream) = upstream_repo(&["0001-first.patch", "0002-second.patch"]) else {
        return;
    };
    let env = TestEnv::new();
    fs::write(
        env.path().join("psort.kdl"),
        format!("repo-url \"{}\"\n", file_url(upstream.path())),
    )
    .unwrap();

    let json = env.json(&["bootstrap"]);
    assert_eq!(json["cloned"], true);
    assert_eq!(json["patch_count"], 2);

    let list = env.json(&["list"]);
    assert_eq!(list["patches"][1]["file_name"], "0002-second.patch");
}

#[test]
fn test_bootstrap_replaces_stale_checkout() {
    let Some(upstream) = upstream_repo(&["0001-only.patch"]) else {
        return;
    };
    let env = TestEnv::new();
    // A previous interrupted clone left this behind
    fs::create_dir_all(env.path().join("paper")).unwrap();
    fs::write(env.path().join("paper").join("junk"), "").unwrap();
    fs::write(
        env.path().join("psort.kdl"),
        format!("repo-url \"{}\"\n", file_url(upstream.path())),
    )
    .unwrap();

    let json = env.json(&["bootstrap"]);
    assert_eq!(json["cloned"], true);
    assert!(!env.path().join("paper").join("junk").exists());
}

#[test]
fn test_bootstrap_failure() {
    let env = TestEnv::new();
    let missing = env.path().join("no-such-repo");
    fs::write(
        env.path().join("psort.kdl"),
        format!("repo-url \"{}\"\n", file_url(&missing)),
    )
    .unwrap();

    env.psort()
        .arg("bootstrap")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Bootstrap failed"));
}

#[test]
fn test_bootstrap_leaves_checkout_alone_for_outside_patches_dir() {
    let env = TestEnv::new();
    fs::create_dir_all(env.path().join("paper")).unwrap();
    fs::write(env.path().join("paper").join("precious.txt"), "local work").unwrap();

    for force in [false, true] {
        let mut cmd = env.psort();
        cmd.args(["--patches-dir", "typo", "bootstrap"]);
        if force {
            cmd.arg("--force");
        }
        cmd.assert()
            .failure()
            .stderr(predicate::str::contains("outside the checkout"));
    }
    assert!(env.path().join("paper").join("precious.txt").exists());
}

#[test]
fn test_checkout_dir_may_not_hold_the_work_dir() {
    let env = TestEnv::new();
    fs::write(env.path().join("psort.kdl"), "checkout-dir \".\"\n").unwrap();
    env.write_tags(&["a.patch,api"]);

    env.psort()
        .arg("bootstrap")
        .assert()
        .failure()
        .stderr(predicate::str::contains("checkout-dir"));
    assert!(env.path().join("psort.kdl").exists());
    assert!(env.tags_path().exists());
}
