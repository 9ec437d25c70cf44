// ABOUTME: Black-box tests for the relevo binary.
// ABOUTME: Verifies argument validation, exit codes, and the releases listing.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn relevo() -> Command {
    Command::cargo_bin("relevo").unwrap()
}

#[test]
fn no_arguments_is_a_usage_error() {
    relevo().assert().code(1);
}

#[test]
fn help_succeeds() {
    relevo()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("deploy"));
}

#[test]
fn version_succeeds() {
    relevo()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("relevo"));
}

#[test]
fn artifact_and_repo_conflict() {
    let root = TempDir::new().unwrap();
    relevo()
        .args([
            "deploy",
            "--app",
            "api",
            "--root",
            root.path().to_str().unwrap(),
            "--artifact",
            "/tmp/build.tar.gz",
            "--repo",
            "https://example.com/api.git",
            "--health-url",
            "http://127.0.0.1:1/health",
        ])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("cannot be used with"));
}

#[test]
fn reference_requires_repo() {
    let root = TempDir::new().unwrap();
    relevo()
        .args([
            "deploy",
            "--app",
            "api",
            "--root",
            root.path().to_str().unwrap(),
            "--artifact",
            "/tmp/build.tar.gz",
            "--ref",
            "v2.1.0",
            "--health-url",
            "http://127.0.0.1:1/health",
        ])
        .assert()
        .code(1);
}

#[test]
fn unit_and_compose_file_conflict() {
    let root = TempDir::new().unwrap();
    relevo()
        .args([
            "deploy",
            "--app",
            "api",
            "--root",
            root.path().to_str().unwrap(),
            "--artifact",
            "/tmp/build.tar.gz",
            "--health-url",
            "http://127.0.0.1:1/health",
            "--unit",
            "api.service",
            "--compose-file",
            "/tmp/docker-compose.yml",
        ])
        .assert()
        .code(1);
}

#[test]
fn missing_source_is_a_usage_error() {
    let root = TempDir::new().unwrap();
    relevo()
        .args([
            "deploy",
            "--app",
            "api",
            "--root",
            root.path().to_str().unwrap(),
            "--health-url",
            "http://127.0.0.1:1/health",
        ])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("artifact").or(predicate::str::contains("repo")));
}

#[test]
fn invalid_app_name_is_a_usage_error() {
    let root = TempDir::new().unwrap();
    relevo()
        .args([
            "deploy",
            "--app",
            "Not_Valid",
            "--root",
            root.path().to_str().unwrap(),
            "--artifact",
            "/tmp/build.tar.gz",
            "--health-url",
            "http://127.0.0.1:1/health",
        ])
        .assert()
        .code(1);
}

#[test]
fn invalid_health_url_is_a_usage_error() {
    let root = TempDir::new().unwrap();
    relevo()
        .args([
            "deploy",
            "--app",
            "api",
            "--root",
            root.path().to_str().unwrap(),
            "--artifact",
            "/tmp/build.tar.gz",
            "--health-url",
            "not a url",
        ])
        .assert()
        .code(1);
}

#[test]
fn nonexistent_artifact_fails_the_deploy() {
    let root = TempDir::new().unwrap();
    relevo()
        .args([
            "deploy",
            "--app",
            "api",
            "--root",
            root.path().to_str().unwrap(),
            "--artifact",
            root.path().join("no-such-build").to_str().unwrap(),
            "--health-url",
            "http://127.0.0.1:1/health",
            "--timeout",
            "1",
        ])
        .assert()
        .code(2);
}

#[test]
fn releases_lists_newest_first_with_current_marked() {
    let root = TempDir::new().unwrap();
    let releases = root.path().join("api/releases");
    fs::create_dir_all(releases.join("20260824120000000")).unwrap();
    fs::create_dir_all(releases.join("20260825143015042")).unwrap();
    std::os::unix::fs::symlink(
        "releases/20260824120000000",
        root.path().join("api/current"),
    )
    .unwrap();

    relevo()
        .args([
            "releases",
            "--app",
            "api",
            "--root",
            root.path().to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "  20260825143015042\n* 20260824120000000",
        ));
}

#[test]
fn releases_on_an_empty_root_succeeds_with_no_output() {
    let root = TempDir::new().unwrap();
    relevo()
        .args([
            "releases",
            "--app",
            "api",
            "--root",
            root.path().to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[test]
fn rollback_without_a_predecessor_fails() {
    let root = TempDir::new().unwrap();
    let releases = root.path().join("api/releases");
    fs::create_dir_all(releases.join("20260825143015042")).unwrap();
    std::os::unix::fs::symlink(
        "releases/20260825143015042",
        root.path().join("api/current"),
    )
    .unwrap();

    relevo()
        .args([
            "rollback",
            "--app",
            "api",
            "--root",
            root.path().to_str().unwrap(),
        ])
        .assert()
        .code(2);
}

#[test]
fn rollback_repoints_current_at_the_predecessor() {
    let root = TempDir::new().unwrap();
    let releases = root.path().join("api/releases");
    fs::create_dir_all(releases.join("20260824120000000")).unwrap();
    fs::create_dir_all(releases.join("20260825143015042")).unwrap();
    std::os::unix::fs::symlink(
        "releases/20260825143015042",
        root.path().join("api/current"),
    )
    .unwrap();

    relevo()
        .args([
            "rollback",
            "--app",
            "api",
            "--root",
            root.path().to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("20260824120000000"));

    let target = fs::read_link(root.path().join("api/current")).unwrap();
    assert_eq!(target, std::path::PathBuf::from("releases/20260824120000000"));
}
