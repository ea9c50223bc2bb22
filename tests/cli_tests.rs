//! Runs the `snapshot-lifecycle` binary against a filesystem bucket.

use std::path::Path;
use std::process::{Command, Output};

const NOW: &str = "2026-02-27T12:00:00Z";

fn seed(root: &Path, stamps: &[&str]) {
    for stamp in stamps {
        let snapshot = root.join("snapshots").join(stamp);
        std::fs::create_dir_all(&snapshot).unwrap();
        std::fs::write(snapshot.join("manifest.json"), b"{}").unwrap();
    }
}

fn manifest(root: &Path, stamp: &str) -> bool {
    root.join("snapshots")
        .join(stamp)
        .join("manifest.json")
        .exists()
}

fn lifecycle(workdir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_snapshot-lifecycle"))
        .current_dir(workdir)
        .env_remove("RUST_LOG")
        .args(args)
        .output()
        .unwrap()
}

fn bucket_url(root: &Path) -> String {
    format!("file://{}", root.display())
}

#[test]
fn test_run_deletes_expired_snapshots() {
    let bucket = tempfile::tempdir().unwrap();
    let workdir = tempfile::tempdir().unwrap();
    seed(
        bucket.path(),
        &["2026-02-27-10-00", "2026-02-26-10-00", "2026-01-27-00-00"],
    );

    let url = bucket_url(bucket.path());
    let output = lifecycle(
        workdir.path(),
        &["run", "--bucket", &url, "--region", "local", "--now", NOW],
    );

    assert!(output.status.success(), "{output:?}");
    assert!(manifest(bucket.path(), "2026-02-27-10-00"));
    assert!(!manifest(bucket.path(), "2026-02-26-10-00"));
    assert!(!manifest(bucket.path(), "2026-01-27-00-00"));
}

#[test]
fn test_run_logs_one_summary() {
    let bucket = tempfile::tempdir().unwrap();
    let workdir = tempfile::tempdir().unwrap();
    seed(bucket.path(), &["2026-01-27-00-00"]);

    let url = bucket_url(bucket.path());
    let output = lifecycle(
        workdir.path(),
        &["run", "--bucket", &url, "--region", "local", "--now", NOW],
    );

    assert!(output.status.success(), "{output:?}");
    let logs = String::from_utf8_lossy(&output.stderr);
    assert_eq!(logs.matches("Retention run summary").count(), 1, "{logs}");
    assert_eq!(logs.matches("Snapshot deleted").count(), 1, "{logs}");
}

#[test]
fn test_version_names_the_binary() {
    let workdir = tempfile::tempdir().unwrap();
    let output = lifecycle(workdir.path(), &["version"]);

    assert!(output.status.success(), "{output:?}");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("snapshot-lifecycle "), "{stdout}");
}

#[test]
fn test_dry_run_deletes_nothing() {
    let bucket = tempfile::tempdir().unwrap();
    let workdir = tempfile::tempdir().unwrap();
    seed(bucket.path(), &["2026-01-27-00-00"]);

    let url = bucket_url(bucket.path());
    let output = lifecycle(
        workdir.path(),
        &[
            "run", "--bucket", &url, "--region", "local", "--now", NOW, "--dry-run",
        ],
    );

    assert!(output.status.success(), "{output:?}");
    assert!(manifest(bucket.path(), "2026-01-27-00-00"));
    let logs = String::from_utf8_lossy(&output.stderr);
    assert!(logs.contains("[DRY RUN] Would delete snapshot"));
}

#[test]
fn test_plan_prints_json() {
    let bucket = tempfile::tempdir().unwrap();
    let workdir = tempfile::tempdir().unwrap();
    seed(bucket.path(), &["2026-02-27-10-00", "2026-01-27-00-00"]);

    let url = bucket_url(bucket.path());
    let output = lifecycle(
        workdir.path(),
        &[
            "--quiet", "plan", "--bucket", &url, "--region", "local", "--now", NOW, "--json",
        ],
    );

    assert!(output.status.success(), "{output:?}");
    let plan: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(plan["keep"][0], "snapshots/2026-02-27-10-00/");
    assert_eq!(plan["delete"][0], "snapshots/2026-01-27-00-00/");
    assert!(manifest(bucket.path(), "2026-01-27-00-00"));
}

#[test]
fn test_missing_region_is_rejected() {
    let workdir = tempfile::tempdir().unwrap();
    let output = lifecycle(workdir.path(), &["run", "--bucket", "backups"]);
    assert!(!output.status.success());
}

#[test]
fn test_unreachable_bucket_fails() {
    let workdir = tempfile::tempdir().unwrap();
    let missing = workdir.path().join("does-not-exist");
    let url = bucket_url(&missing);

    let output = lifecycle(
        workdir.path(),
        &["run", "--bucket", &url, "--region", "local", "--now", NOW],
    );
    assert!(!output.status.success());
}

#[test]
fn test_invalid_policy_file_fails_validation() {
    let workdir = tempfile::tempdir().unwrap();
    std::fs::write(
        workdir.path().join("snapshot-lifecycle.toml"),
        "[retention.policy]\nkeep_all_within = \"10days\"\n",
    )
    .unwrap();

    let output = lifecycle(workdir.path(), &["validate"]);
    assert!(!output.status.success());

    let output = lifecycle(workdir.path(), &["config", "--json"]);
    assert!(output.status.success(), "{output:?}");
    let config: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(config["retention"]["policy"]["keep_all_within"], "10days");
}
