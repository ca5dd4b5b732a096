use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::io::Write;
use std::process::Command;
use tempfile::tempdir;

#[test]
fn test_cli_pack_list_cycle() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Setup: Create a temporary directory and some test files
    let source_dir = tempdir()?;
    let file1_path = source_dir.path().join("file1.txt");
    let nested_dir = source_dir.path().join("nested");
    fs::create_dir(&nested_dir)?;
    let nested_file_path = nested_dir.join("nested_file.dat");

    let mut file1 = fs::File::create(&file1_path)?;
    writeln!(file1, "Hello, this is the first file.")?;

    let mut nested_file = fs::File::create(&nested_file_path)?;
    nested_file.write_all(&[0, 1, 2, 3, 4, 5])?;

    let snapshot_dir = tempdir()?;
    let snapshot_path = snapshot_dir.path().join("snapshot.tar.gz");

    // 2. Pack
    let mut cmd = Command::cargo_bin("treepack")?;
    cmd.arg("pack").arg(source_dir.path()).arg("--output").arg(&snapshot_path);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Packed 3 entries"));

    assert!(snapshot_path.exists());

    // 3. List contents of the snapshot
    let mut cmd = Command::cargo_bin("treepack")?;
    cmd.arg("list").arg(&snapshot_path);
    cmd.assert().success().stdout(
        predicate::str::contains("file1.txt")
            .and(predicate::str::contains("nested/nested_file.dat"))
            .and(predicate::str::contains("dir ")),
    );

    Ok(())
}

#[test]
fn test_cli_refuses_to_overwrite_snapshot() -> Result<(), Box<dyn std::error::Error>> {
    let source_dir = tempdir()?;
    fs::write(source_dir.path().join("a.txt"), b"hello")?;
    let snapshot_dir = tempdir()?;
    let snapshot_path = snapshot_dir.path().join("existing.tar.gz");
    fs::write(&snapshot_path, b"an older snapshot")?;

    let mut cmd = Command::cargo_bin("treepack")?;
    cmd.arg("pack").arg(source_dir.path()).arg("-o").arg(&snapshot_path);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("already exists and is not empty"));

    assert_eq!(fs::read(&snapshot_path)?, b"an older snapshot");
    Ok(())
}

#[test]
fn test_cli_json_summary_and_listing() -> Result<(), Box<dyn std::error::Error>> {
    let source_dir = tempdir()?;
    fs::write(source_dir.path().join("a.txt"), b"hello")?;
    let snapshot_dir = tempdir()?;
    let snapshot_path = snapshot_dir.path().join("snap.tar.gz");

    let output = Command::cargo_bin("treepack")?
        .arg("pack")
        .arg(source_dir.path())
        .arg("-o")
        .arg(&snapshot_path)
        .arg("--deterministic")
        .arg("--json")
        .output()?;
    assert!(output.status.success());
    let summary: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(summary["entries"], 1);
    assert_eq!(summary["payload_bytes"], 5);

    let output = Command::cargo_bin("treepack")?
        .arg("list")
        .arg("--json")
        .arg(&snapshot_path)
        .output()?;
    assert!(output.status.success());
    let listed: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(listed[0]["path"], "a.txt");
    assert_eq!(listed[0]["kind"], "regular");
    assert_eq!(listed[0]["size"], 5);
    assert_eq!(listed[0]["modified_time"], 0);
    Ok(())
}

#[test]
fn test_cli_progress_goes_to_stderr() -> Result<(), Box<dyn std::error::Error>> {
    let source_dir = tempdir()?;
    fs::write(source_dir.path().join("a.txt"), b"hello")?;
    let snapshot_dir = tempdir()?;

    let mut cmd = Command::cargo_bin("treepack")?;
    cmd.arg("pack")
        .arg(source_dir.path())
        .arg("-o")
        .arg(snapshot_dir.path().join("snap.tar.gz"))
        .arg("--progress");
    cmd.assert()
        .success()
        .stderr(predicate::str::contains("[pack] file").and(predicate::str::contains("a.txt")));
    Ok(())
}

#[test]
fn test_cli_missing_source_fails() -> Result<(), Box<dyn std::error::Error>> {
    let snapshot_dir = tempdir()?;
    let mut cmd = Command::cargo_bin("treepack")?;
    cmd.arg("pack")
        .arg(snapshot_dir.path().join("does-not-exist"))
        .arg("-o")
        .arg(snapshot_dir.path().join("snap.tar.gz"));
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("is not a readable directory"));
    Ok(())
}
