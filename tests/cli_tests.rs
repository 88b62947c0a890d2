use assert_cmd::prelude::*;
use fragmap::FragmentMap;
use predicates::prelude::*;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::{tempdir, TempDir};

const TEST_HHM: &str = "HHsearch 1.5\nNAME  cli_query\nLENG  40 match states, 40 columns in multiple alignment\nHMM    A\tC\tD\n#\n//\n";
const TEST_FASTA: &str = ">cli_query\nMKLLILTCLVAVALARPKHPIKHQGLPQEVLNENLLRFFV\n";

fn write_inputs(dir: &TempDir) -> std::io::Result<(PathBuf, PathBuf)> {
    let fasta = dir.path().join("query.fasta");
    let hhm = dir.path().join("query.hhm");
    std::fs::write(&fasta, TEST_FASTA)?;
    std::fs::write(&hhm, TEST_HHM)?;
    Ok((fasta, hhm))
}

/// A search program that scores each window by its length
#[cfg(unix)]
fn write_search_script(dir: &Path) -> std::io::Result<PathBuf> {
    use std::os::unix::fs::PermissionsExt;

    let script = dir.join("fake_search.sh");
    std::fs::write(
        &script,
        "#!/bin/sh\n\
         # args: profile fasta start end backend\n\
         echo \"{\\\"start\\\": $3, \\\"end\\\": $4, \\\"score\\\": $(($4 - $3)), \\\"frags\\\": []}\"\n",
    )?;
    std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755))?;
    Ok(script)
}

#[test]
fn test_cli_help() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("fragmap")?;
    cmd.arg("--help");
    cmd.assert().success().stdout(predicate::str::contains(
        "Map a protein sequence to its best-matching structural fragments",
    ));

    Ok(())
}

#[test]
fn test_cli_map_help() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("fragmap")?;
    cmd.args(["map", "--help"]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("--search-cmd"))
        .stdout(predicate::str::contains("--window-increment"));

    Ok(())
}

#[test]
fn test_cli_windows_by_length() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("fragmap")?;
    cmd.args(["windows", "--length", "40"]);
    cmd.assert()
        .success()
        .stdout("start\tmin_length\tmax_length\n0\t30\t35\n5\t30\t35\n10\t30\t30\n");

    Ok(())
}

#[test]
fn test_cli_windows_from_query() -> Result<(), Box<dyn std::error::Error>> {
    let temp_dir = tempdir()?;
    let (fasta, _) = write_inputs(&temp_dir)?;

    let mut cmd = Command::cargo_bin("fragmap")?;
    cmd.args(["windows", "--query", fasta.to_str().unwrap(), "--window-increment", "10"]);
    cmd.assert()
        .success()
        .stdout("start\tmin_length\tmax_length\n0\t30\t35\n10\t30\t30\n");

    Ok(())
}

#[test]
fn test_cli_windows_invalid_config() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("fragmap")?;
    cmd.args(["windows", "--length", "40", "--window-min", "36"]);
    cmd.assert().code(1).stderr(predicate::str::contains("Configuration error: window_max"));

    Ok(())
}

#[test]
fn test_cli_windows_from_config_file() -> Result<(), Box<dyn std::error::Error>> {
    let temp_dir = tempdir()?;
    let config = temp_dir.path().join("config.json");
    std::fs::write(&config, r#"{"window_min": 5, "window_max": 6, "window_increment": 4}"#)?;

    let mut cmd = Command::cargo_bin("fragmap")?;
    cmd.args(["windows", "--length", "10", "--config", config.to_str().unwrap()]);
    cmd.assert().success().stdout("start\tmin_length\tmax_length\n0\t5\t6\n4\t5\t6\n");

    Ok(())
}

#[test]
fn test_cli_map_requires_profile_source() -> Result<(), Box<dyn std::error::Error>> {
    let temp_dir = tempdir()?;
    let (fasta, _) = write_inputs(&temp_dir)?;

    let mut cmd = Command::cargo_bin("fragmap")?;
    cmd.args(["map", "--query", fasta.to_str().unwrap(), "--search-cmd", "true"]);
    cmd.assert().failure().stderr(predicate::str::contains("--seq-db"));

    Ok(())
}

#[test]
fn test_cli_map_rejects_multiple_sequences() -> Result<(), Box<dyn std::error::Error>> {
    let temp_dir = tempdir()?;
    let (_, hhm) = write_inputs(&temp_dir)?;
    let fasta = temp_dir.path().join("two.fasta");
    std::fs::write(&fasta, ">a\nPLANTANDANIMALGENQMES\n>b\nLIVINGALIVE\n")?;

    let mut cmd = Command::cargo_bin("fragmap")?;
    cmd.args([
        "map",
        "--query",
        fasta.to_str().unwrap(),
        "--profile",
        hhm.to_str().unwrap(),
        "--search-cmd",
        "true",
    ]);
    cmd.assert()
        .code(2)
        .stderr(predicate::str::contains("2 sequences found"));

    Ok(())
}

#[test]
fn test_cli_map_missing_query_is_input_error() -> Result<(), Box<dyn std::error::Error>> {
    let temp_dir = tempdir()?;
    let (_, hhm) = write_inputs(&temp_dir)?;
    let missing = temp_dir.path().join("missing.fasta");

    let mut cmd = Command::cargo_bin("fragmap")?;
    cmd.args([
        "map",
        "--query",
        missing.to_str().unwrap(),
        "--profile",
        hhm.to_str().unwrap(),
        "--search-cmd",
        "true",
    ]);
    cmd.assert().code(2).stderr(predicate::str::contains("IO error"));

    Ok(())
}

#[cfg(unix)]
#[test]
fn test_cli_map_with_search_command() -> Result<(), Box<dyn std::error::Error>> {
    let temp_dir = tempdir()?;
    let (fasta, hhm) = write_inputs(&temp_dir)?;
    let script = write_search_script(temp_dir.path())?;
    let output = temp_dir.path().join("map.json");
    let csv = temp_dir.path().join("map.csv");

    let mut cmd = Command::cargo_bin("fragmap")?;
    cmd.args([
        "map",
        "--query",
        fasta.to_str().unwrap(),
        "--profile",
        hhm.to_str().unwrap(),
        "--search-cmd",
        script.to_str().unwrap(),
        "--backend",
        "hhsearch",
        "--threads",
        "2",
        "--output",
        output.to_str().unwrap(),
        "--csv",
        csv.to_str().unwrap(),
    ]);
    cmd.assert().success();

    let map = FragmentMap::read_json(&output)?;
    assert_eq!(map.name, "cli_query");
    let windows: Vec<_> = map.segments().map(|s| (s.start, s.end)).collect();
    assert_eq!(windows, vec![(0, 35), (5, 40), (10, 40)]);

    let summary = std::fs::read_to_string(&csv)?;
    assert_eq!(summary.lines().count(), 4);
    assert!(summary.starts_with("name,start,end,score"));

    Ok(())
}

#[cfg(unix)]
#[test]
fn test_cli_map_to_stdout() -> Result<(), Box<dyn std::error::Error>> {
    let temp_dir = tempdir()?;
    let (fasta, hhm) = write_inputs(&temp_dir)?;
    let script = write_search_script(temp_dir.path())?;

    let mut cmd = Command::cargo_bin("fragmap")?;
    cmd.args([
        "map",
        "--query",
        fasta.to_str().unwrap(),
        "--profile",
        hhm.to_str().unwrap(),
        "--search-cmd",
        script.to_str().unwrap(),
        "--window-increment",
        "10",
    ]);
    let output = cmd.output()?;
    assert!(output.status.success());

    let map: FragmentMap = serde_json::from_slice(&output.stdout)?;
    assert_eq!(map.len(), 2);
    assert_eq!(map.segment_at(10).map(|s| s.end), Some(40));

    Ok(())
}

#[cfg(unix)]
#[test]
fn test_cli_map_failing_search_command() -> Result<(), Box<dyn std::error::Error>> {
    let temp_dir = tempdir()?;
    let (fasta, hhm) = write_inputs(&temp_dir)?;

    let mut cmd = Command::cargo_bin("fragmap")?;
    cmd.args([
        "map",
        "--query",
        fasta.to_str().unwrap(),
        "--profile",
        hhm.to_str().unwrap(),
        "--search-cmd",
        "false",
    ]);
    cmd.assert()
        .code(1)
        .stderr(predicate::str::contains("Fragment search failed for window"));

    Ok(())
}
