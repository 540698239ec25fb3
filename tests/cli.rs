use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// `appskel` run inside `dir`, with `dir` as the home directory so no real
/// config file is picked up.
fn appskel(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("appskel").unwrap();
    cmd.current_dir(dir.path())
        .env("HOME", dir.path())
        .env_remove("RUST_LOG")
        .env("COLUMNS", "100")
        .env("LINES", "40");
    cmd
}

#[test]
fn help_lists_options() {
    let dir = TempDir::new().unwrap();
    appskel(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage: appskel"))
        .stdout(predicate::str::contains("--conf_file <FILE>"))
        .stdout(predicate::str::contains("Output Options"))
        .stdout(predicate::str::contains("--verbosity <INT>"))
        .stdout(predicate::str::contains("Long help about appskel"));
}

#[test]
fn version_prints_and_exits_zero() {
    let dir = TempDir::new().unwrap();
    appskel(&dir)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::diff(format!(
            "Version {}\n",
            env!("CARGO_PKG_VERSION")
        )));
}

#[test]
fn short_version_flag() {
    let dir = TempDir::new().unwrap();
    appskel(&dir)
        .arg("-v")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("Version "));
}

#[test]
fn longhelp_prints_documentation() {
    let dir = TempDir::new().unwrap();
    appskel(&dir)
        .args(["--longhelp", "--version"])
        .assert()
        .success()
        .stdout(predicate::str::contains("starting point for a new command-line application"))
        .stdout(predicate::str::contains("Version").not());
}

#[test]
fn runs_and_reports_defaults() {
    let dir = TempDir::new().unwrap();
    appskel(&dir)
        .assert()
        .success()
        .stderr(predicate::str::contains("Results:"))
        .stderr(predicate::str::contains("verbosity = 2"));
}

#[test]
fn config_file_in_working_directory_is_read() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join(".appskelrc"), "[appskel]\nverbosity = 0\n").unwrap();

    appskel(&dir)
        .assert()
        .success()
        .stderr(predicate::str::is_empty());
}

#[test]
fn command_line_beats_config_file() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join(".appskelrc"), "[appskel]\nverbosity = 0\n").unwrap();

    appskel(&dir)
        .args(["--verbosity", "2"])
        .assert()
        .success()
        .stderr(predicate::str::contains("verbosity = 2"));
}

#[test]
fn conf_file_option_is_read() {
    let dir = TempDir::new().unwrap();
    let conf = dir.path().join("custom.conf");
    let log = dir.path().join("run.log");
    fs::write(
        &conf,
        format!("[appskel]\nverbosity = 0\nlogfile = {}\n", log.display()),
    )
    .unwrap();

    appskel(&dir)
        .args(["-c", conf.to_str().unwrap()])
        .assert()
        .success()
        .stderr(predicate::str::is_empty());

    let logged = fs::read_to_string(&log).unwrap();
    assert!(logged.contains("Results:"));
    assert!(logged.contains("config files searched"));
}

#[test]
fn unknown_argument_exits_one() {
    let dir = TempDir::new().unwrap();
    appskel(&dir)
        .arg("stray")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("unrecognized arguments: stray"));
}

#[test]
fn invalid_value_is_usage_error() {
    let dir = TempDir::new().unwrap();
    appskel(&dir)
        .args(["--verbosity", "loud"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("invalid value 'loud'"));
}

#[test]
fn malformed_config_file_exits_one() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join(".appskelrc"), "verbosity = 3\n").unwrap();

    appskel(&dir)
        .assert()
        .code(1)
        .stderr(predicate::str::contains(".appskelrc (line 1)"));
}
