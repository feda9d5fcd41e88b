//! End-to-end tests of the demo binary.
//!
//! Every test passes `--no-config` (or an explicit `--config`) so a config file
//! in the user's home directory can't change the outcome.

#![allow(clippy::panic_in_result_fn)]

use std::path::Path;

use anyhow::Context;
use assert_cmd::Command;
use predicates::prelude::*;

fn demo() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("verdict-demo"));
    cmd.env_remove("VERDICT_RUN_NAME");
    cmd
}

fn stdout_of(cmd: &mut Command) -> String {
    String::from_utf8_lossy(&cmd.output().unwrap().stdout).into_owned()
}

fn file_names(dir: &Path) -> anyhow::Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in std::fs::read_dir(dir).context("failed to list output directory")? {
        names.push(entry?.file_name().to_string_lossy().into_owned());
    }
    names.sort();
    Ok(names)
}

#[test]
fn summary_goes_to_stdout() {
    demo()
        .args(["--no-config", "-o", "DS"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Name of Unit Tests: Thingy Tests").from_utf8())
        .stdout(predicate::str::contains("Unit Test Totals").from_utf8())
        .stdout(predicate::str::contains("Test 2 Thingys").from_utf8());
}

#[test]
fn run_name_comes_from_arguments() {
    demo()
        .args(["--no-config", "-o", "S", "--name", "Nightly"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Name of Unit Tests: Nightly").from_utf8());
}

#[test]
fn missing_destination_is_a_usage_error() {
    demo()
        .args(["--no-config", "-o", "D"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("no output destination").from_utf8());
}

#[test]
fn bad_option_letters_are_a_usage_error() {
    demo()
        .args(["--no-config", "-o", "Sq"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("invalid output options").from_utf8());
}

#[test]
fn conflicting_flags_are_rejected() {
    demo().args(["--no-config", "-o", "S", "-p", "-f"]).assert().code(2);
    demo().args(["--no-config", "-o", "S", "-z", "-r"]).assert().code(2);
}

#[test]
fn fatal_suite_flushes_once_and_exits() {
    let stdout = stdout_of(demo().args(["--no-config", "-o", "DS", "-f"]));

    assert_eq!(stdout.matches("Unit Test Totals").count(), 1);
    assert!(stdout.contains("Fatal Thingy Test"));
    assert!(stdout.contains("Program must exit now!"));
    assert!(!stdout.contains("Why is this program still running?"));

    demo().args(["--no-config", "-o", "S", "-f"]).assert().code(1);
}

#[test]
fn repeat_prints_two_summaries() {
    let stdout = stdout_of(demo().args(["--no-config", "-o", "DS", "-r"]));
    assert_eq!(stdout.matches("Unit Test Totals").count(), 2);
}

#[test]
fn no_tests_still_prints_a_summary() {
    let stdout = stdout_of(demo().args(["--no-config", "-o", "TS", "-z"]));
    assert_eq!(stdout.matches("Unit Test Totals").count(), 1);
    assert!(!stdout.contains("Passing Test"));
}

#[test]
fn keep_alive_with_table_at_exit_skips_the_summary() {
    let stdout = stdout_of(demo().args(["--no-config", "-o", "DS", "-L", "-e"]));
    assert!(!stdout.contains("Unit Test Totals"));

    let stdout = stdout_of(demo().args(["--no-config", "-o", "DS", "-e"]));
    assert_eq!(stdout.matches("Unit Test Totals").count(), 1);
}

#[test]
fn strict_mode_fails_on_failures() {
    demo().args(["--no-config", "-o", "S", "-a"]).assert().code(1);
    demo()
        .args(["--no-config", "-o", "S", "-a", "-p"])
        .assert()
        .success();
}

#[test]
fn writes_every_file_format() -> anyhow::Result<()> {
    let dir = assert_fs::TempDir::new()?;
    let partial = |name: &str| dir.path().join(name).to_string_lossy().into_owned();

    demo()
        .args(["--no-config", "-o", "D"])
        .args(["-t", &partial("text")])
        .args(["--html", &partial("page")])
        .args(["-x", &partial("data")])
        .args(["-j", &partial("junit")])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().from_utf8());

    let names = file_names(dir.path())?;
    let has = |prefix: &str, suffix: &str| {
        names
            .iter()
            .any(|n| n.starts_with(prefix) && n.ends_with(suffix))
    };

    assert!(has("text_", ".txt"), "{names:?}");
    assert!(has("page_", ".html"), "{names:?}");
    assert!(names.contains(&String::from("page.html")), "{names:?}");
    assert!(has("data_", ".xml"), "{names:?}");
    assert!(has("junit_", ".junit.xml"), "{names:?}");

    let text_file = names
        .iter()
        .find(|n| n.starts_with("text_"))
        .context("no text file")?;
    let text = std::fs::read_to_string(dir.path().join(text_file))?;
    assert!(text.contains("Test 1 Thingy"));
    assert!(text.contains("Unit Test Totals"));

    Ok(())
}

#[test]
fn explicit_broken_config_is_an_error() -> anyhow::Result<()> {
    let dir = assert_fs::TempDir::new()?;
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[report\noptions = ")?;

    demo()
        .arg("--config")
        .arg(&path)
        .args(["-o", "S"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("failed to parse config file").from_utf8());

    Ok(())
}

#[test]
fn config_file_supplies_settings() -> anyhow::Result<()> {
    let dir = assert_fs::TempDir::new()?;
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        "[report]\nname = \"From Config\"\noptions = \"TS\"\n",
    )?;

    demo()
        .arg("--config")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Name of Unit Tests: From Config").from_utf8())
        .stdout(predicate::str::contains("Unit Test Totals").from_utf8());

    Ok(())
}
