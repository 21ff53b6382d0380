//! End-to-end tests for the `ted-ingest` binary

mod common;

use assert_cmd::Command;
use common::{read_rows, write_archive, Notice};
use predicates::prelude::*;
use std::path::Path;
use tempfile::TempDir;

fn ted_ingest() -> Command {
    let mut cmd = Command::cargo_bin("ted-ingest").unwrap();
    cmd.env_remove("TED_DATA_DIR")
        .env_remove("TED_JOBS")
        .env_remove("LOG_OUTPUT")
        .env_remove("LOG_FILTER")
        .env("LOG_LEVEL", "warn");
    cmd
}

fn fixture_dir() -> TempDir {
    let dir = TempDir::new().unwrap();
    let works = Notice::new("F02", "45000000")
        .uri("works")
        .lefti(
            "<SUITABILITY><P>Registered in the trade register.</P>\
             <P>Short.</P></SUITABILITY>",
        )
        .lot(r#"<CPV_ADDITIONAL><CPV_CODE CODE="45210000"/></CPV_ADDITIONAL>"#)
        .lot(
            "<CRITERIA_CANDIDATE><P>Registered in the trade register.</P>\
             <P>Three comparable projects. Each worth at least one million euro.</P>\
             </CRITERIA_CANDIDATE>",
        );
    let services = Notice::new("F02", "44100000").uri("services").lot("");
    let award = Notice::new("F03", "45000000").uri("award").lot("");
    write_archive(
        dir.path(),
        "2021-03",
        &[
            ("2021-03/works.xml", works.xml()),
            ("2021-03/services.xml", services.xml()),
            ("2021-03/award.xml", award.xml()),
        ],
    );
    dir
}

fn extract_to(data_dir: &Path, output: &Path, cpv: &[&str]) {
    ted_ingest()
        .args(["extract", "2021-03", "2021-03"])
        .arg(output)
        .args(cpv)
        .arg("--data-dir")
        .arg(data_dir)
        .assert()
        .success();
}

#[test]
fn test_help_lists_subcommands() {
    ted_ingest()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("extract"))
        .stdout(predicate::str::contains("corpus"));
}

#[test]
fn test_extract_writes_rows_and_summary() {
    let data = fixture_dir();
    let out = TempDir::new().unwrap();
    let csv_path = out.path().join("notices.csv");
    let summary_path = out.path().join("summary.json");

    ted_ingest()
        .args(["extract", "2021-03", "2021-03"])
        .arg(&csv_path)
        .arg("45")
        .arg("--data-dir")
        .arg(data.path())
        .arg("--summary")
        .arg(&summary_path)
        .assert()
        .success();

    let rows = read_rows(&std::fs::read(&csv_path).unwrap());
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|row| row["URI_DOC"] == "works"));
    assert_eq!(rows[0]["CPV_ADDITIONAL"], "45210000");
    assert_eq!(rows[1]["CPV_ADDITIONAL"], "");

    let summary: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&summary_path).unwrap()).unwrap();
    assert_eq!(summary["rows"], 2);
    assert_eq!(summary["members"], 3);
    assert_eq!(summary["notices"], 1);
    assert_eq!(summary["excluded"]["excluded_form"], 1);
    assert_eq!(summary["excluded"]["not_in_allow_list"], 1);
    assert_eq!(summary["missing_months"], 0);
}

#[test]
fn test_extract_reads_data_dir_from_env() {
    let data = fixture_dir();

    let output = ted_ingest()
        .env("TED_DATA_DIR", data.path())
        .args(["extract", "2021-03", "2021-03", "-"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let rows = read_rows(&output.stdout);
    assert_eq!(rows.len(), 3);
}

#[test]
fn test_extract_stdout_starts_with_header() {
    let data = fixture_dir();

    ted_ingest()
        .args(["extract", "2021-03", "2021-03", "-", "44"])
        .arg("--data-dir")
        .arg(data.path())
        .assert()
        .success()
        .stdout(predicate::str::starts_with("MONTH,FORM,LG,"))
        .stdout(predicate::str::contains("services"));
}

#[test]
fn test_missing_month_is_not_fatal() {
    let data = fixture_dir();
    let out = TempDir::new().unwrap();
    let csv_path = out.path().join("notices.csv");

    ted_ingest()
        .args(["extract", "2021-03", "2021-04"])
        .arg(&csv_path)
        .arg("--data-dir")
        .arg(data.path())
        .assert()
        .success();

    assert_eq!(read_rows(&std::fs::read(&csv_path).unwrap()).len(), 3);
}

#[test]
fn test_start_before_first_archive_year_fails() {
    let data = TempDir::new().unwrap();

    ted_ingest()
        .args(["extract", "2014-12", "2015-01", "-"])
        .arg("--data-dir")
        .arg(data.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("2015"));
}

#[test]
fn test_reversed_range_fails() {
    ted_ingest()
        .args(["extract", "2021-05", "2021-03", "-"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("greater than or equal to start month"));
}

#[test]
fn test_future_end_fails() {
    ted_ingest()
        .args(["extract", "2021-01", "2999-01", "-"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("future"));
}

#[test]
fn test_invalid_month_is_rejected_by_parser() {
    ted_ingest()
        .args(["extract", "2021-13", "2021-13", "-"])
        .assert()
        .failure()
        .code(2);
}

#[test]
fn test_bad_classification_code_fails() {
    let data = fixture_dir();

    ted_ingest()
        .args(["extract", "2021-03", "2021-03", "-", "4"])
        .arg("--data-dir")
        .arg(data.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("classification code '4'"));
}

#[test]
fn test_corpus_splits_and_dedups_sentences() {
    let data = fixture_dir();
    let out = TempDir::new().unwrap();
    let csv_path = out.path().join("notices.csv");
    let corpus_path = out.path().join("corpus.txt");
    extract_to(data.path(), &csv_path, &[]);

    ted_ingest()
        .arg("corpus")
        .arg(&csv_path)
        .arg(&corpus_path)
        .arg("45")
        .assert()
        .success()
        .stderr(predicate::str::contains("unique sentences"));

    let corpus = std::fs::read_to_string(&corpus_path).unwrap();
    let lines: Vec<&str> = corpus.lines().collect();
    assert_eq!(
        lines,
        vec![
            "Registered in the trade register.",
            "Three comparable projects.",
            "Each worth at least one million euro.",
        ]
    );
}

#[test]
fn test_corpus_missing_input_fails() {
    let out = TempDir::new().unwrap();

    ted_ingest()
        .arg("corpus")
        .arg(out.path().join("absent.csv"))
        .arg("-")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to open"));
}
