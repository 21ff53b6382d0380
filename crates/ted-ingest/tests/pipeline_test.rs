//! End-to-end extraction tests over fixture archives

mod common;

use common::{read_rows, tar_gz, write_archive, Notice, LEGACY_NS};
use std::collections::HashMap;
use std::io::Cursor;
use ted_common::types::{MonthRange, YearMonth};
use ted_ingest::notice::ExclusionReason;
use ted_ingest::output::{RowWriter, COLUMNS};
use ted_ingest::pipeline::MonthStatus;
use ted_ingest::{CpvFilter, DataDir, ExtractError, Extractor, NoticeArchive, RunSummary};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

fn month(s: &str) -> YearMonth {
    s.parse().unwrap()
}

fn range(start: &str, end: &str) -> MonthRange {
    MonthRange::new(month(start), month(end)).unwrap()
}

fn extractor(codes: &[&str]) -> Extractor<Vec<u8>> {
    Extractor::new(
        CpvFilter::new(codes).unwrap(),
        RowWriter::new(Vec::new()).unwrap(),
    )
}

/// Run one month and return the summary plus parsed rows
fn run_month(
    members: &[(&str, Vec<u8>)],
    codes: &[&str],
) -> (RunSummary, Vec<HashMap<String, String>>) {
    let dir = TempDir::new().unwrap();
    write_archive(dir.path(), "2021-03", members);
    let extractor = extractor(codes);
    let summary = extractor
        .run(&DataDir::new(dir.path()), range("2021-03", "2021-03"))
        .unwrap();
    let rows = read_rows(&extractor.finish().unwrap());
    (summary, rows)
}

fn two_lot_notice() -> Notice {
    Notice::new("F02", "45000000")
        .url_document("https://procurement.example/tender/17")
        .lefti(
            "<SUITABILITY><P>Registered in the trade register.</P></SUITABILITY>\
             <TECHNICAL_CRITERIA_DOC/>",
        )
        .lot(
            r#"<CPV_ADDITIONAL><CPV_CODE CODE="45210000"/></CPV_ADDITIONAL>
               <AC><AC_QUALITY><AC_CRITERION>Technical merit</AC_CRITERION></AC_QUALITY>
               <AC_PRICE/></AC>"#,
        )
        .lot(
            r#"<CPV_ADDITIONAL><CPV_CODE CODE="45000000"/></CPV_ADDITIONAL>
               <CRITERIA_CANDIDATE><P>Five references.</P></CRITERIA_CANDIDATE>"#,
        )
}

#[test]
fn test_two_lot_notice_produces_two_rows() {
    let (summary, rows) = run_month(&[("2021-03/1.xml", two_lot_notice().xml())], &[]);

    assert_eq!(summary.rows, 2);
    assert_eq!(summary.notices, 1);
    assert_eq!(rows.len(), 2);
    for row in &rows {
        assert_eq!(row["MONTH"], "2021-03");
        assert_eq!(row["FORM"], "F02");
        assert_eq!(row["CPV_MAIN"], "45000000");
        assert_eq!(row["CPV2"], "45");
        assert_eq!(row["CPV5"], "45000");
        assert_eq!(row["URL_DOCUMENT"], "['https://procurement.example/tender/17']");
        assert_eq!(row["SUITABILITY"], "['Registered in the trade register.']");
        assert_eq!(row["TECHNICAL_CRITERIA_DOC"], "True");
        assert_eq!(row["ECONOMIC_CRITERIA_DOC"], "False");
    }

    assert_eq!(rows[0]["CPV_ADDITIONAL"], "45210000");
    assert_eq!(rows[0]["AC_PRICE"], "True");
    assert_eq!(rows[0]["AC_QUALITY"], "['Technical merit']");
    assert_eq!(rows[0]["CRITERIA_CANDIDATE_ANY"], "False");
    assert_eq!(rows[0]["CRITERIA_CANDIDATE"], "");

    assert_eq!(rows[1]["CPV_ADDITIONAL"], "");
    assert_eq!(rows[1]["AC_PRICE"], "");
    assert_eq!(rows[1]["AC_QUALITY_ANY"], "");
    assert_eq!(rows[1]["CRITERIA_CANDIDATE"], "['Five references.']");
}

#[test]
fn test_common_columns_identical_across_lots() {
    let (_, rows) = run_month(&[("1.xml", two_lot_notice().xml())], &[]);
    let common: Vec<&str> = COLUMNS
        .iter()
        .map(|c| c.name)
        .take_while(|&name| name != "CPV_ADDITIONAL")
        .collect();
    assert_eq!(common.len(), 25);
    for name in common {
        assert_eq!(rows[0][name], rows[1][name], "{name}");
    }
}

#[test]
fn test_presence_flag_iff_list_non_empty() {
    let (_, rows) = run_month(
        &[
            ("1.xml", two_lot_notice().xml()),
            ("2.xml", Notice::new("F05", "45100000").lefti("").lot("").xml()),
        ],
        &[],
    );
    assert_eq!(rows.len(), 3);
    for row in &rows {
        for column in COLUMNS.iter().filter(|c| c.name.ends_with("_ANY")) {
            let list = &row[column.name.trim_end_matches("_ANY")];
            match row[column.name].as_str() {
                "True" => assert!(list.starts_with("['") || list.starts_with("[\""), "{list}"),
                "False" | "" => assert_eq!(list, "", "{}", column.name),
                other => panic!("unexpected flag {other}"),
            }
        }
    }
}

#[test]
fn test_award_notice_is_excluded_without_error() {
    let award = Notice::new("F03", "45000000").lot("").xml();
    let (summary, rows) = run_month(&[("award.xml", award)], &[]);

    assert!(rows.is_empty());
    assert_eq!(summary.excluded[&ExclusionReason::ExcludedForm], 1);
    assert_eq!(summary.malformed + summary.schema_violations, 0);
}

#[test]
fn test_allow_list_by_division() {
    let (summary, rows) = run_month(
        &[
            ("a.xml", Notice::new("F02", "71000000").lot("").xml()),
            ("b.xml", Notice::new("F02", "45200000").lot("").xml()),
            ("c.xml", Notice::new("F02", "44100000").lot("").xml()),
        ],
        &["45"],
    );

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["CPV_MAIN"], "45200000");
    assert_eq!(summary.excluded[&ExclusionReason::DisallowedSector], 1);
    assert_eq!(summary.excluded[&ExclusionReason::NotInAllowList], 1);
}

#[test]
fn test_unsupported_families_are_excluded() {
    let eforms = Notice::new("F02", "45000000")
        .declare("efext", "http://data.europa.eu/p27/eforms-ubl-extensions/1")
        .lot("")
        .xml();
    let defence = Notice::new("F02", "45000000").namespace(LEGACY_NS).lot("").xml();
    let (summary, rows) = run_month(&[("e.xml", eforms), ("d.xml", defence)], &[]);

    assert!(rows.is_empty());
    assert_eq!(summary.excluded[&ExclusionReason::ExtensionNamespace], 1);
    assert_eq!(summary.excluded[&ExclusionReason::LegacySchema], 1);
}

#[test]
fn test_document_errors_are_skipped() {
    let (summary, rows) = run_month(
        &[
            ("broken.xml", b"<TED_EXPORT><FORM_SECTION>".to_vec()),
            ("no-lots.xml", Notice::new("F02", "45000000").xml()),
            (
                "no-criterion.xml",
                Notice::new("F02", "45000000")
                    .lot("<AC><AC_COST><AC_WEIGHTING>10</AC_WEIGHTING></AC_COST></AC>")
                    .xml(),
            ),
            ("good.xml", Notice::new("F02", "45000000").uri("good").lot("").xml()),
        ],
        &[],
    );

    assert_eq!(summary.members, 4);
    assert_eq!(summary.malformed, 1);
    assert_eq!(summary.schema_violations, 2);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["URI_DOC"], "good");
}

#[test]
fn test_missing_month_is_skipped() {
    let dir = TempDir::new().unwrap();
    write_archive(
        dir.path(),
        "2021-02",
        &[("1.xml", Notice::new("F02", "45000000").lot("").xml())],
    );

    let extractor = extractor(&[]);
    let summary = extractor
        .run(&DataDir::new(dir.path()), range("2021-01", "2021-02"))
        .unwrap();

    assert_eq!(summary.missing_months, 1);
    assert_eq!(summary.months[0].status, MonthStatus::Missing);
    assert_eq!(summary.months[1].status, MonthStatus::Processed);
    assert_eq!(summary.rows, 1);
}

#[test]
fn test_truncated_archive_keeps_earlier_rows() {
    let dir = TempDir::new().unwrap();
    let mut state: u32 = 0x9e37_79b9;
    let filler: Vec<u8> = (0..200_000)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            (state >> 24) as u8
        })
        .collect();
    let data = tar_gz(&[
        ("1.xml", Notice::new("F02", "45000000").lot("").xml()),
        ("2.bin", filler),
    ]);
    std::fs::write(dir.path().join("2021-03.tar.gz"), &data[..data.len() / 2]).unwrap();

    let extractor = extractor(&[]);
    let result = extractor.run(&DataDir::new(dir.path()), range("2021-03", "2021-03"));
    assert!(matches!(result, Err(ExtractError::ArchiveRead { .. })));

    let rows = read_rows(&extractor.finish().unwrap());
    assert_eq!(rows.len(), 1);
}

#[test]
fn test_process_archive_from_reader() {
    let data = tar_gz(&[("1.xml", two_lot_notice().xml())]);
    let mut archive = NoticeArchive::from_reader("memory", Cursor::new(data)).unwrap();
    let extractor = extractor(&[]);

    let report = extractor.process_archive(&mut archive, month("2021-03")).unwrap();
    assert_eq!(report.archive, "memory");
    assert_eq!(report.rows, 2);
    assert!(!report.cancelled);
    assert_eq!(extractor.rows_written().unwrap(), 2);
}

#[test]
fn test_cancelled_run_reads_nothing() {
    let dir = TempDir::new().unwrap();
    write_archive(
        dir.path(),
        "2021-03",
        &[("1.xml", Notice::new("F02", "45000000").lot("").xml())],
    );
    let token = CancellationToken::new();
    token.cancel();

    let extractor = extractor(&[]).with_cancellation(token);
    let summary = extractor
        .run(&DataDir::new(dir.path()), range("2021-03", "2021-03"))
        .unwrap();

    assert!(summary.cancelled);
    assert_eq!(summary.rows, 0);
    assert_eq!(summary.months[0].status, MonthStatus::Cancelled);
}

#[tokio::test]
async fn test_parallel_run_keeps_notice_rows_together() {
    let dir = TempDir::new().unwrap();
    for name in ["2021-01", "2021-02", "2021-03"] {
        let members: Vec<(String, Vec<u8>)> = (0..5)
            .map(|n| {
                let uri = format!("{name}-{n}");
                let notice = Notice::new("F02", "45000000").uri(&uri).lot("").lot("").lot("");
                (format!("{n}.xml"), notice.xml())
            })
            .collect();
        let members: Vec<(&str, Vec<u8>)> =
            members.iter().map(|(n, d)| (n.as_str(), d.clone())).collect();
        write_archive(dir.path(), name, &members);
    }

    let extractor = extractor(&[]);
    let summary = extractor
        .run_parallel(&DataDir::new(dir.path()), range("2021-01", "2021-03"), 3)
        .await
        .unwrap();
    let rows = read_rows(&extractor.finish().unwrap());

    assert_eq!(summary.rows, 45);
    assert_eq!(rows.len(), 45);
    let months: Vec<YearMonth> = summary.months.iter().map(|m| m.month).collect();
    assert_eq!(months, vec![month("2021-01"), month("2021-02"), month("2021-03")]);

    // Each notice's three rows are adjacent
    for chunk in rows.chunks(3) {
        assert!(chunk.iter().all(|row| row["URI_DOC"] == chunk[0]["URI_DOC"]));
    }
}

#[tokio::test]
async fn test_parallel_run_reports_first_error() {
    let dir = TempDir::new().unwrap();
    write_archive(
        dir.path(),
        "2021-01",
        &[("1.xml", Notice::new("F02", "45000000").lot("").xml())],
    );
    std::fs::write(dir.path().join("2021-02.tar.gz"), b"not gzip").unwrap();

    let extractor = extractor(&[]);
    let result = extractor
        .run_parallel(&DataDir::new(dir.path()), range("2021-01", "2021-02"), 1)
        .await;
    assert!(matches!(result, Err(ExtractError::ArchiveRead { .. })));
}
