//! Workbook-style ingest through the public API.

use std::fs;

use tech_monthly::ingest::{DateEncoding, HeaderRule, IndexSummary, ingest_workbook};
use tech_monthly::io::read_frame_csv;

#[test]
fn title_row_above_header() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("report.csv");
    fs::write(&input, "Ticker Report\ndate,AAPL\n2021-01-15,150.0\n").unwrap();
    let output = dir.path().join("Monthly").join("tech_features_combined.csv");

    let report = ingest_workbook(&input, None, &output).unwrap();
    assert_eq!(report.header.row, 1);
    assert_eq!(report.header.rule, HeaderRule::Token);
    assert_eq!(report.columns, vec!["AAPL"]);
    assert_eq!(report.rows, 1);

    let text = fs::read_to_string(&output).unwrap();
    assert_eq!(text, "date,AAPL\n2021-01-31,150\n");
}

#[test]
fn spreadsheet_serials_become_month_ends() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("serials.csv");
    let mut body = String::from("when,MSFT_ret\n");
    // 44197 = 2021-01-01; one row per ~month.
    for (i, serial) in [44197, 44228, 44256, 44287, 44317, 44348].iter().enumerate() {
        body.push_str(&format!("{serial},{}\n", 0.01 * i as f64));
    }
    fs::write(&input, body).unwrap();
    let output = dir.path().join("out.csv");

    let report = ingest_workbook(&input, None, &output).unwrap();
    match &report.index {
        IndexSummary::Indexed {
            date_column, encoding, ..
        } => {
            assert_eq!(date_column, "when");
            assert_eq!(*encoding, DateEncoding::SpreadsheetSerial);
        }
        other => panic!("expected an index, got {other:?}"),
    }

    let frame = read_frame_csv(&output).unwrap();
    assert_eq!(frame.len(), 6);
    assert_eq!(frame.index[0].to_string(), "2021-01-31");
    assert_eq!(frame.index[5].to_string(), "2021-06-30");
}

#[test]
fn table_without_dates_is_written_unindexed() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("plain.csv");
    fs::write(&input, "name,score\nalpha,1\nbeta,2\n").unwrap();
    let output = dir.path().join("out.csv");

    let report = ingest_workbook(&input, None, &output).unwrap();
    assert!(matches!(report.index, IndexSummary::Unindexed { .. }));
    assert_eq!(fs::read_to_string(&output).unwrap(), "name,score\nalpha,1\nbeta,2\n");
}
