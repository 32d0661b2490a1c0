use std::fs::File;
use std::io::Write;

use capscale_config::{SessionRow, load_session_csv};
use rstest::rstest;
use tempfile::tempdir;

fn write_csv(lines: &[&str]) -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("session.csv");
    let mut f = File::create(&path).unwrap();
    for l in lines {
        writeln!(f, "{l}").unwrap();
    }
    (dir, path)
}

#[rstest]
fn loads_rows_in_order() {
    let (_dir, path) = write_csv(&[
        "real_weight_g,adc_raw,tare",
        "0,1000,1000",
        "100.5,1200,1000",
        "200, 1400, 1000",
    ]);
    let rows = load_session_csv(&path).unwrap();
    assert_eq!(
        rows,
        vec![
            SessionRow {
                real_weight_g: 0.0,
                adc_raw: 1000,
                tare: 1000
            },
            SessionRow {
                real_weight_g: 100.5,
                adc_raw: 1200,
                tare: 1000
            },
            SessionRow {
                real_weight_g: 200.0,
                adc_raw: 1400,
                tare: 1000
            },
        ]
    );
}

#[rstest]
fn wrong_headers_error() {
    let (_dir, path) = write_csv(&["weight,raw,tare", "0,1000,1000"]);
    let err = load_session_csv(&path).expect_err("should error on bad headers");
    assert!(format!("{err}").contains("headers 'real_weight_g,adc_raw,tare'"));
}

#[rstest]
fn non_numeric_row_names_the_line() {
    let (_dir, path) = write_csv(&["real_weight_g,adc_raw,tare", "0,1000,1000", "abc,1200,1000"]);
    let err = load_session_csv(&path).expect_err("should error on non-numeric");
    assert!(format!("{err}").contains("row 3"));
}

#[rstest]
#[case("-5,1200,1000")]
#[case("NaN,1200,1000")]
fn invalid_weights_are_rejected(#[case] row: &str) {
    let (_dir, path) = write_csv(&["real_weight_g,adc_raw,tare", row]);
    let err = load_session_csv(&path).expect_err("should reject weight");
    assert!(format!("{err}").contains("real_weight_g"));
}

#[rstest]
fn header_only_is_an_error() {
    let (_dir, path) = write_csv(&["real_weight_g,adc_raw,tare"]);
    let err = load_session_csv(&path).expect_err("should reject empty session");
    assert!(format!("{err}").contains("no rows"));
}

#[rstest]
fn missing_file_errors() {
    let dir = tempdir().unwrap();
    let err = load_session_csv(&dir.path().join("nope.csv")).expect_err("missing file");
    assert!(format!("{err}").contains("open session CSV"));
}
