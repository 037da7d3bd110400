//! End-to-end checks from demand files on disk through estimation, CSV export and report.

use std::io::Write;

use course_load_risk::export::{export_file_name, write_csv, CSV_COLUMNS};
use course_load_risk::report::build_report;
use course_load_risk::source::load_snapshot;
use course_load_risk::{
    bucket_risk_for_chart, compute_risk, project_for_export, EstimateError, ExportScope,
    DEFAULT_RISK_THRESHOLD,
};
use tempfile::TempDir;

const HEADER: &str = "course_id,course_code,course_name,sections_planned,cap_per_section,\
forecast_enrollees,qualified_ft_count,qualified_pt_pool,avg_sections_per_ft,\
leave_probability,historical_fill_rate,program_area";

fn write_file(dir: &TempDir, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    path
}

fn term_csv() -> String {
    format!(
        "{HEADER}\n\
         C001,CCPROG1,Computer Programming 1,6,45,260,5,3,1.2,0.18,0.97,Foundations\n\
         C010,CSMODEL,Modeling & Simulation,2,45,100,1,1,1.0,0.40,0.80,Core\n\
         C014,THS-ST2,Thesis Studio 2,2,45,85,1,1,1.0,0.33,0.82,Capstone\n\
         C099,CSNEW,Emerging Topics,1,40,100,0,0,1.0,0.20,0.80,Core\n"
    )
}

#[test]
fn csv_snapshot_flows_through_estimator() {
    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "demand.csv", &term_csv());

    let snapshot = load_snapshot(&path).unwrap();
    assert_eq!(snapshot.courses.len(), 4);
    assert_eq!(snapshot.term_label, "");

    let assessment = compute_risk(&snapshot.courses, DEFAULT_RISK_THRESHOLD).unwrap();
    let at_risk: Vec<&str> = assessment
        .at_risk
        .iter()
        .map(|row| row.record.course_code.as_str())
        .collect();
    assert_eq!(at_risk, vec!["CSMODEL", "CSNEW"]);

    // CSMODEL: 3 required, 0.6 FT + 1 PT -> 1.4 short. CSNEW: 3 required, no staff.
    assert_eq!(assessment.summary.expected_gap, 4.4);
    assert_eq!(assessment.summary.fte_need, 2);

    for row in &assessment.rows {
        assert!(row.gap >= 0.0);
        assert!((0.0..=1.0).contains(&row.risk));
    }
}

#[test]
fn json_payload_keeps_term_label() {
    let dir = TempDir::new().unwrap();
    let json = r#"{
        "ok": true,
        "meta": {"term_label": "AY 2025-2026 T1"},
        "courses": [
            {"course_id":"C008","course_code":"DATALG","course_name":"Data Analytics",
             "sections_planned":3,"cap_per_section":45,"forecast_enrollees":160,
             "qualified_ft_count":2,"qualified_pt_pool":2,"avg_sections_per_ft":1.0,
             "leave_probability":0.40,"historical_fill_rate":0.84,"program_area":"Data"}
        ],
        "generated_at": "2025-08-11T02:00:00Z"
    }"#;
    let path = write_file(&dir, "load-risk.JSON", json);

    let snapshot = load_snapshot(&path).unwrap();
    assert_eq!(snapshot.term_label, "AY 2025-2026 T1");

    let assessment = compute_risk(&snapshot.courses, DEFAULT_RISK_THRESHOLD).unwrap();
    let report = build_report(&snapshot.term_label, &assessment);
    assert!(report.starts_with("# Course Load Risk Report"));
    assert!(report.contains("AY 2025-2026 T1"));
    assert!(report.contains("DATALG"));
}

#[test]
fn export_file_matches_column_contract() {
    let dir = TempDir::new().unwrap();
    let input = write_file(&dir, "demand.csv", &term_csv());
    let snapshot = load_snapshot(&input).unwrap();
    let assessment = compute_risk(&snapshot.courses, DEFAULT_RISK_THRESHOLD).unwrap();

    let date = chrono::NaiveDate::from_ymd_opt(2025, 8, 11).unwrap();
    let out = dir.path().join(export_file_name(ExportScope::All, date));
    let rows = project_for_export(ExportScope::All.select(&assessment));
    write_csv(std::fs::File::create(&out).unwrap(), &rows).unwrap();

    let mut reader = csv::Reader::from_path(&out).unwrap();
    let headers: Vec<String> = reader.headers().unwrap().iter().map(String::from).collect();
    assert_eq!(headers, CSV_COLUMNS.to_vec());

    let records: Vec<csv::StringRecord> = reader.records().map(Result::unwrap).collect();
    assert_eq!(records.len(), 4);
    let modeling = &records[1];
    assert_eq!(&modeling[0], "CSMODEL");
    assert_eq!(&modeling[3], "3");
    assert_eq!(&modeling[5], "0.6");
    assert_eq!(&modeling[7], "1.4");
    assert_eq!(&modeling[8], "80");
    assert_eq!(&modeling[9], "40");
    assert_eq!(&modeling[10], "61");
}

#[test]
fn chart_buckets_cover_every_row() {
    let dir = TempDir::new().unwrap();
    let input = write_file(&dir, "demand.csv", &term_csv());
    let snapshot = load_snapshot(&input).unwrap();
    let assessment = compute_risk(&snapshot.courses, DEFAULT_RISK_THRESHOLD).unwrap();

    let buckets = bucket_risk_for_chart(&assessment.rows);
    let labels: Vec<&str> = buckets.iter().map(|b| b.label.as_str()).collect();
    assert_eq!(labels, vec!["CCPROG1", "CSMODEL", "THS-ST2", "CSNEW"]);
    assert_eq!(buckets[0].percent, 0);
}

#[test]
fn invalid_row_aborts_the_whole_batch() {
    let dir = TempDir::new().unwrap();
    let csv = format!(
        "{HEADER}\n\
         C001,CCPROG1,Computer Programming 1,6,45,260,5,3,1.2,0.18,0.97,Foundations\n\
         C002,BROKEN,No Capacity,1,0,30,1,1,1.0,0.10,0.90,Core\n"
    );
    let path = write_file(&dir, "demand.csv", &csv);
    let snapshot = load_snapshot(&path).unwrap();

    match compute_risk(&snapshot.courses, DEFAULT_RISK_THRESHOLD) {
        Err(EstimateError::InvalidInput { course_id, .. }) => assert_eq!(course_id, "C002"),
        Ok(_) => panic!("expected invalid input error"),
    }
}

#[test]
fn missing_file_reports_path() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("absent.csv");
    let err = load_snapshot(&path).unwrap_err();
    assert!(err.to_string().contains("absent.csv"));
}
