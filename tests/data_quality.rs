use livedash::data::{analyze_csv, default_manifest_path, file_sha256, validate_schema, REQUIRED_COLUMNS};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write_csv(path: &Path, header: &[&str], rows: &[&str]) {
    let mut out = String::new();
    out.push_str(&header.join(","));
    out.push('\n');
    for row in rows {
        out.push_str(row);
        out.push('\n');
    }
    fs::write(path, out).unwrap();
}

#[test]
fn schema_accepts_good_header() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("good.csv");
    write_csv(&path, &REQUIRED_COLUMNS, &["30,100,admin.,married"]);
    let report = validate_schema(&path).unwrap();
    assert!(report.ok);
    assert!(report.missing.is_empty());
}

#[test]
fn schema_lists_missing_columns() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bad.csv");
    write_csv(&path, &["age", "job", "education"], &["30,admin.,primary"]);
    let report = validate_schema(&path).unwrap();
    assert!(!report.ok);
    assert_eq!(report.missing, vec!["balance", "marital"]);
}

#[test]
fn analyze_counts_bad_rows_without_failing() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("mixed.csv");
    write_csv(
        &path,
        &["age", "job", "marital", "balance"],
        &[
            "30,admin.,married,100",
            "n/a,admin.,single,50",
            "44,services,married,-10",
        ],
    );
    let (manifest, report) = analyze_csv(&path, 1_700_000_000).unwrap();
    assert_eq!(manifest.row_count, 3);
    assert_eq!(manifest.bad_rows, 1);
    assert_eq!(manifest.jobs, vec!["admin.", "services"]);
    assert_eq!(manifest.generated_at_epoch, 1_700_000_000);
    assert_eq!(report.distinct_jobs, 2);
    assert!(report.warnings.iter().any(|w| w.starts_with("bad_row")));
}

#[test]
fn manifest_hash_matches_file_hash() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bank.csv");
    write_csv(&path, &REQUIRED_COLUMNS, &["30,100,admin.,married", "40,200,admin.,single"]);
    let (manifest, _) = analyze_csv(&path, 0).unwrap();
    assert_eq!(manifest.hash_sha256, file_sha256(&path).unwrap());
    assert_eq!(default_manifest_path(&path), dir.path().join("bank.csv.manifest.json"));
}
