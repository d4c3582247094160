use dirfuzz_rs::output::{open_sink, write_report, OutputFormat};
use dirfuzz_rs::types::{ScanReport, ScanResult, Summary};
use std::time::Duration;

fn report() -> ScanReport {
    let mut summary = Summary::default();
    summary.record(Duration::from_millis(12), true);
    ScanReport {
        results: vec![ScanResult {
            timestamp: "2024-05-01T10:00:00Z".into(),
            method: "GET".into(),
            url: "http://target.test/admin".into(),
            payload: "admin".into(),
            status_code: 301,
            content_type: String::new(),
            content_length: 0,
            depth: 0,
            elapsed_ms: 12,
        }],
        summary,
        ..ScanReport::default()
    }
}

#[test]
fn csv_file_sink() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.csv");
    {
        let mut sink = open_sink(OutputFormat::Csv, Some(path.as_path())).unwrap();
        write_report(sink.as_mut(), &report()).unwrap();
    }
    let text = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[1], "2024-05-01T10:00:00Z,GET,http://target.test/admin,admin,301,,0");
}

#[test]
fn json_file_sink() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.jsonl");
    {
        let mut sink = open_sink(OutputFormat::Json, Some(path.as_path())).unwrap();
        write_report(sink.as_mut(), &report()).unwrap();
    }
    let text = std::fs::read_to_string(&path).unwrap();
    let last: serde_json::Value = serde_json::from_str(text.lines().last().unwrap()).unwrap();
    assert_eq!(last["summary"]["successful"], 1);
    assert_eq!(last["summary"]["success_rate"], 100.0);
}

#[test]
fn unwritable_path_is_output_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing").join("out.csv");
    assert!(open_sink(OutputFormat::Csv, Some(path.as_path())).is_err());
}
