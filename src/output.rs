//! Result persistence: CSV table or JSON lines.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use clap::ValueEnum;
use serde_json::json;

use crate::error::OutputError;
use crate::types::{ScanReport, ScanResult, SummaryRecord};

pub const CSV_HEADER: [&str; 7] = [
    "Time",
    "Method",
    "URL",
    "Payload",
    "Status",
    "Content-Type",
    "Content-Length",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Csv,
    Json,
}

/// Destination for accepted results and the terminal summary.
pub trait OutputSink {
    fn write_result(&mut self, result: &ScanResult) -> Result<(), OutputError>;
    fn write_summary(&mut self, summary: &SummaryRecord) -> Result<(), OutputError>;
    fn finish(&mut self) -> Result<(), OutputError>;
}

/// Row-oriented sink with a fixed header row. The summary is not part of the
/// table.
pub struct CsvSink<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> CsvSink<W> {
    pub fn new(inner: W) -> Result<Self, OutputError> {
        let mut writer = csv::Writer::from_writer(inner);
        writer.write_record(CSV_HEADER)?;
        Ok(Self { writer })
    }
}

impl<W: Write> OutputSink for CsvSink<W> {
    fn write_result(&mut self, result: &ScanResult) -> Result<(), OutputError> {
        let status = result.status_code.to_string();
        let length = result.content_length.to_string();
        self.writer.write_record([
            result.timestamp.as_str(),
            result.method.as_str(),
            result.url.as_str(),
            result.payload.as_str(),
            status.as_str(),
            result.content_type.as_str(),
            length.as_str(),
        ])?;
        Ok(())
    }

    fn write_summary(&mut self, _summary: &SummaryRecord) -> Result<(), OutputError> {
        Ok(())
    }

    fn finish(&mut self) -> Result<(), OutputError> {
        self.writer.flush()?;
        Ok(())
    }
}

/// One JSON object per line, closed by a `{"summary": {...}}` line.
pub struct JsonLinesSink<W: Write> {
    writer: W,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

impl<W: Write> OutputSink for JsonLinesSink<W> {
    fn write_result(&mut self, result: &ScanResult) -> Result<(), OutputError> {
        serde_json::to_writer(&mut self.writer, result)?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }

    fn write_summary(&mut self, summary: &SummaryRecord) -> Result<(), OutputError> {
        serde_json::to_writer(&mut self.writer, &json!({ "summary": summary }))?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), OutputError> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Open a sink writing to `path`, or to stdout when `path` is `None` or `-`.
pub fn open_sink(format: OutputFormat, path: Option<&Path>) -> Result<Box<dyn OutputSink>, OutputError> {
    let writer: Box<dyn Write> = match path {
        Some(p) if p != Path::new("-") => Box::new(BufWriter::new(File::create(p)?)),
        _ => Box::new(io::stdout().lock()),
    };
    Ok(match format {
        OutputFormat::Csv => Box::new(CsvSink::new(writer)?),
        OutputFormat::Json => Box::new(JsonLinesSink::new(writer)),
    })
}

/// Write every result, then the summary, then flush.
pub fn write_report(sink: &mut dyn OutputSink, report: &ScanReport) -> Result<(), OutputError> {
    for result in &report.results {
        sink.write_result(result)?;
    }
    sink.write_summary(&SummaryRecord::from(&report.summary))?;
    sink.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Summary;
    use std::time::Duration;

    fn report() -> ScanReport {
        let mut summary = Summary::default();
        summary.record(Duration::from_millis(10), true);
        summary.record(Duration::from_millis(30), false);
        ScanReport {
            results: vec![ScanResult {
                timestamp: "2024-01-01T00:00:00Z".into(),
                method: "GET".into(),
                url: "http://t.test/a,b".into(),
                payload: "a,b".into(),
                status_code: 200,
                content_type: "text/html".into(),
                content_length: 42,
                depth: 0,
                elapsed_ms: 10,
            }],
            summary,
            ..ScanReport::default()
        }
    }

    #[test]
    fn csv_has_header_and_quotes_fields() {
        let mut buf = Vec::new();
        {
            let mut sink = CsvSink::new(&mut buf).unwrap();
            write_report(&mut sink, &report()).unwrap();
        }
        let text = String::from_utf8(buf).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("Time,Method,URL,Payload,Status,Content-Type,Content-Length"));
        assert_eq!(
            lines.next(),
            Some("2024-01-01T00:00:00Z,GET,\"http://t.test/a,b\",\"a,b\",200,text/html,42")
        );
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn json_lines_end_with_summary() {
        let mut buf = Vec::new();
        {
            let mut sink = JsonLinesSink::new(&mut buf);
            write_report(&mut sink, &report()).unwrap();
        }
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<serde_json::Value> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["status_code"], 200);
        assert_eq!(lines[1]["summary"]["total"], 2);
        assert_eq!(lines[1]["summary"]["failed"], 1);
        assert_eq!(lines[1]["summary"]["average_time"], 20);
        assert_eq!(lines[1]["summary"]["fastest_time"], 10);
    }
}
