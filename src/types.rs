use std::time::Duration;

use reqwest::header::{HeaderMap, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use url::Url;

/// One unit of work: a candidate path to request under a base URL.
///
/// The base URL always ends with `/` so that joining a candidate appends to
/// the directory instead of replacing its last segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanJob {
    pub base_url: Url,
    pub candidate: String,
    pub depth: usize,
    /// Set on the trailing-slash request for a directory whose contents are
    /// already queued, so the hit is not expanded a second time.
    pub expanded: bool,
}

impl ScanJob {
    pub fn new(base_url: Url, candidate: impl Into<String>, depth: usize) -> Self {
        Self {
            base_url,
            candidate: candidate.into(),
            depth,
            expanded: false,
        }
    }

    /// Request for the directory `dir` itself (with a trailing `/`) under `base_url`.
    pub fn directory(base_url: Url, dir: &str, depth: usize) -> Self {
        Self {
            base_url,
            candidate: format!("{}/", dir.trim_end_matches('/')),
            depth,
            expanded: true,
        }
    }

    /// Resolve the full request URL for this job.
    ///
    /// Returns `None` when the candidate does not resolve to a URL on the same
    /// origin as the base (e.g. `mailto:x` or an absolute `http://` word), or
    /// when it contains a `.` or `..` segment.
    pub fn target_url(&self) -> Option<Url> {
        if has_dot_segment(&self.candidate) {
            return None;
        }
        self.base_url
            .join(self.candidate.trim_start_matches('/'))
            .ok()
            .filter(|target| target.origin() == self.base_url.origin())
    }
}

/// True when any `/`-separated segment is `.` or `..`, including the
/// percent-encoded `%2e` forms URL resolution also collapses.
pub fn has_dot_segment(candidate: &str) -> bool {
    candidate.split('/').any(|segment| {
        let segment = segment.to_ascii_lowercase().replace("%2e", ".");
        segment == "." || segment == ".."
    })
}

/// Raw result of dispatching one job.
#[derive(Debug, Clone)]
pub struct RequestOutcome {
    pub job: ScanJob,
    pub url: String,
    /// `None` when the request failed at the transport level.
    pub status: Option<u16>,
    pub content_length: u64,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
    pub elapsed: Duration,
    pub error: Option<String>,
}

impl RequestOutcome {
    pub fn response(
        job: ScanJob,
        url: String,
        status: u16,
        content_length: u64,
        headers: HeaderMap,
        body: Vec<u8>,
        elapsed: Duration,
    ) -> Self {
        Self {
            job,
            url,
            status: Some(status),
            content_length,
            headers,
            body,
            elapsed,
            error: None,
        }
    }

    pub fn failure(job: ScanJob, url: String, elapsed: Duration, error: impl Into<String>) -> Self {
        Self {
            job,
            url,
            status: None,
            content_length: 0,
            headers: HeaderMap::new(),
            body: Vec::new(),
            elapsed,
            error: Some(error.into()),
        }
    }

    /// True when a response (of any status) was received.
    pub fn is_response(&self) -> bool {
        self.error.is_none() && self.status.is_some()
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
    }
}

/// An outcome that passed the filter pipeline.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ScanResult {
    pub timestamp: String,
    pub method: String,
    pub url: String,
    pub payload: String,
    pub status_code: u16,
    pub content_type: String,
    pub content_length: u64,
    pub depth: usize,
    pub elapsed_ms: u64,
}

impl ScanResult {
    pub fn from_outcome(outcome: &RequestOutcome, method: &str, timestamp: String) -> Self {
        Self {
            timestamp,
            method: method.to_string(),
            url: outcome.url.clone(),
            payload: outcome.job.candidate.clone(),
            status_code: outcome.status.unwrap_or_default(),
            content_type: outcome.content_type().unwrap_or_default().to_string(),
            content_length: outcome.content_length,
            depth: outcome.job.depth,
            elapsed_ms: outcome.elapsed.as_millis() as u64,
        }
    }
}

/// Aggregate request statistics for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Summary {
    pub total: u64,
    pub successful: u64,
    pub failed: u64,
    pub total_time: Duration,
    pub min_time: Option<Duration>,
    pub max_time: Duration,
}

impl Summary {
    pub fn record(&mut self, elapsed: Duration, success: bool) {
        self.total += 1;
        if success {
            self.successful += 1;
        } else {
            self.failed += 1;
        }
        self.total_time += elapsed;
        self.min_time = Some(self.min_time.map_or(elapsed, |m| m.min(elapsed)));
        self.max_time = self.max_time.max(elapsed);
    }

    /// Percentage of requests that received a response.
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.successful as f64 / self.total as f64 * 100.0
    }

    pub fn average_time(&self) -> Duration {
        if self.total == 0 {
            return Duration::ZERO;
        }
        Duration::from_nanos((self.total_time.as_nanos() / u128::from(self.total)) as u64)
    }

    pub fn fastest_time(&self) -> Duration {
        self.min_time.unwrap_or_default()
    }

    pub fn slowest_time(&self) -> Duration {
        self.max_time
    }
}

/// Terminal summary record handed to output sinks. Times are milliseconds.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SummaryRecord {
    pub total: u64,
    pub successful: u64,
    pub failed: u64,
    pub success_rate: f64,
    pub total_time: u64,
    pub average_time: u64,
    pub fastest_time: u64,
    pub slowest_time: u64,
}

impl From<&Summary> for SummaryRecord {
    fn from(s: &Summary) -> Self {
        Self {
            total: s.total,
            successful: s.successful,
            failed: s.failed,
            success_rate: s.success_rate(),
            total_time: s.total_time.as_millis() as u64,
            average_time: s.average_time().as_millis() as u64,
            fastest_time: s.fastest_time().as_millis() as u64,
            slowest_time: s.slowest_time().as_millis() as u64,
        }
    }
}

/// Everything a finished (or cancelled) scan produced.
#[derive(Debug, Clone, Default)]
pub struct ScanReport {
    pub results: Vec<ScanResult>,
    pub summary: Summary,
    pub elapsed: Duration,
    pub cancelled: bool,
}
