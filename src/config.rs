//! Validated scan configuration.
//!
//! [`ScanOptions`] carries user input as already-split collections;
//! [`ScanOptions::build`] turns it into a [`ScanConfig`] or fails with a
//! [`ConfigError`] before anything touches the network.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Method;
use url::Url;

use crate::candidates::{parse_extension_list, CaseRule};
use crate::error::ConfigError;
use crate::filter::{FilterConfig, SizeFilter, StatusFilter};
use crate::queue::DEFAULT_QUEUE_CAPACITY;
use crate::recursion::{RecursionConfig, DEFAULT_MAX_DEPTH};

pub const DEFAULT_THREADS: usize = 20;
/// Worker counts above this are clamped.
pub const MAX_THREADS: usize = 5_000;
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_MAX_BODY_BYTES: usize = 10 * 1024 * 1024;
pub const DEFAULT_USER_AGENT: &str = concat!("dirfuzz-rs/", env!("CARGO_PKG_VERSION"));

const SUPPORTED_METHODS: &[&str] = &["GET", "POST", "PUT", "DELETE", "HEAD", "OPTIONS", "PATCH"];

/// Raw-but-split user input.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub target: String,
    pub use_https: bool,
    pub method: String,
    pub threads: usize,
    pub timeout: Duration,
    /// Comma-separated, e.g. `php,.html`.
    pub extensions: String,
    pub ignored_extensions: Vec<String>,
    pub cases: Vec<CaseRule>,
    pub status_filter: String,
    pub size_filter: String,
    pub header_filters: Vec<String>,
    pub regex_filters: Vec<String>,
    pub keywords: Vec<String>,
    pub ignore_keywords: Vec<String>,
    pub ignore_regexes: Vec<String>,
    pub recursion: bool,
    pub max_depth: usize,
    pub ignored_dirs: Vec<String>,
    pub headers: Vec<String>,
    pub body: Option<String>,
    pub follow_redirects: bool,
    pub insecure: bool,
    pub user_agent: String,
    pub max_body_bytes: usize,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            target: String::new(),
            use_https: false,
            method: "GET".into(),
            threads: DEFAULT_THREADS,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            extensions: String::new(),
            ignored_extensions: Vec::new(),
            cases: Vec::new(),
            status_filter: String::new(),
            size_filter: String::new(),
            header_filters: Vec::new(),
            regex_filters: Vec::new(),
            keywords: Vec::new(),
            ignore_keywords: Vec::new(),
            ignore_regexes: Vec::new(),
            recursion: true,
            max_depth: DEFAULT_MAX_DEPTH,
            ignored_dirs: Vec::new(),
            headers: Vec::new(),
            body: None,
            follow_redirects: false,
            insecure: false,
            user_agent: DEFAULT_USER_AGENT.into(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl ScanOptions {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            ..Self::default()
        }
    }

    pub fn build(self) -> Result<ScanConfig, ConfigError> {
        if self.threads == 0 {
            return Err(ConfigError::Validation {
                field: "threads",
                reason: "must be at least 1".into(),
            });
        }
        if self.timeout.is_zero() {
            return Err(ConfigError::Validation {
                field: "timeout",
                reason: "must be greater than zero".into(),
            });
        }
        let threads = self.threads.min(MAX_THREADS);

        let filters = FilterConfig::new()
            .with_status(StatusFilter::parse(&self.status_filter)?)
            .with_sizes(SizeFilter::parse(&self.size_filter)?)
            .with_header_rules(&self.header_filters)?
            .with_regexes(&self.regex_filters)?
            .with_keywords(&self.keywords)
            .with_ignore_keywords(&self.ignore_keywords)
            .with_ignore_regexes(&self.ignore_regexes)?;

        let recursion = RecursionConfig {
            enabled: self.recursion,
            max_depth: self.max_depth,
            ignored_dirs: self.ignored_dirs,
            ..RecursionConfig::default()
        };

        Ok(ScanConfig {
            target: normalize_target(&self.target, self.use_https)?,
            method: parse_method(&self.method)?,
            threads,
            timeout: self.timeout,
            extensions: parse_extension_list(&self.extensions),
            ignored_extensions: self.ignored_extensions,
            cases: self.cases,
            filters,
            recursion,
            headers: parse_headers(&self.headers)?,
            body: self.body.filter(|b| !b.is_empty()),
            follow_redirects: self.follow_redirects,
            insecure: self.insecure,
            user_agent: self.user_agent,
            max_body_bytes: self.max_body_bytes.max(1),
            queue_capacity: DEFAULT_QUEUE_CAPACITY.max(threads * 4),
        })
    }
}

/// Fully validated configuration consumed by the scanner.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Always ends with `/`.
    pub target: Url,
    pub method: Method,
    pub threads: usize,
    pub timeout: Duration,
    pub extensions: Vec<String>,
    pub ignored_extensions: Vec<String>,
    pub cases: Vec<CaseRule>,
    pub filters: FilterConfig,
    pub recursion: RecursionConfig,
    pub headers: HeaderMap,
    pub body: Option<String>,
    pub follow_redirects: bool,
    pub insecure: bool,
    pub user_agent: String,
    pub max_body_bytes: usize,
    pub queue_capacity: usize,
}

/// Parse the target, applying the HTTPS toggle and a default scheme.
///
/// Query and fragment are dropped and the path always ends with `/`.
pub fn normalize_target(raw: &str, use_https: bool) -> Result<Url, ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidUrl {
        url: raw.to_string(),
        reason: reason.to_string(),
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(invalid("empty target"));
    }

    let with_scheme = if trimmed.contains("://") {
        trimmed.to_string()
    } else if use_https {
        format!("https://{trimmed}")
    } else {
        format!("http://{trimmed}")
    };

    let mut url = Url::parse(&with_scheme).map_err(|e| invalid(&e.to_string()))?;
    match url.scheme() {
        "http" if use_https => url
            .set_scheme("https")
            .map_err(|_| invalid("cannot switch scheme to https"))?,
        "http" | "https" => {}
        other => return Err(invalid(&format!("unsupported scheme {other:?}"))),
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(invalid("missing host"));
    }

    url.set_query(None);
    url.set_fragment(None);
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

pub fn parse_method(raw: &str) -> Result<Method, ConfigError> {
    let upper = raw.trim().to_ascii_uppercase();
    if !SUPPORTED_METHODS.contains(&upper.as_str()) {
        return Err(ConfigError::InvalidMethod(raw.to_string()));
    }
    Method::from_bytes(upper.as_bytes()).map_err(|_| ConfigError::InvalidMethod(raw.to_string()))
}

/// Parse `Name: value` request headers. Later duplicates are appended.
pub fn parse_headers<S: AsRef<str>>(raw: &[S]) -> Result<HeaderMap, ConfigError> {
    let mut headers = HeaderMap::new();
    for line in raw {
        let line = line.as_ref();
        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| ConfigError::InvalidHeader(line.to_string()))?;
        let name = HeaderName::from_bytes(name.trim().as_bytes())
            .map_err(|_| ConfigError::InvalidHeader(line.to_string()))?;
        let value = HeaderValue::from_str(value.trim())
            .map_err(|_| ConfigError::InvalidHeader(line.to_string()))?;
        headers.append(name, value);
    }
    Ok(headers)
}
