//! Response filter pipeline.
//!
//! A [`FilterConfig`] is built once from user input and then shared read-only
//! by every worker. Categories are ANDed together, entries within a category
//! are ORed, and the ignore lists veto unconditionally.

use std::fmt;

use memchr::memmem;
use regex::bytes::Regex;
use reqwest::header::HeaderName;

use crate::error::ConfigError;
use crate::types::RequestOutcome;

/// Status-code allow-set made of discrete codes and inclusive ranges.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusFilter {
    codes: Vec<u16>,
    ranges: Vec<(u16, u16)>,
}

impl StatusFilter {
    /// Parse a list such as `200,204,301-303`. Whitespace is ignored and an
    /// empty list yields an empty (unconstrained) filter.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let mut filter = StatusFilter::default();
        for token in split_tokens(raw) {
            if let Some((a, b)) = token.split_once('-') {
                let start = parse_number::<u16>("status", &token, a)?;
                let end = parse_number::<u16>("status", &token, b)?;
                check_order("status", &token, start, end)?;
                filter.ranges.push((start, end));
            } else {
                filter.codes.push(parse_number::<u16>("status", &token, &token)?);
            }
        }
        Ok(filter)
    }

    pub fn from_ranges(ranges: impl IntoIterator<Item = (u16, u16)>) -> Self {
        Self {
            codes: Vec::new(),
            ranges: ranges.into_iter().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty() && self.ranges.is_empty()
    }

    pub fn contains(&self, status: u16) -> bool {
        self.codes.contains(&status)
            || self.ranges.iter().any(|&(lo, hi)| lo <= status && status <= hi)
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .codes
            .iter()
            .map(u16::to_string)
            .chain(self.ranges.iter().map(|(a, b)| format!("{a}-{b}")))
            .collect();
        write!(f, "{}", parts.join(","))
    }
}

/// Content-length allow-ranges. A single number `n` is the range `[n, n]`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SizeFilter {
    ranges: Vec<(u64, u64)>,
}

impl SizeFilter {
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let mut filter = SizeFilter::default();
        for token in split_tokens(raw) {
            let (start, end) = match token.split_once('-') {
                Some((a, b)) => (
                    parse_number::<u64>("size", &token, a)?,
                    parse_number::<u64>("size", &token, b)?,
                ),
                None => {
                    let n = parse_number::<u64>("size", &token, &token)?;
                    (n, n)
                }
            };
            check_order("size", &token, start, end)?;
            filter.ranges.push((start, end));
        }
        Ok(filter)
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn contains(&self, length: u64) -> bool {
        self.ranges.iter().any(|&(lo, hi)| lo <= length && length <= hi)
    }
}

/// `Header-Name: substring` rule. Names compare case-insensitively, values
/// case-sensitively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderRule {
    pub name: HeaderName,
    pub needle: String,
}

impl HeaderRule {
    pub fn parse(rule: &str) -> Result<Self, ConfigError> {
        let (name, needle) = rule
            .split_once(':')
            .ok_or_else(|| ConfigError::InvalidHeader(rule.to_string()))?;
        let name = HeaderName::from_bytes(name.trim().as_bytes())
            .map_err(|_| ConfigError::InvalidHeader(rule.to_string()))?;
        Ok(Self {
            name,
            needle: needle.trim().to_string(),
        })
    }

    fn matches(&self, outcome: &RequestOutcome) -> bool {
        outcome
            .headers
            .get_all(&self.name)
            .iter()
            .any(|v| contains_bytes(v.as_bytes(), self.needle.as_bytes()))
    }
}

/// Pipeline stage that rejected an outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Transport,
    Status,
    Size,
    Header,
    Regex,
    Keyword,
    Ignored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Accepted,
    Rejected(Stage),
}

impl Verdict {
    pub fn is_accepted(self) -> bool {
        matches!(self, Verdict::Accepted)
    }
}

/// All response filters. The default value accepts every response.
#[derive(Debug, Clone, Default)]
pub struct FilterConfig {
    pub status: StatusFilter,
    pub sizes: SizeFilter,
    pub headers: Vec<HeaderRule>,
    pub regexes: Vec<Regex>,
    pub keywords: Vec<String>,
    pub ignore_keywords: Vec<String>,
    pub ignore_regexes: Vec<Regex>,
}

impl FilterConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_status(mut self, status: StatusFilter) -> Self {
        self.status = status;
        self
    }

    pub fn with_sizes(mut self, sizes: SizeFilter) -> Self {
        self.sizes = sizes;
        self
    }

    pub fn with_header_rules<I, S>(mut self, rules: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for rule in rules {
            self.headers.push(HeaderRule::parse(rule.as_ref())?);
        }
        Ok(self)
    }

    pub fn with_regexes<I, S>(mut self, patterns: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.regexes.extend(compile_all(patterns)?);
        Ok(self)
    }

    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.keywords.extend(non_empty(keywords));
        self
    }

    pub fn with_ignore_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.ignore_keywords.extend(non_empty(keywords));
        self
    }

    pub fn with_ignore_regexes<I, S>(mut self, patterns: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.ignore_regexes.extend(compile_all(patterns)?);
        Ok(self)
    }

    /// Run the pipeline. Pure: the same outcome always gets the same verdict.
    pub fn evaluate(&self, outcome: &RequestOutcome) -> Verdict {
        let status = match outcome.status {
            Some(status) if outcome.error.is_none() => status,
            _ => return Verdict::Rejected(Stage::Transport),
        };
        let body = outcome.body.as_slice();

        if !self.status.is_empty() && !self.status.contains(status) {
            return Verdict::Rejected(Stage::Status);
        }
        if !self.sizes.is_empty() && !self.sizes.contains(outcome.content_length) {
            return Verdict::Rejected(Stage::Size);
        }
        if !self.headers.is_empty() && !self.headers.iter().any(|rule| rule.matches(outcome)) {
            return Verdict::Rejected(Stage::Header);
        }
        if !self.regexes.is_empty() && !self.regexes.iter().any(|re| re.is_match(body)) {
            return Verdict::Rejected(Stage::Regex);
        }
        if !self.keywords.is_empty()
            && !self.keywords.iter().any(|k| contains_bytes(body, k.as_bytes()))
        {
            return Verdict::Rejected(Stage::Keyword);
        }
        if self.ignore_keywords.iter().any(|k| contains_bytes(body, k.as_bytes()))
            || self.ignore_regexes.iter().any(|re| re.is_match(body))
        {
            return Verdict::Rejected(Stage::Ignored);
        }
        Verdict::Accepted
    }

    pub fn accepts(&self, outcome: &RequestOutcome) -> bool {
        self.evaluate(outcome).is_accepted()
    }
}

fn split_tokens(raw: &str) -> impl Iterator<Item = String> + '_ {
    raw.split(',')
        .map(|t| t.chars().filter(|c| !c.is_whitespace()).collect::<String>())
        .filter(|t| !t.is_empty())
}

fn parse_number<T: std::str::FromStr>(
    field: &'static str,
    token: &str,
    raw: &str,
) -> Result<T, ConfigError> {
    raw.parse::<T>().map_err(|_| ConfigError::InvalidFilter {
        field,
        token: token.to_string(),
        reason: format!("{raw:?} is not a valid number"),
    })
}

fn check_order<T: PartialOrd + fmt::Display>(
    field: &'static str,
    token: &str,
    start: T,
    end: T,
) -> Result<(), ConfigError> {
    if start > end {
        return Err(ConfigError::InvalidFilter {
            field,
            token: token.to_string(),
            reason: format!("range start {start} is greater than end {end}"),
        });
    }
    Ok(())
}

fn compile_all<I, S>(patterns: I) -> Result<Vec<Regex>, ConfigError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    non_empty(patterns)
        .map(|pattern| match Regex::new(&pattern) {
            Ok(re) => Ok(re),
            Err(source) => Err(ConfigError::InvalidRegex { pattern, source }),
        })
        .collect()
}

fn non_empty<I, S>(items: I) -> impl Iterator<Item = String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    items
        .into_iter()
        .map(|s| s.as_ref().to_string())
        .filter(|s| !s.is_empty())
}

fn contains_bytes(haystack: &[u8], needle: &[u8]) -> bool {
    memmem::find(haystack, needle).is_some()
}
