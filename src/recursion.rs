//! Decides when an accepted hit is a directory worth expanding.

use url::Url;

use crate::candidates::CandidateGenerator;
use crate::filter::StatusFilter;
use crate::types::RequestOutcome;

pub const DEFAULT_MAX_DEPTH: usize = 3;

#[derive(Debug, Clone)]
pub struct RecursionConfig {
    pub enabled: bool,
    /// Jobs are never created deeper than this. Depth 0 is the target itself.
    pub max_depth: usize,
    /// Statuses that mark a hit as directory-like.
    pub statuses: StatusFilter,
    /// Directory names never expanded, compared without surrounding slashes.
    pub ignored_dirs: Vec<String>,
}

impl Default for RecursionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_depth: DEFAULT_MAX_DEPTH,
            statuses: StatusFilter::from_ranges([(200, 299), (300, 399)]),
            ignored_dirs: Vec::new(),
        }
    }
}

impl RecursionConfig {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct RecursionController {
    config: RecursionConfig,
    generator: CandidateGenerator,
}

impl RecursionController {
    pub fn new(config: RecursionConfig, generator: CandidateGenerator) -> Self {
        Self { config, generator }
    }

    pub fn generator(&self) -> &CandidateGenerator {
        &self.generator
    }

    /// Base URL and depth for re-expanding an accepted outcome, if it qualifies.
    ///
    /// Jobs already marked `expanded` never qualify: their directory was
    /// queued by the hit that produced them.
    pub fn next_base(&self, outcome: &RequestOutcome) -> Option<(Url, usize)> {
        let job = &outcome.job;
        if !self.config.enabled || job.expanded || job.depth >= self.config.max_depth {
            return None;
        }
        let status = outcome.status?;
        if !self.config.statuses.contains(status) || looks_like_file(&job.candidate) {
            return None;
        }
        let dir = job.candidate.trim_matches('/');
        if dir.is_empty() || self.is_ignored_dir(dir) {
            return None;
        }

        let mut base = job.target_url()?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        base.set_query(None);
        base.set_fragment(None);
        Some((base, job.depth + 1))
    }

    fn is_ignored_dir(&self, dir: &str) -> bool {
        self.config
            .ignored_dirs
            .iter()
            .any(|ignored| ignored.trim_matches('/') == dir)
    }
}

/// A candidate whose last path segment carries an extension (`index.php`) is
/// treated as a file. Trailing slashes and dot-prefixed names (`.git`) are not.
pub fn looks_like_file(candidate: &str) -> bool {
    if candidate.ends_with('/') {
        return false;
    }
    let last = candidate.rsplit('/').next().unwrap_or(candidate);
    last.char_indices().any(|(i, c)| c == '.' && i > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ScanJob;
    use reqwest::header::HeaderMap;
    use std::time::Duration;

    fn hit(candidate: &str, status: u16, depth: usize) -> RequestOutcome {
        let job = ScanJob::new(Url::parse("http://t.test/base/").unwrap(), candidate, depth);
        RequestOutcome::response(
            job,
            String::new(),
            status,
            0,
            HeaderMap::new(),
            Vec::new(),
            Duration::ZERO,
        )
    }

    fn controller(config: RecursionConfig) -> RecursionController {
        RecursionController::new(config, CandidateGenerator::new(vec!["x".into()]))
    }

    #[test]
    fn directory_hit_expands_one_level_deeper() {
        let c = controller(RecursionConfig::default());
        let (base, depth) = c.next_base(&hit("images", 301, 0)).unwrap();
        assert_eq!(base.as_str(), "http://t.test/base/images/");
        assert_eq!(depth, 1);
    }

    #[test]
    fn disabled_never_expands() {
        let c = controller(RecursionConfig::disabled());
        assert!(c.next_base(&hit("images/", 301, 0)).is_none());
    }

    #[test]
    fn depth_cap_is_respected() {
        let c = controller(RecursionConfig {
            max_depth: 2,
            ..RecursionConfig::default()
        });
        assert!(c.next_base(&hit("a", 200, 1)).is_some());
        assert!(c.next_base(&hit("a", 200, 2)).is_none());
    }

    #[test]
    fn files_and_non_directory_statuses_are_skipped() {
        let c = controller(RecursionConfig::default());
        assert!(c.next_base(&hit("index.php", 200, 0)).is_none());
        assert!(c.next_base(&hit("admin", 403, 0)).is_none());
    }

    #[test]
    fn ignored_dirs_are_skipped() {
        let c = controller(RecursionConfig {
            ignored_dirs: vec!["/cgi-bin/".into()],
            ..RecursionConfig::default()
        });
        assert!(c.next_base(&hit("cgi-bin", 200, 0)).is_none());
        assert!(c.next_base(&hit("cgi", 200, 0)).is_some());
    }

    #[test]
    fn directory_jobs_are_not_expanded_again() {
        let c = controller(RecursionConfig::default());
        let mut outcome = hit("images/", 200, 1);
        assert!(c.next_base(&outcome).is_some());
        outcome.job = ScanJob::directory(outcome.job.base_url.clone(), "images", 1);
        assert!(c.next_base(&outcome).is_none());
    }

    #[test]
    fn dot_segments_never_expand() {
        let c = controller(RecursionConfig::default());
        assert!(c.next_base(&hit(".", 200, 0)).is_none());
        assert!(c.next_base(&hit("..", 301, 0)).is_none());
    }

    #[test]
    fn file_detection() {
        assert!(looks_like_file("index.php"));
        assert!(looks_like_file("a/b.txt"));
        assert!(!looks_like_file("images"));
        assert!(!looks_like_file(".git"));
        assert!(!looks_like_file("v1.2/"));
    }
}
