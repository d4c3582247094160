//! Candidate path generation from a wordlist.

use std::sync::Arc;

use clap::ValueEnum;

use crate::types::has_dot_segment;

/// Case transformation applied to each word before extensions are appended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CaseRule {
    /// Word as written in the wordlist.
    Original,
    Lower,
    Upper,
    /// First character upper case, the rest lower case.
    Capitalize,
}

impl CaseRule {
    pub fn apply(self, word: &str) -> String {
        match self {
            CaseRule::Original => word.to_string(),
            CaseRule::Lower => word.to_lowercase(),
            CaseRule::Upper => word.to_uppercase(),
            CaseRule::Capitalize => {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                    None => String::new(),
                }
            }
        }
    }
}

/// Split a comma-separated extension list, adding a leading `.` where missing.
///
/// `"php, .html,,txt"` becomes `[".php", ".html", ".txt"]`.
pub fn parse_extension_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|e| !e.is_empty() && *e != ".")
        .map(normalize_extension)
        .collect()
}

fn normalize_extension(ext: &str) -> String {
    if ext.starts_with('.') {
        ext.to_string()
    } else {
        format!(".{ext}")
    }
}

/// Immutable, cheaply clonable description of the candidate space.
///
/// Every call to [`CandidateGenerator::iter`] restarts from the first word, so
/// the same generator serves the initial scan and every recursive re-expansion.
#[derive(Debug, Clone)]
pub struct CandidateGenerator {
    words: Arc<[String]>,
    extensions: Arc<[String]>,
    cases: Arc<[CaseRule]>,
    ignored_extensions: Arc<[String]>,
}

impl CandidateGenerator {
    /// Words containing a `.` or `..` path segment are dropped.
    pub fn new(words: Vec<String>) -> Self {
        let words: Vec<String> = words.into_iter().filter(|w| !has_dot_segment(w)).collect();
        Self {
            words: words.into(),
            extensions: Arc::from(Vec::new()),
            cases: Arc::from(vec![CaseRule::Original]),
            ignored_extensions: Arc::from(Vec::new()),
        }
    }

    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.extensions = normalize_all(extensions).into();
        self
    }

    /// An empty list means words are used as written.
    pub fn with_cases(mut self, cases: Vec<CaseRule>) -> Self {
        self.cases = if cases.is_empty() {
            Arc::from(vec![CaseRule::Original])
        } else {
            cases.into()
        };
        self
    }

    /// Candidates ending in any of these extensions are never produced.
    pub fn with_ignored_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.ignored_extensions = normalize_all(extensions)
            .into_iter()
            .map(|e| e.to_ascii_lowercase())
            .collect::<Vec<_>>()
            .into();
        self
    }

    pub fn word_count(&self) -> usize {
        self.words.len()
    }

    /// Number of candidates one pass yields before ignored extensions are removed.
    pub fn len_hint(&self) -> usize {
        self.words.len() * self.cases.len() * (1 + self.extensions.len())
    }

    pub fn iter(&self) -> Candidates {
        Candidates {
            generator: self.clone(),
            word: 0,
            case: 0,
            ext: 0,
        }
    }

    fn is_ignored(&self, candidate: &str) -> bool {
        if self.ignored_extensions.is_empty() {
            return false;
        }
        let lower = candidate.to_ascii_lowercase();
        self.ignored_extensions.iter().any(|e| lower.ends_with(e.as_str()))
    }
}

fn normalize_all<I, S>(extensions: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    extensions
        .into_iter()
        .map(|e| e.as_ref().trim().to_string())
        .filter(|e| !e.is_empty() && e != ".")
        .map(|e| normalize_extension(&e))
        .collect()
}

/// Lazy iterator over `word × case × (bare + extensions)`.
#[derive(Debug, Clone)]
pub struct Candidates {
    generator: CandidateGenerator,
    word: usize,
    case: usize,
    ext: usize,
}

impl Candidates {
    fn advance(&mut self) {
        self.ext += 1;
        if self.ext > self.generator.extensions.len() {
            self.ext = 0;
            self.case += 1;
            if self.case >= self.generator.cases.len() {
                self.case = 0;
                self.word += 1;
            }
        }
    }
}

impl Iterator for Candidates {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        loop {
            let word = self.generator.words.get(self.word)?;
            let mut candidate = self.generator.cases[self.case].apply(word);
            if self.ext > 0 {
                candidate.push_str(&self.generator.extensions[self.ext - 1]);
            }
            self.advance();
            if !self.generator.is_ignored(&candidate) {
                return Some(candidate);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn bare_word_then_each_extension() {
        let gen = CandidateGenerator::new(words(&["admin", "backup"])).with_extensions([".php", "html"]);
        let out: Vec<String> = gen.iter().collect();
        assert_eq!(
            out,
            vec!["admin", "admin.php", "admin.html", "backup", "backup.php", "backup.html"]
        );
    }

    #[test]
    fn dot_segment_words_are_dropped() {
        let gen = CandidateGenerator::new(words(&[".", "admin", "..", "../etc", ".git"]));
        assert_eq!(gen.word_count(), 2);
        assert_eq!(gen.iter().collect::<Vec<_>>(), vec!["admin", ".git"]);
    }

    #[test]
    fn iteration_is_restartable() {
        let gen = CandidateGenerator::new(words(&["a", "b"])).with_extensions(["x"]);
        let first: Vec<String> = gen.iter().collect();
        let second: Vec<String> = gen.iter().collect();
        assert_eq!(first, second);
        assert_eq!(first.len(), gen.len_hint());
    }

    #[test]
    fn case_variants_multiply_candidates() {
        let gen = CandidateGenerator::new(words(&["Admin"]))
            .with_cases(vec![CaseRule::Original, CaseRule::Upper, CaseRule::Lower])
            .with_extensions(["php"]);
        let out: Vec<String> = gen.iter().collect();
        assert_eq!(
            out,
            vec!["Admin", "Admin.php", "ADMIN", "ADMIN.php", "admin", "admin.php"]
        );
    }

    #[test]
    fn capitalize_lowercases_tail() {
        assert_eq!(CaseRule::Capitalize.apply("aDMIN"), "Admin");
        assert_eq!(CaseRule::Capitalize.apply(""), "");
    }

    #[test]
    fn ignored_extensions_are_skipped() {
        let gen = CandidateGenerator::new(words(&["logo.png", "index"]))
            .with_extensions(["png", "php"])
            .with_ignored_extensions([".PNG"]);
        let out: Vec<String> = gen.iter().collect();
        assert_eq!(out, vec!["logo.png.php", "index", "index.php"]);
    }

    #[test]
    fn extension_list_parsing() {
        assert_eq!(parse_extension_list("php, .html,,txt"), vec![".php", ".html", ".txt"]);
        assert!(parse_extension_list("").is_empty());
    }
}
