use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use flate2::read::GzDecoder;

use crate::error::ConfigError;

/// Parse wordlist content into an ordered list of words.
///
/// Each line is trimmed (which also strips a trailing `\r`). Blank lines and
/// lines starting with `#` are skipped. Duplicates are kept.
pub fn parse_wordlist_str(s: &str) -> Vec<String> {
    s.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

/// Load a wordlist from disk, transparently decompressing `*.gz` files.
pub fn load_wordlist_from_path(path: impl AsRef<Path>) -> Result<Vec<String>, ConfigError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| ConfigError::WordlistOpen {
        path: path.to_path_buf(),
        source,
    })?;

    let mut reader: Box<dyn Read> = if is_gzip_path(path) {
        Box::new(GzDecoder::new(BufReader::new(file)))
    } else {
        Box::new(BufReader::new(file))
    };

    let mut raw = Vec::new();
    reader
        .read_to_end(&mut raw)
        .map_err(|source| ConfigError::WordlistRead {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(parse_wordlist_str(&String::from_utf8_lossy(&raw)))
}

fn is_gzip_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("gz"))
}
