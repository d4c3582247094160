use std::io::Write;

use dirfuzz_rs::error::ConfigError;
use dirfuzz_rs::wordlist::load_wordlist_from_path;
use flate2::write::GzEncoder;
use flate2::Compression;

#[test]
fn loads_plain_wordlist() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "admin\r\n# note\n\nlogin\n").unwrap();
    let words = load_wordlist_from_path(file.path()).unwrap();
    assert_eq!(words, vec!["admin", "login"]);
}

#[test]
fn loads_gzip_wordlist_by_suffix() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("words.txt.gz");
    let mut enc = GzEncoder::new(std::fs::File::create(&path).unwrap(), Compression::default());
    enc.write_all(b"one\ntwo\n#three\n").unwrap();
    enc.finish().unwrap();

    let words = load_wordlist_from_path(&path).unwrap();
    assert_eq!(words, vec!["one", "two"]);
}

#[test]
fn corrupt_gzip_is_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.gz");
    std::fs::write(&path, b"definitely not gzip").unwrap();

    let err = load_wordlist_from_path(&path).unwrap_err();
    assert!(matches!(err, ConfigError::WordlistRead { .. }));
}
