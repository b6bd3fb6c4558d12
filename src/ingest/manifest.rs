//! The per-destination checksum manifest.
//!
//! Plain `sha256sum` format: a 64-character hex digest, two spaces, and the
//! path relative to the `Movies` directory. Lines are kept sorted by path
//! and each path appears once.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use ripvault_common::checksum::is_sha256_hex;
use ripvault_common::{Error, Result};

/// Hex characters in a SHA-256 digest.
const DIGEST_LEN: usize = 64;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    /// Path to digest.
    entries: BTreeMap<String, String>,
}

impl Manifest {
    /// Parse manifest text. Binary-mode lines (`digest *path`) are accepted.
    pub fn parse(text: &str) -> Result<Self> {
        let mut entries = BTreeMap::new();
        for (n, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            // The digest is fixed width; the path may contain anything.
            let (digest, path) = line
                .get(..DIGEST_LEN)
                .zip(line.get(DIGEST_LEN..))
                .and_then(|(digest, rest)| {
                    rest.strip_prefix("  ")
                        .or_else(|| rest.strip_prefix(" *"))
                        .map(|path| (digest, path))
                })
                .ok_or_else(|| Error::parse(format!("manifest line {}: missing separator", n + 1)))?;
            if !is_sha256_hex(digest) || path.is_empty() {
                return Err(Error::parse(format!("manifest line {}: malformed entry", n + 1)));
            }
            entries.insert(path.to_string(), digest.to_ascii_lowercase());
        }
        Ok(Self { entries })
    }

    /// Read a manifest file; a missing file is an empty manifest.
    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(text) => Self::parse(&text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Replace `path` atomically with the rendered manifest.
    pub fn save(&self, path: &Path) -> Result<()> {
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(self.render().as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| e.error)?;
        Ok(())
    }

    /// Record `digest` for `path`, returning the digest it replaced.
    pub fn insert(&mut self, path: impl Into<String>, digest: impl Into<String>) -> Option<String> {
        self.entries.insert(path.into(), digest.into())
    }

    pub fn get(&self, path: &str) -> Option<&str> {
        self.entries.get(path).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn render(&self) -> String {
        self.entries
            .iter()
            .map(|(path, digest)| format!("{}  {}\n", digest, path))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn digest(c: char) -> String {
        std::iter::repeat(c).take(64).collect()
    }

    #[test]
    fn test_parse_and_render_sorted() {
        let text = format!(
            "{}  Zulu (2001)/Zulu (2001) - 1080p.mkv\n{} *Alpha (1990)/Alpha (1990) - 4k.mkv\n\n",
            digest('b'),
            digest('A')
        );
        let manifest = Manifest::parse(&text).unwrap();
        assert_eq!(manifest.len(), 2);
        assert_eq!(
            manifest.render(),
            format!(
                "{}  Alpha (1990)/Alpha (1990) - 4k.mkv\n{}  Zulu (2001)/Zulu (2001) - 1080p.mkv\n",
                digest('a'),
                digest('b')
            )
        );
    }

    #[test]
    fn test_insert_replaces_same_path() {
        let mut manifest = Manifest::default();
        assert!(manifest.insert("Foo (1999) - 1080p.mkv", digest('1')).is_none());
        assert_eq!(
            manifest.insert("Foo (1999) - 1080p.mkv", digest('2')),
            Some(digest('1'))
        );
        assert_eq!(manifest.len(), 1);
        assert_eq!(manifest.get("Foo (1999) - 1080p.mkv"), Some(digest('2').as_str()));
    }

    #[test]
    fn test_parse_paths_with_double_spaces() {
        let text = format!(
            "{} *Foo  Bar (1999)/Foo  Bar (1999) - 4k.mkv\n{}  Two  Spaces (2001) - 1080p.mkv\n",
            digest('a'),
            digest('b')
        );
        let manifest = Manifest::parse(&text).unwrap();
        assert_eq!(
            manifest.get("Foo  Bar (1999)/Foo  Bar (1999) - 4k.mkv"),
            Some(digest('a').as_str())
        );
        assert_eq!(
            manifest.get("Two  Spaces (2001) - 1080p.mkv"),
            Some(digest('b').as_str())
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(Manifest::parse("not a manifest\n").is_err());
        assert!(Manifest::parse("abc  short-digest.mkv\n").is_err());
        assert!(Manifest::parse(&format!("{}  \n", digest('c'))).is_err());
    }

    #[test]
    fn test_load_missing_and_save() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Movies.sha256");
        let mut manifest = Manifest::load(&path).unwrap();
        assert!(manifest.is_empty());

        manifest.insert("b.mkv", digest('b'));
        manifest.insert("a.mkv", digest('a'));
        manifest.save(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with(&format!("{}  a.mkv\n", digest('a'))));
        assert_eq!(Manifest::load(&path).unwrap(), manifest);
    }
}
