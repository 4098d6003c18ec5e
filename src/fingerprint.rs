//! Stylesheet fingerprinting for cache-busting.
//!
//! Every stylesheet URL the site emits carries `?v=<hash>`, where the hash
//! covers the bytes of all files in the stylesheet directory. Any edit to
//! any stylesheet changes every versioned URL, so the worker's versioned
//! cache never serves a stale file.

use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FingerprintError {
    #[error("cannot read stylesheet directory {}: {source}", path.display())]
    Dir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("cannot read stylesheet {}: {source}", path.display())]
    File {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Regular files directly inside `dir`, sorted by file name.
pub fn stylesheet_files(dir: &Path) -> Result<Vec<PathBuf>, FingerprintError> {
    let dir_err = |source| FingerprintError::Dir {
        path: dir.to_path_buf(),
        source,
    };
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(dir_err)? {
        let entry = entry.map_err(dir_err)?;
        if entry.file_type().map_err(dir_err)?.is_file() {
            files.push(entry.path());
        }
    }
    // Byte-wise name order, independent of directory iteration order
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// SHA-256 over the concatenated bytes of every stylesheet, as lowercase hex
/// truncated to `len` characters.
///
/// Identical directory contents always give the same hash; changing any byte
/// of any file changes it.
pub fn stylesheet_hash(dir: &Path, len: usize) -> Result<String, FingerprintError> {
    let mut hasher = Sha256::new();
    for path in stylesheet_files(dir)? {
        let bytes = fs::read(&path).map_err(|source| FingerprintError::File {
            path: path.clone(),
            source,
        })?;
        hasher.update(&bytes);
    }
    let mut hex = format!("{:x}", hasher.finalize());
    hex.truncate(len);
    Ok(hex)
}

/// Append the version marker to a URL: `?param=hash`, or `&param=hash` when
/// the URL already has a query string. A `#fragment` stays at the end.
pub fn versioned_url(url: &str, hash: &str, param: &str) -> String {
    let (base, fragment) = match url.split_once('#') {
        Some((base, fragment)) => (base, Some(fragment)),
        None => (url, None),
    };
    let sep = if base.contains('?') { '&' } else { '?' };
    match fragment {
        Some(fragment) => format!("{base}{sep}{param}={hash}#{fragment}"),
        None => format!("{base}{sep}{param}={hash}"),
    }
}

/// Site-absolute URLs for every stylesheet, versioned with `hash`.
///
/// `url_dir` is the directory the stylesheets are served from (e.g. `css`).
pub fn stylesheet_urls(
    dir: &Path,
    url_dir: &str,
    hash: &str,
    param: &str,
) -> Result<Vec<String>, FingerprintError> {
    let url_dir = url_dir.trim_matches('/');
    Ok(stylesheet_files(dir)?
        .iter()
        .filter(|p| p.extension().is_some_and(|e| e == "css"))
        .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        .map(|name| versioned_url(&format!("/{url_dir}/{name}"), hash, param))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn css_dir(files: &[(&str, &str)]) -> TempDir {
        let tmp = TempDir::new().unwrap();
        for (name, content) in files {
            fs::write(tmp.path().join(name), content).unwrap();
        }
        tmp
    }

    #[test]
    fn hash_is_stable_across_runs() {
        let dir = css_dir(&[("a.css", "body{}"), ("b.css", "p{}")]);
        let first = stylesheet_hash(dir.path(), 8).unwrap();
        let second = stylesheet_hash(dir.path(), 8).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 8);
        assert!(first.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn hash_matches_sha256_of_sorted_concatenation() {
        let dir = css_dir(&[("z.css", "zz"), ("a.css", "aa")]);
        let expected = format!("{:x}", Sha256::digest(b"aazz"));
        assert_eq!(stylesheet_hash(dir.path(), 64).unwrap(), expected);
    }

    #[test]
    fn hash_independent_of_creation_order() {
        let one = css_dir(&[("a.css", "A"), ("b.css", "B"), ("c.css", "C")]);
        let two = css_dir(&[("c.css", "C"), ("a.css", "A"), ("b.css", "B")]);
        assert_eq!(
            stylesheet_hash(one.path(), 8).unwrap(),
            stylesheet_hash(two.path(), 8).unwrap()
        );
    }

    #[test]
    fn any_byte_change_changes_hash() {
        let dir = css_dir(&[("style.css", "body { color: red; }")]);
        let before = stylesheet_hash(dir.path(), 8).unwrap();
        fs::write(dir.path().join("style.css"), "body { color: rex; }").unwrap();
        assert_ne!(before, stylesheet_hash(dir.path(), 8).unwrap());
    }

    #[test]
    fn subdirectories_are_ignored() {
        let dir = css_dir(&[("style.css", "x")]);
        let before = stylesheet_hash(dir.path(), 8).unwrap();
        fs::create_dir(dir.path().join("vendor")).unwrap();
        fs::write(dir.path().join("vendor/extra.css"), "y").unwrap();
        assert_eq!(before, stylesheet_hash(dir.path(), 8).unwrap());
    }

    #[test]
    fn empty_dir_hashes_empty_input() {
        let dir = css_dir(&[]);
        let expected = format!("{:x}", Sha256::digest(b""));
        assert_eq!(stylesheet_hash(dir.path(), 8).unwrap(), expected[..8]);
    }

    #[test]
    fn missing_dir_is_error() {
        let tmp = TempDir::new().unwrap();
        let result = stylesheet_hash(&tmp.path().join("css"), 8);
        assert!(matches!(result, Err(FingerprintError::Dir { .. })));
    }

    #[test]
    fn versioned_url_forms() {
        assert_eq!(
            versioned_url("/css/style.css", "abcd1234", "v"),
            "/css/style.css?v=abcd1234"
        );
        assert_eq!(
            versioned_url("/css/style.css?media=print", "abcd1234", "v"),
            "/css/style.css?media=print&v=abcd1234"
        );
        assert_eq!(
            versioned_url("/css/style.css#top", "ab", "rev"),
            "/css/style.css?rev=ab#top"
        );
    }

    #[test]
    fn stylesheet_urls_only_css_sorted() {
        let dir = css_dir(&[
            ("style.css", "s"),
            ("marx.min.css", "m"),
            ("README", "not css"),
        ]);
        let urls = stylesheet_urls(dir.path(), "css", "h", "v").unwrap();
        assert_eq!(urls, vec!["/css/marx.min.css?v=h", "/css/style.css?v=h"]);
    }
}
