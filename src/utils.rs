use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::debug;

/// Convert all back-slashes to forward ones. Repository paths always use
/// forward slashes, whatever the platform.
#[must_use]
pub fn forward_slashes(s: &str) -> String {
    s.replace('\\', "/")
}

/// Convert all forward slashes to back ones (legacy tree notation).
#[must_use]
pub fn back_slashes(s: &str) -> String {
    s.replace('/', "\\")
}

/// Double every backslash. The registry format needs escaped separators;
/// applying this to an already escaped string doubles them again.
#[must_use]
pub fn escape_back_slashes(s: &str) -> String {
    s.replace('\\', "\\\\")
}

/// True when the segment carries a file-name pattern.
#[must_use]
pub fn is_wildcard(segment: &str) -> bool {
    segment.contains('*') || segment.contains('?')
}

/// Last slash-separated segment of a repository path.
#[must_use]
pub fn base_name(repo_path: &str) -> &str {
    match repo_path.rfind('/') {
        Some(index) => &repo_path[index + 1..],
        None => repo_path,
    }
}

/// Repository path without its last segment.
#[must_use]
pub fn parent_dir(repo_path: &str) -> &str {
    match repo_path.rfind('/') {
        Some(index) => &repo_path[..index],
        None => repo_path,
    }
}

/// Create `path` and any missing ancestors. Recurses into the parent
/// first, so ancestors are always created before descendants. Returns the
/// directories actually created, in creation order; an already complete
/// tree yields an empty list.
pub fn ensure_dir_exists(path: &Path) -> io::Result<Vec<PathBuf>> {
    let mut created = Vec::new();
    create_missing(path, &mut created)?;
    Ok(created)
}

fn create_missing(path: &Path, created: &mut Vec<PathBuf>) -> io::Result<()> {
    if path.as_os_str().is_empty() || path.is_dir() {
        debug!("Folder exists  : {}", path.display());
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        create_missing(parent, created)?;
    }
    debug!("Creating folder: {}", path.display());
    fs::create_dir(path)?;
    created.push(path.to_path_buf());
    Ok(())
}

pub fn init_logger(verbose: bool) {
    let level = if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    fern::Dispatch::new()
        .format(|out, message, record| match record.level() {
            log::Level::Info => out.finish(format_args!("{message}")),
            log::Level::Warn => out.finish(format_args!("WARNING: {message}")),
            level => out.finish(format_args!("{level}: {message}")),
        })
        .level(level)
        .chain(io::stdout())
        .apply()
        .expect("Failed to initialize logging");
}

#[test]
fn test_slash_conversion_is_total() {
    assert_eq!(forward_slashes(r"a\b\c"), "a/b/c");
    assert_eq!(back_slashes("a/b/c"), r"a\b\c");
    assert!(!forward_slashes(r"x\y/z").contains('\\'));
    assert!(!back_slashes(r"x\y/z").contains('/'));
}

#[test]
fn test_slash_conversion_is_stable() {
    let forward = forward_slashes(r"a\b/c");
    assert_eq!(forward_slashes(&forward), forward);
    let back = back_slashes(r"a\b/c");
    assert_eq!(back_slashes(&back), back);
}

#[test]
fn test_escape_doubles_every_backslash() {
    assert_eq!(escape_back_slashes(r"a\b"), r"a\\b");
    // not a no-op on already escaped input
    assert_eq!(escape_back_slashes(r"a\\b"), r"a\\\\b");
}

#[test]
fn test_repo_path_split() {
    assert_eq!(base_name("a/b/c.txt"), "c.txt");
    assert_eq!(parent_dir("a/b/c.txt"), "a/b");
    assert_eq!(base_name("plain"), "plain");
    assert_eq!(parent_dir("plain"), "plain");
}

#[test]
fn test_wildcard_detection() {
    assert!(is_wildcard("site.*"));
    assert!(is_wildcard("file?.ini"));
    assert!(!is_wildcard("plain.txt"));
}

#[test]
fn test_ensure_dir_creates_parents_first() {
    let root = tempfile::tempdir().unwrap();
    let a = root.path().join("a");
    let b = a.join("b");
    let c = b.join("c");

    let created = ensure_dir_exists(&c).unwrap();
    assert_eq!(created, vec![a, b, c.clone()]);
    assert!(c.is_dir());
}

#[test]
fn test_ensure_dir_is_idempotent() {
    let root = tempfile::tempdir().unwrap();
    let path = root.path().join("x").join("y");

    assert_eq!(ensure_dir_exists(&path).unwrap().len(), 2);
    assert!(ensure_dir_exists(&path).unwrap().is_empty());
}
