use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::Options;
use crate::exec::CommandLine;
use crate::utils::{forward_slashes, parent_dir};

/// Which version-control client stages repository paths. Resolved once
/// per process.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VcsKind {
    Svn,
    Cvs,
}

/// Capability set shared by both backends. Every operation builds the
/// command that stages a repository path into a local target directory;
/// nothing here executes.
pub trait VcsClient {
    /// Stage a single repository file path.
    fn checkout_path(&self, repo_path: &str, target: &Path) -> CommandLine;
    /// Stage the top level of a repository directory, no recursion.
    fn checkout_dir_top(&self, repo_dir: &str, target: &Path) -> CommandLine;
    /// Stage a repository directory with its whole subtree.
    fn checkout_dir_recursive(&self, repo_dir: &str, target: &Path) -> CommandLine;
}

pub struct SvnClient;

pub struct CvsClient;

impl VcsClient for SvnClient {
    fn checkout_path(&self, repo_path: &str, target: &Path) -> CommandLine {
        // svn has no single-file checkout; stage the containing
        // directory without recursion instead.
        self.checkout_dir_top(parent_dir(repo_path), target)
    }

    fn checkout_dir_top(&self, repo_dir: &str, target: &Path) -> CommandLine {
        CommandLine::new("svn")
            .arg("checkout")
            .arg("-N")
            .arg(forward_slashes(repo_dir))
            .arg(target)
    }

    fn checkout_dir_recursive(&self, repo_dir: &str, target: &Path) -> CommandLine {
        CommandLine::new("svn")
            .arg("checkout")
            .arg(forward_slashes(repo_dir))
            .arg(target)
    }
}

impl VcsClient for CvsClient {
    fn checkout_path(&self, repo_path: &str, target: &Path) -> CommandLine {
        CommandLine::new("cvs")
            .arg("checkout")
            .arg("-d")
            .arg(target)
            .arg(forward_slashes(repo_path))
    }

    fn checkout_dir_top(&self, repo_dir: &str, target: &Path) -> CommandLine {
        CommandLine::new("cvs")
            .arg("checkout")
            .arg("-l")
            .arg("-d")
            .arg(target)
            .arg(forward_slashes(repo_dir))
    }

    fn checkout_dir_recursive(&self, repo_dir: &str, target: &Path) -> CommandLine {
        CommandLine::new("cvs")
            .arg("checkout")
            .arg("-d")
            .arg(target)
            .arg(forward_slashes(repo_dir))
    }
}

#[must_use]
pub fn client_for(kind: VcsKind) -> Box<dyn VcsClient> {
    match kind {
        VcsKind::Svn => Box::new(SvnClient),
        VcsKind::Cvs => Box::new(CvsClient),
    }
}

/// Repository root for the active backend. Always forward slashes.
#[must_use]
pub fn repository_root(options: &Options) -> String {
    match options.vcs {
        VcsKind::Svn => format!("{}{}", options.repository, options.branch),
        VcsKind::Cvs => options.cvs_root.clone(),
    }
}

#[test]
fn test_svn_capabilities() {
    let client = SvnClient;
    let target = Path::new("temp");
    assert_eq!(
        client.checkout_path("repo/dir/file.ini", target).render(),
        "svn checkout -N repo/dir temp"
    );
    assert_eq!(
        client.checkout_dir_top("repo/dir", target).render(),
        "svn checkout -N repo/dir temp"
    );
    assert_eq!(
        client.checkout_dir_recursive("repo/dir", target).render(),
        "svn checkout repo/dir temp"
    );
}

#[test]
fn test_cvs_capabilities() {
    let client = CvsClient;
    let target = Path::new("temp");
    assert_eq!(
        client.checkout_path("repo/dir/file.ini", target).render(),
        "cvs checkout -d temp repo/dir/file.ini"
    );
    assert_eq!(
        client.checkout_dir_top("repo/dir", target).render(),
        "cvs checkout -l -d temp repo/dir"
    );
    assert_eq!(
        client.checkout_dir_recursive("repo/dir", target).render(),
        "cvs checkout -d temp repo/dir"
    );
}

#[test]
fn test_backslashes_never_reach_the_repository() {
    let command = SvnClient.checkout_dir_top(r"repo\dir", Path::new("temp"));
    assert_eq!(command.render(), "svn checkout -N repo/dir temp");
}
