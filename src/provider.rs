use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use thiserror::Error;

use crate::config::Options;
use crate::exec::{self, SetupError};
use crate::shell::native as shell;
use crate::task::Task;
use crate::tree::Tree;
use crate::utils::{base_name, is_wildcard, parent_dir};
use crate::vcs::{client_for, repository_root, VcsClient};

/// Name of the reusable checkout staging directory under the tree root.
const STAGING_DIR: &str = "temp";

#[derive(Error, Debug)]
pub enum FetchError {
    #[error(transparent)]
    Command(#[from] SetupError),
    #[error("bad file pattern {pattern}: {source}")]
    Pattern {
        pattern: String,
        source: glob::PatternError,
    },
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Two-tier source of template files and subtrees: the pre-built toolkit
/// mirror when it has the requested path, the repository otherwise.
pub struct SourceProvider<'a> {
    options: &'a Options,
    vcs: Box<dyn VcsClient>,
    repository: String,
}

/// Scratch checkout area under the tree root. Wiped on creation and
/// again on drop, so a failed copy can't leave stale state behind for
/// the next fetch.
struct Staging {
    path: PathBuf,
}

impl Staging {
    fn prepare(tree_root: &Path) -> Staging {
        let staging = Staging {
            path: tree_root.join(STAGING_DIR),
        };
        staging.remove();
        staging
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn remove(&self) {
        if self.path.exists() {
            let _ = exec::run(&shell::remove_tree(&self.path));
        }
    }
}

impl Drop for Staging {
    fn drop(&mut self) {
        self.remove();
    }
}

impl<'a> SourceProvider<'a> {
    #[must_use]
    pub fn new(options: &'a Options) -> Self {
        SourceProvider {
            vcs: client_for(options.vcs),
            repository: repository_root(options),
            options,
        }
    }

    /// Deliver one repository-relative file (wildcards allowed in the
    /// final segment) into `target_dir`.
    pub fn fetch_file(
        &self,
        task: &Task,
        tree: &Tree,
        rel_path: &str,
        target_dir: &Path,
    ) -> Result<(), FetchError> {
        if self.options.allow_file_copy && self.copy_from_mirror(task, rel_path, target_dir)? {
            return Ok(());
        }

        let staging = Staging::prepare(&tree.tree_root);
        let repo_path = join_repo(&self.repository, rel_path);
        let file_name = base_name(&repo_path);
        let checkout = if is_wildcard(file_name) {
            self.vcs
                .checkout_dir_top(parent_dir(&repo_path), staging.path())
        } else {
            self.vcs.checkout_path(&repo_path, staging.path())
        };
        exec::run_ok(&checkout)?;
        copy_matching(&staging.path().join(file_name), target_dir)
    }

    /// Deliver a whole repository subtree into `target_dir`.
    pub fn fetch_subtree(
        &self,
        task: &Task,
        tree: &Tree,
        rel_path: &str,
        target_dir: &Path,
    ) -> Result<(), FetchError> {
        if self.options.allow_file_copy {
            let mirror_dir = mirror_path(&task.toolkit_src_path, rel_path);
            if mirror_dir.is_dir() {
                exec::run_ok(&shell::copy_tree(&mirror_dir, target_dir))?;
                return Ok(());
            }
        }

        let staging = Staging::prepare(&tree.tree_root);
        let repo_dir = join_repo(&self.repository, rel_path);
        exec::run_ok(&self.vcs.checkout_dir_recursive(&repo_dir, staging.path()))?;
        exec::run_ok(&shell::copy_tree(staging.path(), target_dir))?;
        Ok(())
    }

    /// Check out the shared GUI resources into `src/gui/res`. Top-level
    /// files only; there is no mirror fast path for these.
    pub fn fetch_gui_resources(&self, tree: &Tree) -> Result<(), FetchError> {
        let target = tree.src_root_branch.join("gui").join("res");
        crate::utils::ensure_dir_exists(&target)?;

        let staging = Staging::prepare(&tree.tree_root);
        let repo_dir = join_repo(&self.repository, "src/gui/res");
        exec::run_ok(&self.vcs.checkout_dir_recursive(&repo_dir, staging.path()))?;
        for entry in fs::read_dir(staging.path())?.flatten() {
            let path = entry.path();
            if path.is_file() {
                exec::run_ok(&shell::copy_file(&path, &target))?;
            }
        }
        Ok(())
    }

    /// Populate the fresh tree with the fixed manifest of build-system
    /// templates. Fetches are independent: a failure is logged and the
    /// remaining entries still run. Returns the failure count.
    pub fn fill_tree(&self, task: &Task, tree: &Tree) -> usize {
        let mut failures = 0;

        if task.dll_build {
            if let Err(error) = self.fetch_subtree(task, tree, "src/dll", &tree.src_dll_branch) {
                warn!("can't fetch src/dll: {error}");
                failures += 1;
            }
        }

        for (rel_path, target_dir) in file_manifest(tree) {
            if let Err(error) = self.fetch_file(task, tree, rel_path, target_dir) {
                warn!("can't fetch {rel_path}: {error}");
                failures += 1;
            }
        }
        failures
    }

    // Fast path: the toolkit snapshot carries a source mirror laid out
    // like the repository. Wildcard presence is approximated as "the
    // parent folder exists and holds at least one file".
    fn copy_from_mirror(
        &self,
        task: &Task,
        rel_path: &str,
        target_dir: &Path,
    ) -> Result<bool, FetchError> {
        let mirror_file = mirror_path(&task.toolkit_src_path, rel_path);
        let parent = match mirror_file.parent() {
            Some(parent) => parent,
            None => return Ok(false),
        };
        if !has_any_file(parent) {
            debug!("not in the toolkit mirror: {}", mirror_file.display());
            return Ok(false);
        }
        copy_matching(&mirror_file, target_dir)?;
        Ok(true)
    }
}

/// Template files every generated tree receives, in fetch order.
fn file_manifest(tree: &Tree) -> Vec<(&'static str, &Path)> {
    vec![
        (
            "src/build-system/Makefile.mk.in",
            tree.src_build_system_branch.as_path(),
        ),
        (
            "src/build-system/Makefile.mk.in.msvc",
            tree.src_build_system_branch.as_path(),
        ),
        (
            "src/build-system/project_tags.txt",
            tree.src_build_system_branch.as_path(),
        ),
        (
            "compilers/msvc710_prj/Makefile.FLTK.app.msvc",
            tree.compilers_branch.as_path(),
        ),
        ("compilers/msvc710_prj/ncbi.rc", tree.compilers_branch.as_path()),
        (
            "compilers/msvc710_prj/ncbilogo.ico",
            tree.compilers_branch.as_path(),
        ),
        (
            "compilers/msvc710_prj/project_tree_builder.ini",
            tree.compilers_branch.as_path(),
        ),
        (
            "compilers/msvc710_prj/lock_ptb_config.bat",
            tree.compilers_branch.as_path(),
        ),
        (
            "compilers/msvc710_prj/asn_prebuild.bat",
            tree.compilers_branch.as_path(),
        ),
        (
            "compilers/msvc710_prj/dll/dll_info.ini",
            tree.compilers_branch_dll.as_path(),
        ),
        (
            "compilers/msvc710_prj/dll/dll_main.cpp",
            tree.compilers_branch_dll.as_path(),
        ),
        (
            "compilers/msvc710_prj/dll/Makefile.mk",
            tree.compilers_branch_dll.as_path(),
        ),
        (
            "include/common/config/ncbiconf_msvc_site.*",
            tree.include_config.as_path(),
        ),
    ]
}

fn join_repo(root: &str, rel_path: &str) -> String {
    format!(
        "{}/{}",
        root.trim_end_matches('/'),
        rel_path.trim_start_matches('/')
    )
}

/// Resolve a slash-separated repository-relative path below `base`.
fn mirror_path(base: &Path, rel_path: &str) -> PathBuf {
    let mut path = base.to_path_buf();
    for segment in rel_path.split('/').filter(|s| !s.is_empty()) {
        path.push(segment);
    }
    path
}

fn has_any_file(dir: &Path) -> bool {
    match fs::read_dir(dir) {
        Ok(entries) => entries.flatten().any(|entry| entry.path().is_file()),
        Err(_) => false,
    }
}

/// Issue one copy command per file matching `source`, which is either an
/// exact path or a pattern in its final segment.
fn copy_matching(source: &Path, target_dir: &Path) -> Result<(), FetchError> {
    let name = source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    if !is_wildcard(&name) {
        exec::run_ok(&shell::copy_file(source, target_dir))?;
        return Ok(());
    }

    let pattern = source.to_string_lossy().into_owned();
    let paths = glob::glob(&pattern).map_err(|e| FetchError::Pattern {
        pattern: pattern.clone(),
        source: e,
    })?;
    let mut matched = false;
    for path in paths.flatten() {
        exec::run_ok(&shell::copy_file(&path, target_dir))?;
        matched = true;
    }
    if !matched {
        warn!("no files match {pattern}");
    }
    Ok(())
}

#[test]
fn test_join_repo_normalizes_slashes() {
    assert_eq!(join_repo("https://host/repos/", "/src/x"), "https://host/repos/src/x");
    assert_eq!(join_repo("internal/c++", "src/x"), "internal/c++/src/x");
}

#[test]
fn test_mirror_path_follows_repo_segments() {
    let path = mirror_path(Path::new("/cache"), "/src/build-system/project_tags.txt");
    assert_eq!(
        path,
        Path::new("/cache")
            .join("src")
            .join("build-system")
            .join("project_tags.txt")
    );
}

#[test]
fn test_manifest_targets_stay_inside_the_tree() {
    let task = Task::new(
        "proj".to_string(),
        "proj".to_string(),
        false,
        PathBuf::from("/cache"),
        PathBuf::from("/cache"),
        false,
        false,
    );
    let tree = Tree::new(Path::new("/home/user"), &task);
    let manifest = file_manifest(&tree);
    assert_eq!(manifest.len(), 13);
    for (rel_path, target_dir) in manifest {
        assert!(!rel_path.starts_with('/'));
        assert!(target_dir.starts_with(&tree.tree_root));
    }
}

#[cfg(unix)]
#[test]
fn test_copy_matching_exact_file() {
    let scratch = tempfile::tempdir().unwrap();
    let source_dir = scratch.path().join("src");
    let target_dir = scratch.path().join("dst");
    fs::create_dir_all(&source_dir).unwrap();
    fs::create_dir_all(&target_dir).unwrap();
    fs::write(source_dir.join("a.ini"), "x").unwrap();

    copy_matching(&source_dir.join("a.ini"), &target_dir).unwrap();
    assert!(target_dir.join("a.ini").is_file());
}

#[cfg(unix)]
#[test]
fn test_copy_matching_expands_wildcards() {
    let scratch = tempfile::tempdir().unwrap();
    let source_dir = scratch.path().join("src");
    let target_dir = scratch.path().join("dst");
    fs::create_dir_all(&source_dir).unwrap();
    fs::create_dir_all(&target_dir).unwrap();
    fs::write(source_dir.join("site.one"), "1").unwrap();
    fs::write(source_dir.join("site.two"), "2").unwrap();
    fs::write(source_dir.join("other.txt"), "3").unwrap();

    copy_matching(&source_dir.join("site.*"), &target_dir).unwrap();
    assert!(target_dir.join("site.one").is_file());
    assert!(target_dir.join("site.two").is_file());
    assert!(!target_dir.join("other.txt").exists());
}

#[cfg(unix)]
#[test]
fn test_fetch_file_prefers_the_mirror() {
    use crate::args::ArgScanner;
    use crate::config::Settings;

    let scratch = tempfile::tempdir().unwrap();
    let mirror = scratch.path().join("mirror");
    let rel_dir = mirror.join("src").join("build-system");
    fs::create_dir_all(&rel_dir).unwrap();
    fs::write(rel_dir.join("project_tags.txt"), "tags").unwrap();

    let task = Task::new(
        "proj".to_string(),
        "proj".to_string(),
        false,
        mirror.clone(),
        mirror,
        false,
        false,
    );
    let work = scratch.path().join("work");
    fs::create_dir_all(&work).unwrap();
    let tree = Tree::new(&work, &task);
    tree.create_structure(&task).unwrap();

    let options = Options::resolve(&Settings::default(), &ArgScanner::new(Vec::new()));
    let provider = SourceProvider::new(&options);
    provider
        .fetch_file(
            &task,
            &tree,
            "/src/build-system/project_tags.txt",
            &tree.src_build_system_branch,
        )
        .unwrap();

    assert!(tree.src_build_system_branch.join("project_tags.txt").is_file());
    // the mirror satisfied the fetch, so no staging area was needed
    assert!(!tree.tree_root.join(STAGING_DIR).exists());
}
