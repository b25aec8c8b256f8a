use std::fmt::{Display, Formatter};
use std::io;
use std::path::{Path, PathBuf};

use log::debug;
use path_absolutize::Absolutize;

use crate::task::Task;
use crate::utils::ensure_dir_exists;

/// Toolchain directory name of the legacy layout.
pub const COMPILERS_SUBDIR: &str = "msvc710_prj";

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BuildConfig {
    Debug,
    DebugMT,
    DebugDLL,
    Release,
    ReleaseMT,
    ReleaseDLL,
}

impl BuildConfig {
    /// True for configurations linking against the shared runtime.
    #[must_use]
    pub fn is_dll(self) -> bool {
        matches!(self, BuildConfig::DebugDLL | BuildConfig::ReleaseDLL)
    }
}

impl Display for BuildConfig {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        let name = match self {
            BuildConfig::Debug => "Debug",
            BuildConfig::DebugMT => "DebugMT",
            BuildConfig::DebugDLL => "DebugDLL",
            BuildConfig::Release => "Release",
            BuildConfig::ReleaseMT => "ReleaseMT",
            BuildConfig::ReleaseDLL => "ReleaseDLL",
        };
        f.write_str(name)
    }
}

const DLL_CONFIGS: &[BuildConfig] = &[BuildConfig::DebugDLL, BuildConfig::ReleaseDLL];

const STATIC_CONFIGS: &[BuildConfig] = &[
    BuildConfig::Debug,
    BuildConfig::DebugMT,
    BuildConfig::DebugDLL,
    BuildConfig::Release,
    BuildConfig::ReleaseMT,
    BuildConfig::ReleaseDLL,
];

/// Active configuration set for the build mode.
#[must_use]
pub fn active_configs(dll_build: bool) -> &'static [BuildConfig] {
    if dll_build {
        DLL_CONFIGS
    } else {
        STATIC_CONFIGS
    }
}

/// Absolute target paths of the generated tree. A pure function of the
/// current directory and the task; every path is a descendant of
/// `tree_root`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tree {
    pub tree_root: PathBuf,
    pub compilers_branch: PathBuf,
    pub compilers_branch_static: PathBuf,
    pub bin_path_static: PathBuf,
    pub compilers_branch_dll: PathBuf,
    pub bin_path_dll: PathBuf,
    pub include_root_branch: PathBuf,
    pub include_config: PathBuf,
    pub include_project_branch: PathBuf,
    pub src_root_branch: PathBuf,
    pub src_dll_branch: PathBuf,
    pub src_build_system_branch: PathBuf,
    pub src_project_branch: PathBuf,
}

impl Tree {
    #[must_use]
    pub fn new(current_dir: &Path, task: &Task) -> Tree {
        let folder = Path::new(&task.project_folder);
        let tree_root = match folder.absolutize_from(current_dir) {
            Ok(path) => path.into_owned(),
            Err(_) => current_dir.join(folder),
        };
        let compilers_branch = tree_root.join("compilers").join(COMPILERS_SUBDIR);
        let compilers_branch_static = compilers_branch.join("static");
        let compilers_branch_dll = compilers_branch.join("dll");
        let include_root_branch = tree_root.join("include");
        let src_root_branch = tree_root.join("src");

        Tree {
            bin_path_static: compilers_branch_static.join("bin"),
            bin_path_dll: compilers_branch_dll.join("bin"),
            include_config: include_root_branch.join("corelib").join("config"),
            include_project_branch: include_root_branch.join(&task.project_name),
            src_dll_branch: src_root_branch.join("dll"),
            src_build_system_branch: src_root_branch.join("build-system"),
            src_project_branch: src_root_branch.join(&task.project_name),
            tree_root,
            compilers_branch,
            compilers_branch_static,
            compilers_branch_dll,
            include_root_branch,
            src_root_branch,
        }
    }

    /// Binary output directory for one configuration.
    #[must_use]
    pub fn bin_path(&self, task: &Task, config: BuildConfig) -> PathBuf {
        let base = if task.dll_build {
            &self.bin_path_dll
        } else {
            &self.bin_path_static
        };
        base.join(config.to_string())
    }

    /// Diagnostic dump of every derived path.
    pub fn dump(&self) {
        debug!("TreeRoot              = {}", self.tree_root.display());
        debug!("CompilersBranch       = {}", self.compilers_branch.display());
        debug!(
            "CompilersBranchStatic = {}",
            self.compilers_branch_static.display()
        );
        debug!("BinPathStatic         = {}", self.bin_path_static.display());
        debug!(
            "CompilersBranchDll    = {}",
            self.compilers_branch_dll.display()
        );
        debug!("BinPathDll            = {}", self.bin_path_dll.display());
        debug!(
            "IncludeRootBranch     = {}",
            self.include_root_branch.display()
        );
        debug!("IncludeConfig         = {}", self.include_config.display());
        debug!(
            "IncludeProjectBranch  = {}",
            self.include_project_branch.display()
        );
        debug!("SrcRootBranch         = {}", self.src_root_branch.display());
        debug!("SrcDllBranch          = {}", self.src_dll_branch.display());
        debug!(
            "SrcBuildSystemBranch  = {}",
            self.src_build_system_branch.display()
        );
        debug!(
            "SrcProjectBranch      = {}",
            self.src_project_branch.display()
        );
    }

    /// Create every directory of the descriptor, parents before
    /// children. The tree root itself is covered by the recursion.
    pub fn create_structure(&self, task: &Task) -> io::Result<()> {
        ensure_dir_exists(&self.compilers_branch)?;
        ensure_dir_exists(&self.compilers_branch_static)?;

        for config in active_configs(task.dll_build) {
            ensure_dir_exists(&self.bin_path_static.join(config.to_string()))?;
            if task.dll_build {
                ensure_dir_exists(&self.bin_path_dll.join(config.to_string()))?;
            }
        }

        ensure_dir_exists(&self.compilers_branch_dll)?;

        ensure_dir_exists(&self.include_root_branch)?;
        ensure_dir_exists(&self.include_config)?;
        ensure_dir_exists(&self.include_project_branch)?;

        ensure_dir_exists(&self.src_root_branch)?;
        ensure_dir_exists(&self.src_dll_branch)?;
        ensure_dir_exists(&self.src_build_system_branch)?;
        ensure_dir_exists(&self.src_project_branch)?;
        Ok(())
    }
}

#[cfg(test)]
fn sample_task(dll_build: bool) -> Task {
    Task::new(
        "myproj".to_string(),
        "work".to_string(),
        dll_build,
        PathBuf::from("/cache"),
        PathBuf::from("/cache"),
        false,
        false,
    )
}

#[test]
fn test_tree_is_deterministic() {
    let task = sample_task(false);
    let cwd = Path::new("/home/user");
    assert_eq!(Tree::new(cwd, &task), Tree::new(cwd, &task));
}

#[test]
fn test_every_path_descends_from_the_root() {
    let task = sample_task(false);
    let tree = Tree::new(Path::new("/home/user"), &task);
    for path in [
        &tree.compilers_branch,
        &tree.compilers_branch_static,
        &tree.bin_path_static,
        &tree.compilers_branch_dll,
        &tree.bin_path_dll,
        &tree.include_root_branch,
        &tree.include_config,
        &tree.include_project_branch,
        &tree.src_root_branch,
        &tree.src_dll_branch,
        &tree.src_build_system_branch,
        &tree.src_project_branch,
    ] {
        assert!(path.starts_with(&tree.tree_root), "{}", path.display());
    }
}

#[test]
fn test_config_sets_per_build_mode() {
    assert_eq!(active_configs(true).len(), 2);
    assert_eq!(active_configs(false).len(), 6);
    assert!(active_configs(true).iter().all(|c| c.is_dll()));
}

#[test]
fn test_bin_path_follows_the_build_mode() {
    let cwd = Path::new("/home/user");
    let static_task = sample_task(false);
    let tree = Tree::new(cwd, &static_task);
    assert_eq!(
        tree.bin_path(&static_task, BuildConfig::Debug),
        tree.bin_path_static.join("Debug")
    );

    let dll_task = sample_task(true);
    assert_eq!(
        tree.bin_path(&dll_task, BuildConfig::DebugDLL),
        tree.bin_path_dll.join("DebugDLL")
    );
}
