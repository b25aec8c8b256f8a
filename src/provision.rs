use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::exec;
use crate::shell::native as shell;
use crate::task::Task;
use crate::tree::{active_configs, BuildConfig, Tree};

/// Project tree builder binary provisioned into every configuration.
pub const PTB_TOOL: &str = "project_tree_builder.exe";
/// Data model compiler provisioned alongside it.
pub const DATATOOL_TOOL: &str = "datatool.exe";
/// Core shared library required by DLL configurations.
pub const CORE_DLL: &str = "ncbi_core.dll";

/// Copy one pre-built tool into every active configuration directory.
/// A missing source is a warning and the configuration is skipped; the
/// others still run. Returns the count of failed copy commands.
pub fn provision_tool(task: &mut Task, tree: &Tree, tool: &str) -> usize {
    let mut failures = 0;
    for &config in active_configs(task.dll_build) {
        let target_path = tree.bin_path(task, config);
        let source_file = match resolve_tool(task, config, tool) {
            Some(path) => path,
            None => continue,
        };
        if tool == PTB_TOOL {
            task.record_remote_ptb(&source_file);
        }
        if let Err(error) = exec::run_ok(&shell::copy_file(&source_file, &target_path)) {
            warn!("can't copy {}: {}", source_file.display(), error);
            failures += 1;
            continue;
        }
        if task.dll_build {
            failures += copy_core_dll(&source_file, &target_path);
        }
    }
    failures
}

/// Primary cache location first, then the per-configuration build
/// output of the toolkit snapshot.
fn resolve_tool(task: &Task, config: BuildConfig, tool: &str) -> Option<PathBuf> {
    let primary = task.toolkit_path.join("bin").join(tool);
    if primary.is_file() {
        return Some(primary);
    }
    warn!("File not found: {}", primary.display());

    let variant = if task.dll_build { "dll" } else { "static" };
    let fallback = task
        .toolkit_path
        .join(variant)
        .join("bin")
        .join(config.to_string())
        .join(tool);
    if fallback.is_file() {
        return Some(fallback);
    }
    warn!("File not found: {}", fallback.display());
    None
}

// DLL configurations need the core library next to the tool binary.
fn copy_core_dll(tool_path: &Path, target_path: &Path) -> usize {
    let dll = match tool_path.parent() {
        Some(parent) => parent.join(CORE_DLL),
        None => return 0,
    };
    if !dll.is_file() {
        warn!("File not found: {}", dll.display());
        return 0;
    }
    match exec::run_ok(&shell::copy_file(&dll, target_path)) {
        Ok(()) => 0,
        Err(error) => {
            warn!("can't copy {}: {}", dll.display(), error);
            1
        }
    }
}

/// Copy the pre-built toolkit DLLs into the local DLL output
/// directories when the task asks for them.
pub fn copy_prebuilt_dlls(task: &Task, tree: &Tree) -> usize {
    if !task.copy_dlls {
        debug!("CopyDlls: skipped (not requested)");
        return 0;
    }

    let mut failures = 0;
    for &config in active_configs(task.dll_build) {
        let mut dlls_bin_path = task.toolkit_path.join(config.to_string());
        if !dlls_bin_path.is_dir() {
            dlls_bin_path = task
                .toolkit_path
                .join("lib")
                .join("dll")
                .join(config.to_string());
        }
        let local_bin_path = tree.bin_path_dll.join(config.to_string());
        failures += copy_dlls_from(&dlls_bin_path, &local_bin_path);
    }
    failures
}

fn copy_dlls_from(source_dir: &Path, target_dir: &Path) -> usize {
    let entries = match fs::read_dir(source_dir) {
        Ok(entries) => entries,
        Err(error) => {
            warn!("can't list {}: {}", source_dir.display(), error);
            return 1;
        }
    };

    let mut failures = 0;
    for entry in entries.flatten() {
        let path = entry.path();
        let is_dll = path
            .extension()
            .map_or(false, |ext| ext.eq_ignore_ascii_case("dll"));
        if !is_dll {
            continue;
        }
        if let Err(error) = exec::run_ok(&shell::copy_file(&path, target_dir)) {
            warn!("can't copy {}: {}", path.display(), error);
            failures += 1;
        }
    }
    failures
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::Tree;

    fn toolkit_task(scratch: &Path, dll_build: bool) -> Task {
        Task::new(
            "proj".to_string(),
            "proj".to_string(),
            dll_build,
            scratch.join("toolkit"),
            scratch.join("toolkit"),
            false,
            false,
        )
    }

    fn prepared_tree(scratch: &Path, task: &Task) -> Tree {
        let work = scratch.join("work");
        fs::create_dir_all(&work).unwrap();
        let tree = Tree::new(&work, task);
        tree.create_structure(task).unwrap();
        tree
    }

    #[cfg(unix)]
    #[test]
    fn primary_cache_hit_reaches_every_configuration() {
        let scratch = tempfile::tempdir().unwrap();
        let bin = scratch.path().join("toolkit").join("bin");
        fs::create_dir_all(&bin).unwrap();
        fs::write(bin.join(PTB_TOOL), "binary").unwrap();

        let mut task = toolkit_task(scratch.path(), false);
        let tree = prepared_tree(scratch.path(), &task);

        assert_eq!(provision_tool(&mut task, &tree, PTB_TOOL), 0);
        for config in active_configs(false) {
            assert!(tree.bin_path(&task, *config).join(PTB_TOOL).is_file());
        }
        assert_eq!(task.remote_ptb(), Some(bin.join(PTB_TOOL).as_path()));
    }

    #[cfg(unix)]
    #[test]
    fn per_configuration_fallback_resolves() {
        let scratch = tempfile::tempdir().unwrap();
        for config in active_configs(true) {
            let bin = scratch
                .path()
                .join("toolkit")
                .join("dll")
                .join("bin")
                .join(config.to_string());
            fs::create_dir_all(&bin).unwrap();
            fs::write(bin.join(DATATOOL_TOOL), "binary").unwrap();
            fs::write(bin.join(CORE_DLL), "library").unwrap();
        }

        let mut task = toolkit_task(scratch.path(), true);
        let tree = prepared_tree(scratch.path(), &task);

        assert_eq!(provision_tool(&mut task, &tree, DATATOOL_TOOL), 0);
        for config in active_configs(true) {
            let target = tree.bin_path(&task, *config);
            assert!(target.join(DATATOOL_TOOL).is_file());
            assert!(target.join(CORE_DLL).is_file());
        }
        // only the tree builder is recorded as the remote tool
        assert!(task.remote_ptb().is_none());
    }

    #[test]
    fn missing_everywhere_skips_without_failing() {
        let scratch = tempfile::tempdir().unwrap();
        let mut task = toolkit_task(scratch.path(), false);
        let tree = prepared_tree(scratch.path(), &task);

        assert_eq!(provision_tool(&mut task, &tree, PTB_TOOL), 0);
        for config in active_configs(false) {
            assert!(!tree.bin_path(&task, *config).join(PTB_TOOL).exists());
        }
        assert!(task.remote_ptb().is_none());
    }

    #[cfg(unix)]
    #[test]
    fn prebuilt_dlls_use_the_lib_fallback_location() {
        let scratch = tempfile::tempdir().unwrap();
        for config in active_configs(true) {
            let dlls = scratch
                .path()
                .join("toolkit")
                .join("lib")
                .join("dll")
                .join(config.to_string());
            fs::create_dir_all(&dlls).unwrap();
            fs::write(dlls.join("ncbi_core.dll"), "x").unwrap();
            fs::write(dlls.join("readme.txt"), "not a dll").unwrap();
        }

        let task = Task::new(
            "proj".to_string(),
            "proj".to_string(),
            true,
            scratch.path().join("toolkit"),
            scratch.path().join("toolkit"),
            true,
            false,
        );
        let tree = prepared_tree(scratch.path(), &task);

        assert_eq!(copy_prebuilt_dlls(&task, &tree), 0);
        for config in active_configs(true) {
            let target = tree.bin_path_dll.join(config.to_string());
            assert!(target.join("ncbi_core.dll").is_file());
            assert!(!target.join("readme.txt").exists());
        }
    }
}
