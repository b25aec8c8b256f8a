use std::fs;
use std::path::PathBuf;

use newtree::task::Task;
use newtree::tree::{active_configs, Tree};

fn sample_task(dll_build: bool, toolkit: PathBuf) -> Task {
    Task::new(
        "demo".to_string(),
        "demo".to_string(),
        dll_build,
        toolkit.clone(),
        toolkit,
        false,
        false,
    )
}

#[test]
fn test_static_tree_materializes() {
    let scratch = tempfile::tempdir().unwrap();
    let task = sample_task(false, scratch.path().join("toolkit"));
    let tree = Tree::new(scratch.path(), &task);

    tree.create_structure(&task).unwrap();

    assert!(tree.compilers_branch.is_dir());
    assert!(tree.include_config.is_dir());
    assert!(tree.src_build_system_branch.is_dir());
    assert!(tree.src_project_branch.is_dir());
    for config in active_configs(false) {
        assert!(tree.bin_path_static.join(config.to_string()).is_dir());
    }
    // static builds get no dll bin directories
    assert!(!tree.bin_path_dll.join("DebugDLL").exists());
}

#[test]
fn test_dll_tree_materializes_both_bin_sets() {
    let scratch = tempfile::tempdir().unwrap();
    let task = sample_task(true, scratch.path().join("toolkit"));
    let tree = Tree::new(scratch.path(), &task);

    tree.create_structure(&task).unwrap();

    for config in active_configs(true) {
        assert!(tree.bin_path_static.join(config.to_string()).is_dir());
        assert!(tree.bin_path_dll.join(config.to_string()).is_dir());
    }
}

#[test]
fn test_rerun_changes_nothing() {
    let scratch = tempfile::tempdir().unwrap();
    let task = sample_task(false, scratch.path().join("toolkit"));
    let tree = Tree::new(scratch.path(), &task);

    tree.create_structure(&task).unwrap();
    fs::write(tree.src_project_branch.join("keep.me"), "data").unwrap();

    tree.create_structure(&task).unwrap();
    assert!(tree.src_project_branch.join("keep.me").is_file());
}

#[cfg(unix)]
#[test]
fn test_full_provisioning_round() {
    use newtree::provision::{self, PTB_TOOL};

    let scratch = tempfile::tempdir().unwrap();
    let toolkit_bin = scratch.path().join("toolkit").join("bin");
    fs::create_dir_all(&toolkit_bin).unwrap();
    fs::write(toolkit_bin.join(PTB_TOOL), "binary").unwrap();

    let mut task = sample_task(false, scratch.path().join("toolkit"));
    let tree = Tree::new(scratch.path(), &task);
    tree.create_structure(&task).unwrap();

    assert_eq!(provision::provision_tool(&mut task, &tree, PTB_TOOL), 0);
    for config in active_configs(false) {
        assert!(tree.bin_path(&task, *config).join(PTB_TOOL).is_file());
    }
    assert_eq!(task.remote_ptb(), Some(toolkit_bin.join(PTB_TOOL).as_path()));
}
