use std::path::{Path, PathBuf};

use crate::args::ArgScanner;
use crate::config::Settings;

/// What the user asked for. Built once from the command line and the
/// settings; immutable afterwards except for the derived remote tool
/// path, which is set at most once during binary provisioning.
#[derive(Debug)]
pub struct Task {
    pub project_name: String,
    pub project_folder: String,
    pub dll_build: bool,
    /// Pre-built toolkit binary cache.
    pub toolkit_path: PathBuf,
    /// Source mirror inside the toolkit snapshot, laid out like the
    /// repository.
    pub toolkit_src_path: PathBuf,
    pub copy_dlls: bool,
    pub copy_res: bool,
    remote_ptb: Option<PathBuf>,
}

impl Task {
    #[must_use]
    pub fn new(
        project_name: String,
        project_folder: String,
        dll_build: bool,
        toolkit_path: PathBuf,
        toolkit_src_path: PathBuf,
        copy_dlls: bool,
        copy_res: bool,
    ) -> Task {
        Task {
            project_name,
            project_folder,
            dll_build,
            toolkit_path,
            toolkit_src_path,
            copy_dlls,
            copy_res,
            remote_ptb: None,
        }
    }

    /// None when no project name was given.
    pub fn from_args(args: &ArgScanner, settings: &Settings) -> Option<Task> {
        let project_name = args.positional(0);
        if project_name.is_empty() {
            return None;
        }
        let project_folder = args.optional_positional(1, &project_name);

        let toolkit_folder = args.positional(2);
        let toolkit_folder = if toolkit_folder.is_empty() {
            settings.toolkit_folder.clone()
        } else {
            PathBuf::from(toolkit_folder)
        };
        let toolkit_path = toolkit_folder.join(&settings.toolkit_subfolder);

        let toolkit_src = args.flagged_value("-src", "");
        let toolkit_src_path = if toolkit_src.is_empty() {
            toolkit_path.clone()
        } else {
            PathBuf::from(toolkit_src)
        };

        Some(Task::new(
            project_name,
            project_folder,
            args.flag("-dll", false),
            toolkit_path,
            toolkit_src_path,
            args.flag("-copydlls", false),
            args.flag("-copyres", false),
        ))
    }

    /// First resolved project_tree_builder location. Later calls are
    /// ignored.
    pub fn record_remote_ptb(&mut self, path: &Path) {
        if self.remote_ptb.is_none() {
            self.remote_ptb = Some(path.to_path_buf());
        }
    }

    #[must_use]
    pub fn remote_ptb(&self) -> Option<&Path> {
        self.remote_ptb.as_deref()
    }
}

#[cfg(test)]
fn task_from(args: &[&str]) -> Option<Task> {
    let scanner = ArgScanner::new(args.iter().map(|s| s.to_string()).collect());
    Task::from_args(&scanner, &Settings::default())
}

#[test]
fn test_folder_defaults_to_the_project_name() {
    let task = task_from(&["MyProj"]).unwrap();
    assert_eq!(task.project_name, "MyProj");
    assert_eq!(task.project_folder, "MyProj");
    assert!(!task.dll_build);
    assert!(!task.copy_dlls);
    assert!(!task.copy_res);
}

#[test]
fn test_toolkit_path_joins_the_subfolder() {
    let task = task_from(&["MyProj", "work", "/opt/toolkit"]).unwrap();
    assert_eq!(task.project_folder, "work");
    assert_eq!(task.toolkit_path, PathBuf::from("/opt/toolkit/cxx.current"));
    assert_eq!(task.toolkit_src_path, task.toolkit_path);
}

#[test]
fn test_missing_project_name_yields_none() {
    assert!(task_from(&[]).is_none());
    assert!(task_from(&["-v"]).is_none());
}

#[test]
fn test_remote_ptb_is_set_once() {
    let mut task = task_from(&["MyProj"]).unwrap();
    assert!(task.remote_ptb().is_none());
    task.record_remote_ptb(Path::new("/cache/bin/project_tree_builder.exe"));
    task.record_remote_ptb(Path::new("/elsewhere/project_tree_builder.exe"));
    assert_eq!(
        task.remote_ptb(),
        Some(Path::new("/cache/bin/project_tree_builder.exe"))
    );
}
