use std::path::Path;

use crate::exec::CommandLine;

/// Copy a single file into a directory.
#[must_use]
pub fn copy_file(source: &Path, target_dir: &Path) -> CommandLine {
    CommandLine::new("cmd")
        .arg("/C")
        .arg("copy")
        .arg("/Y")
        .arg(source)
        .arg(target_dir)
}

/// Recursive copy of the contents of `source` into `target`.
#[must_use]
pub fn copy_tree(source: &Path, target: &Path) -> CommandLine {
    CommandLine::new("xcopy")
        .arg(source)
        .arg(target)
        .arg("/S")
        .arg("/E")
        .arg("/I")
        .arg("/Y")
}

/// Delete a directory and everything below it.
#[must_use]
pub fn remove_tree(dir: &Path) -> CommandLine {
    CommandLine::new("cmd")
        .arg("/C")
        .arg("rmdir")
        .arg("/S")
        .arg("/Q")
        .arg(dir)
}

#[test]
fn test_windows_builders() {
    let copy = copy_file(Path::new("a.txt"), Path::new("dst"));
    assert_eq!(copy.render(), "cmd /C copy /Y a.txt dst");

    let tree = copy_tree(Path::new("src"), Path::new("dst"));
    assert_eq!(tree.render(), "xcopy src dst /S /E /I /Y");

    let remove = remove_tree(Path::new("stage"));
    assert_eq!(remove.render(), "cmd /C rmdir /S /Q stage");
}
