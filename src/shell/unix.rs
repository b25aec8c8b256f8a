use std::path::Path;

use crate::exec::CommandLine;

/// Copy a single file into a directory.
#[must_use]
pub fn copy_file(source: &Path, target_dir: &Path) -> CommandLine {
    CommandLine::new("cp").arg(source).arg(target_dir)
}

/// Recursive copy of the contents of `source` into `target`.
#[must_use]
pub fn copy_tree(source: &Path, target: &Path) -> CommandLine {
    let mut from = source.as_os_str().to_os_string();
    from.push("/.");
    CommandLine::new("cp").arg("-R").arg(from).arg(target)
}

/// Delete a directory and everything below it.
#[must_use]
pub fn remove_tree(dir: &Path) -> CommandLine {
    CommandLine::new("rm").arg("-rf").arg(dir)
}

#[test]
fn test_unix_builders() {
    let copy = copy_file(Path::new("/src/a.txt"), Path::new("/dst"));
    assert_eq!(copy.render(), "cp /src/a.txt /dst");

    let tree = copy_tree(Path::new("/src"), Path::new("/dst"));
    assert_eq!(tree.render(), "cp -R /src/. /dst");

    let remove = remove_tree(Path::new("/tmp/stage"));
    assert_eq!(remove.render(), "rm -rf /tmp/stage");
}
