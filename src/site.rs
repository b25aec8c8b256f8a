use std::fs;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use log::debug;

use crate::task::Task;
use crate::tree::Tree;
use crate::utils::escape_back_slashes;

/// Register the pre-built toolkit as a third-party library in the
/// freshly fetched project_tree_builder.ini.
pub fn adjust_local_site(task: &Task, tree: &Tree) -> io::Result<()> {
    let ptb_ini = tree.compilers_branch.join("project_tree_builder.ini");
    debug!("Modifying (appending): {}", ptb_ini.display());
    let mut file = OpenOptions::new().append(true).open(&ptb_ini)?;

    writeln!(file, "[CXX_Toolkit]")?;
    let include = find_include_dir(&task.toolkit_src_path);
    writeln!(file, "INCLUDE = {}", registry_path(&include))?;
    writeln!(file, "LIBPATH = ")?;

    if task.dll_build {
        write_dll_site(&mut file, task)?;
    } else {
        write_static_site(&mut file, task)?;
    }
    Ok(())
}

/// Walk upward from the toolkit source path until a folder holding an
/// `include` directory is found. Gives up at the filesystem root and
/// proceeds with the last candidate.
fn find_include_dir(toolkit_src: &Path) -> PathBuf {
    let mut root = toolkit_src.to_path_buf();
    loop {
        let include = root.join("include");
        if include.is_dir() {
            return include;
        }
        debug!("Folder not found: {}", include.display());
        match root.parent() {
            Some(parent) => root = parent.to_path_buf(),
            None => return include,
        }
    }
}

fn write_dll_site<W: Write>(out: &mut W, task: &Task) -> io::Result<()> {
    let mut libpath_prefix = PathBuf::new();
    let mut dll_names = collect_file_names(&task.toolkit_path.join("DebugDLL"), "dll");
    if dll_names.is_empty() {
        libpath_prefix = PathBuf::from("lib");
        dll_names = collect_file_names(&task.toolkit_path.join("lib").join("DebugDLL"), "dll");
    }

    // list only the DLLs whose import library is present
    let dll_libs = collect_dll_libs(task, &libpath_prefix, &dll_names);
    write_lib_list(out, &dll_libs)?;

    writeln!(out, "CONFS   = DebugDLL ReleaseDLL")?;
    for (section, config) in [("debug", "DebugDLL"), ("release", "ReleaseDLL")] {
        writeln!(out, "[CXX_Toolkit.{section}.{config}]")?;
        let libpath = task.toolkit_path.join(&libpath_prefix).join(config);
        writeln!(out, "LIBPATH = {}", registry_path(&libpath))?;
    }
    Ok(())
}

fn write_static_site<W: Write>(out: &mut W, task: &Task) -> io::Result<()> {
    let mut libpath_prefix = PathBuf::new();
    let mut static_libs = collect_file_names(&task.toolkit_path.join("Debug"), "lib");
    if static_libs.is_empty() {
        libpath_prefix = PathBuf::from("lib");
        static_libs = collect_file_names(&task.toolkit_path.join("lib").join("Debug"), "lib");
    }
    write_lib_list(out, &static_libs)?;

    writeln!(out, "CONFS   = Debug DebugDLL Release ReleaseDLL")?;
    for (section, config) in [
        ("debug", "Debug"),
        ("debug", "DebugDLL"),
        ("release", "Release"),
        ("release", "ReleaseDLL"),
    ] {
        writeln!(out, "[CXX_Toolkit.{section}.{config}]")?;
        let libpath = task.toolkit_path.join(&libpath_prefix).join(config);
        writeln!(out, "LIBPATH = {}", registry_path(&libpath))?;
    }
    Ok(())
}

fn write_lib_list<W: Write>(out: &mut W, names: &[String]) -> io::Result<()> {
    if names.is_empty() {
        return Ok(());
    }
    writeln!(out, "LIB     = \\")?;
    for (index, name) in names.iter().enumerate() {
        if index + 1 < names.len() {
            writeln!(out, "        {name}.lib \\")?;
        } else {
            writeln!(out, "        {name}.lib")?;
        }
    }
    Ok(())
}

/// Base names of the files with the given extension, sorted; empty when
/// the folder is missing.
fn collect_file_names(dir: &Path, ext: &str) -> Vec<String> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(_) => return Vec::new(),
    };
    let mut names: Vec<String> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| {
            path.extension()
                .map_or(false, |e| e.eq_ignore_ascii_case(ext))
        })
        .filter_map(|path| path.file_stem().map(|s| s.to_string_lossy().into_owned()))
        .collect();
    names.sort();
    names
}

fn collect_dll_libs(task: &Task, libpath_prefix: &Path, dll_names: &[String]) -> Vec<String> {
    dll_names
        .iter()
        .filter(|name| {
            let lib = task
                .toolkit_path
                .join(libpath_prefix)
                .join("DebugDLL")
                .join(format!("{name}.lib"));
            lib.is_file()
        })
        .cloned()
        .collect()
}

// Registry values escape every path separator.
fn registry_path(path: &Path) -> String {
    escape_back_slashes(&path.to_string_lossy())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lib_list_continues_all_but_the_last_line() {
        let mut out = Vec::new();
        write_lib_list(
            &mut out,
            &["ncbi_core".to_string(), "ncbi_general".to_string()],
        )
        .unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "LIB     = \\\n        ncbi_core.lib \\\n        ncbi_general.lib\n"
        );
    }

    #[test]
    fn empty_lib_list_writes_nothing() {
        let mut out = Vec::new();
        write_lib_list(&mut out, &[]).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn include_search_walks_upward() {
        let scratch = tempfile::tempdir().unwrap();
        let include = scratch.path().join("include");
        fs::create_dir_all(&include).unwrap();
        let nested = scratch.path().join("builds").join("cxx.current");
        fs::create_dir_all(&nested).unwrap();

        assert_eq!(find_include_dir(&nested), include);
    }

    #[test]
    fn include_search_gives_up_at_the_root() {
        // nothing on the way up; the last candidate is kept as-is
        let missing = Path::new("/definitely/not/a/real/prefix-1b2c");
        let include = find_include_dir(missing);
        assert!(include.ends_with("include"));
    }

    #[test]
    fn collects_only_matching_extensions() {
        let scratch = tempfile::tempdir().unwrap();
        fs::write(scratch.path().join("ncbi_core.dll"), "x").unwrap();
        fs::write(scratch.path().join("ncbi_core.lib"), "x").unwrap();
        fs::write(scratch.path().join("notes.txt"), "x").unwrap();

        assert_eq!(
            collect_file_names(scratch.path(), "dll"),
            vec!["ncbi_core".to_string()]
        );
        assert!(collect_file_names(&scratch.path().join("missing"), "dll").is_empty());
    }

    #[test]
    fn dll_section_lists_only_dlls_with_import_libraries() {
        let scratch = tempfile::tempdir().unwrap();
        let toolkit = scratch.path().join("toolkit");
        let debug_dll = toolkit.join("DebugDLL");
        fs::create_dir_all(&debug_dll).unwrap();
        fs::write(debug_dll.join("ncbi_core.dll"), "x").unwrap();
        fs::write(debug_dll.join("ncbi_core.lib"), "x").unwrap();
        fs::write(debug_dll.join("ncbi_orphan.dll"), "x").unwrap();

        let task = Task::new(
            "proj".to_string(),
            "proj".to_string(),
            true,
            toolkit.clone(),
            toolkit,
            false,
            false,
        );

        let mut out = Vec::new();
        write_dll_site(&mut out, &task).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("ncbi_core.lib"));
        assert!(!text.contains("ncbi_orphan"));
        assert!(text.contains("CONFS   = DebugDLL ReleaseDLL"));
        assert!(text.contains("[CXX_Toolkit.debug.DebugDLL]"));
        assert!(text.contains("[CXX_Toolkit.release.ReleaseDLL]"));
    }
}
