use std::env;
use std::process;

use log::{debug, error, warn};

use newtree::args::ArgScanner;
use newtree::config::{Options, Settings};
use newtree::provider::SourceProvider;
use newtree::provision;
use newtree::site;
use newtree::task::Task;
use newtree::tree::Tree;
use newtree::utils;
use newtree::version;

fn main() {
    process::exit(run());
}

fn usage() {
    println!("new_project {}", version::full_version());
    println!();
    println!("Usage:");
    println!("  new_project <name> [folder] [toolkit-folder] [flags]");
    println!();
    println!("Positional values go first; flags follow them.");
    println!();
    println!("Flags:");
    println!("  -dll          set up only the DLL configurations");
    println!("  -copydlls     copy the pre-built toolkit DLLs");
    println!("  -copyres      check out the shared GUI resources");
    println!("  -cvs          use CVS instead of Subversion");
    println!("  -branch <b>   check out the given branch (disables the toolkit fast path)");
    println!("  -src <path>   toolkit source mirror location");
    println!("  -config       show the resolved configuration and exit");
    println!("  -v            verbose output");
}

fn run() -> i32 {
    let args = ArgScanner::from_env();
    if args.flag("-config", false) {
        Settings::help();
        return 0;
    }

    let settings = match Settings::load() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("FATAL ERROR: can't load configuration: {e}");
            return 501;
        }
    };
    let options = Options::resolve(&settings, &args);
    utils::init_logger(options.verbose);

    let mut task = match Task::from_args(&args, &settings) {
        Some(task) => task,
        None => {
            usage();
            return 1;
        }
    };
    let current_dir = match env::current_dir() {
        Ok(dir) => dir,
        Err(e) => {
            error!("can't resolve the current directory: {e}");
            return 1;
        }
    };

    let tree = Tree::new(&current_dir, &task);
    tree.dump();
    if let Err(e) = tree.create_structure(&task) {
        error!("can't create the tree structure: {e}");
        return 1;
    }

    let provider = SourceProvider::new(&options);
    let mut failures = provider.fill_tree(&task, &tree);

    failures += provision::provision_tool(&mut task, &tree, provision::PTB_TOOL);
    failures += provision::provision_tool(&mut task, &tree, provision::DATATOOL_TOOL);
    failures += provision::copy_prebuilt_dlls(&task, &tree);

    if task.copy_res {
        if let Err(e) = provider.fetch_gui_resources(&tree) {
            warn!("can't copy the GUI resources: {e}");
            failures += 1;
        }
    } else {
        debug!("CopyRes: skipped (not requested)");
    }

    if let Err(e) = site::adjust_local_site(&task, &tree) {
        warn!("can't register the toolkit in project_tree_builder.ini: {e}");
        failures += 1;
    }

    if let Some(ptb) = task.remote_ptb() {
        debug!("Remote project_tree_builder: {}", ptb.display());
    }

    if failures > 0 {
        warn!("{failures} step(s) failed; the new tree may be incomplete");
        return 1;
    }
    0
}
