use std::path::PathBuf;

use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::args::ArgScanner;
use crate::vcs::VcsKind;

/// Site-wide defaults, overridable from a YAML config file and the
/// environment.
#[derive(Serialize, Deserialize)]
pub struct Settings {
    pub repository: Url,
    pub branch: String,
    pub cvs_root: String,
    pub toolkit_folder: PathBuf,
    pub toolkit_subfolder: String,
    pub vcs: VcsKind,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            repository: Url::parse("https://svn.ncbi.nlm.nih.gov/repos/").unwrap(),
            branch: "toolkit/trunk/c++".to_string(),
            cvs_root: "internal/c++".to_string(),
            toolkit_folder: PathBuf::from(r"\\snowman\win-coremake\Lib\Ncbi\CXX_Toolkit\msvc71"),
            toolkit_subfolder: "cxx.current".to_string(),
            vcs: VcsKind::Svn,
        }
    }
}

impl Settings {
    pub fn load() -> figment::error::Result<Settings> {
        let mut figment = Figment::from(Serialized::defaults(Settings::default()));

        if let Some(path) = config_path() {
            figment = figment.merge(Yaml::file(path));
        }

        figment.merge(Env::prefixed("NEWTREE_")).extract()
    }

    pub fn help() {
        println!("newtree configuration:");
        println!(
            "  config path: {}",
            config_path()
                .and_then(|v| Some(v.to_str()?.to_string()))
                .unwrap_or_else(|| "none".to_string())
        );
        println!();
        println!("Current configuration:");
        match Settings::load() {
            Ok(settings) => settings.show(),
            Err(e) => println!("  ERROR: {e}"),
        }
    }

    fn show(&self) {
        println!("{}", serde_yaml::to_string(self).unwrap());
    }
}

fn config_path() -> Option<PathBuf> {
    Some(dirs::config_dir()?.join("newtree").join("newtree.conf"))
}

/// Per-run options resolved once from the settings and the command line,
/// then passed by reference into every component that needs them.
pub struct Options {
    pub verbose: bool,
    pub vcs: VcsKind,
    pub branch: String,
    pub allow_file_copy: bool,
    pub repository: Url,
    pub cvs_root: String,
}

impl Options {
    #[must_use]
    pub fn resolve(settings: &Settings, args: &ArgScanner) -> Options {
        let mut branch = settings.branch.clone();
        // an explicit branch bypasses the pre-built snapshot for the
        // rest of the run
        let mut allow_file_copy = true;
        let override_branch = args.flagged_value("-branch", "");
        if !override_branch.is_empty() {
            branch = override_branch;
            allow_file_copy = false;
        }

        let vcs = if args.flag("-cvs", false) {
            VcsKind::Cvs
        } else {
            settings.vcs
        };

        Options {
            verbose: args.flag("-v", false),
            vcs,
            branch,
            allow_file_copy,
            repository: settings.repository.clone(),
            cvs_root: settings.cvs_root.clone(),
        }
    }
}

#[test]
fn test_branch_override_disables_the_fast_path() {
    let args = ArgScanner::new(
        ["-branch", "toolkit/trunk/c++_stable", "-v"]
            .iter()
            .map(|s| s.to_string())
            .collect(),
    );
    let options = Options::resolve(&Settings::default(), &args);
    assert_eq!(options.branch, "toolkit/trunk/c++_stable");
    assert!(!options.allow_file_copy);
    assert!(options.verbose);
}

#[test]
fn test_defaults_without_flags() {
    let options = Options::resolve(&Settings::default(), &ArgScanner::new(Vec::new()));
    assert_eq!(options.branch, "toolkit/trunk/c++");
    assert!(options.allow_file_copy);
    assert!(!options.verbose);
    assert_eq!(options.vcs, VcsKind::Svn);
}

#[test]
fn test_repository_root_per_backend() {
    let args = ArgScanner::new(Vec::new());
    let mut options = Options::resolve(&Settings::default(), &args);
    assert_eq!(
        crate::vcs::repository_root(&options),
        "https://svn.ncbi.nlm.nih.gov/repos/toolkit/trunk/c++"
    );
    options.vcs = VcsKind::Cvs;
    assert_eq!(crate::vcs::repository_root(&options), "internal/c++");
}

#[test]
fn test_cvs_flag_switches_backend() {
    let args = ArgScanner::new(vec!["-cvs".to_string()]);
    let options = Options::resolve(&Settings::default(), &args);
    assert_eq!(options.vcs, VcsKind::Cvs);
}
