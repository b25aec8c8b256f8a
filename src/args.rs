//! Legacy command-line convention: positional values come first, then
//! dash-prefixed flags. A flagged value is the argument following its
//! flag.

pub struct ArgScanner {
    args: Vec<String>,
}

impl ArgScanner {
    #[must_use]
    pub fn new(args: Vec<String>) -> Self {
        ArgScanner { args }
    }

    #[must_use]
    pub fn from_env() -> Self {
        ArgScanner::new(std::env::args().skip(1).collect())
    }

    /// Boolean flag: present anywhere on the command line.
    #[must_use]
    pub fn flag(&self, name: &str, default: bool) -> bool {
        if self.args.iter().any(|arg| arg == name) {
            true
        } else {
            default
        }
    }

    /// Value of a `-flag value` pair, or the default when the flag is
    /// absent or has nothing after it.
    #[must_use]
    pub fn flagged_value(&self, name: &str, default: &str) -> String {
        let mut iter = self.args.iter();
        while let Some(arg) = iter.next() {
            if arg == name {
                if let Some(value) = iter.next() {
                    return value.clone();
                }
            }
        }
        default.to_string()
    }

    /// Positional value by index, or the default. Flags go last: the
    /// first dash-prefixed argument ends the positional range.
    #[must_use]
    pub fn optional_positional(&self, index: usize, default: &str) -> String {
        let mut count = 0;
        for arg in &self.args {
            if !is_positional(arg) {
                break;
            }
            if count == index {
                return arg.clone();
            }
            count += 1;
        }
        default.to_string()
    }

    #[must_use]
    pub fn positional(&self, index: usize) -> String {
        self.optional_positional(index, "")
    }
}

fn is_positional(value: &str) -> bool {
    !value.is_empty() && !value.starts_with('-')
}

#[cfg(test)]
fn scanner(args: &[&str]) -> ArgScanner {
    ArgScanner::new(args.iter().map(|s| s.to_string()).collect())
}

#[test]
fn test_flags_and_flagged_values() {
    let args = scanner(&["-branch", "toolkit/trunk/c++_stable", "-v"]);
    assert!(args.flag("-v", false));
    assert!(!args.flag("-dll", false));
    assert!(args.flag("-dll", true));
    assert_eq!(
        args.flagged_value("-branch", ""),
        "toolkit/trunk/c++_stable"
    );
    assert_eq!(args.flagged_value("-src", "fallback"), "fallback");
}

#[test]
fn test_flag_without_value_yields_default() {
    let args = scanner(&["-branch"]);
    assert_eq!(args.flagged_value("-branch", ""), "");
}

#[test]
fn test_positionals() {
    let args = scanner(&["MyProj", "MyProj"]);
    assert_eq!(args.positional(0), "MyProj");
    assert_eq!(args.positional(1), "MyProj");
    assert_eq!(args.positional(2), "");
    assert_eq!(args.optional_positional(2, "default"), "default");
}

#[test]
fn test_positional_scan_stops_at_first_flag() {
    let args = scanner(&["alpha", "-v", "beta"]);
    assert_eq!(args.positional(0), "alpha");
    // "beta" follows a flag, so it is never positional
    assert_eq!(args.positional(1), "");
}
