use std::ffi::OsString;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::thread;

use log::debug;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SetupError {
    #[error("can't run {command}: {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },
    #[error("command failed with code {code}: {command}")]
    CommandFailed { command: String, code: i32 },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A fully resolved external command: program plus argument vector plus
/// optional working directory. Arguments are never joined into a shell
/// string.
#[derive(Clone, Debug)]
pub struct CommandLine {
    program: PathBuf,
    args: Vec<OsString>,
    current_dir: Option<PathBuf>,
}

impl CommandLine {
    #[must_use]
    pub fn new<P: Into<PathBuf>>(program: P) -> Self {
        CommandLine {
            program: program.into(),
            args: Vec::new(),
            current_dir: None,
        }
    }

    #[must_use]
    pub fn arg<S: Into<OsString>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    #[must_use]
    pub fn current_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    /// Display form used for the command echo.
    #[must_use]
    pub fn render(&self) -> String {
        let mut words = vec![self.program.to_string_lossy().into_owned()];
        words.extend(self.args.iter().map(|arg| arg.to_string_lossy().into_owned()));
        shlex::try_join(words.iter().map(String::as_str)).unwrap_or_else(|_| words.join(" "))
    }

    fn to_command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args);
        if let Some(ref dir) = self.current_dir {
            command.current_dir(dir);
        }
        command
    }
}

/// Run the command, streaming its stdout and stderr line by line as they
/// arrive, and return the exit code once the process finishes. Spawn
/// failure is an error; a non-zero exit code is data for the caller.
pub fn run(command: &CommandLine) -> Result<i32, SetupError> {
    debug!("+  {}", command.render());
    let mut child = command
        .to_command()
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| SetupError::Spawn {
            command: command.render(),
            source,
        })?;

    // stderr is drained on its own thread; a single reader can deadlock
    // once the other pipe fills up.
    let stderr = child.stderr.take();
    let pump = thread::spawn(move || {
        if let Some(stream) = stderr {
            for line in BufReader::new(stream).lines().map_while(Result::ok) {
                eprintln!("{line}");
            }
        }
    });
    if let Some(stream) = child.stdout.take() {
        for line in BufReader::new(stream).lines().map_while(Result::ok) {
            println!("{line}");
        }
    }
    let _ = pump.join();

    let status = child.wait()?;
    Ok(status.code().unwrap_or(-1))
}

/// Variant for call sites that treat a non-zero exit as a failure.
pub fn run_ok(command: &CommandLine) -> Result<(), SetupError> {
    match run(command)? {
        0 => Ok(()),
        code => Err(SetupError::CommandFailed {
            command: command.render(),
            code,
        }),
    }
}

#[test]
fn test_render_joins_the_argument_vector() {
    let command = CommandLine::new("svn").arg("checkout").arg("-N").arg("url");
    assert_eq!(command.render(), "svn checkout -N url");
}

#[test]
fn test_render_keeps_spaced_arguments_one_word() {
    let command = CommandLine::new("copy").arg("a file.txt").arg("target");
    let rendered = command.render();
    // quoted by shlex, not split into two words
    assert!(rendered.contains("a file.txt"));
}

#[cfg(unix)]
#[test]
fn test_run_reports_exit_code() {
    assert_eq!(run(&CommandLine::new("true")).unwrap(), 0);
    assert_eq!(run(&CommandLine::new("false")).unwrap(), 1);
}

#[cfg(unix)]
#[test]
fn test_run_ok_maps_nonzero_to_error() {
    assert!(run_ok(&CommandLine::new("true")).is_ok());
    match run_ok(&CommandLine::new("false")) {
        Err(SetupError::CommandFailed { code, .. }) => assert_eq!(code, 1),
        other => panic!("unexpected result: {other:?}"),
    }
}

#[cfg(unix)]
#[test]
fn test_run_honors_the_working_directory() {
    let scratch = tempfile::tempdir().unwrap();
    let command = CommandLine::new("ls").current_dir(scratch.path());
    assert_eq!(run(&command).unwrap(), 0);
}

#[test]
fn test_spawn_failure_is_an_error() {
    let missing = CommandLine::new("definitely-not-a-real-program-1b2c");
    assert!(matches!(run(&missing), Err(SetupError::Spawn { .. })));
}
