//! Spawning external tools.

use crate::config::ToolCommand;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use tracing::debug;

/// A single invocation of an external program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    /// Program name or path.
    pub program: String,
    /// Full argument list.
    pub args: Vec<String>,
    /// Directory the program runs in.
    pub cwd: PathBuf,
    /// File receiving stdout and stderr; inherited when `None`.
    pub log: Option<PathBuf>,
}

impl ToolInvocation {
    /// Builds an invocation from a configured command plus trailing arguments.
    #[must_use]
    pub fn from_command<I, S>(command: &ToolCommand, extra: I, cwd: impl Into<PathBuf>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut args = command.args.clone();
        args.extend(extra.into_iter().map(Into::into));
        Self {
            program: command.program.clone(),
            args,
            cwd: cwd.into(),
            log: None,
        }
    }

    /// Redirects output into a log file.
    #[must_use]
    pub fn with_log(mut self, log: impl Into<PathBuf>) -> Self {
        self.log = Some(log.into());
        self
    }

    /// Renders the command line for messages.
    #[must_use]
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Exit information of a finished tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolOutcome {
    /// Exit code, `None` if the process was killed by a signal.
    pub code: Option<i32>,
}

impl ToolOutcome {
    /// A successful outcome.
    #[must_use]
    pub fn success() -> Self {
        Self { code: Some(0) }
    }

    /// An outcome with the given exit code.
    #[must_use]
    pub fn exit(code: i32) -> Self {
        Self { code: Some(code) }
    }

    /// Returns true if the tool exited with status zero.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.code == Some(0)
    }

    /// Describes a non-zero outcome for error messages.
    #[must_use]
    pub fn describe(&self) -> String {
        match self.code {
            Some(code) => format!("exited with status {code}"),
            None => "was terminated by a signal".to_string(),
        }
    }
}

impl From<ExitStatus> for ToolOutcome {
    fn from(status: ExitStatus) -> Self {
        Self {
            code: status.code(),
        }
    }
}

/// Runs external tools on behalf of the stages.
///
/// Implementations block until the tool exits.
#[cfg_attr(test, mockall::automock)]
pub trait ToolRunner: Send + Sync {
    /// Runs the invocation to completion.
    ///
    /// # Errors
    ///
    /// Returns an error only if the program could not be started or its log
    /// could not be created. A non-zero exit is reported through [`ToolOutcome`].
    fn run(&self, invocation: &ToolInvocation) -> io::Result<ToolOutcome>;
}

/// Runs tools as child processes of the current process.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemToolRunner;

impl SystemToolRunner {
    /// Creates a new system runner.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn open_log(path: &Path) -> io::Result<(Stdio, Stdio)> {
        let stdout = File::create(path)?;
        let stderr = stdout.try_clone()?;
        Ok((Stdio::from(stdout), Stdio::from(stderr)))
    }
}

impl ToolRunner for SystemToolRunner {
    fn run(&self, invocation: &ToolInvocation) -> io::Result<ToolOutcome> {
        debug!(
            command = %invocation.command_line(),
            cwd = %invocation.cwd.display(),
            "Running tool"
        );

        let mut command = Command::new(&invocation.program);
        command
            .args(&invocation.args)
            .current_dir(&invocation.cwd)
            .stdin(Stdio::null());

        if let Some(log) = &invocation.log {
            let (stdout, stderr) = Self::open_log(log)?;
            command.stdout(stdout).stderr(stderr);
        }

        let status = command.status()?;
        Ok(status.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_command_appends_args() {
        let command = ToolCommand::new("7za").arg("x").arg("-y");
        let invocation = ToolInvocation::from_command(&command, ["lapack-3.9.0.7z"], "/work")
            .with_log("/work/x.log");

        assert_eq!(invocation.program, "7za");
        assert_eq!(invocation.args, vec!["x", "-y", "lapack-3.9.0.7z"]);
        assert_eq!(invocation.command_line(), "7za x -y lapack-3.9.0.7z");
        assert_eq!(invocation.log, Some(PathBuf::from("/work/x.log")));
    }

    #[test]
    fn test_outcome_describe() {
        assert!(ToolOutcome::success().is_success());
        assert!(!ToolOutcome::exit(2).is_success());
        assert_eq!(ToolOutcome::exit(2).describe(), "exited with status 2");
        assert_eq!(ToolOutcome { code: None }.describe(), "was terminated by a signal");
    }

    #[cfg(unix)]
    #[test]
    fn test_system_runner_captures_output() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("echo.log");
        let invocation = ToolInvocation::from_command(
            &ToolCommand::new("sh").arg("-c"),
            ["echo configured; echo warning >&2"],
            dir.path(),
        )
        .with_log(&log);

        let outcome = SystemToolRunner::new().run(&invocation).unwrap();

        assert!(outcome.is_success());
        let captured = std::fs::read_to_string(&log).unwrap();
        assert!(captured.contains("configured"));
        assert!(captured.contains("warning"));
    }

    #[cfg(unix)]
    #[test]
    fn test_system_runner_reports_exit_code() {
        let dir = tempfile::tempdir().unwrap();
        let invocation =
            ToolInvocation::from_command(&ToolCommand::new("sh").arg("-c"), ["exit 3"], dir.path());

        let outcome = SystemToolRunner::new().run(&invocation).unwrap();
        assert_eq!(outcome, ToolOutcome::exit(3));
    }

    #[test]
    fn test_system_runner_missing_program() {
        let dir = tempfile::tempdir().unwrap();
        let invocation = ToolInvocation::from_command(
            &ToolCommand::new("depbuild-no-such-tool"),
            Vec::<String>::new(),
            dir.path(),
        );
        assert!(SystemToolRunner::new().run(&invocation).is_err());
    }
}
