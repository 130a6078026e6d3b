//! External quality tools run before a release.
//!
//! The packager does not interpret lint or test results; it only runs
//! `luacheck` and `busted` in the project root and stops at the first
//! non-zero exit.

use camino::Utf8Path;
use log::{debug, info};
use std::process::{Command, Output};
use thiserror::Error;

/// A fixed external command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolCommand {
    /// Executable name, resolved through `PATH`.
    pub program: &'static str,
    /// Arguments passed verbatim.
    pub args: &'static [&'static str],
}

impl std::fmt::Display for ToolCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.program)?;
        for arg in self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Static analysis over the whole tree.
pub const LINT: ToolCommand = ToolCommand {
    program: "luacheck",
    args: &["."],
};

/// Unit tests under `tests/`.
pub const TEST: ToolCommand = ToolCommand {
    program: "busted",
    args: &["--pattern=test_.*\\.lua", "tests"],
};

/// Errors raised while running an external tool.
#[derive(Debug, Error)]
pub enum ToolError {
    /// The executable is not on `PATH`.
    #[error("{program} not found; install it and make sure it is on PATH")]
    NotFound {
        /// The missing executable.
        program: &'static str,
    },

    /// The process could not be started.
    #[error("failed to run {program}")]
    Spawn {
        /// The executable.
        program: &'static str,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The tool ran and reported failure.
    #[error("`{command}` failed ({status}){}", format_output(.output))]
    Failed {
        /// The full command line.
        command: String,
        /// Exit status description.
        status: String,
        /// Captured stdout and stderr, trimmed.
        output: String,
    },
}

fn format_output(output: &str) -> String {
    if output.is_empty() {
        String::new()
    } else {
        format!(":\n{output}")
    }
}

/// Abstraction for running external commands.
pub trait CommandExecutor {
    /// Run `program` with `args` in `cwd` and capture its output.
    ///
    /// # Errors
    ///
    /// Returns any I/O error encountered while spawning the process.
    fn run(&self, program: &str, args: &[&str], cwd: &Utf8Path) -> std::io::Result<Output>;
}

/// Executes commands on the host system.
///
/// # Examples
///
/// ```no_run
/// use addon_packager::tools::{CommandExecutor, SystemCommandExecutor};
/// use camino::Utf8Path;
///
/// let executor = SystemCommandExecutor;
/// let output = executor.run("luacheck", &["--version"], Utf8Path::new("."))?;
/// assert!(output.status.success());
/// # Ok::<(), std::io::Error>(())
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCommandExecutor;

impl CommandExecutor for SystemCommandExecutor {
    fn run(&self, program: &str, args: &[&str], cwd: &Utf8Path) -> std::io::Result<Output> {
        Command::new(program).args(args).current_dir(cwd).output()
    }
}

/// Run `tool` plus `extra_args` in `cwd`, failing on spawn errors or a
/// non-zero exit.
///
/// # Errors
///
/// Returns [`ToolError::NotFound`] when the executable is missing,
/// [`ToolError::Spawn`] for other start-up failures, and
/// [`ToolError::Failed`] when the tool exits unsuccessfully.
pub fn run_checked(
    executor: &dyn CommandExecutor,
    tool: &ToolCommand,
    extra_args: &[&str],
    cwd: &Utf8Path,
) -> Result<(), ToolError> {
    let args: Vec<&str> = tool.args.iter().copied().chain(extra_args.iter().copied()).collect();
    let command_line = std::iter::once(tool.program)
        .chain(args.iter().copied())
        .collect::<Vec<_>>()
        .join(" ");
    info!("running {command_line} in {cwd}");

    let output = executor
        .run(tool.program, &args, cwd)
        .map_err(|source| match source.kind() {
            std::io::ErrorKind::NotFound => ToolError::NotFound {
                program: tool.program,
            },
            _ => ToolError::Spawn {
                program: tool.program,
                source,
            },
        })?;

    let combined = combined_output(&output);
    if !output.status.success() {
        return Err(ToolError::Failed {
            command: command_line,
            status: output.status.to_string(),
            output: combined,
        });
    }
    if !combined.is_empty() {
        debug!("{}: {combined}", tool.program);
    }
    Ok(())
}

/// Run the linter.
///
/// # Errors
///
/// See [`run_checked`].
pub fn lint(executor: &dyn CommandExecutor, cwd: &Utf8Path) -> Result<(), ToolError> {
    run_checked(executor, &LINT, &[], cwd)
}

/// Run the unit tests, optionally only those matching `filter`.
///
/// # Errors
///
/// See [`run_checked`].
pub fn test(
    executor: &dyn CommandExecutor,
    cwd: &Utf8Path,
    filter: Option<&str>,
) -> Result<(), ToolError> {
    match filter.filter(|pattern| !pattern.is_empty()) {
        Some(pattern) => {
            let filter_arg = format!("--filter={pattern}");
            run_checked(executor, &TEST, &[filter_arg.as_str()], cwd)
        }
        None => run_checked(executor, &TEST, &[], cwd),
    }
}

fn combined_output(output: &Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    [stdout.trim(), stderr.trim()]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{ExpectedCall, StubExecutor, failure_output};
    use rstest::rstest;

    const BUSTED_ARGS: &[&str] = &["--pattern=test_.*\\.lua", "tests"];

    fn root() -> &'static Utf8Path {
        Utf8Path::new("/work/addon")
    }

    #[test]
    fn lint_runs_luacheck_in_project_root() {
        let executor =
            StubExecutor::new(vec![ExpectedCall::new("luacheck", &["."]).in_dir(root())]);

        lint(&executor, root()).expect("lint passes");
        executor.assert_finished();
    }

    #[test]
    fn test_runs_busted_with_pattern_in_project_root() {
        let executor =
            StubExecutor::new(vec![ExpectedCall::new("busted", BUSTED_ARGS).in_dir(root())]);

        test(&executor, root(), None).expect("tests pass");
        executor.assert_finished();
    }

    #[rstest]
    #[case(Some("parser"), &["--pattern=test_.*\\.lua", "tests", "--filter=parser"])]
    #[case(Some(""), &["--pattern=test_.*\\.lua", "tests"])]
    #[case(None, &["--pattern=test_.*\\.lua", "tests"])]
    fn test_filter_is_appended_after_the_pattern(
        #[case] filter: Option<&str>,
        #[case] expected_args: &[&str],
    ) {
        let executor =
            StubExecutor::new(vec![ExpectedCall::new("busted", expected_args).in_dir(root())]);

        test(&executor, root(), filter).expect("tests pass");
        executor.assert_finished();
    }

    #[test]
    fn non_zero_exit_reports_command_and_output() {
        let executor = StubExecutor::new(vec![
            ExpectedCall::new("busted", &["--pattern=test_.*\\.lua", "tests", "--filter=io"])
                .returning(Ok(failure_output("2 successes / 1 failure"))),
        ]);

        let err = test(&executor, root(), Some("io")).expect_err("tests must fail");
        let message = err.to_string();
        assert!(
            message.starts_with("`busted --pattern=test_.*\\.lua tests --filter=io` failed"),
            "{message}"
        );
        assert!(message.contains("1 failure"), "{message}");
    }

    #[rstest]
    #[case(std::io::ErrorKind::NotFound, true)]
    #[case(std::io::ErrorKind::PermissionDenied, false)]
    fn spawn_errors_are_classified(#[case] kind: std::io::ErrorKind, #[case] not_found: bool) {
        let executor = StubExecutor::new(vec![
            ExpectedCall::new("luacheck", &["."]).returning(Err(std::io::Error::from(kind))),
        ]);

        let err = lint(&executor, root()).expect_err("must fail");
        if not_found {
            assert!(matches!(err, ToolError::NotFound { program: "luacheck" }));
        } else {
            assert!(matches!(err, ToolError::Spawn { program: "luacheck", .. }));
        }
    }

    #[test]
    fn display_joins_program_and_args() {
        assert_eq!(TEST.to_string(), "busted --pattern=test_.*\\.lua tests");
    }
}
