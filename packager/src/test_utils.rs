//! Scripted command execution for tests.
//!
//! [`StubExecutor`] replays a queue of [`ExpectedCall`]s in order, checking
//! the program, its arguments, and (when pinned) the directory it runs in.

use crate::tools::CommandExecutor;
use camino::{Utf8Path, Utf8PathBuf};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::process::{ExitStatus, Output};

/// Creates an `ExitStatus` from an exit code (Unix implementation).
#[cfg(unix)]
#[must_use]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::unix::process::ExitStatusExt;

    ExitStatus::from_raw(code << 8)
}

/// Creates an `ExitStatus` from an exit code (Windows implementation).
#[cfg(windows)]
#[must_use]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::windows::process::ExitStatusExt;

    ExitStatus::from_raw(code as u32)
}

/// Output of a tool that exited cleanly and printed nothing.
#[must_use]
pub fn success_output() -> Output {
    Output {
        status: exit_status(0),
        stdout: Vec::new(),
        stderr: Vec::new(),
    }
}

/// Output of a tool that exited with status 1 after printing `stderr`.
#[must_use]
pub fn failure_output(stderr: &str) -> Output {
    Output {
        status: exit_status(1),
        stdout: Vec::new(),
        stderr: stderr.as_bytes().to_vec(),
    }
}

/// One scripted tool invocation.
#[derive(Debug)]
pub struct ExpectedCall {
    program: String,
    args: Vec<String>,
    cwd: Option<Utf8PathBuf>,
    result: std::io::Result<Output>,
}

impl ExpectedCall {
    /// Expect `program args...` and answer with a clean exit.
    #[must_use]
    pub fn new(program: &str, args: &[&str]) -> Self {
        Self {
            program: program.to_owned(),
            args: args.iter().map(|arg| (*arg).to_owned()).collect(),
            cwd: None,
            result: Ok(success_output()),
        }
    }

    /// Also require the call to run in `cwd`.
    #[must_use]
    pub fn in_dir(mut self, cwd: &Utf8Path) -> Self {
        self.cwd = Some(cwd.to_owned());
        self
    }

    /// Answer with `result` instead of a clean exit.
    #[must_use]
    pub fn returning(mut self, result: std::io::Result<Output>) -> Self {
        self.result = result;
        self
    }
}

/// A [`CommandExecutor`] that replays scripted calls in order.
#[derive(Debug)]
pub struct StubExecutor {
    expected: RefCell<VecDeque<ExpectedCall>>,
}

impl StubExecutor {
    /// Script `expected` calls, consumed front to back.
    #[must_use]
    pub fn new(expected: Vec<ExpectedCall>) -> Self {
        Self {
            expected: RefCell::new(expected.into()),
        }
    }

    /// Asserts that every scripted call was made.
    ///
    /// # Panics
    ///
    /// Panics if any scripted call is still pending.
    pub fn assert_finished(&self) {
        let pending = self.expected.borrow();
        assert!(
            pending.is_empty(),
            "{} scripted command(s) never ran: {:?}",
            pending.len(),
            pending.iter().map(|call| &call.program).collect::<Vec<_>>()
        );
    }
}

impl CommandExecutor for StubExecutor {
    fn run(&self, program: &str, args: &[&str], cwd: &Utf8Path) -> std::io::Result<Output> {
        let call = self
            .expected
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| panic!("unexpected command: {program} {}", args.join(" ")));

        assert_eq!(call.program, program, "program mismatch");
        assert_eq!(call.args, args, "arguments mismatch for {program}");
        if let Some(expected_cwd) = &call.cwd {
            assert_eq!(expected_cwd, cwd, "{program} ran in the wrong directory");
        }
        call.result
    }
}
