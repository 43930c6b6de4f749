//! External command execution.
//!
//! The pipeline shells out to exactly two tools: the source-control
//! executable (captured output) and the package manager (streamed output).
//! Both go through `Cmd` so failures surface as `BuildError::Process` with
//! the command line and stderr attached.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::error::BuildError;

/// Captured result of a finished command.
#[derive(Debug)]
pub struct CommandOutput {
    pub code: i32,
    pub stdout: Vec<u8>,
    pub stderr: String,
}

/// Builder for one blocking external command.
pub struct Cmd {
    program: String,
    args: Vec<String>,
    current_dir: Option<PathBuf>,
}

impl Cmd {
    pub fn new(program: impl AsRef<str>) -> Self {
        Self {
            program: program.as_ref().to_string(),
            args: Vec::new(),
            current_dir: None,
        }
    }

    pub fn arg(mut self, arg: impl AsRef<str>) -> Self {
        self.args.push(arg.as_ref().to_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for arg in args {
            self.args.push(arg.as_ref().to_string());
        }
        self
    }

    pub fn dir(mut self, dir: &Path) -> Self {
        self.current_dir = Some(dir.to_path_buf());
        self
    }

    /// The command line as it will be reported in errors.
    pub fn command_line(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }

    /// Run with captured stdout/stderr. Non-zero exit is an error.
    pub fn run(self) -> Result<CommandOutput, BuildError> {
        let command_line = self.command_line();
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        if let Some(ref dir) = self.current_dir {
            cmd.current_dir(dir);
        }

        let output = cmd.output().map_err(|_| BuildError::Process {
            command: command_line.clone(),
            code: None,
            stderr: String::new(),
        })?;

        let result = CommandOutput {
            code: output.status.code().unwrap_or(-1),
            stdout: output.stdout,
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };

        if !output.status.success() {
            return Err(BuildError::Process {
                command: command_line,
                code: Some(result.code),
                stderr: result.stderr,
            });
        }

        Ok(result)
    }

    /// Run with inherited stdio so the tool's own output reaches the
    /// terminal unmodified. Only the exit status is interpreted.
    pub fn run_streaming(self) -> Result<(), BuildError> {
        let command_line = self.command_line();
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd.stdin(Stdio::inherit());
        cmd.stdout(Stdio::inherit());
        cmd.stderr(Stdio::inherit());
        if let Some(ref dir) = self.current_dir {
            cmd.current_dir(dir);
        }

        let status = cmd.status().map_err(|_| BuildError::Process {
            command: command_line.clone(),
            code: None,
            stderr: String::new(),
        })?;

        if !status.success() {
            return Err(BuildError::Process {
                command: command_line,
                code: Some(status.code().unwrap_or(-1)),
                stderr: String::new(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn run_captures_stdout() {
        let result = Cmd::new("echo").arg("hello").run().unwrap();
        assert_eq!(result.code, 0);
        assert_eq!(String::from_utf8_lossy(&result.stdout).trim(), "hello");
    }

    #[test]
    fn run_in_directory() {
        let result = Cmd::new("pwd").dir(Path::new("/tmp")).run().unwrap();
        assert!(String::from_utf8_lossy(&result.stdout).contains("tmp"));
    }

    #[test]
    fn nonzero_exit_is_a_process_error() {
        let err = Cmd::new("sh")
            .args(["-c", "echo broken >&2; exit 3"])
            .run()
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("exit code 3"));
        assert!(msg.contains("broken"));
    }

    #[test]
    fn missing_program_is_a_launch_failure() {
        let err = Cmd::new("pharbuild-no-such-program-12345").run().unwrap_err();
        assert!(err.to_string().contains("failed to start"));
    }

    #[test]
    fn command_line_includes_args() {
        let cmd = Cmd::new("composer").args(["install", "--no-dev"]);
        assert_eq!(cmd.command_line(), "composer install --no-dev");
    }

    #[test]
    fn streaming_reports_exit_code() {
        let err = Cmd::new("sh")
            .args(["-c", "exit 7"])
            .run_streaming()
            .unwrap_err();
        assert!(err.to_string().contains("exit code 7"));
    }
}
