//! Utility functions for executing external programs.

use crate::prelude::*;
use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;
use std::io::{Read, Write};
use std::os::unix::process::CommandExt;
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Output, Stdio};
use std::thread;
use std::time::{Duration, Instant};

/// How often a running child process is polled while waiting for it with a timeout.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Render a command as a shell-like string for log and error messages.
pub fn describe(command: &Command) -> String {
    let mut description = command.get_program().to_string_lossy().to_string();
    for arg in command.get_args() {
        description.push(' ');
        description.push_str(&arg.to_string_lossy());
    }
    description
}

/// Execute the command and return its output.
///
/// Returns an error if the program could not be started
/// or if it did not exit successfully.
/// In the latter case the error contains the exit code and the `stderr` output of the program.
pub fn run_command(mut command: Command) -> Result<Output, Error> {
    let description = describe(&command);
    let output = command
        .output()
        .with_context(|| format!("{description} could not be executed"))?;
    if output.status.success() {
        Ok(output)
    } else {
        Err(anyhow!(
            "{} failed with {}:\n{}",
            description,
            describe_status(&output.status),
            String::from_utf8_lossy(&output.stderr)
        ))
    }
}

/// Execute the command and return its `stdout` output as a string.
pub fn run_command_for_stdout(command: Command) -> Result<String, Error> {
    let output = run_command(command)?;
    String::from_utf8(output.stdout).context("Command output is not valid UTF-8")
}

/// The result of a command that was allowed to fail.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum CommandOutcome {
    /// The command exited with exit code zero.
    Success,
    /// The command exited with a non-zero exit code or was killed by a signal.
    Failed {
        /// The exit code if the program exited normally.
        code: Option<i32>,
        /// Everything the program wrote to `stderr`.
        stderr: String,
    },
    /// The command did not finish in time and was killed.
    TimedOut,
}

impl CommandOutcome {
    /// Returns `true` if the command finished successfully.
    pub fn is_success(&self) -> bool {
        matches!(self, CommandOutcome::Success)
    }
}

impl std::fmt::Display for CommandOutcome {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommandOutcome::Success => write!(formatter, "success"),
            CommandOutcome::Failed {
                code: Some(code), ..
            } => write!(formatter, "exit code {code}"),
            CommandOutcome::Failed { code: None, .. } => {
                write!(formatter, "termination by signal")
            }
            CommandOutcome::TimedOut => write!(formatter, "timeout"),
        }
    }
}

/// Execute the command with `input` written to its `stdin` and its `stdout` redirected to the file at `stdout_path`.
///
/// The equivalent shell pipeline is `echo "$input" | command > stdout_path`.
/// The command runs in its own process group.
/// If it does not finish within `timeout`, the whole group gets killed,
/// including processes the command spawned itself.
/// A non-zero exit code is not an error but reported through the returned [`CommandOutcome`].
pub fn run_piped_to_file(
    mut command: Command,
    input: &str,
    stdout_path: &Path,
    timeout: Duration,
) -> Result<CommandOutcome, Error> {
    let description = describe(&command);
    let stdout_file = std::fs::File::create(stdout_path)
        .with_context(|| format!("Could not create output file {}", stdout_path.display()))?;
    let mut child = command
        .process_group(0)
        .stdin(Stdio::piped())
        .stdout(Stdio::from(stdout_file))
        .stderr(Stdio::piped())
        .spawn()
        .with_context(|| format!("{description} could not be executed"))?;

    // Feed stdin and drain stderr on separate threads so that neither pipe can fill up and block the child.
    let mut stdin = child
        .stdin
        .take()
        .ok_or_else(|| anyhow!("stdin of {description} is not available"))?;
    let input = input.to_string();
    let stdin_writer = thread::spawn(move || {
        // A child that exits early closes the pipe. That is not an error of ours.
        let _ = stdin.write_all(input.as_bytes());
    });
    let mut stderr = child
        .stderr
        .take()
        .ok_or_else(|| anyhow!("stderr of {description} is not available"))?;
    let stderr_reader = thread::spawn(move || {
        let mut buffer = String::new();
        let _ = stderr.read_to_string(&mut buffer);
        buffer
    });

    let status = match wait_with_timeout(&mut child, timeout)? {
        Some(status) => status,
        // Descendants that escaped the process group may still hold the pipes open,
        // so the helper threads are detached instead of joined.
        None => return Ok(CommandOutcome::TimedOut),
    };
    let _ = stdin_writer.join();
    let stderr_output = stderr_reader
        .join()
        .map_err(|_| anyhow!("The stderr reader of {description} panicked"))?;

    Ok(if status.success() {
        CommandOutcome::Success
    } else {
        CommandOutcome::Failed {
            code: status.code(),
            stderr: stderr_output,
        }
    })
}

/// Wait until the child process exits or the timeout elapses.
///
/// Returns `None` if the timeout elapsed.
/// The process group led by the child is killed in that case,
/// so the child must have been spawned as a group leader.
pub fn wait_with_timeout(child: &mut Child, timeout: Duration) -> Result<Option<ExitStatus>, Error> {
    let start = Instant::now();
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if start.elapsed() >= timeout {
            let group = Pid::from_raw(
                i32::try_from(child.id()).context("Process id out of range")?,
            );
            killpg(group, Signal::SIGKILL)
                .with_context(|| format!("Could not kill process group {group}"))?;
            child.wait()?;
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

fn describe_status(status: &ExitStatus) -> String {
    match status.code() {
        Some(code) => format!("exit code {code}"),
        None => "termination by signal".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describe_command() {
        let mut command = Command::new("make");
        command.arg("-j").arg("4").arg("check");
        assert_eq!(describe(&command), "make -j 4 check");
    }

    #[test]
    fn failing_command_is_an_error() {
        let error = run_command(Command::new("false")).unwrap_err();
        assert!(format!("{error}").contains("exit code 1"));
        assert!(run_command(Command::new("this-program-does-not-exist-42")).is_err());
        assert!(run_command(Command::new("true")).is_ok());
    }

    #[test]
    fn stdout_is_captured() {
        let mut command = Command::new("echo");
        command.arg("hello");
        assert_eq!(run_command_for_stdout(command).unwrap(), "hello\n");
    }

    #[test]
    fn piped_input_reaches_output_file() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().to_path_buf();
        let out = dir.join("out.txt");
        let outcome =
            run_piped_to_file(Command::new("cat"), "I1\nI2\n", &out, Duration::from_secs(30))
                .unwrap();
        assert_eq!(outcome, CommandOutcome::Success);
        assert_eq!(std::fs::read_to_string(&out).unwrap(), "I1\nI2\n");

        let mut failing = Command::new("sh");
        failing.arg("-c").arg("echo broken >&2; exit 3");
        let outcome = run_piped_to_file(failing, "", &out, Duration::from_secs(30)).unwrap();
        assert_eq!(
            outcome,
            CommandOutcome::Failed {
                code: Some(3),
                stderr: "broken\n".to_string()
            }
        );
    }

    #[test]
    fn slow_command_times_out() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().to_path_buf();
        let mut command = Command::new("sleep");
        command.arg("10");
        let outcome = run_piped_to_file(
            command,
            "",
            &dir.join("out.txt"),
            Duration::from_millis(200),
        )
        .unwrap();
        assert_eq!(outcome, CommandOutcome::TimedOut);
    }

    #[test]
    fn timeout_kills_spawned_processes() {
        let tmp = tempfile::tempdir().unwrap();
        // The shell forks `sleep`, which inherits the stderr pipe.
        let mut command = Command::new("sh");
        command.arg("-c").arg("sleep 5; true");
        let start = Instant::now();
        let outcome = run_piped_to_file(
            command,
            "",
            &tmp.path().join("out.txt"),
            Duration::from_millis(200),
        )
        .unwrap();
        assert_eq!(outcome, CommandOutcome::TimedOut);
        assert!(start.elapsed() < Duration::from_secs(2));
    }
}
