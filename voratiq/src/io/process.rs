//! Helpers for running child processes with output streamed to files.
//!
//! Children inherit nothing implicitly: the environment is cleared and
//! replaced by the map the caller passes in, and stdout/stderr go straight to
//! the log files the caller opened. Nothing is buffered in memory.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};
use std::thread;

use thiserror::Error;
use tracing::{debug, error, instrument, warn};

/// Explicit child environment, built once per invocation.
pub type ProcessEnv = BTreeMap<String, String>;

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("wait for {program}: {source}")]
    Wait {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("prepare output for {program}: {source}")]
    Output {
        program: String,
        #[source]
        source: io::Error,
    },
}

/// Snapshot of the current process environment.
///
/// Non-UTF-8 keys or values are converted lossily.
pub fn ambient_env() -> ProcessEnv {
    std::env::vars_os()
        .map(|(key, value)| {
            (
                key.to_string_lossy().into_owned(),
                value.to_string_lossy().into_owned(),
            )
        })
        .collect()
}

/// Build the command that runs an agent binary with its final argv.
pub fn agent_command(binary: &Path, argv: &[String], cwd: &Path, env: &ProcessEnv) -> Command {
    let mut cmd = Command::new(binary);
    cmd.args(argv).current_dir(cwd).env_clear().envs(env);
    cmd
}

/// Build `<shell> -c <command>` running in `cwd`.
pub fn shell_command(shell: &str, command: &str, cwd: &Path, env: &ProcessEnv) -> Command {
    let mut cmd = Command::new(shell);
    cmd.arg("-c")
        .arg(command)
        .current_dir(cwd)
        .env_clear()
        .envs(env);
    cmd
}

/// Run `cmd` to completion with stdout/stderr redirected to files.
///
/// When `stdin` is given it is written from a helper thread and the pipe is
/// closed afterwards. A child that exits without reading its input is not an
/// error.
#[instrument(skip_all, fields(program = %cmd.get_program().to_string_lossy()))]
pub fn run_to_files(
    mut cmd: Command,
    stdin: Option<&[u8]>,
    stdout: File,
    stderr: File,
) -> Result<ExitStatus, ProcessError> {
    let program = cmd.get_program().to_string_lossy().to_string();
    if stdin.is_some() {
        cmd.stdin(Stdio::piped());
    } else {
        cmd.stdin(Stdio::null());
    }
    cmd.stdout(Stdio::from(stdout)).stderr(Stdio::from(stderr));

    debug!("spawning child process");
    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(source) => {
            error!(err = %source, "failed to spawn command");
            return Err(ProcessError::Spawn { program, source });
        }
    };

    let writer = match (stdin, child.stdin.take()) {
        (Some(input), Some(mut pipe)) => {
            let input = input.to_vec();
            Some(thread::spawn(move || {
                let result = pipe.write_all(&input);
                drop(pipe);
                result
            }))
        }
        _ => None,
    };

    let status = child
        .wait()
        .map_err(|source| ProcessError::Wait { program, source })?;

    if let Some(handle) = writer {
        match handle.join() {
            Ok(Ok(())) => {}
            Ok(Err(err)) if err.kind() == io::ErrorKind::BrokenPipe => {
                debug!("child closed stdin before reading all input");
            }
            Ok(Err(err)) => warn!(err = %err, "write child stdin"),
            Err(_) => warn!("stdin writer thread panicked"),
        }
    }

    debug!(exit_code = ?status.code(), signal = ?exit_signal(&status), "command finished");
    Ok(status)
}

/// Words a POSIX shell handles itself; they never name a program on `PATH`.
const SHELL_BUILTINS: &[&str] = &[
    "!", ".", ":", "[", "alias", "break", "case", "cd", "command", "continue", "eval", "exec",
    "exit", "export", "false", "for", "if", "read", "return", "set", "shift", "source", "test",
    "trap", "true", "umask", "unset", "until", "wait", "while",
];

const SHELL_SPECIAL_CHARS: &str = "$`'\"\\*?;&|<>(){}~";

/// First word of a shell command when it names an external program.
///
/// Builtins, variable assignments and anything using shell syntax are left
/// for the shell to interpret.
fn command_program(command: &str) -> Option<&str> {
    let word = command.split_whitespace().next()?;
    if word.contains('=')
        || SHELL_BUILTINS.contains(&word)
        || word.contains(|c: char| SHELL_SPECIAL_CHARS.contains(c))
    {
        return None;
    }
    Some(word)
}

/// Describe why the program `command` starts with cannot be found, if so.
///
/// Paths are resolved against `cwd`; bare names are looked up on the `PATH`
/// in `env`. Returns `None` whenever the shell should be left to decide.
pub fn missing_command_program(command: &str, cwd: &Path, env: &ProcessEnv) -> Option<String> {
    let program = command_program(command)?;
    if program.contains('/') {
        if cwd.join(program).exists() {
            return None;
        }
        return Some(format!("{program}: No such file or directory"));
    }
    let search_path = env.get("PATH")?;
    match which::which_in(program, Some(search_path), cwd) {
        Ok(_) => None,
        Err(_) => Some(format!("{program}: command not found")),
    }
}

/// Run `cmd` with stdout and stderr interleaved into one log file.
pub fn run_to_log(cmd: Command, log: File) -> Result<ExitStatus, ProcessError> {
    let program = cmd.get_program().to_string_lossy().to_string();
    let stderr = log
        .try_clone()
        .map_err(|source| ProcessError::Output { program, source })?;
    run_to_files(cmd, None, log, stderr)
}

/// Signal that terminated the process, if any.
pub fn exit_signal(status: &ExitStatus) -> Option<i32> {
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        status.signal()
    }
    #[cfg(not(unix))]
    {
        let _ = status;
        None
    }
}

/// Short human description of how a process ended.
pub fn describe_exit(status: &ExitStatus) -> String {
    match (status.code(), exit_signal(status)) {
        (Some(code), _) => format!("exit code {code}"),
        (None, Some(signal)) => format!("terminated by signal {signal}"),
        (None, None) => "terminated without exit code".to_string(),
    }
}
