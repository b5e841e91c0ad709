//! Process execution for resolved hook commands
//!
//! [`CommandRunner`] is the seam between the engine and the operating
//! system. [`ShellRunner`] spawns `sh -c <command>`, drains stdout and stderr
//! on reader threads, and polls the child against a [`Deadline`]. Each hook
//! runs in its own process group, and the whole group is killed when the
//! deadline expires.

use std::io::Read;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::timeout::Deadline;

/// Errors running a hook process
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HookExecutionError {
    #[error("failed to spawn '{program}': {reason}")]
    Spawn { program: String, reason: String },

    #[error("failed waiting for hook process: {0}")]
    Wait(String),

    #[error("timed out after {}s", .timeout.as_secs())]
    TimedOut { timeout: Duration },

    #[error("exited with status {code}")]
    NonZeroExit { code: i32, stderr: String },

    #[error("terminated by signal {signal}")]
    Signalled { signal: String },
}

/// Captured result of a process that ran to completion
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `None` when terminated by a signal
    pub exit_code: Option<i32>,
    /// Termination signal, e.g. "SIG9"
    pub term_signal: Option<String>,
    pub stdout: String,
    pub stderr: String,
    pub duration_ms: u64,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Map an unsuccessful termination to an error
    pub fn into_result(self) -> Result<CommandOutput, HookExecutionError> {
        match self.exit_code {
            Some(0) => Ok(self),
            Some(code) => Err(HookExecutionError::NonZeroExit {
                code,
                stderr: self.stderr,
            }),
            None => Err(HookExecutionError::Signalled {
                signal: self.term_signal.unwrap_or_else(|| "unknown".to_string()),
            }),
        }
    }
}

/// Runs a fully resolved command line.
///
/// Implementations must return `Ok` for any process that ran to completion,
/// whatever its exit status, and `Err` only for spawn, wait or timeout
/// failures.
pub trait CommandRunner: Send + Sync {
    fn run(&self, command: &str, timeout: Option<Duration>)
        -> Result<CommandOutput, HookExecutionError>;
}

impl<R: CommandRunner + ?Sized> CommandRunner for &R {
    fn run(
        &self,
        command: &str,
        timeout: Option<Duration>,
    ) -> Result<CommandOutput, HookExecutionError> {
        (**self).run(command, timeout)
    }
}

/// Shell runner configuration
#[derive(Debug, Clone)]
pub struct ShellRunner {
    /// Shell program (default: "sh")
    pub shell: String,

    /// Flag passing the command string (default: "-c")
    pub command_flag: String,

    /// Working directory (default: inherited)
    pub working_dir: Option<PathBuf>,

    /// Extra environment variables
    pub env: Vec<(String, String)>,

    /// How often the child is polled for exit
    pub poll_interval: Duration,
}

impl Default for ShellRunner {
    fn default() -> Self {
        Self {
            shell: "sh".to_string(),
            command_flag: "-c".to_string(),
            working_dir: None,
            env: Vec::new(),
            poll_interval: Duration::from_millis(20),
        }
    }
}

impl ShellRunner {
    /// `sh -c` in the current directory with the inherited environment
    pub fn new() -> Self {
        Self::default()
    }

    /// Run commands in `dir`
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Add an environment variable for spawned commands
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    fn build_command(&self, command: &str) -> Command {
        let mut cmd = Command::new(&self.shell);
        cmd.arg(&self.command_flag)
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }
        for (key, value) in &self.env {
            cmd.env(key, value);
        }
        cmd
    }
}

fn drain<R: Read + Send + 'static>(stream: Option<R>) -> JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut stream) = stream {
            let _ = stream.read_to_end(&mut buf);
        }
        String::from_utf8_lossy(&buf).into_owned()
    })
}

fn join(handle: JoinHandle<String>) -> String {
    handle.join().unwrap_or_default()
}

/// Kill the shell and everything it started, then reap the shell.
fn kill(child: &mut Child) {
    #[cfg(unix)]
    {
        use nix::sys::signal::{self, Signal};
        use nix::unistd::Pid;

        let _ = signal::killpg(Pid::from_raw(child.id() as i32), Signal::SIGKILL);
    }
    let _ = child.kill();
    let _ = child.wait();
}

impl CommandRunner for ShellRunner {
    fn run(
        &self,
        command: &str,
        timeout: Option<Duration>,
    ) -> Result<CommandOutput, HookExecutionError> {
        let deadline = Deadline::new(timeout);

        let mut child = self
            .build_command(command)
            .spawn()
            .map_err(|e| HookExecutionError::Spawn {
                program: self.shell.clone(),
                reason: e.to_string(),
            })?;

        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {}
                Err(e) => {
                    kill(&mut child);
                    return Err(HookExecutionError::Wait(e.to_string()));
                }
            }

            if deadline.check().is_timeout() {
                kill(&mut child);
                // A process that left the group may still hold the pipes; do not join.
                drop(stdout);
                drop(stderr);
                return Err(HookExecutionError::TimedOut {
                    timeout: deadline.limit().unwrap_or_default(),
                });
            }

            thread::sleep(self.poll_interval);
        };

        let term_signal = if status.code().is_none() {
            #[cfg(unix)]
            {
                use std::os::unix::process::ExitStatusExt;
                status.signal().map(|s| format!("SIG{}", s))
            }
            #[cfg(not(unix))]
            {
                None
            }
        } else {
            None
        };

        Ok(CommandOutput {
            exit_code: status.code(),
            term_signal,
            stdout: join(stdout),
            stderr: join(stderr),
            duration_ms: deadline.elapsed().as_millis() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_result() {
        let ok = CommandOutput {
            exit_code: Some(0),
            ..Default::default()
        };
        assert!(ok.clone().into_result().is_ok());
        assert!(ok.success());

        let failed = CommandOutput {
            exit_code: Some(3),
            stderr: "boom".to_string(),
            ..Default::default()
        };
        assert_eq!(
            failed.into_result(),
            Err(HookExecutionError::NonZeroExit {
                code: 3,
                stderr: "boom".to_string()
            })
        );

        let killed = CommandOutput {
            exit_code: None,
            term_signal: Some("SIG9".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            killed.into_result(),
            Err(HookExecutionError::Signalled { .. })
        ));
    }

    #[test]
    fn test_error_messages() {
        let err = HookExecutionError::TimedOut {
            timeout: Duration::from_secs(30),
        };
        assert_eq!(err.to_string(), "timed out after 30s");
    }

    #[cfg(unix)]
    #[test]
    fn test_shell_runner_captures_output() {
        let output = ShellRunner::new()
            .run("echo hello; echo oops >&2; exit 0", None)
            .unwrap();
        assert!(output.success());
        assert_eq!(output.stdout, "hello\n");
        assert_eq!(output.stderr, "oops\n");
    }

    #[cfg(unix)]
    #[test]
    fn test_shell_runner_non_zero_exit_is_ok_output() {
        let output = ShellRunner::new().run("exit 7", None).unwrap();
        assert_eq!(output.exit_code, Some(7));
        assert!(!output.success());
    }

    #[cfg(unix)]
    #[test]
    fn test_shell_runner_env_and_working_dir() {
        let dir = tempfile::TempDir::new().unwrap();
        let output = ShellRunner::new()
            .with_working_dir(dir.path())
            .with_env("HOOK_GREETING", "hi")
            .run("echo $HOOK_GREETING; touch marker", None)
            .unwrap();
        assert_eq!(output.stdout, "hi\n");
        assert!(dir.path().join("marker").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_shell_runner_times_out() {
        let err = ShellRunner::new()
            .run("exec sleep 5", Some(Duration::from_millis(100)))
            .unwrap_err();
        assert!(matches!(err, HookExecutionError::TimedOut { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_timeout_kills_background_children() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = ShellRunner::new()
            .with_working_dir(dir.path())
            .run("(sleep 1; touch leaked) & wait", Some(Duration::from_millis(200)))
            .unwrap_err();
        assert!(matches!(err, HookExecutionError::TimedOut { .. }));

        thread::sleep(Duration::from_millis(1500));
        assert!(!dir.path().join("leaked").exists());
    }

    #[test]
    fn test_spawn_failure() {
        let runner = ShellRunner {
            shell: "/nonexistent/shell".to_string(),
            ..ShellRunner::default()
        };
        let err = runner.run("true", None).unwrap_err();
        assert!(matches!(err, HookExecutionError::Spawn { .. }));
    }
}
