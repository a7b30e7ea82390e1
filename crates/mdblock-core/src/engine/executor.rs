use super::environment::CommandSpec;
use std::fmt;
use std::io::{self, Read};
use std::process::{Child, Command, Stdio};

/// How a child process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitOutcome {
    Exited(i32),
    /// Killed before producing an exit code (by a signal on unix).
    Terminated(Option<i32>),
}

impl ExitOutcome {
    pub fn success(&self) -> bool {
        matches!(self, ExitOutcome::Exited(0))
    }

    pub fn code(&self) -> Option<i32> {
        match self {
            ExitOutcome::Exited(code) => Some(*code),
            ExitOutcome::Terminated(_) => None,
        }
    }
}

impl fmt::Display for ExitOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitOutcome::Exited(code) => write!(f, "exit status {}", code),
            ExitOutcome::Terminated(Some(signal)) => write!(f, "termination by signal {}", signal),
            ExitOutcome::Terminated(None) => f.write_str("termination without exit status"),
        }
    }
}

impl From<std::process::ExitStatus> for ExitOutcome {
    fn from(status: std::process::ExitStatus) -> Self {
        if let Some(code) = status.code() {
            return ExitOutcome::Exited(code);
        }
        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            ExitOutcome::Terminated(status.signal())
        }
        #[cfg(not(unix))]
        {
            ExitOutcome::Terminated(None)
        }
    }
}

/// Control over a running child: the launcher only ever waits for it, polls
/// it, or kills it.
pub trait ProcessControl: Send {
    fn wait(&mut self) -> io::Result<ExitOutcome>;
    /// The exit status if the child has already exited, without blocking.
    fn try_wait(&mut self) -> io::Result<Option<ExitOutcome>>;
    /// Kills the direct child only. Processes it started itself (the toolkit
    /// interpreter under an environment runner) are not signalled.
    fn kill(&mut self) -> io::Result<()>;
}

/// A started child: one reader carrying stdout and stderr merged in emission
/// order, plus its control handle.
pub struct Spawned {
    pub output: Box<dyn Read + Send>,
    pub process: Box<dyn ProcessControl>,
}

/// Starts child processes. The launcher is generic over this so hosts and
/// tests can substitute their own process model.
pub trait Executor {
    fn spawn(&self, command: &CommandSpec) -> io::Result<Spawned>;
}

impl<E: Executor + ?Sized> Executor for &E {
    fn spawn(&self, command: &CommandSpec) -> io::Result<Spawned> {
        (**self).spawn(command)
    }
}

/// Spawns real OS processes.
///
/// Both stdout and stderr of the child are attached to the write end of the
/// same pipe, so lines arrive in the order the child wrote them.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemExecutor;

impl Executor for SystemExecutor {
    fn spawn(&self, command: &CommandSpec) -> io::Result<Spawned> {
        let (reader, writer) = io::pipe()?;

        // The Command owns the parent's copies of the write end; it has to be
        // dropped before reading or the stream never reaches EOF.
        let child = {
            let mut cmd = Command::new(&command.program);
            cmd.args(&command.args)
                .env("PYTHONUNBUFFERED", "1")
                .stdin(Stdio::null())
                .stdout(writer.try_clone()?)
                .stderr(writer);
            if let Some(dir) = &command.working_dir {
                cmd.current_dir(dir);
            }
            cmd.spawn()?
        };

        Ok(Spawned {
            output: Box::new(reader),
            process: Box::new(ChildProcess(child)),
        })
    }
}

struct ChildProcess(Child);

impl ProcessControl for ChildProcess {
    fn wait(&mut self) -> io::Result<ExitOutcome> {
        self.0.wait().map(ExitOutcome::from)
    }

    fn try_wait(&mut self) -> io::Result<Option<ExitOutcome>> {
        Ok(self.0.try_wait()?.map(ExitOutcome::from))
    }

    fn kill(&mut self) -> io::Result<()> {
        self.0.kill()
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader};

    fn sh(script: &str) -> CommandSpec {
        CommandSpec::new("/bin/sh").args(["-c", script])
    }

    #[test]
    fn merges_stdout_and_stderr_in_emission_order() {
        let Spawned { output, mut process } = SystemExecutor
            .spawn(&sh("echo one; echo two >&2; echo three"))
            .unwrap();

        let lines: Vec<String> = BufReader::new(output).lines().map(Result::unwrap).collect();
        assert_eq!(lines, ["one", "two", "three"]);
        assert_eq!(process.wait().unwrap(), ExitOutcome::Exited(0));
    }

    #[test]
    fn reports_non_zero_exit_codes() {
        let Spawned { output, mut process } = SystemExecutor.spawn(&sh("exit 3")).unwrap();
        drop(output);
        let outcome = process.wait().unwrap();
        assert_eq!(outcome, ExitOutcome::Exited(3));
        assert!(!outcome.success());
        assert_eq!(outcome.to_string(), "exit status 3");
    }

    #[test]
    fn honours_the_working_directory() {
        let dir = tempfile::tempdir().unwrap();
        let mut command = sh("pwd");
        command.working_dir = Some(dir.path().to_path_buf());

        let Spawned { output, mut process } = SystemExecutor.spawn(&command).unwrap();
        let mut printed = String::new();
        BufReader::new(output).read_line(&mut printed).unwrap();
        process.wait().unwrap();

        let printed = std::fs::canonicalize(printed.trim()).unwrap();
        assert_eq!(printed, std::fs::canonicalize(dir.path()).unwrap());
    }

    #[test]
    fn try_wait_does_not_block_on_a_running_child() {
        let Spawned { output, mut process } = SystemExecutor.spawn(&sh("exec sleep 30")).unwrap();
        assert_eq!(process.try_wait().unwrap(), None);

        process.kill().unwrap();
        drop(output);
        assert!(!process.wait().unwrap().success());
    }

    #[test]
    fn missing_program_fails_to_spawn() {
        let result = SystemExecutor.spawn(&CommandSpec::new("/definitely/not/here"));
        assert!(result.is_err());
    }
}
