use crate::core::schema::DEFAULT_CONDA_ENV;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

pub const DEFAULT_RUNNER: &str = "micromamba";
pub const DEFAULT_WORKER_PROGRAM: &str = "mdblock-worker";

/// A fully specified child command, independent of how it gets spawned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: OsString,
    pub args: Vec<OsString>,
    pub working_dir: Option<PathBuf>,
}

impl CommandSpec {
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// The command line joined by spaces, for logs only.
    pub fn display(&self) -> String {
        std::iter::once(&self.program)
            .chain(self.args.iter())
            .map(|part| part.to_string_lossy())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Where and how the worker runs.
///
/// With a runner configured the worker is started as
/// `<runner> run -n <env_name> <program> <program_args...> <params>`; without one
/// the program is started directly, which suits hosts that already activated
/// the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionEnvironment {
    pub runner: Option<PathBuf>,
    pub env_name: String,
    pub program: PathBuf,
    pub program_args: Vec<OsString>,
    pub working_dir: Option<PathBuf>,
}

impl Default for ExecutionEnvironment {
    fn default() -> Self {
        Self {
            runner: Some(PathBuf::from(DEFAULT_RUNNER)),
            env_name: DEFAULT_CONDA_ENV.to_string(),
            program: PathBuf::from(DEFAULT_WORKER_PROGRAM),
            program_args: Vec::new(),
            working_dir: None,
        }
    }
}

impl ExecutionEnvironment {
    pub fn direct(program: impl Into<PathBuf>) -> Self {
        Self {
            runner: None,
            program: program.into(),
            ..Self::default()
        }
    }

    pub fn with_env_name(mut self, name: impl Into<String>) -> Self {
        self.env_name = name.into();
        self
    }

    pub fn with_program_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.program_args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn command_for(&self, params_path: &Path) -> CommandSpec {
        let command = match &self.runner {
            Some(runner) => CommandSpec::new(runner)
                .args(["run", "-n"])
                .arg(&self.env_name)
                .arg(&self.program),
            None => CommandSpec::new(&self.program),
        };
        CommandSpec {
            working_dir: self.working_dir.clone(),
            ..command.args(&self.program_args).arg(params_path)
        }
    }
}
