use crate::core::params::SimulationParameters;
use crate::engine::executor::ExitOutcome;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tempfile::TempPath;
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_INTERPRETER: &str = "python";

#[derive(Debug, Error)]
pub enum ToolkitError {
    #[error("Failed to start toolkit interpreter '{program}': {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Toolkit entry point '{entry_point}' ended with {status}")]
    EntryPointFailed {
        entry_point: &'static str,
        status: ExitOutcome,
    },

    #[error("{0}")]
    Other(String),
}

/// The external MD toolkit's entry points, in the order the pipeline calls them.
///
/// `create_config` produces whatever handle the toolkit needs for the later
/// stages; every other entry point receives it back.
pub trait MdToolkit {
    type Config;

    fn create_config(&mut self, params: &SimulationParameters)
    -> Result<Self::Config, ToolkitError>;
    fn add_water(&mut self, config: &Self::Config) -> Result<(), ToolkitError>;
    fn parameterize(&mut self, config: &Self::Config) -> Result<(), ToolkitError>;
    fn minimize(&mut self, config: &Self::Config) -> Result<(), ToolkitError>;
    fn simulate(
        &mut self,
        config: &Self::Config,
        starting_state: Option<&Path>,
    ) -> Result<(), ToolkitError>;
}

/// Drives `easy_md` through a Python interpreter of the active environment.
///
/// Each entry point runs as its own `python -u -c <driver> <entry> <params>
/// <state>` child that inherits stdout and stderr, so the toolkit's own output
/// joins the worker's stream. `create_config` builds the toolkit's config
/// object once and pickles it into the state file; every later entry point
/// loads that object, runs, and pickles it back, so all stages share one
/// config exactly as a single interpreter would.
#[derive(Debug, Clone)]
pub struct PythonToolkit {
    interpreter: PathBuf,
    params_path: PathBuf,
    working_dir: Option<PathBuf>,
}

/// Handle passed between entry points. Dropping it removes the state file.
#[derive(Debug)]
pub struct PythonConfig {
    params_path: PathBuf,
    state_path: TempPath,
}

impl PythonConfig {
    pub fn state_path(&self) -> &Path {
        &self.state_path
    }
}

const STATE_FILE_PREFIX: &str = "mdblock-config-";
const STATE_FILE_SUFFIX: &str = ".pkl";

const DRIVER: &str = r#"
import json, os, pickle, sys
from easy_md.utils.config import create_config
from easy_md.main import (
    run_solvation,
    run_forcefield_parameterization,
    run_energy_minimization,
    run_simulation,
)

entry, params_path, state_path = sys.argv[1], sys.argv[2], sys.argv[3]
with open(params_path, "r") as f:
    p = json.load(f)

if entry == "create_config":
    config = create_config(
        protein_file=p["protein_file"],
        ligand_file=p["ligand_file"],
        md_steps=p["md_steps"],
        md_save_interval=p["md_save_interval"],
        platform_name=p["platform_name"],
        platform_precision=p["platform_precision"],
    )
else:
    with open(state_path, "rb") as f:
        config = pickle.load(f)

if entry == "add_water":
    run_solvation.add_water(config=config)
elif entry == "parameterize":
    run_forcefield_parameterization.main(config)
elif entry == "minimize":
    run_energy_minimization.main(config)
elif entry == "simulate":
    if p["starting_state_path"]:
        run_simulation.main(config, starting_state_path=p["starting_state_path"])
    else:
        run_simulation.main(config)
elif entry != "create_config":
    raise SystemExit("unknown entry point: " + entry)

with open(state_path, "wb") as f:
    pickle.dump(config, f)
"#;

impl PythonToolkit {
    pub fn new(interpreter: impl Into<PathBuf>, params_path: impl Into<PathBuf>) -> Self {
        Self {
            interpreter: interpreter.into(),
            params_path: params_path.into(),
            working_dir: None,
        }
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    fn call(
        &self,
        entry_point: &'static str,
        params_path: &Path,
        state_path: &Path,
    ) -> Result<(), ToolkitError> {
        let mut cmd = Command::new(&self.interpreter);
        cmd.args(["-u", "-c", DRIVER, entry_point])
            .arg(params_path)
            .arg(state_path)
            .stdin(Stdio::null());
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }
        debug!("Calling toolkit entry point '{}'", entry_point);

        let status = cmd.status().map_err(|source| ToolkitError::Launch {
            program: self.interpreter.display().to_string(),
            source,
        })?;
        let status = ExitOutcome::from(status);
        if status.success() {
            Ok(())
        } else {
            Err(ToolkitError::EntryPointFailed {
                entry_point,
                status,
            })
        }
    }
}

impl MdToolkit for PythonToolkit {
    type Config = PythonConfig;

    fn create_config(
        &mut self,
        _params: &SimulationParameters,
    ) -> Result<Self::Config, ToolkitError> {
        let state_path = tempfile::Builder::new()
            .prefix(STATE_FILE_PREFIX)
            .suffix(STATE_FILE_SUFFIX)
            .tempfile()
            .map_err(|e| ToolkitError::Other(format!("Failed to create toolkit state file: {}", e)))?
            .into_temp_path();
        self.call("create_config", &self.params_path, &state_path)?;
        Ok(PythonConfig {
            params_path: self.params_path.clone(),
            state_path,
        })
    }

    fn add_water(&mut self, config: &Self::Config) -> Result<(), ToolkitError> {
        self.call("add_water", &config.params_path, &config.state_path)
    }

    fn parameterize(&mut self, config: &Self::Config) -> Result<(), ToolkitError> {
        self.call("parameterize", &config.params_path, &config.state_path)
    }

    fn minimize(&mut self, config: &Self::Config) -> Result<(), ToolkitError> {
        self.call("minimize", &config.params_path, &config.state_path)
    }

    // The starting state travels inside the parameter file; the driver reads it
    // from there.
    fn simulate(
        &mut self,
        config: &Self::Config,
        _starting_state: Option<&Path>,
    ) -> Result<(), ToolkitError> {
        self.call("simulate", &config.params_path, &config.state_path)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    /// Writes a fake interpreter that records its entry point and state file
    /// arguments (`$4` and `$6` after `-u -c <driver>`) and fails on demand.
    fn fake_interpreter(dir: &Path, fail_on: &str) -> PathBuf {
        let log = dir.join("calls.log");
        let script = dir.join("fake-python");
        std::fs::write(
            &script,
            format!(
                "#!/bin/sh\necho \"$4 $6\" >> '{}'\n[ \"$4\" = \"{}\" ] && exit 4\nexit 0\n",
                log.display(),
                fail_on
            ),
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        script
    }

    fn params() -> SimulationParameters {
        SimulationParameters::builder()
            .protein_file("p.pdb")
            .ligand_file("l.sdf")
            .build()
            .unwrap()
    }

    #[test]
    fn entry_points_are_called_with_their_names() {
        let dir = tempfile::tempdir().unwrap();
        let interpreter = fake_interpreter(dir.path(), "none");
        let mut toolkit = PythonToolkit::new(&interpreter, dir.path().join("params.json"));

        let config = toolkit.create_config(&params()).unwrap();
        toolkit.add_water(&config).unwrap();
        toolkit.parameterize(&config).unwrap();
        toolkit.minimize(&config).unwrap();
        toolkit.simulate(&config, None).unwrap();

        let calls = std::fs::read_to_string(dir.path().join("calls.log")).unwrap();
        let entries: Vec<_> = calls
            .lines()
            .map(|line| line.split_once(' ').unwrap().0)
            .collect();
        assert_eq!(
            entries,
            ["create_config", "add_water", "parameterize", "minimize", "simulate"]
        );
    }

    #[test]
    fn every_stage_shares_the_config_state_file() {
        let dir = tempfile::tempdir().unwrap();
        let interpreter = fake_interpreter(dir.path(), "none");
        let mut toolkit = PythonToolkit::new(&interpreter, dir.path().join("params.json"));

        let config = toolkit.create_config(&params()).unwrap();
        let state_path = config.state_path().to_path_buf();
        toolkit.add_water(&config).unwrap();
        toolkit.simulate(&config, None).unwrap();
        assert!(state_path.exists());

        let calls = std::fs::read_to_string(dir.path().join("calls.log")).unwrap();
        let states: Vec<_> = calls
            .lines()
            .map(|line| line.split_once(' ').unwrap().1)
            .collect();
        assert_eq!(states.len(), 3);
        assert!(states.iter().all(|s| Path::new(s) == state_path));

        drop(config);
        assert!(!state_path.exists());
    }

    #[test]
    fn non_zero_interpreter_exit_is_an_entry_point_failure() {
        let dir = tempfile::tempdir().unwrap();
        let interpreter = fake_interpreter(dir.path(), "minimize");
        let mut toolkit = PythonToolkit::new(&interpreter, dir.path().join("params.json"));
        let config = toolkit.create_config(&params()).unwrap();

        let err = toolkit.minimize(&config).unwrap_err();
        match err {
            ToolkitError::EntryPointFailed {
                entry_point,
                status,
            } => {
                assert_eq!(entry_point, "minimize");
                assert_eq!(status, ExitOutcome::Exited(4));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_interpreter_is_a_launch_error() {
        let mut toolkit = PythonToolkit::new("/no/such/python", "params.json");
        let err = toolkit.create_config(&params()).unwrap_err();
        assert!(matches!(err, ToolkitError::Launch { .. }));
    }
}
