//! The child side of a run: load the parameter file, check the inputs, drive
//! the toolkit, locate its artifacts and report them on stdout.

pub mod error;
pub mod outputs;
pub mod pipeline;
pub mod toolkit;

use crate::core::params::SimulationParameters;
use crate::core::protocol::{ResultPair, SentinelKey, format_sentinel};
use error::WorkerError;
use outputs::OutputResolver;
use std::io::Write;
use std::path::Path;
use toolkit::MdToolkit;
use tracing::{info, instrument};

const RULE: &str = "==================================================";

/// Runs the whole worker state machine.
///
/// `root` is the directory the toolkit writes its `output/` folder into. All
/// progress text and the two sentinel lines are written to `out`. Artifacts
/// that cannot be located are reported with placeholder text and do not fail
/// the run.
#[instrument(skip_all, name = "md_worker", fields(params = %params_path.display()))]
pub fn run<T: MdToolkit>(
    params_path: &Path,
    toolkit: &mut T,
    root: &Path,
    out: &mut impl Write,
) -> Result<ResultPair, WorkerError> {
    let params = SimulationParameters::from_json_path(params_path).map_err(|source| {
        WorkerError::ParameterFile {
            path: params_path.to_path_buf(),
            source,
        }
    })?;

    write_header(out, params_path, &params)?;
    pipeline::validate_inputs(&params)?;
    pipeline::run_stages(&params, toolkit, out)?;

    let resolved = OutputResolver::new(root)?.resolve(out)?;
    let result = resolved.to_result_pair();

    writeln!(out)?;
    writeln!(out, "{}", RULE)?;
    writeln!(out, "MD SIMULATION SETUP COMPLETED SUCCESSFULLY!")?;
    writeln!(out, "{}", RULE)?;
    writeln!(out, "{}", format_sentinel(SentinelKey::Topology, &result.topology))?;
    writeln!(
        out,
        "{}",
        format_sentinel(SentinelKey::Trajectory, &result.trajectory)
    )?;
    out.flush()?;

    info!("Worker finished; reported {:?}", result);
    Ok(result)
}

fn write_header(
    out: &mut impl Write,
    params_path: &Path,
    params: &SimulationParameters,
) -> std::io::Result<()> {
    writeln!(out, "MD Simulation Script Started")?;
    writeln!(out, "{}", RULE)?;
    writeln!(out, "Parameters loaded from: {}", params_path.display())?;
    writeln!(out, "Protein file: {}", params.protein_file.display())?;
    writeln!(out, "Ligand file: {}", params.ligand_file.display())?;
    writeln!(out, "MD steps: {}", params.md_steps)?;
    writeln!(out, "Save interval: {}", params.md_save_interval)?;
    writeln!(out, "Platform: {}", params.platform_name)?;
    writeln!(out, "Precision: {}", params.platform_precision)?;
    if let Some(state) = &params.starting_state_path {
        writeln!(out, "Starting state: {}", state.display())?;
    }
    writeln!(out, "{}", RULE)
}
