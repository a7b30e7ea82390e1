use super::error::{InputKind, WorkerError};
use super::toolkit::{MdToolkit, ToolkitError};
use crate::core::params::SimulationParameters;
use std::fmt;
use std::io::Write;
use std::path::Path;
use tracing::info;

/// Worker states. Each run moves strictly forward through these; any failure
/// leaves the machine and ends the run with an error report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Start,
    Validate,
    Configure,
    Solvate,
    Parameterize,
    Minimize,
    Simulate,
    ResolveOutputs,
    Report,
}

impl Stage {
    pub fn next(self) -> Option<Stage> {
        use Stage::*;
        match self {
            Start => Some(Validate),
            Validate => Some(Configure),
            Configure => Some(Solvate),
            Solvate => Some(Parameterize),
            Parameterize => Some(Minimize),
            Minimize => Some(Simulate),
            Simulate => Some(ResolveOutputs),
            ResolveOutputs => Some(Report),
            Report => None,
        }
    }

    /// Position among the toolkit stages, as shown in `Step N:` headers.
    pub fn step_number(self) -> Option<usize> {
        match self {
            Stage::Configure => Some(1),
            Stage::Solvate => Some(2),
            Stage::Parameterize => Some(3),
            Stage::Minimize => Some(4),
            Stage::Simulate => Some(5),
            _ => None,
        }
    }

    fn announcement(self) -> &'static str {
        match self {
            Stage::Configure => "Creating configuration",
            Stage::Solvate => "Adding water (solvation)",
            Stage::Parameterize => "Running force field parameterization",
            Stage::Minimize => "Running energy minimization",
            Stage::Simulate => "Running MD simulation",
            _ => "",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Start => "Start",
            Stage::Validate => "Input validation",
            Stage::Configure => "Configuration",
            Stage::Solvate => "Solvation",
            Stage::Parameterize => "Force field parameterization",
            Stage::Minimize => "Energy minimization",
            Stage::Simulate => "Simulation",
            Stage::ResolveOutputs => "Output resolution",
            Stage::Report => "Report",
        })
    }
}

/// Checks that every declared input file exists before any toolkit work.
pub fn validate_inputs(params: &SimulationParameters) -> Result<(), WorkerError> {
    let mut required = vec![
        (InputKind::Protein, params.protein_file.as_path()),
        (InputKind::Ligand, params.ligand_file.as_path()),
    ];
    if let Some(state) = &params.starting_state_path {
        required.push((InputKind::StartingState, state.as_path()));
    }

    for (kind, path) in required {
        if !path.exists() {
            return Err(WorkerError::InputNotFound {
                kind,
                path: path.to_path_buf(),
            });
        }
    }
    Ok(())
}

/// Runs configuration, solvation, parameterization, minimization and the
/// simulation, in that order. The first failing stage aborts the run.
pub fn run_stages<T: MdToolkit>(
    params: &SimulationParameters,
    toolkit: &mut T,
    out: &mut impl Write,
) -> Result<(), WorkerError> {
    let config = step(out, Stage::Configure, || toolkit.create_config(params))?;
    writeln!(out, "✓ Configuration created successfully")?;

    step(out, Stage::Solvate, || toolkit.add_water(&config))?;
    writeln!(out, "✓ Solvation completed successfully")?;

    step(out, Stage::Parameterize, || toolkit.parameterize(&config))?;
    writeln!(out, "✓ Force field parameterization completed successfully")?;

    step(out, Stage::Minimize, || toolkit.minimize(&config))?;
    writeln!(out, "✓ Energy minimization completed successfully")?;

    let starting_state: Option<&Path> = params.starting_state_path.as_deref();
    step(out, Stage::Simulate, || toolkit.simulate(&config, starting_state))?;
    match starting_state {
        Some(state) => writeln!(
            out,
            "✓ Simulation completed successfully with initial state: {}",
            state.display()
        )?,
        None => writeln!(
            out,
            "✓ Simulation completed successfully from minimized structure"
        )?,
    }
    Ok(())
}

fn step<R>(
    out: &mut impl Write,
    stage: Stage,
    call: impl FnOnce() -> Result<R, ToolkitError>,
) -> Result<R, WorkerError> {
    if stage != Stage::Configure {
        writeln!(out)?;
    }
    writeln!(
        out,
        "Step {}: {}...",
        stage.step_number().unwrap_or_default(),
        stage.announcement()
    )?;
    // Toolkit children write to the same stream; keep our lines ahead of theirs.
    out.flush()?;
    info!("Entering stage: {}", stage);

    call().map_err(|source| WorkerError::Stage { stage, source })
}
