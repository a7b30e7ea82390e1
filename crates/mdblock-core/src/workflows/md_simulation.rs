use super::block::BlockContext;
use crate::core::params::{ParamsError, Platform, Precision, SimulationParameters};
use crate::core::protocol::ResultPair;
use crate::core::schema::{PluginBlockSpec, PluginVariable, SchemaError, ids, md_simulation_block};
use crate::engine::environment::ExecutionEnvironment;
use crate::engine::error::LaunchError;
use crate::engine::executor::Executor;
use crate::engine::launcher::Launcher;
use crate::engine::progress::ProgressReporter;
use serde_json::Value;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, instrument};

#[derive(Debug, Error)]
pub enum BlockError {
    #[error("{0} path is required.")]
    MissingInput(&'static str),

    #[error("Block does not declare a slot named '{0}'")]
    UnknownSlot(&'static str),

    #[error("Invalid block value: {0}")]
    Schema(#[from] SchemaError),

    #[error("Invalid simulation parameters: {0}")]
    Params(#[from] ParamsError),

    #[error("Error running MD simulation script: {0}")]
    Launch(#[from] LaunchError),
}

/// The MD simulation setup block bound to a process executor and a base
/// environment. The environment name is taken from the block's `conda_env`
/// variable on every run.
pub struct MdSimulationBlock<E: Executor> {
    spec: PluginBlockSpec,
    executor: E,
    environment: ExecutionEnvironment,
    timeout: Option<Duration>,
}

impl<E: Executor> MdSimulationBlock<E> {
    pub fn new(executor: E, environment: ExecutionEnvironment) -> Self {
        Self {
            spec: md_simulation_block(),
            executor,
            environment,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn spec(&self) -> &PluginBlockSpec {
        &self.spec
    }

    /// The block action: read inputs and variables, launch, publish outputs.
    ///
    /// Missing protein or ligand inputs fail before any file is written or any
    /// process is started.
    #[instrument(skip_all, name = "md_simulation_block")]
    pub fn run<C: BlockContext>(
        &self,
        ctx: &mut C,
        reporter: &ProgressReporter,
    ) -> Result<ResultPair, BlockError> {
        let protein = self.required_input(ctx, ids::PROTEIN_FILE, "Protein file")?;
        let ligand = self.required_input(ctx, ids::LIGAND_FILE, "Ligand file")?;

        let md_steps = self.integer(ctx, ids::MD_STEPS)?;
        let md_save_interval = self.integer(ctx, ids::MD_SAVE_INTERVAL)?;
        let platform: Platform = self.text(ctx, ids::PLATFORM_NAME)?.parse()?;
        let precision: Precision = self.text(ctx, ids::PLATFORM_PRECISION)?.parse()?;
        let starting_state = self.text(ctx, ids::STARTING_STATE_PATH)?;
        let env_name = self.text(ctx, ids::CONDA_ENV)?;

        let params = SimulationParameters::builder()
            .protein_file(protein)
            .ligand_file(ligand)
            .md_steps(md_steps)
            .md_save_interval(md_save_interval)
            .platform_name(platform)
            .platform_precision(precision)
            .starting_state_path(Some(PathBuf::from(starting_state)))
            .build()?;

        let environment = if env_name.is_empty() {
            self.environment.clone()
        } else {
            self.environment.clone().with_env_name(env_name)
        };
        let launcher = Launcher::new(&self.executor, environment).with_timeout(self.timeout);
        let result = launcher.launch(&params, reporter)?;

        ctx.set_output(ids::TOPOLOGY_OUTPUT, result.topology.clone());
        ctx.set_output(ids::TRAJECTORY_OUTPUT, result.trajectory.clone());
        info!("Block outputs published.");
        Ok(result)
    }

    fn required_input<C: BlockContext>(
        &self,
        ctx: &C,
        id: &'static str,
        label: &'static str,
    ) -> Result<String, BlockError> {
        let slot = self.spec.input(id).ok_or(BlockError::UnknownSlot(id))?;
        let value = match ctx.input(id) {
            None | Some(Value::Null) => return Err(BlockError::MissingInput(label)),
            Some(value) => value,
        };
        slot.check(value)?;
        match value.as_str() {
            Some(path) if !path.is_empty() => Ok(path.to_string()),
            _ => Err(BlockError::MissingInput(label)),
        }
    }

    /// The host's value for a variable, or the schema default when the host
    /// left it unset. Variables without a default read as null.
    fn resolved<C: BlockContext>(
        &self,
        ctx: &C,
        id: &'static str,
    ) -> Result<(&PluginVariable, Value), BlockError> {
        let slot = self.spec.variable(id).ok_or(BlockError::UnknownSlot(id))?;
        let value = match ctx.variable(id) {
            Some(value) if !value.is_null() => value.clone(),
            _ => slot.default_value.clone().unwrap_or(Value::Null),
        };
        if !value.is_null() {
            slot.check(&value)?;
        }
        Ok((slot, value))
    }

    fn integer<C: BlockContext>(&self, ctx: &C, id: &'static str) -> Result<u64, BlockError> {
        let (_, value) = self.resolved(ctx, id)?;
        value.as_u64().ok_or_else(|| {
            BlockError::Params(ParamsError::InvalidParameter {
                name: id,
                reason: format!("must be a positive integer, got {}", value),
            })
        })
    }

    fn text<C: BlockContext>(&self, ctx: &C, id: &'static str) -> Result<String, BlockError> {
        let (_, value) = self.resolved(ctx, id)?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }
}
