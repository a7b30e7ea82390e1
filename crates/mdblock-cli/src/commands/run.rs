use crate::cli::RunArgs;
use crate::config::{AppConfig, build_config};
use crate::error::Result;
use crate::utils::progress::CliProgressHandler;
use mdblock::{
    core::{protocol::ResultPair, schema::ids},
    engine::{executor::SystemExecutor, progress::ProgressReporter},
    workflows::{block::MapBlockContext, md_simulation::MdSimulationBlock},
};
use tracing::{debug, info};

pub fn run(args: RunArgs, echo_output: bool) -> Result<()> {
    info!("Merging configuration from file and CLI arguments...");
    let config = build_config(&args)?;
    debug!("Final simulation parameters: {:?}", config.params);

    let mut ctx = block_context(&config);
    let block = MdSimulationBlock::new(SystemExecutor, config.environment.clone())
        .with_timeout(config.timeout);

    let progress_handler = CliProgressHandler::new(echo_output);
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!(
        "Starting MD pipeline in environment '{}'...",
        config.environment.env_name
    );
    let result = block.run(&mut ctx, &reporter)?;
    info!("Pipeline finished: {}", result);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result_document(&result))?);
    } else {
        println!("✓ Topology:   {}", result.topology);
        println!("✓ Trajectory: {}", result.trajectory);
    }
    Ok(())
}

/// Presents the merged configuration the way a workflow host would: inputs
/// and variables keyed by slot id.
fn block_context(config: &AppConfig) -> MapBlockContext {
    let params = &config.params;
    let starting_state = params
        .starting_state_path
        .as_ref()
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_default();

    MapBlockContext::new()
        .with_input(ids::PROTEIN_FILE, params.protein_file.to_string_lossy().into_owned())
        .with_input(ids::LIGAND_FILE, params.ligand_file.to_string_lossy().into_owned())
        .with_variable(ids::MD_STEPS, params.md_steps)
        .with_variable(ids::MD_SAVE_INTERVAL, params.md_save_interval)
        .with_variable(ids::PLATFORM_NAME, params.platform_name.as_str())
        .with_variable(ids::PLATFORM_PRECISION, params.platform_precision.as_str())
        .with_variable(ids::STARTING_STATE_PATH, starting_state)
        .with_variable(ids::CONDA_ENV, config.environment.env_name.as_str())
}

fn result_document(result: &ResultPair) -> serde_json::Value {
    let mut doc = serde_json::Map::new();
    doc.insert(ids::TOPOLOGY_OUTPUT.into(), result.topology.clone().into());
    doc.insert(ids::TRAJECTORY_OUTPUT.into(), result.trajectory.clone().into());
    serde_json::Value::Object(doc)
}
