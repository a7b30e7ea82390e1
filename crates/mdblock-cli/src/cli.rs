use clap::{Args, Parser, Subcommand};
use mdblock::core::params::{Platform, Precision};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author = "Tony Kan, Ted Yu, William A. Goddard III, Victor Wai Tak Kam",
    version,
    about = "mdblock CLI - configure and launch a molecular dynamics pipeline (solvation, force field parameterization, energy minimization, simulation) in an isolated environment.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the MD simulation setup block: solvation, parameterization, minimization and simulation.
    Run(RunArgs),
    /// Print the block's declared inputs, variables and outputs as JSON.
    Schema(SchemaArgs),
}

/// Arguments for the `run` subcommand.
#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    // --- Inputs ---
    /// Path to the protein PDB file.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub protein: PathBuf,

    /// Path to the ligand SDF file.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub ligand: PathBuf,

    /// Path to a configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    // --- Simulation Overrides ---
    /// Number of molecular dynamics simulation steps.
    #[arg(long = "steps", value_name = "INT")]
    pub md_steps: Option<u64>,

    /// Interval (in steps) for saving simulation frames.
    #[arg(long = "save-interval", value_name = "INT")]
    pub md_save_interval: Option<u64>,

    /// Computing platform: CPU or GPU.
    #[arg(long, value_name = "NAME")]
    pub platform: Option<Platform>,

    /// Numerical precision: mixed, single or double.
    #[arg(long, value_name = "PRECISION")]
    pub precision: Option<Precision>,

    /// Start the simulation from this state XML file instead of the minimized structure.
    #[arg(long, value_name = "PATH")]
    pub starting_state: Option<PathBuf>,

    // --- Environment Overrides ---
    /// Name of the conda environment containing easy_md.
    #[arg(short = 'e', long, value_name = "NAME")]
    pub conda_env: Option<String>,

    /// Environment manager used to enter the environment (e.g. micromamba, conda).
    #[arg(long, value_name = "PATH", conflicts_with = "no_runner")]
    pub runner: Option<PathBuf>,

    /// Start the worker directly, assuming the environment is already active.
    #[arg(long)]
    pub no_runner: bool,

    /// Worker program to run inside the environment.
    #[arg(long, value_name = "PATH")]
    pub worker: Option<PathBuf>,

    /// Extra argument placed before the parameter file. Can be used multiple times.
    #[arg(long = "worker-arg", value_name = "ARG", allow_hyphen_values = true)]
    pub worker_args: Vec<String>,

    /// Directory the worker runs in (its results land under `output/` there).
    #[arg(short = 'w', long, value_name = "PATH")]
    pub working_dir: Option<PathBuf>,

    /// Kill the worker if it runs longer than this many seconds.
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S simulation.md-steps=5000
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,

    /// Print the resulting output paths as a JSON object.
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `schema` subcommand.
#[derive(Args, Debug)]
pub struct SchemaArgs {
    /// Pretty-print the JSON document.
    #[arg(long)]
    pub pretty: bool,
}
