use super::defaults::DefaultsConfig;
use super::file::FileConfig;
use super::models::AppConfig;
use crate::cli::RunArgs;
use crate::error::{CliError, Result};
use mdblock::core::params::SimulationParameters;
use mdblock::engine::environment::ExecutionEnvironment;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Merges command line flags over the config file over built-in defaults.
pub fn build_config(args: &RunArgs) -> Result<AppConfig> {
    let defaults = DefaultsConfig::default();

    let file_config = if let Some(config_path) = &args.config {
        FileConfig::from_file(config_path)?
    } else {
        FileConfig::default()
    };

    let mut file_config = apply_set_values(file_config, &args.set_values)?;
    let sim_file = file_config.simulation.take().unwrap_or_default();
    let env_file = file_config.environment.take().unwrap_or_default();

    let starting_state = args
        .starting_state
        .clone()
        .or(sim_file.starting_state_path)
        .filter(|p| !p.as_os_str().is_empty())
        .map(|p| absolute(&p))
        .transpose()?;

    let params = SimulationParameters::builder()
        .protein_file(absolute(&args.protein)?)
        .ligand_file(absolute(&args.ligand)?)
        .md_steps(
            args.md_steps
                .or(sim_file.md_steps)
                .unwrap_or(defaults.md_steps),
        )
        .md_save_interval(
            args.md_save_interval
                .or(sim_file.md_save_interval)
                .unwrap_or(defaults.md_save_interval),
        )
        .platform_name(
            args.platform
                .or(sim_file.platform_name)
                .unwrap_or(defaults.platform_name),
        )
        .platform_precision(
            args.precision
                .or(sim_file.platform_precision)
                .unwrap_or(defaults.platform_precision),
        )
        .starting_state_path(starting_state)
        .build()
        .map_err(|e| CliError::Config(e.to_string()))?;

    let runner = if args.no_runner {
        None
    } else {
        let runner = args
            .runner
            .clone()
            .or(env_file.runner.map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(&defaults.runner));
        (!runner.as_os_str().is_empty()).then_some(runner)
    };

    let program = args
        .worker
        .clone()
        .or(env_file.worker)
        .unwrap_or_else(|| default_worker_program(&defaults));

    let program_args: Vec<OsString> = if args.worker_args.is_empty() {
        env_file.worker_args.unwrap_or_default()
    } else {
        args.worker_args.clone()
    }
    .into_iter()
    .map(OsString::from)
    .collect();

    let environment = ExecutionEnvironment {
        runner,
        env_name: args
            .conda_env
            .clone()
            .or(env_file.conda_env)
            .unwrap_or(defaults.conda_env),
        program,
        program_args,
        working_dir: args.working_dir.clone().or(env_file.working_dir),
    };

    let timeout = args
        .timeout
        .or(env_file.timeout_secs)
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs);

    debug!("Resolved environment: {:?}", environment);
    Ok(AppConfig {
        params,
        environment,
        timeout,
    })
}

fn absolute(path: &Path) -> Result<PathBuf> {
    std::path::absolute(path).map_err(CliError::Io)
}

/// Prefers a worker binary installed next to this executable, falling back to
/// a `PATH` lookup inside the environment.
fn default_worker_program(defaults: &DefaultsConfig) -> PathBuf {
    let file_name = format!("{}{}", defaults.worker, std::env::consts::EXE_SUFFIX);
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(&file_name)))
        .filter(|candidate| candidate.is_file())
        .unwrap_or_else(|| PathBuf::from(&defaults.worker))
}

fn apply_set_values(mut config: FileConfig, set_values: &[String]) -> Result<FileConfig> {
    for kv_pair in set_values {
        let Some((key, value_str)) = kv_pair.split_once('=') else {
            return Err(CliError::Config(format!(
                "Invalid --set format: '{}'. Expected KEY=VALUE.",
                kv_pair
            )));
        };
        let invalid = |kind: &str| {
            CliError::Config(format!("Invalid {} value for {}: {}", kind, key, value_str))
        };

        match key {
            "simulation.md-steps" => {
                config
                    .simulation
                    .get_or_insert_with(Default::default)
                    .md_steps = Some(value_str.parse().map_err(|_| invalid("integer"))?);
            }
            "simulation.md-save-interval" => {
                config
                    .simulation
                    .get_or_insert_with(Default::default)
                    .md_save_interval = Some(value_str.parse().map_err(|_| invalid("integer"))?);
            }
            "simulation.platform-name" => {
                config
                    .simulation
                    .get_or_insert_with(Default::default)
                    .platform_name = Some(value_str.parse().map_err(|_| invalid("platform"))?);
            }
            "simulation.platform-precision" => {
                config
                    .simulation
                    .get_or_insert_with(Default::default)
                    .platform_precision =
                    Some(value_str.parse().map_err(|_| invalid("precision"))?);
            }
            "simulation.starting-state-path" => {
                config
                    .simulation
                    .get_or_insert_with(Default::default)
                    .starting_state_path = Some(PathBuf::from(value_str));
            }
            "environment.runner" => {
                config
                    .environment
                    .get_or_insert_with(Default::default)
                    .runner = Some(value_str.to_string());
            }
            "environment.conda-env" => {
                config
                    .environment
                    .get_or_insert_with(Default::default)
                    .conda_env = Some(value_str.to_string());
            }
            "environment.worker" => {
                config
                    .environment
                    .get_or_insert_with(Default::default)
                    .worker = Some(PathBuf::from(value_str));
            }
            "environment.working-dir" => {
                config
                    .environment
                    .get_or_insert_with(Default::default)
                    .working_dir = Some(PathBuf::from(value_str));
            }
            "environment.timeout-secs" => {
                config
                    .environment
                    .get_or_insert_with(Default::default)
                    .timeout_secs = Some(value_str.parse().map_err(|_| invalid("integer"))?);
            }
            _ => {
                return Err(CliError::Config(format!(
                    "Unsupported configuration key for --set: '{}'",
                    key
                )));
            }
        }
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mdblock::core::params::{Platform, Precision};
    use std::fs;
    use tempfile::tempdir;

    fn base_run_args() -> RunArgs {
        RunArgs {
            protein: PathBuf::from("/data/protein.pdb"),
            ligand: PathBuf::from("/data/ligand.sdf"),
            ..RunArgs::default()
        }
    }

    #[test]
    fn build_config_uses_defaults_for_everything_unset() {
        let app = build_config(&base_run_args()).expect("build ok");
        let defaults = DefaultsConfig::default();

        assert_eq!(app.params.protein_file, PathBuf::from("/data/protein.pdb"));
        assert_eq!(app.params.md_steps, defaults.md_steps);
        assert_eq!(app.params.md_save_interval, defaults.md_save_interval);
        assert_eq!(app.params.platform_name, Platform::Cpu);
        assert_eq!(app.params.platform_precision, Precision::Mixed);
        assert_eq!(app.params.starting_state_path, None);
        assert_eq!(app.environment.runner, Some(PathBuf::from("micromamba")));
        assert_eq!(app.environment.env_name, "easymd");
        assert!(app.environment.program.ends_with("mdblock-worker")
            || app
                .environment
                .program
                .to_string_lossy()
                .contains("mdblock-worker"));
        assert_eq!(app.timeout, None);
    }

    #[test]
    fn relative_inputs_become_absolute() {
        let args = RunArgs {
            protein: PathBuf::from("inputs/protein.pdb"),
            ligand: PathBuf::from("inputs/ligand.sdf"),
            ..RunArgs::default()
        };
        let app = build_config(&args).unwrap();
        assert!(app.params.protein_file.is_absolute());
        assert!(app.params.ligand_file.ends_with("inputs/ligand.sdf"));
    }

    #[test]
    fn build_config_reads_file_and_merges() {
        let dir = tempdir().unwrap();
        let cfg_path = dir.path().join("md.toml");
        fs::write(
            &cfg_path,
            r#"
            [simulation]
            md-steps = 5000
            platform-precision = "double"

            [environment]
            runner = ""
            conda-env = "md-env"
            worker = "/opt/bin/mdblock-worker"
            timeout-secs = 60
            "#,
        )
        .unwrap();

        let mut args = base_run_args();
        args.config = Some(cfg_path);

        let app = build_config(&args).expect("build ok");
        assert_eq!(app.params.md_steps, 5000);
        assert_eq!(app.params.md_save_interval, 10);
        assert_eq!(app.params.platform_precision, Precision::Double);
        assert_eq!(app.environment.runner, None);
        assert_eq!(app.environment.env_name, "md-env");
        assert_eq!(
            app.environment.program,
            PathBuf::from("/opt/bin/mdblock-worker")
        );
        assert_eq!(app.timeout, Some(Duration::from_secs(60)));
    }

    #[test]
    fn cli_overrides_file_values() {
        let dir = tempdir().unwrap();
        let cfg_path = dir.path().join("md.toml");
        fs::write(
            &cfg_path,
            "[simulation]\nmd-steps = 5000\nplatform-name = \"CPU\"\n\n[environment]\nconda-env = \"from-file\"\nworker-args = [\"-u\"]\n",
        )
        .unwrap();

        let mut args = base_run_args();
        args.config = Some(cfg_path);
        args.md_steps = Some(123);
        args.platform = Some(Platform::Gpu);
        args.conda_env = Some("from-cli".to_string());
        args.worker_args = vec!["--python".to_string(), "python3".to_string()];
        args.no_runner = true;

        let app = build_config(&args).unwrap();
        assert_eq!(app.params.md_steps, 123);
        assert_eq!(app.params.platform_name, Platform::Gpu);
        assert_eq!(app.environment.env_name, "from-cli");
        assert_eq!(
            app.environment.program_args,
            vec![OsString::from("--python"), OsString::from("python3")]
        );
        assert_eq!(app.environment.runner, None);
    }

    #[test]
    fn set_values_override() {
        let mut args = base_run_args();
        args.set_values = vec![
            "simulation.md-save-interval=25".to_string(),
            "simulation.platform-name=GPU".to_string(),
            "environment.runner=/usr/bin/conda".to_string(),
        ];

        let app = build_config(&args).unwrap();
        assert_eq!(app.params.md_save_interval, 25);
        assert_eq!(app.params.platform_name, Platform::Gpu);
        assert_eq!(app.environment.runner, Some(PathBuf::from("/usr/bin/conda")));
    }

    #[test]
    fn malformed_set_values_are_rejected() {
        for bad in ["no-equals-sign", "simulation.md-steps=many", "forcefield.s-factor=1.1"] {
            let mut args = base_run_args();
            args.set_values = vec![bad.to_string()];
            assert!(
                matches!(build_config(&args), Err(CliError::Config(_))),
                "accepted {bad}"
            );
        }
    }

    #[test]
    fn zero_steps_is_a_configuration_error() {
        let mut args = base_run_args();
        args.md_steps = Some(0);
        assert!(matches!(build_config(&args), Err(CliError::Config(_))));
    }

    #[test]
    fn zero_timeout_means_unbounded() {
        let mut args = base_run_args();
        args.timeout = Some(0);
        assert_eq!(build_config(&args).unwrap().timeout, None);
    }
}
