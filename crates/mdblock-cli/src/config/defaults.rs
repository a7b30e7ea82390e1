use mdblock::core::params::{DEFAULT_MD_SAVE_INTERVAL, DEFAULT_MD_STEPS, Platform, Precision};
use mdblock::core::schema::DEFAULT_CONDA_ENV;
use mdblock::engine::environment::{DEFAULT_RUNNER, DEFAULT_WORKER_PROGRAM};

pub struct DefaultsConfig {
    pub md_steps: u64,
    pub md_save_interval: u64,
    pub platform_name: Platform,
    pub platform_precision: Precision,
    pub conda_env: String,
    pub runner: String,
    pub worker: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            md_steps: DEFAULT_MD_STEPS,
            md_save_interval: DEFAULT_MD_SAVE_INTERVAL,
            platform_name: Platform::Cpu,
            platform_precision: Precision::Mixed,
            conda_env: DEFAULT_CONDA_ENV.to_string(),
            runner: DEFAULT_RUNNER.to_string(),
            worker: DEFAULT_WORKER_PROGRAM.to_string(),
        }
    }
}
