use mdblock::core::params::SimulationParameters;
use mdblock::engine::environment::ExecutionEnvironment;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub params: SimulationParameters,
    pub environment: ExecutionEnvironment,
    pub timeout: Option<Duration>,
}
