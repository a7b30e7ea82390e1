use super::environment::{CommandSpec, ExecutionEnvironment};
use super::error::LaunchError;
use super::executor::{Executor, ExitOutcome, ProcessControl, Spawned};
use super::progress::{Progress, ProgressReporter, stage_header};
use crate::core::params::{ParamsFileError, SimulationParameters};
use crate::core::protocol::{ResultPair, SentinelCapture};
use std::io::{self, BufRead, BufReader, Read};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};
use tempfile::TempPath;
use tracing::{debug, info, instrument, warn};

const PARAMS_FILE_PREFIX: &str = "mdblock-params-";
const PARAMS_FILE_SUFFIX: &str = ".json";
const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Everything observed about one child run.
#[derive(Debug, Clone)]
pub struct ProcessInvocation {
    pub command: String,
    pub output: Vec<String>,
    pub status: ExitOutcome,
    pub result: ResultPair,
}

/// Host-side orchestration of one simulation run.
///
/// Each [`launch`](Launcher::launch) writes one temporary parameter file,
/// spawns one worker process inside the configured environment and blocks
/// until that process exits (or the optional timeout elapses).
pub struct Launcher<E: Executor> {
    executor: E,
    environment: ExecutionEnvironment,
    timeout: Option<Duration>,
}

impl<E: Executor> Launcher<E> {
    pub fn new(executor: E, environment: ExecutionEnvironment) -> Self {
        Self {
            executor,
            environment,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn environment(&self) -> &ExecutionEnvironment {
        &self.environment
    }

    /// Runs the pipeline and returns the two reported artifact paths.
    ///
    /// Values the worker never reported come back as empty strings; only a
    /// non-zero exit (or a timeout) is a failure. The parameter file is
    /// removed on every path out of this function.
    #[instrument(skip_all, name = "md_launch", fields(env = %self.environment.env_name))]
    pub fn launch(
        &self,
        params: &SimulationParameters,
        reporter: &ProgressReporter,
    ) -> Result<ResultPair, LaunchError> {
        params.validate()?;

        let params_file = write_params_file(params)?;
        debug!("Parameter file written to {:?}", &*params_file);

        info!(
            "Created configuration for protein: {}",
            params.protein_file.display()
        );
        info!("Ligand: {}", params.ligand_file.display());
        info!(
            "MD Steps: {}, Save Interval: {}",
            params.md_steps, params.md_save_interval
        );
        info!(
            "Platform: {}, Precision: {}",
            params.platform_name, params.platform_precision
        );
        info!("Using environment: {}", self.environment.env_name);

        let command = self.environment.command_for(&params_file);
        let invocation = self.run_child(&command, reporter);
        remove_params_file(params_file);
        let invocation = invocation?;

        if !invocation.status.success() {
            warn!(
                "Simulation worker failed with {} after {} line(s) of output.",
                invocation.status,
                invocation.output.len()
            );
            return Err(LaunchError::ProcessFailed {
                status: invocation.status,
                output: invocation.output,
            });
        }

        info!("MD simulation completed!");
        info!("Topology file: {}", invocation.result.topology);
        info!("Trajectory file: {}", invocation.result.trajectory);
        Ok(invocation.result)
    }

    fn run_child(
        &self,
        command: &CommandSpec,
        reporter: &ProgressReporter,
    ) -> Result<ProcessInvocation, LaunchError> {
        let command_line = command.display();
        info!("Starting MD simulation...");
        info!("Command: {}", command_line);

        let deadline = self.timeout.and_then(|after| match Instant::now().checked_add(after) {
            Some(at) => Some(Deadline { after, at }),
            None => {
                warn!("Timeout of {:?} is out of range; waiting without a limit.", after);
                None
            }
        });

        let Spawned {
            output,
            mut process,
        } = self
            .executor
            .spawn(command)
            .map_err(|source| LaunchError::Spawn {
                program: command.program.to_string_lossy().into_owned(),
                source,
            })?;
        reporter.report(Progress::Spawned {
            command: command_line.clone(),
        });

        let lines = match spawn_forwarder(output) {
            Ok(lines) => lines,
            Err(e) => {
                abort(process.as_mut());
                return Err(e.into());
            }
        };

        let mut capture = SentinelCapture::new();
        let mut output = Vec::new();

        loop {
            let received = match &deadline {
                Some(deadline) => match lines.recv_timeout(deadline.remaining()) {
                    Ok(item) => item,
                    Err(RecvTimeoutError::Disconnected) => break,
                    Err(RecvTimeoutError::Timeout) => {
                        return Err(deadline.expire(process.as_mut(), output));
                    }
                },
                None => match lines.recv() {
                    Ok(item) => item,
                    Err(_) => break,
                },
            };

            let line = match received {
                Ok(line) => line,
                Err(e) => {
                    abort(process.as_mut());
                    return Err(e.into());
                }
            };

            debug!("{}", line);
            if let Some(stage) = stage_header(&line) {
                reporter.report(Progress::Stage {
                    name: stage.to_string(),
                });
            }
            if let Some(key) = capture.observe(&line) {
                debug!("Captured {:?} from worker output.", key);
            }
            reporter.report(Progress::Output(line.clone()));
            output.push(line);
        }

        let status = match &deadline {
            Some(deadline) => match wait_until(process.as_mut(), deadline.at) {
                Ok(Some(status)) => status,
                Ok(None) => return Err(deadline.expire(process.as_mut(), output)),
                Err(e) => {
                    abort(process.as_mut());
                    return Err(e.into());
                }
            },
            None => process.wait()?,
        };
        reporter.report(Progress::Exited {
            code: status.code(),
        });

        Ok(ProcessInvocation {
            command: command_line,
            output,
            status,
            result: capture.into_result(),
        })
    }
}

/// A timeout that fits on the clock.
struct Deadline {
    after: Duration,
    at: Instant,
}

impl Deadline {
    fn remaining(&self) -> Duration {
        self.at.saturating_duration_since(Instant::now())
    }

    fn expire(&self, process: &mut dyn ProcessControl, output: Vec<String>) -> LaunchError {
        warn!("Simulation worker exceeded {:?}; killing it.", self.after);
        abort(process);
        LaunchError::Timeout {
            after: self.after,
            output,
        }
    }
}

/// Polls for the exit status until `at`. `None` means the child was still
/// running when the deadline passed.
fn wait_until(process: &mut dyn ProcessControl, at: Instant) -> io::Result<Option<ExitOutcome>> {
    loop {
        if let Some(status) = process.try_wait()? {
            return Ok(Some(status));
        }
        let now = Instant::now();
        if now >= at {
            return Ok(None);
        }
        thread::sleep(EXIT_POLL_INTERVAL.min(at - now));
    }
}

fn write_params_file(params: &SimulationParameters) -> Result<TempPath, LaunchError> {
    let mut file = tempfile::Builder::new()
        .prefix(PARAMS_FILE_PREFIX)
        .suffix(PARAMS_FILE_SUFFIX)
        .tempfile()
        .map_err(ParamsFileError::from)?;
    params.write_json(file.as_file_mut())?;
    Ok(file.into_temp_path())
}

fn remove_params_file(path: TempPath) {
    let shown = path.to_path_buf();
    match path.close() {
        Ok(()) => debug!("Removed parameter file {:?}", shown),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!("Parameter file {:?} was already gone.", shown)
        }
        Err(e) => warn!("Could not remove parameter file {:?}: {}", shown, e),
    }
}

/// Moves lines from the merged output pipe into a channel so the launcher can
/// bound its wait. Lines are decoded lossily and stripped of trailing
/// whitespace.
fn spawn_forwarder(output: Box<dyn Read + Send>) -> io::Result<Receiver<io::Result<String>>> {
    let (sender, receiver) = mpsc::channel();
    thread::Builder::new()
        .name("mdblock-output".to_string())
        .spawn(move || {
            let mut reader = BufReader::new(output);
            let mut buf = Vec::new();
            loop {
                buf.clear();
                let item = match reader.read_until(b'\n', &mut buf) {
                    Ok(0) => return,
                    Ok(_) => Ok(String::from_utf8_lossy(&buf).trim_end().to_string()),
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(e) => Err(e),
                };
                let failed = item.is_err();
                if sender.send(item).is_err() || failed {
                    return;
                }
            }
        })?;
    Ok(receiver)
}

fn abort(process: &mut dyn ProcessControl) {
    if let Err(e) = process.kill() {
        warn!("Failed to kill simulation worker: {}", e);
    }
    if let Err(e) = process.wait() {
        warn!("Failed to reap simulation worker: {}", e);
    }
}
