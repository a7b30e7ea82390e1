use indicatif::{ProgressBar, ProgressStyle};
use mdblock::engine::progress::{Progress, ProgressCallback};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, warn};

const SPINNER_TICK_MS: u64 = 80;

/// Spinner on stderr naming the worker's current stage. Worker output is
/// echoed above the spinner unless `echo_output` is off.
#[derive(Clone)]
pub struct CliProgressHandler {
    pb: Arc<Mutex<ProgressBar>>,
    echo_output: bool,
}

impl CliProgressHandler {
    pub fn new(echo_output: bool) -> Self {
        let pb = ProgressBar::new_spinner()
            .with_style(Self::spinner_style())
            .with_message("Initializing...");
        pb.set_draw_target(indicatif::ProgressDrawTarget::stderr());
        pb.disable_steady_tick();
        pb.finish_and_clear();

        Self {
            pb: Arc::new(Mutex::new(pb)),
            echo_output,
        }
    }

    pub fn get_callback(&self) -> ProgressCallback<'static> {
        let pb_clone = self.pb.clone();
        let echo_output = self.echo_output;

        Box::new(move |progress: Progress| {
            let Ok(mut pb_guard) = pb_clone.lock() else {
                warn!("Progress bar mutex was poisoned. Cannot update progress.");
                return;
            };

            match progress {
                Progress::Spawned { command } => {
                    debug!("Worker started: {}", command);
                    pb_guard.reset();
                    pb_guard.set_style(Self::spinner_style());
                    pb_guard.enable_steady_tick(Duration::from_millis(SPINNER_TICK_MS));
                    pb_guard.set_message("Starting worker...");
                }
                Progress::Stage { name } => {
                    pb_guard.set_message(name);
                }
                Progress::Output(line) => {
                    if echo_output {
                        if pb_guard.is_finished() {
                            eprintln!("  {}", line);
                        } else {
                            pb_guard.println(format!("  {}", line));
                        }
                    }
                }
                Progress::Exited { code } => {
                    pb_guard.disable_steady_tick();
                    match code {
                        Some(0) => pb_guard.finish_with_message("✓ Done"),
                        Some(code) => {
                            pb_guard.abandon_with_message(format!("✗ Worker exited with {}", code))
                        }
                        None => pb_guard.abandon_with_message("✗ Worker was terminated"),
                    }
                }
            }
        })
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::with_template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
    }
}

impl Default for CliProgressHandler {
    fn default() -> Self {
        Self::new(true)
    }
}
