use clap::Parser;
use mdblock::worker::{self, error::WorkerError, toolkit::PythonToolkit};
use std::ffi::OsString;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::{filter::LevelFilter, fmt, prelude::*};

const USAGE: &str = "Usage: mdblock-worker <params_json_path>";

/// Runs the easy_md pipeline described by a parameter file and reports the
/// resulting topology and trajectory paths on stdout.
#[derive(Parser, Debug)]
#[command(version, about)]
struct WorkerArgs {
    /// JSON parameter file written by the launcher.
    params: PathBuf,

    /// Python interpreter that can import easy_md.
    #[arg(long, value_name = "PATH", default_value = worker::toolkit::DEFAULT_INTERPRETER)]
    python: PathBuf,

    /// Increase diagnostic output on stderr.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let stdout = std::io::stdout();
    let code = run_cli(std::env::args_os(), &mut stdout.lock());
    ExitCode::from(code)
}

/// Parses `argv`, runs the worker and returns the process exit code. Progress,
/// the sentinel lines and the `ERROR` lines all go to `out`.
fn run_cli<I, T>(argv: I, out: &mut impl Write) -> u8
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let args = match WorkerArgs::try_parse_from(argv) {
        Ok(args) => args,
        Err(e) if e.use_stderr() => {
            let _ = writeln!(out, "{}", USAGE);
            return 1;
        }
        Err(e) => e.exit(),
    };

    init_tracing(args.verbose);

    match run(&args, out) {
        Ok(()) => 0,
        Err(e) => {
            report(e, out);
            1
        }
    }
}

fn run(args: &WorkerArgs, out: &mut impl Write) -> Result<(), WorkerError> {
    let root = std::env::current_dir()?;
    let mut toolkit =
        PythonToolkit::new(&args.python, &args.params).with_working_dir(root.clone());
    worker::run(&args.params, &mut toolkit, &root, out)?;
    Ok(())
}

/// The error chain goes to stderr. Its backtrace is captured here, at the
/// report site, and only when `RUST_BACKTRACE` is set; the chain of sources
/// is what locates the failing stage.
fn report(e: WorkerError, out: &mut impl Write) {
    if e.is_missing_file() {
        let _ = writeln!(out, "ERROR: {}", e);
        let _ = out.flush();
        return;
    }
    let _ = writeln!(out, "ERROR during MD simulation: {}", e);
    let _ = out.flush();
    error!("Worker failed");
    eprintln!("{:?}", anyhow::Error::from(e));
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(false)
        .compact();
    // A second subscriber only happens under test harnesses; keep the first.
    let _ = tracing_subscriber::registry()
        .with(level)
        .with(stderr_layer)
        .try_init();
}
