use super::executor::ExitOutcome;
use crate::core::params::{ParamsError, ParamsFileError};
use std::time::Duration;
use thiserror::Error;

const OUTPUT_TAIL_LINES: usize = 20;

#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("Invalid simulation parameters: {0}")]
    InvalidParameters(#[from] ParamsError),

    #[error("Failed to write parameter file: {0}")]
    ParameterFile(#[from] ParamsFileError),

    #[error("Failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error while running the simulation worker: {0}")]
    Io(#[from] std::io::Error),

    #[error("Simulation worker failed with {status}{}", output_tail(.output))]
    ProcessFailed {
        status: ExitOutcome,
        output: Vec<String>,
    },

    #[error("Simulation worker timed out after {}s and was killed{}", .after.as_secs(), output_tail(.output))]
    Timeout { after: Duration, output: Vec<String> },
}

impl LaunchError {
    /// The complete combined output of the child, when the failure happened
    /// after it started.
    pub fn output(&self) -> Option<&[String]> {
        match self {
            LaunchError::ProcessFailed { output, .. } | LaunchError::Timeout { output, .. } => {
                Some(output)
            }
            _ => None,
        }
    }
}

fn output_tail(output: &[String]) -> String {
    if output.is_empty() {
        return String::new();
    }
    let start = output.len().saturating_sub(OUTPUT_TAIL_LINES);
    let mut tail = String::from("\nScript output");
    if start > 0 {
        tail.push_str(&format!(" (last {} of {} lines)", OUTPUT_TAIL_LINES, output.len()));
    }
    tail.push(':');
    for line in &output[start..] {
        tail.push_str("\n  ");
        tail.push_str(line);
    }
    tail
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn process_failure_shows_status_and_output() {
        let err = LaunchError::ProcessFailed {
            status: ExitOutcome::Exited(1),
            output: vec!["ERROR: Protein file not found: /x.pdb".to_string()],
        };
        let text = err.to_string();
        assert!(text.starts_with("Simulation worker failed with exit status 1"));
        assert!(text.contains("ERROR: Protein file not found: /x.pdb"));
    }

    #[test]
    fn long_output_is_truncated_in_the_message_but_kept_on_the_error() {
        let output: Vec<String> = (0..50).map(|i| format!("line {}", i)).collect();
        let err = LaunchError::ProcessFailed {
            status: ExitOutcome::Exited(2),
            output,
        };
        let text = err.to_string();
        assert!(text.contains("last 20 of 50 lines"));
        assert!(!text.contains("line 29\n"));
        assert!(text.ends_with("line 49"));
        assert_eq!(err.output().map(<[String]>::len), Some(50));
    }
}
