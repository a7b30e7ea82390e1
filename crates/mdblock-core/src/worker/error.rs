use super::pipeline::Stage;
use super::toolkit::ToolkitError;
use crate::core::params::ParamsFileError;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Protein,
    Ligand,
    StartingState,
}

impl fmt::Display for InputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            InputKind::Protein => "Protein",
            InputKind::Ligand => "Ligand",
            InputKind::StartingState => "Starting state",
        })
    }
}

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Failed to load parameters from '{}': {source}", .path.display())]
    ParameterFile {
        path: PathBuf,
        #[source]
        source: ParamsFileError,
    },

    #[error("{kind} file not found: {}", .path.display())]
    InputNotFound { kind: InputKind, path: PathBuf },

    #[error("{stage} failed: {source}")]
    Stage {
        stage: Stage,
        #[source]
        source: ToolkitError,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    /// Whether this is the "a declared file does not exist" class of failure,
    /// as opposed to an unexpected error during the pipeline.
    pub fn is_missing_file(&self) -> bool {
        match self {
            WorkerError::InputNotFound { .. } => true,
            WorkerError::ParameterFile {
                source: ParamsFileError::Io(e),
                ..
            } => e.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }
}
