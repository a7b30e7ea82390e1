//! Declarative description of the block as a host sees it: named, typed slots
//! with defaults and allowed values. Hosts consume this through an adapter; the
//! block never depends on a particular host framework.

use crate::core::params::{DEFAULT_MD_SAVE_INTERVAL, DEFAULT_MD_STEPS, Platform, Precision};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

pub const BLOCK_ID: &str = "md_simulation_setup";
pub const DEFAULT_CONDA_ENV: &str = "easymd";

pub mod ids {
    pub const PROTEIN_FILE: &str = "protein_file";
    pub const LIGAND_FILE: &str = "ligand_file";
    pub const MD_STEPS: &str = "md_steps";
    pub const MD_SAVE_INTERVAL: &str = "md_save_interval";
    pub const PLATFORM_NAME: &str = "platform_name";
    pub const PLATFORM_PRECISION: &str = "platform_precision";
    pub const STARTING_STATE_PATH: &str = "starting_state_path";
    pub const CONDA_ENV: &str = "conda_env";
    pub const TOPOLOGY_OUTPUT: &str = "topology_output";
    pub const TRAJECTORY_OUTPUT: &str = "trajectory_output";
}

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum SchemaError {
    #[error("Variable '{id}' expects {expected}, got {found}")]
    TypeMismatch {
        id: &'static str,
        expected: VariableType,
        found: String,
    },

    #[error("Variable '{id}' does not allow '{value}' (allowed: {allowed})")]
    NotAllowed {
        id: &'static str,
        value: String,
        allowed: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VariableType {
    File,
    Integer,
    String,
    StringList,
}

impl std::fmt::Display for VariableType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            VariableType::File => "a file path",
            VariableType::Integer => "an integer",
            VariableType::String => "a string",
            VariableType::StringList => "one of a list of strings",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginVariable {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    #[serde(rename = "type")]
    pub kind: VariableType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub allowed_values: Vec<&'static str>,
}

impl PluginVariable {
    fn new(
        id: &'static str,
        name: &'static str,
        description: &'static str,
        kind: VariableType,
    ) -> Self {
        Self {
            id,
            name,
            description,
            kind,
            default_value: None,
            allowed_values: Vec::new(),
        }
    }

    fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    fn with_allowed(mut self, values: &[&'static str]) -> Self {
        self.allowed_values = values.to_vec();
        self
    }

    /// Checks a host-supplied value against the slot's type and, for string
    /// lists, its allowed values. For file slots the allowed values are
    /// extension hints and are not enforced.
    pub fn check(&self, value: &Value) -> Result<(), SchemaError> {
        let mismatch = || SchemaError::TypeMismatch {
            id: self.id,
            expected: self.kind,
            found: value.to_string(),
        };
        match self.kind {
            VariableType::Integer => {
                value.as_i64().ok_or_else(mismatch)?;
            }
            VariableType::File | VariableType::String => {
                value.as_str().ok_or_else(mismatch)?;
            }
            VariableType::StringList => {
                let text = value.as_str().ok_or_else(mismatch)?;
                if !self.allowed_values.is_empty() && !self.allowed_values.contains(&text) {
                    return Err(SchemaError::NotAllowed {
                        id: self.id,
                        value: text.to_string(),
                        allowed: self.allowed_values.join(", "),
                    });
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PluginBlockSpec {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub category: &'static str,
    pub inputs: Vec<PluginVariable>,
    pub variables: Vec<PluginVariable>,
    pub outputs: Vec<PluginVariable>,
}

impl PluginBlockSpec {
    pub fn variable(&self, id: &str) -> Option<&PluginVariable> {
        self.variables.iter().find(|v| v.id == id)
    }

    pub fn input(&self, id: &str) -> Option<&PluginVariable> {
        self.inputs.iter().find(|v| v.id == id)
    }
}

/// The MD simulation setup block.
pub fn md_simulation_block() -> PluginBlockSpec {
    let platforms: Vec<&'static str> = Platform::ALL.iter().map(Platform::as_str).collect();
    let precisions: Vec<&'static str> = Precision::ALL.iter().map(Precision::as_str).collect();

    PluginBlockSpec {
        id: BLOCK_ID,
        name: "MD Simulation Setup",
        description: "Sets up and runs a complete molecular dynamics simulation including \
                      solvation, force field parameterization, energy minimization, and simulation.",
        category: "Molecular Dynamics",
        inputs: vec![
            PluginVariable::new(
                ids::PROTEIN_FILE,
                "Protein File",
                "Path to the protein PDB file.",
                VariableType::File,
            ),
            PluginVariable::new(
                ids::LIGAND_FILE,
                "Ligand File",
                "Path to the ligand SDF file.",
                VariableType::File,
            ),
        ],
        variables: vec![
            PluginVariable::new(
                ids::MD_STEPS,
                "MD Steps",
                "Number of molecular dynamics simulation steps.",
                VariableType::Integer,
            )
            .with_default(DEFAULT_MD_STEPS),
            PluginVariable::new(
                ids::MD_SAVE_INTERVAL,
                "MD Save Interval",
                "Interval for saving simulation frames.",
                VariableType::Integer,
            )
            .with_default(DEFAULT_MD_SAVE_INTERVAL),
            PluginVariable::new(
                ids::PLATFORM_NAME,
                "Platform Name",
                "Computing platform to use (CPU or GPU).",
                VariableType::StringList,
            )
            .with_default(Platform::default().as_str())
            .with_allowed(&platforms),
            PluginVariable::new(
                ids::PLATFORM_PRECISION,
                "Platform Precision",
                "Numerical precision for calculations (mixed, single, or double).",
                VariableType::StringList,
            )
            .with_default(Precision::default().as_str())
            .with_allowed(&precisions),
            PluginVariable::new(
                ids::STARTING_STATE_PATH,
                "Starting State Path",
                "Optional path to starting state XML file for simulation.",
                VariableType::File,
            )
            .with_allowed(&["xml"]),
            PluginVariable::new(
                ids::CONDA_ENV,
                "Conda Environment",
                "Name of the conda environment containing easy_md.",
                VariableType::String,
            )
            .with_default(DEFAULT_CONDA_ENV),
        ],
        outputs: vec![
            PluginVariable::new(
                ids::TOPOLOGY_OUTPUT,
                "Topology File",
                "Path to the generated topology file (.pdb or .prmtop).",
                VariableType::File,
            )
            .with_allowed(&["*"]),
            PluginVariable::new(
                ids::TRAJECTORY_OUTPUT,
                "Trajectory File",
                "Path to the generated trajectory file (.dcd or .nc).",
                VariableType::File,
            )
            .with_allowed(&["*"]),
        ],
    }
}
