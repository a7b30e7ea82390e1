use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

pub const DEFAULT_MD_STEPS: u64 = 1000;
pub const DEFAULT_MD_SAVE_INTERVAL: u64 = 10;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ParamsError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("Invalid value for '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

#[derive(Debug, Error)]
pub enum ParamsFileError {
    #[error("I/O error on parameter file: {0}")]
    Io(#[from] io::Error),

    #[error("Malformed parameter file: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Invalid(#[from] ParamsError),
}

/// Compute platform the toolkit runs the simulation on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Platform {
    #[default]
    #[serde(rename = "CPU")]
    Cpu,
    #[serde(rename = "GPU")]
    Gpu,
}

impl Platform {
    pub const ALL: [Platform; 2] = [Platform::Cpu, Platform::Gpu];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Cpu => "CPU",
            Platform::Gpu => "GPU",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = ParamsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Platform::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| ParamsError::InvalidParameter {
                name: "platform_name",
                reason: format!("'{}' is not one of CPU, GPU", s),
            })
    }
}

/// Floating point precision used by the simulation platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Precision {
    #[default]
    Mixed,
    Single,
    Double,
}

impl Precision {
    pub const ALL: [Precision; 3] = [Precision::Mixed, Precision::Single, Precision::Double];

    pub fn as_str(&self) -> &'static str {
        match self {
            Precision::Mixed => "mixed",
            Precision::Single => "single",
            Precision::Double => "double",
        }
    }
}

impl fmt::Display for Precision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Precision {
    type Err = ParamsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Precision::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| ParamsError::InvalidParameter {
                name: "platform_precision",
                reason: format!("'{}' is not one of mixed, single, double", s),
            })
    }
}

/// The flat record handed from the launcher to the worker through the JSON
/// parameter file.
///
/// Field names are the wire keys of the parameter file. An absent starting
/// state is written as the empty string, and the empty string reads back as
/// absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationParameters {
    pub protein_file: PathBuf,
    pub ligand_file: PathBuf,
    pub md_steps: u64,
    pub md_save_interval: u64,
    pub platform_name: Platform,
    pub platform_precision: Precision,
    #[serde(default, with = "empty_as_none")]
    pub starting_state_path: Option<PathBuf>,
}

impl SimulationParameters {
    pub fn builder() -> SimulationParametersBuilder {
        SimulationParametersBuilder::new()
    }

    /// Checks the invariants every record must satisfy before it is handed to
    /// a worker.
    pub fn validate(&self) -> Result<(), ParamsError> {
        if self.protein_file.as_os_str().is_empty() {
            return Err(ParamsError::MissingParameter("protein_file"));
        }
        if self.ligand_file.as_os_str().is_empty() {
            return Err(ParamsError::MissingParameter("ligand_file"));
        }
        if self.md_steps == 0 {
            return Err(ParamsError::InvalidParameter {
                name: "md_steps",
                reason: "must be a positive integer".to_string(),
            });
        }
        if self.md_save_interval == 0 {
            return Err(ParamsError::InvalidParameter {
                name: "md_save_interval",
                reason: "must be a positive integer".to_string(),
            });
        }
        Ok(())
    }

    pub fn write_json(&self, writer: &mut impl Write) -> Result<(), ParamsFileError> {
        serde_json::to_writer_pretty(&mut *writer, self)?;
        writer.flush()?;
        Ok(())
    }

    pub fn write_json_path<P: AsRef<Path>>(&self, path: P) -> Result<(), ParamsFileError> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.write_json(&mut writer)
    }

    /// Reads a parameter file and validates the record it contains.
    pub fn from_json_path<P: AsRef<Path>>(path: P) -> Result<Self, ParamsFileError> {
        let reader = BufReader::new(File::open(path)?);
        let params: Self = serde_json::from_reader(reader)?;
        params.validate()?;
        Ok(params)
    }
}

#[derive(Default)]
pub struct SimulationParametersBuilder {
    protein_file: Option<PathBuf>,
    ligand_file: Option<PathBuf>,
    md_steps: Option<u64>,
    md_save_interval: Option<u64>,
    platform_name: Option<Platform>,
    platform_precision: Option<Precision>,
    starting_state_path: Option<PathBuf>,
}

impl SimulationParametersBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn protein_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.protein_file = Some(path.into());
        self
    }
    pub fn ligand_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.ligand_file = Some(path.into());
        self
    }
    pub fn md_steps(mut self, steps: u64) -> Self {
        self.md_steps = Some(steps);
        self
    }
    pub fn md_save_interval(mut self, interval: u64) -> Self {
        self.md_save_interval = Some(interval);
        self
    }
    pub fn platform_name(mut self, platform: Platform) -> Self {
        self.platform_name = Some(platform);
        self
    }
    pub fn platform_precision(mut self, precision: Precision) -> Self {
        self.platform_precision = Some(precision);
        self
    }
    pub fn starting_state_path(mut self, path: Option<PathBuf>) -> Self {
        self.starting_state_path = path.filter(|p| !p.as_os_str().is_empty());
        self
    }

    pub fn build(self) -> Result<SimulationParameters, ParamsError> {
        let params = SimulationParameters {
            protein_file: self
                .protein_file
                .ok_or(ParamsError::MissingParameter("protein_file"))?,
            ligand_file: self
                .ligand_file
                .ok_or(ParamsError::MissingParameter("ligand_file"))?,
            md_steps: self.md_steps.unwrap_or(DEFAULT_MD_STEPS),
            md_save_interval: self.md_save_interval.unwrap_or(DEFAULT_MD_SAVE_INTERVAL),
            platform_name: self.platform_name.unwrap_or_default(),
            platform_precision: self.platform_precision.unwrap_or_default(),
            starting_state_path: self.starting_state_path,
        };
        params.validate()?;
        Ok(params)
    }
}

mod empty_as_none {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::path::PathBuf;

    pub fn serialize<S: Serializer>(value: &Option<PathBuf>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(path) => match path.to_str() {
                Some(text) => s.serialize_str(text),
                None => Err(serde::ser::Error::custom(
                    "starting_state_path must be valid UTF-8",
                )),
            },
            None => s.serialize_str(""),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<PathBuf>, D::Error> {
        let raw = Option::<String>::deserialize(d)?;
        Ok(raw.filter(|s| !s.is_empty()).map(PathBuf::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn sample() -> SimulationParameters {
        SimulationParameters::builder()
            .protein_file("/data/protein.pdb")
            .ligand_file("/data/ligand.sdf")
            .build()
            .unwrap()
    }

    #[test]
    fn builder_applies_documented_defaults() {
        let params = sample();
        assert_eq!(params.md_steps, 1000);
        assert_eq!(params.md_save_interval, 10);
        assert_eq!(params.platform_name, Platform::Cpu);
        assert_eq!(params.platform_precision, Precision::Mixed);
        assert_eq!(params.starting_state_path, None);
    }

    #[test]
    fn builder_rejects_missing_mandatory_paths() {
        let err = SimulationParameters::builder()
            .ligand_file("l.sdf")
            .build()
            .unwrap_err();
        assert_eq!(err, ParamsError::MissingParameter("protein_file"));

        let err = SimulationParameters::builder()
            .protein_file("p.pdb")
            .ligand_file("")
            .build()
            .unwrap_err();
        assert_eq!(err, ParamsError::MissingParameter("ligand_file"));
    }

    #[test]
    fn builder_rejects_zero_counts() {
        let err = SimulationParameters::builder()
            .protein_file("p.pdb")
            .ligand_file("l.sdf")
            .md_save_interval(0)
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            ParamsError::InvalidParameter {
                name: "md_save_interval",
                ..
            }
        ));
    }

    #[test]
    fn empty_starting_state_is_treated_as_absent() {
        let params = SimulationParameters::builder()
            .protein_file("p.pdb")
            .ligand_file("l.sdf")
            .starting_state_path(Some(PathBuf::new()))
            .build()
            .unwrap();
        assert_eq!(params.starting_state_path, None);
    }

    #[test]
    fn json_document_has_exactly_the_wire_keys() {
        let mut buf = Vec::new();
        sample().write_json(&mut buf).unwrap();
        let value: Value = serde_json::from_slice(&buf).unwrap();
        let object = value.as_object().unwrap();

        let mut keys: Vec<&str> = object.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(
            keys,
            vec![
                "ligand_file",
                "md_save_interval",
                "md_steps",
                "platform_name",
                "platform_precision",
                "protein_file",
                "starting_state_path",
            ]
        );
        assert_eq!(object["md_steps"], Value::from(1000));
        assert_eq!(object["platform_name"], Value::from("CPU"));
        assert_eq!(object["platform_precision"], Value::from("mixed"));
        assert_eq!(object["starting_state_path"], Value::from(""));
    }

    #[test]
    fn parameter_file_round_trip_preserves_every_field() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("params.json");
        let original = SimulationParameters::builder()
            .protein_file("/data/protein.pdb")
            .ligand_file("/data/ligand.sdf")
            .md_steps(250_000)
            .md_save_interval(500)
            .platform_name(Platform::Gpu)
            .platform_precision(Precision::Double)
            .starting_state_path(Some(PathBuf::from("/data/state.xml")))
            .build()
            .unwrap();

        original.write_json_path(&path).unwrap();
        let restored = SimulationParameters::from_json_path(&path).unwrap();

        assert_eq!(restored, original);
    }

    #[test]
    fn reading_a_record_with_zero_steps_fails_validation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("params.json");
        std::fs::write(
            &path,
            r#"{"protein_file":"p.pdb","ligand_file":"l.sdf","md_steps":0,
                "md_save_interval":10,"platform_name":"CPU",
                "platform_precision":"mixed","starting_state_path":""}"#,
        )
        .unwrap();

        let err = SimulationParameters::from_json_path(&path).unwrap_err();
        assert!(matches!(err, ParamsFileError::Invalid(_)));
    }

    #[test]
    fn unknown_platform_is_rejected_on_read() {
        let text = r#"{"protein_file":"p.pdb","ligand_file":"l.sdf","md_steps":1,
            "md_save_interval":1,"platform_name":"TPU",
            "platform_precision":"mixed","starting_state_path":""}"#;
        assert!(serde_json::from_str::<SimulationParameters>(text).is_err());
    }

    #[test]
    fn enums_parse_their_wire_spellings_only() {
        assert_eq!("GPU".parse::<Platform>().unwrap(), Platform::Gpu);
        assert!("gpu".parse::<Platform>().is_err());
        assert_eq!("single".parse::<Precision>().unwrap(), Precision::Single);
        assert!("half".parse::<Precision>().is_err());
        assert_eq!(Precision::Double.to_string(), "double");
    }
}
