//! Line-oriented result protocol spoken by the worker on its stdout.
//!
//! Every line the worker prints is free-form progress text, except lines that
//! start with one of the two sentinel prefixes. Those carry one result value
//! each, with no escaping: everything after the first colon is the value.

use serde::Serialize;
use std::fmt;

pub const TOPOLOGY_PREFIX: &str = "TOPOLOGY_FILE:";
pub const TRAJECTORY_PREFIX: &str = "TRAJECTORY_FILE:";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SentinelKey {
    Topology,
    Trajectory,
}

impl SentinelKey {
    pub fn prefix(&self) -> &'static str {
        match self {
            SentinelKey::Topology => TOPOLOGY_PREFIX,
            SentinelKey::Trajectory => TRAJECTORY_PREFIX,
        }
    }
}

/// Parses a single output line into a sentinel key and its value.
///
/// Trailing whitespace is ignored. The value is everything after the first
/// colon, trimmed on both sides.
pub fn parse_sentinel(line: &str) -> Option<(SentinelKey, String)> {
    let line = line.trim_end();
    let key = if line.starts_with(TOPOLOGY_PREFIX) {
        SentinelKey::Topology
    } else if line.starts_with(TRAJECTORY_PREFIX) {
        SentinelKey::Trajectory
    } else {
        return None;
    };
    let (_, value) = line.split_once(':')?;
    Some((key, value.trim().to_string()))
}

pub fn format_sentinel(key: SentinelKey, value: &str) -> String {
    format!("{}{}", key.prefix(), value)
}

/// The two artifacts a successful run hands back to the host.
///
/// Each value is a resolved absolute path, a "not found" placeholder, or empty
/// when the worker never reported that key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResultPair {
    pub topology: String,
    pub trajectory: String,
}

impl fmt::Display for ResultPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Topology file: {}", self.topology)?;
        write!(f, "Trajectory file: {}", self.trajectory)
    }
}

/// Accumulates sentinel values from a stream of output lines.
///
/// A key reported more than once keeps its last value.
#[derive(Debug, Default, Clone)]
pub struct SentinelCapture {
    topology: Option<String>,
    trajectory: Option<String>,
}

impl SentinelCapture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one line; returns the key it set, if any.
    pub fn observe(&mut self, line: &str) -> Option<SentinelKey> {
        let (key, value) = parse_sentinel(line)?;
        match key {
            SentinelKey::Topology => self.topology = Some(value),
            SentinelKey::Trajectory => self.trajectory = Some(value),
        }
        Some(key)
    }

    pub fn get(&self, key: SentinelKey) -> Option<&str> {
        match key {
            SentinelKey::Topology => self.topology.as_deref(),
            SentinelKey::Trajectory => self.trajectory.as_deref(),
        }
    }

    pub fn into_result(self) -> ResultPair {
        ResultPair {
            topology: self.topology.unwrap_or_default(),
            trajectory: self.trajectory.unwrap_or_default(),
        }
    }
}
