use serde_json::Value;
use std::collections::HashMap;

/// What a host has to provide for a block to run: typed input and variable
/// values looked up by slot id, and a place to publish outputs.
pub trait BlockContext {
    fn input(&self, id: &str) -> Option<&Value>;
    fn variable(&self, id: &str) -> Option<&Value>;
    fn set_output(&mut self, id: &str, value: String);
}

/// A host context backed by plain maps, used by the command line front end
/// and by tests.
#[derive(Debug, Clone, Default)]
pub struct MapBlockContext {
    inputs: HashMap<String, Value>,
    variables: HashMap<String, Value>,
    outputs: HashMap<String, String>,
}

impl MapBlockContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_input(mut self, id: &str, value: impl Into<Value>) -> Self {
        self.inputs.insert(id.to_string(), value.into());
        self
    }

    pub fn with_variable(mut self, id: &str, value: impl Into<Value>) -> Self {
        self.variables.insert(id.to_string(), value.into());
        self
    }

    pub fn output(&self, id: &str) -> Option<&str> {
        self.outputs.get(id).map(String::as_str)
    }

    pub fn outputs(&self) -> &HashMap<String, String> {
        &self.outputs
    }
}

impl BlockContext for MapBlockContext {
    fn input(&self, id: &str) -> Option<&Value> {
        self.inputs.get(id)
    }

    fn variable(&self, id: &str) -> Option<&Value> {
        self.variables.get(id)
    }

    fn set_output(&mut self, id: &str, value: String) {
        self.outputs.insert(id.to_string(), value);
    }
}
