//! Opaque values produced by steps and consumed by later ones.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A value produced by a successful step (e.g. an uploaded-media reference
/// or a created topic id).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Artifact(Value);

impl Artifact {
    /// Wrap an arbitrary JSON value.
    pub fn new(value: impl Into<Value>) -> Self {
        Self(value.into())
    }

    /// Artifact carrying no data, for steps that only have side effects.
    pub fn empty() -> Self {
        Self(Value::Null)
    }

    /// The wrapped value.
    pub fn value(&self) -> &Value {
        &self.0
    }

    /// The value as a string, if it is one.
    pub fn as_str(&self) -> Option<&str> {
        self.0.as_str()
    }

    /// Whether the artifact carries no data.
    pub fn is_empty(&self) -> bool {
        self.0.is_null()
    }
}

impl From<&str> for Artifact {
    fn from(s: &str) -> Self {
        Self(Value::String(s.to_string()))
    }
}

impl From<String> for Artifact {
    fn from(s: String) -> Self {
        Self(Value::String(s))
    }
}
