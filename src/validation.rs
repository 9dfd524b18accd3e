//! Schema Validation - Rule/Violation Separation
//!
//! Rules check one known top-level property each and produce structured
//! violations. Unknown properties are always allowed, absent ones never fail.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Structural JSON type a property is expected to have.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JsonKind {
    Object,
    Array,
    String,
    Boolean,
    Number,
    Null,
}

impl JsonKind {
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Object(_) => Self::Object,
            Value::Array(_) => Self::Array,
            Value::String(_) => Self::String,
            Value::Bool(_) => Self::Boolean,
            Value::Number(_) => Self::Number,
            Value::Null => Self::Null,
        }
    }

    fn article(&self) -> &'static str {
        match self {
            Self::Object => "an object",
            Self::Array => "an array",
            Self::String => "a string",
            Self::Boolean => "a boolean",
            Self::Number => "a number",
            Self::Null => "null",
        }
    }
}

impl fmt::Display for JsonKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Object => "object",
            Self::Array => "array",
            Self::String => "string",
            Self::Boolean => "boolean",
            Self::Number => "number",
            Self::Null => "null",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SchemaViolation {
    pub property: String,
    pub expected: JsonKind,
    pub actual: JsonKind,
}

impl fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Property '{}' must be {} (found {})",
            self.property,
            self.expected.article(),
            self.actual
        )
    }
}

/// One known property and the type it must have when present.
#[derive(Debug, Clone, Copy)]
pub struct PropertyRule {
    pub property: &'static str,
    pub expected: JsonKind,
}

impl PropertyRule {
    pub const fn new(property: &'static str, expected: JsonKind) -> Self {
        Self { property, expected }
    }

    pub fn check(&self, data: &Map<String, Value>) -> Option<SchemaViolation> {
        let value = data.get(self.property)?;
        let actual = JsonKind::of(value);
        if actual == self.expected {
            return None;
        }
        Some(SchemaViolation {
            property: self.property.to_string(),
            expected: self.expected,
            actual,
        })
    }
}

/// Known top-level descriptor properties, in report order.
pub const DESCRIPTOR_RULES: &[PropertyRule] = &[
    PropertyRule::new("name", JsonKind::String),
    PropertyRule::new("image", JsonKind::String),
    PropertyRule::new("dockerfile", JsonKind::String),
    PropertyRule::new("build", JsonKind::Object),
    PropertyRule::new("features", JsonKind::Object),
    PropertyRule::new("customizations", JsonKind::Object),
    PropertyRule::new("forwardPorts", JsonKind::Array),
    PropertyRule::new("remoteEnv", JsonKind::Object),
    PropertyRule::new("remoteUser", JsonKind::String),
    PropertyRule::new("containerEnv", JsonKind::Object),
    PropertyRule::new("containerUser", JsonKind::String),
    PropertyRule::new("updateRemoteUserUID", JsonKind::Boolean),
    PropertyRule::new("mounts", JsonKind::Array),
    PropertyRule::new("runArgs", JsonKind::Array),
    PropertyRule::new("shutdownAction", JsonKind::String),
    PropertyRule::new("overrideCommand", JsonKind::Boolean),
    PropertyRule::new("workspaceFolder", JsonKind::String),
    PropertyRule::new("workspaceMount", JsonKind::String),
];

/// Runs every rule and collects all violations.
pub struct SchemaValidator {
    rules: &'static [PropertyRule],
}

impl SchemaValidator {
    pub fn new() -> Self {
        Self {
            rules: DESCRIPTOR_RULES,
        }
    }

    pub fn violations(&self, data: &Map<String, Value>) -> Vec<SchemaViolation> {
        self.rules.iter().filter_map(|rule| rule.check(data)).collect()
    }

    pub fn validate(&self, data: &Map<String, Value>) -> Vec<String> {
        self.violations(data)
            .iter()
            .map(ToString::to_string)
            .collect()
    }
}

impl Default for SchemaValidator {
    fn default() -> Self {
        Self::new()
    }
}
