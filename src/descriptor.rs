//! Descriptor Parser
//!
//! Turns devcontainer.json text into a validated `ParsedDescriptor`.
//! Malformed input never escapes as an error; it becomes `ParseResult::Failure`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::error::DescriptorError;
use crate::validation::SchemaValidator;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedDescriptor {
    pub features: Map<String, Value>,
    pub customizations: Map<String, Value>,
    pub forward_ports: Vec<i64>,
    pub remote_env: BTreeMap<String, String>,
    pub image: Option<String>,
    pub dockerfile: Option<String>,
    /// The decoded document as received, unknown properties included.
    pub raw: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseResult {
    Success(ParsedDescriptor),
    Failure(Vec<String>),
}

impl ParseResult {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn config(&self) -> Option<&ParsedDescriptor> {
        match self {
            Self::Success(config) => Some(config),
            Self::Failure(_) => None,
        }
    }

    pub fn into_config(self) -> Option<ParsedDescriptor> {
        match self {
            Self::Success(config) => Some(config),
            Self::Failure(_) => None,
        }
    }

    /// Empty on success.
    pub fn errors(&self) -> &[String] {
        match self {
            Self::Success(_) => &[],
            Self::Failure(errors) => errors,
        }
    }
}

impl From<DescriptorError> for ParseResult {
    fn from(err: DescriptorError) -> Self {
        Self::Failure(vec![err.to_string()])
    }
}

#[derive(Default)]
pub struct DescriptorParser {
    validator: SchemaValidator,
}

impl DescriptorParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a descriptor from disk and parse it.
    pub fn parse_file(&self, path: impl AsRef<Path>) -> ParseResult {
        let path = path.as_ref();

        if !path.exists() {
            return DescriptorError::NotFound(path.to_path_buf()).into();
        }
        if !path.is_file() {
            return DescriptorError::NotAFile(path.to_path_buf()).into();
        }

        match fs::read_to_string(path) {
            Ok(content) => self.parse_content(&content),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to read descriptor");
                DescriptorError::from_io(path.to_path_buf(), e).into()
            }
        }
    }

    pub fn parse_content(&self, content: &str) -> ParseResult {
        let data: Value = match serde_json::from_str(content) {
            Ok(v) => v,
            Err(e) => return DescriptorError::syntax(&e).into(),
        };

        let Value::Object(data) = data else {
            return DescriptorError::NotAnObject.into();
        };

        let schema_errors = self.validate_schema(&data);
        if !schema_errors.is_empty() {
            tracing::warn!(count = schema_errors.len(), "descriptor failed schema validation");
            return ParseResult::Failure(schema_errors);
        }

        let (image, dockerfile) = extract_image_config(&data);
        let config = ParsedDescriptor {
            features: extract_features(&data),
            customizations: extract_customizations(&data),
            forward_ports: extract_ports(data.get("forwardPorts")),
            remote_env: extract_env(&data),
            image,
            dockerfile,
            raw: data,
        };

        tracing::debug!(
            features = config.features.len(),
            ports = config.forward_ports.len(),
            "parsed descriptor"
        );
        ParseResult::Success(config)
    }

    /// One message per offending property; empty when valid.
    pub fn validate_schema(&self, data: &Map<String, Value>) -> Vec<String> {
        self.validator.validate(data)
    }
}

fn object_or_empty(data: &Map<String, Value>, key: &str) -> Map<String, Value> {
    match data.get(key) {
        Some(Value::Object(map)) => map.clone(),
        _ => Map::new(),
    }
}

pub fn extract_features(data: &Map<String, Value>) -> Map<String, Value> {
    object_or_empty(data, "features")
}

pub fn extract_customizations(data: &Map<String, Value>) -> Map<String, Value> {
    object_or_empty(data, "customizations")
}

/// String values only; anything else is dropped.
pub fn extract_env(data: &Map<String, Value>) -> BTreeMap<String, String> {
    let Some(Value::Object(env)) = data.get("remoteEnv") else {
        return BTreeMap::new();
    };
    env.iter()
        .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
        .collect()
}

/// Returns `(image, dockerfile)`. A present key with a non-string value is `None`.
pub fn extract_image_config(data: &Map<String, Value>) -> (Option<String>, Option<String>) {
    let string_at = |key: &str| data.get(key).and_then(Value::as_str).map(str::to_string);
    (string_at("image"), string_at("dockerfile"))
}

/// Integers are kept, numeric strings converted, everything else skipped.
pub fn extract_ports(ports: Option<&Value>) -> Vec<i64> {
    let Some(Value::Array(ports)) = ports else {
        return vec![];
    };
    ports
        .iter()
        .filter_map(|port| match port {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        })
        .collect()
}
