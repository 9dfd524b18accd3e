//! Configuration Merger
//!
//! Priority: user input > imported descriptor. Merging never fails;
//! conflicting env vars are reported as warnings and the user value is kept.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;

use crate::mapper::MappingResult;

const HANDLED_KEYS: [&str; 4] = ["env_vars", "languages", "ports", "warnings"];

/// One side of a merge: the wizard form or an imported mapping.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigLayer {
    #[serde(default)]
    pub env_vars: BTreeMap<String, String>,
    #[serde(default)]
    pub languages: Vec<String>,
    #[serde(default)]
    pub ports: Vec<i64>,
    /// Any other top-level keys (handle, email, workspace, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl From<&MappingResult> for ConfigLayer {
    fn from(mapping: &MappingResult) -> Self {
        Self {
            env_vars: mapping.env_vars.clone(),
            languages: mapping.languages.iter().map(|l| l.as_str().to_string()).collect(),
            ports: mapping.ports.clone(),
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MergedConfig {
    pub env_vars: BTreeMap<String, String>,
    /// Sorted, deduplicated.
    pub languages: Vec<String>,
    /// User ports first, then new imported ports.
    pub ports: Vec<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
    pub warnings: Vec<String>,
}

/// A key both sides define with different values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvConflict {
    pub key: String,
    pub user_value: String,
    pub imported_value: String,
}

impl fmt::Display for EnvConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Environment variable '{}' conflict: keeping user value '{}' over imported value '{}'",
            self.key, self.user_value, self.imported_value
        )
    }
}

/// Env vars that collide with different values, in user key order.
pub fn env_conflicts(user: &ConfigLayer, imported: &ConfigLayer) -> Vec<EnvConflict> {
    user.env_vars
        .iter()
        .filter_map(|(key, value)| match imported.env_vars.get(key) {
            Some(other) if other != value => Some(EnvConflict {
                key: key.clone(),
                user_value: value.clone(),
                imported_value: other.clone(),
            }),
            _ => None,
        })
        .collect()
}

pub fn merge_config(user: &ConfigLayer, imported: &ConfigLayer) -> MergedConfig {
    let conflicts = env_conflicts(user, imported);
    for conflict in &conflicts {
        // Values may be secrets; log the key only.
        tracing::info!(key = %conflict.key, "env var conflict, keeping user value");
    }

    let mut env_vars = imported.env_vars.clone();
    env_vars.extend(user.env_vars.iter().map(|(k, v)| (k.clone(), v.clone())));

    let languages: BTreeSet<&String> = user.languages.iter().chain(&imported.languages).collect();

    let mut seen = HashSet::new();
    let ports = user
        .ports
        .iter()
        .chain(&imported.ports)
        .copied()
        .filter(|port| seen.insert(*port))
        .collect();

    let mut extra = Map::new();
    for (key, value) in &user.extra {
        if !HANDLED_KEYS.contains(&key.as_str()) {
            extra.insert(key.clone(), value.clone());
        }
    }
    for (key, value) in &imported.extra {
        if !HANDLED_KEYS.contains(&key.as_str()) && !extra.contains_key(key) {
            extra.insert(key.clone(), value.clone());
        }
    }

    MergedConfig {
        env_vars,
        languages: languages.into_iter().cloned().collect(),
        ports,
        extra,
        warnings: conflicts.iter().map(ToString::to_string).collect(),
    }
}
