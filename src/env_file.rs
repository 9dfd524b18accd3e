//! Env file rendering for merged configurations.

use std::collections::BTreeMap;
use thiserror::Error;

use crate::security::{is_sensitive, mask_value};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnvFileError {
    #[error("Invalid env var name {0:?}: must be non-empty without '=', line breaks or NUL")]
    InvalidKey(String),

    #[error("Env var '{0}' has a value containing a line break or NUL")]
    InvalidValue(String),
}

fn has_line_break(s: &str) -> bool {
    s.contains(['\n', '\r', '\0'])
}

/// `KEY=VALUE` lines sorted by key, newline-terminated. Empty input renders empty.
///
/// Each variable must stay on its own line, so names with `=` and any
/// line break or NUL are rejected instead of written.
pub fn render_env_file(env: &BTreeMap<String, String>) -> Result<String, EnvFileError> {
    let mut out = String::new();
    for (key, value) in env {
        if key.is_empty() || key.contains('=') || has_line_break(key) {
            return Err(EnvFileError::InvalidKey(key.clone()));
        }
        if has_line_break(value) {
            return Err(EnvFileError::InvalidValue(key.clone()));
        }
        out.push_str(&format!("{key}={value}\n"));
    }
    Ok(out)
}

/// Copy safe for display: sensitive values are masked.
pub fn masked_env(env: &BTreeMap<String, String>) -> BTreeMap<String, String> {
    env.iter()
        .map(|(k, v)| {
            let shown = if is_sensitive(k) { mask_value(v) } else { v.clone() };
            (k.clone(), shown)
        })
        .collect()
}
