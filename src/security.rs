//! Security Utilities
//!
//! Path containment, size limits, sensitive-key masking and port ranges
//! for descriptor imports. All functions are pure apart from filesystem
//! metadata lookups.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Maximum accepted descriptor size (1 MiB).
pub const MAX_FILE_SIZE: u64 = 1024 * 1024;

/// Substrings that mark an env var name as sensitive.
pub const SENSITIVE_KEYS: [&str; 8] = [
    "token",
    "key",
    "secret",
    "password",
    "credential",
    "api_key",
    "auth",
    "private",
];

pub const PORT_RANGE: std::ops::RangeInclusive<i64> = 1..=65535;

/// Resolve `path` the way the OS will when it is opened. Existing paths are
/// canonicalized whole, so symlinks are followed before any `..` applies.
/// For a path that does not exist yet, the longest existing ancestor is
/// canonicalized and the rest appended; `None` if that rest contains `..`.
fn resolve(path: &Path) -> Option<PathBuf> {
    if let Ok(canonical) = dunce::canonicalize(path) {
        return Some(canonical);
    }

    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir().ok()?.join(path)
    };

    let (base, rest) = absolute.ancestors().find_map(|ancestor| {
        let canonical = dunce::canonicalize(ancestor).ok()?;
        let rest = absolute.strip_prefix(ancestor).ok()?;
        Some((canonical, rest.to_path_buf()))
    })?;

    let mut resolved = base;
    for component in rest.components() {
        match component {
            Component::Normal(part) => resolved.push(part),
            Component::CurDir => {}
            _ => return None,
        }
    }
    Some(resolved)
}

/// True when `path` stays inside `base_dir` once resolved.
pub fn validate_path(path: impl AsRef<Path>, base_dir: impl AsRef<Path>) -> bool {
    match (resolve(path.as_ref()), resolve(base_dir.as_ref())) {
        (Some(path), Some(base)) => path.starts_with(base),
        _ => false,
    }
}

/// True when the file is at most `max_bytes`. Unreadable metadata fails the check.
pub fn validate_file_size(path: impl AsRef<Path>, max_bytes: u64) -> bool {
    fs::metadata(path)
        .map(|meta| meta.len() <= max_bytes)
        .unwrap_or(false)
}

pub fn is_sensitive(key: &str) -> bool {
    let key = key.to_lowercase();
    SENSITIVE_KEYS.iter().any(|pattern| key.contains(pattern))
}

/// `***` for four characters or fewer, otherwise first two + `***` + last two.
pub fn mask_value(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= 4 {
        return "***".to_string();
    }
    let head: String = chars[..2].iter().collect();
    let tail: String = chars[chars.len() - 2..].iter().collect();
    format!("{head}***{tail}")
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortValidation {
    pub valid_ports: Vec<i64>,
    pub invalid_ports: Vec<i64>,
}

pub fn validate_ports(ports: &[i64]) -> PortValidation {
    let (valid_ports, invalid_ports): (Vec<i64>, Vec<i64>) =
        ports.iter().copied().partition(|port| PORT_RANGE.contains(port));
    PortValidation {
        valid_ports,
        invalid_ports,
    }
}
