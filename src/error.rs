//! Descriptor Errors
//!
//! Every variant renders as a complete, user-facing sentence. The parser
//! never returns these directly; they become `ParseResult::Failure` entries.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DescriptorError {
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Path is not a file: {}", .0.display())]
    NotAFile(PathBuf),

    #[error("Permission denied reading {}", .0.display())]
    PermissionDenied(PathBuf),

    #[error("Error reading file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid JSON syntax at line {line}, column {column}: {message}")]
    Syntax {
        line: usize,
        column: usize,
        message: String,
    },

    #[error("Invalid descriptor: root must be an object")]
    NotAnObject,
}

impl DescriptorError {
    /// Build a syntax error from serde_json, keeping the position apart
    /// from the message so it is not reported twice.
    pub fn syntax(err: &serde_json::Error) -> Self {
        let rendered = err.to_string();
        let message = match rendered.rfind(" at line ") {
            Some(idx) => rendered[..idx].to_string(),
            None => rendered,
        };
        Self::Syntax {
            line: err.line(),
            column: err.column(),
            message,
        }
    }

    pub fn from_io(path: PathBuf, source: std::io::Error) -> Self {
        match source.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(path),
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied(path),
            _ => Self::Read { path, source },
        }
    }
}
