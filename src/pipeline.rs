//! Import Pipeline - Single Entry Point
//!
//! Every import goes guard checks -> parse -> map, in that order.
//! Expected failures come back as a failed `ImportReport`, never as `Err`.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use uuid::Uuid;

use crate::descriptor::{DescriptorParser, ParseResult};
use crate::hashing::descriptor_hash;
use crate::mapper::{FeatureMapper, MappingResult};
use crate::merger::{merge_config, ConfigLayer, MergedConfig};
use crate::security::{validate_file_size, validate_path, MAX_FILE_SIZE};
use crate::ENGINE_VERSION;

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Path '{}' is outside the allowed root '{}'", .path.display(), .root.display())]
    PathOutsideRoot { path: PathBuf, root: PathBuf },

    #[error("File {} exceeds the maximum size of {limit} bytes", .path.display())]
    FileTooLarge { path: PathBuf, limit: u64 },

    #[error("Upload of {size} bytes exceeds the maximum size of {limit} bytes")]
    PayloadTooLarge { size: u64, limit: u64 },

    #[error("Descriptor is not valid UTF-8: {0}")]
    InvalidEncoding(#[from] std::str::Utf8Error),

    #[error("Invalid base64 payload: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    #[error("Failed to read settings {}: {source}", .path.display())]
    SettingsRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid settings file: {0}")]
    SettingsParse(#[from] serde_json::Error),
}

/// Limits applied before a descriptor is read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImportSettings {
    pub max_file_size: u64,
    /// File imports outside this directory are rejected.
    pub allowed_root: Option<PathBuf>,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            max_file_size: MAX_FILE_SIZE,
            allowed_root: None,
        }
    }
}

impl ImportSettings {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ImportError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ImportError::SettingsRead {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&content)?)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportReport {
    pub id: String,
    pub imported_at: DateTime<Utc>,
    pub engine_version: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub descriptor_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mapping: Option<MappingResult>,
    #[serde(default)]
    pub errors: Vec<String>,
}

impl ImportReport {
    fn new(success: bool) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            imported_at: Utc::now(),
            engine_version: ENGINE_VERSION.to_string(),
            success,
            descriptor_hash: None,
            mapping: None,
            errors: vec![],
        }
    }

    pub fn failure(errors: Vec<String>) -> Self {
        Self {
            errors,
            ..Self::new(false)
        }
    }

    /// The imported side of a merge. A failed import contributes nothing.
    pub fn imported_layer(&self) -> ConfigLayer {
        self.mapping
            .as_ref()
            .map(ConfigLayer::from)
            .unwrap_or_default()
    }
}

impl From<ImportError> for ImportReport {
    fn from(err: ImportError) -> Self {
        Self::failure(vec![err.to_string()])
    }
}

/// The import pipeline - parser and mapper behind one set of guards
pub struct ImportPipeline {
    parser: DescriptorParser,
    mapper: FeatureMapper,
    settings: ImportSettings,
}

impl ImportPipeline {
    pub fn new(settings: ImportSettings) -> Self {
        Self {
            parser: DescriptorParser::new(),
            mapper: FeatureMapper::new(),
            settings,
        }
    }

    pub fn import_content(&self, content: &str) -> ImportReport {
        self.finish(self.parser.parse_content(content))
    }

    /// Raw upload bytes, size-capped and UTF-8 decoded.
    pub fn import_bytes(&self, bytes: &[u8]) -> ImportReport {
        let size = bytes.len() as u64;
        if size > self.settings.max_file_size {
            return ImportError::PayloadTooLarge {
                size,
                limit: self.settings.max_file_size,
            }
            .into();
        }
        match std::str::from_utf8(bytes) {
            Ok(content) => self.import_content(content),
            Err(e) => ImportError::from(e).into(),
        }
    }

    pub fn import_base64(&self, payload: &str) -> ImportReport {
        match STANDARD.decode(payload.trim()) {
            Ok(bytes) => self.import_bytes(&bytes),
            Err(e) => ImportError::from(e).into(),
        }
    }

    pub fn import_file(&self, path: impl AsRef<Path>) -> ImportReport {
        let path = path.as_ref();

        if let Some(root) = &self.settings.allowed_root {
            if !validate_path(path, root) {
                tracing::warn!(path = %path.display(), "rejected descriptor outside allowed root");
                return ImportError::PathOutsideRoot {
                    path: path.to_path_buf(),
                    root: root.clone(),
                }
                .into();
            }
        }

        // Missing files fall through so the parser reports them.
        if path.is_file() && !validate_file_size(path, self.settings.max_file_size) {
            return ImportError::FileTooLarge {
                path: path.to_path_buf(),
                limit: self.settings.max_file_size,
            }
            .into();
        }

        self.finish(self.parser.parse_file(path))
    }

    /// Merge a report into the user's wizard config. User values win.
    pub fn merge(&self, user: &ConfigLayer, report: &ImportReport) -> MergedConfig {
        merge_config(user, &report.imported_layer())
    }

    fn finish(&self, parsed: ParseResult) -> ImportReport {
        let config = match parsed {
            ParseResult::Success(config) => config,
            ParseResult::Failure(errors) => {
                tracing::warn!(count = errors.len(), "descriptor import failed");
                return ImportReport::failure(errors);
            }
        };

        let mapping = self.mapper.map_features(&config);
        tracing::info!(
            languages = mapping.languages.len(),
            unrecognized = mapping.unrecognized_features.len(),
            "descriptor imported"
        );

        let mut report = ImportReport::new(true);
        // Fingerprints are informational; a failure to hash does not fail the import.
        report.descriptor_hash = descriptor_hash(&config.raw).ok();
        report.mapping = Some(mapping);
        report
    }
}

impl Default for ImportPipeline {
    fn default() -> Self {
        Self::new(ImportSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapper::Language;

    #[test]
    fn test_import_content_success() {
        let report = ImportPipeline::default().import_content(
            r#"{"features": {"ghcr.io/devcontainers/features/rust:1": {}}, "remoteEnv": {"RUST_LOG": "info"}}"#,
        );
        assert!(report.success);
        assert!(report.errors.is_empty());
        assert_eq!(report.descriptor_hash.as_ref().map(String::len), Some(64));
        let mapping = report.mapping.unwrap();
        assert!(mapping.languages.contains(&Language::Rust));
        assert_eq!(mapping.env_vars["RUST_LOG"], "info");
    }

    #[test]
    fn test_import_content_failure_has_no_mapping() {
        let report = ImportPipeline::default().import_content("{ not valid json !!!");
        assert!(!report.success);
        assert!(report.mapping.is_none());
        assert!(report.descriptor_hash.is_none());
        assert!(!report.errors.is_empty());
    }

    #[test]
    fn test_import_bytes_size_cap() {
        let pipeline = ImportPipeline::new(ImportSettings {
            max_file_size: 4,
            allowed_root: None,
        });
        let report = pipeline.import_bytes(b"{\"image\": \"python\"}");
        assert!(!report.success);
        assert!(report.errors[0].contains("exceeds the maximum size"));
    }

    #[test]
    fn test_import_bytes_rejects_invalid_utf8() {
        let report = ImportPipeline::default().import_bytes(&[0x7b, 0xff, 0x7d]);
        assert!(report.errors[0].contains("not valid UTF-8"));
    }

    #[test]
    fn test_import_base64() {
        let payload = STANDARD.encode(r#"{"image": "golang:1.21"}"#);
        let report = ImportPipeline::default().import_base64(&payload);
        assert!(report.mapping.unwrap().languages.contains(&Language::Go));

        let bad = ImportPipeline::default().import_base64("***not base64***");
        assert!(bad.errors[0].starts_with("Invalid base64 payload"));
    }

    #[test]
    fn test_failed_report_merges_as_empty() {
        let report = ImportReport::failure(vec!["Invalid descriptor: root must be an object".into()]);
        let user: ConfigLayer =
            serde_json::from_str(r#"{"languages": ["php"], "ports": [80]}"#).unwrap();
        let merged = ImportPipeline::default().merge(&user, &report);
        assert_eq!(merged.languages, vec!["php"]);
        assert_eq!(merged.ports, vec![80]);
        assert!(merged.warnings.is_empty());
    }

    #[test]
    fn test_settings_defaults_fill_missing_fields() {
        let settings: ImportSettings = serde_json::from_str(r#"{"allowedRoot": "/workspace"}"#).unwrap();
        assert_eq!(settings.max_file_size, MAX_FILE_SIZE);
        assert_eq!(settings.allowed_root, Some(PathBuf::from("/workspace")));
    }

    #[test]
    fn test_settings_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{"maxFileSize": 2048}"#).unwrap();
        let settings = ImportSettings::load(&path).unwrap();
        assert_eq!(settings.max_file_size, 2048);
        assert_eq!(settings.allowed_root, None);

        let missing = ImportSettings::load(dir.path().join("nope.json")).unwrap_err();
        assert!(missing.to_string().contains("nope.json"));
    }
}
