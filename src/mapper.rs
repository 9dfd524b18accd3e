//! Feature Mapper
//!
//! Translates devcontainer features and base images into ForgeKeeper
//! language runtimes. Anything unmapped is reported, never rejected.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use crate::descriptor::ParsedDescriptor;

/// Language runtimes ForgeKeeper can install.
///
/// Variants are declared alphabetically so the derived `Ord` matches the
/// lexicographic order of their ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Dart,
    Dotnet,
    Go,
    Java,
    Node,
    Php,
    Python,
    Ruby,
    Rust,
    Swift,
}

impl Language {
    pub const ALL: [Language; 10] = [
        Language::Python,
        Language::Node,
        Language::Go,
        Language::Rust,
        Language::Java,
        Language::Dotnet,
        Language::Ruby,
        Language::Php,
        Language::Swift,
        Language::Dart,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dart => "dart",
            Self::Dotnet => "dotnet",
            Self::Go => "go",
            Self::Java => "java",
            Self::Node => "node",
            Self::Php => "php",
            Self::Python => "python",
            Self::Ruby => "ruby",
            Self::Rust => "rust",
            Self::Swift => "swift",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown language runtime '{0}': expected one of python, node, go, rust, java, dotnet, ruby, php, swift, dart")]
pub struct UnknownLanguage(pub String);

impl FromStr for Language {
    type Err = UnknownLanguage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Language::ALL
            .into_iter()
            .find(|lang| lang.as_str() == s)
            .ok_or_else(|| UnknownLanguage(s.to_string()))
    }
}

/// Feature id prefixes per language, in match order.
pub const FEATURE_MAPPINGS: &[(Language, &[&str])] = &[
    (
        Language::Python,
        &[
            "ghcr.io/devcontainers/features/python",
            "ghcr.io/devcontainers-contrib/features/python",
        ],
    ),
    (
        Language::Node,
        &[
            "ghcr.io/devcontainers/features/node",
            "ghcr.io/devcontainers-contrib/features/node",
        ],
    ),
    (
        Language::Go,
        &[
            "ghcr.io/devcontainers/features/go",
            "ghcr.io/devcontainers-contrib/features/go",
        ],
    ),
    (
        Language::Rust,
        &[
            "ghcr.io/devcontainers/features/rust",
            "ghcr.io/devcontainers-contrib/features/rust",
        ],
    ),
    (
        Language::Java,
        &[
            "ghcr.io/devcontainers/features/java",
            "ghcr.io/devcontainers-contrib/features/java",
        ],
    ),
    (
        Language::Dotnet,
        &[
            "ghcr.io/devcontainers/features/dotnet",
            "ghcr.io/microsoft/devcontainers/features/dotnet",
        ],
    ),
    (
        Language::Ruby,
        &[
            "ghcr.io/devcontainers/features/ruby",
            "ghcr.io/devcontainers-contrib/features/ruby",
        ],
    ),
    (
        Language::Php,
        &[
            "ghcr.io/devcontainers/features/php",
            "ghcr.io/devcontainers-contrib/features/php",
        ],
    ),
];

/// Whole words in an image path that hint at a language.
pub const IMAGE_LANGUAGE_KEYWORDS: &[(&str, Language)] = &[
    ("python", Language::Python),
    ("node", Language::Node),
    ("golang", Language::Go),
    ("go", Language::Go),
    ("rust", Language::Rust),
    ("java", Language::Java),
    ("dotnet", Language::Dotnet),
    ("ruby", Language::Ruby),
    ("php", Language::Php),
    ("swift", Language::Swift),
    ("dart", Language::Dart),
];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingResult {
    pub languages: BTreeSet<Language>,
    pub env_vars: BTreeMap<String, String>,
    pub ports: Vec<i64>,
    pub unrecognized_features: Vec<String>,
    /// One entry per unrecognized feature, same order.
    pub warnings: Vec<String>,
}

#[derive(Debug, Default)]
pub struct FeatureMapper;

impl FeatureMapper {
    pub fn new() -> Self {
        Self
    }

    /// First language in table order whose prefix the feature id starts with.
    /// Version suffixes like `:1` or `:latest` do not affect the match.
    pub fn language_for_feature(&self, feature_id: &str) -> Option<Language> {
        FEATURE_MAPPINGS
            .iter()
            .find(|(_, prefixes)| prefixes.iter().any(|p| feature_id.starts_with(p)))
            .map(|(lang, _)| *lang)
    }

    pub fn map_features(&self, config: &ParsedDescriptor) -> MappingResult {
        let mut result = MappingResult::default();

        for feature_id in config.features.keys() {
            match self.language_for_feature(feature_id) {
                Some(lang) => {
                    result.languages.insert(lang);
                }
                None => {
                    tracing::debug!(feature = %feature_id, "unrecognized feature");
                    result.warnings.push(format!(
                        "Feature '{}' not mapped to any ForgeKeeper language runtime",
                        feature_id
                    ));
                    result.unrecognized_features.push(feature_id.clone());
                }
            }
        }

        if let Some(image) = config.image.as_deref() {
            result.languages.extend(detect_language_from_image(image));
        }

        result.env_vars = config.remote_env.clone();
        result.ports = config.forward_ports.clone();

        result
    }
}

/// Detect languages from an image reference such as `python:3.11`,
/// `mcr.microsoft.com/devcontainers/python:3.11` or `node:20-bullseye`.
///
/// Only the text before the first `:` is inspected, so a registry with a
/// port (`registry.local:5000/python`) loses its path and detects nothing.
pub fn detect_language_from_image(image: &str) -> Vec<Language> {
    let normalized = image.trim().to_lowercase();
    if normalized.is_empty() {
        return vec![];
    }

    let without_digest = normalized.split('@').next().unwrap_or_default();
    let path = without_digest.split(':').next().unwrap_or_default();

    let mut detected = vec![];
    for word in path.split('/').flat_map(|segment| segment.split(['-', '_'])) {
        let hit = IMAGE_LANGUAGE_KEYWORDS
            .iter()
            .find(|(keyword, _)| *keyword == word)
            .map(|(_, lang)| *lang);
        if let Some(lang) = hit {
            if !detected.contains(&lang) {
                detected.push(lang);
            }
        }
    }
    detected
}
