//! ForgeKeeper Core - Devcontainer Import Engine
//!
//! # Guarantees
//! 1. Malformed descriptors fail as values, never as panics
//! 2. Every feature is either mapped or reported as unrecognized
//! 3. User input always wins a merge, and every conflict is warned about
//! 4. Merging is deterministic and loses no keys, languages or ports

pub mod descriptor;
pub mod env_file;
pub mod error;
pub mod hashing;
pub mod mapper;
pub mod merger;
pub mod pipeline;
pub mod security;
pub mod validation;

pub use descriptor::{DescriptorParser, ParseResult, ParsedDescriptor};
pub use error::DescriptorError;
pub use mapper::{detect_language_from_image, FeatureMapper, Language, MappingResult};
pub use merger::{merge_config, ConfigLayer, EnvConflict, MergedConfig};
pub use pipeline::{ImportError, ImportPipeline, ImportReport, ImportSettings};
pub use security::{is_sensitive, mask_value, validate_file_size, validate_path, validate_ports, PortValidation};

pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");
