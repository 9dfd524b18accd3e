//! Contract Invariant Tests
//!
//! These tests verify the import, mapping and merge guarantees end to end.

use std::collections::BTreeSet;
use std::fs;

use forgekeeper_core::{
    merge_config, ConfigLayer, DescriptorParser, FeatureMapper, ImportPipeline, ImportSettings,
    Language, ParseResult,
};
use serde_json::json;

fn parse(content: &str) -> ParseResult {
    DescriptorParser::new().parse_content(content)
}

fn languages(langs: &[Language]) -> BTreeSet<Language> {
    langs.iter().copied().collect()
}

fn layer(value: serde_json::Value) -> ConfigLayer {
    serde_json::from_value(value).unwrap()
}

#[test]
fn invariant_features_ports_env_mapped() {
    let content = json!({
        "features": {
            "ghcr.io/devcontainers/features/python:1": {"version": "3.11"},
            "ghcr.io/devcontainers/features/node:1": {"version": "20"}
        },
        "forwardPorts": [3000, 8080],
        "remoteEnv": {"MY_VAR": "hello"}
    })
    .to_string();

    let config = parse(&content).into_config().unwrap();
    let mapping = FeatureMapper::new().map_features(&config);

    assert_eq!(mapping.languages, languages(&[Language::Python, Language::Node]));
    assert_eq!(mapping.ports, vec![3000, 8080]);
    assert_eq!(mapping.env_vars.len(), 1);
    assert_eq!(mapping.env_vars["MY_VAR"], "hello");
    assert!(mapping.unrecognized_features.is_empty());
    assert!(mapping.warnings.is_empty());
}

#[test]
fn invariant_image_detection_from_tagged_image() {
    let config = parse(r#"{"image": "golang:1.21"}"#).into_config().unwrap();
    let mapping = FeatureMapper::new().map_features(&config);
    assert_eq!(mapping.languages, languages(&[Language::Go]));
}

#[test]
fn invariant_unrecognized_feature_is_warning_not_error() {
    let config = parse(r#"{"features": {"ghcr.io/devcontainers/features/docker-in-docker:2": {}}}"#)
        .into_config()
        .unwrap();
    let mapping = FeatureMapper::new().map_features(&config);

    assert!(mapping.languages.is_empty());
    assert_eq!(
        mapping.unrecognized_features,
        vec!["ghcr.io/devcontainers/features/docker-in-docker:2"]
    );
    assert_eq!(mapping.warnings.len(), 1);
    assert!(mapping.warnings[0].contains("docker-in-docker"));
}

#[test]
fn invariant_merge_conflict_keeps_user_value() {
    let merged = merge_config(
        &layer(json!({"env_vars": {"SHARED": "user_val"}})),
        &layer(json!({"env_vars": {"SHARED": "imported_val"}})),
    );
    assert_eq!(merged.env_vars["SHARED"], "user_val");
    assert_eq!(merged.warnings.len(), 1);
    for needle in ["SHARED", "user_val", "imported_val"] {
        assert!(merged.warnings[0].contains(needle));
    }
}

#[test]
fn invariant_truncated_json_reports_position() {
    let result = parse(r#"{"image": "test""#);
    assert!(!result.is_success());
    assert!(result.config().is_none());
    assert_eq!(result.errors().len(), 1);
    let error = result.errors()[0].to_lowercase();
    assert!(error.contains("line") || error.contains("column"));
    assert!(error.contains("syntax"));
}

#[test]
fn invariant_failure_messages_are_descriptive() {
    let failures = [
        parse("{ not valid json !!!"),
        parse("42"),
        parse(r#"{"features": "x", "forwardPorts": {}, "remoteEnv": [], "image": 1, "dockerfile": false, "customizations": 3}"#),
        DescriptorParser::new().parse_file("/nonexistent/path/devcontainer.json"),
    ];
    for result in &failures {
        assert!(!result.is_success());
        assert!(!result.errors().is_empty());
        for error in result.errors() {
            assert!(error.len() >= 10, "too terse: {error}");
        }
    }
    assert_eq!(failures[2].errors().len(), 6);
}

#[test]
fn invariant_parse_file_reads_descriptor() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("devcontainer.json");
    fs::write(
        &path,
        r#"{"image": "python:3.11", "features": {"ghcr.io/devcontainers/features/python:1": {}}}"#,
    )
    .unwrap();

    let result = DescriptorParser::new().parse_file(&path);
    assert_eq!(result.config().unwrap().image.as_deref(), Some("python:3.11"));

    let not_a_file = DescriptorParser::new().parse_file(dir.path());
    assert!(not_a_file.errors()[0].contains("Path is not a file"));

    let missing = DescriptorParser::new().parse_file(dir.path().join("missing.json"));
    assert!(missing.errors()[0].starts_with("File not found:"));
    assert!(missing.errors()[0].contains("missing.json"));
}

#[test]
fn invariant_parser_reusable_after_failure() {
    let parser = DescriptorParser::new();
    assert!(!parser.parse_content("{").is_success());
    assert!(parser.parse_content("{}").is_success());
}

#[test]
fn invariant_full_import_then_merge() {
    let descriptor = json!({
        "name": "My App",
        "image": "mcr.microsoft.com/devcontainers/base:ubuntu",
        "features": {
            "ghcr.io/devcontainers/features/python:1": {},
            "ghcr.io/devcontainers/features/go:1": {},
            "ghcr.io/devcontainers/features/docker-in-docker:2": {}
        },
        "forwardPorts": [3000, "5432"],
        "remoteEnv": {
            "MY_APP_ENV": "development",
            "DATABASE_URL": "postgres://localhost:5432/mydb"
        }
    });
    let pipeline = ImportPipeline::default();
    let report = pipeline.import_content(&descriptor.to_string());
    assert!(report.success);

    let user = layer(json!({
        "handle": "forgekeeper",
        "languages": ["ruby", "python"],
        "ports": [9090, 3000],
        "env_vars": {"MY_APP_ENV": "production", "CUSTOM_VAR": "custom"}
    }));
    let merged = pipeline.merge(&user, &report);

    assert_eq!(merged.languages, vec!["go", "python", "ruby"]);
    assert_eq!(merged.ports, vec![9090, 3000, 5432]);
    assert_eq!(merged.env_vars["MY_APP_ENV"], "production");
    assert_eq!(merged.env_vars["DATABASE_URL"], "postgres://localhost:5432/mydb");
    assert_eq!(merged.env_vars["CUSTOM_VAR"], "custom");
    assert_eq!(merged.extra["handle"], "forgekeeper");
    assert_eq!(merged.warnings.len(), 1);
}

#[test]
fn invariant_report_json_shape() {
    let report = ImportPipeline::default().import_content(
        r#"{"features": {"ghcr.io/devcontainers/features/node:1": {}, "ghcr.io/devcontainers/features/python:1": {}}}"#,
    );
    let value = serde_json::to_value(&report).unwrap();

    assert_eq!(value["success"], json!(true));
    assert_eq!(value["mapping"]["languages"], json!(["node", "python"]));
    assert_eq!(value["mapping"]["unrecognized_features"], json!([]));
    assert_eq!(value["errors"], json!([]));

    let failed = serde_json::to_value(ImportPipeline::default().import_content("[]")).unwrap();
    assert_eq!(failed["success"], json!(false));
    assert!(failed.get("mapping").is_none());
}

#[test]
fn invariant_same_descriptor_same_hash() {
    let pipeline = ImportPipeline::default();
    let a = pipeline.import_content(r#"{"image": "node:20", "forwardPorts": [3000]}"#);
    let b = pipeline.import_content("{\n  \"forwardPorts\": [3000],\n  \"image\": \"node:20\"\n}");
    assert_eq!(a.descriptor_hash, b.descriptor_hash);
    assert_ne!(a.id, b.id);
}

#[test]
fn invariant_file_import_guards() {
    let root = tempfile::tempdir().unwrap();
    let outside = tempfile::tempdir().unwrap();
    let inside_path = root.path().join("devcontainer.json");
    let outside_path = outside.path().join("devcontainer.json");
    fs::write(&inside_path, r#"{"image": "ruby:3.3"}"#).unwrap();
    fs::write(&outside_path, r#"{"image": "ruby:3.3"}"#).unwrap();

    let pipeline = ImportPipeline::new(ImportSettings {
        allowed_root: Some(root.path().to_path_buf()),
        ..ImportSettings::default()
    });

    let ok = pipeline.import_file(&inside_path);
    assert!(ok.success);
    assert!(ok.mapping.unwrap().languages.contains(&Language::Ruby));

    let rejected = pipeline.import_file(&outside_path);
    assert!(!rejected.success);
    assert!(rejected.errors[0].contains("outside the allowed root"));

    let tiny = ImportPipeline::new(ImportSettings {
        max_file_size: 8,
        allowed_root: None,
    });
    let too_big = tiny.import_file(&inside_path);
    assert!(too_big.errors[0].contains("exceeds the maximum size"));
}
