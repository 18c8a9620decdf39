//! E2E Test: Full comparison pipeline from files on disk
//!
//! Loads configuration and the mapping table the way a deployment would,
//! then compiles, fetches, adapts and resolves.

use inscompare_core::config::{CompareConfig, SourceConfig};
use inscompare_core::mapping::MappingTable;
use inscompare_core::query_compiler::{QueryCompiler, SurgeryMethod, UserSelections};
use inscompare_core::response_adapter::{FailureReason, PremiumAdapter};
use inscompare_core::source::source_from_config;
use inscompare_core::view_resolver::{resolve_view, CompareResponse, UiState};
use serde_json::json;
use std::fs;
use tempfile::TempDir;

const MAPPING_JSON: &str = r#"{
    "rule_version": "2024.10",
    "entries": [
        {"coverage_name": "일반암진단비", "coverage_code": "CA_DIAG_GENERAL"},
        {"coverage_name": "암수술비", "coverage_code": "CA_SURG_GENERAL", "sensitivity": ["surgery_method"]},
        {"coverage_name": "암수술비", "coverage_code": "CA_SURG_LEGACY", "rule_version": "2023.04"}
    ]
}"#;

fn write(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).expect("write fixture");
    path
}

/// E2E test: Fixture source end to end
///
/// This test validates:
/// 1. TOML configuration and JSON mapping load from disk
/// 2. The compiled request drives the configured source
/// 3. Adapted premiums feed a comparable view
#[test]
fn e2e_fixture_pipeline() {
    let dir = TempDir::new().unwrap();
    let mapping_path = write(&dir, "mapping.json", MAPPING_JSON);
    let config_path = write(
        &dir,
        "inscompare.toml",
        r#"
[compiler]
min_insurers = 2

[adapter]
max_unwrap_depth = 3

[source]
kind = "fixture"
"#,
    );

    let config = CompareConfig::from_file(&config_path).unwrap();
    config.validate().unwrap();
    let table = MappingTable::from_file(&mapping_path).unwrap();

    let outcome = QueryCompiler::new(config.compiler.clone()).compile(
        "암수술비 보험료 비교",
        &UserSelections::new()
            .with_insurers(["HANWHA", "KB", "SAMSUNG"])
            .with_surgery_method(SurgeryMethod::Laparoscopic),
        &table,
    );
    let output = outcome.compiled().expect("all slots answered");
    assert_eq!(output.compiled_request.coverage_codes, vec!["CA_SURG_GENERAL"]);

    let source = source_from_config(&config.source);
    let payload = source.fetch(&output.compiled_request).unwrap();
    let premiums = PremiumAdapter::new(config.adapter.clone()).adapt(payload.as_ref());
    let insurers: Vec<&str> = premiums.items().iter().map(|i| i.insurer.as_str()).collect();
    assert_eq!(insurers, vec!["HANWHA", "KB", "SAMSUNG"]);

    let rows = premiums
        .items()
        .iter()
        .map(|item| serde_json::to_value(item).unwrap())
        .collect();
    match resolve_view(&CompareResponse::new("comparable").with_rows(rows)) {
        UiState::CompareResult { fact_rows, .. } => {
            assert_eq!(fact_rows.len(), 3);
            assert!(fact_rows[0]["basePremium"].is_i64());
        }
        other => panic!("expected CompareResult, got {:?}", other),
    }
}

/// E2E test: File source surfaces an upstream error as data
#[test]
fn e2e_file_source_upstream_error() {
    let dir = TempDir::new().unwrap();
    let payload_path = write(
        &dir,
        "payload.json",
        &json!({"returnCode": "E500", "returnMsg": "보험사 응답 지연"}).to_string(),
    );

    let config = CompareConfig::new().with_source(SourceConfig::File { path: payload_path });
    let table = MappingTable::from_json_str(MAPPING_JSON).unwrap();
    let outcome = QueryCompiler::new(config.compiler.clone()).compile(
        "일반암진단비",
        &UserSelections::new().with_insurers(["KB", "DB"]),
        &table,
    );
    let request = &outcome.compiled().unwrap().compiled_request;

    let payload = source_from_config(&config.source).fetch(request).unwrap();
    let premiums = PremiumAdapter::new(config.adapter.clone()).adapt(payload.as_ref());
    assert_eq!(premiums.reason(), Some(FailureReason::UpstreamError));
    assert_eq!(premiums.message(), Some("보험사 응답 지연"));
}

/// E2E test: Configuration round-trips through both formats
#[test]
fn e2e_config_round_trip() {
    let dir = TempDir::new().unwrap();
    let config = CompareConfig::new().with_source(SourceConfig::File {
        path: dir.path().join("payload.json"),
    });

    for name in ["config.toml", "config.json"] {
        let path = dir.path().join(name);
        config.to_file(&path).unwrap();
        assert_eq!(CompareConfig::from_file(&path).unwrap(), config);
    }
}

/// E2E test: A broken mapping table is rejected at load time
#[test]
fn e2e_invalid_mapping_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write(
        &dir,
        "mapping.json",
        r#"{"rule_version": "2024.10", "entries": [{"coverage_name": "암수술비", "coverage_code": ""}]}"#,
    );

    let err = MappingTable::from_file(&path).unwrap_err();
    assert!(err.to_string().contains("empty coverage code"));
}
