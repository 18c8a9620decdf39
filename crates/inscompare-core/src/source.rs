//! Premium payload sources
//!
//! A [`PremiumSource`] hands back the raw upstream payload for a compiled
//! request. It does no interpretation; the response adapter owns that.

use crate::config::SourceConfig;
use crate::error::{Result, ResultExt};
use crate::query_compiler::CompiledRequest;
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};

/// Provider of raw premium payloads
///
/// Implementations:
/// - [`FixturePremiumSource`] for deterministic offline payloads
/// - [`FilePremiumSource`] for a payload captured to disk
pub trait PremiumSource: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Fetch the payload for `request`; `None` when the upstream had nothing
    fn fetch(&self, request: &CompiledRequest) -> Result<Option<Value>>;
}

/// Deterministic wrapped payload derived from the request itself
#[derive(Debug, Clone, Copy, Default)]
pub struct FixturePremiumSource;

impl FixturePremiumSource {
    const BASE: u64 = 10_000;
    const SPREAD: u64 = 90_000;

    fn premium_for(request: &CompiledRequest, insurer: &str) -> u64 {
        let mut hasher = blake3::Hasher::new();
        hasher.update(request.rule_version.as_bytes());
        hasher.update(insurer.as_bytes());
        for code in &request.coverage_codes {
            hasher.update(code.as_bytes());
        }
        let digest = hasher.finalize();
        let mut prefix = [0u8; 8];
        prefix.copy_from_slice(&digest.as_bytes()[..8]);

        // Whole tens of won
        let raw = Self::BASE + u64::from_le_bytes(prefix) % Self::SPREAD;
        raw - raw % 10
    }
}

impl PremiumSource for FixturePremiumSource {
    fn name(&self) -> &str {
        "fixture"
    }

    fn fetch(&self, request: &CompiledRequest) -> Result<Option<Value>> {
        let items: Vec<Value> = request
            .insurers
            .iter()
            .map(|insurer| {
                json!({
                    "insurer": insurer,
                    "basePremium": Self::premium_for(request, insurer),
                })
            })
            .collect();

        tracing::debug!(
            source = self.name(),
            insurers = items.len(),
            "generated fixture payload"
        );

        Ok(Some(json!({
            "returnCode": "0000",
            "returnMsg": "OK",
            "data": { "items": items },
        })))
    }
}

/// Payload read verbatim from a JSON file on every fetch
#[derive(Debug, Clone)]
pub struct FilePremiumSource {
    path: PathBuf,
}

impl FilePremiumSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PremiumSource for FilePremiumSource {
    fn name(&self) -> &str {
        "file"
    }

    fn fetch(&self, _request: &CompiledRequest) -> Result<Option<Value>> {
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("reading premium payload {}", self.path.display()))?;

        // An empty capture means the upstream returned nothing
        if content.trim().is_empty() {
            tracing::debug!(path = %self.path.display(), "premium payload file is empty");
            return Ok(None);
        }

        let payload: Value = serde_json::from_str(&content)
            .with_context(|| format!("parsing premium payload {}", self.path.display()))?;
        Ok(Some(payload))
    }
}

/// Build the source a configuration asks for
pub fn source_from_config(config: &SourceConfig) -> Box<dyn PremiumSource> {
    match config {
        SourceConfig::Fixture => Box::new(FixturePremiumSource),
        SourceConfig::File { path } => Box::new(FilePremiumSource::new(path.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query_compiler::ComparisonFocus;
    use crate::response_adapter::adapt;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn request() -> CompiledRequest {
        CompiledRequest {
            query: "일반암진단비".to_string(),
            rule_version: "2024.10".to_string(),
            insurers: vec!["MERITZ".to_string(), "SAMSUNG".to_string()],
            coverage_codes: vec!["CA_DIAG_GENERAL".to_string()],
            comparison_basis: None,
            surgery_method: None,
            cancer_subtypes: vec![],
            comparison_focus: ComparisonFocus::CoverageAmount,
        }
    }

    #[test]
    fn test_fixture_is_deterministic_and_adaptable() {
        let source = FixturePremiumSource;
        let first = source.fetch(&request()).unwrap();
        let second = source.fetch(&request()).unwrap();
        assert_eq!(first, second);

        let adapted = adapt(first.as_ref());
        assert!(adapted.is_ok());
        let items = adapted.items();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].insurer, "MERITZ");
        for item in items {
            assert!(item.base_premium >= 10_000 && item.base_premium < 100_000);
            assert_eq!(item.base_premium % 10, 0);
        }
    }

    #[test]
    fn test_fixture_varies_with_coverage() {
        let mut other = request();
        other.coverage_codes = vec!["CA_SURG_GENERAL".to_string()];
        assert_ne!(
            FixturePremiumSource::premium_for(&request(), "MERITZ"),
            FixturePremiumSource::premium_for(&other, "MERITZ")
        );
    }

    #[test]
    fn test_file_source_reads_payload() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"[{{"insurer": "KB", "basePremium": "31,200원"}}]"#).unwrap();

        let source = FilePremiumSource::new(file.path());
        let payload = source.fetch(&request()).unwrap();
        assert_eq!(adapt(payload.as_ref()).items()[0].base_premium, 31200);
    }

    #[test]
    fn test_file_source_empty_file_is_none() {
        let file = NamedTempFile::new().unwrap();
        let source = FilePremiumSource::new(file.path());
        assert_eq!(source.fetch(&request()).unwrap(), None);
    }

    #[test]
    fn test_file_source_missing_file_errors_with_context() {
        let source = FilePremiumSource::new("/definitely/not/here.json");
        let err = source.fetch(&request()).unwrap_err();
        assert!(err.to_string().contains("reading premium payload"));
    }

    #[test]
    fn test_source_from_config() {
        assert_eq!(source_from_config(&SourceConfig::Fixture).name(), "fixture");
        let file = SourceConfig::File {
            path: PathBuf::from("payload.json"),
        };
        assert_eq!(source_from_config(&file).name(), "file");
    }
}
