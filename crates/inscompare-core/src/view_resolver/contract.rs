//! Backend compare-response contract, consumed read-only

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Schema version observed from the backend in practice
pub const OBSERVED_SCHEMA_VERSION: &str = "next4.v2";

/// `comparison_result` discriminant
///
/// Values outside the known set are kept verbatim in `Other` so that a
/// backend adding a new result never fails deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ComparisonResult {
    Comparable,
    Unmapped,
    PolicyRequired,
    OutOfUniverse,
    Other(String),
}

impl ComparisonResult {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Comparable => "comparable",
            Self::Unmapped => "unmapped",
            Self::PolicyRequired => "policy_required",
            Self::OutOfUniverse => "out_of_universe",
            Self::Other(raw) => raw,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

impl From<&str> for ComparisonResult {
    fn from(raw: &str) -> Self {
        match raw {
            "comparable" => Self::Comparable,
            "unmapped" => Self::Unmapped,
            "policy_required" => Self::PolicyRequired,
            "out_of_universe" => Self::OutOfUniverse,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for ComparisonResult {
    fn from(raw: String) -> Self {
        match Self::from(raw.as_str()) {
            Self::Other(_) => Self::Other(raw),
            known => known,
        }
    }
}

impl From<ComparisonResult> for String {
    fn from(result: ComparisonResult) -> Self {
        match result {
            ComparisonResult::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for ComparisonResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rows of the comparison fact table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FactTable {
    #[serde(default)]
    pub rows: Vec<Value>,
}

/// Compare response as returned by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompareResponse {
    /// Not validated here; negotiation happens elsewhere
    #[serde(default)]
    pub schema_version: String,
    pub comparison_result: ComparisonResult,
    #[serde(default)]
    pub fact_table: FactTable,
    #[serde(default)]
    pub evidence_panels: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy_evidence_a: Option<Value>,
}

impl CompareResponse {
    pub fn new(comparison_result: impl Into<ComparisonResult>) -> Self {
        Self {
            schema_version: OBSERVED_SCHEMA_VERSION.to_string(),
            comparison_result: comparison_result.into(),
            fact_table: FactTable::default(),
            evidence_panels: Vec::new(),
            policy_evidence_a: None,
        }
    }

    pub fn with_schema_version(mut self, version: impl Into<String>) -> Self {
        self.schema_version = version.into();
        self
    }

    pub fn with_rows(mut self, rows: Vec<Value>) -> Self {
        self.fact_table.rows = rows;
        self
    }

    pub fn with_evidence_panels(mut self, panels: Vec<Value>) -> Self {
        self.evidence_panels = panels;
        self
    }

    pub fn with_policy_evidence(mut self, evidence: Value) -> Self {
        self.policy_evidence_a = Some(evidence);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_known_results_parse() {
        assert_eq!(ComparisonResult::from("comparable"), ComparisonResult::Comparable);
        assert_eq!(
            ComparisonResult::from("out_of_universe"),
            ComparisonResult::OutOfUniverse
        );
    }

    #[test]
    fn test_unknown_results_are_preserved() {
        let result = ComparisonResult::from("partially_comparable".to_string());
        assert_eq!(
            result,
            ComparisonResult::Other("partially_comparable".to_string())
        );
        assert!(!result.is_known());
        assert_eq!(String::from(result), "partially_comparable");
    }

    #[test]
    fn test_response_deserializes_with_unfamiliar_version_and_result() {
        let response: CompareResponse = serde_json::from_value(json!({
            "schema_version": "next9.v7",
            "comparison_result": "needs_underwriting",
            "fact_table": {"rows": []},
            "evidence_panels": []
        }))
        .unwrap();

        assert_eq!(response.schema_version, "next9.v7");
        assert_eq!(
            response.comparison_result,
            ComparisonResult::Other("needs_underwriting".to_string())
        );
    }

    #[test]
    fn test_optional_sections_default() {
        let response: CompareResponse =
            serde_json::from_value(json!({"comparison_result": "unmapped"})).unwrap();
        assert!(response.fact_table.rows.is_empty());
        assert!(response.policy_evidence_a.is_none());
        assert_eq!(response.schema_version, "");
    }
}
