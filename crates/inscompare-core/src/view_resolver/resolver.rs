//! View Resolver - Compare response to UI state
//!
//! Stateless and total: every input maps to exactly one [`UiState`], and
//! anything the resolver does not recognize becomes `UnknownState`.

use super::contract::{CompareResponse, ComparisonResult};
use super::state::{MessageVariant, UiState};
use serde::Deserialize;
use serde_json::Value;

/// Resolve a typed compare response
pub fn resolve_view(response: &CompareResponse) -> UiState {
    match &response.comparison_result {
        ComparisonResult::Comparable => UiState::CompareResult {
            schema_version: response.schema_version.clone(),
            fact_rows: response.fact_table.rows.clone(),
            evidence_panels: response.evidence_panels.clone(),
        },
        ComparisonResult::Unmapped => UiState::generic_message(MessageVariant::Unmapped),
        ComparisonResult::OutOfUniverse => UiState::generic_message(MessageVariant::OutOfUniverse),
        ComparisonResult::PolicyRequired => UiState::PolicyVerificationView {
            schema_version: response.schema_version.clone(),
            policy_evidence: response.policy_evidence_a.clone(),
            evidence_panels: response.evidence_panels.clone(),
        },
        ComparisonResult::Other(raw) => {
            tracing::warn!(
                comparison_result = %raw,
                schema_version = %response.schema_version,
                "unrecognized comparison_result, resolving to UnknownState"
            );
            UiState::unknown(Some(raw.clone()))
        }
    }
}

/// Resolve a raw JSON contract; anything that does not deserialize degrades
/// to `UnknownState`
pub fn resolve_view_value(raw: &Value) -> UiState {
    match CompareResponse::deserialize(raw) {
        Ok(response) => resolve_view(&response),
        Err(err) => {
            let received = raw
                .get("comparison_result")
                .and_then(Value::as_str)
                .map(str::to_owned);
            tracing::warn!(
                error = %err,
                received = received.as_deref().unwrap_or("<missing>"),
                "compare response does not match the contract, resolving to UnknownState"
            );
            UiState::unknown(received)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn comparable_response() -> CompareResponse {
        CompareResponse::new("comparable")
            .with_rows(vec![
                json!({"insurer": "SAMSUNG", "amount": 30000000}),
                json!({"insurer": "MERITZ", "amount": 30000000}),
            ])
            .with_evidence_panels(vec![json!({"source": "약관 p.12"})])
    }

    #[test]
    fn test_comparable_resolves_to_compare_result() {
        match resolve_view(&comparable_response()) {
            UiState::CompareResult {
                fact_rows,
                evidence_panels,
                schema_version,
            } => {
                assert_eq!(fact_rows.len(), 2);
                assert_eq!(evidence_panels.len(), 1);
                assert_eq!(schema_version, "next4.v2");
            }
            other => panic!("expected CompareResult, got {:?}", other),
        }
    }

    #[test]
    fn test_unmapped_and_out_of_universe_are_generic_messages() {
        assert_eq!(
            resolve_view(&CompareResponse::new("unmapped")),
            UiState::generic_message(MessageVariant::Unmapped)
        );
        assert_eq!(
            resolve_view(&CompareResponse::new("out_of_universe")),
            UiState::generic_message(MessageVariant::OutOfUniverse)
        );
    }

    #[test]
    fn test_policy_required_carries_evidence() {
        let response = CompareResponse::new("policy_required")
            .with_policy_evidence(json!({"clause": "제3조"}));
        match resolve_view(&response) {
            UiState::PolicyVerificationView {
                policy_evidence, ..
            } => assert_eq!(policy_evidence, Some(json!({"clause": "제3조"}))),
            other => panic!("expected PolicyVerificationView, got {:?}", other),
        }
    }

    #[test]
    fn test_policy_required_without_evidence_still_resolves() {
        let state = resolve_view(&CompareResponse::new("policy_required"));
        assert_eq!(state.view_name(), "PolicyVerificationView");
    }

    #[test]
    fn test_unknown_values_degrade() {
        for raw in ["unknown", "", "COMPARABLE", "comparable_v2"] {
            let state = resolve_view(&CompareResponse::new(raw));
            assert!(state.is_unknown(), "{} should be UnknownState", raw);
        }
    }

    #[test]
    fn test_unfamiliar_schema_version_is_not_an_error() {
        let response = comparable_response().with_schema_version("next5.v1");
        assert_eq!(resolve_view(&response).view_name(), "CompareResult");
    }

    #[test]
    fn test_value_entry_point_accepts_valid_contract() {
        let raw = json!({
            "schema_version": "next4.v2",
            "comparison_result": "comparable",
            "fact_table": {"rows": [{}, {}]},
            "evidence_panels": [{}]
        });
        assert_eq!(resolve_view_value(&raw).view_name(), "CompareResult");
    }

    #[test]
    fn test_value_entry_point_degrades_on_broken_contract() {
        let broken = json!({"comparison_result": "comparable", "fact_table": "oops"});
        assert_eq!(
            resolve_view_value(&broken),
            UiState::unknown(Some("comparable".to_string()))
        );

        for raw in [json!(null), json!(42), json!({}), json!({"comparison_result": 7})] {
            assert_eq!(resolve_view_value(&raw), UiState::unknown(None));
        }
    }
}
