//! UI states the presentation layer renders

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Which generic message to show
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageVariant {
    Unmapped,
    OutOfUniverse,
}

impl MessageVariant {
    pub fn title(self) -> &'static str {
        match self {
            Self::Unmapped => "Coverage not mapped",
            Self::OutOfUniverse => "Coverage not supported",
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            Self::Unmapped => {
                "The requested coverage could not be matched to a comparable coverage code for the selected insurers."
            }
            Self::OutOfUniverse => {
                "The requested coverage is outside the set of coverages this service compares."
            }
        }
    }
}

/// Resolved UI state, produced fresh for every response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "view")]
pub enum UiState {
    CompareResult {
        schema_version: String,
        fact_rows: Vec<Value>,
        evidence_panels: Vec<Value>,
    },
    GenericMessage {
        variant: MessageVariant,
        title: String,
        message: String,
    },
    PolicyVerificationView {
        schema_version: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        policy_evidence: Option<Value>,
        evidence_panels: Vec<Value>,
    },
    /// Inert, retry-capable fallback for anything unrecognized
    UnknownState {
        #[serde(skip_serializing_if = "Option::is_none")]
        received: Option<String>,
        message: String,
        retryable: bool,
    },
}

impl UiState {
    pub fn generic_message(variant: MessageVariant) -> Self {
        Self::GenericMessage {
            variant,
            title: variant.title().to_string(),
            message: variant.message().to_string(),
        }
    }

    pub fn unknown(received: Option<String>) -> Self {
        Self::UnknownState {
            received,
            message: "We could not display this comparison. Please retry, or contact support if it keeps happening."
                .to_string(),
            retryable: true,
        }
    }

    /// Name of the view, as serialized in the `view` tag
    pub fn view_name(&self) -> &'static str {
        match self {
            Self::CompareResult { .. } => "CompareResult",
            Self::GenericMessage { .. } => "GenericMessage",
            Self::PolicyVerificationView { .. } => "PolicyVerificationView",
            Self::UnknownState { .. } => "UnknownState",
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::UnknownState { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_view_tag_matches_view_name() {
        let states = [
            UiState::CompareResult {
                schema_version: "next4.v2".to_string(),
                fact_rows: vec![],
                evidence_panels: vec![],
            },
            UiState::generic_message(MessageVariant::OutOfUniverse),
            UiState::PolicyVerificationView {
                schema_version: "next4.v2".to_string(),
                policy_evidence: None,
                evidence_panels: vec![],
            },
            UiState::unknown(None),
        ];

        for state in states {
            let json = serde_json::to_value(&state).unwrap();
            assert_eq!(json["view"], state.view_name());
        }
    }

    #[test]
    fn test_unknown_state_is_retryable() {
        let json = serde_json::to_value(UiState::unknown(Some("new_value".to_string()))).unwrap();
        assert_eq!(json["retryable"], true);
        assert_eq!(json["received"], "new_value");
        assert!(!json["message"].as_str().unwrap().is_empty());
    }

    #[test]
    fn test_generic_message_variant_is_snake_case() {
        let json = serde_json::to_value(UiState::generic_message(MessageVariant::OutOfUniverse))
            .unwrap();
        assert_eq!(json["variant"], "out_of_universe");
    }
}
