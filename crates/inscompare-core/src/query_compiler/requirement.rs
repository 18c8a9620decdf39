//! Clarification requirements raised when a slot cannot be resolved

use super::selections::{ComparisonFocus, SurgeryMethod};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which slot a requirement asks about
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequirementKind {
    Insurers,
    SurgeryMethod,
    CancerSubtypes,
    ComparisonFocus,
}

impl RequirementKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Insurers => "insurers",
            Self::SurgeryMethod => "surgery_method",
            Self::CancerSubtypes => "cancer_subtypes",
            Self::ComparisonFocus => "comparison_focus",
        }
    }
}

impl fmt::Display for RequirementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed need the user has to answer before compilation can proceed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClarificationRequirement {
    /// At least `min_required` distinct insurer codes
    Insurers { reason: String, min_required: usize },
    /// Exactly one of `options`
    SurgeryMethod {
        reason: String,
        options: Vec<SurgeryMethod>,
    },
    /// At least one of `options`; `detected` was inferred from the query
    CancerSubtypes {
        reason: String,
        options: Vec<String>,
        detected: Vec<String>,
    },
    /// Exactly one of `options`
    ComparisonFocus {
        reason: String,
        options: Vec<ComparisonFocus>,
    },
}

impl ClarificationRequirement {
    pub fn kind(&self) -> RequirementKind {
        match self {
            Self::Insurers { .. } => RequirementKind::Insurers,
            Self::SurgeryMethod { .. } => RequirementKind::SurgeryMethod,
            Self::CancerSubtypes { .. } => RequirementKind::CancerSubtypes,
            Self::ComparisonFocus { .. } => RequirementKind::ComparisonFocus,
        }
    }

    pub fn reason(&self) -> &str {
        match self {
            Self::Insurers { reason, .. }
            | Self::SurgeryMethod { reason, .. }
            | Self::CancerSubtypes { reason, .. }
            | Self::ComparisonFocus { reason, .. } => reason,
        }
    }
}

/// Compilation blocked on one or more unmet requirements
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClarificationNeeded {
    /// Always `true`; lets wire consumers branch on one field
    pub clarification_needed: bool,
    pub required_selections: Vec<ClarificationRequirement>,
}

impl ClarificationNeeded {
    pub fn new(required_selections: Vec<ClarificationRequirement>) -> Self {
        Self {
            clarification_needed: true,
            required_selections,
        }
    }

    pub fn kinds(&self) -> Vec<RequirementKind> {
        self.required_selections.iter().map(|r| r.kind()).collect()
    }

    pub fn requires(&self, kind: RequirementKind) -> bool {
        self.required_selections.iter().any(|r| r.kind() == kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requirement_wire_shape() {
        let requirement = ClarificationRequirement::CancerSubtypes {
            reason: "pick subtypes".to_string(),
            options: vec!["thyroid".to_string(), "skin".to_string()],
            detected: vec!["thyroid".to_string()],
        };

        let json = serde_json::to_value(&requirement).unwrap();
        assert_eq!(json["kind"], "cancer_subtypes");
        assert_eq!(json["detected"][0], "thyroid");
        assert_eq!(requirement.kind(), RequirementKind::CancerSubtypes);
    }

    #[test]
    fn test_clarification_needed_serializes_flag() {
        let needed = ClarificationNeeded::new(vec![ClarificationRequirement::Insurers {
            reason: "need two".to_string(),
            min_required: 2,
        }]);

        let json = serde_json::to_value(&needed).unwrap();
        assert_eq!(json["clarification_needed"], true);
        assert_eq!(json["required_selections"][0]["kind"], "insurers");
        assert_eq!(json["required_selections"][0]["min_required"], 2);
        assert!(needed.requires(RequirementKind::Insurers));
        assert!(!needed.requires(RequirementKind::SurgeryMethod));
    }
}
