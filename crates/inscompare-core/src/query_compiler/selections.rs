//! User selections and the wire-level compile request

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Surgery method a surgery-sensitive coverage is compared under
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurgeryMethod {
    Robotic,
    Laparoscopic,
    Open,
}

impl SurgeryMethod {
    pub const ALL: [SurgeryMethod; 3] = [Self::Robotic, Self::Laparoscopic, Self::Open];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Robotic => "robotic",
            Self::Laparoscopic => "laparoscopic",
            Self::Open => "open",
        }
    }
}

impl fmt::Display for SurgeryMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SurgeryMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_str() == s.trim())
            .ok_or_else(|| format!("unknown surgery method '{}'", s))
    }
}

/// What the comparison is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonFocus {
    Premium,
    CoverageAmount,
    CoverageTerms,
}

impl ComparisonFocus {
    pub const ALL: [ComparisonFocus; 3] = [Self::Premium, Self::CoverageAmount, Self::CoverageTerms];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Premium => "premium",
            Self::CoverageAmount => "coverage_amount",
            Self::CoverageTerms => "coverage_terms",
        }
    }
}

impl fmt::Display for ComparisonFocus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComparisonFocus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|f| f.as_str() == s.trim())
            .ok_or_else(|| format!("unknown comparison focus '{}'", s))
    }
}

/// Explicit user choices. Owned by the caller; the compiler only reads it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSelections {
    pub insurers: BTreeSet<String>,
    pub comparison_basis: Option<String>,
    pub surgery_method: Option<SurgeryMethod>,
    pub cancer_subtypes: BTreeSet<String>,
    pub comparison_focus: Option<ComparisonFocus>,
}

impl UserSelections {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_insurers<I, S>(mut self, insurers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.insurers
            .extend(insurers.into_iter().filter_map(|i| normalize_insurer(i.as_ref())));
        self
    }

    pub fn with_comparison_basis(mut self, basis: impl Into<String>) -> Self {
        self.comparison_basis = Some(basis.into());
        self
    }

    pub fn with_surgery_method(mut self, method: SurgeryMethod) -> Self {
        self.surgery_method = Some(method);
        self
    }

    pub fn with_cancer_subtypes<I, S>(mut self, subtypes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.cancer_subtypes
            .extend(subtypes.into_iter().filter_map(|s| normalize_subtype(s.as_ref())));
        self
    }

    pub fn with_comparison_focus(mut self, focus: ComparisonFocus) -> Self {
        self.comparison_focus = Some(focus);
        self
    }

    /// Insurer codes as the compiler sees them (trimmed, upper-cased, unique)
    pub fn distinct_insurers(&self) -> BTreeSet<String> {
        self.insurers
            .iter()
            .filter_map(|i| normalize_insurer(i))
            .collect()
    }
}

pub(crate) fn normalize_insurer(code: &str) -> Option<String> {
    let code = code.trim();
    (!code.is_empty()).then(|| code.to_uppercase())
}

pub(crate) fn normalize_subtype(subtype: &str) -> Option<String> {
    let subtype = subtype.trim();
    (!subtype.is_empty()).then(|| subtype.to_lowercase())
}

/// Compile request as it arrives over the wire
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileRequest {
    pub user_query: String,
    #[serde(default)]
    pub selected_insurers: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_comparison_basis: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<CompileOptions>,
}

/// Optional slot selections of a [`CompileRequest`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub surgery_method: Option<SurgeryMethod>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cancer_subtypes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comparison_focus: Option<ComparisonFocus>,
}

impl CompileRequest {
    /// Selections carried by this request
    pub fn selections(&self) -> UserSelections {
        let mut selections = UserSelections::new().with_insurers(&self.selected_insurers);
        selections.comparison_basis = self
            .selected_comparison_basis
            .as_deref()
            .map(str::trim)
            .filter(|b| !b.is_empty())
            .map(str::to_owned);

        if let Some(options) = &self.options {
            selections.surgery_method = options.surgery_method;
            selections.comparison_focus = options.comparison_focus;
            selections = selections.with_cancer_subtypes(&options.cancer_subtypes);
        }
        selections
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insurers_are_normalized_and_deduplicated() {
        let selections = UserSelections::new().with_insurers(["samsung", " SAMSUNG ", "Meritz", ""]);
        let insurers: Vec<_> = selections.insurers.iter().cloned().collect();
        assert_eq!(insurers, vec!["MERITZ", "SAMSUNG"]);
    }

    #[test]
    fn test_distinct_insurers_renormalizes_raw_sets() {
        let mut selections = UserSelections::new();
        selections.insurers.insert("kb".to_string());
        selections.insurers.insert("KB ".to_string());
        assert_eq!(selections.distinct_insurers().len(), 1);
    }

    #[test]
    fn test_surgery_method_parses_wire_names() {
        assert_eq!("robotic".parse::<SurgeryMethod>(), Ok(SurgeryMethod::Robotic));
        assert!("laser".parse::<SurgeryMethod>().is_err());
        assert_eq!(
            serde_json::to_string(&SurgeryMethod::Laparoscopic).unwrap(),
            "\"laparoscopic\""
        );
    }

    #[test]
    fn test_compile_request_maps_options() {
        let request: CompileRequest = serde_json::from_str(
            r#"{
                "user_query": "유사암진단비 비교",
                "selected_insurers": ["samsung", "meritz"],
                "selected_comparison_basis": "  ",
                "options": {
                    "surgery_method": "open",
                    "cancer_subtypes": ["Thyroid"],
                    "comparison_focus": "premium"
                }
            }"#,
        )
        .unwrap();

        let selections = request.selections();
        assert_eq!(selections.insurers.len(), 2);
        assert_eq!(selections.comparison_basis, None);
        assert_eq!(selections.surgery_method, Some(SurgeryMethod::Open));
        assert!(selections.cancer_subtypes.contains("thyroid"));
        assert_eq!(selections.comparison_focus, Some(ComparisonFocus::Premium));
    }

    #[test]
    fn test_compile_request_rejects_unknown_surgery_method() {
        let result: Result<CompileRequest, _> = serde_json::from_str(
            r#"{"user_query": "암수술비", "options": {"surgery_method": "laser"}}"#,
        );
        assert!(result.is_err());
    }
}
