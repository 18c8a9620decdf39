//! Query Compiler - Resolves a free-text query into a comparison request
//!
//! Rules run in a fixed order and each one appends a line to the decision
//! trace; tie-breaks append their own line while codes are resolved. The
//! output depends only on the query, the selections, the mapping table and
//! the compiler policy.

use super::requirement::{ClarificationNeeded, ClarificationRequirement};
use super::selections::{normalize_subtype, ComparisonFocus, SurgeryMethod, UserSelections};
use super::CompileRequest;
use crate::config::CompilerPolicy;
use crate::mapping::{
    normalize_text, normalize_with_breaks, MappingEntry, MappingTable, SlotSensitivity,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Query Compiler
///
/// Holds only its policy; every call to [`QueryCompiler::compile`] is
/// independent of every other.
#[derive(Debug, Clone, Default)]
pub struct QueryCompiler {
    policy: CompilerPolicy,
}

impl QueryCompiler {
    pub fn new(policy: CompilerPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &CompilerPolicy {
        &self.policy
    }

    /// Compile a wire-level request
    pub fn compile_request(&self, request: &CompileRequest, table: &MappingTable) -> CompileOutcome {
        self.compile(&request.user_query, &request.selections(), table)
    }

    /// Compile a query and selections against a mapping table
    pub fn compile(
        &self,
        query: &str,
        selections: &UserSelections,
        table: &MappingTable,
    ) -> CompileOutcome {
        let (normalized_query, word_breaks) = normalize_with_breaks(query);
        let mut trace = DecisionTrace::default();
        let mut warnings = Vec::new();

        // 1. Extract coverage mentions
        let mentions = self.extract_mentions(&normalized_query, table, &mut trace, &mut warnings);

        // 2. Flag coverage-like spans the table does not know
        self.flag_unmatched_mentions(
            &normalized_query,
            &word_breaks,
            &mentions,
            &mut trace,
            &mut warnings,
        );

        // 3. Resolve mentions to canonical codes
        let resolution = self.resolve_codes(&mentions.names, table, &mut trace, &mut warnings);

        // 4. Resolve every slot
        let insurers = self.resolve_insurers(selections, &mut trace);
        let surgery_method =
            self.resolve_surgery_method(&normalized_query, &resolution, selections, &mut trace);
        let cancer_subtypes = self.resolve_cancer_subtypes(
            &normalized_query,
            &resolution,
            selections,
            &mut trace,
            &mut warnings,
        );
        let comparison_focus =
            self.resolve_comparison_focus(&normalized_query, &resolution, selections, &mut trace);
        let comparison_basis = self.resolve_comparison_basis(selections, &mut trace);

        // 5. Block on every unmet requirement at once
        let (insurers, surgery_method, cancer_subtypes, comparison_focus) =
            match (insurers, surgery_method, cancer_subtypes, comparison_focus) {
                (
                    Slot::Resolved(insurers),
                    Slot::Resolved(surgery_method),
                    Slot::Resolved(cancer_subtypes),
                    Slot::Resolved(comparison_focus),
                ) => (insurers, surgery_method, cancer_subtypes, comparison_focus),
                (insurers, surgery_method, cancer_subtypes, comparison_focus) => {
                    let requirements: Vec<ClarificationRequirement> = [
                        insurers.missing(),
                        surgery_method.missing(),
                        cancer_subtypes.missing(),
                        comparison_focus.missing(),
                    ]
                    .into_iter()
                    .flatten()
                    .collect();
                    let needed = ClarificationNeeded::new(requirements);
                    tracing::debug!(
                        rule_version = %table.rule_version,
                        kinds = ?needed.kinds(),
                        steps = trace.len(),
                        "clarification needed"
                    );
                    return CompileOutcome::ClarificationNeeded(needed);
                }
            };

        // 6. Assemble
        let compiled_request = CompiledRequest {
            query: query.trim().to_string(),
            rule_version: table.rule_version.clone(),
            insurers: insurers.into_iter().collect(),
            coverage_codes: resolution.codes.clone(),
            comparison_basis,
            surgery_method,
            cancer_subtypes: cancer_subtypes.into_iter().collect(),
            comparison_focus,
        };
        trace.record(
            "assemble",
            format!(
                "compiled request for {} insurers and {} coverage codes",
                compiled_request.insurers.len(),
                compiled_request.coverage_codes.len()
            ),
        );

        let selected_slots = compiled_request.slots();
        let trace_fingerprint = fingerprint(&table.rule_version, &trace, &selected_slots);

        tracing::debug!(
            rule_version = %table.rule_version,
            codes = ?compiled_request.coverage_codes,
            warnings = warnings.len(),
            fingerprint = %trace_fingerprint,
            "compiled comparison request"
        );

        CompileOutcome::Compiled(CompileOutput {
            compiled_request,
            compiler_debug: CompilerDebug {
                rule_version: table.rule_version.clone(),
                resolved_coverage_codes: resolution.attempted.then_some(resolution.codes),
                selected_slots,
                decision_trace: trace,
                warnings,
                trace_fingerprint,
            },
        })
    }

    fn extract_mentions(
        &self,
        normalized_query: &str,
        table: &MappingTable,
        trace: &mut DecisionTrace,
        warnings: &mut Vec<String>,
    ) -> Mentions {
        let names = table.normalized_names();

        let mut candidates: Vec<(usize, usize, &str)> = Vec::new();
        for name in &names {
            for (start, _) in normalized_query.match_indices(name.as_str()) {
                candidates.push((start, start + name.len(), name.as_str()));
            }
        }

        // Longest name first, leftmost among equals
        candidates.sort_by(|a, b| (b.1 - b.0).cmp(&(a.1 - a.0)).then(a.0.cmp(&b.0)));

        let mut accepted: Vec<(usize, usize, &str)> = Vec::new();
        for (start, end, name) in candidates {
            let overlapping = accepted
                .iter()
                .find(|(s, e, _)| start < *e && *s < end)
                .map(|(_, _, kept)| *kept);
            match overlapping {
                None => accepted.push((start, end, name)),
                Some(kept) if kept == name => {}
                Some(kept) => {
                    let warning = format!(
                        "partial match '{}' overlaps '{}'; kept the longer coverage name",
                        name, kept
                    );
                    if !warnings.contains(&warning) {
                        warnings.push(warning);
                    }
                }
            }
        }
        accepted.sort_by_key(|(start, _, _)| *start);

        let mut mentions = Mentions::default();
        for (start, end, name) in accepted {
            mentions.spans.push((start, end));
            if !mentions.names.iter().any(|m| m == name) {
                mentions.names.push(name.to_string());
            }
        }

        if mentions.names.is_empty() {
            trace.record(
                "extract_mentions",
                format!("none of {} coverage names matched the query", names.len()),
            );
        } else {
            trace.record(
                "extract_mentions",
                format!(
                    "matched [{}] among {} coverage names",
                    mentions.names.join(", "),
                    names.len()
                ),
            );
        }
        mentions
    }

    /// Coverage-like spans are found on the normalized query: each one ends
    /// at a configured suffix and starts at the word holding that suffix (or
    /// the word before it when the suffix stands alone). A span never reaches
    /// back past punctuation, an accepted mention or an earlier span.
    fn flag_unmatched_mentions(
        &self,
        normalized_query: &str,
        word_breaks: &[usize],
        mentions: &Mentions,
        trace: &mut DecisionTrace,
        warnings: &mut Vec<String>,
    ) {
        let overlaps_mention =
            |start: usize, end: usize| mentions.spans.iter().any(|(s, e)| start < *e && *s < end);

        let mut suffix_hits: Vec<(usize, usize)> = Vec::new();
        for suffix in &self.policy.coverage_suffixes {
            let suffix = normalize_text(suffix);
            if suffix.is_empty() {
                continue;
            }
            for (start, _) in normalized_query.match_indices(suffix.as_str()) {
                suffix_hits.push((start, start + suffix.len()));
            }
        }
        suffix_hits.sort_by_key(|(start, end)| (*start, Reverse(*end)));

        let hard_breaks: Vec<usize> = normalized_query
            .char_indices()
            .filter(|(_, c)| !c.is_alphanumeric())
            .map(|(i, c)| i + c.len_utf8())
            .collect();

        let mut unmatched: Vec<String> = Vec::new();
        let mut previous_end = 0;
        for (start, end) in suffix_hits {
            if start < previous_end || overlaps_mention(start, end) {
                continue;
            }

            let floor = mentions
                .spans
                .iter()
                .map(|(_, e)| *e)
                .chain(hard_breaks.iter().copied())
                .filter(|e| *e <= start)
                .chain([previous_end])
                .max()
                .unwrap_or(0);
            let word_start = match word_breaks.iter().rev().find(|b| **b <= start) {
                Some(b) if *b == start => word_breaks.iter().rev().find(|b| **b < start),
                other => other,
            }
            .copied()
            .unwrap_or(0);

            let span = &normalized_query[word_start.max(floor)..end];
            if !span.is_empty() && !unmatched.iter().any(|u| u == span) {
                unmatched.push(span.to_string());
            }
            previous_end = end;
        }

        for span in &unmatched {
            warnings.push(format!("unmatched coverage mention '{}'", span));
        }
        if unmatched.is_empty() {
            trace.record(
                "flag_unmatched_mentions",
                "every coverage-like span matched the table",
            );
        } else {
            trace.record(
                "flag_unmatched_mentions",
                format!(
                    "{} coverage-like spans without a mapping: [{}]",
                    unmatched.len(),
                    unmatched.join(", ")
                ),
            );
        }
    }

    fn resolve_codes(
        &self,
        mentions: &[String],
        table: &MappingTable,
        trace: &mut DecisionTrace,
        warnings: &mut Vec<String>,
    ) -> Resolution {
        let mut resolution = Resolution {
            attempted: !mentions.is_empty(),
            ..Resolution::default()
        };
        let mut steps = Vec::new();

        for mention in mentions {
            let eligible: Vec<&MappingEntry> = table
                .entries_named(mention)
                .filter(|e| table.is_eligible(e))
                .collect();

            let Some(chosen) = eligible.first() else {
                warnings.push(format!(
                    "coverage '{}' has no active code for rule version {}",
                    mention, table.rule_version
                ));
                steps.push(format!("{} -> (none)", mention));
                continue;
            };

            let mut distinct_codes: Vec<&str> = Vec::new();
            for entry in &eligible {
                if !distinct_codes.contains(&entry.coverage_code.as_str()) {
                    distinct_codes.push(&entry.coverage_code);
                }
            }
            if distinct_codes.len() > 1 {
                warnings.push(format!(
                    "ambiguous coverage '{}' matched {} active codes",
                    mention,
                    distinct_codes.len()
                ));
                trace.record(
                    "tie_break",
                    format!(
                        "'{}' matched [{}]; chose {} (first listed for rule version {})",
                        mention,
                        distinct_codes.join(", "),
                        chosen.coverage_code,
                        table.rule_version
                    ),
                );
            }

            steps.push(format!("{} -> {}", mention, chosen.coverage_code));
            if !resolution.codes.contains(&chosen.coverage_code) {
                resolution.codes.push(chosen.coverage_code.clone());
            }
            resolution
                .sensitivities
                .extend(chosen.sensitivity.iter().copied());
        }

        if steps.is_empty() {
            trace.record("resolve_codes", "no mentions to resolve");
        } else {
            trace.record("resolve_codes", steps.join("; "));
        }
        resolution
    }

    fn resolve_insurers(
        &self,
        selections: &UserSelections,
        trace: &mut DecisionTrace,
    ) -> Slot<BTreeSet<String>> {
        let insurers = selections.distinct_insurers();
        let min_required = self.policy.required_insurers();
        let listed = join(&insurers);

        if insurers.len() < min_required {
            trace.record(
                "slot insurers",
                format!(
                    "{} distinct selected [{}], minimum {} -> clarification",
                    insurers.len(),
                    listed,
                    min_required
                ),
            );
            return Slot::Missing(ClarificationRequirement::Insurers {
                reason: format!(
                    "Select at least {} distinct insurers to compare ({} selected).",
                    min_required,
                    insurers.len()
                ),
                min_required,
            });
        }

        trace.record(
            "slot insurers",
            format!(
                "{} distinct selected [{}], minimum {} -> satisfied",
                insurers.len(),
                listed,
                min_required
            ),
        );
        Slot::Resolved(insurers)
    }

    fn resolve_surgery_method(
        &self,
        normalized_query: &str,
        resolution: &Resolution,
        selections: &UserSelections,
        trace: &mut DecisionTrace,
    ) -> Slot<Option<SurgeryMethod>> {
        if let Some(method) = selections.surgery_method {
            trace.record("slot surgery_method", format!("explicit selection {}", method));
            return Slot::Resolved(Some(method));
        }

        let cause = if resolution
            .sensitivities
            .contains(&SlotSensitivity::SurgeryMethod)
        {
            Some("mapped coverage is flagged surgery_method".to_string())
        } else {
            find_term(normalized_query, &self.policy.surgery_terms)
                .map(|term| format!("query mentions '{}'", term))
        };
        let Some(cause) = cause else {
            trace.record("slot surgery_method", "not surgery-method sensitive; left unset");
            return Slot::Resolved(None);
        };

        if let Some((keyword, method)) =
            first_keyword_match(normalized_query, &self.policy.surgery_method_keywords)
        {
            trace.record(
                "slot surgery_method",
                format!("sensitive ({}); inferred {} from '{}'", cause, method, keyword),
            );
            return Slot::Resolved(Some(method));
        }

        trace.record(
            "slot surgery_method",
            format!("sensitive ({}); nothing selected -> clarification", cause),
        );
        Slot::Missing(ClarificationRequirement::SurgeryMethod {
            reason: format!(
                "This coverage pays differently by surgery method ({}). Choose one.",
                cause
            ),
            options: SurgeryMethod::ALL.to_vec(),
        })
    }

    fn resolve_cancer_subtypes(
        &self,
        normalized_query: &str,
        resolution: &Resolution,
        selections: &UserSelections,
        trace: &mut DecisionTrace,
        warnings: &mut Vec<String>,
    ) -> Slot<BTreeSet<String>> {
        let options = &self.policy.cancer_subtype_options;

        let mut selected = BTreeSet::new();
        for subtype in selections
            .cancer_subtypes
            .iter()
            .filter_map(|s| normalize_subtype(s))
        {
            if options.contains(&subtype) {
                selected.insert(subtype);
            } else {
                warnings.push(format!(
                    "cancer subtype '{}' is not a known option; ignored",
                    subtype
                ));
            }
        }
        if !selected.is_empty() {
            trace.record(
                "slot cancer_subtypes",
                format!("explicit selection [{}]", join(&selected)),
            );
            return Slot::Resolved(selected);
        }

        let cause = if resolution
            .sensitivities
            .contains(&SlotSensitivity::CancerSubtypes)
        {
            Some("mapped coverage is flagged cancer_subtypes".to_string())
        } else {
            find_term(normalized_query, &self.policy.cancer_subtype_terms)
                .map(|term| format!("query mentions '{}'", term))
        };
        let Some(cause) = cause else {
            trace.record("slot cancer_subtypes", "not cancer-subtype sensitive; left empty");
            return Slot::Resolved(BTreeSet::new());
        };

        let hinted: BTreeSet<&String> = self
            .policy
            .cancer_subtype_keywords
            .iter()
            .filter(|(keyword, _)| contains_term(normalized_query, keyword))
            .map(|(_, subtype)| subtype)
            .collect();
        let detected: Vec<String> = options
            .iter()
            .filter(|o| hinted.contains(o))
            .cloned()
            .collect();

        trace.record(
            "slot cancer_subtypes",
            format!(
                "sensitive ({}); detected [{}], nothing selected -> clarification",
                cause,
                detected.join(", ")
            ),
        );
        Slot::Missing(ClarificationRequirement::CancerSubtypes {
            reason: format!(
                "Benefits differ by cancer subtype ({}). Choose at least one.",
                cause
            ),
            options: options.clone(),
            detected,
        })
    }

    fn resolve_comparison_focus(
        &self,
        normalized_query: &str,
        resolution: &Resolution,
        selections: &UserSelections,
        trace: &mut DecisionTrace,
    ) -> Slot<ComparisonFocus> {
        if let Some(focus) = selections.comparison_focus {
            trace.record("slot comparison_focus", format!("explicit selection {}", focus));
            return Slot::Resolved(focus);
        }

        if let Some((keyword, focus)) =
            first_keyword_match(normalized_query, &self.policy.focus_keywords)
        {
            trace.record(
                "slot comparison_focus",
                format!("inferred {} from '{}'", focus, keyword),
            );
            return Slot::Resolved(focus);
        }

        if !resolution.codes.is_empty() {
            trace.record(
                "slot comparison_focus",
                format!(
                    "defaulted to {} for {} resolved coverage codes",
                    ComparisonFocus::CoverageAmount,
                    resolution.codes.len()
                ),
            );
            return Slot::Resolved(ComparisonFocus::CoverageAmount);
        }

        trace.record(
            "slot comparison_focus",
            "no coverage resolved and no focus keyword -> clarification",
        );
        Slot::Missing(ClarificationRequirement::ComparisonFocus {
            reason: "Nothing in the query says what to compare. Choose a comparison focus."
                .to_string(),
            options: ComparisonFocus::ALL.to_vec(),
        })
    }

    fn resolve_comparison_basis(
        &self,
        selections: &UserSelections,
        trace: &mut DecisionTrace,
    ) -> Option<String> {
        let explicit = selections
            .comparison_basis
            .as_deref()
            .map(str::trim)
            .filter(|b| !b.is_empty());

        match (explicit, &self.policy.default_comparison_basis) {
            (Some(basis), _) => {
                trace.record("slot comparison_basis", format!("explicit selection {}", basis));
                Some(basis.to_string())
            }
            (None, Some(default)) => {
                trace.record("slot comparison_basis", format!("policy default {}", default));
                Some(default.clone())
            }
            (None, None) => {
                trace.record("slot comparison_basis", "not specified");
                None
            }
        }
    }
}

/// Compile with the default policy
pub fn compile(query: &str, selections: &UserSelections, table: &MappingTable) -> CompileOutcome {
    QueryCompiler::default().compile(query, selections, table)
}

/// Result of one compilation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CompileOutcome {
    ClarificationNeeded(ClarificationNeeded),
    Compiled(CompileOutput),
}

impl CompileOutcome {
    pub fn is_compiled(&self) -> bool {
        matches!(self, Self::Compiled(_))
    }

    pub fn compiled(&self) -> Option<&CompileOutput> {
        match self {
            Self::Compiled(output) => Some(output),
            Self::ClarificationNeeded(_) => None,
        }
    }

    pub fn clarification(&self) -> Option<&ClarificationNeeded> {
        match self {
            Self::ClarificationNeeded(needed) => Some(needed),
            Self::Compiled(_) => None,
        }
    }
}

/// Compiled request plus the debug record of how it was reached
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompileOutput {
    pub compiled_request: CompiledRequest,
    pub compiler_debug: CompilerDebug,
}

/// Fully specified comparison request sent to the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompiledRequest {
    pub query: String,
    pub rule_version: String,
    pub insurers: Vec<String>,
    pub coverage_codes: Vec<String>,
    pub comparison_basis: Option<String>,
    pub surgery_method: Option<SurgeryMethod>,
    pub cancer_subtypes: Vec<String>,
    pub comparison_focus: ComparisonFocus,
}

impl CompiledRequest {
    /// Final value of every slot, keyed by slot name
    pub fn slots(&self) -> BTreeMap<String, Value> {
        BTreeMap::from([
            ("insurers".to_string(), Value::from(self.insurers.clone())),
            (
                "comparison_basis".to_string(),
                self.comparison_basis
                    .clone()
                    .map_or(Value::Null, Value::from),
            ),
            (
                "surgery_method".to_string(),
                self.surgery_method
                    .map_or(Value::Null, |m| Value::from(m.as_str())),
            ),
            (
                "cancer_subtypes".to_string(),
                Value::from(self.cancer_subtypes.clone()),
            ),
            (
                "comparison_focus".to_string(),
                Value::from(self.comparison_focus.as_str()),
            ),
        ])
    }
}

/// Debug record attached to every compiled request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompilerDebug {
    pub rule_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_coverage_codes: Option<Vec<String>>,
    pub selected_slots: BTreeMap<String, Value>,
    pub decision_trace: DecisionTrace,
    pub warnings: Vec<String>,
    /// BLAKE3 of rule version, trace and slots
    pub trace_fingerprint: String,
}

/// Ordered, append-only log of rule firings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DecisionTrace(Vec<String>);

impl DecisionTrace {
    pub fn record(&mut self, rule: &str, detail: impl fmt::Display) {
        self.0.push(format!("{}: {}", rule, detail));
    }

    pub fn entries(&self) -> &[String] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// Internal types

enum Slot<T> {
    Resolved(T),
    Missing(ClarificationRequirement),
}

impl<T> Slot<T> {
    fn missing(self) -> Option<ClarificationRequirement> {
        match self {
            Slot::Resolved(_) => None,
            Slot::Missing(requirement) => Some(requirement),
        }
    }
}

/// Accepted coverage mentions: distinct names in query order, plus the
/// byte range of every accepted match in the normalized query
#[derive(Debug, Default)]
struct Mentions {
    names: Vec<String>,
    spans: Vec<(usize, usize)>,
}

#[derive(Debug, Default)]
struct Resolution {
    attempted: bool,
    codes: Vec<String>,
    sensitivities: BTreeSet<SlotSensitivity>,
}

fn contains_term(normalized_query: &str, term: &str) -> bool {
    let needle = normalize_text(term);
    !needle.is_empty() && normalized_query.contains(&needle)
}

/// First configured term present in the query, in listed order
fn find_term<'a>(normalized_query: &str, terms: &'a [String]) -> Option<&'a str> {
    terms
        .iter()
        .find(|term| contains_term(normalized_query, term))
        .map(String::as_str)
}

/// Keyword occurring earliest in the query; longer keywords win ties
fn first_keyword_match<T: Copy>(
    normalized_query: &str,
    keywords: &BTreeMap<String, T>,
) -> Option<(String, T)> {
    keywords
        .iter()
        .filter_map(|(keyword, value)| {
            let needle = normalize_text(keyword);
            if needle.is_empty() {
                return None;
            }
            normalized_query
                .find(&needle)
                .map(|pos| (pos, Reverse(needle.len()), keyword, *value))
        })
        .min_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(&b.1)))
        .map(|(_, _, keyword, value)| (keyword.clone(), value))
}

fn join(values: &BTreeSet<String>) -> String {
    values.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
}

fn fingerprint(rule_version: &str, trace: &DecisionTrace, slots: &BTreeMap<String, Value>) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(rule_version.as_bytes());
    for entry in trace.iter() {
        hasher.update(b"\n");
        hasher.update(entry.as_bytes());
    }
    for (slot, value) in slots {
        hasher.update(b"\n");
        hasher.update(slot.as_bytes());
        hasher.update(b"=");
        hasher.update(value.to_string().as_bytes());
    }
    hasher.finalize().to_hex().to_string()
}
