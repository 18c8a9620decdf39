//! Inscompare Core - Deterministic building blocks for insurance comparison
//!
//! Inscompare Core turns a user's question about insurance coverage into a
//! fully specified comparison request, normalizes the premium payloads
//! upstream insurers send back, and maps the backend's comparison verdict
//! onto the view that should render it.
//!
//! # Architecture
//!
//! Three independent components, each a pure function of its inputs:
//!
//! 1. **Query Compiler** (`query_compiler`): free text and selections to a
//!    compiled request, or a list of clarifications
//! 2. **Response Adapter** (`response_adapter`): simple, detailed and wrapped
//!    premium payloads to canonical line items
//! 3. **View Resolver** (`view_resolver`): compare contract to exactly one UI state
//!
//! Supporting modules: `mapping` (coverage name to code table), `config`
//! (policy and adapter settings), `source` (where raw premium payloads come from).
//!
//! # Quick Start
//!
//! ```
//! use inscompare_core::mapping::{MappingEntry, MappingTable};
//! use inscompare_core::query_compiler::{compile, UserSelections};
//! use inscompare_core::source::{FixturePremiumSource, PremiumSource};
//! use inscompare_core::response_adapter::adapt;
//!
//! let table = MappingTable::new("2024.10")
//!     .with_entry(MappingEntry::new("일반암진단비", "CA_DIAG_GENERAL"));
//! let selections = UserSelections::new().with_insurers(["SAMSUNG", "MERITZ"]);
//!
//! let outcome = compile("일반암진단비 비교해줘", &selections, &table);
//! let output = outcome.compiled().unwrap();
//!
//! let payload = FixturePremiumSource.fetch(&output.compiled_request).unwrap();
//! let premiums = adapt(payload.as_ref());
//! assert_eq!(premiums.items().len(), 2);
//! ```
//!
//! # Design Principles
//!
//! 1. **Determinism**: identical inputs give byte-identical outputs, traces included
//! 2. **Failures are data**: clarifications, upstream errors and contract drift
//!    are values, never panics
//! 3. **No hidden state**: nothing is cached between calls

#![deny(unsafe_code)]
#![warn(rust_2018_idioms, missing_debug_implementations, clippy::all)]

pub mod config;
pub mod error;
pub mod mapping;
pub mod query_compiler;
pub mod response_adapter;
pub mod source;
pub mod view_resolver;

// Re-export commonly used types for convenience
pub use config::{AdapterConfig, CompareConfig, CompilerPolicy, SourceConfig};
pub use error::{CompareError, MappingError, Result, ResultExt};
pub use mapping::{MappingEntry, MappingTable, SlotSensitivity};
pub use query_compiler::{
    compile, ClarificationNeeded, ClarificationRequirement, CompileOutcome, CompileOutput,
    CompileRequest, CompiledRequest, ComparisonFocus, QueryCompiler, SurgeryMethod,
    UserSelections,
};
pub use response_adapter::{adapt, AdaptedPremium, FailureReason, PremiumAdapter, PremiumItem};
pub use source::{source_from_config, FilePremiumSource, FixturePremiumSource, PremiumSource};
pub use view_resolver::{
    resolve_view, resolve_view_value, CompareResponse, ComparisonResult, UiState,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod integration_tests {
    use super::*;
    use query_compiler::RequirementKind;
    use serde_json::json;

    fn table() -> MappingTable {
        MappingTable::new("2024.10")
            .with_entry(MappingEntry::new("일반암진단비", "CA_DIAG_GENERAL"))
            .with_entry(MappingEntry::new("암수술비", "CA_SURG_GENERAL"))
            .with_entry(
                MappingEntry::new("유사암진단비", "CA_DIAG_SIMILAR")
                    .sensitive_to(SlotSensitivity::CancerSubtypes),
            )
    }

    #[test]
    fn test_end_to_end_workflow() {
        let config = CompareConfig::default();
        let compiler = QueryCompiler::new(config.compiler.clone());
        let selections = UserSelections::new().with_insurers(["samsung", "MERITZ"]);

        // Compile
        let outcome = compiler.compile("일반암진단비 비교", &selections, &table());
        let output = outcome.compiled().unwrap();
        assert_eq!(output.compiled_request.insurers, vec!["MERITZ", "SAMSUNG"]);
        assert_eq!(
            output.compiled_request.coverage_codes,
            vec!["CA_DIAG_GENERAL"]
        );

        // Fetch and adapt
        let source = source_from_config(&config.source);
        let payload = source.fetch(&output.compiled_request).unwrap();
        let premiums = PremiumAdapter::new(config.adapter.clone()).adapt(payload.as_ref());
        assert!(premiums.is_ok());
        assert_eq!(premiums.items().len(), 2);

        // Resolve the backend verdict
        let rows = premiums
            .items()
            .iter()
            .map(|item| serde_json::to_value(item).unwrap())
            .collect();
        let response = CompareResponse::new("comparable").with_rows(rows);
        match resolve_view(&response) {
            UiState::CompareResult { fact_rows, .. } => assert_eq!(fact_rows.len(), 2),
            other => panic!("expected CompareResult, got {:?}", other),
        }
    }

    #[test]
    fn test_clarification_blocks_pipeline() {
        let outcome = compile(
            "유사암진단비",
            &UserSelections::new().with_insurers(["KB"]),
            &table(),
        );
        let needed = outcome.clarification().unwrap();
        assert!(needed.clarification_needed);
        assert!(needed.requires(RequirementKind::Insurers));
        assert!(needed.requires(RequirementKind::CancerSubtypes));
    }

    #[test]
    fn test_failures_stay_data() {
        assert_eq!(adapt(None).reason(), Some(FailureReason::NullInput));
        assert!(resolve_view_value(&json!({"comparison_result": "??"})).is_unknown());
    }
}
