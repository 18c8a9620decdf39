//! Query Compiler - Free text and selections to a comparison request
//!
//! This module turns what a user typed and picked into either:
//! 1. a `ClarificationNeeded` listing every slot still missing, or
//! 2. a `CompileOutput` holding the compiled request and its decision trace.
//!
//! # Architecture
//!
//! - **Selections**: explicit user choices and the wire-level request
//! - **Requirement**: typed clarification needs
//! - **Compiler**: mention extraction, code resolution, slot resolution
//!
//! # Examples
//!
//! ```
//! use inscompare_core::mapping::{MappingEntry, MappingTable};
//! use inscompare_core::query_compiler::{compile, UserSelections};
//!
//! let table = MappingTable::new("2024.10")
//!     .with_entry(MappingEntry::new("일반암진단비", "CA_DIAG_GENERAL"));
//! let selections = UserSelections::new().with_insurers(["SAMSUNG", "MERITZ"]);
//!
//! let outcome = compile("일반암진단비", &selections, &table);
//! let output = outcome.compiled().expect("two insurers and a known coverage");
//! assert_eq!(output.compiled_request.coverage_codes, vec!["CA_DIAG_GENERAL"]);
//! ```

pub mod compiler;
pub mod requirement;
pub mod selections;

pub use compiler::{
    compile, CompileOutcome, CompileOutput, CompiledRequest, CompilerDebug, DecisionTrace,
    QueryCompiler,
};
pub use requirement::{ClarificationNeeded, ClarificationRequirement, RequirementKind};
pub use selections::{
    CompileOptions, CompileRequest, ComparisonFocus, SurgeryMethod, UserSelections,
};
