//! View Resolver - Backend compare contract to a single UI state
//!
//! The backend decides *what* the comparison outcome is; this module only
//! decides *which view* renders it. Unknown outcomes never fail: they fall
//! back to a retry-capable `UnknownState`.
//!
//! # Examples
//!
//! ```
//! use inscompare_core::view_resolver::{resolve_view, CompareResponse};
//!
//! let state = resolve_view(&CompareResponse::new("out_of_universe"));
//! assert_eq!(state.view_name(), "GenericMessage");
//!
//! let drifted = resolve_view(&CompareResponse::new("brand_new_outcome"));
//! assert!(drifted.is_unknown());
//! ```

pub mod contract;
pub mod resolver;
pub mod state;

pub use contract::{CompareResponse, ComparisonResult, FactTable, OBSERVED_SCHEMA_VERSION};
pub use resolver::{resolve_view, resolve_view_value};
pub use state::{MessageVariant, UiState};
