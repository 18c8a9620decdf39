//! Response Adapter - Upstream premium payloads to canonical line items
//!
//! Upstream premium sources answer in three layouts: flat per-insurer totals
//! ("simple"), totals plus a per-coverage breakdown ("detailed"), and either
//! of those inside a `{ returnCode, returnMsg, data }` envelope ("wrapped").
//! The `shape` discriminator classifies a payload first; the adapter then
//! maps the typed view to [`PremiumItem`]s.
//!
//! # Examples
//!
//! ```
//! use inscompare_core::response_adapter::{adapt, FailureReason};
//! use serde_json::json;
//!
//! let detailed = json!([{
//!     "insurer": "MERITZ",
//!     "totalPremium": 50000,
//!     "coverages": [{"coverageCode": "CA_DIAG_GENERAL", "amount": 5000}]
//! }]);
//! assert_eq!(adapt(Some(&detailed)).items()[0].base_premium, 50000);
//! assert_eq!(adapt(None).reason(), Some(FailureReason::NullInput));
//! ```

pub mod adapter;
pub mod money;
pub mod shape;

pub use adapter::{
    adapt, AdaptedPremium, CoverageAmount, FailureReason, PremiumAdapter, PremiumItem, RecordShape,
};
pub use shape::{classify, PayloadShape, ShapeKind};
