//! Premium Adapter - Normalizes upstream premium payloads
//!
//! Every input, including `None`, produces an [`AdaptedPremium`]; failures
//! are data, never panics or errors.

use super::money::parse_amount;
use super::shape::{classify, DetailedRecord, PayloadShape, SimpleRecord};
use crate::config::AdapterConfig;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use std::fmt;

/// Why an adaptation failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureReason {
    NullInput,
    UpstreamError,
    MalformedResponse,
}

impl FailureReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NullInput => "NULL_INPUT",
            Self::UpstreamError => "UPSTREAM_ERROR",
            Self::MalformedResponse => "MALFORMED_RESPONSE",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Record layout a premium item was read from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordShape {
    Simple,
    Detailed,
}

/// One entry of a detailed record's per-coverage breakdown. Display only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverageAmount {
    #[serde(rename = "coverageCode", skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(rename = "coverageName", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<i64>,
}

/// Canonical premium line for one insurer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PremiumItem {
    pub insurer: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insurer_name: Option<String>,
    /// The one canonical monetary value for this insurer
    pub base_premium: i64,
    pub shape: RecordShape,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub coverages: Vec<CoverageAmount>,
}

/// Result of adapting one payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdaptedPremium {
    Success {
        items: Vec<PremiumItem>,
    },
    Failure {
        reason: FailureReason,
        message: Option<String>,
    },
}

impl AdaptedPremium {
    fn failure(reason: FailureReason, message: impl Into<String>) -> Self {
        Self::Failure {
            reason,
            message: Some(message.into()),
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Line items; empty on failure
    pub fn items(&self) -> &[PremiumItem] {
        match self {
            Self::Success { items } => items,
            Self::Failure { .. } => &[],
        }
    }

    pub fn reason(&self) -> Option<FailureReason> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { reason, .. } => Some(*reason),
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { message, .. } => message.as_deref(),
        }
    }
}

impl Serialize for AdaptedPremium {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Success { items } => {
                let mut state = serializer.serialize_struct("AdaptedPremium", 2)?;
                state.serialize_field("ok", &true)?;
                state.serialize_field("items", items)?;
                state.end()
            }
            Self::Failure { reason, message } => {
                let len = if message.is_some() { 3 } else { 2 };
                let mut state = serializer.serialize_struct("AdaptedPremium", len)?;
                state.serialize_field("ok", &false)?;
                state.serialize_field("reason", reason)?;
                if let Some(message) = message {
                    state.serialize_field("message", message)?;
                }
                state.end()
            }
        }
    }
}

/// Premium Adapter
#[derive(Debug, Clone, Default)]
pub struct PremiumAdapter {
    config: AdapterConfig,
}

impl PremiumAdapter {
    pub fn new(config: AdapterConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    /// Adapt a raw payload; `None` and JSON `null` are both "no payload"
    pub fn adapt(&self, raw: Option<&Value>) -> AdaptedPremium {
        self.adapt_at_depth(raw, 0)
    }

    fn adapt_at_depth(&self, raw: Option<&Value>, depth: usize) -> AdaptedPremium {
        let shape = classify(raw);
        tracing::debug!(shape = %shape.kind(), depth, "classified premium payload");

        match shape {
            PayloadShape::Null => AdaptedPremium::Failure {
                reason: FailureReason::NullInput,
                message: None,
            },
            PayloadShape::Wrapped(wrapped) => {
                if !self.is_success(&wrapped.return_code) {
                    tracing::warn!(
                        return_code = %wrapped.return_code,
                        return_msg = wrapped.return_msg.unwrap_or_default(),
                        "upstream premium source returned an error"
                    );
                    return AdaptedPremium::Failure {
                        reason: FailureReason::UpstreamError,
                        message: wrapped.return_msg.map(str::to_owned),
                    };
                }
                if depth >= self.config.max_unwrap_depth {
                    return self.malformed(format!(
                        "wrapped payload nested deeper than {} levels",
                        self.config.max_unwrap_depth
                    ));
                }
                self.adapt_at_depth(wrapped.data, depth + 1)
            }
            PayloadShape::Simple(records) => self.adapt_simple(&records),
            PayloadShape::Detailed(records) => self.adapt_detailed(&records),
            PayloadShape::Malformed(reason) => self.malformed(reason),
        }
    }

    fn adapt_simple(&self, records: &[SimpleRecord<'_>]) -> AdaptedPremium {
        let mut items = Vec::with_capacity(records.len());
        for record in records {
            let Some(base_premium) = parse_amount(record.base_premium) else {
                return self.malformed(format!(
                    "basePremium of {} is not a non-negative whole amount",
                    record.insurer
                ));
            };
            items.push(PremiumItem {
                insurer: record.insurer.to_string(),
                insurer_name: record.insurer_name.map(str::to_owned),
                base_premium,
                shape: RecordShape::Simple,
                coverages: Vec::new(),
            });
        }
        AdaptedPremium::Success { items }
    }

    fn adapt_detailed(&self, records: &[DetailedRecord<'_>]) -> AdaptedPremium {
        let mut items = Vec::with_capacity(records.len());
        for record in records {
            // The aggregate may include riders the breakdown omits; never sum the breakdown
            let Some(base_premium) = parse_amount(record.total_premium) else {
                return self.malformed(format!(
                    "totalPremium of {} is not a non-negative whole amount",
                    record.insurer
                ));
            };

            let mut coverages = Vec::with_capacity(record.coverages.len());
            for (index, entry) in record.coverages.iter().enumerate() {
                match coverage_amount(entry) {
                    Some(coverage) => coverages.push(coverage),
                    None => {
                        return self.malformed(format!(
                            "coverage entry {} of {} is malformed",
                            index, record.insurer
                        ))
                    }
                }
            }

            items.push(PremiumItem {
                insurer: record.insurer.to_string(),
                insurer_name: record.insurer_name.map(str::to_owned),
                base_premium,
                shape: RecordShape::Detailed,
                coverages,
            });
        }
        AdaptedPremium::Success { items }
    }

    fn is_success(&self, return_code: &str) -> bool {
        self.config
            .success_codes
            .iter()
            .any(|code| code.trim() == return_code)
    }

    fn malformed(&self, reason: impl Into<String>) -> AdaptedPremium {
        let reason = reason.into();
        tracing::warn!(%reason, "malformed premium payload");
        AdaptedPremium::failure(FailureReason::MalformedResponse, reason)
    }
}

/// Adapt with the default configuration
pub fn adapt(raw: Option<&Value>) -> AdaptedPremium {
    PremiumAdapter::default().adapt(raw)
}

fn coverage_amount(entry: &Value) -> Option<CoverageAmount> {
    let Value::Object(entry) = entry else {
        return None;
    };
    let text = |key: &str| entry.get(key).and_then(Value::as_str).map(str::to_owned);
    let amount = match entry.get("amount").or_else(|| entry.get("premium")) {
        None | Some(Value::Null) => None,
        Some(value) => Some(parse_amount(value)?),
    };
    Some(CoverageAmount {
        code: text("coverageCode"),
        name: text("coverageName"),
        amount,
    })
}
