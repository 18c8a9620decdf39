//! Payload shape discriminator
//!
//! Classifies a raw upstream payload into exactly one known shape before
//! any premium is read. The adapter only ever works on the typed views
//! produced here.

use serde_json::{Map, Value};
use std::fmt;

/// Key marking a wrapped response
pub const RETURN_CODE_KEY: &str = "returnCode";

/// Classified payload
#[derive(Debug, Clone, PartialEq)]
pub enum PayloadShape<'a> {
    /// Absent or JSON `null`
    Null,
    /// `{ returnCode, returnMsg, data }`
    Wrapped(WrappedPayload<'a>),
    /// One flat record per insurer carrying `basePremium`
    Simple(Vec<SimpleRecord<'a>>),
    /// Per-insurer `totalPremium` plus a nested `coverages` breakdown
    Detailed(Vec<DetailedRecord<'a>>),
    /// None of the above; the string says why
    Malformed(String),
}

impl PayloadShape<'_> {
    pub fn kind(&self) -> ShapeKind {
        match self {
            Self::Null => ShapeKind::Null,
            Self::Wrapped(_) => ShapeKind::Wrapped,
            Self::Simple(_) => ShapeKind::Simple,
            Self::Detailed(_) => ShapeKind::Detailed,
            Self::Malformed(_) => ShapeKind::Malformed,
        }
    }
}

/// Discriminant of [`PayloadShape`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeKind {
    Null,
    Wrapped,
    Simple,
    Detailed,
    Malformed,
}

impl fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Null => "null",
            Self::Wrapped => "wrapped",
            Self::Simple => "simple",
            Self::Detailed => "detailed",
            Self::Malformed => "malformed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WrappedPayload<'a> {
    /// `returnCode` rendered as text; numeric codes keep their digits
    pub return_code: String,
    pub return_msg: Option<&'a str>,
    pub data: Option<&'a Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimpleRecord<'a> {
    pub insurer: &'a str,
    pub insurer_name: Option<&'a str>,
    pub base_premium: &'a Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DetailedRecord<'a> {
    pub insurer: &'a str,
    pub insurer_name: Option<&'a str>,
    pub total_premium: &'a Value,
    pub coverages: &'a [Value],
}

/// Classify a raw payload
pub fn classify(raw: Option<&Value>) -> PayloadShape<'_> {
    let raw = match raw {
        None | Some(Value::Null) => return PayloadShape::Null,
        Some(raw) => raw,
    };

    if let Value::Object(object) = raw {
        if let Some(code) = object.get(RETURN_CODE_KEY) {
            return classify_wrapped(object, code);
        }
    }

    let records = match raw {
        Value::Array(records) => records,
        Value::Object(object) => match object.get("items") {
            Some(Value::Array(records)) => records,
            Some(_) => return malformed("'items' is not a list"),
            None => return malformed("object carries neither returnCode nor items"),
        },
        other => return malformed(format!("expected a list or object, got {}", json_type(other))),
    };
    classify_records(records)
}

fn classify_wrapped<'a>(object: &'a Map<String, Value>, code: &'a Value) -> PayloadShape<'a> {
    let return_code = match code {
        Value::String(code) => code.trim().to_string(),
        Value::Number(code) => code.to_string(),
        other => {
            return malformed(format!(
                "returnCode must be a string or number, got {}",
                json_type(other)
            ))
        }
    };
    PayloadShape::Wrapped(WrappedPayload {
        return_code,
        return_msg: object.get("returnMsg").and_then(Value::as_str),
        data: object.get("data"),
    })
}

fn classify_records(records: &[Value]) -> PayloadShape<'_> {
    if records.is_empty() {
        return malformed("payload contains no premium records");
    }

    let mut simple = Vec::new();
    let mut detailed = Vec::new();

    for (index, record) in records.iter().enumerate() {
        let Value::Object(record) = record else {
            return malformed(format!("record {} is not an object", index));
        };
        let Some(insurer) = insurer_code(record) else {
            return malformed(format!("record {} has no insurer code", index));
        };
        let insurer_name = record.get("insurerName").and_then(Value::as_str);

        if let Some(coverages) = record.get("coverages") {
            let Value::Array(coverages) = coverages else {
                return malformed(format!("record {} ({}) has non-list coverages", index, insurer));
            };
            let Some(total_premium) = record.get("totalPremium") else {
                return malformed(format!(
                    "record {} ({}) has a coverage breakdown but no totalPremium",
                    index, insurer
                ));
            };
            detailed.push(DetailedRecord {
                insurer,
                insurer_name,
                total_premium,
                coverages,
            });
        } else if let Some(base_premium) = record.get("basePremium") {
            simple.push(SimpleRecord {
                insurer,
                insurer_name,
                base_premium,
            });
        } else {
            return malformed(format!(
                "record {} ({}) carries neither basePremium nor coverages",
                index, insurer
            ));
        }
    }

    match (simple.is_empty(), detailed.is_empty()) {
        (false, true) => PayloadShape::Simple(simple),
        (true, false) => PayloadShape::Detailed(detailed),
        _ => malformed("payload mixes simple and detailed records"),
    }
}

fn insurer_code(record: &Map<String, Value>) -> Option<&str> {
    ["insurer", "insurerCode"]
        .iter()
        .find_map(|key| record.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .filter(|code| !code.is_empty())
}

fn malformed<'a>(reason: impl Into<String>) -> PayloadShape<'a> {
    PayloadShape::Malformed(reason.into())
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_absent_and_null_are_null() {
        assert_eq!(classify(None), PayloadShape::Null);
        assert_eq!(classify(Some(&Value::Null)), PayloadShape::Null);
    }

    #[test]
    fn test_wrapper_wins_over_items() {
        let raw = json!({"returnCode": 0, "returnMsg": "OK", "items": [], "data": []});
        match classify(Some(&raw)) {
            PayloadShape::Wrapped(wrapped) => {
                assert_eq!(wrapped.return_code, "0");
                assert_eq!(wrapped.return_msg, Some("OK"));
                assert!(wrapped.data.is_some());
            }
            other => panic!("expected wrapped, got {:?}", other),
        }
    }

    #[test]
    fn test_simple_list_under_items() {
        let raw = json!({"items": [{"insurerCode": "SAMSUNG", "basePremium": 48000}]});
        assert_eq!(classify(Some(&raw)).kind(), ShapeKind::Simple);
    }

    #[test]
    fn test_detailed_top_level_list() {
        let raw = json!([{"insurer": "MERITZ", "totalPremium": 50000, "coverages": []}]);
        assert_eq!(classify(Some(&raw)).kind(), ShapeKind::Detailed);
    }

    #[test]
    fn test_breakdown_without_total_is_malformed() {
        let raw = json!([{"insurer": "MERITZ", "basePremium": 1, "coverages": [{"amount": 1}]}]);
        match classify(Some(&raw)) {
            PayloadShape::Malformed(reason) => assert!(reason.contains("no totalPremium")),
            other => panic!("expected malformed, got {:?}", other),
        }
    }

    #[test]
    fn test_mixed_records_are_malformed() {
        let raw = json!([
            {"insurer": "SAMSUNG", "basePremium": 48000},
            {"insurer": "MERITZ", "totalPremium": 50000, "coverages": []}
        ]);
        assert_eq!(classify(Some(&raw)).kind(), ShapeKind::Malformed);
    }

    #[test]
    fn test_scalars_and_empty_lists_are_malformed() {
        assert_eq!(classify(Some(&json!(42))).kind(), ShapeKind::Malformed);
        assert_eq!(classify(Some(&json!("ok"))).kind(), ShapeKind::Malformed);
        assert_eq!(classify(Some(&json!([]))).kind(), ShapeKind::Malformed);
        assert_eq!(classify(Some(&json!({"items": {}}))).kind(), ShapeKind::Malformed);
    }

    #[test]
    fn test_record_without_insurer_is_malformed() {
        let raw = json!([{"insurer": "  ", "basePremium": 48000}]);
        assert_eq!(classify(Some(&raw)).kind(), ShapeKind::Malformed);
    }

    #[test]
    fn test_boolean_return_code_is_malformed() {
        let raw = json!({"returnCode": true, "data": []});
        assert_eq!(classify(Some(&raw)).kind(), ShapeKind::Malformed);
    }
}
