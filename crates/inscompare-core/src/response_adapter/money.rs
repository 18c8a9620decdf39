//! Monetary amount parsing
//!
//! Upstream systems send premiums as integers, integral floats or digit
//! strings with thousands separators. Everything is normalized to whole won
//! as `i64`; negative or fractional values are rejected.

use serde_json::Value;

/// Parse a non-negative whole amount
pub fn parse_amount(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => {
            if let Some(amount) = number.as_i64() {
                return (amount >= 0).then_some(amount);
            }
            if number.is_u64() {
                // Above i64::MAX
                return None;
            }
            let float = number.as_f64()?;
            let integral = float.is_finite() && float >= 0.0 && float.fract() == 0.0;
            // i64::MAX as f64 rounds up to 2^63, which is out of range
            (integral && float < i64::MAX as f64).then(|| float as i64)
        }
        Value::String(text) => parse_amount_text(text),
        _ => None,
    }
}

fn parse_amount_text(text: &str) -> Option<i64> {
    let trimmed = text.trim();
    let trimmed = trimmed.strip_suffix('원').unwrap_or(trimmed).trim_end();
    if trimmed.is_empty() {
        return None;
    }
    let digits: String = trimmed.chars().filter(|c| *c != ',').collect();
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    digits.parse::<i64>().ok()
}
