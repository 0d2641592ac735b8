//! Lenient deserialization helpers for platform payloads.
//!
//! Platforms disagree on whether ids and amounts are strings or numbers, so
//! payload structs accept both.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use unibridge_core::errors::{Error, Result};

fn value_to_string(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

pub(crate) fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    value_to_string(value).ok_or_else(|| D::Error::custom("expected a string or number"))
}

pub(crate) fn opt_string_or_number<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(value_to_string))
}

/// Parses `"12.50"`, `12.5` or `12` into a decimal.
pub(crate) fn parse_decimal(value: &Value) -> Result<Decimal> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        other => {
            return Err(Error::InvalidPayload(format!(
                "expected an amount, got {}",
                other
            )))
        }
    };
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map_err(|e| Error::InvalidPayload(format!("invalid amount '{}': {}", text, e)))
}

pub(crate) fn decimal<'de, D>(deserializer: D) -> std::result::Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    parse_decimal(&value).map_err(D::Error::custom)
}

pub(crate) fn opt_decimal<'de, D>(deserializer: D) -> std::result::Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(value) => parse_decimal(&value).map(Some).map_err(D::Error::custom),
    }
}

/// Deserializes a webhook payload, naming the event on failure.
pub(crate) fn parse_payload<T: DeserializeOwned>(event_type: &str, payload: Value) -> Result<T> {
    serde_json::from_value(payload)
        .map_err(|e| Error::InvalidPayload(format!("{}: {}", event_type, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Deserialize)]
    struct Sample {
        #[serde(deserialize_with = "string_or_number")]
        id: String,
        #[serde(deserialize_with = "decimal")]
        price: Decimal,
        #[serde(default, deserialize_with = "opt_decimal")]
        refund: Option<Decimal>,
    }

    #[test]
    fn test_accepts_strings_and_numbers() {
        let a: Sample = serde_json::from_value(json!({"id": 42, "price": "12.50"})).unwrap();
        let b: Sample = serde_json::from_value(json!({"id": "42", "price": 12.5})).unwrap();
        assert_eq!(a.id, b.id);
        assert_eq!(a.price, b.price);
        assert!(a.refund.is_none());
    }

    #[test]
    fn test_rejects_non_amounts() {
        assert!(parse_decimal(&json!(true)).is_err());
        assert!(parse_decimal(&json!("abc")).is_err());
        assert!(parse_payload::<Sample>("item.sold", json!({"id": 1})).is_err());
    }
}
