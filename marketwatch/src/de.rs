//! Lenient deserialisers for the loosely typed tick and snapshot payloads.
//!
//! Upstream feeds send numbers either as JSON numbers or as numeric strings, and
//! instrument tokens either as integers or strings.

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use smol_str::{SmolStr, ToSmolStr};

/// Deserialise a JSON number or numeric string as `Option<f64>`.
///
/// Anything unparseable or non-finite becomes `None`.
pub fn de_f64_lenient<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(f64_from_value))
}

/// Like [`de_f64_lenient`], defaulting to `0.0`.
pub fn de_f64_or_zero<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    de_f64_lenient(deserializer).map(|value| value.unwrap_or(0.0))
}

/// Deserialise an instrument token given as a JSON number or string.
pub fn de_token<'de, D>(deserializer: D) -> Result<Option<SmolStr>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(token)) => normalise_token(&token),
        Some(Value::Number(number)) => normalise_token(&number.to_string()),
        _ => None,
    })
}

pub fn f64_from_value(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|value| value.is_finite())
}

/// Canonical string form of an instrument token.
///
/// Integral tokens compare equal whatever their representation: `12345`,
/// `"12345"`, `" 12345 "` and `12345.0` all normalise to `"12345"`.
pub fn normalise_token(raw: &str) -> Option<SmolStr> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(integer) = trimmed.parse::<u64>() {
        return Some(integer.to_smolstr());
    }

    match trimmed.parse::<f64>() {
        Ok(float) if float.is_finite() && float.fract() == 0.0 && float.abs() < 9.0e15 => {
            Some((float as i64).to_smolstr())
        }
        _ => Some(SmolStr::new(trimmed)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Payload {
        #[serde(default, deserialize_with = "de_f64_lenient")]
        value: Option<f64>,
        #[serde(default, deserialize_with = "de_token")]
        token: Option<SmolStr>,
    }

    #[test]
    fn test_de_f64_lenient() {
        struct TestCase {
            input: &'static str,
            expected: Option<f64>,
        }

        let tests = vec![
            TestCase {
                // TC0: JSON number
                input: r#"{"value": 105.5}"#,
                expected: Some(105.5),
            },
            TestCase {
                // TC1: numeric string
                input: r#"{"value": "0"}"#,
                expected: Some(0.0),
            },
            TestCase {
                // TC2: garbage string
                input: r#"{"value": "abc"}"#,
                expected: None,
            },
            TestCase {
                // TC3: null
                input: r#"{"value": null}"#,
                expected: None,
            },
            TestCase {
                // TC4: absent
                input: r#"{}"#,
                expected: None,
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            let actual = serde_json::from_str::<Payload>(test.input).unwrap().value;
            assert_eq!(actual, test.expected, "TC{} failed", index);
        }
    }

    #[test]
    fn test_de_token_numeric_and_string_compare_equal() {
        let numeric = serde_json::from_str::<Payload>(r#"{"token": 256265}"#).unwrap();
        let string = serde_json::from_str::<Payload>(r#"{"token": "256265"}"#).unwrap();
        let float = serde_json::from_str::<Payload>(r#"{"token": 256265.0}"#).unwrap();
        assert_eq!(numeric.token.as_deref(), Some("256265"));
        assert_eq!(numeric.token, string.token);
        assert_eq!(numeric.token, float.token);
    }

    #[test]
    fn test_normalise_token() {
        struct TestCase {
            input: &'static str,
            expected: Option<&'static str>,
        }

        let tests = vec![
            TestCase {
                // TC0: padded integer string
                input: " 42 ",
                expected: Some("42"),
            },
            TestCase {
                // TC1: non-numeric token kept verbatim
                input: "BTCUSD_SPOT",
                expected: Some("BTCUSD_SPOT"),
            },
            TestCase {
                // TC2: empty token
                input: "  ",
                expected: None,
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            let actual = normalise_token(test.input);
            assert_eq!(actual.as_deref(), test.expected, "TC{} failed", index);
        }
    }
}
