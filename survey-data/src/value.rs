use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use std::fmt;
use std::sync::LazyLock;

static FLOAT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*-?(\d+\.?|\.\d+|\d+\.\d+)([eE][-+]?\d+)?\s*$")
        .expect("unreachable error: failed to compile number pattern")
});

/// Largest integer an `f64` represents exactly; bigger numerals stay text.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// One survey answer, typed at parse time.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Number(f64),
    Bool(bool),
    Null,
}

impl FieldValue {
    /// Type a raw cell: `true`/`TRUE`/`false`/`FALSE` become booleans, numerals become
    /// numbers, the empty cell becomes `Null`, anything else stays text verbatim.
    pub fn infer(raw: &str) -> Self {
        match raw {
            "" => return FieldValue::Null,
            "true" | "TRUE" => return FieldValue::Bool(true),
            "false" | "FALSE" => return FieldValue::Bool(false),
            _ => {}
        }

        if FLOAT.is_match(raw) {
            if let Ok(number) = raw.trim().parse::<f64>() {
                if number.abs() <= MAX_SAFE_INTEGER {
                    return FieldValue::Number(number);
                }
            }
        }

        FieldValue::Text(raw.to_string())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }
}

fn integral(number: f64) -> Option<i64> {
    (number.is_finite() && number.fract() == 0.0 && number.abs() <= MAX_SAFE_INTEGER)
        .then_some(number as i64)
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(text) => f.write_str(text),
            FieldValue::Number(number) => match integral(*number) {
                Some(int) => write!(f, "{int}"),
                None => write!(f, "{number}"),
            },
            FieldValue::Bool(flag) => write!(f, "{flag}"),
            FieldValue::Null => Ok(()),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(text: &str) -> Self {
        FieldValue::Text(text.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(text: String) -> Self {
        FieldValue::Text(text)
    }
}

impl From<f64> for FieldValue {
    fn from(number: f64) -> Self {
        FieldValue::Number(number)
    }
}

impl From<bool> for FieldValue {
    fn from(flag: bool) -> Self {
        FieldValue::Bool(flag)
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FieldValue::Text(text) => serializer.serialize_str(text),
            FieldValue::Number(number) => match integral(*number) {
                Some(int) => serializer.serialize_i64(int),
                None => serializer.serialize_f64(*number),
            },
            FieldValue::Bool(flag) => serializer.serialize_bool(*flag),
            FieldValue::Null => serializer.serialize_unit(),
        }
    }
}

impl<'de> Deserialize<'de> for FieldValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match serde_json::Value::deserialize(deserializer)? {
            serde_json::Value::String(text) => Ok(FieldValue::Text(text)),
            serde_json::Value::Number(number) => number
                .as_f64()
                .map(FieldValue::Number)
                .ok_or_else(|| de::Error::custom("number out of range")),
            serde_json::Value::Bool(flag) => Ok(FieldValue::Bool(flag)),
            serde_json::Value::Null => Ok(FieldValue::Null),
            other => Err(de::Error::custom(format!("expected a scalar field value, got {other}"))),
        }
    }
}
