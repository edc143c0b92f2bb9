//! Argument decoding and range checks shared by the tools.

use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::types::{McpError, McpResult};

/// Decode tool arguments. Some clients send the whole object as a JSON string.
pub fn parse<T: DeserializeOwned>(args: Value) -> McpResult<T> {
    let args = match args {
        Value::String(raw) => serde_json::from_str(&raw)
            .map_err(|e| McpError::InvalidParams(format!("arguments string is not JSON: {e}")))?,
        Value::Null => Value::Object(serde_json::Map::new()),
        other => other,
    };
    serde_json::from_value(args).map_err(|e| McpError::InvalidParams(e.to_string()))
}

pub fn check_range(name: &str, value: i64, min: i64, max: i64) -> McpResult<()> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(McpError::InvalidParams(format!(
            "{name} must be between {min} and {max}, got {value}"
        )))
    }
}

pub fn check_min(name: &str, value: i64, min: i64) -> McpResult<()> {
    if value >= min {
        Ok(())
    } else {
        Err(McpError::InvalidParams(format!(
            "{name} must be at least {min}, got {value}"
        )))
    }
}

/// Length check in characters, after trimming.
pub fn check_len(name: &str, value: &str, min: usize, max: usize) -> McpResult<()> {
    let len = value.trim().chars().count();
    if (min..=max).contains(&len) {
        Ok(())
    } else {
        Err(McpError::InvalidParams(format!(
            "{name} must be {min} to {max} characters long, got {len}"
        )))
    }
}

pub fn format_schema(default: &str) -> Value {
    json!({
        "type": "string",
        "enum": ["json", "markdown"],
        "default": default,
        "description": "Response format: json for structured data, markdown for readable text"
    })
}

pub fn detail_schema(default: &str) -> Value {
    json!({
        "type": "string",
        "enum": ["concise", "detailed"],
        "default": default,
        "description": "Detail level: concise for key fields, detailed for everything"
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    #[serde(deny_unknown_fields)]
    struct Probe {
        #[serde(default)]
        count: i64,
    }

    #[test]
    fn test_parse_accepts_stringified_object() {
        let probe: Probe = parse(Value::String(r#"{"count": 3}"#.into())).unwrap();
        assert_eq!(probe.count, 3);
        let empty: Probe = parse(Value::Null).unwrap();
        assert_eq!(empty.count, 0);
    }

    #[test]
    fn test_parse_rejects_unknown_fields() {
        let err = parse::<Probe>(json!({ "count": 1, "bogus": true })).unwrap_err();
        assert!(matches!(err, McpError::InvalidParams(_)));
    }

    #[test]
    fn test_checks() {
        assert!(check_range("count", 20, 1, 20).is_ok());
        assert!(check_range("count", 21, 1, 20).is_err());
        assert!(check_min("offset", -1, 0).is_err());
        assert!(check_len("query", "  ", 1, 100).is_err());
        assert!(check_len("query", "微信", 1, 2).is_ok());
    }
}
