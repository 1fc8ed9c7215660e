//! Typed readers for persisted component properties.

use crate::component::Properties;
use crate::error::SnapshotError;
use serde_json::Value;

pub fn get_u64(props: &Properties, key: &str, default: u64) -> Result<u64, SnapshotError> {
    match props.get(key) {
        None | Some(Value::Null) => Ok(default),
        Some(v) => v
            .as_u64()
            .ok_or_else(|| SnapshotError::invalid_property(key, format!("expected unsigned integer, got {}", v))),
    }
}

/// A width-like property that must lie within `min..=max`.
pub fn get_width(
    props: &Properties,
    key: &str,
    default: usize,
    min: usize,
    max: usize,
) -> Result<usize, SnapshotError> {
    let value = get_u64(props, key, default as u64)? as usize;
    if value < min || value > max {
        return Err(SnapshotError::invalid_property(
            key,
            format!("{} is outside {}..={}", value, min, max),
        ));
    }
    Ok(value)
}

pub fn get_bool(props: &Properties, key: &str, default: bool) -> Result<bool, SnapshotError> {
    match props.get(key) {
        None | Some(Value::Null) => Ok(default),
        Some(Value::Bool(b)) => Ok(*b),
        // Older saves store switch levels as 0/1.
        Some(Value::Number(n)) if n.as_u64() == Some(0) => Ok(false),
        Some(Value::Number(n)) if n.as_u64() == Some(1) => Ok(true),
        Some(v) => Err(SnapshotError::invalid_property(key, format!("expected boolean, got {}", v))),
    }
}

pub fn get_f64(props: &Properties, key: &str, default: f64) -> Result<f64, SnapshotError> {
    match props.get(key) {
        None | Some(Value::Null) => Ok(default),
        Some(v) => v
            .as_f64()
            .ok_or_else(|| SnapshotError::invalid_property(key, format!("expected number, got {}", v))),
    }
}

/// Flat word array, e.g. memory contents.
pub fn get_words(props: &Properties, key: &str) -> Result<Vec<u64>, SnapshotError> {
    match props.get(key) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|v| {
                v.as_u64()
                    .ok_or_else(|| SnapshotError::invalid_property(key, format!("bad word {}", v)))
            })
            .collect(),
        Some(v) => Err(SnapshotError::invalid_property(key, format!("expected array, got {}", v))),
    }
}

pub fn words_value(words: &[u64]) -> Value {
    Value::Array(words.iter().map(|w| Value::from(*w)).collect())
}
