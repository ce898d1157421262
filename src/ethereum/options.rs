//! Invocation options and the parameter merger.
//!
//! Options are a plain name → value mapping. Most keys (`from`, `gas`,
//! `gasPrice`, `value`, `data`, ...) belong to the transport and are passed
//! through untouched; `synchronization_timeout` is consumed by the binding.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;

/// Option key read by the transaction synchronizer, in milliseconds.
pub const SYNCHRONIZATION_TIMEOUT: &str = "synchronization_timeout";

/// Class-level synchronization timeout unless configured otherwise.
pub const DEFAULT_SYNCHRONIZATION_TIMEOUT: Duration = Duration::from_millis(240_000);

const SYSTEM_OPTIONS: &[&str] = &[SYNCHRONIZATION_TIMEOUT];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxOptions(Map<String, Value>);

impl TxOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.get(key).is_some_and(|v| !v.is_null())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Right-biased merge into a fresh mapping; neither side is modified.
    pub fn merge(&self, overrides: &TxOptions) -> TxOptions {
        let mut merged = self.0.clone();
        for (key, value) in &overrides.0 {
            merged.insert(key.clone(), value.clone());
        }
        TxOptions(merged)
    }

    /// Additive in-place merge, used for class defaults.
    pub fn extend(&mut self, additions: &TxOptions) {
        for (key, value) in &additions.0 {
            self.0.insert(key.clone(), value.clone());
        }
    }

    /// Per-call synchronization timeout. `Some(None)` means unbounded (0).
    pub fn synchronization_timeout(&self) -> Option<Option<Duration>> {
        let millis = match self.0.get(SYNCHRONIZATION_TIMEOUT)? {
            Value::Number(n) => n.as_u64()?,
            Value::String(s) => s.trim().parse().ok()?,
            _ => return None,
        };
        Some(timeout_from_millis(millis))
    }

    /// The transaction object sent to the transport, without binding-only keys.
    pub fn to_request(&self) -> Map<String, Value> {
        self.0
            .iter()
            .filter(|(key, _)| !SYSTEM_OPTIONS.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }
}

impl From<Map<String, Value>> for TxOptions {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// 0 disables the timeout.
pub fn timeout_from_millis(millis: u64) -> Option<Duration> {
    (millis > 0).then(|| Duration::from_millis(millis))
}

/// Hex digits of a serialized big number (`{"_hex": ..}` or
/// `{"type": "BigNumber", "hex": ..}`), if `value` is one.
pub fn big_number_hex(value: &Value) -> Option<&str> {
    let object = value.as_object()?;
    if let Some(hex) = object.get("_hex").and_then(Value::as_str) {
        return Some(hex);
    }
    match object.get("type").and_then(Value::as_str) {
        Some("BigNumber") => object.get("hex").and_then(Value::as_str),
        _ => None,
    }
}

pub fn is_big_number_like(value: &Value) -> bool {
    big_number_hex(value).is_some()
}

/// Split trailing invocation options off positional arguments.
///
/// The last argument is taken as options only when it is a JSON object that
/// is not a serialized big number; anything else stays a parameter.
pub fn split_options(mut args: Vec<Value>) -> (Vec<Value>, TxOptions) {
    let is_options = matches!(args.last(), Some(last) if last.is_object() && !is_big_number_like(last));
    if !is_options {
        return (args, TxOptions::default());
    }

    match args.pop() {
        Some(Value::Object(map)) => (args, TxOptions(map)),
        Some(other) => {
            args.push(other);
            (args, TxOptions::default())
        }
        None => (args, TxOptions::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_merge_is_right_biased() {
        let defaults = TxOptions::new().with("from", "0xaa").with("gas", 100_000);
        let overrides = TxOptions::new().with("gas", 300_000).with("value", "0x1");

        let merged = defaults.merge(&overrides);

        assert_eq!(merged.get("from"), Some(&json!("0xaa")));
        assert_eq!(merged.get("gas"), Some(&json!(300_000)));
        assert_eq!(merged.get("value"), Some(&json!("0x1")));
        // inputs untouched
        assert_eq!(defaults.get("gas"), Some(&json!(100_000)));
        assert!(overrides.get("from").is_none());
    }

    #[test]
    fn test_trailing_options_object_is_popped() {
        let args = vec![json!("0x1234"), json!({"from": "0xabc"})];
        let (params, options) = split_options(args);

        assert_eq!(params, vec![json!("0x1234")]);
        assert_eq!(options.get("from"), Some(&json!("0xabc")));
    }

    #[test]
    fn test_trailing_big_number_is_kept() {
        let big = json!({"_hex": "0x0de0b6b3a7640000"});
        let args = vec![json!("0x1234"), big.clone()];
        let (params, options) = split_options(args);

        assert_eq!(params, vec![json!("0x1234"), big]);
        assert!(options.is_empty());

        let ethers_style = json!({"type": "BigNumber", "hex": "0x01"});
        let (params, options) = split_options(vec![ethers_style.clone()]);
        assert_eq!(params, vec![ethers_style]);
        assert!(options.is_empty());
    }

    #[test]
    fn test_arrays_and_scalars_are_not_options() {
        let (params, options) = split_options(vec![json!([1, 2]), json!(7)]);
        assert_eq!(params.len(), 2);
        assert!(options.is_empty());

        let (params, options) = split_options(vec![json!(["a"])]);
        assert_eq!(params, vec![json!(["a"])]);
        assert!(options.is_empty());

        let (params, options) = split_options(Vec::new());
        assert!(params.is_empty());
        assert!(options.is_empty());
    }

    #[test]
    fn test_synchronization_timeout_parsing() {
        assert_eq!(TxOptions::new().synchronization_timeout(), None);
        assert_eq!(
            TxOptions::new()
                .with(SYNCHRONIZATION_TIMEOUT, 5_000)
                .synchronization_timeout(),
            Some(Some(Duration::from_secs(5)))
        );
        assert_eq!(
            TxOptions::new()
                .with(SYNCHRONIZATION_TIMEOUT, "0")
                .synchronization_timeout(),
            Some(None)
        );
    }

    #[test]
    fn test_request_drops_binding_options() {
        let options = TxOptions::new()
            .with("from", "0xaa")
            .with(SYNCHRONIZATION_TIMEOUT, 1_000);

        let request = options.to_request();
        assert!(request.contains_key("from"));
        assert!(!request.contains_key(SYNCHRONIZATION_TIMEOUT));
    }
}
