//! # Event payload.
//!
//! A [`Payload`] is the unit of work a listener produces and a handler
//! consumes: a string-keyed map of loosely-typed [`serde_json::Value`]s.
//! Middleware stages enrich it on the way down the chain (chat fields,
//! routed command, extracted arguments), and the resolver feeds it to the
//! handler's declared parameters.
//!
//! Missing or mistyped keys are programmer errors ([`BotError::Invalid`]):
//! the listener and the handler belong to the same bot, so a disagreement
//! between them is a bug, not bad input.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::BotError;

/// String-keyed map of JSON values carried through the middleware chain.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Payload {
    map: BTreeMap<String, Value>,
}

impl Payload {
    /// Creates an empty payload.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a key, replacing any previous value under the same name.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.map.insert(key.into(), value.into());
    }

    /// Builder-style [`Payload::insert`].
    ///
    /// ```
    /// use botvisor::Payload;
    ///
    /// let p = Payload::new().with("message", "ping").with("sender", "console");
    /// assert_eq!(p.str("message"), Some("ping"));
    /// ```
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Returns the raw value under `key`, if present.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.map.get(key)
    }

    /// Returns the value under `key` or a [`BotError::Invalid`].
    pub fn require(&self, key: &str) -> Result<&Value, BotError> {
        self.map
            .get(key)
            .ok_or_else(|| BotError::invalid(format!("payload key '{key}' is missing")))
    }

    /// Returns the string under `key`, if present and a string.
    pub fn str(&self, key: &str) -> Option<&str> {
        self.map.get(key).and_then(Value::as_str)
    }

    /// Deserializes the value under `key` into `T`.
    ///
    /// Missing key and type mismatch are both [`BotError::Invalid`].
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<T, BotError> {
        let value = self.require(key)?.clone();
        serde_json::from_value(value)
            .map_err(|e| BotError::invalid(format!("payload key '{key}': {e}")))
    }

    /// Removes and returns the value under `key`.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.map.remove(key)
    }

    /// Whether `key` is present.
    pub fn contains(&self, key: &str) -> bool {
        self.map.contains_key(key)
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Whether the payload carries no keys.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Iterates over `(key, value)` pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.map.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl FromIterator<(String, Value)> for Payload {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            map: iter.into_iter().collect(),
        }
    }
}

impl From<BTreeMap<String, Value>> for Payload {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Self { map }
    }
}
