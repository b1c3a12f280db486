//! Value types shared by the dispatcher and the façade.

use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::TrestleError;

/// API key and secret, sent as HTTP Basic credentials on every request.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    key: String,
    secret: String,
}

impl Credentials {
    pub fn new(key: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            secret: secret.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("key", &self.key)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Shape of decoded success payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReturnFormat {
    /// The raw response body, unparsed.
    #[default]
    Text,
    /// A JSON tree with object keys kept in wire order.
    Structure,
    /// Like `Structure`, but object bodies come back as a bare field map.
    Object,
}

impl FromStr for ReturnFormat {
    type Err = TrestleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "json" => Ok(ReturnFormat::Text),
            "structure" | "array" => Ok(ReturnFormat::Structure),
            "object" => Ok(ReturnFormat::Object),
            other => Err(TrestleError::Config(format!(
                "unknown return format '{other}' - expected text, structure or object"
            ))),
        }
    }
}

/// Ordered string parameters for one request.
///
/// Sent as the query string for GET and as a form body otherwise.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params(Vec<(String, String)>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style `insert`.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Set `key`, replacing an existing value in place.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.0.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Value of `key` when present and non-empty.
    pub fn non_empty(&self, key: &str) -> Option<&str> {
        self.get(key).filter(|v| !v.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// `application/x-www-form-urlencoded` serialization.
    pub fn encode(&self) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.iter())
            .finish()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Params::new();
        for (k, v) in iter {
            params.insert(k, v);
        }
        params
    }
}

impl<K: Into<String>, V: Into<String>, const N: usize> From<[(K, V); N]> for Params {
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}

/// A decoded success body.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Text(String),
    Structure(Value),
    Object(Map<String, Value>),
}

impl Payload {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Payload::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Field lookup on object-shaped payloads. Text payloads are not parsed.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Payload::Structure(value) => value.get(key),
            Payload::Object(map) => map.get(key),
            Payload::Text(_) => None,
        }
    }

    /// Convert to a JSON value, parsing text payloads.
    pub fn into_value(self) -> Result<Value, TrestleError> {
        match self {
            Payload::Text(text) => {
                serde_json::from_str(&text).map_err(|e| TrestleError::Decode(e.to_string()))
            }
            Payload::Structure(value) => Ok(value),
            Payload::Object(map) => Ok(Value::Object(map)),
        }
    }

    /// Deserialize into a caller-defined type.
    pub fn deserialize<T: DeserializeOwned>(self) -> Result<T, TrestleError> {
        let value = self.into_value()?;
        serde_json::from_value(value).map_err(|e| TrestleError::Decode(e.to_string()))
    }
}
