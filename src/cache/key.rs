//! Cache keys — a logical name plus the serialized arguments of one call.
//!
//! Arguments go through [`serde_json`] into a [`serde_json::Value`] whose
//! object keys are then sorted at every depth, so the encoding does not depend
//! on the map representation serde_json was built with. Positional arguments
//! are best passed as a tuple, named arguments as a struct.
//!
//! Arguments must have one canonical serialization: `HashMap`s with string
//! keys are fine (keys are sorted), but `HashSet`s, pointer identity and
//! non-finite floats (they all serialize as `null`) are not.

use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors produced while encoding a cache key.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("cache key arguments cannot be serialized: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Serialize)]
struct KeyDocument<'a, A: ?Sized> {
    key: &'a str,
    args: &'a A,
}

/// Deterministic identity of one memoized call.
///
/// # Examples
///
/// ```rust
/// use ctxconf::cache::CacheKey;
///
/// let key = CacheKey::encode("agents", &("001", 10)).unwrap();
/// assert_eq!(key.as_str(), r#"{"args":["001",10],"key":"agents"}"#);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// Encodes `name` and `args` into a key.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::Serialize`] when `args` cannot be represented as
    /// JSON, e.g. a map whose keys are not strings or integers.
    pub fn encode<A>(name: &str, args: &A) -> Result<Self, KeyError>
    where
        A: Serialize + ?Sized,
    {
        let document = serde_json::to_value(KeyDocument { key: name, args })?;
        Ok(Self(serde_json::to_string(&canonical(document))?))
    }

    /// Returns the encoded key.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Rebuilds objects in key order; with `preserve_order` enabled anywhere in
// the build, `Map` would otherwise keep insertion order.
fn canonical(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, canonical(v)))
                    .collect::<Map<String, Value>>(),
            )
        }
        Value::Array(items) => Value::Array(items.into_iter().map(canonical).collect()),
        other => other,
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
