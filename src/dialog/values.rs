//! Typed access to a frame's scratch values

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::marker::PhantomData;

/// Name and type of one entry in a dialog's scratch values.
///
/// Each dialog declares its keys as constants, so a step reading `AGE` gets
/// an `Option<i64>` and never has to guess the stored shape.
pub struct ValueKey<T> {
    name: &'static str,
    _type: PhantomData<fn() -> T>,
}

impl<T> ValueKey<T> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _type: PhantomData,
        }
    }
}

impl<T> Clone for ValueKey<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for ValueKey<T> {}

impl<T> fmt::Debug for ValueKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ValueKey").field(&self.name).finish()
    }
}

/// Per-frame key/value store, persisted with the dialog stack
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Values(Map<String, Value>);

impl Values {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a typed value. A stored value of the wrong shape reads as absent.
    pub fn get<T: DeserializeOwned>(&self, key: ValueKey<T>) -> Option<T> {
        self.0
            .get(key.name)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    pub fn set<T: Serialize>(&mut self, key: ValueKey<T>, value: &T) {
        match serde_json::to_value(value) {
            Ok(v) => {
                self.0.insert(key.name.to_string(), v);
            }
            Err(e) => {
                tracing::warn!(key = key.name, error = %e, "Value not representable as JSON, dropped");
            }
        }
    }
}

#[cfg(test)]
impl Values {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
