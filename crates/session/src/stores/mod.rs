//! The four session stores and their persist/restore cycle.

mod camera;
mod landmark_images;
mod landmarks;
mod vc_images;

pub use camera::*;
pub use landmark_images::*;
pub use landmarks::*;
pub use vc_images::*;

use serde_json::Value;
use tracing::warn;

use crate::error::SessionError;
use crate::storage::SessionStorage;

/// A store persisted as one JSON payload under [`PersistedStore::KEY`].
pub trait PersistedStore: Default {
    const KEY: &'static str;

    fn to_value(&self) -> serde_json::Result<Value>;

    /// Rebuilds the store from a payload; never fails, malformed parts default.
    fn rehydrate(value: &Value) -> Self;

    /// Restores from `storage`, falling back to the default state when the
    /// payload is missing or unreadable.
    fn restore(storage: &impl SessionStorage) -> Self {
        let raw = match storage.get_item(Self::KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Self::default(),
            Err(err) => {
                warn!(key = Self::KEY, error = %err, "cannot read persisted store");
                return Self::default();
            }
        };
        match serde_json::from_str::<Value>(&raw) {
            Ok(value) => Self::rehydrate(&value),
            Err(err) => {
                warn!(key = Self::KEY, error = %err, "persisted store is not JSON, starting empty");
                Self::default()
            }
        }
    }

    fn persist(&self, storage: &mut impl SessionStorage) -> Result<(), SessionError> {
        let value = self
            .to_value()
            .map_err(|e| SessionError::Io(format!("serialize {}: {e}", Self::KEY)))?;
        storage.set_item(Self::KEY, &value.to_string())
    }
}

pub(crate) fn f64_field(value: &Value, key: &str) -> Option<f64> {
    value.get(key).and_then(Value::as_f64).filter(|v| v.is_finite())
}

pub(crate) fn string_field(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(str::to_string)
}
