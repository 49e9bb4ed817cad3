//! Key/value backends for persisted session state.
//!
//! Values are JSON strings, one per store key, mirroring browser
//! `sessionStorage`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::error::SessionError;

pub trait SessionStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, SessionError>;
    fn set_item(&mut self, key: &str, value: &str) -> Result<(), SessionError>;
    fn remove_item(&mut self, key: &str) -> Result<(), SessionError>;
}

#[derive(Debug, Clone, Default)]
pub struct InMemorySessionStorage {
    items: BTreeMap<String, String>,
}

impl InMemorySessionStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl SessionStorage for InMemorySessionStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, SessionError> {
        Ok(self.items.get(key).cloned())
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<(), SessionError> {
        self.items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&mut self, key: &str) -> Result<(), SessionError> {
        self.items.remove(key);
        Ok(())
    }
}

/// Session state kept in one JSON document on disk, rewritten on every change.
///
/// Each key maps to its payload as embedded JSON so the file stays readable.
/// Payloads that are not valid JSON are kept as plain strings.
#[derive(Debug)]
pub struct JsonFileSessionStorage {
    path: PathBuf,
    items: BTreeMap<String, Value>,
}

impl JsonFileSessionStorage {
    /// Opens `path`, starting empty when the file does not exist yet.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, SessionError> {
        let path = path.into();
        let items = match std::fs::read_to_string(&path) {
            Ok(raw) if raw.trim().is_empty() => BTreeMap::new(),
            Ok(raw) => serde_json::from_str(&raw).map_err(|e| {
                SessionError::Corrupt(format!("{}: {e}", path.display()))
            })?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => return Err(err.into()),
        };
        Ok(Self { path, items })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<(), SessionError> {
        let raw = serde_json::to_string_pretty(&self.items)
            .map_err(|e| SessionError::Io(e.to_string()))?;
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, raw)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl SessionStorage for JsonFileSessionStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, SessionError> {
        Ok(self.items.get(key).map(|value| match value {
            Value::String(raw) => raw.clone(),
            other => other.to_string(),
        }))
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<(), SessionError> {
        let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
        self.items.insert(key.to_string(), value);
        self.flush()
    }

    fn remove_item(&mut self, key: &str) -> Result<(), SessionError> {
        if self.items.remove(key).is_some() {
            self.flush()?;
        }
        Ok(())
    }
}

#[cfg(target_arch = "wasm32")]
mod browser {
    use super::SessionStorage;
    use crate::error::SessionError;

    /// The browser tab's `sessionStorage`.
    pub struct BrowserSessionStorage {
        storage: web_sys::Storage,
    }

    impl BrowserSessionStorage {
        pub fn new() -> Result<Self, SessionError> {
            let win = web_sys::window().ok_or(SessionError::StorageUnavailable)?;
            let storage = win
                .session_storage()
                .map_err(|e| SessionError::Io(format!("sessionStorage error: {:?}", e)))?
                .ok_or(SessionError::StorageUnavailable)?;
            Ok(Self { storage })
        }
    }

    impl SessionStorage for BrowserSessionStorage {
        fn get_item(&self, key: &str) -> Result<Option<String>, SessionError> {
            self.storage
                .get_item(key)
                .map_err(|e| SessionError::Io(format!("get_item({key}) failed: {:?}", e)))
        }

        fn set_item(&mut self, key: &str, value: &str) -> Result<(), SessionError> {
            self.storage
                .set_item(key, value)
                .map_err(|e| SessionError::Io(format!("set_item({key}) failed: {:?}", e)))
        }

        fn remove_item(&mut self, key: &str) -> Result<(), SessionError> {
            self.storage
                .remove_item(key)
                .map_err(|e| SessionError::Io(format!("remove_item({key}) failed: {:?}", e)))
        }
    }
}

#[cfg(target_arch = "wasm32")]
pub use browser::BrowserSessionStorage;

#[cfg(not(target_arch = "wasm32"))]
#[derive(Debug)]
pub struct BrowserSessionStorage;

#[cfg(not(target_arch = "wasm32"))]
impl BrowserSessionStorage {
    pub fn new() -> Result<Self, SessionError> {
        Err(SessionError::StorageUnavailable)
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl SessionStorage for BrowserSessionStorage {
    fn get_item(&self, _key: &str) -> Result<Option<String>, SessionError> {
        Err(SessionError::StorageUnavailable)
    }

    fn set_item(&mut self, _key: &str, _value: &str) -> Result<(), SessionError> {
        Err(SessionError::StorageUnavailable)
    }

    fn remove_item(&mut self, _key: &str) -> Result<(), SessionError> {
        Err(SessionError::StorageUnavailable)
    }
}
