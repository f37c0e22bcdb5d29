#![forbid(unsafe_code)]

//! Opaque key-value storage for persisted settings.
//!
//! Values are JSON text. The host backs [`KeyValueStore`] with extension
//! storage; [`MemoryStore`] is the in-process implementation.

use std::collections::BTreeMap;

use serde::Serialize;
use serde::de::DeserializeOwned;

/// String-keyed storage of JSON documents.
pub trait KeyValueStore {
    fn get_raw(&self, key: &str) -> Option<String>;
    fn set_raw(&mut self, key: &str, value: String);
    /// Returns `false` when nothing was stored under `key`.
    fn remove(&mut self, key: &str) -> bool;
}

/// Read and decode `key`. A missing key is `Ok(None)`.
pub fn load_json<T, S>(store: &S, key: &str) -> Result<Option<T>, StoreError>
where
    T: DeserializeOwned,
    S: KeyValueStore + ?Sized,
{
    store
        .get_raw(key)
        .map(|raw| {
            serde_json::from_str(&raw).map_err(|source| {
                tracing::warn!(message = "store.decode_failed", key, error = %source);
                StoreError::Decode {
                    key: key.to_owned(),
                    source,
                }
            })
        })
        .transpose()
}

/// Encode `value` and store it under `key`.
pub fn save_json<T, S>(store: &mut S, key: &str, value: &T) -> Result<(), StoreError>
where
    T: Serialize + ?Sized,
    S: KeyValueStore + ?Sized,
{
    let raw = serde_json::to_string(value).map_err(|source| StoreError::Encode {
        key: key.to_owned(),
        source,
    })?;
    store.set_raw(key, raw);
    Ok(())
}

/// In-memory [`KeyValueStore`].
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get_raw(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set_raw(&mut self, key: &str, value: String) {
        self.entries.insert(key.to_owned(), value);
    }

    fn remove(&mut self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }
}

/// Errors from [`load_json`] and [`save_json`].
#[derive(Debug)]
pub enum StoreError {
    Decode {
        key: String,
        source: serde_json::Error,
    },
    Encode {
        key: String,
        source: serde_json::Error,
    },
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Decode { key, source } => write!(f, "failed to decode {key:?}: {source}"),
            Self::Encode { key, source } => write!(f, "failed to encode {key:?}: {source}"),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Decode { source, .. } | Self::Encode { source, .. } => Some(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_values_survive_the_store() {
        let mut store = MemoryStore::new();
        save_json(&mut store, "numbers", &vec![1, 2, 3]).unwrap();
        let back: Option<Vec<u32>> = load_json(&store, "numbers").unwrap();
        assert_eq!(back, Some(vec![1, 2, 3]));
    }

    #[test]
    fn missing_key_is_none() {
        let store = MemoryStore::new();
        let value: Option<String> = load_json(&store, "absent").unwrap();
        assert_eq!(value, None);
    }

    #[test]
    fn corrupt_value_reports_key() {
        let mut store = MemoryStore::new();
        store.set_raw("broken", "{".to_owned());
        let err = load_json::<Vec<u32>, _>(&store, "broken").unwrap_err();
        assert!(err.to_string().contains("\"broken\""));
    }

    #[test]
    fn remove_reports_presence() {
        let mut store = MemoryStore::new();
        store.set_raw("k", "1".to_owned());
        assert!(store.remove("k"));
        assert!(!store.remove("k"));
        assert!(store.is_empty());
    }
}
