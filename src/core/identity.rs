//! Anonymous client identity.
//!
//! The service has no accounts: a random UUID sent as the `x-key` header
//! scopes extractors to whoever holds it. The key is generated on first run
//! and read back from a [`KeyStore`] afterwards.

use crate::domain::ports::KeyStore;
use crate::utils::error::Result;
use std::sync::{Mutex, OnceLock};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        ApiKey(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Load the key from `store`, generating and persisting a fresh one when the
/// store is empty or holds only whitespace.
pub fn ensure_api_key<K: KeyStore + ?Sized>(store: &K) -> Result<ApiKey> {
    if let Some(existing) = store.load()? {
        let trimmed = existing.trim();
        if !trimmed.is_empty() {
            tracing::debug!("Using stored API key");
            return Ok(ApiKey::new(trimmed));
        }
        tracing::warn!("Stored API key is blank, generating a new one");
    }

    let key = uuid::Uuid::new_v4().to_string();
    store.save(&key)?;
    tracing::info!("Generated new API key");
    Ok(ApiKey::new(key))
}

static PROCESS_KEY: OnceLock<ApiKey> = OnceLock::new();

/// Seed the process-wide key. Only the first call has any effect; the key
/// that ends up installed is returned either way.
pub fn init_process_api_key<K: KeyStore + ?Sized>(store: &K) -> Result<&'static ApiKey> {
    if let Some(key) = PROCESS_KEY.get() {
        return Ok(key);
    }
    let key = ensure_api_key(store)?;
    Ok(PROCESS_KEY.get_or_init(|| key))
}

pub fn process_api_key() -> Option<&'static ApiKey> {
    PROCESS_KEY.get()
}

/// In-memory store for tests and one-off runs.
#[derive(Debug, Default)]
pub struct MemoryKeyStore {
    key: Mutex<Option<String>>,
}

impl MemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_key(key: impl Into<String>) -> Self {
        Self {
            key: Mutex::new(Some(key.into())),
        }
    }
}

impl KeyStore for MemoryKeyStore {
    fn load(&self) -> Result<Option<String>> {
        Ok(self.key.lock().map(|k| k.clone()).unwrap_or_default())
    }

    fn save(&self, key: &str) -> Result<()> {
        if let Ok(mut slot) = self.key.lock() {
            *slot = Some(key.to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_run_generates_and_persists() {
        let store = MemoryKeyStore::new();
        let key = ensure_api_key(&store).unwrap();

        assert!(uuid::Uuid::parse_str(key.as_str()).is_ok());
        assert_eq!(store.load().unwrap().as_deref(), Some(key.as_str()));
    }

    #[test]
    fn test_later_runs_reuse_stored_key() {
        let store = MemoryKeyStore::with_key("existing-key\n");
        let first = ensure_api_key(&store).unwrap();
        let second = ensure_api_key(&store).unwrap();

        assert_eq!(first.as_str(), "existing-key");
        assert_eq!(first, second);
    }

    #[test]
    fn test_blank_key_is_replaced() {
        let store = MemoryKeyStore::with_key("   ");
        let key = ensure_api_key(&store).unwrap();
        assert_ne!(key.as_str().trim(), "");
        assert_eq!(store.load().unwrap().as_deref(), Some(key.as_str()));
    }

    #[test]
    fn test_process_key_initializes_once() {
        let first = init_process_api_key(&MemoryKeyStore::with_key("process-a")).unwrap();
        let second = init_process_api_key(&MemoryKeyStore::with_key("process-b")).unwrap();

        assert_eq!(first, second);
        assert_eq!(process_api_key(), Some(first));
    }
}
