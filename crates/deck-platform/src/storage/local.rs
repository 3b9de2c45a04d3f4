//! `window.localStorage` backend — the canonical home of the history key.
//! Synchronous under the hood; the async port shape is kept so callers stay
//! backend-agnostic.

use async_trait::async_trait;

use deck_core::ports::StoragePort;
use deck_types::{DeckError, Result};

pub struct LocalStorage {
    store: web_sys::Storage,
}

impl LocalStorage {
    /// Fails when there is no window or storage access is denied (private
    /// browsing policies, sandboxed frames).
    pub fn open() -> Result<Self> {
        let window = web_sys::window()
            .ok_or_else(|| DeckError::Storage("No window object".to_string()))?;
        let store = window
            .local_storage()
            .map_err(|e| DeckError::Storage(format!("{:?}", e)))?
            .ok_or_else(|| DeckError::Storage("localStorage not available".to_string()))?;
        Ok(Self { store })
    }
}

#[async_trait(?Send)]
impl StoragePort for LocalStorage {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.store
            .get_item(key)
            .map_err(|e| DeckError::Storage(format!("{:?}", e)))
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        // Quota errors surface here and are the caller's to ignore.
        self.store
            .set_item(key, value)
            .map_err(|e| DeckError::Storage(format!("{:?}", e)))
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.store
            .remove_item(key)
            .map_err(|e| DeckError::Storage(format!("{:?}", e)))
    }

    fn backend_name(&self) -> &str {
        "localstorage"
    }
}
