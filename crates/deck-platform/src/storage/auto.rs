//! Pick the best available storage backend.
//!
//! Priority: localStorage → Memory (fallback). History only survives a
//! reload on the first one; the fallback keeps the app usable where
//! storage access is denied.

use std::rc::Rc;

use deck_core::ports::StoragePort;

use super::{LocalStorage, MemoryStorage};

/// Returns a trait object so callers are backend-agnostic. Never fails:
/// the in-memory backend always works.
pub fn auto_detect_storage() -> Rc<dyn StoragePort> {
    match LocalStorage::open() {
        Ok(local) => {
            log::info!("Storage backend: localStorage");
            Rc::new(local)
        }
        Err(e) => {
            log::warn!("localStorage unavailable ({}), falling back to memory", e);
            Rc::new(MemoryStorage::new())
        }
    }
}
