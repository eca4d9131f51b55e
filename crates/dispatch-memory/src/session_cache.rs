//! [`SessionCache`] implementations.
//!
//! The in-memory cache is lost on restart; the dialogue engine detects the
//! resulting gap (a wizard state with no draft) and sends the actor back to
//! the start. The durable cache keeps drafts in the store under the same key
//! as the actor's dialogue state.

use crate::store::Store;
use async_trait::async_trait;
use dispatch_core::{error::DispatchError, traits::SessionCache};
use std::collections::HashMap;
use std::sync::Mutex;

/// Process-local drafts.
#[derive(Default)]
pub struct MemorySessionCache {
    entries: Mutex<HashMap<String, String>>,
}

impl MemorySessionCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>, DispatchError> {
        self.entries
            .lock()
            .map_err(|_| DispatchError::Store("session cache lock poisoned".into()))
    }
}

#[async_trait]
impl SessionCache for MemorySessionCache {
    async fn load(&self, actor_id: &str) -> Result<Option<String>, DispatchError> {
        Ok(self.lock()?.get(actor_id).cloned())
    }

    async fn save(&self, actor_id: &str, data: &str) -> Result<(), DispatchError> {
        self.lock()?.insert(actor_id.to_string(), data.to_string());
        Ok(())
    }

    async fn evict(&self, actor_id: &str) -> Result<(), DispatchError> {
        self.lock()?.remove(actor_id);
        Ok(())
    }

    fn is_durable(&self) -> bool {
        false
    }
}

/// Drafts persisted in `wizard_sessions`.
#[derive(Clone)]
pub struct DurableSessionCache {
    store: Store,
}

impl DurableSessionCache {
    pub fn new(store: Store) -> Self {
        Self { store }
    }
}

#[async_trait]
impl SessionCache for DurableSessionCache {
    async fn load(&self, actor_id: &str) -> Result<Option<String>, DispatchError> {
        self.store.get_wizard_session(actor_id).await
    }

    async fn save(&self, actor_id: &str, data: &str) -> Result<(), DispatchError> {
        self.store.put_wizard_session(actor_id, data).await
    }

    async fn evict(&self, actor_id: &str) -> Result<(), DispatchError> {
        self.store.delete_wizard_session(actor_id).await
    }

    fn is_durable(&self) -> bool {
        true
    }
}
