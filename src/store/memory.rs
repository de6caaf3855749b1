//! In-process credential store

use crate::error::{StoreError, StoreResult};
use crate::store::{SecureStore, StoredCredential};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, StoredCredential>>,
    fail_next_save: AtomicBool,
    save_calls: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `save` fail as if the store were locked
    pub fn fail_next_save(&self) {
        self.fail_next_save.store(true, Ordering::SeqCst);
    }

    /// Number of `save` calls, including failed ones
    pub fn save_calls(&self) -> usize {
        self.save_calls.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, HashMap<String, StoredCredential>>> {
        self.entries
            .lock()
            .map_err(|e| StoreError::Io(format!("store lock poisoned: {}", e)))
    }
}

#[async_trait]
impl SecureStore for MemoryStore {
    async fn save(
        &self,
        domain: &str,
        username: &str,
        password: &str,
        trusted_paths: &[PathBuf],
    ) -> StoreResult<()> {
        self.save_calls.fetch_add(1, Ordering::SeqCst);

        let entry = StoredCredential {
            domain: domain.to_string(),
            username: username.to_string(),
            password: password.to_string(),
            trusted_paths: trusted_paths.to_vec(),
        };

        if self.fail_next_save.swap(false, Ordering::SeqCst) {
            return Err(StoreError::AccessDenied("store is locked".to_string()));
        }

        self.lock()?.insert(domain.to_string(), entry);
        Ok(())
    }

    async fn get(&self, domain: &str) -> StoreResult<Option<StoredCredential>> {
        Ok(self.lock()?.get(domain).cloned())
    }

    async fn delete(&self, domain: &str) -> StoreResult<bool> {
        Ok(self.lock()?.remove(domain).is_some())
    }
}
