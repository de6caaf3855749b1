//! Keyring-based credential store.
//!
//! Uses the system keychain (macOS Keychain, Windows Credential Manager,
//! Linux Secret Service) via the `keyring` crate. The service name is the
//! keychain id handed to [`KeychainStore::new`]; the account is the registry
//! domain. Each entry is a single JSON secret, so a save is one keychain write.

use crate::error::{StoreError, StoreResult};
use crate::store::{SecureStore, StoredCredential};
use async_trait::async_trait;
use keyring::Entry;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

pub const DEFAULT_KEYCHAIN_ID: &str = "com.github.yorelog.registry-login";

#[derive(Serialize, Deserialize)]
struct KeychainSecret {
    username: String,
    password: String,
    #[serde(default)]
    trusted_paths: Vec<PathBuf>,
}

pub struct KeychainStore {
    service: String,
    write_lock: Arc<Mutex<()>>,
}

impl KeychainStore {
    pub fn new(keychain_id: impl Into<String>) -> Self {
        Self {
            service: keychain_id.into(),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    fn entry(service: &str, domain: &str) -> StoreResult<Entry> {
        Ok(Entry::new(service, domain)?)
    }

    fn write_sync(service: &str, domain: &str, secret: &KeychainSecret) -> StoreResult<()> {
        let json = serde_json::to_string(secret)?;
        Self::entry(service, domain)?.set_password(&json)?;
        Ok(())
    }

    fn read_sync(service: &str, domain: &str) -> StoreResult<Option<StoredCredential>> {
        let json = match Self::entry(service, domain)?.get_password() {
            Ok(json) => json,
            Err(keyring::Error::NoEntry) => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let secret: KeychainSecret = serde_json::from_str(&json)?;
        Ok(Some(StoredCredential {
            domain: domain.to_string(),
            username: secret.username,
            password: secret.password,
            trusted_paths: secret.trusted_paths,
        }))
    }

    fn delete_sync(service: &str, domain: &str) -> StoreResult<bool> {
        match Self::entry(service, domain)?.delete_credential() {
            Ok(()) => Ok(true),
            Err(keyring::Error::NoEntry) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

fn join_error(e: tokio::task::JoinError) -> StoreError {
    StoreError::Io(format!("Task join error: {}", e))
}

#[async_trait]
impl SecureStore for KeychainStore {
    async fn save(
        &self,
        domain: &str,
        username: &str,
        password: &str,
        trusted_paths: &[PathBuf],
    ) -> StoreResult<()> {
        let _guard = self.write_lock.lock().await;

        let service = self.service.clone();
        let domain = domain.to_string();
        let secret = KeychainSecret {
            username: username.to_string(),
            password: password.to_string(),
            trusted_paths: trusted_paths.to_vec(),
        };

        tokio::task::spawn_blocking(move || Self::write_sync(&service, &domain, &secret))
            .await
            .map_err(join_error)?
    }

    async fn get(&self, domain: &str) -> StoreResult<Option<StoredCredential>> {
        let service = self.service.clone();
        let domain = domain.to_string();
        tokio::task::spawn_blocking(move || Self::read_sync(&service, &domain))
            .await
            .map_err(join_error)?
    }

    async fn delete(&self, domain: &str) -> StoreResult<bool> {
        let _guard = self.write_lock.lock().await;

        let service = self.service.clone();
        let domain = domain.to_string();
        tokio::task::spawn_blocking(move || Self::delete_sync(&service, &domain))
            .await
            .map_err(join_error)?
    }
}
